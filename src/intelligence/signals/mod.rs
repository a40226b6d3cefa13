pub mod account_history;
pub mod conviction;
pub mod size_impact;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{AccountHistory, HistoricalState, PricePoint};

// ---------------------------------------------------------------------------
// Scoring context
// ---------------------------------------------------------------------------

/// Everything a signal may look at besides the trade itself. All fields are
/// optional: collaborators that fail or are skipped leave their slot `None`
/// and the signal degrades explicitly rather than guessing.
#[derive(Debug, Clone, Default)]
pub struct ScoringContext {
    /// Lifetime account summary, however it was sourced.
    pub history: Option<AccountHistory>,
    /// Wallet state reconstructed as of the instant before the trade.
    pub historical_state: Option<HistoricalState>,
    /// Last observed market price strictly before the trade.
    pub price_before: Option<PricePoint>,
    /// First observed market price strictly after the trade.
    pub price_after: Option<PricePoint>,
    /// When the market was created, if the venue reported it.
    pub market_created_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Signal results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalName {
    SizeImpact,
    AccountHistory,
    Conviction,
}

impl SignalName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalName::SizeImpact => "size_impact",
            SignalName::AccountHistory => "account_history",
            SignalName::Conviction => "conviction",
        }
    }
}

impl std::fmt::Display for SignalName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One scored signal: a 0-100 score, its combination weight, and a typed
/// explanation of how the score came about.
#[derive(Debug, Clone, Serialize)]
pub struct SignalResult {
    pub name: SignalName,
    pub score: Decimal,
    pub weight: Decimal,
    pub detail: SignalDetail,
}

/// Closed set of per-signal explanations. Every path through a scorer maps to
/// exactly one variant, so downstream consumers can match exhaustively
/// instead of fishing in a string map.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum SignalDetail {
    SizeImpact(SizeImpactDetail),
    AccountHistory(AccountHistoryDetail),
    Conviction(ConvictionDetail),
}

#[derive(Debug, Clone, Serialize)]
pub struct SizeImpactDetail {
    pub reason: SizeReason,
    pub size_score: Decimal,
    pub impact_score: Decimal,
    /// Absolute price move across the trade, percent of the before price.
    pub impact_pct: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeReason {
    BelowThreshold,
    Scored,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountHistoryDetail {
    pub reason: HistoryReason,
    pub trade_count_score: Decimal,
    pub age_score: Decimal,
    pub dormancy_score: Decimal,
    pub profit_score: Decimal,
    /// True when the underlying point-in-time state was reconstructed from
    /// incomplete fill coverage.
    pub approximate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryReason {
    /// Nothing known about the account at all: maximally suspicious.
    NoHistory,
    /// Lookup deliberately skipped (budget exhausted): neutral score.
    LookupSkipped,
    Scored,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvictionDetail {
    pub reason: ConvictionReason,
    /// Trade value as a percentage of prior volume, when computable.
    pub concentration_pct: Option<Decimal>,
    pub prior_volume_usd: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvictionReason {
    /// Prior volume known and zero: this is the wallet's first recorded bet.
    FirstTrade,
    /// No volume figure available from any source.
    NoContext,
    Scored,
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Linear interpolation of `value` from `[lo, hi]` onto `[score_lo, score_hi]`,
/// clamped to the target interval. Degenerate input ranges collapse to
/// `score_hi`.
pub(crate) fn linear(
    value: Decimal,
    lo: Decimal,
    hi: Decimal,
    score_lo: Decimal,
    score_hi: Decimal,
) -> Decimal {
    if hi <= lo {
        return score_hi;
    }
    let t = (value - lo) / (hi - lo);
    let t = t.clamp(Decimal::ZERO, Decimal::ONE);
    score_lo + t * (score_hi - score_lo)
}
