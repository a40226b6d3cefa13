use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::ClassifierConfig;
use crate::models::{AggregatedTrade, Side};

/// Behavioural tags layered on top of the numeric score. Non-exclusive; a
/// trade can carry any subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tag {
    /// Outsized notional value.
    Whale,
    /// High-scoring trade that moved the price without whale-sized capital.
    Sniper,
    /// Sell into a falling price.
    Dumping,
    /// Positioned shortly after the market opened.
    EarlyMover,
}

impl Tag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Whale => "WHALE",
            Tag::Sniper => "SNIPER",
            Tag::Dumping => "DUMPING",
            Tag::EarlyMover => "EARLY_MOVER",
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Threshold classification over a scored trade. `signed_impact_pct` is the
/// signed price move across the trade (negative = price fell), when a price
/// window was available.
pub fn classify_trade(
    trade: &AggregatedTrade,
    total_score: Decimal,
    signed_impact_pct: Option<Decimal>,
    market_created_at: Option<DateTime<Utc>>,
    cfg: &ClassifierConfig,
) -> Vec<Tag> {
    let mut tags = Vec::new();

    let is_whale = trade.total_value_usd >= cfg.whale_value_usd;
    if is_whale {
        tags.push(Tag::Whale);
    }

    if let Some(impact) = signed_impact_pct {
        if !is_whale
            && total_score >= cfg.sniper_min_score
            && impact.abs() >= cfg.sniper_min_impact_pct
        {
            tags.push(Tag::Sniper);
        }
        if trade.side == Side::Sell && impact <= -cfg.dumping_min_impact_pct {
            tags.push(Tag::Dumping);
        }
    }

    if let Some(created_at) = market_created_at {
        let elapsed = trade.timestamp - created_at;
        if elapsed >= Duration::zero() && elapsed <= Duration::hours(cfg.early_mover_hours) {
            tags.push(Tag::EarlyMover);
        }
    }

    tags
}
