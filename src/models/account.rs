use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an account summary came from. `Skipped` is the sentinel returned
/// when the per-scan lookup budget ran out before this wallet — scorers treat
/// it as neutral, never as maximum suspicion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Api,
    Cache,
    Skipped,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Api => "api",
            DataSource::Cache => "cache",
            DataSource::Skipped => "skipped",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifetime (global) aggregate for a wallet. Produced by the account-state
/// provider; the scoring pipeline only reads it, preferring point-in-time
/// state whenever that is available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountHistory {
    pub total_trades: i64,
    pub first_trade_date: Option<DateTime<Utc>>,
    pub last_trade_date: Option<DateTime<Utc>>,
    pub total_volume_usd: Decimal,
    pub creation_date: Option<DateTime<Utc>>,
    pub profit_usd: Option<Decimal>,
    pub data_source: DataSource,
}

impl AccountHistory {
    /// The budget-exhausted sentinel: carries no usable data.
    pub fn skipped() -> Self {
        Self {
            total_trades: 0,
            first_trade_date: None,
            last_trade_date: None,
            total_volume_usd: Decimal::ZERO,
            creation_date: None,
            profit_usd: None,
            data_source: DataSource::Skipped,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.data_source == DataSource::Skipped
    }
}

/// Account statistics reconstructed as of a specific historical timestamp,
/// strictly before it. `approximate` is true whenever the persisted history
/// is not provably complete back to the account's first activity — consumers
/// treat such data as usable but lower-confidence, never suppressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalState {
    pub trade_count: i64,
    pub volume_usd: Decimal,
    pub pnl_usd: Decimal,
    /// Most recent trade strictly before the query timestamp.
    pub last_trade_at: Option<DateTime<Utc>>,
    pub approximate: bool,
}
