use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Cache bookkeeping for one synced scope (a market's fills or a wallet's
/// trade history). Mutated only by the backfill pipeline; the coverage
/// checker reads it and nothing else.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SyncRecord {
    /// `market:<condition_id>` or `wallet:<address>`.
    pub scope: String,
    pub synced_from: Option<DateTime<Utc>>,
    pub synced_to: Option<DateTime<Utc>>,
    pub synced_at: Option<DateTime<Utc>>,
    /// True once a backfill walked all the way to the scope's first activity.
    pub has_complete_history: bool,
}

/// Scope key for a market's fill history.
pub fn market_scope(condition_id: &str) -> String {
    format!("market:{condition_id}")
}

/// Scope key for a wallet's trade history. Address is canonicalized so the
/// same wallet never ends up under two scopes.
pub fn wallet_scope(address: &str) -> String {
    format!("wallet:{}", address.to_lowercase())
}
