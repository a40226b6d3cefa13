use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row for the `suspicious_trades` table — one scored trade with its
/// signal breakdown. The ranked list the service produces is this table
/// ordered by `total_score` descending.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SuspiciousTradeRow {
    pub id: Uuid,
    pub market_id: String,
    pub wallet: String,
    pub transaction_hash: String,
    pub outcome: String,
    pub side: String,
    pub total_size: Decimal,
    pub total_value_usd: Decimal,
    pub avg_price: Decimal,
    pub traded_at: DateTime<Utc>,
    pub total_score: Decimal,
    pub size_impact_score: Decimal,
    pub account_history_score: Decimal,
    pub conviction_score: Decimal,
    pub price_impact_pct: Option<Decimal>,
    pub is_alert: bool,
    pub tags: Vec<String>,
    pub had_complementary_fills: bool,
    pub approximate_history: bool,
    pub created_at: Option<DateTime<Utc>>,
}
