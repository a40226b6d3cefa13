use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Fill, Outcome, Side};

/// One economically meaningful trade for one wallet, reconstructed from raw
/// maker/taker fills. At most one trade exists per (transaction, outcome) per
/// wallet once self-trade and complementary legs are resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedTrade {
    pub transaction_hash: String,
    pub market_id: String,
    pub wallet: String,
    /// The wallet's actual action (taker fills invert the raw maker side).
    pub side: Side,
    pub outcome: Outcome,
    /// Outcome-token shares.
    pub total_size: Decimal,
    pub total_value_usd: Decimal,
    /// Value-weighted: `total_value_usd / total_size`, 0 when no shares.
    pub avg_price: Decimal,
    /// Earliest constituent fill.
    pub timestamp: DateTime<Utc>,
    pub fills: Vec<Fill>,
    pub had_complementary_fills: bool,
    /// USD total of the discarded hedge leg, when one was filtered out.
    pub complementary_value_usd: Option<Decimal>,
}
