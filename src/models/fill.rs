use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Side;

/// One on-chain match event as observed from the fill feed. Immutable once
/// observed; identity is `id`. `side` is the maker's order direction, and
/// `value_usd` is the fill's USD value (shares are derived via `price`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFill {
    pub id: String,
    pub transaction_hash: String,
    pub timestamp: DateTime<Utc>,
    pub maker: String,
    pub taker: String,
    pub market_token: String,
    pub side: Side,
    pub value_usd: Decimal,
    pub price: Decimal,
}

impl RawFill {
    /// Outcome-token shares this fill moved. Zero-price fills contribute no
    /// shares (they are kept for audit but must not poison the average).
    pub fn shares(&self) -> Decimal {
        if self.price > Decimal::ZERO {
            self.value_usd / self.price
        } else {
            Decimal::ZERO
        }
    }
}

/// Database row for the `fills` table. Enum fields are stored as text and
/// re-parsed on the way out.
#[derive(Debug, Clone, FromRow)]
pub struct FillRow {
    pub id: String,
    pub market_id: String,
    pub transaction_hash: String,
    pub filled_at: DateTime<Utc>,
    pub maker: String,
    pub taker: String,
    pub market_token: String,
    pub side: String,
    pub value_usd: Decimal,
    pub price: Decimal,
}

impl FillRow {
    pub fn into_raw(self) -> Option<RawFill> {
        Some(RawFill {
            id: self.id,
            transaction_hash: self.transaction_hash,
            timestamp: self.filled_at,
            maker: self.maker,
            taker: self.taker,
            market_token: self.market_token,
            side: Side::from_api_str(&self.side)?,
            value_usd: self.value_usd,
            price: self.price,
        })
    }
}

// ---------------------------------------------------------------------------
// Role-tagged fill detail
// ---------------------------------------------------------------------------

/// Which side of the match the analyzed wallet stood on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillRole {
    Maker,
    Taker,
}

/// Constituent fill kept on an aggregated trade for audit. `side` is still
/// the raw maker direction; the trade-level side carries the wallet's action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub role: FillRole,
    pub side: Side,
    pub value_usd: Decimal,
    pub price: Decimal,
    pub shares: Decimal,
}

// ---------------------------------------------------------------------------
// WalletPosition
// ---------------------------------------------------------------------------

/// Net outcome-token holding reported by the positions endpoint. Used only to
/// disambiguate which leg of a hedged transaction is the directional one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletPosition {
    pub token_id: String,
    pub size: Decimal,
}
