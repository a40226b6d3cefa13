use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{AccountHistory, DataSource, PricePoint, RawFill, Side, WalletPosition};

// ---------------------------------------------------------------------------
// Fill (Data API)
// ---------------------------------------------------------------------------

/// Raw fill payload from the Data API. Every field is optional because the
/// feed mixes schema generations; conversion decides what is usable.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiFill {
    pub id: Option<String>,
    #[serde(default)]
    pub transaction_hash: Option<String>,
    /// Condition id of the market.
    pub market: Option<String>,
    pub asset_id: Option<String>,
    pub side: Option<String>,
    pub size: Option<Decimal>,
    pub price: Option<Decimal>,
    pub maker_address: Option<String>,
    pub taker_address: Option<String>,
    /// Seconds, milliseconds, or RFC 3339 depending on the feed generation.
    pub timestamp: Option<serde_json::Value>,
}

impl ApiFill {
    /// Convert to the internal fill form. Returns `None` for payloads missing
    /// anything essential — malformed upstream rows are skipped, never
    /// propagated as errors.
    pub fn into_raw_fill(self) -> Option<RawFill> {
        let transaction_hash = self.transaction_hash?;
        let asset_id = self.asset_id?;
        let maker = self.maker_address?;
        let taker = self.taker_address?;
        let side = Side::from_api_str(self.side.as_deref()?)?;
        let timestamp = parse_fill_timestamp(self.timestamp.as_ref())?;
        let size = self.size.unwrap_or(Decimal::ZERO);
        let price = self.price.unwrap_or(Decimal::ZERO);

        // The feed drops `id` in some generations; a synthesized identity
        // keeps replays idempotent as long as it is deterministic.
        let id = self.id.unwrap_or_else(|| {
            format!(
                "{}-{}-{}-{}",
                transaction_hash,
                asset_id,
                timestamp.timestamp(),
                size
            )
        });

        Some(RawFill {
            id,
            transaction_hash,
            timestamp,
            maker,
            taker,
            market_token: asset_id,
            side,
            value_usd: size * price,
            price,
        })
    }
}

/// Parse the venue's timestamp field: integer seconds or milliseconds, the
/// same as strings, or RFC 3339.
pub fn parse_fill_timestamp(ts: Option<&serde_json::Value>) -> Option<DateTime<Utc>> {
    ts.and_then(|t| match t {
        serde_json::Value::Number(n) => {
            let secs = n.as_i64()?;
            // If >1e12, it's milliseconds
            if secs > 1_000_000_000_000 {
                DateTime::from_timestamp(secs / 1000, ((secs % 1000) * 1_000_000) as u32)
            } else {
                DateTime::from_timestamp(secs, 0)
            }
        }
        serde_json::Value::String(s) => {
            if let Ok(secs) = s.parse::<i64>() {
                if secs > 1_000_000_000_000 {
                    return DateTime::from_timestamp(
                        secs / 1000,
                        ((secs % 1000) * 1_000_000) as u32,
                    );
                }
                return DateTime::from_timestamp(secs, 0);
            }
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        }
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Position (Data API)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiPosition {
    #[serde(alias = "asset")]
    pub asset_id: Option<String>,
    pub size: Option<Decimal>,
}

impl ApiPosition {
    pub fn into_position(self) -> Option<WalletPosition> {
        Some(WalletPosition {
            token_id: self.asset_id?,
            size: self.size.unwrap_or(Decimal::ZERO),
        })
    }
}

// ---------------------------------------------------------------------------
// Account summary (Data API)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiAccountSummary {
    #[serde(default, alias = "traded")]
    pub total_trades: Option<i64>,
    #[serde(default, alias = "volume")]
    pub total_volume_usd: Option<Decimal>,
    #[serde(default, alias = "pnl")]
    pub profit_usd: Option<Decimal>,
    #[serde(default, alias = "firstTradeTimestamp")]
    pub first_trade_ts: Option<serde_json::Value>,
    #[serde(default, alias = "lastTradeTimestamp")]
    pub last_trade_ts: Option<serde_json::Value>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<serde_json::Value>,
}

impl ApiAccountSummary {
    pub fn into_history(self) -> AccountHistory {
        AccountHistory {
            total_trades: self.total_trades.unwrap_or(0),
            first_trade_date: parse_fill_timestamp(self.first_trade_ts.as_ref()),
            last_trade_date: parse_fill_timestamp(self.last_trade_ts.as_ref()),
            creation_date: parse_fill_timestamp(self.created_at.as_ref()),
            total_volume_usd: self.total_volume_usd.unwrap_or(Decimal::ZERO),
            profit_usd: self.profit_usd,
            data_source: DataSource::Api,
        }
    }
}

// ---------------------------------------------------------------------------
// Price history (CLOB API)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiPricePoint {
    /// Epoch seconds.
    pub t: i64,
    pub p: Decimal,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiPriceHistory {
    #[serde(default)]
    pub history: Vec<ApiPricePoint>,
}

impl ApiPriceHistory {
    /// Usable points, oldest first. Out-of-range timestamps are dropped.
    pub fn into_series(self) -> Vec<PricePoint> {
        let mut series: Vec<PricePoint> = self
            .history
            .into_iter()
            .filter_map(|p| {
                Some(PricePoint {
                    timestamp: DateTime::from_timestamp(p.t, 0)?,
                    price: p.p,
                })
            })
            .collect();
        series.sort_by_key(|p| p.timestamp);
        series
    }
}
