use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use crate::db::fill_repo;
use crate::db::sync_repo;
use crate::models::{wallet_scope, HistoricalState, SyncRecord};

use super::coverage::{check_coverage, RequestedRange};

/// Reconstructs wallet state as of a given instant from persisted trade
/// history. Collaborators are injected; the resolver owns no caches of its
/// own.
#[derive(Clone)]
pub struct StateResolver {
    pool: PgPool,
    sync_ttl: Duration,
}

impl StateResolver {
    pub fn new(pool: PgPool, sync_ttl: Duration) -> Self {
        Self { pool, sync_ttl }
    }

    /// Trade count, volume and PnL of `wallet`'s activity strictly before
    /// `timestamp`, plus how trustworthy that reconstruction is.
    ///
    /// The result is marked approximate when persisted history is not proven
    /// to start at or before the wallet's true first activity; consumers use
    /// it anyway, at lower confidence. Scores are never suppressed for
    /// approximate data — a wallet that was never fully backfilled would
    /// otherwise become invisible.
    pub async fn state_at(
        &self,
        wallet: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<HistoricalState> {
        let scope = wallet_scope(wallet);
        let record = sync_repo::get_sync_record(&self.pool, &scope).await?;

        let decision = check_coverage(
            record.as_ref(),
            RequestedRange::until(timestamp),
            self.sync_ttl,
            Utc::now(),
        );
        if decision.needs_fetch() {
            tracing::debug!(
                wallet = %wallet,
                reason = %decision.reason,
                "resolving point-in-time state over incomplete coverage"
            );
        }

        let row = fill_repo::wallet_state_before(&self.pool, wallet, timestamp).await?;

        Ok(HistoricalState {
            trade_count: row.trade_count,
            volume_usd: row.volume_usd,
            pnl_usd: row.pnl_usd,
            last_trade_at: row.last_trade_at,
            approximate: is_approximate(record.as_ref(), timestamp),
        })
    }
}

/// History counts as exact only when the sync record proves it begins at or
/// before the wallet's first activity: a complete-history flag, and an
/// earliest synced point that is not itself past the query instant.
fn is_approximate(record: Option<&SyncRecord>, timestamp: DateTime<Utc>) -> bool {
    match record {
        None => true,
        Some(record) => {
            !record.has_complete_history
                || record.synced_from.map_or(true, |from| from > timestamp)
        }
    }
}
