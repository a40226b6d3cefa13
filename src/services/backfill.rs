use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use sqlx::PgPool;

use crate::db::{fill_repo, sync_repo};
use crate::history::{check_coverage, CoverageDecision, RequestedRange};
use crate::models::{market_scope, wallet_scope, RawFill};
use crate::polymarket::{DataClient, MAX_PAGE_SIZE};

/// Page-walk ceiling per refresh. A scope needing more than this stays
/// partial and is picked up again on the next scan.
const MAX_PAGES_PER_REFRESH: u32 = 20;

/// Keeps stored fill history coherent with what scans are about to read.
/// Consults the coverage checker, fetches only the decided gap, and commits
/// fills and the sync-record advance in one transaction so a reader never
/// sees a window claimed as covered without its fills.
#[derive(Clone)]
pub struct BackfillService {
    data_client: DataClient,
    pool: PgPool,
    sync_ttl: Duration,
}

enum Scope<'a> {
    Market(&'a str),
    Wallet(&'a str),
}

impl BackfillService {
    pub fn new(data_client: DataClient, pool: PgPool, sync_ttl: Duration) -> Self {
        Self {
            data_client,
            pool,
            sync_ttl,
        }
    }

    /// Make sure a market's fills over `requested` are stored locally.
    /// Returns the coverage decision that drove the refresh.
    pub async fn ensure_market_coverage(
        &self,
        condition_id: &str,
        requested: RequestedRange,
    ) -> anyhow::Result<CoverageDecision> {
        self.ensure_coverage(Scope::Market(condition_id), requested)
            .await
    }

    /// Make sure a wallet's trade history over `requested` is stored locally
    /// (wallet-relative form, the table point-in-time state reads).
    pub async fn ensure_wallet_coverage(
        &self,
        wallet: &str,
        requested: RequestedRange,
    ) -> anyhow::Result<CoverageDecision> {
        self.ensure_coverage(Scope::Wallet(wallet), requested).await
    }

    async fn ensure_coverage(
        &self,
        scope: Scope<'_>,
        requested: RequestedRange,
    ) -> anyhow::Result<CoverageDecision> {
        let scope_key = match &scope {
            Scope::Market(id) => market_scope(id),
            Scope::Wallet(addr) => wallet_scope(addr),
        };

        let record = sync_repo::get_sync_record(&self.pool, &scope_key).await?;
        let decision = check_coverage(record.as_ref(), requested, self.sync_ttl, Utc::now());
        if !decision.needs_fetch() {
            return Ok(decision);
        }

        tracing::debug!(
            scope = %scope_key,
            reason = %decision.reason,
            "coverage gap, refreshing"
        );

        let (fills, exhausted) = self
            .fetch_pages(&scope, decision.fetch_after, decision.fetch_before)
            .await;

        if fills.is_empty() && !exhausted {
            // Upstream gave us nothing usable; leave the record untouched so
            // the next scan retries the same gap.
            return Ok(decision);
        }

        let now = Utc::now();
        let (synced_from, synced_to, complete) = if exhausted {
            (
                decision.fetch_after.or_else(|| min_timestamp(&fills)).or(Some(now)),
                decision.fetch_before.or(Some(now)),
                decision.fetch_after.is_none(),
            )
        } else {
            // Partial walk: claim only the span the fills actually prove.
            (min_timestamp(&fills), max_timestamp(&fills), false)
        };

        let mut tx = self.pool.begin().await?;
        let inserted = match &scope {
            Scope::Market(id) => fill_repo::save_fills(&mut tx, id, &fills).await?,
            Scope::Wallet(addr) => fill_repo::save_wallet_trades(&mut tx, addr, &fills).await?,
        };
        sync_repo::record_synced_range(&mut tx, &scope_key, synced_from, synced_to, complete)
            .await?;
        tx.commit().await?;

        counter!("fills_ingested_total").increment(inserted);
        tracing::info!(
            scope = %scope_key,
            reason = %decision.reason,
            fetched = fills.len(),
            inserted = inserted,
            complete = complete,
            "coverage refreshed"
        );

        Ok(decision)
    }

    /// Walk the paginated fill endpoint over the gap. Returns the usable
    /// fills plus whether the walk reached the end of upstream data. A page
    /// failure ends the walk but keeps what previous pages returned —
    /// absence of data, never a propagated transport error.
    async fn fetch_pages(
        &self,
        scope: &Scope<'_>,
        after: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
    ) -> (Vec<RawFill>, bool) {
        let mut fills = Vec::new();
        let mut exhausted = false;

        for page in 0..MAX_PAGES_PER_REFRESH {
            let offset = page * MAX_PAGE_SIZE;
            let result = match scope {
                Scope::Market(id) => {
                    self.data_client
                        .get_market_fills(id, after, before, MAX_PAGE_SIZE, offset)
                        .await
                }
                Scope::Wallet(addr) => {
                    self.data_client
                        .get_wallet_fills(addr, after, before, MAX_PAGE_SIZE, offset)
                        .await
                }
            };

            let batch = match result {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::warn!(error = %e, page = page, "fill page fetch failed, keeping partial window");
                    return (fills, false);
                }
            };

            let page_len = batch.len();
            fills.extend(batch.into_iter().filter_map(|f| f.into_raw_fill()));

            if (page_len as u32) < MAX_PAGE_SIZE {
                exhausted = true;
                break;
            }
        }

        (fills, exhausted)
    }
}

fn min_timestamp(fills: &[RawFill]) -> Option<DateTime<Utc>> {
    fills.iter().map(|f| f.timestamp).min()
}

fn max_timestamp(fills: &[RawFill]) -> Option<DateTime<Utc>> {
    fills.iter().map(|f| f.timestamp).max()
}
