use std::sync::atomic::{AtomicUsize, Ordering};

use metrics::counter;
use sqlx::PgPool;

use crate::db::fill_repo;
use crate::models::AccountHistory;
use crate::polymarket::DataClient;

/// Serves lifetime account summaries under a fixed lookup budget. One
/// provider is created per scan; once the budget is gone every further
/// request gets the skipped sentinel instead of an upstream call, so a big
/// scan degrades to neutral scores rather than hammering the API.
pub struct AccountStateProvider {
    data_client: DataClient,
    pool: PgPool,
    remaining: AtomicUsize,
}

impl AccountStateProvider {
    pub fn new(data_client: DataClient, pool: PgPool, budget: usize) -> Self {
        Self {
            data_client,
            pool,
            remaining: AtomicUsize::new(budget),
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Relaxed)
    }

    /// Lifetime summary for a wallet. `None` means the wallet is genuinely
    /// unknown everywhere — scorers read that as a brand-new account. Upstream
    /// failure falls back to locally stored trades before giving up.
    pub async fn account_history(&self, wallet: &str) -> Option<AccountHistory> {
        if !self.try_consume() {
            counter!("account_lookups_skipped_total").increment(1);
            return Some(AccountHistory::skipped());
        }

        match self.data_client.get_account_summary(wallet).await {
            Ok(Some(summary)) => Some(summary.into_history()),
            Ok(None) => self.cached_overview(wallet).await,
            Err(e) => {
                tracing::warn!(wallet = %wallet, error = %e, "account lookup failed, trying local cache");
                self.cached_overview(wallet).await
            }
        }
    }

    async fn cached_overview(&self, wallet: &str) -> Option<AccountHistory> {
        match fill_repo::account_overview(&self.pool, wallet).await {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(wallet = %wallet, error = %e, "local account overview failed");
                None
            }
        }
    }

    fn try_consume(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}
