use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use metrics::{counter, histogram};
use serde::Serialize;
use sqlx::PgPool;
use tokio::time::sleep;

use crate::config::AppConfig;
use crate::db::{alert_repo, fill_repo};
use crate::history::{RequestedRange, StateResolver};
use crate::intelligence::signals::{account_history, conviction, size_impact, ScoringContext};
use crate::intelligence::{aggregate_fills, classify_trade, combine_signals, ScoredTrade};
use crate::models::{AccountHistory, Outcome, PricePoint, RawFill, WalletPosition};
use crate::polymarket::{DataClient, GammaClient, PriceClient};
use crate::services::account_state::AccountStateProvider;
use crate::services::backfill::BackfillService;

/// Bound on concurrent upstream account lookups during one scan.
const ACCOUNT_FETCH_CONCURRENCY: usize = 8;

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub market_id: String,
    pub fills_seen: usize,
    pub trades_aggregated: usize,
    pub trades_scored: usize,
    pub alerts: usize,
    /// Scored trades, highest suspicion first.
    pub results: Vec<ScoredTrade>,
}

impl ScanReport {
    fn empty(market_id: &str) -> Self {
        Self {
            market_id: market_id.to_string(),
            fills_seen: 0,
            trades_aggregated: 0,
            trades_scored: 0,
            alerts: 0,
            results: Vec::new(),
        }
    }
}

/// One full pass over a market: refresh fill coverage, reconstruct trades,
/// score and classify each one, persist the results ranked.
pub struct ScanService {
    pool: PgPool,
    data_client: DataClient,
    gamma_client: GammaClient,
    price_client: PriceClient,
    backfill: BackfillService,
    resolver: StateResolver,
    config: AppConfig,
}

impl ScanService {
    pub fn new(
        pool: PgPool,
        data_client: DataClient,
        gamma_client: GammaClient,
        price_client: PriceClient,
        config: AppConfig,
    ) -> Self {
        let sync_ttl = chrono::Duration::minutes(config.sync_ttl_minutes);
        let backfill = BackfillService::new(data_client.clone(), pool.clone(), sync_ttl);
        let resolver = StateResolver::new(pool.clone(), sync_ttl);
        Self {
            pool,
            data_client,
            gamma_client,
            price_client,
            backfill,
            resolver,
            config,
        }
    }

    /// Scan one market. Upstream unavailability degrades to an empty report;
    /// only local persistence failures surface as errors.
    pub async fn scan_market(&self, condition_id: &str) -> anyhow::Result<ScanReport> {
        let started = Instant::now();
        counter!("scans_total").increment(1);

        // Without the token->outcome map nothing can be attributed.
        let market = match self.gamma_client.get_market(condition_id).await {
            Ok(Some(m)) => m,
            Ok(None) => {
                tracing::warn!(market = %condition_id, "market unknown to metadata API, skipping");
                return Ok(ScanReport::empty(condition_id));
            }
            Err(e) => {
                tracing::warn!(market = %condition_id, error = %e, "market metadata fetch failed, skipping");
                return Ok(ScanReport::empty(condition_id));
            }
        };
        let token_outcomes = market.token_outcomes();
        if token_outcomes.is_empty() {
            tracing::warn!(market = %condition_id, "no resolvable outcome tokens, skipping");
            return Ok(ScanReport::empty(condition_id));
        }
        let market_created_at = market.created_at_utc();

        // Bring stored fills up to date, then work entirely off storage.
        let now = Utc::now();
        let window_start = now - chrono::Duration::hours(self.config.scan_lookback_hours);
        self.backfill
            .ensure_market_coverage(condition_id, RequestedRange::between(window_start, now))
            .await?;

        let fills =
            fill_repo::get_fills_for_market(&self.pool, condition_id, Some(window_start), Some(now))
                .await?;
        if fills.is_empty() {
            tracing::info!(market = %condition_id, "no fills in scan window");
            return Ok(ScanReport::empty(condition_id));
        }

        // Price series per outcome token, fetched fan-out; one token failing
        // degrades that token to "no impact data" without touching the rest.
        let impact_window = chrono::Duration::seconds(self.config.scoring.impact_window_secs);
        let price_series = self
            .fetch_price_series(
                token_outcomes.keys(),
                window_start - impact_window,
                now,
            )
            .await;

        let mut trades = Vec::new();
        for wallet in involved_wallets(&fills, &token_outcomes) {
            let positions = if has_hedge_candidate(&fills, &wallet, &token_outcomes) {
                self.fetch_positions(&wallet).await
            } else {
                Vec::new()
            };
            trades.extend(aggregate_fills(
                &fills,
                &wallet,
                condition_id,
                &token_outcomes,
                &positions,
            ));
        }
        let trades_aggregated = trades.len();
        counter!("trades_aggregated_total").increment(trades_aggregated as u64);

        // Only notable trades are scored and persisted.
        trades.retain(|t| t.total_value_usd >= self.config.scoring.min_trade_value_usd);

        let mut scoring_wallets: Vec<String> = trades
            .iter()
            .map(|t| t.wallet.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        scoring_wallets.sort();

        // Wallet history feeds point-in-time state; a wallet that cannot be
        // refreshed is scored off whatever is already stored.
        for wallet in &scoring_wallets {
            if let Err(e) = self
                .backfill
                .ensure_wallet_coverage(wallet, RequestedRange::until(now))
                .await
            {
                tracing::warn!(wallet = %wallet, error = %e, "wallet history refresh failed");
            }
        }

        let provider = AccountStateProvider::new(
            self.data_client.clone(),
            self.pool.clone(),
            self.config.account_lookup_budget,
        );
        let histories: HashMap<String, Option<AccountHistory>> =
            stream::iter(scoring_wallets.iter().cloned())
                .map(|wallet| {
                    let provider = &provider;
                    async move {
                        let history = provider.account_history(&wallet).await;
                        (wallet, history)
                    }
                })
                .buffer_unordered(ACCOUNT_FETCH_CONCURRENCY)
                .collect()
                .await;
        tracing::debug!(
            wallets = scoring_wallets.len(),
            budget_left = provider.remaining(),
            "account histories resolved"
        );

        let outcome_tokens: HashMap<Outcome, String> = token_outcomes
            .iter()
            .map(|(token, outcome)| (*outcome, token.clone()))
            .collect();

        let mut results = Vec::new();
        let mut alerts = 0usize;
        for trade in trades {
            let historical_state = match self.resolver.state_at(&trade.wallet, trade.timestamp).await
            {
                Ok(state) => Some(state),
                Err(e) => {
                    tracing::warn!(wallet = %trade.wallet, error = %e, "point-in-time state failed");
                    None
                }
            };

            let series = outcome_tokens
                .get(&trade.outcome)
                .and_then(|token| price_series.get(token))
                .map(|s| s.as_slice())
                .unwrap_or(&[]);
            let (price_before, price_after) =
                size_impact::select_price_window(series, trade.timestamp, impact_window);

            let ctx = ScoringContext {
                history: histories.get(&trade.wallet).cloned().flatten(),
                historical_state,
                price_before,
                price_after,
                market_created_at,
            };

            let signals = vec![
                size_impact::score_size_impact(&trade, &ctx, &self.config.scoring),
                account_history::score_account_history(&trade, &ctx, &self.config.scoring),
                conviction::score_conviction(&trade, &ctx, &self.config.scoring),
            ];
            let score = combine_signals(signals, self.config.scoring.alert_threshold);
            let signed_impact =
                size_impact::signed_impact_pct(ctx.price_before.as_ref(), ctx.price_after.as_ref());
            let tags = classify_trade(
                &trade,
                score.total,
                signed_impact,
                market_created_at,
                &self.config.classifier,
            );

            counter!("trades_scored_total").increment(1);
            if score.is_alert {
                alerts += 1;
                counter!("alerts_total").increment(1);
                tracing::info!(
                    market = %condition_id,
                    wallet = %trade.wallet,
                    tx = %trade.transaction_hash,
                    score = %score.total,
                    "alert-qualifying trade"
                );
            }

            let scored = ScoredTrade {
                trade,
                score,
                tags,
                price_impact_pct: signed_impact,
            };
            alert_repo::upsert_scored_trade(&self.pool, &scored).await?;
            results.push(scored);
        }

        results.sort_by(|a, b| {
            b.score
                .total
                .cmp(&a.score.total)
                .then_with(|| b.trade.timestamp.cmp(&a.trade.timestamp))
        });

        histogram!("scan_latency_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(
            market = %condition_id,
            fills = fills.len(),
            aggregated = trades_aggregated,
            scored = results.len(),
            alerts = alerts,
            "scan complete"
        );

        Ok(ScanReport {
            market_id: condition_id.to_string(),
            fills_seen: fills.len(),
            trades_aggregated,
            trades_scored: results.len(),
            alerts,
            results,
        })
    }

    async fn fetch_price_series<'a>(
        &self,
        tokens: impl Iterator<Item = &'a String>,
        start: chrono::DateTime<Utc>,
        end: chrono::DateTime<Utc>,
    ) -> HashMap<String, Vec<PricePoint>> {
        let futures = tokens.map(|token| async move {
            let series = match self.price_client.get_price_history(token, start, end).await {
                Ok(series) => series,
                Err(e) => {
                    tracing::warn!(token = %token, error = %e, "price history fetch failed");
                    Vec::new()
                }
            };
            (token.clone(), series)
        });
        futures_util::future::join_all(futures)
            .await
            .into_iter()
            .collect()
    }

    async fn fetch_positions(&self, wallet: &str) -> Vec<WalletPosition> {
        match self.data_client.get_positions(wallet).await {
            Ok(positions) => positions
                .into_iter()
                .filter_map(|p| p.into_position())
                .collect(),
            Err(e) => {
                tracing::warn!(wallet = %wallet, error = %e, "positions fetch failed");
                Vec::new()
            }
        }
    }
}

/// Every wallet touching a fill on a known outcome token, deduplicated and
/// in a fixed order.
fn involved_wallets(fills: &[RawFill], token_outcomes: &HashMap<String, Outcome>) -> Vec<String> {
    let mut wallets: Vec<String> = fills
        .iter()
        .filter(|f| token_outcomes.contains_key(&f.market_token))
        .flat_map(|f| [f.maker.to_lowercase(), f.taker.to_lowercase()])
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    wallets.sort();
    wallets
}

/// Whether any transaction has this wallet on both outcome legs — only then
/// are positions worth fetching to disambiguate the hedge.
fn has_hedge_candidate(
    fills: &[RawFill],
    wallet: &str,
    token_outcomes: &HashMap<String, Outcome>,
) -> bool {
    let mut tx_legs: HashMap<&str, (bool, bool)> = HashMap::new();
    for fill in fills {
        if !(fill.maker.eq_ignore_ascii_case(wallet) || fill.taker.eq_ignore_ascii_case(wallet)) {
            continue;
        }
        let Some(outcome) = token_outcomes.get(&fill.market_token) else {
            continue;
        };
        let legs = tx_legs.entry(fill.transaction_hash.as_str()).or_default();
        match outcome {
            Outcome::Yes => legs.0 = true,
            Outcome::No => legs.1 = true,
        }
        if legs.0 && legs.1 {
            return true;
        }
    }
    false
}

/// Periodic scan over the configured watchlist. Never returns; individual
/// scan failures are logged and the loop moves on.
pub async fn run_scan_loop(scan: Arc<ScanService>, markets: Vec<String>, interval_secs: u64) {
    tracing::info!(
        markets = markets.len(),
        interval_secs = interval_secs,
        "scan loop started"
    );

    loop {
        for market in &markets {
            match scan.scan_market(market).await {
                Ok(report) => {
                    tracing::debug!(
                        market = %market,
                        scored = report.trades_scored,
                        alerts = report.alerts,
                        "scheduled scan finished"
                    );
                }
                Err(e) => {
                    counter!("scan_failures_total").increment(1);
                    tracing::error!(market = %market, error = %e, "scheduled scan failed");
                }
            }
        }
        sleep(Duration::from_secs(interval_secs)).await;
    }
}
