use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::config::ScoringConfig;
use crate::models::AggregatedTrade;

use super::{
    linear, AccountHistoryDetail, HistoryReason, ScoringContext, SignalDetail, SignalName,
    SignalResult,
};

const SECONDS_PER_DAY: i64 = 86_400;

/// Account-history signal (0-100). Brand-new accounts are the headline case:
/// no history at all scores the maximum. A lookup skipped for budget reasons
/// scores a neutral 50 so the skip itself never manufactures an alert.
/// Otherwise four sub-scores (trade count, account age, dormancy, profit)
/// are summed, preferring point-in-time state over the wallet's current
/// global figures so a wallet's later activity cannot leak into the score.
pub fn score_account_history(
    trade: &AggregatedTrade,
    ctx: &ScoringContext,
    cfg: &ScoringConfig,
) -> SignalResult {
    let weight = cfg.weight_account_history;

    let Some(history) = ctx.history.as_ref() else {
        return max_suspicion(weight, ctx);
    };
    if history.is_skipped() {
        return SignalResult {
            name: SignalName::AccountHistory,
            score: Decimal::from(50),
            weight,
            detail: SignalDetail::AccountHistory(AccountHistoryDetail {
                reason: HistoryReason::LookupSkipped,
                trade_count_score: Decimal::ZERO,
                age_score: Decimal::ZERO,
                dormancy_score: Decimal::ZERO,
                profit_score: Decimal::ZERO,
                approximate: false,
            }),
        };
    }
    let Some(first_trade) = history.first_trade_date else {
        return max_suspicion(weight, ctx);
    };

    let state = ctx.historical_state.as_ref();

    // Point-in-time figures when the resolver produced them, global history
    // otherwise.
    let trade_count = state.map(|s| s.trade_count).unwrap_or(history.total_trades);
    let volume = state.map(|s| s.volume_usd).unwrap_or(history.total_volume_usd);
    let profit = state.map(|s| s.pnl_usd).or(history.profit_usd);
    let has_profit = profit.is_some();

    let age_days = days_between(first_trade, trade.timestamp);

    // Three behavioural sub-scores share the headroom left by the profit
    // sub-score: 25 each when profit data exists, 33 each when it does not.
    let sub_max = if has_profit {
        Decimal::from(25)
    } else {
        Decimal::from(33)
    };

    let tc_score = trade_count_score(trade_count, sub_max);
    let age_score = age_score(age_days, cfg.new_account_age_days, sub_max);
    let dormancy_score = dormancy_score(
        last_trade_before(trade, ctx),
        trade.timestamp,
        cfg.dormancy_threshold_days,
        sub_max,
    );

    let (behaviour_total, profit_score) = match profit {
        Some(profit) => {
            let p = profit_score(profit, volume, age_days);
            (tc_score + age_score + dormancy_score, p)
        }
        None => {
            // Volume-bonus substitute: a very new account already pushing
            // serious volume is itself a flag. The bonus takes the profit
            // slot, so the other three shrink to keep the total within 100.
            let very_new = age_days < Decimal::from(30);
            let big_volume = volume > Decimal::from(10_000);
            if very_new && big_volume {
                let shrink = Decimal::new(75, 2);
                (
                    (tc_score + age_score + dormancy_score) * shrink,
                    Decimal::from(25),
                )
            } else {
                (tc_score + age_score + dormancy_score, Decimal::ZERO)
            }
        }
    };

    let total = (behaviour_total + profit_score).min(Decimal::ONE_HUNDRED);

    SignalResult {
        name: SignalName::AccountHistory,
        score: total,
        weight,
        detail: SignalDetail::AccountHistory(AccountHistoryDetail {
            reason: HistoryReason::Scored,
            trade_count_score: tc_score,
            age_score,
            dormancy_score,
            profit_score,
            approximate: state.map(|s| s.approximate).unwrap_or(false),
        }),
    }
}

fn max_suspicion(weight: Decimal, ctx: &ScoringContext) -> SignalResult {
    SignalResult {
        name: SignalName::AccountHistory,
        score: Decimal::ONE_HUNDRED,
        weight,
        detail: SignalDetail::AccountHistory(AccountHistoryDetail {
            reason: HistoryReason::NoHistory,
            trade_count_score: Decimal::ZERO,
            age_score: Decimal::ZERO,
            dormancy_score: Decimal::ZERO,
            profit_score: Decimal::ZERO,
            approximate: ctx
                .historical_state
                .as_ref()
                .map(|s| s.approximate)
                .unwrap_or(false),
        }),
    }
}

/// 1 trade scores the full sub-maximum, 2-5 trades land between 90% and 70%
/// of it, 6-50 decay linearly to zero, anything past that scores nothing.
fn trade_count_score(count: i64, max: Decimal) -> Decimal {
    let count_dec = Decimal::from(count.max(0));
    if count <= 1 {
        max
    } else if count <= 5 {
        linear(
            count_dec,
            Decimal::from(2),
            Decimal::from(5),
            Decimal::new(9, 1) * max,
            Decimal::new(7, 1) * max,
        )
    } else if count < 50 {
        linear(
            count_dec,
            Decimal::from(6),
            Decimal::from(50),
            Decimal::new(7, 1) * max,
            Decimal::ZERO,
        )
    } else {
        Decimal::ZERO
    }
}

/// Full sub-maximum up to the new-account threshold, zero from twelve times
/// the threshold, linear in between.
fn age_score(age_days: Decimal, threshold_days: i64, max: Decimal) -> Decimal {
    let threshold = Decimal::from(threshold_days);
    let floor = threshold * Decimal::from(12);
    if age_days <= threshold {
        max
    } else if age_days >= floor {
        Decimal::ZERO
    } else {
        linear(age_days, threshold, floor, max, Decimal::ZERO)
    }
}

/// A long-idle wallet suddenly trading is suspicious: zero below the
/// threshold, then linear up to the full sub-maximum at six times it. Uses
/// the last trade strictly before this one; no prior trade means no dormancy.
fn dormancy_score(
    last_trade: Option<DateTime<Utc>>,
    trade_ts: DateTime<Utc>,
    threshold_days: i64,
    max: Decimal,
) -> Decimal {
    let Some(last_trade) = last_trade else {
        return Decimal::ZERO;
    };
    let dormancy = days_between(last_trade, trade_ts);
    let threshold = Decimal::from(threshold_days);
    if dormancy < threshold {
        Decimal::ZERO
    } else {
        linear(
            dormancy,
            threshold,
            threshold * Decimal::from(6),
            Decimal::ZERO,
            max,
        )
    }
}

/// Positive profit on a young account (≤90 days), banded by realized
/// profit-rate-of-volume. Losses and seasoned accounts score zero. When the
/// rate is unimpressive but the absolute profit is large, a small flat bonus
/// applies.
fn profit_score(profit: Decimal, volume: Decimal, age_days: Decimal) -> Decimal {
    if profit <= Decimal::ZERO || age_days > Decimal::from(90) {
        return Decimal::ZERO;
    }
    let rate = if volume > Decimal::ZERO {
        profit / volume * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };
    if rate > Decimal::from(50) {
        Decimal::from(25)
    } else if rate > Decimal::from(30) {
        Decimal::from(20)
    } else if rate > Decimal::from(20) {
        Decimal::from(15)
    } else if rate > Decimal::from(10) {
        Decimal::from(10)
    } else if profit >= Decimal::from(10_000) {
        Decimal::from(5)
    } else {
        Decimal::ZERO
    }
}

/// The last trade strictly before this one. Point-in-time state already
/// bounds its figure correctly; the global last-trade date only counts when
/// it actually precedes the trade under analysis.
fn last_trade_before(trade: &AggregatedTrade, ctx: &ScoringContext) -> Option<DateTime<Utc>> {
    if let Some(state) = ctx.historical_state.as_ref() {
        return state.last_trade_at;
    }
    ctx.history
        .as_ref()
        .and_then(|h| h.last_trade_date)
        .filter(|last| *last < trade.timestamp)
}

fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> Decimal {
    let seconds = (later - earlier).num_seconds().max(0);
    Decimal::from(seconds) / Decimal::from(SECONDS_PER_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountHistory, DataSource, HistoricalState, Outcome, Side};
    use chrono::{Duration, TimeZone};

    fn cfg() -> ScoringConfig {
        ScoringConfig::default()
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn trade() -> AggregatedTrade {
        AggregatedTrade {
            transaction_hash: "t1".into(),
            market_id: "m1".into(),
            wallet: "0xabc".into(),
            side: Side::Buy,
            outcome: Outcome::Yes,
            total_size: Decimal::from(10_000),
            total_value_usd: Decimal::from(5_000),
            avg_price: Decimal::new(5, 1),
            timestamp: now(),
            fills: vec![],
            had_complementary_fills: false,
            complementary_value_usd: None,
        }
    }

    fn history(total_trades: i64, age_days: i64, volume: i64) -> AccountHistory {
        AccountHistory {
            total_trades,
            first_trade_date: Some(now() - Duration::days(age_days)),
            last_trade_date: Some(now() - Duration::days(1)),
            creation_date: None,
            total_volume_usd: Decimal::from(volume),
            profit_usd: None,
            data_source: DataSource::Api,
        }
    }

    fn score(ctx: &ScoringContext) -> Decimal {
        score_account_history(&trade(), ctx, &cfg()).score
    }

    #[test]
    fn test_no_history_scores_maximum() {
        let result = score_account_history(&trade(), &ScoringContext::default(), &cfg());
        assert_eq!(result.score, Decimal::ONE_HUNDRED);
        match result.detail {
            SignalDetail::AccountHistory(d) => assert_eq!(d.reason, HistoryReason::NoHistory),
            _ => panic!("wrong detail variant"),
        }
    }

    #[test]
    fn test_missing_first_trade_date_scores_maximum() {
        let mut h = history(10, 5, 50_000);
        h.first_trade_date = None;
        let ctx = ScoringContext {
            history: Some(h),
            ..Default::default()
        };
        assert_eq!(score(&ctx), Decimal::ONE_HUNDRED);
    }

    #[test]
    fn test_skipped_lookup_scores_neutral() {
        let ctx = ScoringContext {
            history: Some(AccountHistory::skipped()),
            ..Default::default()
        };
        let result = score_account_history(&trade(), &ctx, &cfg());
        assert_eq!(result.score, Decimal::from(50));
        match result.detail {
            SignalDetail::AccountHistory(d) => assert_eq!(d.reason, HistoryReason::LookupSkipped),
            _ => panic!("wrong detail variant"),
        }
    }

    #[test]
    fn test_brand_new_single_trade_account_scores_high() {
        // 1 prior trade, 2 days old, modest volume, no profit data:
        // trade-count and age sub-scores both max out at 33.
        let ctx = ScoringContext {
            history: Some(history(1, 2, 500)),
            ..Default::default()
        };
        assert_eq!(score(&ctx), Decimal::from(66));
    }

    #[test]
    fn test_seasoned_account_scores_low() {
        let ctx = ScoringContext {
            history: Some(history(200, 720, 1_000_000)),
            ..Default::default()
        };
        assert_eq!(score(&ctx), Decimal::ZERO);
    }

    #[test]
    fn test_trade_count_decay_is_monotonic() {
        let max = Decimal::from(33);
        let counts = [1_i64, 2, 5, 6, 20, 49, 50, 500];
        let scores: Vec<Decimal> = counts.iter().map(|&c| trade_count_score(c, max)).collect();
        for pair in scores.windows(2) {
            assert!(pair[0] >= pair[1], "score must not increase with count");
        }
        assert_eq!(scores[0], max);
        assert_eq!(scores[scores.len() - 1], Decimal::ZERO);
    }

    #[test]
    fn test_age_decay_endpoints() {
        let max = Decimal::from(25);
        assert_eq!(age_score(Decimal::from(30), 30, max), max);
        assert_eq!(age_score(Decimal::from(360), 30, max), Decimal::ZERO);
        let mid = age_score(Decimal::from(195), 30, max);
        assert!(mid > Decimal::ZERO && mid < max);
    }

    #[test]
    fn test_dormancy_below_threshold_is_zero() {
        let last = now() - Duration::days(10);
        assert_eq!(dormancy_score(Some(last), now(), 30, Decimal::from(33)), Decimal::ZERO);
    }

    #[test]
    fn test_dormancy_scales_and_caps() {
        let max = Decimal::from(33);
        let at_cap = dormancy_score(Some(now() - Duration::days(180)), now(), 30, max);
        assert_eq!(at_cap, max);
        let beyond = dormancy_score(Some(now() - Duration::days(400)), now(), 30, max);
        assert_eq!(beyond, max);
        let partial = dormancy_score(Some(now() - Duration::days(105)), now(), 30, max);
        assert_eq!(partial, Decimal::new(165, 1));
    }

    #[test]
    fn test_no_prior_trade_means_no_dormancy() {
        assert_eq!(dormancy_score(None, now(), 30, Decimal::from(33)), Decimal::ZERO);
    }

    #[test]
    fn test_global_last_trade_after_current_is_ignored() {
        // Wallet traded again *after* the analyzed trade; that later date
        // must not produce a (negative) dormancy figure.
        let mut h = history(10, 400, 50_000);
        h.last_trade_date = Some(now() + Duration::days(3));
        let ctx = ScoringContext {
            history: Some(h),
            ..Default::default()
        };
        let result = score_account_history(&trade(), &ctx, &cfg());
        match result.detail {
            SignalDetail::AccountHistory(d) => assert_eq!(d.dormancy_score, Decimal::ZERO),
            _ => panic!("wrong detail variant"),
        }
    }

    #[test]
    fn test_point_in_time_state_preferred_over_global() {
        // Globally the wallet looks seasoned; as of the trade it had made a
        // single prior bet. The point-in-time view must win.
        let state = HistoricalState {
            trade_count: 1,
            volume_usd: Decimal::from(200),
            pnl_usd: Decimal::ZERO,
            last_trade_at: Some(now() - Duration::days(2)),
            approximate: false,
        };
        let ctx_state = ScoringContext {
            history: Some(history(500, 3, 2_000_000)),
            historical_state: Some(state),
            ..Default::default()
        };
        let ctx_global = ScoringContext {
            history: Some(history(500, 3, 2_000_000)),
            ..Default::default()
        };
        let result = score_account_history(&trade(), &ctx_state, &cfg());
        match &result.detail {
            SignalDetail::AccountHistory(d) => {
                assert_eq!(d.trade_count_score, Decimal::from(25));
            }
            _ => panic!("wrong detail variant"),
        }
        assert!(result.score > score(&ctx_global));
    }

    #[test]
    fn test_profit_bands() {
        let age = Decimal::from(10);
        let volume = Decimal::from(10_000);
        assert_eq!(profit_score(Decimal::from(6_000), volume, age), Decimal::from(25));
        assert_eq!(profit_score(Decimal::from(4_000), volume, age), Decimal::from(20));
        assert_eq!(profit_score(Decimal::from(2_500), volume, age), Decimal::from(15));
        assert_eq!(profit_score(Decimal::from(1_500), volume, age), Decimal::from(10));
        assert_eq!(profit_score(Decimal::from(500), volume, age), Decimal::ZERO);
    }

    #[test]
    fn test_large_absolute_profit_gets_flat_bonus() {
        let got = profit_score(
            Decimal::from(15_000),
            Decimal::from(1_000_000),
            Decimal::from(20),
        );
        assert_eq!(got, Decimal::from(5));
    }

    #[test]
    fn test_losses_and_old_accounts_earn_no_profit_score() {
        let volume = Decimal::from(10_000);
        assert_eq!(
            profit_score(Decimal::from(-2_000), volume, Decimal::from(10)),
            Decimal::ZERO
        );
        assert_eq!(
            profit_score(Decimal::from(6_000), volume, Decimal::from(120)),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_volume_bonus_substitute_keeps_total_within_100() {
        // New single-trade account, big volume, no profit data: the three
        // behavioural scores shrink to 75% and the bonus fills the gap.
        let ctx = ScoringContext {
            history: Some(history(1, 2, 50_000)),
            ..Default::default()
        };
        let result = score_account_history(&trade(), &ctx, &cfg());
        // (33 + 33 + 0) * 0.75 + 25 = 74.5
        assert_eq!(result.score, Decimal::new(745, 1));
        assert!(result.score <= Decimal::ONE_HUNDRED);
    }

    #[test]
    fn test_approximate_flag_carried_through() {
        let state = HistoricalState {
            trade_count: 3,
            volume_usd: Decimal::from(1_000),
            pnl_usd: Decimal::from(100),
            last_trade_at: Some(now() - Duration::days(1)),
            approximate: true,
        };
        let ctx = ScoringContext {
            history: Some(history(3, 10, 1_000)),
            historical_state: Some(state),
            ..Default::default()
        };
        let result = score_account_history(&trade(), &ctx, &cfg());
        match result.detail {
            SignalDetail::AccountHistory(d) => assert!(d.approximate),
            _ => panic!("wrong detail variant"),
        }
    }
}
