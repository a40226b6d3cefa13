//! End-to-end pipeline tests: raw fills -> aggregation -> signals -> combined
//! score -> tags, with every collaborator input built by hand. No database or
//! network involved; this is the scoring pipeline as pure functions.

use std::collections::HashMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use polysleuth::config::{ClassifierConfig, ScoringConfig};
use polysleuth::intelligence::signals::{
    account_history, conviction, size_impact, HistoryReason, ScoringContext, SignalDetail,
};
use polysleuth::intelligence::{aggregate_fills, classify_trade, combine_signals, Tag};
use polysleuth::models::{
    AccountHistory, DataSource, HistoricalState, Outcome, PricePoint, RawFill, Side,
    WalletPosition,
};

const YES_TOKEN: &str = "token_yes";
const NO_TOKEN: &str = "token_no";

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn token_outcomes() -> HashMap<String, Outcome> {
    HashMap::from([
        (YES_TOKEN.to_string(), Outcome::Yes),
        (NO_TOKEN.to_string(), Outcome::No),
    ])
}

fn fill(
    id: &str,
    tx: &str,
    token: &str,
    maker: &str,
    taker: &str,
    side: Side,
    value: i64,
    price: Decimal,
    at: DateTime<Utc>,
) -> RawFill {
    RawFill {
        id: id.into(),
        transaction_hash: tx.into(),
        timestamp: at,
        maker: maker.into(),
        taker: taker.into(),
        market_token: token.into(),
        side,
        value_usd: Decimal::from(value),
        price,
    }
}

fn fresh_history(first_trade: DateTime<Utc>) -> AccountHistory {
    AccountHistory {
        total_trades: 1,
        first_trade_date: Some(first_trade),
        last_trade_date: Some(first_trade),
        total_volume_usd: Decimal::from(5_000),
        creation_date: None,
        profit_usd: None,
        data_source: DataSource::Api,
    }
}

// ---------------------------------------------------------------------------
// Reference scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_taker_sell_fill_inverts_to_sell_trade() {
    // Raw side BUY describes the maker; the taker took the other side.
    let fills = vec![fill(
        "f1",
        "t1",
        YES_TOKEN,
        "0xB",
        "0xA",
        Side::Buy,
        5_000,
        Decimal::new(5, 1),
        ts(0),
    )];

    let trades = aggregate_fills(&fills, "0xA", "mkt", &token_outcomes(), &[]);

    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].side, Side::Sell);
    assert_eq!(trades[0].outcome, Outcome::Yes);
    assert_eq!(trades[0].total_value_usd, Decimal::from(5_000));
}

#[test]
fn test_twenty_percent_concentration_scores_between_40_and_70() {
    let fills = vec![fill(
        "f1",
        "t1",
        YES_TOKEN,
        "0xB",
        "0xA",
        Side::Sell,
        10_000,
        Decimal::new(5, 1),
        ts(0),
    )];
    let trades = aggregate_fills(&fills, "0xA", "mkt", &token_outcomes(), &[]);
    let trade = &trades[0];

    let ctx = ScoringContext {
        historical_state: Some(HistoricalState {
            trade_count: 20,
            volume_usd: Decimal::from(50_000),
            pnl_usd: Decimal::ZERO,
            last_trade_at: Some(ts(-86_400)),
            approximate: false,
        }),
        ..Default::default()
    };

    let result = conviction::score_conviction(trade, &ctx, &ScoringConfig::default());
    assert!(result.score > Decimal::from(40), "got {}", result.score);
    assert!(result.score < Decimal::from(70), "got {}", result.score);
}

#[test]
fn test_null_first_trade_date_scores_one_hundred() {
    let fills = vec![fill(
        "f1",
        "t1",
        YES_TOKEN,
        "0xB",
        "0xA",
        Side::Buy,
        5_000,
        Decimal::new(5, 1),
        ts(0),
    )];
    let trades = aggregate_fills(&fills, "0xA", "mkt", &token_outcomes(), &[]);

    let ctx = ScoringContext {
        history: Some(AccountHistory {
            total_trades: 40,
            first_trade_date: None,
            last_trade_date: Some(ts(-3_600)),
            total_volume_usd: Decimal::from(90_000),
            creation_date: None,
            profit_usd: Some(Decimal::from(1_000)),
            data_source: DataSource::Api,
        }),
        ..Default::default()
    };

    let result =
        account_history::score_account_history(&trades[0], &ctx, &ScoringConfig::default());
    assert_eq!(result.score, Decimal::ONE_HUNDRED);
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

#[test]
fn test_fresh_wallet_concentrated_bet_with_impact_alerts() {
    let trade_ts = ts(0);
    let scoring = ScoringConfig::default();
    let classifier = ClassifierConfig::default();

    // Taker buys 50k YES shares for $20k; raw side is the maker's SELL.
    let fills = vec![fill(
        "f1",
        "t1",
        YES_TOKEN,
        "0xMAKER",
        "0xFRESH",
        Side::Sell,
        20_000,
        Decimal::new(4, 1),
        trade_ts,
    )];
    let trades = aggregate_fills(&fills, "0xFRESH", "mkt", &token_outcomes(), &[]);
    assert_eq!(trades.len(), 1);
    let trade = trades.into_iter().next().unwrap();
    assert_eq!(trade.side, Side::Buy);
    assert_eq!(trade.total_size, Decimal::from(50_000));

    // Price moved 0.40 -> 0.50 across the trade.
    let series = vec![
        PricePoint {
            timestamp: trade_ts - Duration::minutes(10),
            price: Decimal::new(40, 2),
        },
        PricePoint {
            timestamp: trade_ts + Duration::minutes(10),
            price: Decimal::new(50, 2),
        },
    ];
    let (before, after) = size_impact::select_price_window(
        &series,
        trade_ts,
        Duration::seconds(scoring.impact_window_secs),
    );
    assert!(before.is_some() && after.is_some());

    let ctx = ScoringContext {
        history: Some(fresh_history(trade_ts - Duration::days(2))),
        historical_state: Some(HistoricalState {
            trade_count: 1,
            volume_usd: Decimal::from(5_000),
            pnl_usd: Decimal::ZERO,
            last_trade_at: None,
            approximate: false,
        }),
        price_before: before,
        price_after: after,
        market_created_at: Some(trade_ts - Duration::hours(1)),
    };

    let signals = vec![
        size_impact::score_size_impact(&trade, &ctx, &scoring),
        account_history::score_account_history(&trade, &ctx, &scoring),
        conviction::score_conviction(&trade, &ctx, &scoring),
    ];

    // Size 50 + impact 50 (25% move) = 100; history 25+25+0+0 = 50 off
    // point-in-time state; conviction 400% concentration = 100.
    // (100*40 + 50*35 + 100*25) / 100 = 82.5 -> 83.
    let score = combine_signals(signals, scoring.alert_threshold);
    assert_eq!(score.total, Decimal::from(83));
    assert!(score.is_alert);

    let impact = size_impact::signed_impact_pct(ctx.price_before.as_ref(), ctx.price_after.as_ref());
    assert_eq!(impact, Some(Decimal::from(25)));

    let tags = classify_trade(&trade, score.total, impact, ctx.market_created_at, &classifier);
    assert_eq!(tags, vec![Tag::Sniper, Tag::EarlyMover]);
}

#[test]
fn test_established_wallet_routine_trade_stays_quiet() {
    let trade_ts = ts(0);
    let scoring = ScoringConfig::default();
    let classifier = ClassifierConfig::default();

    let fills = vec![fill(
        "f1",
        "t1",
        YES_TOKEN,
        "0xVET",
        "0xOther",
        Side::Buy,
        1_500,
        Decimal::new(6, 1),
        trade_ts,
    )];
    let trades = aggregate_fills(&fills, "0xVET", "mkt", &token_outcomes(), &[]);
    let trade = trades.into_iter().next().unwrap();
    // Maker keeps the raw side.
    assert_eq!(trade.side, Side::Buy);

    let ctx = ScoringContext {
        history: Some(AccountHistory {
            total_trades: 200,
            first_trade_date: Some(trade_ts - Duration::days(400)),
            last_trade_date: Some(trade_ts - Duration::days(1)),
            total_volume_usd: Decimal::from(1_000_000),
            creation_date: None,
            profit_usd: Some(Decimal::from(-2_000)),
            data_source: DataSource::Api,
        }),
        historical_state: Some(HistoricalState {
            trade_count: 200,
            volume_usd: Decimal::from(1_000_000),
            pnl_usd: Decimal::from(-2_000),
            last_trade_at: Some(trade_ts - Duration::days(1)),
            approximate: false,
        }),
        ..Default::default()
    };

    let signals = vec![
        size_impact::score_size_impact(&trade, &ctx, &scoring),
        account_history::score_account_history(&trade, &ctx, &scoring),
        conviction::score_conviction(&trade, &ctx, &scoring),
    ];
    let score = combine_signals(signals, scoring.alert_threshold);

    assert!(score.total < Decimal::from(40), "got {}", score.total);
    assert!(!score.is_alert);

    let tags = classify_trade(&trade, score.total, None, None, &classifier);
    assert!(tags.is_empty());
}

#[test]
fn test_hedged_mint_keeps_held_leg_and_flags_it() {
    let trade_ts = ts(0);

    // One transaction, both outcome legs, wallet takes both. The wallet
    // holds only YES, so the NO leg is the hedge.
    let fills = vec![
        fill(
            "f1",
            "t9",
            YES_TOKEN,
            "0xM",
            "0xW",
            Side::Sell,
            6_000,
            Decimal::new(6, 1),
            trade_ts,
        ),
        fill(
            "f2",
            "t9",
            NO_TOKEN,
            "0xM",
            "0xW",
            Side::Sell,
            4_000,
            Decimal::new(4, 1),
            trade_ts,
        ),
    ];
    let positions = vec![WalletPosition {
        token_id: YES_TOKEN.into(),
        size: Decimal::from(100),
    }];

    let trades = aggregate_fills(&fills, "0xW", "mkt", &token_outcomes(), &positions);

    assert_eq!(trades.len(), 1);
    let trade = &trades[0];
    assert_eq!(trade.outcome, Outcome::Yes);
    assert_eq!(trade.total_value_usd, Decimal::from(6_000));
    assert!(trade.had_complementary_fills);
    assert_eq!(trade.complementary_value_usd, Some(Decimal::from(4_000)));
}

#[test]
fn test_hedged_mint_without_positions_drops_smaller_leg() {
    let trade_ts = ts(0);

    let fills = vec![
        fill(
            "f1",
            "t9",
            YES_TOKEN,
            "0xM",
            "0xW",
            Side::Sell,
            3_000,
            Decimal::new(6, 1),
            trade_ts,
        ),
        fill(
            "f2",
            "t9",
            NO_TOKEN,
            "0xM",
            "0xW",
            Side::Sell,
            7_000,
            Decimal::new(4, 1),
            trade_ts,
        ),
    ];

    let trades = aggregate_fills(&fills, "0xW", "mkt", &token_outcomes(), &[]);

    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].outcome, Outcome::No);
    assert_eq!(trades[0].total_value_usd, Decimal::from(7_000));
    assert!(trades[0].had_complementary_fills);
}

#[test]
fn test_budget_skip_scores_neutral_not_suspicious() {
    let fills = vec![fill(
        "f1",
        "t1",
        YES_TOKEN,
        "0xB",
        "0xA",
        Side::Buy,
        5_000,
        Decimal::new(5, 1),
        ts(0),
    )];
    let trades = aggregate_fills(&fills, "0xA", "mkt", &token_outcomes(), &[]);

    let ctx = ScoringContext {
        history: Some(AccountHistory::skipped()),
        ..Default::default()
    };
    let result =
        account_history::score_account_history(&trades[0], &ctx, &ScoringConfig::default());

    assert_eq!(result.score, Decimal::from(50));
    match &result.detail {
        SignalDetail::AccountHistory(d) => assert_eq!(d.reason, HistoryReason::LookupSkipped),
        other => panic!("unexpected detail: {other:?}"),
    }
}

#[test]
fn test_below_floor_trade_scores_zero_on_size() {
    let fills = vec![fill(
        "f1",
        "t1",
        YES_TOKEN,
        "0xB",
        "0xA",
        Side::Buy,
        500,
        Decimal::new(5, 1),
        ts(0),
    )];
    let trades = aggregate_fills(&fills, "0xA", "mkt", &token_outcomes(), &[]);

    let result = size_impact::score_size_impact(
        &trades[0],
        &ScoringContext::default(),
        &ScoringConfig::default(),
    );
    assert_eq!(result.score, Decimal::ZERO);
}

#[test]
fn test_approximate_state_is_carried_through_the_score() {
    let fills = vec![fill(
        "f1",
        "t1",
        YES_TOKEN,
        "0xB",
        "0xA",
        Side::Buy,
        5_000,
        Decimal::new(5, 1),
        ts(0),
    )];
    let trades = aggregate_fills(&fills, "0xA", "mkt", &token_outcomes(), &[]);
    let scoring = ScoringConfig::default();

    let ctx = ScoringContext {
        history: Some(fresh_history(ts(0) - Duration::days(3))),
        historical_state: Some(HistoricalState {
            trade_count: 2,
            volume_usd: Decimal::from(1_000),
            pnl_usd: Decimal::ZERO,
            last_trade_at: None,
            approximate: true,
        }),
        ..Default::default()
    };

    let signals = vec![
        size_impact::score_size_impact(&trades[0], &ctx, &scoring),
        account_history::score_account_history(&trades[0], &ctx, &scoring),
        conviction::score_conviction(&trades[0], &ctx, &scoring),
    ];
    let score = combine_signals(signals, scoring.alert_threshold);

    assert!(score.used_approximate_history());
}
