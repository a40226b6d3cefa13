use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::MathematicalOps;
use rust_decimal::Decimal;

use crate::config::ScoringConfig;
use crate::models::{AggregatedTrade, PricePoint};

use super::{ScoringContext, SignalDetail, SignalName, SignalResult, SizeImpactDetail, SizeReason};

/// Size & impact signal (0-100). Half the score comes from how far the trade
/// sits above the venue's notable-size floor (log scale), half from the
/// price move observed across it. Trades under the floor score zero outright.
pub fn score_size_impact(
    trade: &AggregatedTrade,
    ctx: &ScoringContext,
    cfg: &ScoringConfig,
) -> SignalResult {
    let weight = cfg.weight_size_impact;

    if trade.total_value_usd < cfg.min_trade_value_usd {
        return SignalResult {
            name: SignalName::SizeImpact,
            score: Decimal::ZERO,
            weight,
            detail: SignalDetail::SizeImpact(SizeImpactDetail {
                reason: SizeReason::BelowThreshold,
                size_score: Decimal::ZERO,
                impact_score: Decimal::ZERO,
                impact_pct: None,
            }),
        };
    }

    let size_score = size_component(trade.total_value_usd, cfg.min_trade_value_usd);

    let impact_pct = signed_impact_pct(ctx.price_before.as_ref(), ctx.price_after.as_ref())
        .map(|pct| pct.abs());
    let impact_score = impact_pct
        .map(|pct| impact_component(pct, cfg.min_impact_pct))
        .unwrap_or(Decimal::ZERO);

    let score = (size_score + impact_score).min(Decimal::ONE_HUNDRED);

    SignalResult {
        name: SignalName::SizeImpact,
        score,
        weight,
        detail: SignalDetail::SizeImpact(SizeImpactDetail {
            reason: SizeReason::Scored,
            size_score,
            impact_score,
            impact_pct,
        }),
    }
}

/// 25 points at the floor, +25 per decade of USD value above it, capped at 50.
fn size_component(value: Decimal, min_value: Decimal) -> Decimal {
    let ratio = if min_value > Decimal::ZERO {
        value / min_value
    } else {
        Decimal::ONE
    };
    let decades = ratio.checked_log10().unwrap_or(Decimal::ZERO);
    (decades * Decimal::from(25) + Decimal::from(25)).min(Decimal::from(50))
}

/// 0 below the impact floor, 25 points at the floor, linear in the move up to
/// a cap of 50 at twice the floor.
fn impact_component(pct: Decimal, min_impact: Decimal) -> Decimal {
    if min_impact <= Decimal::ZERO || pct < min_impact {
        return Decimal::ZERO;
    }
    (pct / min_impact * Decimal::from(25)).min(Decimal::from(50))
}

/// Signed price move across the trade, as a percentage of the before price.
/// `None` whenever either side of the window is missing or the before price
/// is non-positive.
pub fn signed_impact_pct(
    before: Option<&PricePoint>,
    after: Option<&PricePoint>,
) -> Option<Decimal> {
    let before = before?;
    let after = after?;
    if before.price <= Decimal::ZERO {
        return None;
    }
    Some((after.price - before.price) / before.price * Decimal::ONE_HUNDRED)
}

/// Pick the observation window around a trade from a price series: the latest
/// point strictly before the trade and the earliest point strictly after it,
/// both within `window` of the trade. A point stamped exactly at the trade
/// belongs to neither side.
pub fn select_price_window(
    series: &[PricePoint],
    trade_ts: DateTime<Utc>,
    window: Duration,
) -> (Option<PricePoint>, Option<PricePoint>) {
    let mut before: Option<PricePoint> = None;
    let mut after: Option<PricePoint> = None;

    for point in series {
        if point.timestamp < trade_ts {
            if trade_ts - point.timestamp <= window
                && before.map_or(true, |b| point.timestamp > b.timestamp)
            {
                before = Some(*point);
            }
        } else if point.timestamp > trade_ts
            && point.timestamp - trade_ts <= window
            && after.map_or(true, |a| point.timestamp < a.timestamp)
        {
            after = Some(*point);
        }
    }

    (before, after)
}
