use rust_decimal::Decimal;

use crate::config::ScoringConfig;
use crate::models::AggregatedTrade;

use super::{
    linear, ConvictionDetail, ConvictionReason, ScoringContext, SignalDetail, SignalName,
    SignalResult,
};

/// Conviction signal (0-100): how much of the wallet's prior trading volume
/// this single trade represents. A wallet going all-in on one outcome is the
/// signature; a diversified wallet dripping 2% of its volume is not.
///
/// Prior volume comes from point-in-time state when available, falling back
/// to the lifetime figure. Zero prior volume is a genuine first trade and
/// scores the maximum; no volume figure from any source scores a fixed high
/// default, since an unknown wallet is closer to a fresh one than to a
/// seasoned one.
pub fn score_conviction(
    trade: &AggregatedTrade,
    ctx: &ScoringContext,
    cfg: &ScoringConfig,
) -> SignalResult {
    let weight = cfg.weight_conviction;

    let prior_volume = ctx
        .historical_state
        .as_ref()
        .map(|s| s.volume_usd)
        .or_else(|| {
            ctx.history
                .as_ref()
                .filter(|h| !h.is_skipped())
                .map(|h| h.total_volume_usd)
        });

    let Some(prior_volume) = prior_volume else {
        return SignalResult {
            name: SignalName::Conviction,
            score: Decimal::from(75),
            weight,
            detail: SignalDetail::Conviction(ConvictionDetail {
                reason: ConvictionReason::NoContext,
                concentration_pct: None,
                prior_volume_usd: None,
            }),
        };
    };

    if prior_volume <= Decimal::ZERO {
        return SignalResult {
            name: SignalName::Conviction,
            score: Decimal::ONE_HUNDRED,
            weight,
            detail: SignalDetail::Conviction(ConvictionDetail {
                reason: ConvictionReason::FirstTrade,
                concentration_pct: None,
                prior_volume_usd: Some(prior_volume),
            }),
        };
    }

    let pct = trade.total_value_usd / prior_volume * Decimal::ONE_HUNDRED;
    let score = concentration_score(pct);

    SignalResult {
        name: SignalName::Conviction,
        score,
        weight,
        detail: SignalDetail::Conviction(ConvictionDetail {
            reason: ConvictionReason::Scored,
            concentration_pct: Some(pct),
            prior_volume_usd: Some(prior_volume),
        }),
    }
}

/// Piecewise curve over concentration percent. Continuous at every band edge.
fn concentration_score(pct: Decimal) -> Decimal {
    let p = |n: i64| Decimal::from(n);
    if pct >= p(50) {
        Decimal::ONE_HUNDRED
    } else if pct >= p(25) {
        linear(pct, p(25), p(50), p(70), p(100))
    } else if pct >= p(10) {
        linear(pct, p(10), p(25), p(40), p(70))
    } else if pct >= p(5) {
        linear(pct, p(5), p(10), p(20), p(40))
    } else {
        linear(pct, Decimal::ZERO, p(5), Decimal::ZERO, p(20))
    }
}
