use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::models::AggregatedTrade;

use super::classifier::Tag;
use super::signals::{SignalDetail, SignalName, SignalResult};

/// Combined suspicion score for one trade.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedScore {
    /// Weighted mean of the signal scores, rounded to a whole number in
    /// [0, 100].
    pub total: Decimal,
    pub signals: Vec<SignalResult>,
    pub is_alert: bool,
}

impl AggregatedScore {
    /// Score of one constituent signal; zero when that signal is absent.
    pub fn signal_score(&self, name: SignalName) -> Decimal {
        self.signals
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.score)
            .unwrap_or(Decimal::ZERO)
    }

    /// Whether the account-history signal drew on approximate state.
    pub fn used_approximate_history(&self) -> bool {
        self.signals
            .iter()
            .any(|s| matches!(&s.detail, SignalDetail::AccountHistory(d) if d.approximate))
    }
}

/// A trade with everything the pipeline learned about it.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredTrade {
    pub trade: AggregatedTrade,
    pub score: AggregatedScore,
    pub tags: Vec<Tag>,
    /// Signed price move across the trade, when a window was available.
    pub price_impact_pct: Option<Decimal>,
}

/// Fold independent signal results into one score. The weighted mean makes
/// the combination order-independent; an empty or zero-weight input collapses
/// to zero rather than dividing by it.
pub fn combine_signals(signals: Vec<SignalResult>, alert_threshold: Decimal) -> AggregatedScore {
    let weight_sum: Decimal = signals.iter().map(|s| s.weight).sum();

    let total = if weight_sum > Decimal::ZERO {
        let weighted: Decimal = signals.iter().map(|s| s.score * s.weight).sum();
        (weighted / weight_sum)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
    } else {
        Decimal::ZERO
    };

    AggregatedScore {
        total,
        is_alert: total >= alert_threshold,
        signals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intelligence::signals::{
        ConvictionDetail, ConvictionReason, SignalDetail, SignalName,
    };

    fn threshold() -> Decimal {
        Decimal::from(70)
    }

    fn signal(name: SignalName, score: i64, weight: i64) -> SignalResult {
        SignalResult {
            name,
            score: Decimal::from(score),
            weight: Decimal::from(weight),
            detail: SignalDetail::Conviction(ConvictionDetail {
                reason: ConvictionReason::Scored,
                concentration_pct: None,
                prior_volume_usd: None,
            }),
        }
    }

    #[test]
    fn test_weighted_mean() {
        // (80*40 + 100*35 + 60*25) / 100 = 82.
        let score = combine_signals(
            vec![
                signal(SignalName::SizeImpact, 80, 40),
                signal(SignalName::AccountHistory, 100, 35),
                signal(SignalName::Conviction, 60, 25),
            ],
            threshold(),
        );
        assert_eq!(score.total, Decimal::from(82));
        assert!(score.is_alert);
    }

    #[test]
    fn test_order_independent() {
        let a = combine_signals(
            vec![
                signal(SignalName::SizeImpact, 30, 40),
                signal(SignalName::Conviction, 90, 25),
            ],
            threshold(),
        );
        let b = combine_signals(
            vec![
                signal(SignalName::Conviction, 90, 25),
                signal(SignalName::SizeImpact, 30, 40),
            ],
            threshold(),
        );
        assert_eq!(a.total, b.total);
    }

    #[test]
    fn test_midpoint_rounds_away_from_zero() {
        // (70 + 71) / 2 = 70.5 -> 71.
        let score = combine_signals(
            vec![
                signal(SignalName::SizeImpact, 70, 1),
                signal(SignalName::Conviction, 71, 1),
            ],
            threshold(),
        );
        assert_eq!(score.total, Decimal::from(71));
    }

    #[test]
    fn test_empty_signals_score_zero() {
        let score = combine_signals(vec![], threshold());
        assert_eq!(score.total, Decimal::ZERO);
        assert!(!score.is_alert);
    }

    #[test]
    fn test_zero_weights_score_zero() {
        let score = combine_signals(vec![signal(SignalName::SizeImpact, 100, 0)], threshold());
        assert_eq!(score.total, Decimal::ZERO);
    }

    #[test]
    fn test_total_stays_within_bounds() {
        let max = combine_signals(
            vec![
                signal(SignalName::SizeImpact, 100, 40),
                signal(SignalName::AccountHistory, 100, 35),
                signal(SignalName::Conviction, 100, 25),
            ],
            threshold(),
        );
        assert_eq!(max.total, Decimal::ONE_HUNDRED);

        let min = combine_signals(
            vec![
                signal(SignalName::SizeImpact, 0, 40),
                signal(SignalName::AccountHistory, 0, 35),
                signal(SignalName::Conviction, 0, 25),
            ],
            threshold(),
        );
        assert_eq!(min.total, Decimal::ZERO);
    }

    #[test]
    fn test_alert_threshold_boundary() {
        let at = combine_signals(vec![signal(SignalName::SizeImpact, 70, 1)], threshold());
        assert!(at.is_alert);
        let below = combine_signals(vec![signal(SignalName::SizeImpact, 69, 1)], threshold());
        assert!(!below.is_alert);
    }
}
