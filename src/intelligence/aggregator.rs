use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::{AggregatedTrade, Fill, FillRole, Outcome, RawFill, Side, WalletPosition};

/// Composite grouping key for raw fills. One group becomes at most one
/// aggregated trade.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FillGroupKey {
    transaction_hash: String,
    outcome: Outcome,
    role: FillRole,
}

#[derive(Debug)]
struct FillGroup {
    outcome: Outcome,
    role: FillRole,
    /// Maker side of the group's first fill; the wallet's action is derived
    /// from it together with the role.
    raw_side: Side,
    value_usd: Decimal,
    shares: Decimal,
    first_timestamp: DateTime<Utc>,
    fills: Vec<Fill>,
}

impl FillGroup {
    fn new(outcome: Outcome, role: FillRole, fill: &RawFill) -> Self {
        Self {
            outcome,
            role,
            raw_side: fill.side,
            value_usd: Decimal::ZERO,
            shares: Decimal::ZERO,
            first_timestamp: fill.timestamp,
            fills: Vec::new(),
        }
    }

    fn push(&mut self, fill: &RawFill) {
        let shares = fill.shares();
        self.value_usd += fill.value_usd;
        self.shares += shares;
        if fill.timestamp < self.first_timestamp {
            self.first_timestamp = fill.timestamp;
        }
        self.fills.push(Fill {
            id: fill.id.clone(),
            timestamp: fill.timestamp,
            role: self.role,
            side: fill.side,
            value_usd: fill.value_usd,
            price: fill.price,
            shares,
        });
    }
}

/// Reconstruct economically meaningful trades for `wallet` from raw fills.
///
/// Steps, in order:
/// 1. canonicalize the wallet address (all comparisons case-insensitive);
/// 2. group fills by (transaction, outcome, role), summing USD value;
/// 3. resolve self-trade artifacts — a wallet appearing as both maker and
///    taker for the same (transaction, outcome) keeps only its primary role,
///    the one with the larger summed value (ties keep the maker group);
/// 4. filter complementary legs — a transaction with exactly one YES and one
///    NO group is a hedge/mint candidate, and only the directional leg
///    survives (position-aware, otherwise the larger leg; ties discard NO);
/// 5. derive the wallet's action: taker fills invert the raw maker side;
/// 6. emit one trade per surviving group, newest first.
///
/// Fills whose token has no outcome mapping, or where the wallet is neither
/// maker nor taker, are ignored.
pub fn aggregate_fills(
    fills: &[RawFill],
    wallet: &str,
    market_id: &str,
    token_outcomes: &HashMap<String, Outcome>,
    wallet_positions: &[WalletPosition],
) -> Vec<AggregatedTrade> {
    let wallet = wallet.to_lowercase();

    // Fixed processing order makes grouping (and therefore output) fully
    // deterministic regardless of input order.
    let mut ordered: Vec<&RawFill> = fills.iter().collect();
    ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

    let mut groups: HashMap<FillGroupKey, FillGroup> = HashMap::new();
    for fill in ordered {
        let Some(&outcome) = token_outcomes.get(&fill.market_token) else {
            continue;
        };
        let role = if fill.maker.eq_ignore_ascii_case(&wallet) {
            FillRole::Maker
        } else if fill.taker.eq_ignore_ascii_case(&wallet) {
            FillRole::Taker
        } else {
            continue;
        };

        let key = FillGroupKey {
            transaction_hash: fill.transaction_hash.clone(),
            outcome,
            role,
        };
        groups
            .entry(key)
            .or_insert_with(|| FillGroup::new(outcome, role, fill))
            .push(fill);
    }

    let survivors = resolve_primary_roles(groups);
    let survivors = filter_complementary(survivors, token_outcomes, wallet_positions);

    let mut trades: Vec<AggregatedTrade> = survivors
        .into_iter()
        .map(|(tx, group, complementary)| {
            let side = match group.role {
                FillRole::Maker => group.raw_side,
                FillRole::Taker => group.raw_side.opposite(),
            };
            let avg_price = if group.shares > Decimal::ZERO {
                group.value_usd / group.shares
            } else {
                Decimal::ZERO
            };
            AggregatedTrade {
                transaction_hash: tx,
                market_id: market_id.to_string(),
                wallet: wallet.clone(),
                side,
                outcome: group.outcome,
                total_size: group.shares,
                total_value_usd: group.value_usd,
                avg_price,
                timestamp: group.first_timestamp,
                fills: group.fills,
                had_complementary_fills: complementary.is_some(),
                complementary_value_usd: complementary,
            }
        })
        .collect();

    trades.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.transaction_hash.cmp(&b.transaction_hash))
            .then_with(|| a.outcome.as_str().cmp(b.outcome.as_str()))
    });
    trades
}

/// Primary-role rule: when the wallet shows up as both maker and taker for
/// the same (transaction, outcome) — a self-trade artifact — keep only the
/// role with the larger summed USD value. A tie keeps the maker group, which
/// makes the rule total and deterministic.
fn resolve_primary_roles(groups: HashMap<FillGroupKey, FillGroup>) -> Vec<(String, FillGroup)> {
    let mut by_tx_outcome: HashMap<(String, Outcome), Vec<FillGroup>> = HashMap::new();
    for (key, group) in groups {
        by_tx_outcome
            .entry((key.transaction_hash, key.outcome))
            .or_default()
            .push(group);
    }

    let mut survivors = Vec::new();
    for ((tx, _outcome), mut pair) in by_tx_outcome {
        let winner = match pair.len() {
            1 => pair.pop().expect("non-empty group list"),
            _ => {
                let taker_larger = {
                    let maker = pair.iter().find(|g| g.role == FillRole::Maker);
                    let taker = pair.iter().find(|g| g.role == FillRole::Taker);
                    match (maker, taker) {
                        (Some(m), Some(t)) => t.value_usd > m.value_usd,
                        _ => false,
                    }
                };
                let keep = if taker_larger {
                    FillRole::Taker
                } else {
                    FillRole::Maker
                };
                pair.into_iter()
                    .find(|g| g.role == keep)
                    .expect("kept role present")
            }
        };
        survivors.push((tx, winner));
    }
    survivors
}

/// Complementary-fill rule: a transaction carrying exactly one YES and one NO
/// group is usually a hedge or a collateral split/mint, not two directional
/// bets. Only the directional leg counts; the other is discarded and its USD
/// total is recorded on the survivor. Transactions with any other group shape
/// pass through untouched — multi-leg netting is out of policy.
fn filter_complementary(
    survivors: Vec<(String, FillGroup)>,
    token_outcomes: &HashMap<String, Outcome>,
    wallet_positions: &[WalletPosition],
) -> Vec<(String, FillGroup, Option<Decimal>)> {
    let mut by_tx: HashMap<String, Vec<FillGroup>> = HashMap::new();
    for (tx, group) in survivors {
        by_tx.entry(tx).or_default().push(group);
    }

    let holds_yes = holds_outcome(wallet_positions, token_outcomes, Outcome::Yes);
    let holds_no = holds_outcome(wallet_positions, token_outcomes, Outcome::No);

    let mut out = Vec::new();
    for (tx, mut groups) in by_tx {
        let is_hedge_pair = groups.len() == 2
            && groups.iter().any(|g| g.outcome == Outcome::Yes)
            && groups.iter().any(|g| g.outcome == Outcome::No);

        if !is_hedge_pair {
            for group in groups {
                out.push((tx.clone(), group, None));
            }
            continue;
        }

        let yes_value = group_value(&groups, Outcome::Yes);
        let no_value = group_value(&groups, Outcome::No);

        // Position-aware pick first: a wallet holding exactly one side keeps
        // that side's leg. Otherwise the smaller leg is the hedge; ties
        // discard NO.
        let discard = match (holds_yes, holds_no) {
            (true, false) => Outcome::No,
            (false, true) => Outcome::Yes,
            _ => {
                if yes_value < no_value {
                    Outcome::Yes
                } else {
                    Outcome::No
                }
            }
        };
        let discarded_value = if discard == Outcome::Yes {
            yes_value
        } else {
            no_value
        };

        groups.retain(|g| g.outcome != discard);
        for group in groups {
            out.push((tx.clone(), group, Some(discarded_value)));
        }
    }
    out
}

fn holds_outcome(
    positions: &[WalletPosition],
    token_outcomes: &HashMap<String, Outcome>,
    outcome: Outcome,
) -> bool {
    positions.iter().any(|p| {
        p.size > Decimal::ZERO && token_outcomes.get(&p.token_id) == Some(&outcome)
    })
}

fn group_value(groups: &[FillGroup], outcome: Outcome) -> Decimal {
    groups
        .iter()
        .filter(|g| g.outcome == outcome)
        .map(|g| g.value_usd)
        .sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
