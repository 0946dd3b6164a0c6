//! Reconciliation of a target bias against the open-position snapshot.
//!
//! The plan is computed in a single deterministic pass and is idempotent:
//! replaying it against the snapshot that results from executing it yields no
//! further work.
//!
//! Invariants:
//! 1) A flat target produces exactly one `CloseTrades` covering every trade.
//! 2) Opposing trades are always closed, never netted against a new order.
//! 3) Every `CloseTrades` precedes any `OpenPosition` in the returned plan.
//! 4) An existing aligned trade suppresses a new open (no pyramiding).

use crate::error::{Result, TradeError};
use crate::position::PositionSnapshot;
use crate::signal::{Bias, Direction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One step of a reconciliation plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Close the identified trades. An empty set is a valid no-op.
    CloseTrades { ids: BTreeSet<String> },
    /// Submit a market order in `direction` for `size` units.
    OpenPosition { direction: Direction, size: Decimal },
    /// The snapshot already matches the target.
    NoOp,
}

impl Action {
    /// Returns true if this action closes trades.
    #[must_use]
    pub fn is_close(&self) -> bool {
        matches!(self, Self::CloseTrades { .. })
    }

    /// Returns true if this action opens a position.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::OpenPosition { .. })
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CloseTrades { ids } if ids.is_empty() => write!(f, "close (nothing open)"),
            Self::CloseTrades { ids } => {
                let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
                write!(f, "close [{}]", ids.join(", "))
            }
            Self::OpenPosition { direction, size } => write!(f, "open {direction} {size}"),
            Self::NoOp => write!(f, "no-op"),
        }
    }
}

/// Checks that `order_size` is strictly positive.
///
/// # Errors
/// Returns `Configuration` otherwise.
pub fn validate_order_size(order_size: Decimal) -> Result<()> {
    if order_size <= Decimal::ZERO {
        return Err(TradeError::Configuration(format!(
            "order size must be positive, got {order_size}"
        )));
    }
    Ok(())
}

/// Computes the ordered action plan that moves `snapshot` to `target`.
///
/// # Errors
/// Returns `Configuration` if `order_size` is not positive.
pub fn reconcile(
    target: Bias,
    snapshot: &PositionSnapshot,
    order_size: Decimal,
) -> Result<Vec<Action>> {
    validate_order_size(order_size)?;

    let Some(direction) = target.direction() else {
        let ids = snapshot.trades().iter().map(|t| t.id.clone()).collect();
        return Ok(vec![Action::CloseTrades { ids }]);
    };

    let (aligned, opposing) = snapshot.partition(Some(direction));
    let mut plan = Vec::with_capacity(2);

    if !opposing.is_empty() {
        plan.push(Action::CloseTrades {
            ids: opposing.iter().map(|t| t.id.clone()).collect(),
        });
    }

    if aligned.is_empty() {
        plan.push(Action::OpenPosition {
            direction,
            size: order_size,
        });
    } else {
        plan.push(Action::NoOp);
    }

    tracing::debug!(
        instrument = snapshot.instrument(),
        %target,
        aligned = aligned.len(),
        opposing = opposing.len(),
        steps = plan.len(),
        "reconciled position"
    );

    Ok(plan)
}

/// Returns true if `plan` requires no broker interaction.
#[must_use]
pub fn is_settled(plan: &[Action]) -> bool {
    plan.iter().all(|action| match action {
        Action::CloseTrades { ids } => ids.is_empty(),
        Action::OpenPosition { .. } => false,
        Action::NoOp => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Trade;
    use rust_decimal_macros::dec;

    const INSTRUMENT: &str = "EUR_USD";

    fn trade(id: &str, units: Decimal) -> Trade {
        Trade::from_signed_units(id, INSTRUMENT, units, dec!(0)).unwrap()
    }

    fn snapshot(trades: Vec<Trade>) -> PositionSnapshot {
        PositionSnapshot::new(INSTRUMENT, trades)
    }

    fn ids(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    /// Applies a plan to a snapshot the way a well-behaved broker would.
    fn apply(snapshot: &PositionSnapshot, plan: &[Action], next_id: &mut u32) -> PositionSnapshot {
        let mut trades: Vec<Trade> = snapshot.trades().to_vec();
        for action in plan {
            match action {
                Action::CloseTrades { ids } => trades.retain(|t| !ids.contains(&t.id)),
                Action::OpenPosition { direction, size } => {
                    *next_id += 1;
                    let units = match direction {
                        Direction::Long => *size,
                        Direction::Short => -*size,
                    };
                    trades.push(trade(&next_id.to_string(), units));
                }
                Action::NoOp => {}
            }
        }
        PositionSnapshot::new(INSTRUMENT, trades)
    }

    #[test]
    fn test_flip_short_to_long() {
        let snap = snapshot(vec![trade("7", dec!(-1000))]);
        let plan = reconcile(Bias::Long, &snap, dec!(1000)).unwrap();
        assert_eq!(
            plan,
            vec![
                Action::CloseTrades { ids: ids(&["7"]) },
                Action::OpenPosition {
                    direction: Direction::Long,
                    size: dec!(1000)
                },
            ]
        );
    }

    #[test]
    fn test_flat_closes_both_sides() {
        let snap = snapshot(vec![trade("1", dec!(1000)), trade("2", dec!(-500))]);
        let plan = reconcile(Bias::Flat, &snap, dec!(1000)).unwrap();
        assert_eq!(plan, vec![Action::CloseTrades { ids: ids(&["1", "2"]) }]);
    }

    #[test]
    fn test_flat_with_no_trades_is_empty_close() {
        let plan = reconcile(Bias::Flat, &snapshot(vec![]), dec!(1000)).unwrap();
        assert_eq!(plan, vec![Action::CloseTrades { ids: BTreeSet::new() }]);
        assert!(is_settled(&plan));
    }

    #[test]
    fn test_aligned_position_is_noop() {
        let snap = snapshot(vec![trade("1", dec!(1000))]);
        let plan = reconcile(Bias::Long, &snap, dec!(1000)).unwrap();
        assert_eq!(plan, vec![Action::NoOp]);
    }

    #[test]
    fn test_no_position_opens() {
        let plan = reconcile(Bias::Short, &snapshot(vec![]), dec!(250)).unwrap();
        assert_eq!(
            plan,
            vec![Action::OpenPosition {
                direction: Direction::Short,
                size: dec!(250)
            }]
        );
    }

    #[test]
    fn test_mixed_snapshot_closes_opposing_and_keeps_aligned() {
        let snap = snapshot(vec![
            trade("1", dec!(1000)),
            trade("2", dec!(-500)),
            trade("3", dec!(-300)),
        ]);
        let plan = reconcile(Bias::Long, &snap, dec!(1000)).unwrap();
        assert_eq!(
            plan,
            vec![Action::CloseTrades { ids: ids(&["2", "3"]) }, Action::NoOp]
        );
    }

    #[test]
    fn test_non_positive_size_rejected() {
        let snap = snapshot(vec![]);
        assert!(reconcile(Bias::Long, &snap, dec!(0)).is_err());
        assert!(reconcile(Bias::Long, &snap, dec!(-1)).is_err());
    }

    #[test]
    fn test_close_always_precedes_open() {
        let snapshots = [
            vec![],
            vec![trade("1", dec!(1000))],
            vec![trade("1", dec!(-1000))],
            vec![trade("1", dec!(1000)), trade("2", dec!(-1000))],
        ];
        for trades in snapshots {
            let snap = snapshot(trades);
            for target in [Bias::Long, Bias::Short, Bias::Flat] {
                let plan = reconcile(target, &snap, dec!(100)).unwrap();
                let last_close = plan.iter().rposition(Action::is_close);
                let first_open = plan.iter().position(Action::is_open);
                if let (Some(close), Some(open)) = (last_close, first_open) {
                    assert!(close < open, "{target}: {plan:?}");
                }
            }
        }
    }

    #[test]
    fn test_flat_close_set_equals_snapshot_ids() {
        let snap = snapshot(vec![
            trade("10", dec!(1)),
            trade("11", dec!(-1)),
            trade("12", dec!(5)),
            trade("13", dec!(-9)),
        ]);
        let plan = reconcile(Bias::Flat, &snap, dec!(1)).unwrap();
        assert_eq!(plan.len(), 1);
        let Action::CloseTrades { ids: closed } = &plan[0] else {
            panic!("expected close, got {plan:?}");
        };
        let all: BTreeSet<String> = snap.trades().iter().map(|t| t.id.clone()).collect();
        assert_eq!(closed, &all);
    }

    #[test]
    fn test_replaying_executed_plan_is_settled() {
        let starting = [
            vec![],
            vec![trade("1", dec!(1000))],
            vec![trade("1", dec!(-1000))],
            vec![trade("1", dec!(1000)), trade("2", dec!(-400))],
        ];
        for trades in starting {
            for target in [Bias::Long, Bias::Short, Bias::Flat] {
                let mut next_id = 100;
                let snap = snapshot(trades.clone());
                let plan = reconcile(target, &snap, dec!(1000)).unwrap();
                let after = apply(&snap, &plan, &mut next_id);

                let replay = reconcile(target, &after, dec!(1000)).unwrap();
                assert!(is_settled(&replay), "{target} from {snap:?}: {replay:?}");
            }
        }
    }

    #[test]
    fn test_action_display() {
        assert_eq!(Action::NoOp.to_string(), "no-op");
        assert_eq!(
            Action::CloseTrades { ids: ids(&["4", "5"]) }.to_string(),
            "close [4, 5]"
        );
        assert_eq!(
            Action::OpenPosition {
                direction: Direction::Short,
                size: dec!(1000)
            }
            .to_string(),
            "open SHORT 1000"
        );
    }
}
