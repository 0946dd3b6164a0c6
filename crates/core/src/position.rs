use crate::signal::Direction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An open trade as reported by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Broker trade identifier.
    pub id: String,
    /// Broker instrument code, e.g. `EUR_USD`.
    pub instrument: String,
    /// Derived from the sign of the initial units.
    pub direction: Direction,
    /// Absolute size in units.
    pub size: Decimal,
    pub unrealized_pl: Decimal,
}

impl Trade {
    /// Builds a trade from signed initial units. Returns `None` for zero units.
    #[must_use]
    pub fn from_signed_units(
        id: impl Into<String>,
        instrument: impl Into<String>,
        initial_units: Decimal,
        unrealized_pl: Decimal,
    ) -> Option<Self> {
        let direction = Direction::from_units(initial_units)?;
        Some(Self {
            id: id.into(),
            instrument: instrument.into(),
            direction,
            size: initial_units.abs(),
            unrealized_pl,
        })
    }
}

/// Open trades for one instrument, captured once per cycle.
///
/// The snapshot is read-only. Counting and close decisions within a cycle must
/// both use the same snapshot; it is never refreshed mid-cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    instrument: String,
    trades: Vec<Trade>,
}

impl PositionSnapshot {
    /// Creates a snapshot, keeping only trades on `instrument` in broker order.
    #[must_use]
    pub fn new(instrument: impl Into<String>, trades: impl IntoIterator<Item = Trade>) -> Self {
        let instrument = instrument.into();
        let trades = trades
            .into_iter()
            .filter(|t| t.instrument == instrument)
            .collect();
        Self { instrument, trades }
    }

    /// Creates an empty snapshot.
    #[must_use]
    pub fn empty(instrument: impl Into<String>) -> Self {
        Self::new(instrument, Vec::new())
    }

    #[must_use]
    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    #[must_use]
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Trades open in `direction`.
    pub fn in_direction(&self, direction: Direction) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(move |t| t.direction == direction)
    }

    /// Net signed units across all trades (long positive).
    #[must_use]
    pub fn net_units(&self) -> Decimal {
        self.trades
            .iter()
            .map(|t| match t.direction {
                Direction::Long => t.size,
                Direction::Short => -t.size,
            })
            .sum()
    }

    #[must_use]
    pub fn total_unrealized_pl(&self) -> Decimal {
        self.trades.iter().map(|t| t.unrealized_pl).sum()
    }

    /// Splits trades into those matching and those not matching `direction`.
    ///
    /// With `None` (a flat target) every trade is opposing.
    #[must_use]
    pub fn partition(&self, direction: Option<Direction>) -> (Vec<&Trade>, Vec<&Trade>) {
        self.trades
            .iter()
            .partition(|t| Some(t.direction) == direction)
    }
}
