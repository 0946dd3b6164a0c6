//! Sentiment signal and directional types.

use serde::{Deserialize, Serialize};

/// Direction of an open trade or of a new position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Positive units.
    Long,
    /// Negative units.
    Short,
}

impl Direction {
    /// Returns the opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
        }
    }

    /// Derives a direction from the sign of a unit count. Zero has no direction.
    #[must_use]
    pub fn from_units(units: rust_decimal::Decimal) -> Option<Self> {
        if units.is_sign_positive() && !units.is_zero() {
            Some(Self::Long)
        } else if units.is_sign_negative() && !units.is_zero() {
            Some(Self::Short)
        } else {
            None
        }
    }

    /// Returns the display string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Long => "LONG",
            Self::Short => "SHORT",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target exposure the engine wants the instrument to converge to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Bias {
    Long,
    Short,
    /// No position at all.
    Flat,
}

impl Bias {
    /// Returns the trade direction this bias targets, or `None` for flat.
    #[must_use]
    pub const fn direction(self) -> Option<Direction> {
        match self {
            Self::Long => Some(Direction::Long),
            Self::Short => Some(Direction::Short),
            Self::Flat => None,
        }
    }

    /// Returns the display string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Long => "LONG",
            Self::Short => "SHORT",
            Self::Flat => "FLAT",
        }
    }
}

impl From<Direction> for Bias {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Long => Self::Long,
            Direction::Short => Self::Short,
        }
    }
}

impl std::fmt::Display for Bias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sentiment reading for an instrument.
///
/// `ratio` is centred at zero: positive means the crowd is net short (a
/// contrarian long bias), negative means the crowd is net long.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub ratio: f64,
    pub symbol: String,
    pub timeframe_minutes: u32,
}

impl Signal {
    #[must_use]
    pub fn new(ratio: f64, symbol: impl Into<String>, timeframe_minutes: u32) -> Self {
        Self {
            ratio,
            symbol: symbol.into(),
            timeframe_minutes,
        }
    }
}
