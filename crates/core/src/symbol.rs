//! Instrument symbol normalisation.
//!
//! A symbol typed by the caller (`EURUSD`, `xauusd`, `SPX500_USD`) has two
//! downstream forms: the broker's instrument code (`EUR_USD`) and the
//! sentiment source's lookup key (`eurusd`).

use crate::error::{Result, TradeError};

/// Broker index codes that already carry their separator and must not be split.
pub const COMPOSITE_INDEX_CODES: &[&str] = &[
    "SPX500_USD",
    "NAS100_USD",
    "US30_USD",
    "DE30_EUR",
    "UK100_GBP",
    "JP225_USD",
];

/// Base currency width for FX and metal pairs.
const BASE_LEN: usize = 3;

/// Returns true if `symbol` is one of the known composite index codes.
#[must_use]
pub fn is_composite_index(symbol: &str) -> bool {
    COMPOSITE_INDEX_CODES
        .iter()
        .any(|code| code.eq_ignore_ascii_case(symbol))
}

/// Converts a caller symbol to the broker's instrument format.
///
/// `GBPJPY` becomes `GBP_JPY`; `SPX500_USD` is returned unchanged. Input that
/// is already separated after the base (`EUR_USD`) is kept as is.
///
/// # Errors
/// Returns `MalformedSymbol` if the symbol is shorter than four characters or
/// contains characters other than ASCII alphanumerics, `_` and `-`.
pub fn to_broker_format(symbol: &str) -> Result<String> {
    let symbol = symbol.trim().to_ascii_uppercase();

    if is_composite_index(&symbol) {
        return Ok(symbol);
    }

    if symbol.len() < BASE_LEN + 1
        || !symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(TradeError::MalformedSymbol(symbol));
    }

    let (base, quote) = symbol.split_at(BASE_LEN);
    let quote = quote.trim_start_matches(['_', '-']);
    if quote.is_empty() || base.contains(['_', '-']) {
        return Err(TradeError::MalformedSymbol(symbol));
    }

    Ok(format!("{base}_{quote}"))
}

/// Converts a caller symbol to the sentiment source's lookup key.
///
/// Lower-cases and strips `_` and `-`: `XAU_USD` and `XAU-USD` both become
/// `xauusd`.
///
/// # Errors
/// Returns `MalformedSymbol` for empty input.
pub fn to_source_key(symbol: &str) -> Result<String> {
    let key: String = symbol
        .trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect();

    if key.is_empty() {
        return Err(TradeError::MalformedSymbol(symbol.to_string()));
    }
    Ok(key)
}

/// Both normalised forms of one instrument, derived once per cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSymbol {
    /// Symbol as entered by the caller.
    pub raw: String,
    /// Broker instrument code, e.g. `EUR_USD`.
    pub broker: String,
    /// Sentiment lookup key, e.g. `eurusd`.
    pub source_key: String,
}

impl NormalizedSymbol {
    /// Normalises `symbol` into both forms.
    ///
    /// # Errors
    /// Returns `MalformedSymbol` if either form cannot be derived.
    pub fn parse(symbol: &str) -> Result<Self> {
        Ok(Self {
            raw: symbol.to_string(),
            broker: to_broker_format(symbol)?,
            source_key: to_source_key(symbol)?,
        })
    }
}

impl std::fmt::Display for NormalizedSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.broker)
    }
}
