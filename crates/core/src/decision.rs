//! Thresholding policy: sentiment ratio to target bias.

use crate::error::{Result, TradeError};
use crate::signal::Bias;

/// Default signal threshold, in whole ratio units.
pub const DEFAULT_THRESHOLD: f64 = 1.0;

/// Maps a sentiment ratio to a target bias.
///
/// The ratio is rounded to the nearest whole unit (ties to even) before the
/// comparison so that sub-unit noise cannot flip the decision. Comparisons are
/// strict: a rounded ratio exactly at `±threshold` resolves to [`Bias::Flat`].
///
/// # Errors
/// - `SignalUnavailable` if `ratio` is `None`.
/// - `InvalidSignal` if `ratio` is zero or not finite. Zero is what the
///   upstream sources report when they have no positioning data, so it is
///   rejected rather than read as a balanced crowd.
/// - `Configuration` if `threshold` is negative or not finite.
///
/// Signal errors are reported before configuration errors.
pub fn decide(ratio: Option<f64>, threshold: f64) -> Result<Bias> {
    let ratio =
        ratio.ok_or_else(|| TradeError::signal_unavailable("", "source returned no value"))?;

    if ratio == 0.0 || !ratio.is_finite() {
        return Err(TradeError::InvalidSignal { ratio });
    }

    validate_threshold(threshold)?;

    let rounded = ratio.round_ties_even();

    let bias = if rounded < -threshold {
        Bias::Short
    } else if rounded > threshold {
        Bias::Long
    } else {
        Bias::Flat
    };

    tracing::debug!(ratio, rounded, threshold, %bias, "sentiment decision");
    Ok(bias)
}

/// Checks that `threshold` is a finite, non-negative number.
///
/// # Errors
/// Returns `Configuration` otherwise.
pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(TradeError::Configuration(format!(
            "threshold must be a non-negative number, got {threshold}"
        )));
    }
    Ok(())
}
