// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   alpha  = 2 / (period + 1)        (unless given explicitly)
//   EMA_t  = close_t * alpha + EMA_{t-1} * (1 - alpha)
//
// The very first EMA value is seeded with the SMA of the first `period` closes.
// =============================================================================

use tracing::debug;

use super::table::{self, Column};
use super::{align_to_timestamps, validate_period, Indicator};
use crate::error::{EngineError, Result};
use crate::history::PriceView;
use crate::series::TimeSeries;

/// Default smoothing factor for a look-back `period`.
pub fn default_alpha(period: usize) -> f64 {
    2.0 / (period + 1) as f64
}

/// Compute the EMA series for `closes` with the default smoothing factor.
///
/// Returns an empty `Vec` when the input is too short or the period is zero.
/// Each output element corresponds to a close starting at index `period - 1`.
pub fn calculate_ema(closes: &[f64], period: usize) -> Vec<f64> {
    calculate_ema_with_alpha(closes, period, default_alpha(period))
}

/// Compute the EMA series with an explicit smoothing factor `alpha`.
///
/// # Edge cases
/// - `period == 0` => empty vec
/// - `closes.len() < period` => empty vec
/// - `alpha == 1.0` => output equals the input from index `period - 1`
pub fn calculate_ema_with_alpha(closes: &[f64], period: usize, alpha: f64) -> Vec<f64> {
    if period == 0 || closes.len() < period {
        return Vec::new();
    }

    // Seed: SMA of the first `period` values.
    let seed: f64 = closes[..period].iter().sum::<f64>() / period as f64;

    let mut result = Vec::with_capacity(closes.len() - period + 1);
    result.push(seed);

    let mut prev_ema = seed;
    for &close in &closes[period..] {
        let ema = close * alpha + prev_ema * (1.0 - alpha);
        result.push(ema);
        prev_ema = ema;
    }

    result
}

/// EMA indicator built from a price view.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
    name: String,
    columns: Vec<Column>,
    series: TimeSeries<f64>,
}

impl Ema {
    pub const DEFAULT_PERIOD: usize = 20;

    /// Resolve the smoothing factor and check both parameters.
    ///
    /// `alpha` defaults to `2 / (period + 1)` and must lie in `(0, 1]`.
    pub fn validate(period: usize, alpha: Option<f64>, available: usize) -> Result<f64> {
        validate_period("period", period, available)?;

        let alpha = alpha.unwrap_or_else(|| default_alpha(period));
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(EngineError::invalid_parameter(
                "alpha",
                format!("smoothing factor must be in (0, 1], got {alpha}"),
            ));
        }
        Ok(alpha)
    }

    pub fn new(view: PriceView<'_>, period: usize, alpha: Option<f64>) -> Result<Self> {
        let alpha = Self::validate(period, alpha, view.len())?;

        let values = calculate_ema_with_alpha(view.values(), period, alpha);
        let series = align_to_timestamps(view.timestamps(), period - 1, values)?;
        let name = format!("EMA({period}d, α={alpha:.2})");

        debug!(indicator = %name, points = series.len(), "EMA computed");

        Ok(Self {
            period,
            alpha,
            name,
            columns: table::columns(&["EMA"]),
            series,
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Indicator for Ema {
    type Value = f64;

    fn name(&self) -> &str {
        &self.name
    }

    fn series(&self) -> &TimeSeries<f64> {
        &self.series
    }

    fn columns(&self) -> &[Column] {
        &self.columns
    }
}
