// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA or EMA), an upper band
// (middle + k*σ), and a lower band (middle - k*σ).  σ is the sample standard
// deviation (Bessel's correction, n - 1) of the same window the moving
// average covers, recomputed at every step.
//
// The Band Width (BBW) is the normalised distance:
//   BBW = (upper - lower) / middle * 100.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ema::calculate_ema;
use super::sma::{calculate_sma, Sma};
use super::table::{self, Column};
use super::{align_to_timestamps, Indicator};
use crate::error::{EngineError, Result};
use crate::history::PriceView;
use crate::series::{SeriesValue, TimeSeries};
use crate::types::MovingAverageKind;

/// One set of bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandPoint {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BandPoint {
    /// Bollinger Band Width, `None` when the middle band is zero.
    pub fn width(&self) -> Option<f64> {
        if self.middle == 0.0 {
            return None;
        }
        let width = (self.upper - self.lower) / self.middle * 100.0;
        width.is_finite().then_some(width)
    }
}

impl SeriesValue for BandPoint {
    fn cells(&self) -> Vec<Option<f64>> {
        vec![Some(self.upper), Some(self.middle), Some(self.lower)]
    }
}

/// Sample standard deviation of `window`.  A single-value window has no
/// spread and yields 0.
pub fn sample_std_dev(window: &[f64]) -> f64 {
    let n = window.len();
    if n < 2 {
        return 0.0;
    }
    let mean = window.iter().sum::<f64>() / n as f64;
    let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    variance.sqrt()
}

/// Calculate Bollinger Bands for every full window of `closes`.
///
/// Element `i` of the output belongs to input index `i + period - 1`.
/// Returns an empty `Vec` when `period == 0` or there are fewer than `period`
/// closes.
pub fn calculate_bollinger(
    closes: &[f64],
    period: usize,
    num_std: f64,
    kind: MovingAverageKind,
) -> Vec<BandPoint> {
    let middles = match kind {
        MovingAverageKind::Simple => calculate_sma(closes, period),
        MovingAverageKind::Exponential => calculate_ema(closes, period),
    };

    middles
        .into_iter()
        .zip(closes.windows(period.max(1)))
        .map(|(middle, window)| {
            let offset = num_std * sample_std_dev(window);
            BandPoint {
                upper: middle + offset,
                middle,
                lower: middle - offset,
            }
        })
        .collect()
}

/// Bollinger Bands indicator built from a price view.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    period: usize,
    num_std: f64,
    kind: MovingAverageKind,
    name: String,
    columns: Vec<Column>,
    series: TimeSeries<BandPoint>,
}

impl BollingerBands {
    pub const DEFAULT_PERIOD: usize = 20;
    pub const DEFAULT_NUM_STD: f64 = 2.0;

    /// The period follows the rules of the chosen moving average; the
    /// multiplier must be finite and non-negative.
    pub fn validate(period: usize, num_std: f64, available: usize) -> Result<()> {
        // SMA and EMA share the same period rule.
        Sma::validate(period, available)?;
        if !num_std.is_finite() || num_std < 0.0 {
            return Err(EngineError::invalid_parameter(
                "num_std",
                format!("multiplier must be a finite value >= 0, got {num_std}"),
            ));
        }
        Ok(())
    }

    pub fn new(
        view: PriceView<'_>,
        period: usize,
        num_std: f64,
        kind: MovingAverageKind,
    ) -> Result<Self> {
        Self::validate(period, num_std, view.len())?;

        let bands = calculate_bollinger(view.values(), period, num_std, kind);
        let series = align_to_timestamps(view.timestamps(), period - 1, bands)?;
        let name = format!("BB({period}d, {num_std:.1}σ, {kind})");

        debug!(indicator = %name, points = series.len(), "Bollinger Bands computed");

        Ok(Self {
            period,
            num_std,
            kind,
            name,
            columns: table::columns(&["Upper", "Middle", "Lower"]),
            series,
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn num_std(&self) -> f64 {
        self.num_std
    }

    pub fn kind(&self) -> MovingAverageKind {
        self.kind
    }
}

impl Indicator for BollingerBands {
    type Value = BandPoint;

    fn name(&self) -> &str {
        &self.name
    }

    fn series(&self) -> &TimeSeries<BandPoint> {
        &self.series
    }

    fn columns(&self) -> &[Column] {
        &self.columns
    }
}
