// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// Arithmetic mean of the most recent `period` values.
//
// The first window is summed once; after that the running sum is maintained
// in O(1) per step by subtracting the value leaving the window and adding the
// value entering it.
// =============================================================================

use tracing::debug;

use super::table::{self, Column};
use super::{align_to_timestamps, validate_period, Indicator};
use crate::error::Result;
use crate::history::PriceView;
use crate::series::TimeSeries;

/// Compute the SMA series for `values` and window length `period`.
///
/// Returns an empty `Vec` when `period == 0` or the input is shorter than
/// `period`.  Element `i` of the output belongs to input index
/// `i + period - 1`.
pub fn calculate_sma(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let period_f = period as f64;
    let mut sum: f64 = values[..period].iter().sum();

    let mut result = Vec::with_capacity(values.len() - period + 1);
    result.push(sum / period_f);

    for i in period..values.len() {
        sum += values[i] - values[i - period];
        result.push(sum / period_f);
    }

    result
}

/// SMA indicator built from a price view.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
    columns: Vec<Column>,
    series: TimeSeries<f64>,
}

impl Sma {
    pub const DEFAULT_PERIOD: usize = 20;

    /// Reject a period that is zero or longer than the available data.
    pub fn validate(period: usize, available: usize) -> Result<()> {
        validate_period("period", period, available)
    }

    pub fn new(view: PriceView<'_>, period: usize) -> Result<Self> {
        Self::validate(period, view.len())?;

        let values = calculate_sma(view.values(), period);
        let series = align_to_timestamps(view.timestamps(), period - 1, values)?;
        let name = format!("SMA({period}d)");

        debug!(indicator = %name, points = series.len(), "SMA computed");

        Ok(Self {
            period,
            name,
            columns: table::columns(&["SMA"]),
            series,
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
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
