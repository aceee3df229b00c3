// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Every indicator comes in two layers:
//
// - a pure `calculate_*` function on slices that returns an empty result for
//   unusable input, and
// - a struct built from a `PriceView` that validates its parameters first,
//   then owns the timestamped series, its display name and column metadata.
//
// `IndicatorSpec` is the closed set of indicator kinds; `compute` dispatches
// to the matching struct and wraps it in `IndicatorOutput`.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod table;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::history::PriceView;
use crate::series::{SeriesValue, TimeSeries};
use crate::types::MovingAverageKind;

pub use bollinger::{BandPoint, BollingerBands};
pub use ema::Ema;
pub use macd::{Macd, MacdPoint};
pub use rsi::Rsi;
pub use sma::Sma;
pub use table::{Column, TableSettings};

// =============================================================================
// Shared helpers
// =============================================================================

/// A period must be at least 1 and must not exceed the available points.
pub(crate) fn validate_period(name: &str, period: usize, available: usize) -> Result<()> {
    if period < 1 {
        return Err(EngineError::invalid_parameter(
            name,
            "period must be greater than 0",
        ));
    }
    if period > available {
        return Err(EngineError::invalid_parameter(
            name,
            format!("period {period} exceeds the {available} available data points"),
        ));
    }
    Ok(())
}

/// Attach `values` to `timestamps[offset..]`.
pub(crate) fn align_to_timestamps<V>(
    timestamps: &[i64],
    offset: usize,
    values: Vec<V>,
) -> Result<TimeSeries<V>> {
    let mut series = TimeSeries::with_capacity(values.len());
    for (&ts, value) in timestamps[offset..].iter().zip(values) {
        series.push(ts, value)?;
    }
    Ok(series)
}

// =============================================================================
// Indicator contract
// =============================================================================

/// What every computed indicator exposes to the presentation layer.
pub trait Indicator {
    type Value: SeriesValue;

    /// Display name encoding kind and parameters, e.g. `EMA(20d, α=0.10)`.
    fn name(&self) -> &str;

    fn series(&self) -> &TimeSeries<Self::Value>;

    /// Date column followed by one column per value.
    fn columns(&self) -> &[Column];

    /// One formatted row per point of the series.
    fn table_rows(&self, settings: &TableSettings) -> Vec<Vec<String>> {
        table::rows(self.series(), settings)
    }

    /// One formatted row per entry of `timestamps`, blank where the series
    /// has no value.
    fn aligned_rows(&self, timestamps: &[i64], settings: &TableSettings) -> Vec<Vec<String>> {
        let value_columns = self.columns().len().saturating_sub(1);
        table::aligned_rows(self.series(), value_columns, timestamps, settings)
    }
}

// =============================================================================
// IndicatorSpec / IndicatorOutput
// =============================================================================

fn default_rsi_period() -> usize {
    Rsi::DEFAULT_PERIOD
}

fn default_macd_fast() -> usize {
    Macd::DEFAULT_FAST
}

fn default_macd_slow() -> usize {
    Macd::DEFAULT_SLOW
}

fn default_macd_signal() -> usize {
    Macd::DEFAULT_SIGNAL
}

fn default_band_period() -> usize {
    BollingerBands::DEFAULT_PERIOD
}

fn default_num_std() -> f64 {
    BollingerBands::DEFAULT_NUM_STD
}

/// Parameters of one indicator, as listed in the engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorSpec {
    Sma {
        period: usize,
    },
    Ema {
        period: usize,
        #[serde(default)]
        alpha: Option<f64>,
    },
    Rsi {
        #[serde(default = "default_rsi_period")]
        period: usize,
    },
    Macd {
        #[serde(default = "default_macd_fast")]
        fast: usize,
        #[serde(default = "default_macd_slow")]
        slow: usize,
        #[serde(default = "default_macd_signal")]
        signal: usize,
    },
    Bollinger {
        #[serde(default = "default_band_period")]
        period: usize,
        #[serde(default = "default_num_std")]
        num_std: f64,
        #[serde(default)]
        moving_average: MovingAverageKind,
    },
}

impl IndicatorSpec {
    /// The conventional overlay set: SMA(20), EMA(20), RSI(14),
    /// MACD(12, 26, 9) and Bollinger(20, 2σ, SMA).
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::Sma {
                period: Sma::DEFAULT_PERIOD,
            },
            Self::Ema {
                period: Ema::DEFAULT_PERIOD,
                alpha: None,
            },
            Self::Rsi {
                period: Rsi::DEFAULT_PERIOD,
            },
            Self::Macd {
                fast: Macd::DEFAULT_FAST,
                slow: Macd::DEFAULT_SLOW,
                signal: Macd::DEFAULT_SIGNAL,
            },
            Self::Bollinger {
                period: BollingerBands::DEFAULT_PERIOD,
                num_std: BollingerBands::DEFAULT_NUM_STD,
                moving_average: MovingAverageKind::Simple,
            },
        ]
    }

    /// Check the parameters against `available` data points without
    /// computing anything.
    pub fn validate(&self, available: usize) -> Result<()> {
        match *self {
            Self::Sma { period } => Sma::validate(period, available),
            Self::Ema { period, alpha } => Ema::validate(period, alpha, available).map(|_| ()),
            Self::Rsi { period } => Rsi::validate(period, available),
            Self::Macd { fast, slow, signal } => Macd::validate(fast, slow, signal, available),
            Self::Bollinger {
                period, num_std, ..
            } => BollingerBands::validate(period, num_std, available),
        }
    }

    pub fn compute(&self, view: PriceView<'_>) -> Result<IndicatorOutput> {
        let output = match *self {
            Self::Sma { period } => IndicatorOutput::Sma(Sma::new(view, period)?),
            Self::Ema { period, alpha } => IndicatorOutput::Ema(Ema::new(view, period, alpha)?),
            Self::Rsi { period } => IndicatorOutput::Rsi(Rsi::new(view, period)?),
            Self::Macd { fast, slow, signal } => {
                IndicatorOutput::Macd(Macd::new(view, fast, slow, signal)?)
            }
            Self::Bollinger {
                period,
                num_std,
                moving_average,
            } => IndicatorOutput::Bollinger(BollingerBands::new(
                view,
                period,
                num_std,
                moving_average,
            )?),
        };
        Ok(output)
    }
}

/// A computed indicator of any kind.
#[derive(Debug, Clone)]
pub enum IndicatorOutput {
    Sma(Sma),
    Ema(Ema),
    Rsi(Rsi),
    Macd(Macd),
    Bollinger(BollingerBands),
}

impl IndicatorOutput {
    pub fn name(&self) -> &str {
        match self {
            Self::Sma(i) => i.name(),
            Self::Ema(i) => i.name(),
            Self::Rsi(i) => i.name(),
            Self::Macd(i) => i.name(),
            Self::Bollinger(i) => i.name(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        match self {
            Self::Sma(i) => i.columns(),
            Self::Ema(i) => i.columns(),
            Self::Rsi(i) => i.columns(),
            Self::Macd(i) => i.columns(),
            Self::Bollinger(i) => i.columns(),
        }
    }

    /// Number of points in the underlying series.
    pub fn len(&self) -> usize {
        match self {
            Self::Sma(i) => i.series().len(),
            Self::Ema(i) => i.series().len(),
            Self::Rsi(i) => i.series().len(),
            Self::Macd(i) => i.series().len(),
            Self::Bollinger(i) => i.series().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn table_rows(&self, settings: &TableSettings) -> Vec<Vec<String>> {
        match self {
            Self::Sma(i) => i.table_rows(settings),
            Self::Ema(i) => i.table_rows(settings),
            Self::Rsi(i) => i.table_rows(settings),
            Self::Macd(i) => i.table_rows(settings),
            Self::Bollinger(i) => i.table_rows(settings),
        }
    }

    pub fn aligned_rows(&self, timestamps: &[i64], settings: &TableSettings) -> Vec<Vec<String>> {
        match self {
            Self::Sma(i) => i.aligned_rows(timestamps, settings),
            Self::Ema(i) => i.aligned_rows(timestamps, settings),
            Self::Rsi(i) => i.aligned_rows(timestamps, settings),
            Self::Macd(i) => i.aligned_rows(timestamps, settings),
            Self::Bollinger(i) => i.aligned_rows(timestamps, settings),
        }
    }
}

/// Compute independent indicators over the same view in parallel.
///
/// Results come back in the order of `specs`; each entry fails or succeeds on
/// its own.
pub fn compute_all(specs: &[IndicatorSpec], view: PriceView<'_>) -> Vec<Result<IndicatorOutput>> {
    debug!(count = specs.len(), points = view.len(), "computing indicator batch");
    specs.par_iter().map(|spec| spec.compute(view)).collect()
}
