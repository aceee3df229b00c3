// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   MACD line = EMA(fast) - EMA(slow)
//   Signal    = EMA(signal) of the MACD line
//   Histogram = MACD line - Signal
//
// The MACD line starts where the later of the two EMAs is seeded, i.e. at
// index max(fast, slow) - 1.  The signal EMA needs `signal` MACD values for
// its own seed, so signal and histogram start `signal - 1` points later.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ema::{calculate_ema, Ema};
use super::table::{self, Column};
use super::{validate_period, Indicator};
use crate::error::Result;
use crate::history::PriceView;
use crate::series::{SeriesValue, TimeSeries};

/// One MACD observation.  `signal` and `histogram` are `None` until the
/// signal EMA has been seeded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
}

impl SeriesValue for MacdPoint {
    fn cells(&self) -> Vec<Option<f64>> {
        vec![Some(self.macd), self.signal, self.histogram]
    }
}

/// Raw MACD output on plain vectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacdLines {
    /// Starts at input index `max(fast, slow) - 1`.
    pub macd: Vec<f64>,
    /// Starts `signal - 1` entries into `macd`.
    pub signal: Vec<f64>,
    /// Same alignment as `signal`.
    pub histogram: Vec<f64>,
}

/// Compute MACD, signal and histogram vectors.
///
/// Returns empty vectors when any period is zero or the input is too short for
/// the slower EMA.  `signal` and `histogram` are empty when the MACD line is
/// shorter than `signal`.
pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdLines {
    if fast == 0 || slow == 0 || signal == 0 || closes.len() < fast.max(slow) {
        return MacdLines::default();
    }

    let fast_ema = calculate_ema(closes, fast);
    let slow_ema = calculate_ema(closes, slow);

    // Both EMA vectors end at the last close; trim the longer one's head.
    let start = fast.max(slow) - 1;
    let fast_tail = &fast_ema[start - (fast - 1)..];
    let slow_tail = &slow_ema[start - (slow - 1)..];

    let macd: Vec<f64> = fast_tail
        .iter()
        .zip(slow_tail)
        .map(|(f, s)| f - s)
        .collect();

    let signal_line = calculate_ema(&macd, signal);
    let histogram: Vec<f64> = if signal_line.is_empty() {
        Vec::new()
    } else {
        macd[signal - 1..]
            .iter()
            .zip(&signal_line)
            .map(|(m, s)| m - s)
            .collect()
    };

    MacdLines {
        macd,
        signal: signal_line,
        histogram,
    }
}

/// MACD indicator built from a price view.
#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    name: String,
    columns: Vec<Column>,
    series: TimeSeries<MacdPoint>,
}

impl Macd {
    pub const DEFAULT_FAST: usize = 12;
    pub const DEFAULT_SLOW: usize = 26;
    pub const DEFAULT_SIGNAL: usize = 9;

    /// Validate the two price EMAs against the data length and the signal EMA
    /// against the length of the MACD line it smooths.
    pub fn validate(fast: usize, slow: usize, signal: usize, available: usize) -> Result<()> {
        Ema::validate(fast, None, available)?;
        Ema::validate(slow, None, available)?;
        let macd_len = available + 1 - fast.max(slow);
        validate_period("signal", signal, macd_len)
    }

    pub fn new(view: PriceView<'_>, fast: usize, slow: usize, signal: usize) -> Result<Self> {
        Self::validate(fast, slow, signal, view.len())?;

        let lines = calculate_macd(view.values(), fast, slow, signal);
        let start = fast.max(slow) - 1;
        let signal_offset = signal - 1;

        let mut series = TimeSeries::with_capacity(lines.macd.len());
        for (i, (&ts, &macd)) in view.timestamps()[start..].iter().zip(&lines.macd).enumerate() {
            let (signal_value, histogram) = match i.checked_sub(signal_offset) {
                Some(j) => (Some(lines.signal[j]), Some(lines.histogram[j])),
                None => (None, None),
            };
            series.push(
                ts,
                MacdPoint {
                    macd,
                    signal: signal_value,
                    histogram,
                },
            )?;
        }

        let name = format!("MACD({fast}, {slow}, {signal})");
        debug!(indicator = %name, points = series.len(), "MACD computed");

        Ok(Self {
            fast,
            slow,
            signal,
            name,
            columns: table::columns(&["MACD", "Signal", "Histogram"]),
            series,
        })
    }

    pub fn periods(&self) -> (usize, usize, usize) {
        (self.fast, self.slow, self.signal)
    }

    /// The MACD line on its own.
    pub fn line(&self) -> TimeSeries<f64> {
        self.project(|p| Some(p.macd))
    }

    /// The signal line, starting at its seed.
    pub fn signal_line(&self) -> TimeSeries<f64> {
        self.project(|p| p.signal)
    }

    /// The histogram, aligned with the signal line.
    pub fn histogram(&self) -> TimeSeries<f64> {
        self.project(|p| p.histogram)
    }

    fn project(&self, pick: impl Fn(&MacdPoint) -> Option<f64>) -> TimeSeries<f64> {
        TimeSeries::from_ordered(
            self.series
                .iter()
                .filter_map(|(ts, point)| pick(point).map(|v| (ts, v)))
                .collect(),
        )
    }
}

impl Indicator for Macd {
    type Value = MacdPoint;

    fn name(&self) -> &str {
        &self.name
    }

    fn series(&self) -> &TimeSeries<MacdPoint> {
        &self.series
    }

    fn columns(&self) -> &[Column] {
        &self.columns
    }
}
