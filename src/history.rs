// =============================================================================
// Price history: hand-off from the data provider
// =============================================================================
//
// The provider delivers parallel columns (timestamps, OHLC, adjusted close,
// volume).  Indicators and models never hold the whole history: they are
// built from a `PriceView`, a borrowed pair of timestamp and value slices.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::time_utils;

/// Which price column a view should expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    AdjClose,
    Volume,
}

impl Default for PriceField {
    fn default() -> Self {
        Self::Close
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::High => write!(f, "High"),
            Self::Low => write!(f, "Low"),
            Self::Close => write!(f, "Close"),
            Self::AdjClose => write!(f, "AdjClose"),
            Self::Volume => write!(f, "Volume"),
        }
    }
}

/// Historical bars for a single instrument, column-oriented.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceHistory {
    pub ticker: String,
    /// Provider interval name (`"1d"`, `"1h"`, ...), if known.
    #[serde(default)]
    pub interval: Option<String>,
    pub timestamps: Vec<i64>,
    pub opens: Vec<f64>,
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
    pub closes: Vec<f64>,
    pub adj_closes: Vec<f64>,
    pub volumes: Vec<f64>,
}

impl PriceHistory {
    /// Build a close-only history; the other price columns mirror `closes`
    /// and volume is zero.
    pub fn from_closes(ticker: impl Into<String>, timestamps: Vec<i64>, closes: Vec<f64>) -> Self {
        let len = closes.len();
        Self {
            ticker: ticker.into(),
            interval: None,
            timestamps,
            opens: closes.clone(),
            highs: closes.clone(),
            lows: closes.clone(),
            adj_closes: closes.clone(),
            closes,
            volumes: vec![0.0; len],
        }
    }

    pub fn with_interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = Some(interval.into());
        self
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Check the provider's guarantees: non-empty, equal-length columns,
    /// strictly increasing timestamps, finite prices and a known interval.
    pub fn validate(&self) -> Result<()> {
        if self.timestamps.is_empty() {
            return Err(EngineError::InvalidHistory(format!(
                "{}: no data points",
                self.ticker
            )));
        }

        let n = self.timestamps.len();
        let columns: [(&str, &[f64]); 6] = [
            ("open", &self.opens),
            ("high", &self.highs),
            ("low", &self.lows),
            ("close", &self.closes),
            ("adj_close", &self.adj_closes),
            ("volume", &self.volumes),
        ];
        for (name, column) in columns {
            if column.len() != n {
                return Err(EngineError::InvalidHistory(format!(
                    "{}: column {name} has {} values, expected {n}",
                    self.ticker,
                    column.len()
                )));
            }
            if let Some(idx) = column.iter().position(|v| !v.is_finite()) {
                return Err(EngineError::InvalidHistory(format!(
                    "{}: non-finite {name} value at index {idx}",
                    self.ticker
                )));
            }
        }

        check_increasing(&self.timestamps)?;

        if let Some(interval) = &self.interval {
            if !time_utils::is_valid_interval(interval) {
                let supported: Vec<&str> = time_utils::supported_intervals().collect();
                return Err(EngineError::InvalidHistory(format!(
                    "interval {interval} is not supported (supported: {})",
                    supported.join(" ")
                )));
            }
        }

        debug!(ticker = %self.ticker, points = n, "price history validated");
        Ok(())
    }

    /// Borrow the timestamps together with one value column.
    pub fn view(&self, field: PriceField) -> PriceView<'_> {
        let values: &[f64] = match field {
            PriceField::Open => &self.opens,
            PriceField::High => &self.highs,
            PriceField::Low => &self.lows,
            PriceField::Close => &self.closes,
            PriceField::AdjClose => &self.adj_closes,
            PriceField::Volume => &self.volumes,
        };
        PriceView {
            timestamps: &self.timestamps,
            values,
            interval: self.interval.as_deref(),
        }
    }

    pub fn closes(&self) -> PriceView<'_> {
        self.view(PriceField::Close)
    }
}

fn check_increasing(timestamps: &[i64]) -> Result<()> {
    match timestamps.windows(2).find(|w| w[1] <= w[0]) {
        Some(w) => Err(EngineError::NonMonotonicTimestamp {
            previous: w[0],
            next: w[1],
        }),
        None => Ok(()),
    }
}

// =============================================================================
// PriceView
// =============================================================================

/// Read-only view of timestamps plus one value column.
#[derive(Debug, Clone, Copy)]
pub struct PriceView<'a> {
    timestamps: &'a [i64],
    values: &'a [f64],
    interval: Option<&'a str>,
}

impl<'a> PriceView<'a> {
    /// Pair two slices.  They must have equal length and the timestamps must
    /// be strictly increasing.
    pub fn new(timestamps: &'a [i64], values: &'a [f64]) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(EngineError::InvalidHistory(format!(
                "{} timestamps but {} values",
                timestamps.len(),
                values.len()
            )));
        }
        check_increasing(timestamps)?;
        Ok(Self {
            timestamps,
            values,
            interval: None,
        })
    }

    pub fn with_interval(mut self, interval: &'a str) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn timestamps(&self) -> &'a [i64] {
        self.timestamps
    }

    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    pub fn interval(&self) -> Option<&'a str> {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PriceHistory {
        PriceHistory::from_closes("TEST", vec![0, 86_400, 172_800], vec![1.0, 2.0, 3.0])
            .with_interval("1d")
    }

    #[test]
    fn valid_history_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn empty_history_is_rejected() {
        let h = PriceHistory::from_closes("EMPTY", vec![], vec![]);
        assert!(matches!(h.validate(), Err(EngineError::InvalidHistory(_))));
    }

    #[test]
    fn mismatched_column_is_rejected() {
        let mut h = sample();
        h.volumes.pop();
        let err = h.validate().unwrap_err();
        assert!(err.to_string().contains("volume"));
    }

    #[test]
    fn unordered_timestamps_are_rejected() {
        let mut h = sample();
        h.timestamps = vec![0, 172_800, 86_400];
        assert!(matches!(
            h.validate(),
            Err(EngineError::NonMonotonicTimestamp { .. })
        ));
    }

    #[test]
    fn nan_price_is_rejected() {
        let mut h = sample();
        h.highs[1] = f64::NAN;
        assert!(h.validate().is_err());
    }

    #[test]
    fn unknown_interval_is_rejected() {
        let h = sample().with_interval("2d");
        let err = h.validate().unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }

    #[test]
    fn view_exposes_requested_column() {
        let mut h = sample();
        h.highs = vec![1.5, 2.5, 3.5];
        let view = h.view(PriceField::High);
        assert_eq!(view.values(), &[1.5, 2.5, 3.5]);
        assert_eq!(view.timestamps(), &[0, 86_400, 172_800]);
        assert_eq!(view.interval(), Some("1d"));
    }

    #[test]
    fn view_new_checks_lengths() {
        assert!(PriceView::new(&[1, 2], &[1.0]).is_err());
        assert!(PriceView::new(&[2, 1], &[1.0, 2.0]).is_err());
        assert_eq!(PriceView::new(&[1, 2], &[1.0, 2.0]).unwrap().len(), 2);
    }
}
