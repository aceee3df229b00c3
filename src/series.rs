// =============================================================================
// TimeSeries: ordered timestamp → value mapping
// =============================================================================
//
// The common currency between the price history, the indicator engine and
// the forecast engine.  Points are stored in a flat vector in strictly
// increasing timestamp order; `push` refuses anything that would break that
// order, so lookups can binary-search.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// A value that can be laid out as one or more table cells.
///
/// `None` cells are rendered as blank placeholders.
pub trait SeriesValue {
    fn cells(&self) -> Vec<Option<f64>>;
}

impl SeriesValue for f64 {
    fn cells(&self) -> Vec<Option<f64>> {
        vec![Some(*self)]
    }
}

/// Ordered mapping from a Unix timestamp (seconds) to a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries<V> {
    points: Vec<(i64, V)>,
}

impl<V> Default for TimeSeries<V> {
    fn default() -> Self {
        Self { points: Vec::new() }
    }
}

impl<V> TimeSeries<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Append a point.  The timestamp must be strictly greater than the last
    /// one already stored.
    pub fn push(&mut self, timestamp: i64, value: V) -> Result<()> {
        if let Some(&(previous, _)) = self.points.last() {
            if timestamp <= previous {
                return Err(EngineError::NonMonotonicTimestamp {
                    previous,
                    next: timestamp,
                });
            }
        }
        self.points.push((timestamp, value));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value stored at exactly `timestamp`, if any.
    pub fn get(&self, timestamp: i64) -> Option<&V> {
        self.points
            .binary_search_by_key(&timestamp, |&(ts, _)| ts)
            .ok()
            .map(|idx| &self.points[idx].1)
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.get(timestamp).is_some()
    }

    pub fn first(&self) -> Option<(i64, &V)> {
        self.points.first().map(|(ts, v)| (*ts, v))
    }

    pub fn last(&self) -> Option<(i64, &V)> {
        self.points.last().map(|(ts, v)| (*ts, v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &V)> + '_ {
        self.points.iter().map(|(ts, v)| (*ts, v))
    }

    pub fn timestamps(&self) -> impl Iterator<Item = i64> + '_ {
        self.points.iter().map(|(ts, _)| *ts)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.points.iter().map(|(_, v)| v)
    }

    /// Spacing between the last two timestamps.
    pub fn trailing_interval(&self) -> Option<i64> {
        match self.points.as_slice() {
            [.., (a, _), (b, _)] => Some(b - a),
            _ => None,
        }
    }

    /// Wrap points already known to be in strictly increasing order, such as
    /// a filtered copy of another series.
    pub(crate) fn from_ordered(points: Vec<(i64, V)>) -> Self {
        debug_assert!(points.windows(2).all(|w| w[0].0 < w[1].0));
        Self { points }
    }

    /// Build a series from `(timestamp, value)` pairs, validating the order.
    pub fn try_from_pairs(pairs: impl IntoIterator<Item = (i64, V)>) -> Result<Self> {
        let mut series = Self::new();
        for (ts, v) in pairs {
            series.push(ts, v)?;
        }
        Ok(series)
    }
}

impl<V: Copy> TimeSeries<V> {
    /// Copy of the values in timestamp order.
    pub fn to_values(&self) -> Vec<V> {
        self.points.iter().map(|&(_, v)| v).collect()
    }
}
