// =============================================================================
// Relative Strength Index (RSI): Wilder's Smoothing
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1: Compute price changes (deltas) from consecutive closes.
// Step 2: Seed average gain / average loss with the SMA of the first `period`
//          gains / losses.
// Step 3: Apply Wilder's exponential smoothing:
//            avg_gain = (prev_avg_gain * (period - 1) + current_gain) / period
//            avg_loss = (prev_avg_loss * (period - 1) + current_loss) / period
// Step 4: RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// This is a first-order IIR smoother, not a rolling window: each value
// depends on the whole history through the recurrence.
// =============================================================================

use tracing::debug;

use super::table::{self, Column};
use super::{align_to_timestamps, validate_period, Indicator};
use crate::error::{EngineError, Result};
use crate::history::PriceView;
use crate::series::TimeSeries;

/// Compute the full RSI series for the given `closes` and `period`.
///
/// The returned vector has one RSI value for each close starting at index
/// `period` (the first `period` closes are consumed to seed the averages).
///
/// # Edge cases
/// - `period == 0` => empty vec
/// - `closes.len() < period + 1` => empty vec (need at least `period` deltas)
/// - If average loss is zero, RSI saturates at 100.0.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period + 1 {
        return Vec::new();
    }

    // --- Compute price deltas ------------------------------------------------
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    // --- Seed averages with SMA of first `period` deltas ---------------------
    let (sum_gain, sum_loss) = deltas[..period].iter().fold((0.0_f64, 0.0_f64), |(g, l), &d| {
        if d > 0.0 {
            (g + d, l)
        } else {
            (g, l - d)
        }
    });

    let period_f = period as f64;
    let mut avg_gain = sum_gain / period_f;
    let mut avg_loss = sum_loss / period_f;

    let mut result = Vec::with_capacity(deltas.len() - period + 1);
    result.push(rsi_from_averages(avg_gain, avg_loss));

    // --- Wilder's smoothing for subsequent values ----------------------------
    for &delta in &deltas[period..] {
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);

        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;

        result.push(rsi_from_averages(avg_gain, avg_loss));
    }

    result
}

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// Zero average loss saturates at 100.0, including the flat-market case where
/// the average gain is zero as well.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

/// RSI indicator built from a price view.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
    columns: Vec<Column>,
    series: TimeSeries<f64>,
}

impl Rsi {
    pub const DEFAULT_PERIOD: usize = 14;

    /// The period must be positive and there must be at least `period + 1`
    /// closes (one delta per period step).
    pub fn validate(period: usize, available: usize) -> Result<()> {
        validate_period("period", period, available)?;
        if available < period + 1 {
            return Err(EngineError::InsufficientData {
                required: period + 1,
                actual: available,
            });
        }
        Ok(())
    }

    pub fn new(view: PriceView<'_>, period: usize) -> Result<Self> {
        Self::validate(period, view.len())?;

        let values = calculate_rsi(view.values(), period);
        let series = align_to_timestamps(view.timestamps(), period, values)?;
        let name = format!("RSI({period}d)");

        debug!(indicator = %name, points = series.len(), "RSI computed");

        Ok(Self {
            period,
            name,
            columns: table::columns(&["RSI"]),
            series,
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Most recent RSI value together with a human-readable label.
    pub fn current(&self) -> Option<(f64, &'static str)> {
        let (_, &value) = self.series.last()?;
        let label = if value >= 70.0 {
            "OVERBOUGHT"
        } else if value <= 30.0 {
            "OVERSOLD"
        } else {
            "NEUTRAL"
        };
        Some((value, label))
    }
}

impl Indicator for Rsi {
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

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn daily(n: usize) -> Vec<i64> {
        (0..n as i64).map(|i| i * 86_400).collect()
    }

    // ---- calculate_rsi ---------------------------------------------------

    #[test]
    fn rsi_empty_input() {
        assert!(calculate_rsi(&[], 14).is_empty());
    }

    #[test]
    fn rsi_period_zero() {
        assert!(calculate_rsi(&[1.0, 2.0, 3.0], 0).is_empty());
    }

    #[test]
    fn rsi_insufficient_data() {
        // Need period+1 closes (period deltas). 14 closes => 13 deltas < 14.
        assert!(calculate_rsi(&(1..=14).map(|x| x as f64).collect::<Vec<_>>(), 14).is_empty());
    }

    #[test]
    fn rsi_all_gains() {
        // Strictly ascending prices => RSI should be 100.
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let series = calculate_rsi(&closes, 14);
        assert_eq!(series.len(), 30 - 14);
        for &v in &series {
            assert!((v - 100.0).abs() < 1e-10, "expected 100.0, got {v}");
        }
    }

    #[test]
    fn rsi_all_losses() {
        // Strictly descending prices => RSI should be 0.
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        let series = calculate_rsi(&closes, 14);
        assert!(!series.is_empty());
        for &v in &series {
            assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
        }
    }

    #[test]
    fn rsi_flat_market_saturates() {
        // No losses at all => average loss is zero => saturate at 100.
        let closes = vec![100.0; 30];
        for v in calculate_rsi(&closes, 14) {
            assert_eq!(v, 100.0);
        }
    }

    #[test]
    fn rsi_range_check() {
        // Arbitrary data: RSI must always be in [0, 100].
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        let series = calculate_rsi(&closes, 14);
        assert_eq!(series.len(), 4);
        for &v in &series {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }

    #[test]
    fn rsi_follows_wilder_recurrence() {
        // period 2: deltas +2, -1, +3
        // seed: gain (2+0)/2 = 1.0, loss (0+1)/2 = 0.5 => RS 2 => 66.67
        // next: gain (1*1+3)/2 = 2.0, loss (0.5*1+0)/2 = 0.25 => RS 8 => 88.89
        let series = calculate_rsi(&[10.0, 12.0, 11.0, 14.0], 2);
        assert_eq!(series.len(), 2);
        assert!((series[0] - 200.0 / 3.0).abs() < 1e-10);
        assert!((series[1] - 800.0 / 9.0).abs() < 1e-10);
    }

    // ---- Rsi -------------------------------------------------------------

    #[test]
    fn rsi_starts_at_period_index() {
        let ts = daily(20);
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let rsi = Rsi::new(PriceView::new(&ts, &closes).unwrap(), 14).unwrap();
        assert_eq!(rsi.name(), "RSI(14d)");
        assert_eq!(rsi.series().first().unwrap().0, ts[14]);
        assert_eq!(rsi.series().len(), 6);
    }

    #[test]
    fn rsi_needs_one_more_close_than_period() {
        let ts = daily(14);
        let closes: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        let view = PriceView::new(&ts, &closes).unwrap();
        assert!(matches!(
            Rsi::new(view, 14),
            Err(EngineError::InsufficientData {
                required: 15,
                actual: 14
            })
        ));
        assert!(matches!(
            Rsi::new(view, 15),
            Err(EngineError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn current_rsi_labels() {
        let ts = daily(30);
        let up: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let down: Vec<f64> = up.iter().rev().copied().collect();

        let rsi = Rsi::new(PriceView::new(&ts, &up).unwrap(), 14).unwrap();
        assert_eq!(rsi.current().unwrap().1, "OVERBOUGHT");

        let rsi = Rsi::new(PriceView::new(&ts, &down).unwrap(), 14).unwrap();
        let (val, label) = rsi.current().unwrap();
        assert!(val.abs() < 1e-10);
        assert_eq!(label, "OVERSOLD");
    }
}
