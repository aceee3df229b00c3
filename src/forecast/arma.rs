// =============================================================================
// ARMA(p, q) recurrence
// =============================================================================
//
//   x_t = c + Σ_{i=1..p} φ_i · x_{t-i} + Σ_{j=1..q} θ_j · ε_{t-j} + ε_t
//
// AR(p) is ARMA(p, 0) and MA(q) is ARMA(0, q).
//
// In-sample residuals are produced recursively: ε_t = 0 for t < p, and for
// t >= p the residual is the actual value minus the one-step prediction built
// from the observed lags and the residuals already computed.  Residuals
// before the start of the series count as 0.
//
// The loss minimised during training is Σ_{t >= p} ε_t².  Parameters are
// packed as [c, φ_1..φ_p, θ_1..θ_q].
//
// Projection feeds each forecast back in as a lag and assumes future
// residuals are 0, so the MA contribution vanishes after q steps.
// =============================================================================

use serde::Serialize;

use super::optimizer::{minimize, OptimizerSettings};
use crate::error::{EngineError, Result};

/// Coefficients of a fitted ARMA recurrence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArmaCoefficients {
    pub intercept: f64,
    pub phis: Vec<f64>,
    pub thetas: Vec<f64>,
}

impl ArmaCoefficients {
    fn unpack(params: &[f64], p: usize, q: usize) -> Self {
        Self {
            intercept: params[0],
            phis: params[1..1 + p].to_vec(),
            thetas: params[1 + p..1 + p + q].to_vec(),
        }
    }

    pub fn ar_order(&self) -> usize {
        self.phis.len()
    }

    pub fn ma_order(&self) -> usize {
        self.thetas.len()
    }
}

/// In-sample fit quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitDiagnostics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    /// Optimizer iterations spent, restarts included.
    pub iterations: usize,
    pub converged: bool,
}

/// Result of [`fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct ArmaFit {
    pub coefficients: ArmaCoefficients,
    /// One entry per input value; zero for `t < p`.
    pub residuals: Vec<f64>,
    pub diagnostics: FitDiagnostics,
}

/// Smallest series an ARMA(p, q) fit accepts: `p` lags plus strictly more
/// residuals than the `1 + p + q` estimated parameters.
pub fn min_observations(p: usize, q: usize) -> usize {
    2 * p + q + 2
}

/// One-step residuals of `values` under the given coefficients.
pub fn residuals(values: &[f64], intercept: f64, phis: &[f64], thetas: &[f64]) -> Vec<f64> {
    let p = phis.len();
    let mut eps = vec![0.0; values.len()];

    for t in p..values.len() {
        let mut prediction = intercept;
        for (i, phi) in phis.iter().enumerate() {
            prediction += phi * values[t - i - 1];
        }
        for (j, theta) in thetas.iter().enumerate() {
            if let Some(lag) = t.checked_sub(j + 1) {
                prediction += theta * eps[lag];
            }
        }
        eps[t] = values[t] - prediction;
    }
    eps
}

/// Sum of squared residuals for `t >= p`.
pub fn sum_squared_residuals(values: &[f64], intercept: f64, phis: &[f64], thetas: &[f64]) -> f64 {
    residuals(values, intercept, phis, thetas)
        .iter()
        .skip(phis.len())
        .map(|e| e * e)
        .sum()
}

/// Estimate ARMA(p, q) coefficients by minimising the sum of squared
/// residuals.
///
/// Starts from intercept = sample mean and all coefficients 0.
pub fn fit(values: &[f64], p: usize, q: usize, settings: &OptimizerSettings) -> Result<ArmaFit> {
    let required = min_observations(p, q);
    if values.len() < required {
        return Err(EngineError::InsufficientData {
            required,
            actual: values.len(),
        });
    }
    settings.validate()?;

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let mut start = vec![0.0; 1 + p + q];
    start[0] = mean;

    let loss = |params: &[f64]| {
        sum_squared_residuals(values, params[0], &params[1..1 + p], &params[1 + p..])
    };
    let minimum = minimize(loss, &start, settings);

    let coefficients = ArmaCoefficients::unpack(&minimum.params, p, q);
    let residuals = residuals(
        values,
        coefficients.intercept,
        &coefficients.phis,
        &coefficients.thetas,
    );

    let in_sample = &residuals[p..];
    let count = in_sample.len() as f64;
    let mse = in_sample.iter().map(|e| e * e).sum::<f64>() / count;
    let mae = in_sample.iter().map(|e| e.abs()).sum::<f64>() / count;

    Ok(ArmaFit {
        coefficients,
        residuals,
        diagnostics: FitDiagnostics {
            mse,
            rmse: mse.sqrt(),
            mae,
            iterations: minimum.iterations,
            converged: minimum.converged,
        },
    })
}

/// Extend `values` by `steps` forecasts.
///
/// `residuals` must be the in-sample residuals of `values`, as returned by
/// [`residuals`].
pub fn project(
    values: &[f64],
    residuals: &[f64],
    coefficients: &ArmaCoefficients,
    steps: usize,
) -> Vec<f64> {
    let mut history = values.to_vec();
    let mut eps = residuals.to_vec();
    history.reserve(steps);
    eps.reserve(steps);

    for _ in 0..steps {
        let t = history.len();
        let mut next = coefficients.intercept;
        for (i, phi) in coefficients.phis.iter().enumerate() {
            if let Some(lag) = t.checked_sub(i + 1) {
                next += phi * history[lag];
            }
        }
        for (j, theta) in coefficients.thetas.iter().enumerate() {
            if let Some(lag) = t.checked_sub(j + 1) {
                next += theta * eps[lag];
            }
        }
        history.push(next);
        eps.push(0.0);
    }

    history.split_off(values.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// x_t = 0.7 x_{t-1} + small deterministic disturbance.
    fn ar1_series(n: usize) -> Vec<f64> {
        let mut x = vec![10.0];
        for t in 1..n {
            let noise = 1e-3 * (t as f64 * 1.3).sin();
            x.push(0.7 * x[t - 1] + noise);
        }
        x
    }

    #[test]
    fn residuals_zero_before_first_lag() {
        let eps = residuals(&[1.0, 2.0, 3.0, 4.0], 0.0, &[1.0, 0.0], &[]);
        assert_eq!(eps[0], 0.0);
        assert_eq!(eps[1], 0.0);
        // x_2 - x_1 = 1, x_3 - x_2 = 1
        assert_eq!(&eps[2..], &[1.0, 1.0]);
    }

    #[test]
    fn ma_residuals_are_recursive() {
        // ε_0 = 1 - 0 = 1, ε_1 = 2 - 0.5 * 1 = 1.5, ε_2 = 0 - 0.5 * 1.5 = -0.75
        let eps = residuals(&[1.0, 2.0, 0.0], 0.0, &[], &[0.5]);
        assert_eq!(eps, vec![1.0, 1.5, -0.75]);
    }

    #[test]
    fn exact_ar_process_has_zero_loss() {
        let mut x = vec![1.0];
        for t in 1..20 {
            x.push(2.0 + 0.5 * x[t - 1]);
        }
        assert!(sum_squared_residuals(&x, 2.0, &[0.5], &[]) < 1e-20);
    }

    #[test]
    fn fit_recovers_ar1_coefficient() {
        let x = ar1_series(60);
        let fit = fit(&x, 1, 0, &OptimizerSettings::default()).unwrap();
        let phi = fit.coefficients.phis[0];
        assert!((phi - 0.7).abs() < 0.05, "phi = {phi}");
        assert!(fit.diagnostics.rmse < 0.01);
        assert_eq!(fit.residuals.len(), 60);
    }

    #[test]
    fn fit_reports_consistent_errors() {
        let x: Vec<f64> = (0..40).map(|i| 5.0 + (i as f64 * 0.4).sin()).collect();
        let fit = fit(&x, 1, 1, &OptimizerSettings::default()).unwrap();
        let d = fit.diagnostics;
        assert!((d.rmse - d.mse.sqrt()).abs() < 1e-12);
        assert!(d.mae <= d.rmse + 1e-12);
        assert!(d.iterations > 0);
    }

    #[test]
    fn fit_rejects_short_series() {
        // ARMA(2, 1) needs 2 * 2 + 1 + 2 = 7 points.
        let x = [1.0, 2.0, 3.0, 2.0, 1.0, 2.0];
        let err = fit(&x, 2, 1, &OptimizerSettings::default()).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientData {
                required: 7,
                actual: 6
            }
        );
    }

    #[test]
    fn projection_feeds_back_forecasts() {
        let coefficients = ArmaCoefficients {
            intercept: 1.0,
            phis: vec![0.5],
            thetas: vec![],
        };
        let out = project(&[2.0], &[0.0], &coefficients, 3);
        // 1 + 0.5*2 = 2, 1 + 0.5*2 = 2, ...
        assert_eq!(out, vec![2.0, 2.0, 2.0]);

        let out = project(&[4.0], &[0.0], &coefficients, 2);
        assert_eq!(out, vec![3.0, 2.5]);
    }

    #[test]
    fn ma_projection_decays_to_intercept() {
        let coefficients = ArmaCoefficients {
            intercept: 3.0,
            phis: vec![],
            thetas: vec![0.4, 0.2],
        };
        let out = project(&[3.5, 2.0], &[0.5, -1.0], &coefficients, 4);
        assert_eq!(out[0], 3.0 + 0.4 * -1.0 + 0.2 * 0.5);
        assert_eq!(out[1], 3.0 + 0.2 * -1.0);
        assert_eq!(out[2], 3.0);
        assert_eq!(out[3], 3.0);
    }

    #[test]
    fn zero_steps_is_empty() {
        let coefficients = ArmaCoefficients {
            intercept: 0.0,
            phis: vec![0.9],
            thetas: vec![],
        };
        assert!(project(&[1.0, 2.0], &[0.0, 0.0], &coefficients, 0).is_empty());
    }
}
