// =============================================================================
// AR / MA / ARMA forecast models
// =============================================================================
//
// Each model owns the historical series it was built from and walks through
//
//   Untrained --train--> Trained --forecast--> Forecasted --forecast--> ...
//
// Training may be repeated (with a different order) at any time and drops a
// previous forecast.  Forecasting recomputes the projection from scratch on
// every call, so repeated calls with the same horizon give identical output.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::arma::{self, ArmaCoefficients, ArmaFit, FitDiagnostics};
use super::optimizer::OptimizerSettings;
use crate::error::{EngineError, Result};
use crate::history::PriceView;
use crate::indicators::table::{self, Column, TableSettings};
use crate::series::TimeSeries;
use crate::time_utils::interval_seconds;
use crate::types::ModelState;

/// Behaviour shared by every forecast model.
pub trait TimeSeriesModel: Send {
    /// `AR(2)`, `MA(1)`, `ARMA(1, 1)`; just the family before training.
    fn name(&self) -> String;

    fn history(&self) -> &TimeSeries<f64>;

    fn state(&self) -> ModelState;

    /// `None` until trained.
    fn diagnostics(&self) -> Option<&FitDiagnostics>;

    /// Project `steps` points past the end of the history.
    fn forecast(&mut self, steps: usize) -> Result<&TimeSeries<f64>>;

    /// The most recent projection, if any.
    fn forecasted(&self) -> Option<&TimeSeries<f64>>;

    /// One-line description of the order, coefficients and errors.
    fn summary(&self) -> String;

    fn forecast_columns(&self) -> Vec<Column> {
        table::columns(&["Forecast"])
    }

    /// Formatted rows of the most recent projection; empty before the first
    /// forecast.
    fn forecast_rows(&self, settings: &TableSettings) -> Vec<Vec<String>> {
        self.forecasted()
            .map(|series| table::rows(series, settings))
            .unwrap_or_default()
    }
}

// =============================================================================
// Shared model state
// =============================================================================

#[derive(Debug, Clone)]
struct ModelCore {
    family: &'static str,
    history: TimeSeries<f64>,
    values: Vec<f64>,
    interval: Option<String>,
    settings: OptimizerSettings,
    fit: Option<ArmaFit>,
    forecasted: Option<TimeSeries<f64>>,
}

impl ModelCore {
    fn new(family: &'static str, view: PriceView<'_>) -> Result<Self> {
        let history = TimeSeries::try_from_pairs(
            view.timestamps().iter().copied().zip(view.values().iter().copied()),
        )?;
        Ok(Self {
            family,
            history,
            values: view.values().to_vec(),
            interval: view.interval().map(str::to_string),
            settings: OptimizerSettings::default(),
            fit: None,
            forecasted: None,
        })
    }

    fn state(&self) -> ModelState {
        match (&self.fit, &self.forecasted) {
            (None, _) => ModelState::Untrained,
            (Some(_), None) => ModelState::Trained,
            (Some(_), Some(_)) => ModelState::Forecasted,
        }
    }

    fn train(&mut self, p: usize, q: usize) -> Result<()> {
        let fit = arma::fit(&self.values, p, q, &self.settings)?;
        let c = &fit.coefficients;

        if c.phis.iter().map(|x| x.abs()).sum::<f64>() >= 1.0 {
            warn!(
                model = self.family,
                phis = ?c.phis,
                "AR coefficients may describe a non-stationary process"
            );
        }
        if c.thetas.iter().map(|x| x.abs()).sum::<f64>() >= 1.0 {
            warn!(
                model = self.family,
                thetas = ?c.thetas,
                "MA coefficients may describe a non-invertible process"
            );
        }
        info!(
            model = self.family,
            p,
            q,
            mse = fit.diagnostics.mse,
            iterations = fit.diagnostics.iterations,
            converged = fit.diagnostics.converged,
            "model trained"
        );

        self.fit = Some(fit);
        self.forecasted = None;
        Ok(())
    }

    fn cadence(&self) -> Result<i64> {
        if let Some(step) = self.history.trailing_interval() {
            return Ok(step);
        }
        self.interval
            .as_deref()
            .and_then(interval_seconds)
            .ok_or_else(|| {
                EngineError::InvalidHistory(
                    "cannot infer forecast spacing from a single point without an interval"
                        .to_string(),
                )
            })
    }

    fn forecast(&mut self, name: &str, steps: usize) -> Result<&TimeSeries<f64>> {
        let fit = self.fit.as_ref().ok_or_else(|| EngineError::NotTrained {
            model: name.to_string(),
        })?;

        let projected = arma::project(&self.values, &fit.residuals, &fit.coefficients, steps);
        let mut series = TimeSeries::with_capacity(steps);
        if steps > 0 {
            let step = self.cadence()?;
            let (last, _) = self.history.last().ok_or_else(|| {
                EngineError::InvalidHistory("history is empty".to_string())
            })?;
            for (k, value) in projected.into_iter().enumerate() {
                series.push(last + step * (k as i64 + 1), value)?;
            }
        }

        debug!(model = %name, steps, "forecast computed");
        let stored: &TimeSeries<f64> = self.forecasted.insert(series);
        Ok(stored)
    }

    fn coefficients(&self) -> Option<&ArmaCoefficients> {
        self.fit.as_ref().map(|f| &f.coefficients)
    }

    fn summary(&self, name: &str) -> String {
        let Some(fit) = &self.fit else {
            return format!("{name}: untrained, {} observations", self.values.len());
        };
        let c = &fit.coefficients;
        let d = &fit.diagnostics;

        let mut parts = vec![format!("c={:.4}", c.intercept)];
        if !c.phis.is_empty() {
            parts.push(format!("φ=[{}]", join(&c.phis)));
        }
        if !c.thetas.is_empty() {
            parts.push(format!("θ=[{}]", join(&c.thetas)));
        }
        parts.push(format!(
            "MSE={:.4} RMSE={:.4} MAE={:.4}",
            d.mse, d.rmse, d.mae
        ));
        if !d.converged {
            parts.push("not converged".to_string());
        }
        format!("{name}: {}", parts.join(", "))
    }
}

fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{v:.4}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn validate_order(name: &str, order: usize) -> Result<()> {
    if order < 1 {
        return Err(EngineError::invalid_parameter(
            name,
            "order must be at least 1",
        ));
    }
    Ok(())
}

/// Implements the accessor half of [`TimeSeriesModel`] on a type with a
/// `core: ModelCore` field.
macro_rules! delegate_model {
    ($ty:ty) => {
        impl TimeSeriesModel for $ty {
            fn name(&self) -> String {
                self.label()
            }

            fn history(&self) -> &TimeSeries<f64> {
                &self.core.history
            }

            fn state(&self) -> ModelState {
                self.core.state()
            }

            fn diagnostics(&self) -> Option<&FitDiagnostics> {
                self.core.fit.as_ref().map(|f| &f.diagnostics)
            }

            fn forecast(&mut self, steps: usize) -> Result<&TimeSeries<f64>> {
                let name = self.label();
                self.core.forecast(&name, steps)
            }

            fn forecasted(&self) -> Option<&TimeSeries<f64>> {
                self.core.forecasted.as_ref()
            }

            fn summary(&self) -> String {
                self.core.summary(&self.label())
            }
        }
    };
}

// =============================================================================
// AR(p)
// =============================================================================

/// Autoregressive model `x_t = c + Σ φ_i·x_{t-i} + ε_t`.
#[derive(Debug, Clone)]
pub struct Ar {
    core: ModelCore,
    order: Option<usize>,
}

impl Ar {
    pub fn new(view: PriceView<'_>) -> Result<Self> {
        Ok(Self {
            core: ModelCore::new("AR", view)?,
            order: None,
        })
    }

    pub fn with_settings(mut self, settings: OptimizerSettings) -> Self {
        self.core.settings = settings;
        self
    }

    pub fn train(&mut self, order: usize) -> Result<()> {
        validate_order("ar_order", order)?;
        self.core.train(order, 0)?;
        self.order = Some(order);
        Ok(())
    }

    pub fn order(&self) -> Option<usize> {
        self.order
    }

    pub fn intercept(&self) -> Option<f64> {
        self.core.coefficients().map(|c| c.intercept)
    }

    /// AR coefficients φ_1..φ_p; empty before training.
    pub fn phis(&self) -> &[f64] {
        self.core
            .coefficients()
            .map(|c| c.phis.as_slice())
            .unwrap_or_default()
    }

    fn label(&self) -> String {
        match self.order {
            Some(p) => format!("AR({p})"),
            None => "AR".to_string(),
        }
    }
}

delegate_model!(Ar);

// =============================================================================
// MA(q)
// =============================================================================

/// Moving-average model `x_t = c + Σ θ_j·ε_{t-j} + ε_t`.
#[derive(Debug, Clone)]
pub struct Ma {
    core: ModelCore,
    order: Option<usize>,
}

impl Ma {
    pub fn new(view: PriceView<'_>) -> Result<Self> {
        Ok(Self {
            core: ModelCore::new("MA", view)?,
            order: None,
        })
    }

    pub fn with_settings(mut self, settings: OptimizerSettings) -> Self {
        self.core.settings = settings;
        self
    }

    pub fn train(&mut self, order: usize) -> Result<()> {
        validate_order("ma_order", order)?;
        self.core.train(0, order)?;
        self.order = Some(order);
        Ok(())
    }

    pub fn order(&self) -> Option<usize> {
        self.order
    }

    pub fn intercept(&self) -> Option<f64> {
        self.core.coefficients().map(|c| c.intercept)
    }

    /// MA coefficients θ_1..θ_q; empty before training.
    pub fn thetas(&self) -> &[f64] {
        self.core
            .coefficients()
            .map(|c| c.thetas.as_slice())
            .unwrap_or_default()
    }

    fn label(&self) -> String {
        match self.order {
            Some(q) => format!("MA({q})"),
            None => "MA".to_string(),
        }
    }
}

delegate_model!(Ma);

// =============================================================================
// ARMA(p, q)
// =============================================================================

/// Combined model with both recurrences.
#[derive(Debug, Clone)]
pub struct Arma {
    core: ModelCore,
    orders: Option<(usize, usize)>,
}

impl Arma {
    pub fn new(view: PriceView<'_>) -> Result<Self> {
        Ok(Self {
            core: ModelCore::new("ARMA", view)?,
            orders: None,
        })
    }

    pub fn with_settings(mut self, settings: OptimizerSettings) -> Self {
        self.core.settings = settings;
        self
    }

    pub fn train(&mut self, ar_order: usize, ma_order: usize) -> Result<()> {
        validate_order("ar_order", ar_order)?;
        validate_order("ma_order", ma_order)?;
        self.core.train(ar_order, ma_order)?;
        self.orders = Some((ar_order, ma_order));
        Ok(())
    }

    pub fn orders(&self) -> Option<(usize, usize)> {
        self.orders
    }

    pub fn intercept(&self) -> Option<f64> {
        self.core.coefficients().map(|c| c.intercept)
    }

    pub fn phis(&self) -> &[f64] {
        self.core
            .coefficients()
            .map(|c| c.phis.as_slice())
            .unwrap_or_default()
    }

    pub fn thetas(&self) -> &[f64] {
        self.core
            .coefficients()
            .map(|c| c.thetas.as_slice())
            .unwrap_or_default()
    }

    fn label(&self) -> String {
        match self.orders {
            Some((p, q)) => format!("ARMA({p}, {q})"),
            None => "ARMA".to_string(),
        }
    }
}

delegate_model!(Arma);

// =============================================================================
// ModelSpec
// =============================================================================

/// Model family and order(s), as a serialisable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    Ar { p: usize },
    Ma { q: usize },
    Arma { p: usize, q: usize },
}

impl ModelSpec {
    /// Build the model over `view` and train it.
    pub fn train(
        &self,
        view: PriceView<'_>,
        settings: &OptimizerSettings,
    ) -> Result<Box<dyn TimeSeriesModel>> {
        let model: Box<dyn TimeSeriesModel> = match *self {
            Self::Ar { p } => {
                let mut m = Ar::new(view)?.with_settings(settings.clone());
                m.train(p)?;
                Box::new(m)
            }
            Self::Ma { q } => {
                let mut m = Ma::new(view)?.with_settings(settings.clone());
                m.train(q)?;
                Box::new(m)
            }
            Self::Arma { p, q } => {
                let mut m = Arma::new(view)?.with_settings(settings.clone());
                m.train(p, q)?;
                Box::new(m)
            }
        };
        Ok(model)
    }
}

impl std::fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ar { p } => write!(f, "AR({p})"),
            Self::Ma { q } => write!(f, "MA({q})"),
            Self::Arma { p, q } => write!(f, "ARMA({p}, {q})"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 86_400;

    fn daily(n: usize) -> Vec<i64> {
        (0..n as i64).map(|i| 1_700_006_400 + i * DAY).collect()
    }

    fn ar1_series(n: usize) -> Vec<f64> {
        let mut x = vec![10.0];
        for t in 1..n {
            x.push(0.7 * x[t - 1] + 1e-3 * (t as f64 * 1.3).sin());
        }
        x
    }

    fn wave(n: usize) -> Vec<f64> {
        (0..n).map(|i| 50.0 + (i as f64 * 0.5).sin() * 2.0).collect()
    }

    // ---- lifecycle -------------------------------------------------------

    #[test]
    fn forecast_before_train_fails() {
        let ts = daily(20);
        let x = wave(20);
        let mut model = Ar::new(PriceView::new(&ts, &x).unwrap()).unwrap();
        assert_eq!(model.state(), ModelState::Untrained);
        assert_eq!(model.name(), "AR");
        let err = model.forecast(3).unwrap_err();
        assert!(matches!(err, EngineError::NotTrained { .. }));
        assert!(model.forecast_rows(&TableSettings::default()).is_empty());
    }

    #[test]
    fn state_transitions() {
        let ts = daily(30);
        let x = wave(30);
        let mut model = Arma::new(PriceView::new(&ts, &x).unwrap()).unwrap();
        model.train(1, 1).unwrap();
        assert_eq!(model.state(), ModelState::Trained);
        assert_eq!(model.name(), "ARMA(1, 1)");

        model.forecast(2).unwrap();
        assert_eq!(model.state(), ModelState::Forecasted);

        // Retraining drops the previous projection.
        model.train(2, 1).unwrap();
        assert_eq!(model.state(), ModelState::Trained);
        assert!(model.forecasted().is_none());
    }

    // ---- training --------------------------------------------------------

    #[test]
    fn ar1_recovers_coefficient() {
        let ts = daily(60);
        let x = ar1_series(60);
        let mut model = Ar::new(PriceView::new(&ts, &x).unwrap()).unwrap();
        model.train(1).unwrap();
        let phi = model.phis()[0];
        assert!((phi - 0.7).abs() < 0.05, "phi = {phi}");
        assert!(model.diagnostics().unwrap().mse < 1e-4);
    }

    #[test]
    fn order_zero_rejected() {
        let ts = daily(20);
        let x = wave(20);
        let view = PriceView::new(&ts, &x).unwrap();
        assert!(matches!(
            Ar::new(view).unwrap().train(0),
            Err(EngineError::InvalidParameter { .. })
        ));
        assert!(Ma::new(view).unwrap().train(0).is_err());
        assert!(Arma::new(view).unwrap().train(1, 0).is_err());
    }

    #[test]
    fn short_history_is_insufficient() {
        // AR(2) needs 2 * 2 + 0 + 2 = 6 points.
        let ts = daily(5);
        let x = wave(5);
        let mut model = Ar::new(PriceView::new(&ts, &x).unwrap()).unwrap();
        assert_eq!(
            model.train(2).unwrap_err(),
            EngineError::InsufficientData {
                required: 6,
                actual: 5
            }
        );
        assert_eq!(model.state(), ModelState::Untrained);
    }

    // ---- forecasting -----------------------------------------------------

    #[test]
    fn forecast_continues_cadence() {
        let ts = daily(30);
        let x = wave(30);
        let mut model = Ar::new(PriceView::new(&ts, &x).unwrap()).unwrap();
        model.train(2).unwrap();
        let out = model.forecast(5).unwrap();
        assert_eq!(out.len(), 5);
        let stamps: Vec<i64> = out.timestamps().collect();
        let last = ts[29];
        assert_eq!(
            stamps,
            vec![last + DAY, last + 2 * DAY, last + 3 * DAY, last + 4 * DAY, last + 5 * DAY]
        );
    }

    #[test]
    fn forecast_zero_steps_is_empty() {
        let ts = daily(30);
        let x = wave(30);
        let mut model = Ma::new(PriceView::new(&ts, &x).unwrap()).unwrap();
        model.train(1).unwrap();
        assert!(model.forecast(0).unwrap().is_empty());
        assert_eq!(model.state(), ModelState::Forecasted);
    }

    #[test]
    fn forecast_is_deterministic() {
        let ts = daily(40);
        let x = wave(40);
        let mut model = Arma::new(PriceView::new(&ts, &x).unwrap()).unwrap();
        model.train(1, 1).unwrap();
        let first = model.forecast(7).unwrap().clone();
        let second = model.forecast(7).unwrap().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn ma_forecast_reverts_to_intercept() {
        let ts = daily(40);
        let x = wave(40);
        let mut model = Ma::new(PriceView::new(&ts, &x).unwrap()).unwrap();
        model.train(2).unwrap();
        let c = model.intercept().unwrap();
        let out = model.forecast(5).unwrap().to_values();
        for value in &out[2..] {
            assert_eq!(*value, c);
        }
    }

    #[test]
    fn forecast_rows_use_dates() {
        let ts = daily(30);
        let x = wave(30);
        let mut model = Ar::new(PriceView::new(&ts, &x).unwrap()).unwrap();
        model.train(1).unwrap();
        model.forecast(2).unwrap();
        let rows = model.forecast_rows(&TableSettings::default());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 2);
        assert_eq!(model.forecast_columns()[1].header, "Forecast");
    }

    // ---- summary / ModelSpec --------------------------------------------

    #[test]
    fn summary_lists_coefficients() {
        let ts = daily(30);
        let x = wave(30);
        let mut model = Arma::new(PriceView::new(&ts, &x).unwrap()).unwrap();
        assert!(model.summary().starts_with("ARMA: untrained"));
        model.train(1, 1).unwrap();
        let summary = model.summary();
        assert!(summary.starts_with("ARMA(1, 1): c="));
        assert!(summary.contains("φ=["));
        assert!(summary.contains("θ=["));
        assert!(summary.contains("RMSE="));
    }

    #[test]
    fn model_spec_trains_boxed_model() {
        let ts = daily(40);
        let x = wave(40);
        let view = PriceView::new(&ts, &x).unwrap();
        let spec: ModelSpec = serde_json::from_str(r#"{ "kind": "arma", "p": 1, "q": 1 }"#).unwrap();
        assert_eq!(spec.to_string(), "ARMA(1, 1)");

        let mut model = spec.train(view, &OptimizerSettings::default()).unwrap();
        assert_eq!(model.name(), "ARMA(1, 1)");
        assert_eq!(model.forecast(3).unwrap().len(), 3);
    }
}
