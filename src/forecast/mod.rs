// =============================================================================
// Forecast Module
// =============================================================================
//
// Linear time-series models fitted by numerical optimisation:
// - AR(p)      autoregression on past values
// - MA(q)      regression on past one-step residuals
// - ARMA(p,q)  both together
//
// All three share one recurrence (`arma`) and one derivative-free minimiser
// (`optimizer`).

pub mod arma;
pub mod models;
pub mod optimizer;

pub use arma::{ArmaCoefficients, FitDiagnostics};
pub use models::{Ar, Arma, Ma, ModelSpec, TimeSeriesModel};
pub use optimizer::{minimize, Minimum, OptimizerSettings};
