// =============================================================================
// price-engine: technical indicators and ARMA-family forecasts
// =============================================================================
//
// The engine is handed a validated `PriceHistory` by a data provider and
// produces derived, timestamped series for a presentation layer:
//
// - `indicators`  SMA, EMA, RSI, MACD and Bollinger Bands
// - `forecast`    AR(p), MA(q) and ARMA(p, q) fitted with Nelder–Mead
//
// Both engines work on a borrowed `PriceView` (timestamps plus one price
// column) and return `TimeSeries` values keyed by Unix timestamps.

pub mod config;
pub mod error;
pub mod forecast;
pub mod history;
pub mod indicators;
pub mod logging;
pub mod series;
pub mod time_utils;
pub mod types;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use history::{PriceField, PriceHistory, PriceView};
pub use series::{SeriesValue, TimeSeries};
pub use types::{ModelState, MovingAverageKind};

/// Everything needed to compute overlays and forecasts.
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::error::{EngineError, Result};
    pub use crate::forecast::{
        Ar, Arma, FitDiagnostics, Ma, ModelSpec, OptimizerSettings, TimeSeriesModel,
    };
    pub use crate::history::{PriceField, PriceHistory, PriceView};
    pub use crate::indicators::{
        compute_all, BandPoint, BollingerBands, Column, Ema, Indicator, IndicatorOutput,
        IndicatorSpec, Macd, MacdPoint, Rsi, Sma, TableSettings,
    };
    pub use crate::series::TimeSeries;
    pub use crate::types::{ModelState, MovingAverageKind};
}
