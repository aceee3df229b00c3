// =============================================================================
// Engine Configuration: indicator overlays, forecast models, optimizer
// =============================================================================
//
// Every tunable of the engine lives here: which overlays to compute on a
// price history, which models to fit, how hard the optimizer works and how
// tables are formatted.
//
// Persistence uses an atomic tmp + rename pattern.  All fields carry
// `#[serde(default)]` so that adding new fields never breaks loading an
// older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::forecast::{ModelSpec, OptimizerSettings, TimeSeriesModel};
use crate::history::{PriceField, PriceHistory};
use crate::indicators::{compute_all, IndicatorOutput, IndicatorSpec, TableSettings};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_overlays() -> Vec<IndicatorSpec> {
    IndicatorSpec::defaults()
}

fn default_models() -> Vec<ModelSpec> {
    vec![
        ModelSpec::Ar { p: 1 },
        ModelSpec::Ma { q: 1 },
        ModelSpec::Arma { p: 1, q: 1 },
    ]
}

fn default_forecast_steps() -> usize {
    5
}

// =============================================================================
// EngineConfig
// =============================================================================

/// Top-level configuration of the price engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    // --- Input ----------------------------------------------------------------

    /// Price column the overlays and models are computed on.
    #[serde(default)]
    pub price_field: PriceField,

    // --- Indicators -------------------------------------------------------------

    /// Indicators computed by [`EngineConfig::compute_overlays`].
    #[serde(default = "default_overlays")]
    pub overlays: Vec<IndicatorSpec>,

    // --- Forecasting ------------------------------------------------------------

    /// Models fitted by [`EngineConfig::train_models`].
    #[serde(default = "default_models")]
    pub models: Vec<ModelSpec>,

    /// Default forecast horizon in bars.
    #[serde(default = "default_forecast_steps")]
    pub forecast_steps: usize,

    #[serde(default)]
    pub optimizer: OptimizerSettings,

    // --- Presentation -----------------------------------------------------------

    #[serde(default)]
    pub table: TableSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            price_field: PriceField::Close,
            overlays: default_overlays(),
            models: default_models(),
            forecast_steps: default_forecast_steps(),
            optimizer: OptimizerSettings::default(),
            table: TableSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;
        config
            .optimizer
            .validate()
            .with_context(|| format!("invalid optimizer settings in {}", path.display()))?;

        info!(
            path = %path.display(),
            overlays = config.overlays.len(),
            models = config.models.len(),
            price_field = %config.price_field,
            "engine config loaded"
        );
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file is missing
    /// or unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{e:#}"), "using default engine config");
                Self::default()
            }
        }
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise engine config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "engine config saved (atomic)");
        Ok(())
    }

    /// Validate `history` and compute every configured overlay on the
    /// configured price column.  Each overlay succeeds or fails on its own.
    pub fn compute_overlays(
        &self,
        history: &PriceHistory,
    ) -> crate::error::Result<Vec<crate::error::Result<IndicatorOutput>>> {
        history.validate()?;
        let view = history.view(self.price_field);
        Ok(compute_all(&self.overlays, view))
    }

    /// Validate `history` and fit every configured model on the configured
    /// price column.  Each model succeeds or fails on its own.
    pub fn train_models(
        &self,
        history: &PriceHistory,
    ) -> crate::error::Result<Vec<crate::error::Result<Box<dyn TimeSeriesModel>>>> {
        history.validate()?;
        let view = history.view(self.price_field);
        Ok(self
            .models
            .iter()
            .map(|spec| spec.train(view, &self.optimizer))
            .collect())
    }
}

// =============================================================================
// Tests
// =============================================================================
