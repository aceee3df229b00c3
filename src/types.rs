// =============================================================================
// Shared enums used across the indicator and forecast engines
// =============================================================================

use serde::{Deserialize, Serialize};

/// Moving average used for the Bollinger middle band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovingAverageKind {
    Simple,
    Exponential,
}

impl Default for MovingAverageKind {
    fn default() -> Self {
        Self::Simple
    }
}

impl std::fmt::Display for MovingAverageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple => write!(f, "SMA"),
            Self::Exponential => write!(f, "EMA"),
        }
    }
}

/// Lifecycle of a forecast model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelState {
    Untrained,
    Trained,
    Forecasted,
}

impl Default for ModelState {
    fn default() -> Self {
        Self::Untrained
    }
}

impl std::fmt::Display for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Untrained => write!(f, "Untrained"),
            Self::Trained => write!(f, "Trained"),
            Self::Forecasted => write!(f, "Forecasted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_average_kind_defaults_to_simple() {
        assert_eq!(MovingAverageKind::default(), MovingAverageKind::Simple);
        assert_eq!(MovingAverageKind::Exponential.to_string(), "EMA");
    }

    #[test]
    fn moving_average_kind_serde_names() {
        let kind: MovingAverageKind = serde_json::from_str("\"exponential\"").unwrap();
        assert_eq!(kind, MovingAverageKind::Exponential);
        assert_eq!(serde_json::to_string(&MovingAverageKind::Simple).unwrap(), "\"simple\"");
    }

    #[test]
    fn model_state_defaults_to_untrained() {
        assert_eq!(ModelState::default(), ModelState::Untrained);
        assert_eq!(ModelState::Forecasted.to_string(), "Forecasted");
    }
}
