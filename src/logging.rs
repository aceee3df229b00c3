// =============================================================================
// Tracing subscriber setup
// =============================================================================

use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber filtered by `RUST_LOG`, or by
/// `default_filter` when the variable is unset or unparsable.
///
/// Returns `false` when a global subscriber was already installed (the call
/// is then a no-op), so embedding applications and tests can call it freely.
pub fn init_tracing(default_filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        init_tracing("debug");
        assert!(!init_tracing("info"));
    }
}
