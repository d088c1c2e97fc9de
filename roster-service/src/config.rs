use serde::Deserialize;

use crate::error::GenerationError;

/// Service-level knobs, loaded from a TOML file at startup. Everything has a
/// default so an absent file section still yields a working service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// Cadence of the balanced-mode progress poll, in milliseconds.
    pub balanced_poll_interval_ms: u64,
    /// Memory cap handed to the solver, in megabytes.
    pub solver_memory_mb: u64,
    /// Wall-clock budget used when a request does not carry one.
    pub default_search_time_seconds: u64,
    /// Requested search workers. Recorded for parity with the request shape;
    /// the current solver searches single-threaded.
    pub worker_count: Option<usize>,
    /// Requested search seed. Recorded, not forwarded.
    pub random_seed: Option<u64>,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            balanced_poll_interval_ms: 100,
            solver_memory_mb: 2048,
            default_search_time_seconds: 60,
            worker_count: None,
            random_seed: None,
        }
    }
}

impl RosterConfig {
    pub fn load(path: &str) -> Result<Self, GenerationError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| GenerationError::Internal(format!("Failed to read config {path}: {e}")))?;
        toml::from_str(&raw)
            .map_err(|e| GenerationError::Internal(format!("Failed to parse config {path}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = RosterConfig::default();
        assert_eq!(config.balanced_poll_interval_ms, 100);
        assert_eq!(config.solver_memory_mb, 2048);
        assert!(config.worker_count.is_none());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: RosterConfig = toml::from_str("balanced_poll_interval_ms = 250").unwrap();
        assert_eq!(config.balanced_poll_interval_ms, 250);
        assert_eq!(config.default_search_time_seconds, 60);
    }
}
