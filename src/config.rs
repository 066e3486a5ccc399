//! Engine configuration.
//!
//! Defaults work out of the box; deployments override them from a YAML file,
//! environment variables, or both. Environment detection follows
//! `STRATUS_ENV` then `APP_ENV`, falling back to `development`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::system;
use crate::error::{Result, StratusError};

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub environment: String,
    pub poll: PollConfig,
    pub ranking: RankingConfig,
    pub execution: ExecutionConfig,
}

/// Completion polling tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Wall-clock budget for one provider attempt, in seconds
    pub timeout_secs: i64,
    /// Failed completion-predicate evaluations tolerated per attempt
    pub retry_budget: u32,
    /// Driver sleep between poll re-invocations, in milliseconds
    pub reinvoke_delay_ms: u64,
}

/// Rank banding thresholds and penalties.
///
/// Only the ordering contract (lower rank is better) is API; these numbers
/// are tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Availability at or above this is penalty-free
    pub availability_full_pct: f64,
    /// Availability at or above this takes `degraded_penalty`
    pub availability_degraded_pct: f64,
    /// Availability at or above this takes `floor_penalty`; below it takes
    /// `outage_penalty`
    pub availability_floor_pct: f64,
    pub degraded_penalty: f64,
    pub floor_penalty: f64,
    pub outage_penalty: f64,
    /// Latency under this budget is penalty-free, in milliseconds
    pub latency_budget_ms: f64,
    /// Penalty added per 100ms of latency over budget
    pub latency_penalty_per_100ms: f64,
}

/// In-process driver tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Upper bound on step invocations in one driver run
    pub max_engine_steps: u32,
    /// Broadcast channel capacity for the event publisher
    pub event_channel_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            environment: system::DEFAULT_ENVIRONMENT.to_string(),
            poll: PollConfig::default(),
            ranking: RankingConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout_secs: system::DEFAULT_POLL_TIMEOUT_SECS,
            retry_budget: system::DEFAULT_POLL_RETRY_BUDGET,
            reinvoke_delay_ms: system::DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            availability_full_pct: 99.9,
            availability_degraded_pct: 99.0,
            availability_floor_pct: 95.0,
            degraded_penalty: 1.0,
            floor_penalty: 2.5,
            outage_penalty: 10.0,
            latency_budget_ms: 250.0,
            latency_penalty_per_100ms: 0.5,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_engine_steps: system::DEFAULT_MAX_ENGINE_STEPS,
            event_channel_capacity: system::EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl OrchestratorConfig {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.environment = detect_environment();

        if let Ok(timeout) = std::env::var("STRATUS_POLL_TIMEOUT_SECS") {
            config.poll.timeout_secs = timeout.parse().map_err(|e| {
                StratusError::Configuration(format!("Invalid STRATUS_POLL_TIMEOUT_SECS: {e}"))
            })?;
        }

        if let Ok(budget) = std::env::var("STRATUS_POLL_RETRY_BUDGET") {
            config.poll.retry_budget = budget.parse().map_err(|e| {
                StratusError::Configuration(format!("Invalid STRATUS_POLL_RETRY_BUDGET: {e}"))
            })?;
        }

        if let Ok(delay) = std::env::var("STRATUS_POLL_INTERVAL_MS") {
            config.poll.reinvoke_delay_ms = delay.parse().map_err(|e| {
                StratusError::Configuration(format!("Invalid STRATUS_POLL_INTERVAL_MS: {e}"))
            })?;
        }

        if let Ok(steps) = std::env::var("STRATUS_MAX_ENGINE_STEPS") {
            config.execution.max_engine_steps = steps.parse().map_err(|e| {
                StratusError::Configuration(format!("Invalid STRATUS_MAX_ENGINE_STEPS: {e}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file; missing keys keep their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StratusError::Configuration(format!(
                "Cannot read config file {}: {e}",
                path.display()
            ))
        })?;
        let config: Self = serde_yaml::from_str(&raw).map_err(|e| {
            StratusError::Configuration(format!(
                "Cannot parse config file {}: {e}",
                path.display()
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Tight timeouts and delays for tests and the in-process driver.
    pub fn for_testing() -> Self {
        let mut config = Self::default();
        config.environment = "test".to_string();
        config.poll.timeout_secs = 5;
        config.poll.reinvoke_delay_ms = 10;
        config.execution.max_engine_steps = 50;
        config
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.poll.timeout_secs <= 0 {
            return Err(StratusError::Configuration(
                "poll.timeout_secs must be positive".to_string(),
            ));
        }
        if self.poll.retry_budget == 0 {
            return Err(StratusError::Configuration(
                "poll.retry_budget must be at least 1".to_string(),
            ));
        }
        if self.execution.max_engine_steps == 0 {
            return Err(StratusError::Configuration(
                "execution.max_engine_steps must be at least 1".to_string(),
            ));
        }
        let bands = &self.ranking;
        if bands.availability_full_pct < bands.availability_degraded_pct
            || bands.availability_degraded_pct < bands.availability_floor_pct
        {
            return Err(StratusError::Configuration(
                "ranking availability thresholds must be ordered full >= degraded >= floor"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Poll timeout as a chrono duration for deadline arithmetic.
    pub fn poll_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.poll.timeout_secs)
    }

    /// Driver sleep between poll re-invocations.
    pub fn reinvoke_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll.reinvoke_delay_ms)
    }
}

/// Detect the running environment from `STRATUS_ENV` then `APP_ENV`.
pub fn detect_environment() -> String {
    std::env::var("STRATUS_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| system::DEFAULT_ENVIRONMENT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = OrchestratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll.retry_budget, 1);
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn test_for_testing_tightens_timing() {
        let config = OrchestratorConfig::for_testing();
        assert!(config.validate().is_ok());
        assert_eq!(config.environment, "test");
        assert!(config.poll.timeout_secs <= 5);
        assert!(config.poll.reinvoke_delay_ms <= 100);
    }

    #[test]
    fn test_validate_rejects_zero_retry_budget() {
        let mut config = OrchestratorConfig::default();
        config.poll.retry_budget = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unordered_bands() {
        let mut config = OrchestratorConfig::default();
        config.ranking.availability_floor_pct = 99.95;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file_merges_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "environment: production\npoll:\n  timeout_secs: 600\n  retry_budget: 3\n"
        )
        .unwrap();

        let config = OrchestratorConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.environment, "production");
        assert_eq!(config.poll.timeout_secs, 600);
        assert_eq!(config.poll.retry_budget, 3);
        // Untouched sections keep defaults.
        assert_eq!(
            config.execution.max_engine_steps,
            system::DEFAULT_MAX_ENGINE_STEPS
        );
    }

    #[test]
    fn test_load_from_file_rejects_bad_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "poll: [not, a, mapping]").unwrap();

        let err = OrchestratorConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, StratusError::Configuration(_)));
    }

    #[test]
    fn test_missing_file_errors() {
        let err =
            OrchestratorConfig::load_from_file(Path::new("/nonexistent/stratus.yaml")).unwrap_err();
        assert!(matches!(err, StratusError::Configuration(_)));
    }
}
