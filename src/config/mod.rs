use std::env;
use std::fmt;

use crate::workflows::casework::DEFAULT_VALIDATION_SLA_DAYS;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub sweep: SweepConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let interval_secs = env::var("APP_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidSweepInterval)?;
        if interval_secs == 0 {
            return Err(ConfigError::InvalidSweepInterval);
        }

        let validation_sla_days = env::var("APP_VALIDATION_SLA_DAYS")
            .unwrap_or_else(|_| DEFAULT_VALIDATION_SLA_DAYS.to_string())
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidValidationSla)?;
        if validation_sla_days < 0 {
            return Err(ConfigError::InvalidValidationSla);
        }

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            sweep: SweepConfig {
                interval_secs,
                validation_sla_days,
            },
        })
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Settings for the periodic stagnation sweep.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub interval_secs: u64,
    pub validation_sla_days: i64,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidSweepInterval,
    InvalidValidationSla,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidSweepInterval => {
                write!(f, "APP_SWEEP_INTERVAL_SECS must be a positive integer")
            }
            ConfigError::InvalidValidationSla => {
                write!(f, "APP_VALIDATION_SLA_DAYS must be a non-negative integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("APP_SWEEP_INTERVAL_SECS");
        env::remove_var("APP_VALIDATION_SLA_DAYS");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.sweep.interval_secs, 3600);
        assert_eq!(config.sweep.validation_sla_days, DEFAULT_VALIDATION_SLA_DAYS);
    }

    #[test]
    fn rejects_zero_sweep_interval() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_SWEEP_INTERVAL_SECS", "0");
        let result = AppConfig::load();
        assert!(matches!(result, Err(ConfigError::InvalidSweepInterval)));
        reset_env();
    }

    #[test]
    fn rejects_negative_validation_sla() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_VALIDATION_SLA_DAYS", "-1");
        let result = AppConfig::load();
        assert!(matches!(result, Err(ConfigError::InvalidValidationSla)));
        reset_env();
    }
}
