//! CLI configuration

use serde::Deserialize;

/// Batch tool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// Database URL
    pub database_url: String,
    /// Log level
    pub log_level: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/school_fees".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("LEDGER"))
            .build()?
            .try_deserialize()
    }

    /// Loads from environment with per-variable fallbacks and defaults
    pub fn load() -> Self {
        Self::from_env().unwrap_or_else(|_| Self {
            database_url: std::env::var("DATABASE_URL")
                .or_else(|_| std::env::var("LEDGER_DATABASE_URL"))
                .unwrap_or_else(|_| "postgres://localhost/school_fees".to_string()),
            log_level: std::env::var("LEDGER_LOG_LEVEL")
                .or_else(|_| std::env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.log_level, "info");
        assert!(config.database_url.starts_with("postgres://"));
    }
}
