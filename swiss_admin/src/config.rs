//! Admin tool configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use swiss_tournament::db::DatabaseConfig;
use swiss_tournament::tournament::{ByePolicy, EngineConfig};

/// Complete admin configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Engine configuration
    pub engine: EngineConfig,
}

impl AdminConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `bye_policy_override` - Optional bye policy override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but cannot be parsed where a
    /// silent fallback would change tournament results
    pub fn from_env(
        database_url_override: Option<String>,
        bye_policy_override: Option<ByePolicy>,
    ) -> Result<Self, ConfigError> {
        let mut database = DatabaseConfig::from_env();
        if let Some(url) = database_url_override {
            database.database_url = url;
        }

        let engine = match bye_policy_override {
            Some(bye_policy) => EngineConfig { bye_policy },
            None => EngineConfig::from_env().map_err(|reason| ConfigError::Invalid {
                var: "SWISS_BYE_POLICY".to_string(),
                reason,
            })?,
        };

        Ok(AdminConfig { database, engine })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.database.database_url;
        if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
            return Err(ConfigError::Invalid {
                var: "DATABASE_URL".to_string(),
                reason: "Must be a postgres:// or postgresql:// URL".to_string(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed max connections ({})",
                    self.database.max_connections
                ),
            });
        }

        if self.database.query_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_QUERY_TIMEOUT".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}
