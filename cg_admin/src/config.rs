//! Admin CLI configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use campus_games::db::{DatabaseConfig, ParticipantScope};
use campus_games::tournament::EngineConfig;

/// Complete CLI configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminConfig {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Tournament engine configuration
    pub engine: EngineConfig,
}

impl AdminConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `scope_override` - Optional participant scope override (from CLI args)
    /// * `seed_override` - Optional shuffle seed override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if `PARTICIPANT_SCOPE` or `SCHEDULE_SEED` is set but invalid
    pub fn from_env(
        database_url_override: Option<String>,
        scope_override: Option<ParticipantScope>,
        seed_override: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let defaults = DatabaseConfig::development();

        let database_url = database_url_override
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .unwrap_or(defaults.database_url);

        let database = DatabaseConfig {
            database_url,
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", 5),
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", 1),
            connection_timeout_secs: parse_env_or(
                "DB_CONNECTION_TIMEOUT",
                defaults.connection_timeout_secs,
            ),
            idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT", defaults.idle_timeout_secs),
            max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME", defaults.max_lifetime_secs),
        };

        let participant_scope = match scope_override {
            Some(scope) => scope,
            None => match std::env::var("PARTICIPANT_SCOPE") {
                Ok(value) => value.parse().map_err(|reason| ConfigError::Invalid {
                    var: "PARTICIPANT_SCOPE".to_string(),
                    reason,
                })?,
                Err(_) => ParticipantScope::default(),
            },
        };

        let shuffle_seed = match seed_override {
            Some(seed) => Some(seed),
            None => match std::env::var("SCHEDULE_SEED") {
                Ok(value) => Some(value.parse().map_err(|_| ConfigError::Invalid {
                    var: "SCHEDULE_SEED".to_string(),
                    reason: format!("Must be an unsigned integer, got {value:?}"),
                })?),
                Err(_) => None,
            },
        };

        Ok(AdminConfig {
            database,
            engine: EngineConfig {
                participant_scope,
                shuffle_seed,
            },
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.database.database_url.starts_with("postgres://")
            && !self.database.database_url.starts_with("postgresql://")
        {
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

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
