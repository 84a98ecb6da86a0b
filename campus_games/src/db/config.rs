//! Database configuration module.
//!
//! Provides configuration structures for database connection management.

use std::env;
use thiserror::Error;

/// Database configuration errors
#[derive(Debug, Error)]
pub enum DatabaseConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for {var}: {value}")]
    Invalid { var: String, value: String },
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,
}

impl DatabaseConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DATABASE_URL`: PostgreSQL connection string
    /// - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 20)
    /// - `DB_MIN_CONNECTIONS`: Minimum pool size (default: 2)
    /// - `DB_CONNECTION_TIMEOUT`: Connection timeout in seconds (default: 10)
    /// - `DB_IDLE_TIMEOUT`: Idle timeout in seconds (default: 600)
    /// - `DB_MAX_LIFETIME`: Max lifetime in seconds (default: 1800)
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is not set or a numeric variable
    /// does not parse.
    pub fn from_env() -> Result<Self, DatabaseConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| DatabaseConfigError::Missing("DATABASE_URL".to_string()))?;

        Ok(Self {
            database_url,
            max_connections: env_or("DB_MAX_CONNECTIONS", 20)?,
            min_connections: env_or("DB_MIN_CONNECTIONS", 2)?,
            connection_timeout_secs: env_or("DB_CONNECTION_TIMEOUT", 10)?,
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT", 600)?,
            max_lifetime_secs: env_or("DB_MAX_LIFETIME", 1800)?,
        })
    }

    /// Create a default configuration for development
    ///
    /// Uses `postgres://postgres@localhost/campus_games` as the database URL
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/campus_games".to_string(),
            max_connections: 20,
            min_connections: 2,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }

    /// Same configuration pointing at another database
    pub fn with_url(mut self, database_url: impl Into<String>) -> Self {
        self.database_url = database_url.into();
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}

/// Parse an optional environment variable, rejecting malformed values
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, DatabaseConfigError> {
    match env::var(key) {
        Ok(value) => value.parse().map_err(|_| DatabaseConfigError::Invalid {
            var: key.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.min_connections, 2);
        assert!(config.database_url.ends_with("/campus_games"));
    }

    #[test]
    fn test_with_url() {
        let config = DatabaseConfig::development().with_url("postgres://x@db/other");
        assert_eq!(config.database_url, "postgres://x@db/other");
        assert_eq!(config.idle_timeout_secs, 600);
    }

    #[test]
    fn test_env_or_uses_default_when_unset() {
        let value: u32 = env_or("CAMPUS_GAMES_TEST_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_error_display() {
        let err = DatabaseConfigError::Invalid {
            var: "DB_MAX_CONNECTIONS".to_string(),
            value: "many".to_string(),
        };
        assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));
    }
}
