//! Configuration management for the server.

use std::env;

/// Default page size for pulls that do not ask for one.
pub const DEFAULT_PULL_LIMIT: i64 = 100;

/// Largest page a pull may request.
pub const MAX_PULL_LIMIT: i64 = 1000;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Shared bearer secret; anonymous access when unset
    pub auth_secret: Option<String>,
    /// Page size for pulls without an explicit limit
    pub pull_default_limit: i64,
    /// Size of the database connection pool
    pub max_connections: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;

        let auth_secret = env::var("AUTH_SECRET").ok().filter(|s| !s.is_empty());

        let pull_default_limit = match env::var("PULL_DEFAULT_LIMIT") {
            Ok(value) => parse_pull_limit(&value)?,
            Err(_) => DEFAULT_PULL_LIMIT,
        };

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidMaxConnections)?;

        Ok(Self {
            host,
            port,
            database_url,
            auth_secret,
            pull_default_limit,
            max_connections,
        })
    }
}

fn parse_pull_limit(value: &str) -> Result<i64, ConfigError> {
    match value.trim().parse::<i64>() {
        Ok(limit) if (1..=MAX_PULL_LIMIT).contains(&limit) => Ok(limit),
        _ => Err(ConfigError::InvalidPullLimit(value.to_string())),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL environment variable is required")]
    MissingDatabaseUrl,

    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid DATABASE_MAX_CONNECTIONS value")]
    InvalidMaxConnections,

    #[error("Invalid PULL_DEFAULT_LIMIT value: {0} (expected 1..=1000)")]
    InvalidPullLimit(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_limit_bounds() {
        assert_eq!(parse_pull_limit("250").unwrap(), 250);
        assert_eq!(parse_pull_limit(" 1 ").unwrap(), 1);
        assert!(parse_pull_limit("0").is_err());
        assert!(parse_pull_limit("1001").is_err());
        assert!(parse_pull_limit("lots").is_err());
    }
}
