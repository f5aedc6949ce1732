//! Configuration module for the bot host.
//!
//! Loads configuration from environment variables. Every problem found
//! here is a [`ConfigError`] and aborts start-up.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Default SQLite database file when `DB_DSN` is empty.
const DEFAULT_SQLITE_FILE: &str = "jojo.db";

/// Errors raised while reading the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("{0}")]
    Unsupported(String),
}

/// Relational backend selected by `DB_MODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseMode {
    Sqlite,
    Postgres,
}

impl DatabaseMode {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            _ => Err(ConfigError::Invalid {
                key: "DB_MODE",
                value: value.to_string(),
                reason: "expected SQLite or Postgres",
            }),
        }
    }
}

/// Cache backend selected by `CACHE_MODE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheMode {
    Memory,
    Redis { dsn: String },
}

/// Mode of the admin HTTP surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WebApiMode {
    #[default]
    Release,
    Debug,
    /// The HTTP server is not started.
    Test,
}

impl WebApiMode {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "release" => Ok(Self::Release),
            "debug" => Ok(Self::Debug),
            "test" => Ok(Self::Test),
            _ => Err(ConfigError::Invalid {
                key: "WEBAPI_MODE",
                value: value.to_string(),
                reason: "expected release, debug or test",
            }),
        }
    }
}

/// Admin HTTP surface wiring.
#[derive(Debug, Clone)]
pub struct WebApiConfig {
    pub mode: WebApiMode,
    pub bind: SocketAddr,
    /// Public host name, informational only.
    pub host: String,
    /// Path prefix all routes are nested under.
    pub base_path: String,
    pub schemes: Vec<String>,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token.
    pub token: String,

    // Database
    pub database_mode: DatabaseMode,
    /// Connection URL handed to sqlx.
    pub database_url: String,

    // Cache
    pub cache_mode: CacheMode,
    /// Entry lifetime. Zero means entries never expire by age.
    pub cache_ttl: Duration,

    pub webapi: WebApiConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let token = get("TOKEN").ok_or(ConfigError::Missing("TOKEN"))?;

        let database_mode = match get("DB_MODE") {
            Some(mode) => DatabaseMode::parse(&mode)?,
            None => DatabaseMode::Sqlite,
        };
        let database_url = database_url(database_mode, get("DB_DSN"))?;

        let cache_mode = match get("CACHE_MODE").map(|m| m.to_ascii_lowercase()).as_deref() {
            None | Some("memory") => CacheMode::Memory,
            Some("redis") => CacheMode::Redis {
                dsn: get("CACHE_DSN").ok_or(ConfigError::Missing("CACHE_DSN"))?,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "CACHE_MODE",
                    value: other.to_string(),
                    reason: "expected memory or redis",
                });
            }
        };

        let cache_ttl = match get("CACHE_TTL_SECS") {
            Some(raw) => Duration::from_secs(raw.parse().map_err(|_| ConfigError::Invalid {
                key: "CACHE_TTL_SECS",
                value: raw.clone(),
                reason: "expected a number of seconds",
            })?),
            None => Duration::from_secs(600),
        };

        let webapi = WebApiConfig {
            mode: match get("WEBAPI_MODE") {
                Some(mode) => WebApiMode::parse(&mode)?,
                None => WebApiMode::default(),
            },
            bind: parse_bind(&get("WEBAPI_BIND").unwrap_or_else(|| ":8080".to_string()))?,
            host: get("WEBAPI_HOST").unwrap_or_else(|| "localhost:8080".to_string()),
            base_path: parse_base_path(get("WEBAPI_BASEPATH"))?,
            schemes: get("WEBAPI_SCHEMES")
                .unwrap_or_else(|| "http".to_string())
                .split(',')
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        };

        Ok(Self {
            token,
            database_mode,
            database_url,
            cache_mode,
            cache_ttl,
            webapi,
        })
    }
}

/// Resolve the sqlx connection URL for the selected backend.
fn database_url(mode: DatabaseMode, dsn: Option<String>) -> Result<String, ConfigError> {
    match mode {
        DatabaseMode::Postgres => {
            let dsn = dsn.ok_or(ConfigError::Missing("DB_DSN"))?;
            if dsn.starts_with("postgres://") || dsn.starts_with("postgresql://") {
                Ok(dsn)
            } else {
                Err(ConfigError::Invalid {
                    key: "DB_DSN",
                    value: dsn,
                    reason: "expected a postgres:// URL",
                })
            }
        }
        DatabaseMode::Sqlite => {
            let dsn = dsn.unwrap_or_else(|| DEFAULT_SQLITE_FILE.to_string());
            if dsn.starts_with("sqlite:") {
                Ok(dsn)
            } else {
                Ok(format!("sqlite://{dsn}?mode=rwc"))
            }
        }
    }
}

/// `:8080` binds every interface, anything else must be a socket address.
fn parse_bind(raw: &str) -> Result<SocketAddr, ConfigError> {
    let candidate = if raw.starts_with(':') {
        format!("0.0.0.0{raw}")
    } else {
        raw.to_string()
    };

    candidate.parse().map_err(|_| ConfigError::Invalid {
        key: "WEBAPI_BIND",
        value: raw.to_string(),
        reason: "expected host:port",
    })
}

fn parse_base_path(raw: Option<String>) -> Result<String, ConfigError> {
    let path = raw.unwrap_or_else(|| "/v1".to_string());
    if !path.starts_with('/') {
        return Err(ConfigError::Invalid {
            key: "WEBAPI_BASEPATH",
            value: path,
            reason: "must start with /",
        });
    }

    Ok(path.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("TOKEN", "abc")]).unwrap();

        assert_eq!(config.database_mode, DatabaseMode::Sqlite);
        assert_eq!(config.database_url, "sqlite://jojo.db?mode=rwc");
        assert_eq!(config.cache_mode, CacheMode::Memory);
        assert_eq!(config.cache_ttl, Duration::from_secs(600));
        assert_eq!(config.webapi.bind.port(), 8080);
        assert_eq!(config.webapi.base_path, "/v1");
        assert_eq!(config.webapi.schemes, vec!["http".to_string()]);
    }

    #[test]
    fn test_missing_token() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("TOKEN"))));
    }

    #[test]
    fn test_postgres_requires_dsn() {
        let err = load(&[("TOKEN", "abc"), ("DB_MODE", "Postgres")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DB_DSN")));

        let config = load(&[
            ("TOKEN", "abc"),
            ("DB_MODE", "Postgres"),
            ("DB_DSN", "postgres://bot@localhost/bot"),
        ])
        .unwrap();
        assert_eq!(config.database_mode, DatabaseMode::Postgres);
    }

    #[test]
    fn test_invalid_values() {
        assert!(load(&[("TOKEN", "a"), ("DB_MODE", "oracle")]).is_err());
        assert!(load(&[("TOKEN", "a"), ("CACHE_MODE", "disk")]).is_err());
        assert!(load(&[("TOKEN", "a"), ("WEBAPI_BIND", "nope")]).is_err());
        assert!(load(&[("TOKEN", "a"), ("WEBAPI_BASEPATH", "v1")]).is_err());
    }

    #[test]
    fn test_redis_mode_needs_dsn() {
        assert!(matches!(
            load(&[("TOKEN", "a"), ("CACHE_MODE", "redis")]),
            Err(ConfigError::Missing("CACHE_DSN"))
        ));

        let config = load(&[
            ("TOKEN", "a"),
            ("CACHE_MODE", "Redis"),
            ("CACHE_DSN", "redis://localhost"),
        ])
        .unwrap();
        assert_eq!(
            config.cache_mode,
            CacheMode::Redis {
                dsn: "redis://localhost".to_string()
            }
        );
    }
}
