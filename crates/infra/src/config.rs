//! Configuration loading and representation.
//!
//! Settings are read once at startup from the environment (optionally seeded
//! from a `.env` file) into an immutable [`Settings`] value that is passed to
//! constructors. Nothing reads the environment after that.

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;
use sqlx::postgres::PgConnectOptions;
use thiserror::Error;

use postboard_auth::SigningAlgorithm;
use postboard_observability::LogFormat;

const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;
const DEFAULT_DATABASE_PORT: u16 = 5432;
const DEFAULT_DATABASE_NAME: &str = "postboard";
const DEFAULT_DATABASE_USERNAME: &str = "postgres";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("failed to load .env: {0}")]
    DotEnv(String),
}

/// Token signing settings.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSettings {
    pub secret: String,
    pub algorithm: SigningAlgorithm,
    pub ttl: Duration,
}

impl core::fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenSettings")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Postgres connection settings.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub username: String,
    pub password: String,
    pub max_connections: u32,
}

impl core::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl DatabaseSettings {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.name)
            .username(&self.username)
            .password(&self.password)
    }
}

/// Process-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub token: TokenSettings,
    /// `None` selects the in-memory store.
    pub database: Option<DatabaseSettings>,
    pub bind_addr: SocketAddr,
    pub log_format: LogFormat,
}

impl Settings {
    /// Load from the process environment, after merging `.env` if present.
    /// Variables already set in the environment win over `.env` entries.
    /// A missing `.env` is fine; an unreadable or malformed one is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv_loaded(dotenvy::dotenv())?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let secret = get("SECRET_KEY").ok_or(ConfigError::Missing("SECRET_KEY"))?;
        let algorithm = match get("ALGORITHM") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::Invalid {
                key: "ALGORITHM",
                message,
            })?,
            None => SigningAlgorithm::default(),
        };
        let ttl_minutes = parse_or("ACCESS_TOKEN_EXPIRE_MINUTES", get("ACCESS_TOKEN_EXPIRE_MINUTES"), DEFAULT_TOKEN_TTL_MINUTES)?;
        if ttl_minutes <= 0 {
            return Err(ConfigError::Invalid {
                key: "ACCESS_TOKEN_EXPIRE_MINUTES",
                message: "must be a positive number of minutes".to_string(),
            });
        }

        let database = match get("DATABASE_HOST") {
            Some(host) => Some(DatabaseSettings {
                host,
                port: parse_or("DATABASE_PORT", get("DATABASE_PORT"), DEFAULT_DATABASE_PORT)?,
                name: get("DATABASE_NAME").unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string()),
                username: get("DATABASE_USERNAME").unwrap_or_else(|| DEFAULT_DATABASE_USERNAME.to_string()),
                password: lookup("DATABASE_PASSWORD").unwrap_or_default(),
                max_connections: parse_or(
                    "DATABASE_MAX_CONNECTIONS",
                    get("DATABASE_MAX_CONNECTIONS"),
                    DEFAULT_MAX_CONNECTIONS,
                )?,
            }),
            None => None,
        };

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "BIND_ADDR",
                message: e.to_string(),
            })?;

        let log_format = match get("LOG_FORMAT") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::Invalid {
                key: "LOG_FORMAT",
                message,
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            token: TokenSettings {
                secret,
                algorithm,
                ttl: Duration::minutes(ttl_minutes),
            },
            database,
            bind_addr,
            log_format,
        })
    }
}

fn dotenv_loaded(result: Result<PathBuf, dotenvy::Error>) -> Result<(), ConfigError> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(ConfigError::DotEnv(e.to_string())),
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    match raw {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}
