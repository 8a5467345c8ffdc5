// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses listener, store, signing key, broker, and logging settings from environment variables
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Environment-based configuration management for production deployment

use crate::broker::centrifugo::CentrifugoConfig;
use crate::constants::{defaults, env_config, limits};
use crate::crypto::keys::{generate_signing_secret, parse_key_list, SigningKeyRing};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Strongly typed log level configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    #[default]
    Info,
    /// Debug output
    Debug,
    /// Everything
    Trace,
}

impl LogLevel {
    /// Convert to `tracing::Level`
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Error => tracing::Level::ERROR,
            Self::Warn => tracing::Level::WARN,
            Self::Info => tracing::Level::INFO,
            Self::Debug => tracing::Level::DEBUG,
            Self::Trace => tracing::Level::TRACE,
        }
    }

    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development, a missing signing secret is generated
    #[default]
    Development,
    /// Production, every secret must be configured
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if this is a development environment
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Type-safe database location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// `SQLite` database with file path
    SQLite {
        /// Database file
        path: PathBuf,
    },
    /// In-memory `SQLite` (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from string; anything without a scheme is treated as a file path
    #[must_use]
    pub fn parse_url(s: &str) -> Self {
        let path = s.strip_prefix("sqlite://").or_else(|| s.strip_prefix("sqlite:")).unwrap_or(s);
        if path == ":memory:" {
            Self::Memory
        } else {
            Self::SQLite {
                path: PathBuf::from(path),
            }
        }
    }

    /// Convert to a sqlx connection string
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".to_owned(),
        }
    }

    /// Check if this is an in-memory database
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        Self::parse_url(defaults::DATABASE_URL)
    }
}

impl fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_connection_string())
    }
}

/// Listener settings shared by the REST and RPC transports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Bind host
    pub host: String,
    /// REST port
    pub http_port: u16,
    /// RPC port
    pub rpc_port: u16,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Comma-separated CORS origins, `*` for any
    pub cors_allowed_origins: String,
}

impl HttpConfig {
    /// Per-request timeout
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Token signing and password hashing settings
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Active key id
    pub key_id: String,
    /// Active signing secret
    #[serde(skip_serializing)]
    pub secret: String,
    /// Retired verification-only keys as `(kid, secret)`
    #[serde(skip_serializing)]
    pub previous_keys: Vec<(String, String)>,
    /// Whether the active secret was generated at startup
    pub secret_generated: bool,
    /// bcrypt cost for new password hashes
    pub bcrypt_cost: u32,
}

impl AuthConfig {
    /// Build the key ring: the active key plus every retired key
    ///
    /// # Errors
    ///
    /// Returns an error if a key id is empty or a secret is too short
    pub fn key_ring(&self) -> Result<SigningKeyRing> {
        let mut ring = SigningKeyRing::new(&self.key_id, self.secret.as_bytes())?;
        for (kid, secret) in &self.previous_keys {
            ring = ring.with_retired_key(kid, secret.as_bytes())?;
        }
        Ok(ring)
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("key_id", &self.key_id)
            .field("secret", &"<redacted>")
            .field("previous_keys", &self.previous_keys.len())
            .field("secret_generated", &self.secret_generated)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

/// Centrifugo connection settings
#[derive(Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// HTTP API base URL
    pub api_url: String,
    /// HTTP API key
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl BrokerConfig {
    /// Client settings for the Centrifugo HTTP API
    #[must_use]
    pub fn centrifugo(&self) -> CentrifugoConfig {
        CentrifugoConfig {
            api_url: self.api_url.clone(),
            api_key: self.api_key.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Complete server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listener settings
    pub http: HttpConfig,
    /// Log level
    pub log_level: LogLevel,
    /// Deployment environment
    pub environment: Environment,
    /// Store location
    pub database: DatabaseUrl,
    /// Token signing settings
    pub auth: AuthConfig,
    /// Broker settings
    pub broker: BrokerConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed, if the signing secret is
    /// missing outside development, or if validation fails
    pub fn from_env() -> Result<Self> {
        let environment = Environment::from_str_or_default(&env_var_or("ENVIRONMENT", "development"));

        let config = Self {
            http: HttpConfig {
                host: env_config::host(),
                http_port: parse_env("HTTP_PORT", defaults::HTTP_PORT)?,
                rpc_port: parse_env("RPC_PORT", defaults::RPC_PORT)?,
                request_timeout_secs: parse_env(
                    "REQUEST_TIMEOUT_SECS",
                    defaults::REQUEST_TIMEOUT_SECS,
                )?,
                cors_allowed_origins: env_var_or("CORS_ALLOWED_ORIGINS", "*"),
            },
            log_level: LogLevel::from_str_or_default(&env_config::log_level()),
            environment,
            database: DatabaseUrl::parse_url(&env_config::database_url()),
            auth: load_auth_config(environment)?,
            broker: BrokerConfig {
                api_url: env_config::centrifugo_api_url(),
                api_key: env_var_or("CENTRIFUGO_API_KEY", ""),
                timeout_secs: parse_env("BROKER_TIMEOUT_SECS", defaults::BROKER_TIMEOUT_SECS)?,
            },
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error for clashing ports, an out-of-range bcrypt cost, a zero
    /// timeout, or an unusable signing key
    pub fn validate(&self) -> Result<()> {
        if self.http.http_port == self.http.rpc_port {
            return Err(anyhow::anyhow!("HTTP_PORT and RPC_PORT cannot be the same"));
        }

        if !(limits::MIN_BCRYPT_COST..=limits::MAX_BCRYPT_COST).contains(&self.auth.bcrypt_cost) {
            return Err(anyhow::anyhow!(
                "BCRYPT_COST must be between {} and {}",
                limits::MIN_BCRYPT_COST,
                limits::MAX_BCRYPT_COST
            ));
        }

        if self.http.request_timeout_secs == 0 || self.broker.timeout_secs == 0 {
            return Err(anyhow::anyhow!("timeouts must be at least one second"));
        }

        self.auth.key_ring().context("Invalid signing key configuration")?;

        if self.broker.api_key.is_empty() {
            warn!("CENTRIFUGO_API_KEY is not set; broker calls will be rejected by a secured Centrifugo");
        }

        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Herald Server Configuration:\n\
             - Environment: {}\n\
             - Host: {}\n\
             - HTTP Port: {}\n\
             - RPC Port: {}\n\
             - Log Level: {}\n\
             - Database: {}\n\
             - Signing Key: {} ({} retired){}\n\
             - Broker: {}\n\
             - Request Timeout: {}s",
            self.environment,
            self.http.host,
            self.http.http_port,
            self.http.rpc_port,
            self.log_level,
            if self.database.is_memory() {
                "SQLite (in-memory)"
            } else {
                "SQLite"
            },
            self.auth.key_id,
            self.auth.previous_keys.len(),
            if self.auth.secret_generated {
                ", generated"
            } else {
                ""
            },
            self.broker.api_url,
            self.http.request_timeout_secs
        )
    }
}

fn load_auth_config(environment: Environment) -> Result<AuthConfig> {
    let (secret, secret_generated) = match env::var("HERALD_JWT_SECRET") {
        Ok(secret) if !secret.is_empty() => (secret, false),
        _ if environment.is_development() => {
            warn!("HERALD_JWT_SECRET is not set; generated a random signing secret, tokens will not survive a restart");
            (generate_signing_secret(), true)
        }
        _ => {
            return Err(anyhow::anyhow!(
                "HERALD_JWT_SECRET must be set in the {environment} environment"
            ))
        }
    };

    let previous_keys = parse_key_list(&env_var_or("HERALD_JWT_PREVIOUS_KEYS", ""))
        .map_err(|e| anyhow::anyhow!("Invalid HERALD_JWT_PREVIOUS_KEYS: {}", e.message))?;

    Ok(AuthConfig {
        key_id: env_var_or("HERALD_JWT_KID", defaults::JWT_KEY_ID),
        secret,
        previous_keys,
        secret_generated,
        bcrypt_cost: parse_env("BCRYPT_COST", limits::DEFAULT_BCRYPT_COST)?,
    })
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Parse an environment variable, falling back to `default` when unset
fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key} value: {raw}")),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const TEST_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

    const MANAGED_VARS: [&str; 12] = [
        "ENVIRONMENT",
        "HTTP_PORT",
        "RPC_PORT",
        "DATABASE_URL",
        "HERALD_JWT_SECRET",
        "HERALD_JWT_KID",
        "HERALD_JWT_PREVIOUS_KEYS",
        "BCRYPT_COST",
        "REQUEST_TIMEOUT_SECS",
        "BROKER_TIMEOUT_SECS",
        "CENTRIFUGO_API_URL",
        "CENTRIFUGO_API_KEY",
    ];

    fn clear_env() {
        for key in MANAGED_VARS {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str_or_default("error"), LogLevel::Error);
        assert_eq!(LogLevel::from_str_or_default("WARN"), LogLevel::Warn);
        assert_eq!(LogLevel::from_str_or_default("nonsense"), LogLevel::Info);
        assert_eq!(LogLevel::Debug.to_tracing_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            Environment::from_str_or_default("prod"),
            Environment::Production
        );
        assert_eq!(Environment::from_str_or_default("test"), Environment::Testing);
        assert_eq!(
            Environment::from_str_or_default("anything"),
            Environment::Development
        );
    }

    #[test]
    fn test_database_url_parsing() {
        assert!(DatabaseUrl::parse_url("sqlite::memory:").is_memory());
        assert_eq!(
            DatabaseUrl::parse_url("sqlite:./data/herald.db").to_connection_string(),
            "sqlite:./data/herald.db"
        );
        assert_eq!(
            DatabaseUrl::parse_url("./plain.db"),
            DatabaseUrl::SQLite {
                path: PathBuf::from("./plain.db")
            }
        );
    }

    #[test]
    #[serial]
    fn test_defaults_in_development() {
        clear_env();
        env::set_var("HERALD_JWT_SECRET", TEST_SECRET);

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.http.http_port, defaults::HTTP_PORT);
        assert_eq!(config.http.rpc_port, defaults::RPC_PORT);
        assert_eq!(config.auth.key_id, defaults::JWT_KEY_ID);
        assert_eq!(config.auth.bcrypt_cost, limits::DEFAULT_BCRYPT_COST);
        assert_eq!(config.broker.api_url, defaults::CENTRIFUGO_API_URL);
        assert!(!config.auth.secret_generated);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_secret_generated_in_development() {
        clear_env();

        let config = ServerConfig::from_env().unwrap();
        assert!(config.auth.secret_generated);
        assert!(config.auth.key_ring().is_ok());
        assert!(config.summary().contains("generated"));
    }

    #[test]
    #[serial]
    fn test_missing_secret_rejected_in_production() {
        clear_env();
        env::set_var("ENVIRONMENT", "production");

        assert!(ServerConfig::from_env().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_previous_keys_loaded() {
        clear_env();
        env::set_var("HERALD_JWT_SECRET", TEST_SECRET);
        env::set_var("HERALD_JWT_KID", "2025-06");
        env::set_var(
            "HERALD_JWT_PREVIOUS_KEYS",
            "2025-01:an-older-secret-long-enough",
        );

        let config = ServerConfig::from_env().unwrap();
        let ring = config.auth.key_ring().unwrap();
        assert_eq!(ring.active_key_id(), "2025-06");
        assert!(ring.get_key("2025-01").is_some());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_port_clash_rejected() {
        clear_env();
        env::set_var("HERALD_JWT_SECRET", TEST_SECRET);
        env::set_var("HTTP_PORT", "9000");
        env::set_var("RPC_PORT", "9000");

        assert!(ServerConfig::from_env().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_unparseable_port_rejected() {
        clear_env();
        env::set_var("HERALD_JWT_SECRET", TEST_SECRET);
        env::set_var("HTTP_PORT", "eighty");

        assert!(ServerConfig::from_env().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_summary_has_no_secrets() {
        clear_env();
        env::set_var("HERALD_JWT_SECRET", TEST_SECRET);
        env::set_var("CENTRIFUGO_API_KEY", "super-secret-api-key");

        let config = ServerConfig::from_env().unwrap();
        let summary = config.summary();
        assert!(!summary.contains(TEST_SECRET));
        assert!(!summary.contains("super-secret-api-key"));
        assert!(!format!("{config:?}").contains(TEST_SECRET));

        clear_env();
    }
}
