// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Token lifetimes, validation limits, channel naming, and environment lookups

//! Constants module
//!
//! Constants are grouped by domain rather than kept in a single flat list.

use std::env;

/// Environment-based configuration
pub mod env_config {
    use super::{defaults, env};

    /// Get REST server port from environment or default
    #[must_use]
    pub fn http_port() -> u16 {
        env::var("HTTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults::HTTP_PORT)
    }

    /// Get RPC server port from environment or default
    #[must_use]
    pub fn rpc_port() -> u16 {
        env::var("RPC_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults::RPC_PORT)
    }

    /// Get bind host from environment or default
    #[must_use]
    pub fn host() -> String {
        env::var("HOST").unwrap_or_else(|_| defaults::HOST.to_owned())
    }

    /// Get database URL from environment or default
    #[must_use]
    pub fn database_url() -> String {
        env::var("DATABASE_URL").unwrap_or_else(|_| defaults::DATABASE_URL.to_owned())
    }

    /// Get log level from environment or default
    #[must_use]
    pub fn log_level() -> String {
        env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned())
    }

    /// Get Centrifugo API base URL from environment or default
    #[must_use]
    pub fn centrifugo_api_url() -> String {
        env::var("CENTRIFUGO_API_URL").unwrap_or_else(|_| defaults::CENTRIFUGO_API_URL.to_owned())
    }
}

/// Default values used when the environment is silent
pub mod defaults {
    /// REST listener port
    pub const HTTP_PORT: u16 = 8081;
    /// RPC listener port
    pub const RPC_PORT: u16 = 8082;
    /// Bind host
    pub const HOST: &str = "127.0.0.1";
    /// `SQLite` database location
    pub const DATABASE_URL: &str = "sqlite:./data/herald.db";
    /// Centrifugo HTTP API base URL
    pub const CENTRIFUGO_API_URL: &str = "http://localhost:8000/api";
    /// Key id used when `HERALD_JWT_KID` is not set
    pub const JWT_KEY_ID: &str = "primary";
    /// Broker request timeout
    pub const BROKER_TIMEOUT_SECS: u64 = 10;
    /// REST request timeout
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
}

/// Token lifetimes and validation limits
pub mod limits {
    /// Access token lifetime in minutes
    pub const ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 15;
    /// Refresh token lifetime in days
    pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 30;
    /// Minimum username length (characters)
    pub const USERNAME_MIN_LENGTH: usize = 3;
    /// Maximum username length (characters)
    pub const USERNAME_MAX_LENGTH: usize = 20;
    /// Minimum password length (characters)
    pub const PASSWORD_MIN_LENGTH: usize = 6;
    /// Maximum password length (characters)
    pub const PASSWORD_MAX_LENGTH: usize = 20;
    /// Default bcrypt cost
    pub const DEFAULT_BCRYPT_COST: u32 = 10;
    /// Lowest bcrypt cost accepted
    pub const MIN_BCRYPT_COST: u32 = 4;
    /// Highest bcrypt cost accepted
    pub const MAX_BCRYPT_COST: u32 = 31;
    /// Minimum length of an HMAC signing secret in bytes
    pub const MIN_SIGNING_SECRET_BYTES: usize = 16;
}

/// Broker channel naming
pub mod channels {
    /// Prefix of every per-user notification channel
    pub const USER_CHANNEL_PREFIX: &str = "notifications:user#";
}

/// Service identifiers used in logs and error messages
pub mod service_names {
    /// This service
    pub const HERALD_SERVER: &str = "herald-server";
    /// Pub/sub broker
    pub const CENTRIFUGO: &str = "centrifugo";
}
