// ABOUTME: JWT token codec issuing and validating access and refresh tokens with key ids
// ABOUTME: Also hosts bcrypt password hashing used by registration and login
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Token Codec
//!
//! Tokens are HS256 JWTs carrying `{sub, role, type, iat, exp, jti}` and a `kid`
//! header naming the key from the [`SigningKeyRing`] that signed them.
//!
//! - access tokens live 15 minutes
//! - refresh tokens live 30 days
//!
//! There is no revocation: a token stays valid until it expires.

use crate::constants::limits::{ACCESS_TOKEN_EXPIRY_MINUTES, REFRESH_TOKEN_EXPIRY_DAYS};
use crate::crypto::keys::SigningKeyRing;
use crate::errors::{AppError, AppResult};
use crate::models::{Principal, UserRole};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, decode_header, encode, Algorithm, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

/// Kind of token, carried in the `type` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived credential for regular operations
    Access,
    /// Long-lived credential exchangeable for a new pair
    Refresh,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access => f.write_str("access"),
            Self::Refresh => f.write_str("refresh"),
        }
    }
}

/// `JWT` claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id as a decimal string
    pub sub: String,
    /// Role at issuance time
    pub role: UserRole,
    /// Token kind
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Issued at (seconds since epoch)
    pub iat: i64,
    /// Expiration (seconds since epoch)
    pub exp: i64,
    /// Unique token id
    pub jti: String,
}

impl Claims {
    /// Principal described by these claims
    ///
    /// # Errors
    ///
    /// Returns [`JwtValidationError::Malformed`] if the subject is not a positive integer
    pub fn principal(&self) -> Result<Principal, JwtValidationError> {
        match self.sub.parse::<i64>() {
            Ok(id) if id > 0 => Ok(Principal::new(id, self.role)),
            _ => Err(JwtValidationError::Malformed {
                details: "subject is not a valid user id".into(),
            }),
        }
    }
}

/// Access and refresh token issued together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived token
    pub access_token: String,
    /// Long-lived token
    pub refresh_token: String,
}

/// `JWT` validation error with detailed information
#[derive(Debug, Clone, Error)]
pub enum JwtValidationError {
    /// Token has expired
    #[error("token expired at {expired_at}")]
    Expired {
        /// When the token expired
        expired_at: DateTime<Utc>,
        /// Current time for reference
        current_time: DateTime<Utc>,
    },
    /// Signature, algorithm, or key id did not verify
    #[error("token signature is invalid: {reason}")]
    InvalidSignature {
        /// Reason for invalidity
        reason: String,
    },
    /// Token could not be decoded
    #[error("token is malformed: {details}")]
    Malformed {
        /// Details about malformation
        details: String,
    },
}

impl From<JwtValidationError> for AppError {
    fn from(error: JwtValidationError) -> Self {
        match error {
            JwtValidationError::Expired { .. } => Self::auth_expired(),
            other => Self::auth_invalid(format!("invalid token: {other}")),
        }
    }
}

/// Issues and validates tokens against a rotating key ring
pub struct AuthManager {
    keys: RwLock<SigningKeyRing>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl AuthManager {
    /// Create a manager with the standard 15 minute / 30 day lifetimes
    #[must_use]
    pub fn new(keys: SigningKeyRing) -> Self {
        Self::with_lifetimes(
            keys,
            Duration::minutes(ACCESS_TOKEN_EXPIRY_MINUTES),
            Duration::days(REFRESH_TOKEN_EXPIRY_DAYS),
        )
    }

    /// Create a manager with custom lifetimes
    #[must_use]
    pub const fn with_lifetimes(
        keys: SigningKeyRing,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            keys: RwLock::new(keys),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Lifetime of tokens of the given type
    #[must_use]
    pub const fn lifetime(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        }
    }

    /// Issue an access token
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails
    pub fn issue_access(&self, user_id: i64, role: UserRole) -> AppResult<String> {
        self.issue_at(user_id, role, TokenType::Access, Utc::now())
    }

    /// Issue a refresh token
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails
    pub fn issue_refresh(&self, user_id: i64, role: UserRole) -> AppResult<String> {
        self.issue_at(user_id, role, TokenType::Refresh, Utc::now())
    }

    /// Issue an access and refresh token for the same identity
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails
    pub fn issue_pair(&self, user_id: i64, role: UserRole) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_access(user_id, role)?,
            refresh_token: self.issue_refresh(user_id, role)?,
        })
    }

    /// Issue a token as if at `issued_at`
    ///
    /// # Errors
    ///
    /// Returns an error if the key ring is unavailable or signing fails
    pub fn issue_at(
        &self,
        user_id: i64,
        role: UserRole,
        token_type: TokenType,
        issued_at: DateTime<Utc>,
    ) -> AppResult<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            token_type,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.lifetime(token_type)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let keys = self
            .keys
            .read()
            .map_err(|_| AppError::internal("signing key ring lock poisoned"))?;
        let active_key = keys.active_key()?;

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(active_key.kid.clone());

        encode(&header, &claims, &active_key.encoding_key())
            .map_err(|e| AppError::internal(format!("failed to sign token: {e}")))
    }

    /// Parse and validate a token of any type
    ///
    /// # Errors
    ///
    /// Returns [`JwtValidationError::InvalidSignature`] on algorithm, signature or key id mismatch,
    /// [`JwtValidationError::Expired`] past `exp`, and [`JwtValidationError::Malformed`]
    /// if the token cannot be decoded
    pub fn parse(&self, token: &str) -> Result<Claims, JwtValidationError> {
        let claims = self.decode_token_claims(token)?;
        Self::check_token_expiry(&claims, Utc::now())?;
        Ok(claims)
    }

    /// Install a new active signing key, keeping the old one for verification
    ///
    /// # Errors
    ///
    /// Returns a config error if the key is invalid or the ring is unavailable
    pub fn rotate_signing_key(&self, kid: &str, secret: &[u8]) -> AppResult<()> {
        self.keys
            .write()
            .map_err(|_| AppError::internal("signing key ring lock poisoned"))?
            .rotate(kid, secret)
    }

    /// Id of the key currently signing tokens
    ///
    /// # Errors
    ///
    /// Returns an internal error if the ring is unavailable
    pub fn active_key_id(&self) -> AppResult<String> {
        let keys = self
            .keys
            .read()
            .map_err(|_| AppError::internal("signing key ring lock poisoned"))?;
        Ok(keys.active_key_id().to_owned())
    }

    /// Decode claims with signature check but without the expiry check
    fn decode_token_claims(&self, token: &str) -> Result<Claims, JwtValidationError> {
        let header = decode_header(token).map_err(|e| JwtValidationError::Malformed {
            details: format!("failed to decode token header: {e}"),
        })?;

        if header.alg != Algorithm::HS256 {
            return Err(JwtValidationError::InvalidSignature {
                reason: format!("unexpected signing algorithm {:?}", header.alg),
            });
        }

        let keys = self
            .keys
            .read()
            .map_err(|_| JwtValidationError::InvalidSignature {
                reason: "signing key ring unavailable".into(),
            })?;

        let key = match header.kid.as_deref() {
            Some(kid) => keys
                .get_key(kid)
                .ok_or_else(|| JwtValidationError::InvalidSignature {
                    reason: format!("unknown key id {kid}"),
                })?,
            None => keys
                .active_key()
                .map_err(|e| JwtValidationError::InvalidSignature {
                    reason: e.message,
                })?,
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        decode::<Claims>(token, &key.decoding_key(), &validation)
            .map(|data| data.claims)
            .map_err(|e| Self::convert_jwt_error(&e))
    }

    /// Check if token is expired and return error if so
    fn check_token_expiry(
        claims: &Claims,
        current_time: DateTime<Utc>,
    ) -> Result<(), JwtValidationError> {
        if current_time.timestamp() >= claims.exp {
            let expired_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or(current_time);
            tracing::debug!(
                user_id = %claims.sub,
                expired_at = %expired_at.to_rfc3339(),
                "Token expired"
            );
            return Err(JwtValidationError::Expired {
                expired_at,
                current_time,
            });
        }
        Ok(())
    }

    /// Convert JWT library errors to detailed validation errors
    fn convert_jwt_error(e: &jsonwebtoken::errors::Error) -> JwtValidationError {
        use jsonwebtoken::errors::ErrorKind;

        match e.kind() {
            ErrorKind::InvalidSignature => JwtValidationError::InvalidSignature {
                reason: "signature verification failed".into(),
            },
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                JwtValidationError::InvalidSignature {
                    reason: "signing algorithm mismatch".into(),
                }
            }
            ErrorKind::InvalidToken => JwtValidationError::Malformed {
                details: "token format is invalid".into(),
            },
            ErrorKind::Base64(base64_err) => JwtValidationError::Malformed {
                details: format!("token contains invalid base64: {base64_err}"),
            },
            ErrorKind::Json(json_err) => JwtValidationError::Malformed {
                details: format!("token contains invalid claims: {json_err}"),
            },
            ErrorKind::Utf8(utf8_err) => JwtValidationError::Malformed {
                details: format!("token contains invalid UTF-8: {utf8_err}"),
            },
            ErrorKind::MissingRequiredClaim(claim) => JwtValidationError::Malformed {
                details: format!("token is missing claim {claim}"),
            },
            _ => JwtValidationError::InvalidSignature {
                reason: format!("token validation failed: {e}"),
            },
        }
    }
}

/// Hash a password with bcrypt off the async executor
///
/// # Errors
///
/// Returns an internal error if hashing fails
pub async fn hash_password(password: String, cost: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::internal(format!("password hashing task failed: {e}")))?
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

/// Verify a password against a bcrypt hash off the async executor
///
/// # Errors
///
/// Returns an internal error if the hash is unreadable
pub async fn verify_password(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::internal(format!("password verification task failed: {e}")))?
        .map_err(|e| AppError::internal(format!("password verification failed: {e}")))
}
