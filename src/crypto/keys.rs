// ABOUTME: HMAC signing key ring with key ids for token signing and rotation
// ABOUTME: Keeps one active signing key plus retired keys still accepted for verification
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Signing key management for HS256 tokens
//!
//! Every token carries the `kid` of the key that signed it. Rotating the ring
//! installs a new active key and keeps the previous one for verification, so
//! tokens issued before the rotation stay valid until they expire naturally.

use crate::constants::limits::MIN_SIGNING_SECRET_BYTES;
use crate::errors::{AppError, AppResult};
use base64::{engine::general_purpose, Engine};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rand::RngCore;
use std::collections::HashMap;
use std::fmt;

/// One HMAC secret identified by its key id
#[derive(Clone)]
pub struct SigningKey {
    /// Key id written to the token header
    pub kid: String,
    secret: Vec<u8>,
    /// When the key entered the ring
    pub created_at: DateTime<Utc>,
    /// Whether new tokens are signed with this key
    pub is_active: bool,
}

impl SigningKey {
    fn new(kid: &str, secret: &[u8], is_active: bool) -> AppResult<Self> {
        if kid.trim().is_empty() {
            return Err(AppError::config("signing key id must not be empty"));
        }
        if secret.len() < MIN_SIGNING_SECRET_BYTES {
            return Err(AppError::config(format!(
                "signing secret for key '{kid}' must be at least {MIN_SIGNING_SECRET_BYTES} bytes"
            )));
        }
        Ok(Self {
            kid: kid.to_owned(),
            secret: secret.to_vec(),
            created_at: Utc::now(),
            is_active,
        })
    }

    /// Key used to sign tokens
    #[must_use]
    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(&self.secret)
    }

    /// Key used to verify tokens
    #[must_use]
    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(&self.secret)
    }
}

// Secrets stay out of debug output
impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("created_at", &self.created_at)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

/// Active signing key plus retired verification keys
#[derive(Debug, Clone)]
pub struct SigningKeyRing {
    keys: HashMap<String, SigningKey>,
    active_key_id: String,
}

impl SigningKeyRing {
    /// Create a ring with a single active key
    ///
    /// # Errors
    ///
    /// Returns a config error if the key id is empty or the secret is too short
    pub fn new(kid: &str, secret: &[u8]) -> AppResult<Self> {
        let key = SigningKey::new(kid, secret, true)?;
        let mut keys = HashMap::new();
        keys.insert(kid.to_owned(), key);
        Ok(Self {
            keys,
            active_key_id: kid.to_owned(),
        })
    }

    /// Add a retired key that still verifies tokens but never signs
    ///
    /// # Errors
    ///
    /// Returns a config error if the key is invalid or reuses the active key id
    pub fn with_retired_key(mut self, kid: &str, secret: &[u8]) -> AppResult<Self> {
        if kid == self.active_key_id {
            return Err(AppError::config(format!(
                "retired key id '{kid}' collides with the active key"
            )));
        }
        let key = SigningKey::new(kid, secret, false)?;
        self.keys.insert(kid.to_owned(), key);
        Ok(self)
    }

    /// Install a new active key, demoting the current one to verification only
    ///
    /// # Errors
    ///
    /// Returns a config error if the new key is invalid or its id is already in the ring
    pub fn rotate(&mut self, new_kid: &str, new_secret: &[u8]) -> AppResult<()> {
        if self.keys.contains_key(new_kid) {
            return Err(AppError::config(format!(
                "key id '{new_kid}' is already in the key ring"
            )));
        }
        let key = SigningKey::new(new_kid, new_secret, true)?;

        if let Some(previous) = self.keys.get_mut(&self.active_key_id) {
            previous.is_active = false;
        }
        tracing::info!(
            previous_kid = %self.active_key_id,
            new_kid = %new_kid,
            "Rotated token signing key"
        );
        self.active_key_id = new_kid.to_owned();
        self.keys.insert(new_kid.to_owned(), key);
        Ok(())
    }

    /// Key that signs new tokens
    ///
    /// # Errors
    ///
    /// Returns an internal error if the ring lost its active key
    pub fn active_key(&self) -> AppResult<&SigningKey> {
        self.keys
            .get(&self.active_key_id)
            .ok_or_else(|| AppError::internal("no active signing key"))
    }

    /// Get key by id
    #[must_use]
    pub fn get_key(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.get(kid)
    }

    /// Id of the active key
    #[must_use]
    pub fn active_key_id(&self) -> &str {
        &self.active_key_id
    }
}

/// Parse `kid:secret,kid:secret` into key pairs
///
/// # Errors
///
/// Returns a config error for entries without a `:` separator
pub fn parse_key_list(raw: &str) -> AppResult<Vec<(String, String)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .split_once(':')
                .map(|(kid, secret)| (kid.trim().to_owned(), secret.trim().to_owned()))
                .ok_or_else(|| AppError::config("retired keys must be formatted as kid:secret"))
        })
        .collect()
}

/// Generate a random 256-bit secret, base64 encoded
#[must_use]
pub fn generate_signing_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::STANDARD.encode(bytes)
}
