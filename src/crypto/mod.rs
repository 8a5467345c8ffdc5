// ABOUTME: Cryptography module providing token signing key management
// ABOUTME: Centralizes HMAC signing secrets and their rotation for the token codec
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Cryptographic utilities for the Herald server

pub mod keys;

pub use keys::{generate_signing_secret, parse_key_list, SigningKey, SigningKeyRing};
