// ABOUTME: Credential redaction for authorization logging
// ABOUTME: Reduces an Authorization header to its structural shape so tokens never reach logs
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Credential-safe logging
//!
//! Rejected requests are logged with the shape of the credential they carried,
//! never the credential itself.
//!
//! ```rust
//! use herald_server::middleware::redaction::describe_authorization;
//!
//! assert_eq!(
//!     describe_authorization(Some("Bearer aaa.bbb.ccc")),
//!     "Bearer <redacted:3-part-jwt>"
//! );
//! assert_eq!(describe_authorization(None), "<missing>");
//! ```

use regex::Regex;
use std::sync::OnceLock;

/// Scheme names echoed back verbatim; anything else is redacted
const KNOWN_SCHEMES: [&str; 2] = ["Bearer", "Basic"];

fn jwt_regex() -> Option<&'static Regex> {
    static JWT_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    JWT_REGEX
        .get_or_init(|| {
            // Hardcoded regex pattern - should always compile
            Regex::new(r"^[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]*$").ok()
        })
        .as_ref()
}

/// Describe the token part of a credential without revealing it
fn describe_token(token: &str) -> &'static str {
    if token.is_empty() {
        "<empty>"
    } else if jwt_regex().is_some_and(|re| re.is_match(token)) {
        "<redacted:3-part-jwt>"
    } else {
        "<redacted:opaque>"
    }
}

/// Structural description of an `Authorization` header value
///
/// Only the scheme survives, and only when it is a known scheme name.
#[must_use]
pub fn describe_authorization(header: Option<&str>) -> String {
    let Some(header) = header else {
        return "<missing>".to_owned();
    };
    if header.trim().is_empty() {
        return "<empty>".to_owned();
    }

    let parts: Vec<&str> = header.split(' ').collect();
    match parts.as_slice() {
        [scheme, token] if KNOWN_SCHEMES.contains(scheme) => {
            format!("{scheme} {}", describe_token(token))
        }
        [_, token] => format!("<redacted:scheme> {}", describe_token(token)),
        [single] => describe_token(single).to_owned(),
        _ => format!("<redacted:{}-part-header>", parts.len()),
    }
}
