// ABOUTME: Per-user broker channel naming and parsing
// ABOUTME: Maps user ids to "notifications:user#<id>" and back with validation

use crate::constants::channels::USER_CHANNEL_PREFIX;
use crate::errors::{AppError, AppResult};
use std::fmt;
use std::str::FromStr;

/// Broker topic bound to one user's notifications
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Channel {
    name: String,
    user_id: i64,
}

impl Channel {
    /// Channel of `user_id`
    #[must_use]
    pub fn for_user(user_id: i64) -> Self {
        Self {
            name: format!("{USER_CHANNEL_PREFIX}{user_id}"),
            user_id,
        }
    }

    /// Owner of the channel
    #[must_use]
    pub const fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Channel name as sent to the broker
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl FromStr for Channel {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        let raw_id = s.strip_prefix(USER_CHANNEL_PREFIX).ok_or_else(|| {
            AppError::invalid_input(format!(
                "channel must look like '{USER_CHANNEL_PREFIX}<id>', got '{s}'"
            ))
        })?;

        match raw_id.parse::<i64>() {
            Ok(user_id) if user_id > 0 => Ok(Self::for_user(user_id)),
            _ => Err(AppError::invalid_input(format!(
                "invalid user id '{raw_id}' in channel"
            ))
            .with_resource_id(s)),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
