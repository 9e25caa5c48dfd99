// ABOUTME: Validated database instance identifier.
// ABOUTME: Enforces the control plane's identifier rules before any call is made.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstanceIdError {
    #[error("instance identifier cannot be empty")]
    Empty,

    #[error("instance identifier exceeds maximum length of 63 characters")]
    TooLong,

    #[error("instance identifier must start with a letter")]
    StartsWithNonLetter,

    #[error("instance identifier cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("instance identifier cannot contain two consecutive hyphens")]
    ConsecutiveHyphens,

    #[error("instance identifier must be lowercase")]
    NotLowercase,

    #[error("invalid character in instance identifier: '{0}'")]
    InvalidChar(char),
}

/// Identifier of a database instance (`[a-z][a-z0-9-]*`, at most 63 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(value: &str) -> Result<Self, InstanceIdError> {
        if value.is_empty() {
            return Err(InstanceIdError::Empty);
        }

        if value.len() > 63 {
            return Err(InstanceIdError::TooLong);
        }

        if !value.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(InstanceIdError::StartsWithNonLetter);
        }

        if value.ends_with('-') {
            return Err(InstanceIdError::EndsWithHyphen);
        }

        if value.contains("--") {
            return Err(InstanceIdError::ConsecutiveHyphens);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(InstanceIdError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(InstanceIdError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for InstanceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for InstanceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        InstanceId::new(&s).map_err(serde::de::Error::custom)
    }
}
