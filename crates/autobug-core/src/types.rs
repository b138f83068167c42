//! Shared types used across AutoBug.
//!
//! This module defines common newtypes and enums that provide type safety
//! and clear domain modeling.

use crate::error::AutobugError;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Newtype for bug bounty program handles with validation.
///
/// Program handles must be lowercase alphanumeric with hyphens or underscores,
/// 1-100 characters, starting with an alphanumeric character.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProgramId(String);

impl ProgramId {
    /// Create a new `ProgramId` from a string.
    ///
    /// # Errors
    /// Returns error if the handle doesn't match the required format.
    pub fn new(id: impl Into<String>) -> Result<Self, AutobugError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<(), AutobugError> {
        static HANDLE_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = HANDLE_REGEX
            .get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_-]{0,99}$").expect("valid regex"));

        if regex.is_match(id) {
            Ok(())
        } else {
            Err(AutobugError::Validation(format!(
                "invalid program handle: must be 1-100 lowercase alphanumerics, '-' or '_', got '{id}'"
            )))
        }
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bug bounty platforms whose scope listings are understood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// hackerone.com
    HackerOne,
    /// bugcrowd.com
    Bugcrowd,
}

impl Platform {
    /// Lowercase platform key used in registries and config.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HackerOne => "hackerone",
            Self::Bugcrowd => "bugcrowd",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = AutobugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hackerone" | "h1" => Ok(Self::HackerOne),
            "bugcrowd" => Ok(Self::Bugcrowd),
            other => Err(AutobugError::Validation(format!(
                "unknown platform '{other}'"
            ))),
        }
    }
}

/// Wrapper around `chrono::DateTime<Utc>` for consistent timestamp handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current moment.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a timestamp from a `DateTime<Utc>`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Parse a timestamp from an RFC3339 string.
    pub fn from_rfc3339(s: &str) -> Result<Self, AutobugError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| AutobugError::Validation(format!("invalid timestamp: {e}")))
    }

    /// Format as RFC3339 string.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Get seconds since Unix epoch.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.0.timestamp()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}
