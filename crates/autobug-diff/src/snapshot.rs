//! Asset snapshot normalization.
//!
//! Probe tools report the same facts under different keys and with different
//! "empty" markers. [`AssetSnapshot::from_probe`] folds those into one shape so
//! the detector compares like with like.

use crate::error::SnapshotValidationError;
use autobug_core::{ProgramId, Timestamp};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// One probe record as emitted by an HTTP probing tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProbe {
    /// Asset identity (host or URL)
    #[serde(default)]
    pub value: Option<String>,
    /// HTTP status code; `0` means no response
    #[serde(default, alias = "status_code")]
    pub http_status: Option<u16>,
    /// Response body length
    #[serde(default)]
    pub content_length: Option<u64>,
    /// Page title
    #[serde(default)]
    pub title: Option<String>,
    /// Detected technologies
    #[serde(default, alias = "technologies", alias = "tech")]
    pub tech_stack: Option<Vec<String>>,
    /// Resolved IP address
    #[serde(default, alias = "ip")]
    pub ip_address: Option<String>,
    /// Hash of the response body
    #[serde(default, alias = "hash")]
    pub response_hash: Option<String>,
}

impl RawProbe {
    /// Parse one JSON probe record.
    ///
    /// # Errors
    /// Returns `DiffError::MalformedProbe` if the JSON does not describe a probe.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Normalized observation of one asset at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSnapshot {
    /// Program the asset belongs to
    pub program_id: ProgramId,
    /// Asset value, trimmed and lowercased
    pub value: String,
    /// HTTP status code
    pub http_status: Option<u16>,
    /// Response body length
    pub content_length: Option<u64>,
    /// Page title
    pub title: Option<String>,
    /// Detected technologies
    pub tech_stack: BTreeSet<String>,
    /// Resolved IP address
    pub ip_address: Option<String>,
    /// Hash of the response body
    pub response_hash: Option<String>,
    /// When the asset was first observed
    pub first_seen: Timestamp,
    /// When this observation was made
    pub last_seen: Timestamp,
}

impl AssetSnapshot {
    /// Normalize a probe record.
    ///
    /// # Errors
    /// Returns `SnapshotValidationError::MissingIdentity` if the record has no
    /// usable asset value.
    pub fn from_probe(
        program_id: ProgramId,
        probe: &RawProbe,
        observed_at: Timestamp,
    ) -> Result<Self, SnapshotValidationError> {
        let value = probe
            .value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(SnapshotValidationError::MissingIdentity)?
            .to_lowercase();

        let tech_stack = probe
            .tech_stack
            .iter()
            .flatten()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            program_id,
            value,
            http_status: probe.http_status.filter(|status| *status != 0),
            content_length: probe.content_length,
            title: non_blank(probe.title.as_deref()),
            tech_stack,
            ip_address: non_blank(probe.ip_address.as_deref()),
            response_hash: non_blank(probe.response_hash.as_deref()),
            first_seen: observed_at,
            last_seen: observed_at,
        })
    }

    /// Identity key: program plus asset value.
    #[must_use]
    pub fn identity(&self) -> (&ProgramId, &str) {
        (&self.program_id, &self.value)
    }

    /// Whether `other` describes the same asset.
    #[must_use]
    pub fn same_asset(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }

    /// Keep the earlier `first_seen` of a previous observation of this asset.
    #[must_use]
    pub fn carry_forward(mut self, previous: &Self) -> Self {
        if self.same_asset(previous) && previous.first_seen < self.first_seen {
            self.first_seen = previous.first_seen;
        }
        self
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Lowercase hex SHA-256 of a response body.
#[must_use]
pub fn compute_response_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}
