//! Error types for asset diffing.

use autobug_core::AutobugError;
use thiserror::Error;

/// A raw probe record that cannot become a snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotValidationError {
    /// The probe carries no asset value, so it has no identity
    #[error("probe record has no asset value")]
    MissingIdentity,
}

/// Errors that can occur while turning probe output into change reports.
#[derive(Error, Debug)]
pub enum DiffError {
    /// Probe record failed validation
    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] SnapshotValidationError),

    /// Probe output is not valid JSON for a probe record
    #[error("malformed probe record: {0}")]
    MalformedProbe(#[from] serde_json::Error),
}

impl From<DiffError> for AutobugError {
    fn from(err: DiffError) -> Self {
        AutobugError::Diff(err.to_string())
    }
}

/// Result type for diff operations.
pub type Result<T> = std::result::Result<T, DiffError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DiffError::from(SnapshotValidationError::MissingIdentity);
        assert_eq!(err.to_string(), "invalid snapshot: probe record has no asset value");
    }

    #[test]
    fn test_into_core_error() {
        let err: AutobugError = DiffError::from(SnapshotValidationError::MissingIdentity).into();
        assert!(matches!(err, AutobugError::Diff(_)));
    }
}
