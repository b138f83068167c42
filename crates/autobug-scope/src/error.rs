//! Error types for the scope subsystem.

use autobug_core::AutobugError;
use thiserror::Error;

/// Errors that can occur while compiling or looking up scope rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// A single scope entry could not be turned into a rule
    #[error("failed to compile scope rule '{item}': {reason}")]
    RuleCompilation {
        /// The raw scope entry
        item: String,
        /// Why compilation failed
        reason: String,
    },

    /// No parser is registered for the requested platform
    #[error("unsupported platform: {platform} (supported: {})", .supported.join(", "))]
    UnsupportedPlatform {
        /// Requested platform key
        platform: String,
        /// Platform keys present in the registry
        supported: Vec<String>,
    },
}

impl ScopeError {
    pub(crate) fn compilation(item: &str, reason: impl Into<String>) -> Self {
        Self::RuleCompilation {
            item: item.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<ScopeError> for AutobugError {
    fn from(err: ScopeError) -> Self {
        AutobugError::Scope(err.to_string())
    }
}

/// Result type for scope operations.
pub type Result<T> = std::result::Result<T, ScopeError>;
