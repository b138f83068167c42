//! Explicit platform parser registry.

use crate::error::{Result, ScopeError};
use crate::parser::{BugcrowdParser, HackerOneParser, PlatformParser};
use autobug_core::{Platform, ScopeConfig};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Table of platform parsers, keyed by lowercase platform name.
///
/// Callers construct and own the registry; there is no process-wide table.
#[derive(Clone, Default)]
pub struct ParserRegistry {
    parsers: BTreeMap<String, Arc<dyn PlatformParser>>,
}

impl ParserRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the HackerOne and Bugcrowd parsers.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::from_config(&ScopeConfig::default())
    }

    /// Registry with the built-in parsers configured from `[scope]`.
    #[must_use]
    pub fn from_config(config: &ScopeConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(HackerOneParser::from_config(config)));
        registry.register(Arc::new(BugcrowdParser::from_config(config)));
        registry
    }

    /// Register a parser under its platform key, replacing any previous one.
    pub fn register(&mut self, parser: Arc<dyn PlatformParser>) {
        let key = parser.platform().as_str().to_string();
        debug!(platform = %key, "registered scope parser");
        self.parsers.insert(key, parser);
    }

    /// Look up a parser by platform name (case-insensitive).
    ///
    /// # Errors
    /// Returns `ScopeError::UnsupportedPlatform` if no parser is registered.
    pub fn get(&self, platform: &str) -> Result<Arc<dyn PlatformParser>> {
        let key = platform.trim().to_ascii_lowercase();
        self.parsers
            .get(&key)
            .cloned()
            .ok_or_else(|| ScopeError::UnsupportedPlatform {
                platform: key,
                supported: self.supported_platforms(),
            })
    }

    /// Look up a parser by typed platform.
    ///
    /// # Errors
    /// Returns `ScopeError::UnsupportedPlatform` if no parser is registered.
    pub fn get_platform(&self, platform: Platform) -> Result<Arc<dyn PlatformParser>> {
        self.get(platform.as_str())
    }

    /// Registered platform keys, sorted.
    #[must_use]
    pub fn supported_platforms(&self) -> Vec<String> {
        self.parsers.keys().cloned().collect()
    }
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("platforms", &self.supported_platforms())
            .finish()
    }
}
