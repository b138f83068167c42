//! Scope rule compilation.
//!
//! Raw scope strings are resolved into a [`ScopeRule`] variant exactly once,
//! when a validator is built for a snapshot. Matching then dispatches on the
//! variant instead of re-sniffing the string on every lookup.

use crate::error::{Result, ScopeError};
use autobug_core::ScopeConfig;
use ipnetwork::IpNetwork;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;

/// Suffixes treated as real top-level domains by the app-id heuristic.
const RECOGNIZED_TLDS: &[&str] = &[
    "com", "net", "org", "edu", "gov", "mil", "int", "info", "biz", "io", "co", "ai", "app",
    "dev", "me", "tv", "cc", "gg", "sh", "so", "to", "fm", "ly", "xyz", "tech", "cloud",
    "online", "site", "store", "shop", "page", "link", "live", "pro", "mobi", "name", "us",
    "uk", "de", "fr", "nl", "eu", "ca", "au", "jp", "cn", "ru", "br", "in", "it", "es", "pl",
    "be", "at", "ch", "se", "no", "fi", "dk", "cz", "kr", "tw", "hk", "sg", "nz", "za", "mx",
    "ar", "cl", "ie", "il", "pt", "gr", "tr", "ua", "vn", "id", "my", "ph", "th",
];

/// Which side of a program's rule set an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    /// Assets the program authorizes for testing
    InScope,
    /// Assets explicitly excluded from testing
    OutOfScope,
}

impl RuleCategory {
    /// Wire name of the category.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InScope => "in_scope",
            Self::OutOfScope => "out_of_scope",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an exact rule names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExactKind {
    /// Domain or subdomain
    Domain,
    /// Single IPv4/IPv6 address
    Ip,
}

/// A compiled scope rule.
#[derive(Debug, Clone)]
pub enum ScopeRule {
    /// Exact domain or IP, stored lowercased (IPs in canonical form)
    Exact {
        /// Normalized value
        value: String,
        /// Domain or IP
        kind: ExactKind,
    },
    /// Glob pattern where `*` matches any run of characters
    Wildcard {
        /// Original pattern
        pattern: String,
        /// Anchored, case-insensitive regex
        regex: Regex,
    },
    /// IPv4 or IPv6 network
    Cidr(IpNetwork),
    /// Reverse-domain mobile application identifier
    AppId(String),
}

impl ScopeRule {
    /// Short name of the variant, for logs.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Exact {
                kind: ExactKind::Domain,
                ..
            } => "exact-domain",
            Self::Exact {
                kind: ExactKind::Ip,
                ..
            } => "exact-ip",
            Self::Wildcard { .. } => "wildcard",
            Self::Cidr(_) => "cidr",
            Self::AppId(_) => "app-id",
        }
    }

    /// Test a normalized asset against this rule alone.
    ///
    /// Subdomain inheritance is a rule-set concern and is not applied here.
    #[must_use]
    pub fn matches(&self, asset: &str, asset_ip: Option<IpAddr>) -> bool {
        match self {
            Self::Exact { value, .. } | Self::AppId(value) => value == asset,
            Self::Wildcard { regex, .. } => regex.is_match(asset),
            Self::Cidr(network) => asset_ip.is_some_and(|ip| network.contains(ip)),
        }
    }
}

/// Resolves raw scope strings into [`ScopeRule`]s.
#[derive(Debug, Clone, Default)]
pub struct RuleCompiler {
    extra_tlds: BTreeSet<String>,
}

impl RuleCompiler {
    /// Compiler with the built-in TLD list only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add suffixes the app-id heuristic should treat as real TLDs.
    #[must_use]
    pub fn with_extra_tlds<I, S>(mut self, tlds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extra_tlds
            .extend(tlds.into_iter().map(|t| t.as_ref().to_ascii_lowercase()));
        self
    }

    /// Compiler configured from the `[scope]` config section.
    #[must_use]
    pub fn from_config(config: &ScopeConfig) -> Self {
        Self::new().with_extra_tlds(&config.extra_tlds)
    }

    /// Compile one raw scope entry.
    ///
    /// Resolution order: wildcard, CIDR, bare IP, app id, exact domain.
    ///
    /// # Errors
    /// Returns `ScopeError::RuleCompilation` for empty entries, entries with
    /// embedded whitespace, and `/`-containing entries that are not networks.
    pub fn compile(&self, raw: &str) -> Result<ScopeRule> {
        let item = raw.trim();

        if item.is_empty() {
            return Err(ScopeError::compilation(raw, "empty scope entry"));
        }
        if item.chars().any(char::is_whitespace) {
            return Err(ScopeError::compilation(raw, "scope entry contains whitespace"));
        }

        if item.contains('*') {
            return compile_wildcard(item);
        }

        if item.contains('/') {
            return item
                .parse::<IpNetwork>()
                .map(ScopeRule::Cidr)
                .map_err(|e| ScopeError::compilation(raw, format!("invalid network: {e}")));
        }

        if let Ok(ip) = item.parse::<IpAddr>() {
            return Ok(ScopeRule::Exact {
                value: ip.to_string(),
                kind: ExactKind::Ip,
            });
        }

        let lowered = item.to_ascii_lowercase();
        if self.looks_like_app_id(&lowered) {
            return Ok(ScopeRule::AppId(lowered));
        }

        Ok(ScopeRule::Exact {
            value: lowered,
            kind: ExactKind::Domain,
        })
    }

    /// Whether `suffix` is a top-level domain this compiler recognizes.
    #[must_use]
    pub fn is_recognized_tld(&self, suffix: &str) -> bool {
        let suffix = suffix.to_ascii_lowercase();
        RECOGNIZED_TLDS.contains(&suffix.as_str()) || self.extra_tlds.contains(&suffix)
    }

    // Best effort: `com.acme.android` is an app id, `com.acme.app` reads as a
    // domain because `app` is a real TLD. The ambiguity is inherent.
    fn looks_like_app_id(&self, value: &str) -> bool {
        let segments: Vec<&str> = value.split('.').collect();
        if segments.len() < 2 {
            return false;
        }

        let well_formed = segments.iter().all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

        well_formed
            && segments
                .last()
                .is_some_and(|last| !self.is_recognized_tld(last))
    }
}

/// Compile with the default compiler.
///
/// # Errors
/// See [`RuleCompiler::compile`].
pub fn compile(raw: &str) -> Result<ScopeRule> {
    RuleCompiler::new().compile(raw)
}

fn compile_wildcard(item: &str) -> Result<ScopeRule> {
    let pattern = regex::escape(item).replace(r"\*", ".*");

    RegexBuilder::new(&format!("^{pattern}$"))
        .case_insensitive(true)
        .build()
        .map(|regex| ScopeRule::Wildcard {
            pattern: item.to_string(),
            regex,
        })
        .map_err(|e| ScopeError::compilation(item, format!("invalid wildcard: {e}")))
}
