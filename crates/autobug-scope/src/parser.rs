//! Platform-specific scope item parsing.
//!
//! Platforms publish scope entries with inconsistent decoration (schemes,
//! trailing slashes, mixed case). Each [`PlatformParser`] cleans entries up
//! and labels them before they are stored in a [`ScopeSnapshot`].

use crate::rule::RuleCompiler;
use crate::snapshot::ScopeSnapshot;
use autobug_core::{Platform, ScopeConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// Coarse label for a scope entry as published by a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeItemKind {
    /// `*.`-prefixed pattern
    Wildcard,
    /// Registrable domain (one dot)
    Domain,
    /// Host below a registrable domain
    Subdomain,
    /// IPv4 address
    Ip,
    /// IPv4 network
    Cidr,
    /// Mobile application identifier
    AppId,
    /// Anything else (source repositories, descriptions, ...)
    Other,
}

impl ScopeItemKind {
    /// Wire name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wildcard => "wildcard",
            Self::Domain => "domain",
            Self::Subdomain => "subdomain",
            Self::Ip => "ip",
            Self::Cidr => "cidr",
            Self::AppId => "app_id",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ScopeItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized, labelled scope entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedScopeItem {
    /// Normalized entry
    pub value: String,
    /// Coarse label
    pub kind: ScopeItemKind,
    /// Whether the entry is a wildcard pattern
    pub wildcard: bool,
}

/// Strip `http://`/`https://`, trailing slashes and surrounding whitespace,
/// and lowercase.
#[must_use]
pub fn normalize_scope_item(item: &str) -> String {
    let item = item.trim();
    let lowered = item.to_lowercase();
    let stripped = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);

    stripped.trim_end_matches('/').trim().to_string()
}

/// Parses one platform's scope entries.
pub trait PlatformParser: Send + Sync {
    /// Platform this parser understands.
    fn platform(&self) -> Platform;

    /// Label an entry. The entry is normalized first.
    fn parse_scope_item(&self, item: &str) -> ParsedScopeItem;

    /// Whether entries are fully normalized or only trimmed.
    fn normalizes_items(&self) -> bool {
        true
    }

    /// Clean up a raw entry for storage and comparison.
    fn normalize_scope_item(&self, item: &str) -> String {
        if self.normalizes_items() {
            normalize_scope_item(item)
        } else {
            item.trim().to_string()
        }
    }

    /// Group entries by kind. Kinds with no entries are omitted.
    fn categorize_scope_items(&self, items: &[String]) -> BTreeMap<ScopeItemKind, Vec<String>> {
        let mut groups: BTreeMap<ScopeItemKind, Vec<String>> = BTreeMap::new();
        for item in items {
            let parsed = self.parse_scope_item(item);
            groups.entry(parsed.kind).or_default().push(parsed.value);
        }
        groups
    }

    /// Normalize raw in/out lists into a snapshot, dropping blank entries.
    fn build_snapshot(&self, in_scope: &[String], out_of_scope: &[String]) -> ScopeSnapshot {
        let clean = |items: &[String]| -> Vec<String> {
            items
                .iter()
                .map(|item| self.normalize_scope_item(item))
                .filter(|item| !item.is_empty())
                .collect()
        };

        ScopeSnapshot::new(clean(in_scope), clean(out_of_scope))
    }
}

fn domain_regex() -> &'static Regex {
    static DOMAIN: OnceLock<Regex> = OnceLock::new();
    DOMAIN.get_or_init(|| {
        Regex::new(r"(?i)^[A-Za-z0-9_][A-Za-z0-9_.-]*\.[a-z]{2,}$").expect("valid domain regex")
    })
}

fn ipv4_regex() -> &'static Regex {
    static IPV4: OnceLock<Regex> = OnceLock::new();
    IPV4.get_or_init(|| Regex::new(r"^[0-9]{1,3}(\.[0-9]{1,3}){3}$").expect("valid ipv4 regex"))
}

fn cidr_regex() -> &'static Regex {
    static CIDR: OnceLock<Regex> = OnceLock::new();
    CIDR.get_or_init(|| {
        Regex::new(r"^[0-9]{1,3}(\.[0-9]{1,3}){3}/[0-9]{1,2}$").expect("valid cidr regex")
    })
}

fn app_id_regex() -> &'static Regex {
    static APP_ID: OnceLock<Regex> = OnceLock::new();
    APP_ID.get_or_init(|| {
        Regex::new(r"(?i)^(com|org|app|io)\.[a-z0-9._-]+$").expect("valid app id regex")
    })
}

fn classify(value: &str) -> ScopeItemKind {
    if value.starts_with("*.") {
        ScopeItemKind::Wildcard
    } else if domain_regex().is_match(value) {
        if value.matches('.').count() == 1 {
            ScopeItemKind::Domain
        } else {
            ScopeItemKind::Subdomain
        }
    } else if ipv4_regex().is_match(value) {
        ScopeItemKind::Ip
    } else if cidr_regex().is_match(value) {
        ScopeItemKind::Cidr
    } else {
        ScopeItemKind::Other
    }
}

fn parsed(value: String, kind: ScopeItemKind) -> ParsedScopeItem {
    ParsedScopeItem {
        wildcard: kind == ScopeItemKind::Wildcard,
        value,
        kind,
    }
}

/// HackerOne scope entries.
#[derive(Debug, Clone)]
pub struct HackerOneParser {
    normalize: bool,
}

impl HackerOneParser {
    /// Parser that normalizes entries.
    #[must_use]
    pub fn new() -> Self {
        Self { normalize: true }
    }

    /// Parser configured from the `[scope]` config section.
    #[must_use]
    pub fn from_config(config: &ScopeConfig) -> Self {
        Self {
            normalize: config.normalize_items,
        }
    }
}

impl Default for HackerOneParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformParser for HackerOneParser {
    fn platform(&self) -> Platform {
        Platform::HackerOne
    }

    fn normalizes_items(&self) -> bool {
        self.normalize
    }

    fn parse_scope_item(&self, item: &str) -> ParsedScopeItem {
        let value = self.normalize_scope_item(item);
        let kind = classify(&value);
        parsed(value, kind)
    }
}

/// Bugcrowd scope entries, which also list mobile applications.
#[derive(Debug, Clone)]
pub struct BugcrowdParser {
    normalize: bool,
    compiler: RuleCompiler,
}

impl BugcrowdParser {
    /// Parser that normalizes entries.
    #[must_use]
    pub fn new() -> Self {
        Self {
            normalize: true,
            compiler: RuleCompiler::new(),
        }
    }

    /// Parser configured from the `[scope]` config section.
    #[must_use]
    pub fn from_config(config: &ScopeConfig) -> Self {
        Self {
            normalize: config.normalize_items,
            compiler: RuleCompiler::from_config(config),
        }
    }

    // `com.acme.android` is an app; `io.example.com` is still a host.
    fn is_app_id(&self, value: &str) -> bool {
        app_id_regex().is_match(value)
            && value
                .rsplit('.')
                .next()
                .is_some_and(|last| !self.compiler.is_recognized_tld(last))
    }
}

impl Default for BugcrowdParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformParser for BugcrowdParser {
    fn platform(&self) -> Platform {
        Platform::Bugcrowd
    }

    fn normalizes_items(&self) -> bool {
        self.normalize
    }

    fn parse_scope_item(&self, item: &str) -> ParsedScopeItem {
        let value = self.normalize_scope_item(item);
        let kind = if self.is_app_id(&value) {
            ScopeItemKind::AppId
        } else {
            classify(&value)
        };
        parsed(value, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_normalize_scope_item() {
        assert_eq!(normalize_scope_item("  https://API.Example.com/ "), "api.example.com");
        assert_eq!(normalize_scope_item("http://example.com//"), "example.com");
        assert_eq!(normalize_scope_item("*.Example.com"), "*.example.com");
        assert_eq!(normalize_scope_item("   "), "");
    }

    #[test]
    fn test_hackerone_kinds() {
        let parser = HackerOneParser::new();
        let cases = [
            ("*.example.com", ScopeItemKind::Wildcard),
            ("example.com", ScopeItemKind::Domain),
            ("https://api.example.com/", ScopeItemKind::Subdomain),
            ("192.168.1.1", ScopeItemKind::Ip),
            ("10.0.0.0/8", ScopeItemKind::Cidr),
            ("https://github.com/acme/repo", ScopeItemKind::Other),
            ("com.acme.android", ScopeItemKind::Subdomain),
        ];

        for (raw, expected) in cases {
            assert_eq!(parser.parse_scope_item(raw).kind, expected, "{raw}");
        }

        let wildcard = parser.parse_scope_item("*.example.com");
        assert!(wildcard.wildcard);
        assert!(!parser.parse_scope_item("example.com").wildcard);
    }

    #[test]
    fn test_bugcrowd_recognizes_app_ids() {
        let parser = BugcrowdParser::new();
        assert_eq!(
            parser.parse_scope_item("com.acme.android").kind,
            ScopeItemKind::AppId
        );
        assert_eq!(
            parser.parse_scope_item("io.example.com").kind,
            ScopeItemKind::Subdomain
        );
        assert_eq!(
            parser.parse_scope_item("*.acme.com").kind,
            ScopeItemKind::Wildcard
        );
    }

    #[test]
    fn test_categorize_groups_by_kind() {
        let parser = HackerOneParser::new();
        let groups = parser.categorize_scope_items(&strings(&[
            "*.a.com",
            "a.com",
            "b.com",
            "api.a.com",
            "10.0.0.1",
        ]));

        assert_eq!(groups[&ScopeItemKind::Domain], vec!["a.com", "b.com"]);
        assert_eq!(groups[&ScopeItemKind::Wildcard], vec!["*.a.com"]);
        assert_eq!(groups[&ScopeItemKind::Ip], vec!["10.0.0.1"]);
        assert!(!groups.contains_key(&ScopeItemKind::Cidr));
    }

    #[test]
    fn test_build_snapshot_normalizes_and_dedups() {
        let parser = HackerOneParser::new();
        let snapshot = parser.build_snapshot(
            &strings(&["https://Example.com/", "example.com", "  "]),
            &strings(&["http://admin.example.com"]),
        );

        assert_eq!(snapshot.in_scope().len(), 1);
        assert!(snapshot.in_scope().contains("example.com"));
        assert!(snapshot.out_of_scope().contains("admin.example.com"));
    }

    #[test]
    fn test_normalization_can_be_disabled() {
        let config = ScopeConfig {
            normalize_items: false,
            ..ScopeConfig::default()
        };
        let parser = HackerOneParser::from_config(&config);
        assert_eq!(
            parser.normalize_scope_item(" https://Example.com/ "),
            "https://Example.com/"
        );
    }
}
