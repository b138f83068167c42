//! Asset scope validation.
//!
//! A [`ScopeValidator`] is bound to exactly one [`ScopeSnapshot`]: its rules
//! are compiled once at construction and never shared with another snapshot.
//!
//! Evaluation order, first decisive match wins:
//!
//! 1. any out-of-scope rule (exact, app id, wildcard, CIDR) excludes the asset
//! 2. in-scope exact / app id lookup
//! 3. in-scope wildcard
//! 4. in-scope CIDR (IP assets only)
//! 5. strict subdomain of an in-scope exact domain or app id
//! 6. otherwise denied

use crate::error::ScopeError;
use crate::rule::{ExactKind, RuleCategory, RuleCompiler, ScopeRule};
use crate::snapshot::ScopeSnapshot;
use ipnetwork::IpNetwork;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::IpAddr;
use tracing::{debug, warn};

/// Why an asset was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationReason {
    /// Matched an out-of-scope rule
    Excluded,
    /// Matched an in-scope exact or app-id rule
    ExactMatch,
    /// Matched an in-scope wildcard
    WildcardMatch,
    /// Inside an in-scope network
    CidrMatch,
    /// Strict subdomain of an in-scope domain
    SubdomainOf,
    /// Nothing in scope matched
    NotInScope,
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Excluded => "excluded",
            Self::ExactMatch => "exact match",
            Self::WildcardMatch => "matches in-scope wildcard",
            Self::CidrMatch => "in in-scope network",
            Self::SubdomainOf => "subdomain of in-scope domain",
            Self::NotInScope => "not in any in-scope rule",
        })
    }
}

/// Outcome of validating one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// The asset exactly as passed in
    pub asset: String,
    /// Whether testing the asset is authorized
    pub in_scope: bool,
    /// Which step decided
    pub reason: ValidationReason,
    /// The rule that matched, if any
    pub matched_rule: Option<String>,
}

impl ValidationResult {
    fn decided(asset: &str, in_scope: bool, reason: ValidationReason, rule: &str) -> Self {
        Self {
            asset: asset.to_string(),
            in_scope,
            reason,
            matched_rule: Some(rule.to_string()),
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.in_scope { "✓" } else { "✗" };
        write!(f, "{status} {}: {}", self.asset, self.reason)?;
        if let Some(rule) = &self.matched_rule {
            write!(f, " (matched: {rule})")?;
        }
        Ok(())
    }
}

/// Compiled rules of one category, partitioned by variant.
#[derive(Debug, Default)]
struct RuleSet {
    // value -> kind; ordered so subdomain resolution is deterministic
    exact: BTreeMap<String, ExactKind>,
    app_ids: BTreeSet<String>,
    wildcards: Vec<(String, Regex)>,
    networks: Vec<(String, IpNetwork)>,
}

impl RuleSet {
    fn insert(&mut self, raw: &str, rule: ScopeRule) {
        match rule {
            ScopeRule::Exact { value, kind } => {
                self.exact.insert(value, kind);
            }
            ScopeRule::AppId(value) => {
                self.app_ids.insert(value);
            }
            ScopeRule::Wildcard { pattern, regex } => self.wildcards.push((pattern, regex)),
            ScopeRule::Cidr(network) => self.networks.push((raw.trim().to_string(), network)),
        }
    }

    fn len(&self) -> usize {
        self.exact.len() + self.app_ids.len() + self.wildcards.len() + self.networks.len()
    }

    fn exact_match(&self, asset: &str) -> Option<&str> {
        self.exact
            .get_key_value(asset)
            .map(|(value, _)| value.as_str())
            .or_else(|| self.app_ids.get(asset).map(String::as_str))
    }

    fn wildcard_match(&self, asset: &str) -> Option<&str> {
        self.wildcards
            .iter()
            .find(|(_, regex)| regex.is_match(asset))
            .map(|(pattern, _)| pattern.as_str())
    }

    fn network_match(&self, ip: Option<IpAddr>) -> Option<&str> {
        let ip = ip?;
        self.networks
            .iter()
            .find(|(_, network)| network.contains(ip))
            .map(|(raw, _)| raw.as_str())
    }

    // Most specific parent wins when several domains cover the asset. App ids
    // take part too: a domain under an unlisted TLD compiles as one.
    fn parent_domain(&self, asset: &str) -> Option<&str> {
        self.exact
            .iter()
            .filter(|(_, kind)| **kind == ExactKind::Domain)
            .map(|(domain, _)| domain.as_str())
            .chain(self.app_ids.iter().map(String::as_str))
            .filter(|domain| is_strict_subdomain(asset, domain))
            .max_by_key(|domain| domain.len())
    }
}

fn is_strict_subdomain(asset: &str, domain: &str) -> bool {
    asset.len() > domain.len() + 1
        && asset.ends_with(domain)
        && asset.as_bytes()[asset.len() - domain.len() - 1] == b'.'
}

/// Validates assets against one compiled scope snapshot.
#[derive(Debug)]
pub struct ScopeValidator {
    checksum: String,
    in_scope: RuleSet,
    out_of_scope: RuleSet,
    errors: Vec<ScopeError>,
}

impl ScopeValidator {
    /// Compile `snapshot` with the default compiler.
    #[must_use]
    pub fn new(snapshot: &ScopeSnapshot) -> Self {
        Self::with_compiler(snapshot, &RuleCompiler::new())
    }

    /// Compile `snapshot` with a configured compiler.
    ///
    /// Entries that fail to compile are logged and skipped; the rest of the
    /// rule set stays enforced.
    #[must_use]
    pub fn with_compiler(snapshot: &ScopeSnapshot, compiler: &RuleCompiler) -> Self {
        let mut validator = Self {
            checksum: snapshot.checksum().to_string(),
            in_scope: RuleSet::default(),
            out_of_scope: RuleSet::default(),
            errors: Vec::new(),
        };

        for category in [RuleCategory::InScope, RuleCategory::OutOfScope] {
            for raw in snapshot.items(category) {
                match compiler.compile(raw) {
                    Ok(rule) => {
                        debug!(item = %raw, kind = rule.kind_name(), %category, "compiled scope rule");
                        validator.rules_mut(category).insert(raw, rule);
                    }
                    Err(err) => {
                        warn!(item = %raw, %category, error = %err, "skipping malformed scope entry");
                        validator.errors.push(err);
                    }
                }
            }
        }

        validator
    }

    fn rules_mut(&mut self, category: RuleCategory) -> &mut RuleSet {
        match category {
            RuleCategory::InScope => &mut self.in_scope,
            RuleCategory::OutOfScope => &mut self.out_of_scope,
        }
    }

    /// Checksum of the snapshot this validator was compiled from.
    #[must_use]
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Entries that were skipped during compilation.
    #[must_use]
    pub fn compilation_errors(&self) -> &[ScopeError] {
        &self.errors
    }

    /// Number of compiled rules in a category.
    #[must_use]
    pub fn rule_count(&self, category: RuleCategory) -> usize {
        match category {
            RuleCategory::InScope => self.in_scope.len(),
            RuleCategory::OutOfScope => self.out_of_scope.len(),
        }
    }

    /// Decide whether `asset` is authorized for testing.
    #[must_use]
    pub fn validate(&self, asset: &str) -> ValidationResult {
        let (normalized, ip) = normalize_asset(asset);
        let normalized = normalized.as_str();

        let exclusion = self
            .out_of_scope
            .exact_match(normalized)
            .or_else(|| self.out_of_scope.wildcard_match(normalized))
            .or_else(|| self.out_of_scope.network_match(ip));
        if let Some(rule) = exclusion {
            return ValidationResult::decided(asset, false, ValidationReason::Excluded, rule);
        }

        if let Some(rule) = self.in_scope.exact_match(normalized) {
            return ValidationResult::decided(asset, true, ValidationReason::ExactMatch, rule);
        }
        if let Some(rule) = self.in_scope.wildcard_match(normalized) {
            return ValidationResult::decided(asset, true, ValidationReason::WildcardMatch, rule);
        }
        if let Some(rule) = self.in_scope.network_match(ip) {
            return ValidationResult::decided(asset, true, ValidationReason::CidrMatch, rule);
        }
        if ip.is_none() {
            if let Some(rule) = self.in_scope.parent_domain(normalized) {
                return ValidationResult::decided(asset, true, ValidationReason::SubdomainOf, rule);
            }
        }

        ValidationResult {
            asset: asset.to_string(),
            in_scope: false,
            reason: ValidationReason::NotInScope,
            matched_rule: None,
        }
    }

    /// Validate many assets, preserving input order.
    #[must_use]
    pub fn validate_batch<S: AsRef<str>>(&self, assets: &[S]) -> Vec<ValidationResult> {
        assets.iter().map(|a| self.validate(a.as_ref())).collect()
    }

    /// Assets that are in scope, in input order.
    #[must_use]
    pub fn filter_in_scope<S: AsRef<str>>(&self, assets: &[S]) -> Vec<String> {
        assets
            .iter()
            .map(AsRef::as_ref)
            .filter(|a| self.validate(a).in_scope)
            .map(str::to_string)
            .collect()
    }

    /// Assets that are not in scope, in input order.
    #[must_use]
    pub fn filter_out_scope<S: AsRef<str>>(&self, assets: &[S]) -> Vec<String> {
        assets
            .iter()
            .map(AsRef::as_ref)
            .filter(|a| !self.validate(a).in_scope)
            .map(str::to_string)
            .collect()
    }
}

fn normalize_asset(asset: &str) -> (String, Option<IpAddr>) {
    let trimmed = asset.trim();
    match trimmed.parse::<IpAddr>() {
        Ok(ip) => (ip.to_string(), Some(ip)),
        Err(_) => (trimmed.to_ascii_lowercase(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(in_scope: &[&str], out_of_scope: &[&str]) -> ScopeValidator {
        ScopeValidator::new(&ScopeSnapshot::new(
            in_scope.iter().copied(),
            out_of_scope.iter().copied(),
        ))
    }

    #[test]
    fn test_exclusion_overrides_wildcard() {
        let v = validator(&["*.example.com"], &["admin.example.com"]);

        let result = v.validate("admin.example.com");
        assert!(!result.in_scope);
        assert_eq!(result.reason, ValidationReason::Excluded);
        assert_eq!(result.reason.to_string(), "excluded");
        assert_eq!(result.matched_rule.as_deref(), Some("admin.example.com"));

        assert!(v.validate("api.example.com").in_scope);
    }

    #[test]
    fn test_excluded_wildcard_overrides_exact() {
        let v = validator(&["staging.example.com"], &["staging.*"]);
        assert!(!v.validate("staging.example.com").in_scope);
    }

    #[test]
    fn test_excluded_network_overrides_exact_ip() {
        let v = validator(&["10.0.0.5"], &["10.0.0.0/24"]);
        let result = v.validate("10.0.0.5");
        assert!(!result.in_scope);
        assert_eq!(result.matched_rule.as_deref(), Some("10.0.0.0/24"));
    }

    #[test]
    fn test_excluded_app_id() {
        let v = validator(&["*"], &["com.acme.internal"]);
        assert!(!v.validate("com.acme.internal").in_scope);
        assert!(v.validate("com.acme.android").in_scope);
    }

    #[test]
    fn test_subdomain_inheritance_is_strict_suffix() {
        let v = validator(&["example.com"], &[]);

        let result = v.validate("api.example.com");
        assert!(result.in_scope);
        assert_eq!(result.reason, ValidationReason::SubdomainOf);
        assert_eq!(result.matched_rule.as_deref(), Some("example.com"));

        assert!(v.validate("deep.api.example.com").in_scope);
        assert!(!v.validate("example.com.evil.com").in_scope);
        assert!(!v.validate("notexample.com").in_scope);
        assert_eq!(v.validate("example.com").reason, ValidationReason::ExactMatch);
    }

    #[test]
    fn test_subdomain_prefers_most_specific_parent() {
        let v = validator(&["example.com", "api.example.com"], &[]);
        let result = v.validate("v2.api.example.com");
        assert_eq!(result.matched_rule.as_deref(), Some("api.example.com"));
    }

    #[test]
    fn test_unlisted_tld_domains_still_cover_subdomains() {
        for domain in ["example.ae", "acme.ro", "shop.example.hu", "example.club"] {
            let v = validator(&[domain], &[]);
            let result = v.validate(&format!("api.{domain}"));
            assert!(result.in_scope, "{domain}");
            assert_eq!(result.reason, ValidationReason::SubdomainOf);
            assert_eq!(result.matched_rule.as_deref(), Some(domain));

            assert!(!v.validate(&format!("{domain}.evil.com")).in_scope, "{domain}");
        }
    }

    #[test]
    fn test_ip_exact_rules_do_not_grant_subdomains() {
        let v = validator(&["10.0.0.1"], &[]);
        assert!(!v.validate("a.10.0.0.1").in_scope);
    }

    #[test]
    fn test_cidr_membership() {
        let v = validator(&["10.0.0.0/24"], &[]);
        let result = v.validate("10.0.0.5");
        assert!(result.in_scope);
        assert_eq!(result.reason, ValidationReason::CidrMatch);
        assert!(!v.validate("10.0.1.5").in_scope);
        assert!(!v.validate("example.com").in_scope);
    }

    #[test]
    fn test_case_and_whitespace_normalized() {
        let v = validator(&["Example.COM"], &[]);
        let result = v.validate("  API.example.com ");
        assert!(result.in_scope);
        assert_eq!(result.asset, "  API.example.com ");
    }

    #[test]
    fn test_default_deny() {
        let v = validator(&["example.com"], &[]);
        let result = v.validate("other.org");
        assert!(!result.in_scope);
        assert_eq!(result.reason.to_string(), "not in any in-scope rule");
        assert!(result.matched_rule.is_none());
        assert!(!v.validate("").in_scope);
    }

    #[test]
    fn test_malformed_entries_skipped_not_fatal() {
        let v = validator(&["example.com", "10.0.0.0/99"], &["bad entry"]);
        assert_eq!(v.compilation_errors().len(), 2);
        assert_eq!(v.rule_count(RuleCategory::InScope), 1);
        assert_eq!(v.rule_count(RuleCategory::OutOfScope), 0);
        assert!(v.validate("api.example.com").in_scope);
    }

    #[test]
    fn test_batch_and_filters_preserve_order() {
        let v = validator(&["*.example.com"], &["admin.example.com"]);
        let assets = ["b.example.com", "admin.example.com", "evil.com", "a.example.com"];

        let results = v.validate_batch(&assets);
        let in_scope: Vec<bool> = results.iter().map(|r| r.in_scope).collect();
        assert_eq!(in_scope, vec![true, false, false, true]);

        assert_eq!(v.filter_in_scope(&assets), vec!["b.example.com", "a.example.com"]);
        assert_eq!(v.filter_out_scope(&assets), vec!["admin.example.com", "evil.com"]);
    }

    #[test]
    fn test_bound_to_snapshot_checksum() {
        let snapshot = ScopeSnapshot::new(["example.com"], Vec::<String>::new());
        let v = ScopeValidator::new(&snapshot);
        assert_eq!(v.checksum(), snapshot.checksum());
    }

    #[test]
    fn test_result_display() {
        let v = validator(&["example.com"], &[]);
        assert_eq!(
            v.validate("api.example.com").to_string(),
            "✓ api.example.com: subdomain of in-scope domain (matched: example.com)"
        );
        assert_eq!(
            v.validate("evil.com").to_string(),
            "✗ evil.com: not in any in-scope rule"
        );
    }
}
