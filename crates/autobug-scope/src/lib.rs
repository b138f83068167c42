//! AutoBug Scope - Scope rule compilation, validation and snapshot diffing.
//!
//! A program's scope is a pair of rule lists: what may be tested and what is
//! explicitly excluded. This crate compiles those lists into typed rules,
//! decides whether an asset is authorized, and reports how a program's scope
//! changed between two snapshots.
//!
//! # Architecture
//!
//! - **Rules** ([`rule`]): raw entries resolved once into wildcard, network,
//!   IP, app-id or domain rules
//! - **Snapshots** ([`snapshot`]): deduplicated rule lists with a canonical checksum
//! - **Validator** ([`validator`]): exclusion-first scope decisions
//! - **Comparator** ([`comparator`]): additions, removals and reclassifications
//! - **Parsers** ([`parser`], [`registry`]): platform-specific entry cleanup
//! - **Tracker** ([`tracker`]): latest snapshot per program
//!
//! # Example
//!
//! ```rust
//! use autobug_scope::{compare, ScopeSnapshot, ScopeValidator};
//!
//! let previous = ScopeSnapshot::new(["*.acme.com"], ["admin.acme.com"]);
//! let validator = ScopeValidator::new(&previous);
//!
//! assert!(validator.validate("api.acme.com").in_scope);
//! assert!(!validator.validate("admin.acme.com").in_scope);
//!
//! let current = ScopeSnapshot::new(["*.acme.com", "admin.acme.com"], Vec::<String>::new());
//! let comparison = compare(&previous, &current);
//! assert_eq!(comparison.summary(), "1 modified");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod comparator;
pub mod error;
pub mod parser;
pub mod registry;
pub mod rule;
pub mod snapshot;
pub mod tracker;
pub mod validator;

pub use comparator::{compare, ScopeChange, ScopeChangeType, ScopeComparator, ScopeComparison};
pub use error::{Result, ScopeError};
pub use parser::{
    normalize_scope_item, BugcrowdParser, HackerOneParser, ParsedScopeItem, PlatformParser,
    ScopeItemKind,
};
pub use registry::ParserRegistry;
pub use rule::{compile, ExactKind, RuleCategory, RuleCompiler, ScopeRule};
pub use snapshot::ScopeSnapshot;
pub use tracker::ScopeTracker;
pub use validator::{ScopeValidator, ValidationReason, ValidationResult};
