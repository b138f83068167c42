//! AutoBug Diff - Asset change detection and rescan classification.
//!
//! Repeated probes of the same asset mostly return the same facts. This crate
//! normalizes probe records into snapshots, reports which tracked fields
//! changed since the previous snapshot, and maps those changes to the set of
//! template tags worth rescanning with.
//!
//! # Architecture
//!
//! - **Snapshots** ([`snapshot`]): probe record normalization
//! - **Detector** ([`detector`]): priority-ordered field diffs
//! - **Classifier** ([`classifier`]): first-match rescan policy table
//! - **Tracker** ([`tracker`]): read-diff-write store with change history
//! - **Errors** ([`error`]): diff-specific error types
//!
//! # Example
//!
//! ```rust
//! use autobug_core::{ProgramId, Timestamp};
//! use autobug_diff::{classify, detect, AssetSnapshot, ChangeCategory, RawProbe};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let program = ProgramId::new("acme")?;
//! let probe = |status| RawProbe {
//!     value: Some("admin.acme.com".to_string()),
//!     http_status: Some(status),
//!     ..RawProbe::default()
//! };
//!
//! let before = AssetSnapshot::from_probe(program.clone(), &probe(403), Timestamp::now())?;
//! let after = AssetSnapshot::from_probe(program, &probe(200), Timestamp::now())?;
//!
//! let detection = detect(Some(&before), &after);
//! assert_eq!(detection.category, ChangeCategory::Modified);
//!
//! let directive = classify(&detection);
//! assert!(directive.tags.contains("panels"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod classifier;
pub mod detector;
pub mod error;
pub mod snapshot;
pub mod tracker;

pub use classifier::{classify, tags, ChangeClassifier, PolicyRule, ScanDirective, ScanMode, POLICY};
pub use detector::{detect, ChangeCategory, Detection, FieldChange, FieldDelta, TrackedField};
pub use error::{DiffError, Result, SnapshotValidationError};
pub use snapshot::{compute_response_hash, AssetSnapshot, RawProbe};
pub use tracker::{AssetTracker, Observation};
