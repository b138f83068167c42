//! AutoBug Core - Foundation crate for the AutoBug reconnaissance engine.
//!
//! This crate provides shared types, error handling, configuration management,
//! and logging bootstrap that the scope and diff crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared newtypes and enums (`ProgramId`, `Platform`, `Timestamp`)
//! - [`logging`] - `tracing-subscriber` initialization
//!
//! # Example
//!
//! ```rust
//! use autobug_core::{AppConfig, ProgramId};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! assert!(!config.diff.force_rescan);
//!
//! let program = ProgramId::new("acme-corp")?;
//! assert_eq!(program.as_str(), "acme-corp");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, DiffConfig, GeneralConfig, ScopeConfig};
pub use error::{AutobugError, ConfigError, ConfigResult, Result};
pub use logging::init_tracing;
pub use types::{Platform, ProgramId, Timestamp};
