#![allow(clippy::doc_markdown)] // README uses "OpenAPI" proper noun throughout
#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! ## API Reference

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod error;
mod report;
mod transform;

/// Default suffix of synthesized union wrappers (`Animal` → `AnimalPolymorphic`).
///
/// Override via [`TransformOptions::wrapper_suffix`] or
/// [`ProjectConfig::wrapper_suffix`].
pub const DEFAULT_WRAPPER_SUFFIX: &str = "Polymorphic";

pub use config::ProjectConfig;
pub use error::{Error, Result};
pub use report::{Report, Warning, WarningKind};
pub use transform::{
    process, transform, transform_with_sink, Format, Processed, TransformOptions,
    DEFAULT_MAX_PASSES,
};

/// Internal helpers for advanced use and testing.
///
/// **Not covered by semver guarantees.** These re-exports are `#[doc(hidden)]`
/// and may change in any release, including patch versions.
#[doc(hidden)]
pub mod internal {
    pub use crate::transform::{schema_name, schema_ref, SchemaNode, SCHEMA_REF_PREFIX};
}
