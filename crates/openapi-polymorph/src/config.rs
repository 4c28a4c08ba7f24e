//! Project-level transform configuration loaded from YAML.
//!
//! Keeps the polymorphism knobs next to the `OpenAPI` document instead of
//! repeating them as CLI flags in every build script.
//!
//! # File format
//!
//! ```yaml
//! # api/openapi/polymorph.yaml
//!
//! # Suffix appended to a base schema name to name its union wrapper.
//! wrapper_suffix: Polymorphic
//!
//! # Tag each concrete child with a `const` discriminator constraint.
//! add_discriminator_const: true
//!
//! # Do not wrap a base schema that has exactly one specialization.
//! ignore_single_specialization: false
//!
//! # Inline referenced pure unions into their referring union.
//! merge_nested_one_of: false
//!
//! # Drop schemas nothing references once the rewrite is done.
//! remove_unused_schemas: false
//! ```

use std::path::Path;

use serde::Deserialize;

/// Project-level transform config.
///
/// Loaded from a YAML file via [`ProjectConfig::load`], then applied to
/// [`TransformOptions`](crate::TransformOptions) via
/// [`TransformOptions::with_project_config`](crate::TransformOptions::with_project_config).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ProjectConfig {
    /// Suffix for synthesized union wrappers (`Animal` → `AnimalPolymorphic`).
    pub wrapper_suffix: String,

    /// Add `const` discriminator constraints to concrete children.
    pub add_discriminator_const: bool,

    /// Skip base schemas with exactly one valid specialization.
    pub ignore_single_specialization: bool,

    /// Inline referenced pure-union schemas into the referring union.
    pub merge_nested_one_of: bool,

    /// Remove component schemas that are unreachable after the rewrite.
    pub remove_unused_schemas: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            wrapper_suffix: crate::DEFAULT_WRAPPER_SUFFIX.to_string(),
            add_discriminator_const: true,
            ignore_single_specialization: false,
            merge_nested_one_of: false,
            remove_unused_schemas: false,
        }
    }
}

impl ProjectConfig {
    /// Load config from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }
}
