//! `allOf` + `discriminator` → `oneOf` + `discriminator` rewrite engine.
//!
//! The engine runs as a fixed sequence of stages over one document:
//! - [`parents`] finds base schemas whose discriminator selects between alternatives
//! - [`graph`] and [`index`] capture inheritance edges and reference sites
//! - [`children`] sorts each base's mapped children into valid and warned
//! - [`synth`] settles wrapper eligibility and creates wrappers and helpers
//! - [`rewrite`] points usages of wrapped bases at their wrappers
//! - [`chain`] links nested wrappers and drops obsolete discriminators
//! - [`merge`] (optional) inlines nested pure unions
//! - [`prune`] (optional) removes schemas nothing reaches
//!
//! Everything read from the original document (graph, index, candidates,
//! classification, eligibility) is computed before the first mutation.

mod chain;
mod children;
mod graph;
mod helpers;
mod index;
mod merge;
mod node;
mod parents;
mod prune;
mod rewrite;
mod synth;
mod walk;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde_yaml_ng::Value;

use crate::error;
use crate::report::{Report, Warning};

use self::graph::InheritanceGraph;
use self::index::RefIndex;
use self::synth::Plan;

pub use self::helpers::{schema_name, schema_ref, SCHEMA_REF_PREFIX};
pub use self::node::SchemaNode;

/// Configuration for the polymorphism rewrite.
///
/// Construct with [`TransformOptions::new`] and configure via
/// [`with_project_config`](Self::with_project_config) (file-based) or
/// individual builder methods (programmatic).
///
/// # Example
///
/// ```
/// use openapi_polymorph::TransformOptions;
///
/// let options = TransformOptions::new()
///     .wrapper_suffix("Union")
///     .ignore_single_specialization(true)
///     .merge_nested_one_of(true);
/// ```
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct TransformOptions {
    /// Tag concrete children with a `const` discriminator constraint.
    add_discriminator_const: bool,

    /// Do not wrap a base with exactly one valid child.
    ignore_single_specialization: bool,

    /// Inline referenced pure unions after the rewrite.
    merge_nested_one_of: bool,

    /// Suffix appended to a base name to name its wrapper.
    wrapper_suffix: String,

    /// Remove unreachable schemas after the rewrite.
    remove_unused_schemas: bool,

    /// Upper bound on eligibility passes.
    max_passes: usize,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            add_discriminator_const: true,
            ignore_single_specialization: false,
            merge_nested_one_of: false,
            wrapper_suffix: crate::DEFAULT_WRAPPER_SUFFIX.to_string(),
            remove_unused_schemas: false,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

/// Default cap on eligibility passes.
pub const DEFAULT_MAX_PASSES: usize = 16;

impl TransformOptions {
    /// Options with every default: `const` tags on, single specializations
    /// wrapped, no merging, no pruning, `Polymorphic` suffix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply settings from a [`ProjectConfig`](crate::ProjectConfig).
    ///
    /// Builder methods called after this override config values.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let project = ProjectConfig::load(Path::new("polymorph.yaml"))?;
    /// let options = TransformOptions::new().with_project_config(&project);
    /// ```
    #[must_use]
    pub fn with_project_config(mut self, project: &crate::ProjectConfig) -> Self {
        self.wrapper_suffix.clone_from(&project.wrapper_suffix);
        self.add_discriminator_const = project.add_discriminator_const;
        self.ignore_single_specialization = project.ignore_single_specialization;
        self.merge_nested_one_of = project.merge_nested_one_of;
        self.remove_unused_schemas = project.remove_unused_schemas;
        self
    }

    /// Enable or disable `const` tagging of concrete children.
    #[must_use]
    pub fn add_discriminator_const(mut self, enabled: bool) -> Self {
        self.add_discriminator_const = enabled;
        self
    }

    /// Skip bases with exactly one valid specialization.
    #[must_use]
    pub fn ignore_single_specialization(mut self, enabled: bool) -> Self {
        self.ignore_single_specialization = enabled;
        self
    }

    /// Enable or disable inlining of nested pure unions.
    #[must_use]
    pub fn merge_nested_one_of(mut self, enabled: bool) -> Self {
        self.merge_nested_one_of = enabled;
        self
    }

    /// Set the wrapper name suffix.
    #[must_use]
    pub fn wrapper_suffix(mut self, suffix: &str) -> Self {
        self.wrapper_suffix = suffix.to_string();
        self
    }

    /// Enable or disable removal of unreachable schemas.
    #[must_use]
    pub fn remove_unused_schemas(mut self, enabled: bool) -> Self {
        self.remove_unused_schemas = enabled;
        self
    }

    /// Cap the number of eligibility passes (at least one pass always runs).
    #[must_use]
    pub fn max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes.max(1);
        self
    }

    /// Skip `const` tagging.
    #[must_use]
    pub fn skip_const(self) -> Self {
        self.add_discriminator_const(false)
    }

    /// The configured wrapper suffix.
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.wrapper_suffix
    }
}

/// Rewrite discriminator inheritance in `doc` into union wrappers.
///
/// The document is modified in place. Warnings are logged through `tracing`
/// and collected in the returned [`Report`]. Documents without
/// `components.schemas` are left untouched.
pub fn transform(doc: &mut Value, options: &TransformOptions) -> Report {
    transform_with_sink(doc, options, &mut |_| {})
}

/// Like [`transform`], handing every warning to `sink` as soon as it is found.
///
/// # Example
///
/// ```
/// use openapi_polymorph::{transform_with_sink, TransformOptions};
///
/// let mut doc: serde_yaml_ng::Value = serde_yaml_ng::from_str("openapi: 3.1.0").unwrap();
/// let mut seen = Vec::new();
/// let report = transform_with_sink(&mut doc, &TransformOptions::new(), &mut |w| {
///     seen.push(w.to_string());
/// });
/// assert!(report.is_clean());
/// assert!(seen.is_empty());
/// ```
pub fn transform_with_sink(
    doc: &mut Value,
    options: &TransformOptions,
    sink: &mut dyn FnMut(&Warning),
) -> Report {
    let mut report = Report::default();

    let Some(schemas) = helpers::schemas(doc).filter(|s| !s.is_empty()) else {
        tracing::debug!("no components.schemas; nothing to rewrite");
        return report;
    };

    // Read phase: everything below looks at the untouched document.
    let graph = InheritanceGraph::build(schemas);
    let index = RefIndex::build(doc);
    let candidates = parents::discover(schemas);
    tracing::debug!(count = candidates.len(), "discriminator candidates found");

    let mut plans = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let (children, warnings) = children::classify(&candidate, schemas, &graph);
        for warning in warnings {
            tracing::warn!(schema = %warning.schema, location = %warning.location, "{}", warning.message);
            sink(&warning);
            report.warnings.push(warning);
        }
        plans.push(Plan {
            candidate,
            children,
        });
    }

    let decision = synth::decide(&plans, &index, options);
    for plan in &plans {
        tracing::debug!(
            schema = %plan.candidate.name,
            children = plan.children.len(),
            eligible = decision.eligible.contains(&plan.candidate.name),
            "eligibility settled"
        );
    }

    // Write phase.
    let wrapped = match helpers::schemas_mut(doc) {
        Some(schemas) => synth::synthesize(schemas, &plans, &decision, options, &mut report.created),
        None => Vec::new(),
    };

    let redirects: HashMap<String, String> = wrapped
        .iter()
        .map(|w| (schema_ref(&w.parent), schema_ref(&w.wrapper)))
        .collect();
    let created: HashSet<String> = report.created.iter().cloned().collect();
    rewrite::rewrite_references(doc, &redirects, &created);

    if let Some(schemas) = helpers::schemas_mut(doc) {
        chain::chain_wrappers(schemas, &wrapped, &graph);
        chain::reconcile_existing_unions(schemas, &wrapped);
        report.stripped_discriminators =
            chain::strip_discriminators(
                schemas,
                &plans,
                &decision,
                &wrapped,
                options.ignore_single_specialization,
            );

        if options.merge_nested_one_of {
            let merged = merge::merge_nested_unions(schemas);
            tracing::debug!(merged, "nested unions merged");
        }
    }

    if options.remove_unused_schemas {
        report.removed = prune::remove_unused_schemas(doc);
    }

    tracing::debug!(
        created = report.created.len(),
        removed = report.removed.len(),
        warnings = report.warnings.len(),
        "polymorphism rewrite finished"
    );
    report
}

/// Serialization format of [`process`] output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// YAML.
    #[default]
    Yaml,
    /// Pretty-printed JSON.
    Json,
}

impl Format {
    /// Infer the format from a file extension (`.yaml`, `.yml`, `.json`).
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Output of [`process`].
#[derive(Debug, Clone)]
pub struct Processed {
    /// The serialized, transformed document.
    pub output: String,
    /// What the transform did.
    pub report: Report,
}

/// Parse `input` (YAML or JSON), transform it, and serialize it as `format`.
///
/// # Errors
///
/// Returns an error if the input cannot be parsed or the result cannot be
/// serialized (JSON output requires string mapping keys).
pub fn process(input: &str, options: &TransformOptions, format: Format) -> error::Result<Processed> {
    let mut doc: Value = serde_yaml_ng::from_str(input)?;
    let report = transform(&mut doc, options);

    let output = match format {
        Format::Yaml => serde_yaml_ng::to_string(&doc)?,
        Format::Json => {
            let mut json = serde_json::to_string_pretty(&doc)?;
            json.push('\n');
            json
        }
    };

    Ok(Processed { output, report })
}
