//! Document-wide reference index.
//!
//! One pass over the whole document records, for every local schema
//! reference, where it occurs and in which structural context. Built before
//! any mutation; stale afterwards.

use std::collections::{HashMap, HashSet};

use serde_yaml_ng::Value;

use super::helpers::{ref_of, schema_name};
use super::walk::{self, parent_array_key, Flow, Segment};

/// Structural role of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefContext {
    /// Element of an `allOf` array (inheritance).
    AllOf,
    /// Element of an `anyOf` array.
    AnyOf,
    /// Element of a `oneOf` array.
    OneOf,
    /// Anything else: properties, items, request bodies, responses, ...
    Direct,
}

impl RefContext {
    /// Context of a `$ref` node located at `path`.
    pub fn at(path: &[Segment]) -> Self {
        match parent_array_key(path) {
            Some("allOf") => RefContext::AllOf,
            Some("anyOf") => RefContext::AnyOf,
            Some("oneOf") => RefContext::OneOf,
            _ => RefContext::Direct,
        }
    }

    /// Whether this context makes the target "used" as a type in its own right.
    pub fn is_usage(self) -> bool {
        !matches!(self, RefContext::AllOf)
    }
}

/// A single reference occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefSite {
    /// JSON pointer of the `{ $ref }` node.
    pub location: String,
    /// Structural context.
    pub context: RefContext,
}

/// `schema name → every place it is referenced`.
#[derive(Debug, Default)]
pub struct RefIndex {
    sites: HashMap<String, Vec<RefSite>>,
}

impl RefIndex {
    /// Index every local schema reference in the document.
    ///
    /// Discriminator subtrees are not descended into: mapping entries are
    /// metadata, not structural usage.
    pub fn build(doc: &Value) -> Self {
        let mut sites: HashMap<String, Vec<RefSite>> = HashMap::new();

        walk::walk(doc, &mut |path, node| {
            if walk::is_discriminator_keyword(path) {
                return Flow::Skip;
            }
            if let Some(name) = ref_of(node).and_then(schema_name) {
                sites.entry(name.into_owned()).or_default().push(RefSite {
                    location: walk::pointer(path),
                    context: RefContext::at(path),
                });
            }
            Flow::Descend
        });

        Self { sites }
    }

    /// Every recorded site for `name`.
    pub fn sites(&self, name: &str) -> &[RefSite] {
        self.sites.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Names referenced outside `allOf` at least once.
    pub fn used_names(&self) -> HashSet<String> {
        self.sites
            .iter()
            .filter(|(_, sites)| sites.iter().any(|s| s.context.is_usage()))
            .map(|(name, _)| name.clone())
            .collect()
    }
}
