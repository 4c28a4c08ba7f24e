//! Wrapper chaining and discriminator reconciliation.
//!
//! - A wrapper whose union lists another wrapped base points at that base's
//!   wrapper instead, and drops alternatives the nested wrapper already covers.
//!   Mapping entries for dropped alternatives select the covering wrapper.
//! - Pre-existing unions get the same redirection in `oneOf` and in their
//!   discriminator mapping.
//! - Discriminators that no longer select anything are removed.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use serde_yaml_ng::{Mapping, Value};

use super::graph::InheritanceGraph;
use super::helpers::{
    discriminator_mapping, key_str, mapping_target, ref_name, ref_value, schema_ref, val_s,
};
use super::synth::{Decision, Plan, Wrapped};

/// `base name → wrapper name` lookup.
pub struct Wrappers<'a> {
    by_parent: HashMap<&'a str, &'a str>,
}

impl<'a> Wrappers<'a> {
    /// Index the wrappers created in this run.
    pub fn new(wrapped: &'a [Wrapped]) -> Self {
        Self {
            by_parent: wrapped
                .iter()
                .map(|w| (w.parent.as_str(), w.wrapper.as_str()))
                .collect(),
        }
    }

    /// Wrapper of `parent`, if it got one.
    pub fn of(&self, parent: &str) -> Option<&'a str> {
        self.by_parent.get(parent).copied()
    }

    /// Base of `wrapper`, if it is one of the created wrappers.
    pub fn parent_of(&self, wrapper: &str) -> Option<&'a str> {
        self.by_parent
            .iter()
            .find(|(_, w)| **w == wrapper)
            .map(|(p, _)| *p)
    }

    /// Whether `name` is one of the created wrappers.
    pub fn is_wrapper(&self, name: &str) -> bool {
        self.parent_of(name).is_some()
    }
}

/// Redirect nested wrapped bases inside each created wrapper, then drop
/// alternatives a nested wrapper already covers.
pub fn chain_wrappers(schemas: &mut Mapping, wrapped: &[Wrapped], graph: &InheritanceGraph) {
    let wrappers = Wrappers::new(wrapped);

    for w in wrapped {
        let Some(body) = schemas.get(w.wrapper.as_str()).and_then(Value::as_mapping) else {
            continue;
        };
        let mut body = body.clone();
        let changed = redirect_union(&mut body, Some(&w.parent), &wrappers, schemas);
        if changed > 0 {
            tracing::debug!(wrapper = %w.wrapper, changed, "chained nested wrappers");
            schemas.insert(val_s(&w.wrapper), Value::Mapping(body));
        }
    }

    for w in wrapped {
        let covered = covered_by_nested(schemas, &w.wrapper, &wrappers);
        if covered.is_empty() {
            continue;
        }
        let repointed = covering_mapping(schemas, &w.wrapper, &covered, &wrappers, graph);
        let Some(body) = schemas
            .get_mut(w.wrapper.as_str())
            .and_then(Value::as_mapping_mut)
        else {
            continue;
        };

        if let Some(one_of) = body.get_mut("oneOf").and_then(Value::as_sequence_mut) {
            let before = one_of.len();
            one_of.retain(|entry| ref_name(entry).is_none_or(|n| !covered.contains_key(&n)));
            tracing::debug!(
                wrapper = %w.wrapper,
                dropped = before - one_of.len(),
                "dropped alternatives covered by nested wrappers"
            );
        }

        if let Some(mapping) = body
            .get_mut("discriminator")
            .and_then(Value::as_mapping_mut)
            .and_then(|d| d.get_mut("mapping"))
            .and_then(Value::as_mapping_mut)
        {
            for (value, nested) in repointed {
                mapping.insert(value, val_s(&schema_ref(&nested)));
            }
        }
    }
}

/// Mapping entries of `wrapper` whose target was dropped as covered, paired
/// with the nested wrapper that now selects it.
///
/// The nested wrapper of one of the target's ancestors is preferred; any
/// wrapper reaching the target is the fallback.
fn covering_mapping(
    schemas: &Mapping,
    wrapper: &str,
    covered: &HashMap<String, Vec<String>>,
    wrappers: &Wrappers<'_>,
    graph: &InheritanceGraph,
) -> Vec<(Value, String)> {
    let Some(mapping) = schemas
        .get(wrapper)
        .and_then(Value::as_mapping)
        .and_then(discriminator_mapping)
    else {
        return Vec::new();
    };

    mapping
        .iter()
        .filter_map(|(value, target)| {
            let target = mapping_target(target, schemas)?;
            let reaching = covered.get(&target)?;
            let base = wrappers.parent_of(&target).unwrap_or(target.as_str());
            let ancestors = graph.ancestors_of(base);
            let nested = reaching
                .iter()
                .find(|n| wrappers.parent_of(n).is_some_and(|p| ancestors.contains(p)))
                .or_else(|| reaching.first())?;
            Some((value.clone(), nested.clone()))
        })
        .collect()
}

/// Redirect `oneOf` entries and mapping targets of every pre-existing union
/// that names a wrapped base.
pub fn reconcile_existing_unions(schemas: &mut Mapping, wrapped: &[Wrapped]) {
    if wrapped.is_empty() {
        return;
    }
    let wrappers = Wrappers::new(wrapped);

    let names: Vec<String> = schemas
        .iter()
        .filter(|(_, s)| s.as_mapping().is_some_and(|m| m.contains_key("oneOf")))
        .filter_map(|(k, _)| key_str(k).map(Cow::into_owned))
        .filter(|n| !wrappers.is_wrapper(n))
        .collect();

    for name in names {
        let Some(body) = schemas.get(name.as_str()).and_then(Value::as_mapping) else {
            continue;
        };
        let mut body = body.clone();
        if redirect_union(&mut body, None, &wrappers, schemas) > 0 {
            tracing::debug!(schema = %name, "redirected existing union to wrappers");
            schemas.insert(val_s(&name), Value::Mapping(body));
        }
    }
}

/// Rewrite a union body's `oneOf` refs and mapping targets that name a
/// wrapped base (other than `own_parent`). Returns the number of changes.
fn redirect_union(
    body: &mut Mapping,
    own_parent: Option<&str>,
    wrappers: &Wrappers<'_>,
    schemas: &Mapping,
) -> usize {
    let nested = |name: &str| {
        if own_parent == Some(name) {
            None
        } else {
            wrappers.of(name)
        }
    };
    let mut changed = 0;

    if let Some(one_of) = body.get_mut("oneOf").and_then(Value::as_sequence_mut) {
        for entry in one_of.iter_mut() {
            if let Some(wrapper) = ref_name(entry).as_deref().and_then(nested) {
                *entry = ref_value(&schema_ref(wrapper));
                changed += 1;
            }
        }
        dedup(one_of);
    }

    if let Some(mapping) = body
        .get_mut("discriminator")
        .and_then(Value::as_mapping_mut)
        .and_then(|d| d.get_mut("mapping"))
        .and_then(Value::as_mapping_mut)
    {
        for (_, target) in mapping.iter_mut() {
            if let Some(wrapper) = mapping_target(target, schemas).as_deref().and_then(nested) {
                *target = val_s(&schema_ref(wrapper));
                changed += 1;
            }
        }
    }

    changed
}

/// Names reachable through the nested wrappers listed in `wrapper`'s union,
/// each with the listed wrappers that reach it.
fn covered_by_nested(
    schemas: &Mapping,
    wrapper: &str,
    wrappers: &Wrappers<'_>,
) -> HashMap<String, Vec<String>> {
    let entries = union_refs(schemas, wrapper);
    let mut covered: HashMap<String, Vec<String>> = HashMap::new();

    for nested in entries.iter().filter(|n| wrappers.is_wrapper(n)) {
        let mut stack = vec![nested.clone()];
        let mut seen = HashSet::from([wrapper.to_string(), nested.clone()]);
        while let Some(current) = stack.pop() {
            for inner in union_refs(schemas, &current) {
                if !seen.insert(inner.clone()) {
                    continue;
                }
                covered.entry(inner.clone()).or_default().push(nested.clone());
                if wrappers.is_wrapper(&inner) {
                    stack.push(inner);
                }
            }
        }
    }

    covered
}

fn union_refs(schemas: &Mapping, name: &str) -> Vec<String> {
    schemas
        .get(name)
        .and_then(Value::as_mapping)
        .and_then(|b| b.get("oneOf"))
        .and_then(Value::as_sequence)
        .map(|seq| seq.iter().filter_map(ref_name).collect())
        .unwrap_or_default()
}

/// Keep the first occurrence of each entry.
pub fn dedup(entries: &mut Vec<Value>) {
    let mut kept: Vec<Value> = Vec::with_capacity(entries.len());
    for entry in entries.drain(..) {
        if !kept.contains(&entry) {
            kept.push(entry);
        }
    }
    *entries = kept;
}

/// Remove discriminators made obsolete by this run and return the schema names.
///
/// Removed from every wrapped base, and from every other discriminator owner
/// that is only inherited from while it still has children: either a
/// candidate with at least one proper child, or any owner with a mapped
/// child that received its own wrapper. A candidate whose lone child is kept
/// unwrapped by `ignore_single` keeps its discriminator.
pub fn strip_discriminators(
    schemas: &mut Mapping,
    plans: &[Plan],
    decision: &Decision,
    wrapped: &[Wrapped],
    ignore_single: bool,
) -> Vec<String> {
    let wrappers = Wrappers::new(wrapped);
    let candidates_with_children: HashSet<&str> = plans
        .iter()
        .filter(|p| p.proper_children().next().is_some() && p.forms_union(ignore_single))
        .map(|p| p.candidate.name.as_str())
        .collect();

    let mut stale = Vec::new();
    for (name, schema) in schemas.iter() {
        let Some(name) = key_str(name) else {
            continue;
        };
        let Some(body) = schema.as_mapping() else {
            continue;
        };
        if !body.contains_key("discriminator")
            || body.contains_key("oneOf")
            || wrappers.is_wrapper(&name)
        {
            continue;
        }

        let obsolete = if wrappers.of(&name).is_some() {
            true
        } else if decision.used.contains(&*name) {
            false
        } else {
            candidates_with_children.contains(&*name)
                || discriminator_mapping(body).is_some_and(|m| {
                    m.values()
                        .filter_map(|v| mapping_target(v, schemas))
                        .any(|child| wrappers.of(&child).is_some())
                })
        };
        if obsolete {
            stale.push(name.into_owned());
        }
    }

    for name in &stale {
        if let Some(body) = schemas.get_mut(name.as_str()).and_then(Value::as_mapping_mut) {
            body.remove("discriminator");
            tracing::debug!(schema = %name, "removed obsolete discriminator");
        }
    }

    stale
}
