//! Removal of schemas nothing reaches.

use std::borrow::Cow;
use std::collections::HashSet;

use serde_yaml_ng::{Mapping, Value};

use super::helpers::{key_str, mapping_target, ref_of, schema_name, schemas, schemas_mut};
use super::walk::{is_discriminator_keyword, walk, Flow};

/// Delete every schema that is not reachable from a reference outside
/// `components.schemas`. Returns the removed names in document order.
///
/// Documents with no such references are left alone.
pub fn remove_unused_schemas(doc: &mut Value) -> Vec<String> {
    let Some(all) = schemas(doc) else {
        return Vec::new();
    };

    let mut live: HashSet<String> = HashSet::new();
    let mut pending = roots(doc, all);
    if pending.is_empty() {
        tracing::debug!("no references outside components.schemas; skipping unused-schema removal");
        return Vec::new();
    }

    while let Some(name) = pending.pop() {
        if !live.insert(name.clone()) {
            continue;
        }
        if let Some(body) = all.get(name.as_str()) {
            pending.extend(targets(body, all).into_iter().filter(|t| !live.contains(t)));
        }
    }

    let unused: Vec<String> = all
        .keys()
        .filter_map(key_str)
        .filter(|name| !live.contains(&**name))
        .map(Cow::into_owned)
        .collect();

    if let Some(all) = schemas_mut(doc) {
        for name in &unused {
            all.remove(name.as_str());
            tracing::debug!(schema = %name, "removed unused schema");
        }
    }
    unused
}

/// Schema names referenced from everywhere except `components.schemas`.
fn roots(doc: &Value, all: &Mapping) -> Vec<String> {
    let Some(root) = doc.as_mapping() else {
        return Vec::new();
    };

    let mut names = Vec::new();
    for (key, section) in root {
        if key.as_str() == Some("components") {
            let Some(components) = section.as_mapping() else {
                continue;
            };
            for (kind, entries) in components {
                if kind.as_str() != Some("schemas") {
                    names.extend(targets(entries, all));
                }
            }
        } else {
            names.extend(targets(section, all));
        }
    }
    names
}

/// Schema names a subtree points at through `$ref` or discriminator mappings.
fn targets(value: &Value, all: &Mapping) -> Vec<String> {
    let mut names = Vec::new();
    walk(value, &mut |path, node| {
        let in_mapping = path.split_last().is_some_and(|(last, rest)| {
            last.key() == Some("mapping") && is_discriminator_keyword(rest)
        });
        if in_mapping {
            if let Some(mapping) = node.as_mapping() {
                names.extend(mapping.values().filter_map(|v| mapping_target(v, all)));
            }
            return Flow::Skip;
        }
        if let Some(name) = ref_of(node).and_then(schema_name) {
            names.push(name.into_owned());
        }
        Flow::Descend
    });
    names
}
