//! Path-aware traversal over the document tree.
//!
//! Every transform that needs to look at (or rewrite) nodes anywhere in the
//! document goes through [`walk`] / [`walk_mut`] so that traversal order,
//! path bookkeeping, and pruning behave identically everywhere.

use std::fmt::Write as _;

use serde_yaml_ng::Value;

use super::helpers::key_str;

/// One step of a path from the walk root to the current node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Mapping key.
    Key(String),
    /// Sequence index.
    Index(usize),
}

impl Segment {
    /// The key, if this segment is a mapping key.
    pub fn key(&self) -> Option<&str> {
        match self {
            Segment::Key(k) => Some(k),
            Segment::Index(_) => None,
        }
    }
}

/// Visitor decision for the current node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Visit the node's children.
    Descend,
    /// Do not visit the node's children.
    Skip,
}

/// Visit every node depth-first, parents before children.
pub fn walk(value: &Value, visit: &mut impl FnMut(&[Segment], &Value) -> Flow) {
    let mut path = Vec::new();
    walk_inner(value, &mut path, visit);
}

fn walk_inner(
    value: &Value,
    path: &mut Vec<Segment>,
    visit: &mut impl FnMut(&[Segment], &Value) -> Flow,
) {
    if visit(path, value) == Flow::Skip {
        return;
    }
    match value {
        Value::Mapping(map) => {
            for (k, v) in map {
                let Some(key) = key_str(k) else {
                    continue;
                };
                path.push(Segment::Key(key.into_owned()));
                walk_inner(v, path, visit);
                path.pop();
            }
        }
        Value::Sequence(seq) => {
            for (i, item) in seq.iter().enumerate() {
                path.push(Segment::Index(i));
                walk_inner(item, path, visit);
                path.pop();
            }
        }
        Value::Tagged(tagged) => walk_inner(&tagged.value, path, visit),
        _ => {}
    }
}

/// Mutable variant of [`walk`]. The visitor may replace the node in place;
/// children of the replaced node are visited afterwards unless it returns
/// [`Flow::Skip`].
pub fn walk_mut(value: &mut Value, visit: &mut impl FnMut(&[Segment], &mut Value) -> Flow) {
    let mut path = Vec::new();
    walk_mut_inner(value, &mut path, visit);
}

fn walk_mut_inner(
    value: &mut Value,
    path: &mut Vec<Segment>,
    visit: &mut impl FnMut(&[Segment], &mut Value) -> Flow,
) {
    if visit(path, value) == Flow::Skip {
        return;
    }
    match value {
        Value::Mapping(map) => {
            for (k, v) in map.iter_mut() {
                let Some(key) = key_str(k) else {
                    continue;
                };
                path.push(Segment::Key(key.into_owned()));
                walk_mut_inner(v, path, visit);
                path.pop();
            }
        }
        Value::Sequence(seq) => {
            for (i, item) in seq.iter_mut().enumerate() {
                path.push(Segment::Index(i));
                walk_mut_inner(item, path, visit);
                path.pop();
            }
        }
        Value::Tagged(tagged) => walk_mut_inner(&mut tagged.value, path, visit),
        _ => {}
    }
}

/// Render a path as a JSON pointer (`/components/schemas/Pet/allOf/0`).
pub fn pointer(path: &[Segment]) -> String {
    let mut out = String::new();
    for segment in path {
        match segment {
            Segment::Key(k) => {
                out.push('/');
                out.push_str(&k.replace('~', "~0").replace('/', "~1"));
            }
            Segment::Index(i) => {
                let _ = write!(out, "/{i}");
            }
        }
    }
    out
}

/// Maps whose keys are user-chosen names rather than schema keywords.
const NAME_MAPS: &[&str] = &["properties", "patternProperties", "schemas", "$defs", "definitions"];

/// Whether the path ends at a `discriminator` keyword, as opposed to a
/// property or schema that happens to be named `discriminator`.
pub fn is_discriminator_keyword(path: &[Segment]) -> bool {
    match path {
        [.., owner, Segment::Key(k)] if k == "discriminator" => {
            !owner.key().is_some_and(|o| NAME_MAPS.contains(&o))
        }
        [Segment::Key(k)] => k == "discriminator",
        _ => false,
    }
}

/// Whether the path ends inside a composition array: `[.., <keyword>, <index>]`.
pub fn parent_array_key(path: &[Segment]) -> Option<&str> {
    match path {
        [.., Segment::Key(k), Segment::Index(_)] => Some(k),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Segment {
        Segment::Key(s.to_string())
    }

    #[test]
    fn walk_visits_parents_before_children_with_paths() {
        let doc: Value = serde_yaml_ng::from_str("a:\n  - b: 1\n  - 2\n").unwrap();
        let mut seen = Vec::new();
        walk(&doc, &mut |path, _| {
            seen.push(pointer(path));
            Flow::Descend
        });
        assert_eq!(seen, vec!["", "/a", "/a/0", "/a/0/b", "/a/1"]);
    }

    #[test]
    fn skip_prunes_subtree() {
        let doc: Value = serde_yaml_ng::from_str("keep: {x: 1}\nskip: {y: 2}\n").unwrap();
        let mut visited = Vec::new();
        walk(&doc, &mut |path, _| {
            visited.push(pointer(path));
            if path.last().and_then(Segment::key) == Some("skip") {
                Flow::Skip
            } else {
                Flow::Descend
            }
        });
        assert_eq!(visited, vec!["", "/keep", "/keep/x", "/skip"]);
    }

    #[test]
    fn walk_mut_replaces_nodes() {
        let mut doc: Value = serde_yaml_ng::from_str("a: [1, 2]\n").unwrap();
        walk_mut(&mut doc, &mut |_, node| {
            if node.as_u64() == Some(2) {
                *node = Value::Number(20.into());
            }
            Flow::Descend
        });
        assert_eq!(doc["a"][1].as_u64(), Some(20));
    }

    #[test]
    fn pointer_escapes_keys() {
        let path = vec![key("paths"), key("/pets/{id}"), Segment::Index(0)];
        assert_eq!(pointer(&path), "/paths/~1pets~1{id}/0");
        assert_eq!(parent_array_key(&[key("allOf"), Segment::Index(3)]), Some("allOf"));
        assert_eq!(parent_array_key(&[key("items")]), None);
    }

    #[test]
    fn discriminator_keyword_is_told_apart_from_names() {
        assert!(is_discriminator_keyword(&[key("discriminator")]));
        assert!(is_discriminator_keyword(&[
            key("components"),
            key("schemas"),
            key("Pet"),
            key("discriminator"),
        ]));
        assert!(is_discriminator_keyword(&[
            key("oneOf"),
            Segment::Index(0),
            key("discriminator"),
        ]));

        assert!(!is_discriminator_keyword(&[
            key("Rule"),
            key("properties"),
            key("discriminator"),
        ]));
        assert!(!is_discriminator_keyword(&[
            key("components"),
            key("schemas"),
            key("discriminator"),
        ]));
        assert!(!is_discriminator_keyword(&[key("discriminator"), key("mapping")]));
    }
}
