//! Inheritance graph over `components.schemas`.
//!
//! An edge `child → parent` exists when `parent` is referenced directly
//! inside `child.allOf`. References nested deeper (e.g. an `allOf` member's
//! properties) do not count. Diamonds are allowed; cycles are tolerated.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use serde_yaml_ng::{Mapping, Value};

use super::helpers::{key_str, ref_name};

/// Direct edges in both directions and the descendant closure.
#[derive(Debug, Default)]
pub struct InheritanceGraph {
    children: HashMap<String, BTreeSet<String>>,
    parents: HashMap<String, BTreeSet<String>>,
    descendants: HashMap<String, HashSet<String>>,
}

impl InheritanceGraph {
    /// Scan every schema's `allOf` for local references.
    pub fn build(schemas: &Mapping) -> Self {
        let mut graph = Self::default();

        for (name, schema) in schemas {
            let Some(name) = key_str(name) else {
                continue;
            };
            let Some(all_of) = schema
                .as_mapping()
                .and_then(|s| s.get("allOf"))
                .and_then(Value::as_sequence)
            else {
                continue;
            };

            for parent in all_of.iter().filter_map(ref_name) {
                graph
                    .children
                    .entry(parent.clone())
                    .or_default()
                    .insert(name.to_string());
                graph
                    .parents
                    .entry(name.to_string())
                    .or_default()
                    .insert(parent);
            }
        }

        let parents: Vec<String> = graph.children.keys().cloned().collect();
        for parent in parents {
            let closure = closure(&graph.children, &parent);
            graph.descendants.insert(parent, closure);
        }

        graph
    }

    /// Every schema that transitively inherits from `name` (excluding
    /// `name` itself unless it sits on a cycle).
    pub fn descendants_of(&self, name: &str) -> Option<&HashSet<String>> {
        self.descendants.get(name)
    }

    /// Every schema `name` transitively inherits from, following its own
    /// `allOf` upwards (excluding `name` itself unless it sits on a cycle).
    pub fn ancestors_of(&self, name: &str) -> HashSet<String> {
        closure(&self.parents, name)
    }

    /// Whether `child` transitively inherits from `parent`.
    pub fn inherits_from(&self, child: &str, parent: &str) -> bool {
        self.descendants_of(parent).is_some_and(|d| d.contains(child))
    }
}

/// Breadth-first walk along `edges`, cycle-safe.
fn closure(edges: &HashMap<String, BTreeSet<String>>, start: &str) -> HashSet<String> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([start]);

    while let Some(current) = queue.pop_front() {
        let Some(next) = edges.get(current) else {
            continue;
        };
        for node in next {
            if seen.insert(node.clone()) {
                queue.push_back(node.as_str());
            }
        }
    }

    seen
}
