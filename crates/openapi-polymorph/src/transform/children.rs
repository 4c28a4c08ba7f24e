//! Classification of a candidate's mapped children.
//!
//! - **valid**: inherits from the candidate (or is the candidate itself) and
//!   belongs in its union
//! - **not inherited**: stays in the mapping, left out of the union, warned about
//! - **unresolvable**: malformed or missing target, ignored and warned about

use serde_yaml_ng::Mapping;

use crate::report::{Warning, WarningKind};

use super::graph::InheritanceGraph;
use super::helpers::{mapping_target, schema_name};
use super::parents::{entries, Candidate};
use super::walk::{pointer, Segment};

/// A mapped child that belongs in the candidate's union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidChild {
    /// Schema name.
    pub name: String,
    /// First discriminator value mapped to it.
    pub value: String,
}

/// Split a candidate's mapping into valid children (mapping order, no
/// duplicates) and warnings.
pub fn classify(
    candidate: &Candidate,
    schemas: &Mapping,
    graph: &InheritanceGraph,
) -> (Vec<ValidChild>, Vec<Warning>) {
    let mut valid: Vec<ValidChild> = Vec::new();
    let mut warnings = Vec::new();
    let parent = candidate.name.as_str();

    for (value, target) in entries(&candidate.mapping) {
        let location = pointer(&[
            Segment::Key("components".into()),
            Segment::Key("schemas".into()),
            Segment::Key(parent.into()),
            Segment::Key("discriminator".into()),
            Segment::Key("mapping".into()),
            Segment::Key(value.clone()),
        ]);

        let Some(child) = mapping_target(target, schemas) else {
            let raw = target.as_str().unwrap_or_default();
            let (kind, message) = match missing_name(raw) {
                Some(missing) => (
                    WarningKind::MissingMappingTarget {
                        value: value.clone(),
                        target: missing.to_string(),
                    },
                    format!(
                        "mapping value '{value}' of '{parent}' points at missing schema '{missing}'; ignored"
                    ),
                ),
                None => (
                    WarningKind::MalformedMappingRef {
                        value: value.clone(),
                    },
                    format!(
                        "mapping value '{value}' of '{parent}' is not a local schema reference; ignored"
                    ),
                ),
            };
            warnings.push(Warning {
                schema: parent.to_string(),
                location,
                kind,
                message,
            });
            continue;
        };

        if !schemas.contains_key(child.as_str()) {
            warnings.push(Warning {
                schema: parent.to_string(),
                location,
                message: format!(
                    "mapping value '{value}' of '{parent}' points at missing schema '{child}'; ignored"
                ),
                kind: WarningKind::MissingMappingTarget {
                    value,
                    target: child,
                },
            });
            continue;
        }

        if child != parent && !graph.inherits_from(&child, parent) {
            warnings.push(Warning {
                schema: parent.to_string(),
                location,
                message: format!(
                    "'{child}' (mapping value '{value}') does not inherit from '{parent}'; \
                     kept in mapping, excluded from the union"
                ),
                kind: WarningKind::NotInherited { value, child },
            });
            continue;
        }

        if !valid.iter().any(|v| v.name == child) {
            valid.push(ValidChild { name: child, value });
        }
    }

    (valid, warnings)
}

/// Name a mapping value was meant to point at, when it is recognisably a
/// schema reference at all.
fn missing_name(raw: &str) -> Option<String> {
    if raw.starts_with('#') {
        return schema_name(raw).map(|n| n.into_owned());
    }
    (!raw.is_empty() && !raw.contains('/')).then(|| raw.to_string())
}
