//! Typed view over a schema node.
//!
//! Schema bodies stay plain YAML values; [`SchemaNode::classify`] gives the
//! shapes the engine cares about a name so decisions are pattern matches.

use serde_yaml_ng::{Mapping, Value};

/// Keys a pure union may carry.
const PURE_UNION_KEYS: &[&str] = &["oneOf", "discriminator", "description"];

/// Shape of a schema node.
#[derive(Debug, Clone, Copy)]
pub enum SchemaNode<'a> {
    /// `{ $ref: ... }`.
    Reference(&'a str),
    /// Only `oneOf` (non-empty), optionally `discriminator` and `description`.
    PureUnion {
        /// The union alternatives.
        one_of: &'a [Value],
        /// The union's discriminator, if any.
        discriminator: Option<&'a Mapping>,
    },
    /// A `oneOf` alongside other keywords.
    Union {
        /// The union alternatives.
        one_of: &'a [Value],
        /// The whole schema body.
        body: &'a Mapping,
    },
    /// A schema with `allOf` and/or `anyOf` but no `oneOf`.
    Composition(&'a Mapping),
    /// Any other mapping.
    Object(&'a Mapping),
    /// Scalars and sequences.
    Other,
}

impl<'a> SchemaNode<'a> {
    /// Classify a node.
    pub fn classify(value: &'a Value) -> Self {
        let Some(map) = value.as_mapping() else {
            return SchemaNode::Other;
        };

        if let Some(target) = map.get("$ref").and_then(Value::as_str) {
            return SchemaNode::Reference(target);
        }

        if let Some(one_of) = map.get("oneOf").and_then(Value::as_sequence) {
            let pure = !one_of.is_empty()
                && map
                    .keys()
                    .all(|k| k.as_str().is_some_and(|k| PURE_UNION_KEYS.contains(&k)));
            return if pure {
                SchemaNode::PureUnion {
                    one_of,
                    discriminator: map.get("discriminator").and_then(Value::as_mapping),
                }
            } else {
                SchemaNode::Union { one_of, body: map }
            };
        }

        if map.contains_key("allOf") || map.contains_key("anyOf") {
            return SchemaNode::Composition(map);
        }

        SchemaNode::Object(map)
    }

    /// Whether the node is a pure union.
    pub fn is_pure_union(&self) -> bool {
        matches!(self, SchemaNode::PureUnion { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(yaml: &str) -> String {
        let value: Value = serde_yaml_ng::from_str(yaml).unwrap();
        match SchemaNode::classify(&value) {
            SchemaNode::Reference(_) => "ref",
            SchemaNode::PureUnion { .. } => "pure",
            SchemaNode::Union { .. } => "union",
            SchemaNode::Composition(_) => "composition",
            SchemaNode::Object(_) => "object",
            SchemaNode::Other => "other",
        }
        .to_string()
    }

    #[test]
    fn pure_union_allows_only_one_of_discriminator_description() {
        assert_eq!(
            classify("oneOf: [{$ref: '#/components/schemas/A'}]\ndescription: x\ndiscriminator: {propertyName: k}"),
            "pure"
        );
        assert_eq!(classify("oneOf: [{type: string}]\ntype: object"), "union");
        assert_eq!(classify("oneOf: []"), "union");
        assert_eq!(classify("oneOf: [{type: string}]\nnullable: true"), "union");
    }

    #[test]
    fn other_shapes() {
        assert_eq!(classify("$ref: '#/components/schemas/A'"), "ref");
        assert_eq!(classify("allOf: [{type: object}]"), "composition");
        assert_eq!(classify("type: object"), "object");
        assert_eq!(classify("[1, 2]"), "other");
    }
}
