//! Inline referenced pure unions into the unions that list them.

use std::borrow::Cow;
use std::collections::HashSet;

use serde_yaml_ng::{Mapping, Value};

use super::chain::dedup;
use super::helpers::{
    discriminator_mapping, discriminator_property, key_str, mapping_target, ref_name, val_s,
};
use super::node::SchemaNode;

/// Splice every compatible pure union referenced from a `oneOf` into its
/// referrer. Returns the number of splices.
///
/// Unions with different discriminator properties are never merged. The
/// nested mapping is folded into the outer one only when the outer union has
/// a discriminator; outer entries win on collision, except entries that
/// selected the inlined union itself.
pub fn merge_nested_unions(schemas: &mut Mapping) -> usize {
    let owners: Vec<String> = schemas
        .iter()
        .filter(|(_, s)| s.as_mapping().is_some_and(|m| m.contains_key("oneOf")))
        .filter_map(|(k, _)| key_str(k).map(Cow::into_owned))
        .collect();

    let mut merged = 0;
    for owner in owners {
        let mut visited = HashSet::from([owner.clone()]);
        while let Some(splice) = next_splice(schemas, &owner, &visited) {
            visited.insert(splice.target.clone());
            apply(schemas, &owner, splice);
            merged += 1;
        }
    }
    merged
}

struct Splice {
    index: usize,
    target: String,
    entries: Vec<Value>,
    mapping: Option<Mapping>,
    /// Outer mapping keys that selected the inlined union.
    repoint: Vec<Value>,
}

fn next_splice(schemas: &Mapping, owner: &str, visited: &HashSet<String>) -> Option<Splice> {
    let body = schemas.get(owner)?.as_mapping()?;
    let outer_property = discriminator_property(body);
    let one_of = body.get("oneOf")?.as_sequence()?;

    one_of.iter().enumerate().find_map(|(index, entry)| {
        let target = ref_name(entry)?;
        if visited.contains(&target) {
            return None;
        }
        let SchemaNode::PureUnion {
            one_of: entries,
            discriminator,
        } = SchemaNode::classify(schemas.get(target.as_str())?)
        else {
            return None;
        };

        let inner_property = discriminator
            .and_then(|d| d.get("propertyName"))
            .and_then(Value::as_str);
        if let (Some(outer), Some(inner)) = (outer_property, inner_property) {
            if outer != inner {
                tracing::debug!(
                    schema = owner,
                    nested = %target,
                    "discriminator properties differ; not merging"
                );
                return None;
            }
        }

        let repoint = discriminator_mapping(body)
            .map(|outer| {
                outer
                    .iter()
                    .filter(|(_, v)| mapping_target(v, schemas).as_deref() == Some(target.as_str()))
                    .map(|(k, _)| k.clone())
                    .collect()
            })
            .unwrap_or_default();

        Some(Splice {
            index,
            repoint,
            target,
            entries: entries.to_vec(),
            mapping: discriminator
                .and_then(|d| d.get("mapping"))
                .and_then(Value::as_mapping)
                .cloned(),
        })
    })
}

fn apply(schemas: &mut Mapping, owner: &str, splice: Splice) {
    let Some(body) = schemas.get_mut(owner).and_then(Value::as_mapping_mut) else {
        return;
    };

    if let Some(one_of) = body.get_mut("oneOf").and_then(Value::as_sequence_mut) {
        one_of.splice(splice.index..=splice.index, splice.entries);
        dedup(one_of);
    }

    if let (Some(nested), Some(discriminator)) = (
        splice.mapping,
        body.get_mut("discriminator").and_then(Value::as_mapping_mut),
    ) {
        if !discriminator.contains_key("mapping") {
            discriminator.insert(val_s("mapping"), Value::Mapping(Mapping::new()));
        }
        if let Some(mapping) = discriminator.get_mut("mapping").and_then(Value::as_mapping_mut) {
            for (value, target) in nested {
                if !mapping.contains_key(&value) || splice.repoint.contains(&value) {
                    mapping.insert(value, target);
                }
            }
        }
    }

    tracing::debug!(schema = owner, nested = %splice.target, "merged nested union");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn refs(schemas: &Mapping, name: &str) -> Vec<String> {
        schemas[name]["oneOf"]
            .as_sequence()
            .unwrap()
            .iter()
            .filter_map(ref_name)
            .collect()
    }

    #[test]
    fn splices_compatible_pure_union() {
        let mut schemas: Mapping = serde_yaml_ng::from_str(
            "
Vehicle:
  oneOf:
    - $ref: '#/components/schemas/Car'
    - $ref: '#/components/schemas/Boats'
  discriminator:
    propertyName: kind
    mapping:
      car: '#/components/schemas/Car'
      yacht: '#/components/schemas/Car'
Boats:
  description: Anything that floats
  oneOf:
    - $ref: '#/components/schemas/Yacht'
    - $ref: '#/components/schemas/Car'
  discriminator:
    propertyName: kind
    mapping:
      yacht: '#/components/schemas/Yacht'
      canoe: '#/components/schemas/Canoe'
Car: {}
Yacht: {}
",
        )
        .unwrap();

        assert_eq!(merge_nested_unions(&mut schemas), 1);
        assert_eq!(refs(&schemas, "Vehicle"), vec!["Car", "Yacht"]);

        let mapping = &schemas["Vehicle"]["discriminator"]["mapping"];
        // outer wins on collision
        assert_eq!(mapping["yacht"].as_str(), Some("#/components/schemas/Car"));
        assert_eq!(
            mapping["canoe"].as_str(),
            Some("#/components/schemas/Canoe")
        );
    }

    #[test]
    fn entries_selecting_the_inlined_union_follow_it() {
        let mut schemas: Mapping = serde_yaml_ng::from_str(
            "
AnimalPolymorphic:
  oneOf:
    - $ref: '#/components/schemas/PetPolymorphic'
    - $ref: '#/components/schemas/Fish'
  discriminator:
    propertyName: kind
    mapping:
      pet: '#/components/schemas/PetPolymorphic'
      cat: '#/components/schemas/PetPolymorphic'
      fish: '#/components/schemas/Fish'
PetPolymorphic:
  oneOf:
    - $ref: '#/components/schemas/Cat'
  discriminator:
    propertyName: kind
    mapping:
      cat: '#/components/schemas/Cat'
Cat: {}
Fish: {}
",
        )
        .unwrap();

        assert_eq!(merge_nested_unions(&mut schemas), 1);
        assert_eq!(refs(&schemas, "AnimalPolymorphic"), vec!["Cat", "Fish"]);

        let mapping = &schemas["AnimalPolymorphic"]["discriminator"]["mapping"];
        assert_eq!(mapping["cat"].as_str(), Some("#/components/schemas/Cat"));
        // No nested counterpart; the union itself still exists
        assert_eq!(
            mapping["pet"].as_str(),
            Some("#/components/schemas/PetPolymorphic")
        );
    }

    #[test]
    fn refuses_disagreeing_properties_and_impure_unions() {
        let mut schemas: Mapping = serde_yaml_ng::from_str(
            "
Outer:
  oneOf:
    - $ref: '#/components/schemas/ByType'
    - $ref: '#/components/schemas/Nullable'
  discriminator:
    propertyName: kind
ByType:
  oneOf:
    - $ref: '#/components/schemas/A'
  discriminator:
    propertyName: type
Nullable:
  nullable: true
  oneOf:
    - $ref: '#/components/schemas/B'
A: {}
B: {}
",
        )
        .unwrap();

        assert_eq!(merge_nested_unions(&mut schemas), 0);
        assert_eq!(refs(&schemas, "Outer"), vec!["ByType", "Nullable"]);
    }

    #[test]
    fn cyclic_unions_terminate() {
        let mut schemas: Mapping = serde_yaml_ng::from_str(
            "
Left:
  oneOf:
    - $ref: '#/components/schemas/Right'
    - $ref: '#/components/schemas/A'
Right:
  oneOf:
    - $ref: '#/components/schemas/Left'
    - $ref: '#/components/schemas/B'
A: {}
B: {}
",
        )
        .unwrap();

        merge_nested_unions(&mut schemas);
        assert_eq!(refs(&schemas, "Left"), vec!["Left", "B", "A"]);
    }
}
