//! Discovery of polymorphic base schemas.

use serde_yaml_ng::{Mapping, Value};

use super::helpers::{discriminator_mapping, discriminator_property, key_str, mapping_target};

/// A base schema carrying a genuine discriminator.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Schema name.
    pub name: String,
    /// `discriminator.propertyName`.
    pub property_name: String,
    /// Independent copy of `discriminator.mapping`.
    pub mapping: Mapping,
}

/// Find every schema whose discriminator selects between alternatives.
///
/// A mapping qualifies with more than one entry, or with exactly one entry
/// pointing back at the owner. Schemas that already have a `oneOf` are
/// unions themselves and are skipped. Result is in schema-map order.
pub fn discover(schemas: &Mapping) -> Vec<Candidate> {
    schemas
        .iter()
        .filter_map(|(name, schema)| {
            let name = key_str(name)?;
            let schema = schema.as_mapping()?;
            if schema.contains_key("oneOf") {
                return None;
            }

            let property_name = discriminator_property(schema)?;
            let mapping = discriminator_mapping(schema).filter(|m| !m.is_empty())?;

            let genuine = mapping.len() > 1
                || mapping
                    .values()
                    .next()
                    .and_then(|v| mapping_target(v, schemas))
                    .is_some_and(|target| target == name);
            if !genuine {
                return None;
            }

            Some(Candidate {
                name: name.into_owned(),
                property_name: property_name.to_string(),
                mapping: mapping.clone(),
            })
        })
        .collect()
}

/// Iterate `(discriminator value, target)` pairs of a mapping.
pub fn entries(mapping: &Mapping) -> impl Iterator<Item = (String, &Value)> {
    mapping
        .iter()
        .filter_map(|(k, v)| key_str(k).map(|k| (k.into_owned(), v)))
}
