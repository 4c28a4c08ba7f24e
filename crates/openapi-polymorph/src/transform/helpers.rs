//! Reference utilities and shared YAML helpers used across transform modules.

use std::borrow::Cow;

use serde_yaml_ng::{Mapping, Value};

/// Prefix of every local schema pointer.
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Shorthand for `Value::String`.
pub fn val_s(s: &str) -> Value {
    Value::String(s.to_string())
}

/// Extract the schema name from a local `#/components/schemas/<Name>` pointer.
///
/// Returns `None` for external files, other component kinds, and pointers
/// that reach below a schema (`.../Pet/properties/name`). The name is
/// unescaped per RFC 6901 (`~1` → `/`, `~0` → `~`).
pub fn schema_name(pointer: &str) -> Option<Cow<'_, str>> {
    let raw = pointer.strip_prefix(SCHEMA_REF_PREFIX)?;
    if raw.is_empty() || raw.contains('/') {
        return None;
    }
    if raw.contains('~') {
        Some(Cow::Owned(raw.replace("~1", "/").replace("~0", "~")))
    } else {
        Some(Cow::Borrowed(raw))
    }
}

/// Format a schema name as a local pointer, escaping `~` and `/`.
pub fn schema_ref(name: &str) -> String {
    if name.contains('~') || name.contains('/') {
        format!(
            "{SCHEMA_REF_PREFIX}{}",
            name.replace('~', "~0").replace('/', "~1")
        )
    } else {
        format!("{SCHEMA_REF_PREFIX}{name}")
    }
}

/// The `$ref` string of a `{ $ref: ... }` node, if it is one.
pub fn ref_of(value: &Value) -> Option<&str> {
    value.as_mapping()?.get("$ref")?.as_str()
}

/// The local schema name a `{ $ref: ... }` node points at.
pub fn ref_name(value: &Value) -> Option<String> {
    ref_of(value).and_then(schema_name).map(Cow::into_owned)
}

/// Build a `{ $ref: <pointer> }` node.
pub fn ref_value(pointer: &str) -> Value {
    let mut map = Mapping::new();
    map.insert(val_s("$ref"), val_s(pointer));
    Value::Mapping(map)
}

/// Resolve a discriminator mapping value to a schema name.
///
/// Mapping values are either local pointers or bare schema names; a bare
/// name only resolves when the schema exists.
pub fn mapping_target(value: &Value, schemas: &Mapping) -> Option<String> {
    let raw = value.as_str()?;
    if raw.starts_with('#') {
        return schema_name(raw).map(Cow::into_owned);
    }
    if raw.contains('/') || raw.is_empty() {
        return None;
    }
    schemas.contains_key(raw).then(|| raw.to_string())
}

/// Build the `{type: object, properties: {<prop>: {const: <value>}}}` tag.
pub fn const_constraint(property_name: &str, value: &str) -> Value {
    let mut constant = Mapping::new();
    constant.insert(val_s("const"), val_s(value));

    let mut properties = Mapping::new();
    properties.insert(val_s(property_name), Value::Mapping(constant));

    let mut constraint = Mapping::new();
    constraint.insert(val_s("type"), val_s("object"));
    constraint.insert(val_s("properties"), Value::Mapping(properties));
    Value::Mapping(constraint)
}

/// The `const` a schema node pins for `property_name`, either in its own
/// `properties` or in one of its direct `allOf` members.
pub fn pinned_const<'a>(schema: &'a Mapping, property_name: &str) -> Option<&'a Value> {
    let pin = |node: &'a Mapping| {
        node.get("properties")?
            .as_mapping()?
            .get(property_name)?
            .as_mapping()?
            .get("const")
    };

    pin(schema).or_else(|| {
        schema
            .get("allOf")?
            .as_sequence()?
            .iter()
            .filter_map(Value::as_mapping)
            .find_map(pin)
    })
}

/// Read-only access to `components.schemas`.
pub fn schemas(doc: &Value) -> Option<&Mapping> {
    doc.as_mapping()?
        .get("components")?
        .as_mapping()?
        .get("schemas")?
        .as_mapping()
}

/// Mutable access to `components.schemas`.
pub fn schemas_mut(doc: &mut Value) -> Option<&mut Mapping> {
    doc.as_mapping_mut()?
        .get_mut("components")?
        .as_mapping_mut()?
        .get_mut("schemas")?
        .as_mapping_mut()
}

/// `discriminator.propertyName` of a schema.
pub fn discriminator_property(schema: &Mapping) -> Option<&str> {
    schema
        .get("discriminator")?
        .as_mapping()?
        .get("propertyName")?
        .as_str()
}

/// `discriminator.mapping` of a schema.
pub fn discriminator_mapping(schema: &Mapping) -> Option<&Mapping> {
    schema
        .get("discriminator")?
        .as_mapping()?
        .get("mapping")?
        .as_mapping()
}

/// Mapping key as a string (numbers and booleans are stringified).
pub fn key_str(key: &Value) -> Option<Cow<'_, str>> {
    match key {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        _ => None,
    }
}
