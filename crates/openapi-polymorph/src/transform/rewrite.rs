//! Point external usages of wrapped base schemas at their wrappers.
//!
//! Inheritance links stay on the real base: elements of a component schema's
//! own top-level `allOf` are never rewritten. An `allOf` nested deeper (a
//! property wrapping a `$ref` to add a description) is a usage.
//! Component `headers` and `examples` are not touched.

use std::collections::{HashMap, HashSet};

use serde_yaml_ng::Value;

use super::helpers::{key_str, val_s};
use super::walk::{is_discriminator_keyword, walk_mut, Flow, Segment};

/// Top-level document sections rewritten unconditionally.
const ROOT_SECTIONS: &[&str] = &["paths", "webhooks"];

/// `components` sections (besides `schemas`) rewritten unconditionally.
const COMPONENT_SECTIONS: &[&str] = &[
    "requestBodies",
    "responses",
    "parameters",
    "callbacks",
    "links",
];

/// Replace every `$ref` found in `redirects` (`base ref → wrapper ref`).
///
/// Schemas named in `skip` (the wrappers created by this run) are left
/// alone. Returns the number of rewritten references.
pub fn rewrite_references(
    doc: &mut Value,
    redirects: &HashMap<String, String>,
    skip: &HashSet<String>,
) -> usize {
    if redirects.is_empty() {
        return 0;
    }
    let Some(root) = doc.as_mapping_mut() else {
        return 0;
    };

    let mut rewritten = 0;

    for section in ROOT_SECTIONS {
        if let Some(value) = root.get_mut(*section) {
            rewritten += redirect(value, redirects, false);
        }
    }

    let Some(components) = root.get_mut("components").and_then(Value::as_mapping_mut) else {
        return rewritten;
    };

    for section in COMPONENT_SECTIONS {
        if let Some(value) = components.get_mut(*section) {
            rewritten += redirect(value, redirects, false);
        }
    }

    if let Some(schemas) = components.get_mut("schemas").and_then(Value::as_mapping_mut) {
        for (name, schema) in schemas.iter_mut() {
            if key_str(name).is_some_and(|n| skip.contains(&*n)) {
                continue;
            }
            rewritten += redirect(schema, redirects, true);
        }
    }

    tracing::debug!(rewritten, "redirected references to wrappers");
    rewritten
}

fn redirect(value: &mut Value, redirects: &HashMap<String, String>, keep_inheritance: bool) -> usize {
    let mut count = 0;
    walk_mut(value, &mut |path, node| {
        if is_discriminator_keyword(path) {
            return Flow::Skip;
        }
        if keep_inheritance && is_inheritance_link(path) {
            return Flow::Descend;
        }
        let Some(target) = node.as_mapping_mut().and_then(|m| m.get_mut("$ref")) else {
            return Flow::Descend;
        };
        if let Some(wrapper) = target.as_str().and_then(|r| redirects.get(r)) {
            *target = val_s(wrapper);
            count += 1;
        }
        Flow::Descend
    });
    count
}

/// `[allOf, <index>]` relative to a component schema.
fn is_inheritance_link(path: &[Segment]) -> bool {
    matches!(path, [Segment::Key(k), Segment::Index(_)] if k == "allOf")
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const DOC: &str = indoc! {"
        paths:
          /pets:
            post:
              requestBody:
                content:
                  application/json:
                    schema:
                      $ref: '#/components/schemas/Pet'
        webhooks:
          newPet:
            post:
              requestBody:
                content:
                  application/json:
                    schema:
                      allOf:
                        - $ref: '#/components/schemas/Pet'
        components:
          headers:
            X-Pet:
              schema:
                $ref: '#/components/schemas/Pet'
          responses:
            PetResponse:
              content:
                application/json:
                  schema:
                    $ref: '#/components/schemas/Pet'
          schemas:
            Pet:
              type: object
              discriminator:
                propertyName: kind
                mapping:
                  pet: '#/components/schemas/Pet'
            Cat:
              allOf:
                - $ref: '#/components/schemas/Pet'
              properties:
                friend:
                  $ref: '#/components/schemas/Pet'
                buddy:
                  description: Best friend
                  allOf:
                    - $ref: '#/components/schemas/Pet'
                discriminator:
                  $ref: '#/components/schemas/Pet'
            PetPolymorphic:
              oneOf:
                - $ref: '#/components/schemas/Pet'
    "};

    fn run() -> (Value, usize) {
        let mut doc: Value = serde_yaml_ng::from_str(DOC).unwrap();
        let redirects = HashMap::from([(
            "#/components/schemas/Pet".to_string(),
            "#/components/schemas/PetPolymorphic".to_string(),
        )]);
        let skip = HashSet::from(["PetPolymorphic".to_string()]);
        let count = rewrite_references(&mut doc, &redirects, &skip);
        (doc, count)
    }

    #[test]
    fn rewrites_usages_but_not_inheritance() {
        let (doc, count) = run();
        let wrapper = Some("#/components/schemas/PetPolymorphic");
        let base = Some("#/components/schemas/Pet");

        assert_eq!(
            doc["paths"]["/pets"]["post"]["requestBody"]["content"]["application/json"]["schema"]
                ["$ref"]
                .as_str(),
            wrapper
        );
        // allOf outside components.schemas is usage, not inheritance
        assert_eq!(
            doc["webhooks"]["newPet"]["post"]["requestBody"]["content"]["application/json"]
                ["schema"]["allOf"][0]["$ref"]
                .as_str(),
            wrapper
        );
        assert_eq!(
            doc["components"]["responses"]["PetResponse"]["content"]["application/json"]["schema"]
                ["$ref"]
                .as_str(),
            wrapper
        );

        let cat = &doc["components"]["schemas"]["Cat"];
        assert_eq!(cat["allOf"][0]["$ref"].as_str(), base);
        assert_eq!(cat["properties"]["friend"]["$ref"].as_str(), wrapper);

        assert_eq!(count, 6);
    }

    #[test]
    fn nested_all_of_and_named_properties_are_usages() {
        let (doc, _) = run();
        let wrapper = Some("#/components/schemas/PetPolymorphic");
        let cat = &doc["components"]["schemas"]["Cat"];

        assert_eq!(cat["properties"]["buddy"]["allOf"][0]["$ref"].as_str(), wrapper);
        assert_eq!(cat["properties"]["discriminator"]["$ref"].as_str(), wrapper);

        // The keyword itself is still left alone
        assert_eq!(
            doc["components"]["schemas"]["Pet"]["discriminator"]["mapping"]["pet"].as_str(),
            Some("#/components/schemas/Pet")
        );
    }

    #[test]
    fn headers_and_created_wrappers_are_untouched() {
        let (doc, _) = run();
        let base = Some("#/components/schemas/Pet");
        assert_eq!(
            doc["components"]["headers"]["X-Pet"]["schema"]["$ref"].as_str(),
            base
        );
        assert_eq!(
            doc["components"]["schemas"]["PetPolymorphic"]["oneOf"][0]["$ref"].as_str(),
            base
        );
    }
}
