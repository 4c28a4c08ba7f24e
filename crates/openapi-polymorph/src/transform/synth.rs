//! Wrapper eligibility and synthesis.
//!
//! Eligibility is a fixpoint: a wrapper's `oneOf` references its children,
//! which can make a child that is itself a polymorphic base "used" and
//! therefore eligible for its own wrapper. Decisions are settled before any
//! schema is touched so tagging knows which children defer to their own
//! wrapper.

use std::collections::HashSet;

use serde_yaml_ng::{Mapping, Value};

use super::children::ValidChild;
use super::helpers::{
    const_constraint, mapping_target, pinned_const, ref_value, schema_ref, val_s,
};
use super::index::RefIndex;
use super::parents::Candidate;
use super::TransformOptions;

/// A candidate together with its classified children.
#[derive(Debug, Clone)]
pub struct Plan {
    /// The discriminator owner.
    pub candidate: Candidate,
    /// Children that belong in its union, in mapping order.
    pub children: Vec<ValidChild>,
}

impl Plan {
    fn name(&self) -> &str {
        &self.candidate.name
    }

    /// Children other than the candidate itself.
    pub fn proper_children(&self) -> impl Iterator<Item = &ValidChild> {
        self.children.iter().filter(move |c| c.name != self.candidate.name)
    }

    /// Whether the children make a union worth wrapping: more than one, or a
    /// single proper child unless `ignore_single` is set.
    pub fn forms_union(&self, ignore_single: bool) -> bool {
        match self.children.as_slice() {
            [] => false,
            [only] => !ignore_single && only.name != self.name(),
            _ => true,
        }
    }

    fn self_child(&self) -> Option<&ValidChild> {
        self.children.iter().find(|c| c.name == self.candidate.name)
    }
}

/// Settled eligibility.
#[derive(Debug, Default)]
pub struct Decision {
    /// Names of candidates that get a wrapper.
    pub eligible: HashSet<String>,
    /// Names referenced outside `allOf`, including references the new
    /// wrappers will add.
    pub used: HashSet<String>,
}

/// Decide which candidates get a wrapper, re-checking until stable.
pub fn decide(plans: &[Plan], index: &RefIndex, options: &TransformOptions) -> Decision {
    let mut decision = Decision {
        eligible: HashSet::new(),
        used: index.used_names(),
    };

    let mut pass = 0;
    loop {
        pass += 1;
        let mut changed = false;

        for plan in plans {
            if decision.eligible.contains(plan.name())
                || !is_eligible(plan, &decision.used, options.ignore_single_specialization)
            {
                continue;
            }
            tracing::debug!(schema = plan.name(), pass, "wrapper eligible");
            decision.eligible.insert(plan.name().to_string());
            for child in plan.proper_children() {
                decision.used.insert(child.name.clone());
            }
            changed = true;
        }

        if !changed {
            break;
        }
        if pass >= options.max_passes {
            tracing::warn!(
                passes = pass,
                "wrapper eligibility did not settle; stopping at the pass limit"
            );
            break;
        }
    }

    for plan in plans {
        if !decision.used.contains(plan.name()) {
            let inherited_at: Vec<&str> = index
                .sites(plan.name())
                .iter()
                .map(|site| site.location.as_str())
                .collect();
            tracing::debug!(schema = plan.name(), ?inherited_at, "only inherited from; no wrapper");
        }
    }

    decision
}

fn is_eligible(plan: &Plan, used: &HashSet<String>, ignore_single: bool) -> bool {
    used.contains(plan.name()) && plan.forms_union(ignore_single)
}

/// A base schema and the wrapper synthesized for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wrapped {
    /// Base schema name.
    pub parent: String,
    /// Wrapper schema name.
    pub wrapper: String,
}

/// Create wrappers (and self-reference helpers) for every eligible plan, in
/// discovery order. Names of created schemas are appended to `created`.
pub fn synthesize(
    schemas: &mut Mapping,
    plans: &[Plan],
    decision: &Decision,
    options: &TransformOptions,
    created: &mut Vec<String>,
) -> Vec<Wrapped> {
    let mut wrapped = Vec::new();

    for plan in plans {
        if !decision.eligible.contains(plan.name()) {
            continue;
        }
        let parent = plan.name();
        let property_name = plan.candidate.property_name.as_str();
        let mut mapping = plan.candidate.mapping.clone();

        if options.add_discriminator_const {
            for child in plan.proper_children() {
                if decision.eligible.contains(&child.name) {
                    continue;
                }
                tag_child(schemas, &child.name, property_name, &child.value);
            }
        }

        if let Some(own) = plan.self_child() {
            let helper = format!("{parent}OneOf");
            if !schemas.contains_key(helper.as_str()) {
                schemas.insert(
                    val_s(&helper),
                    self_reference_helper(parent, property_name, &own.value),
                );
                created.push(helper.clone());
                tracing::debug!(schema = parent, helper = %helper, "created self-reference helper");
            }
            mapping.insert(val_s(&own.value), val_s(&schema_ref(&helper)));
        }

        let one_of: Vec<Value> = plan
            .children
            .iter()
            .map(|child| {
                let target = mapping
                    .get(child.value.as_str())
                    .and_then(|v| mapping_target(v, schemas))
                    .unwrap_or_else(|| child.name.clone());
                ref_value(&schema_ref(&target))
            })
            .collect();

        let mut discriminator = Mapping::new();
        discriminator.insert(val_s("propertyName"), val_s(property_name));
        discriminator.insert(val_s("mapping"), Value::Mapping(mapping));

        let mut wrapper_body = Mapping::new();
        wrapper_body.insert(val_s("oneOf"), Value::Sequence(one_of));
        wrapper_body.insert(val_s("discriminator"), Value::Mapping(discriminator));

        let has_description = schemas
            .get(parent)
            .and_then(Value::as_mapping)
            .is_some_and(|s| s.contains_key("description"));
        if has_description {
            wrapper_body.insert(
                val_s("description"),
                val_s(&format!(
                    "Any concrete variant of {parent}, selected by the `{property_name}` property."
                )),
            );
        }

        let wrapper = format!("{parent}{}", options.wrapper_suffix);
        if schemas.contains_key(wrapper.as_str()) {
            tracing::warn!(
                schema = parent,
                wrapper = %wrapper,
                "wrapper name already exists; overwriting"
            );
        }
        schemas.insert(val_s(&wrapper), Value::Mapping(wrapper_body));
        created.push(wrapper.clone());
        tracing::debug!(schema = parent, wrapper = %wrapper, "created union wrapper");

        wrapped.push(Wrapped {
            parent: parent.to_string(),
            wrapper,
        });
    }

    wrapped
}

/// Append the discriminator `const` tag to a child's `allOf` unless the
/// child already pins the property.
fn tag_child(schemas: &mut Mapping, child: &str, property_name: &str, value: &str) {
    let Some(body) = schemas.get_mut(child).and_then(Value::as_mapping_mut) else {
        return;
    };
    if let Some(existing) = pinned_const(body, property_name) {
        if existing.as_str() != Some(value) {
            tracing::warn!(
                schema = child,
                property = property_name,
                ?existing,
                wanted = value,
                "child already pins a different discriminator value; keeping it"
            );
        }
        return;
    }

    let constraint = const_constraint(property_name, value);
    match body.get_mut("allOf").and_then(Value::as_sequence_mut) {
        Some(all_of) => all_of.push(constraint),
        None => {
            body.insert(val_s("allOf"), Value::Sequence(vec![constraint]));
        }
    }
}

/// `{allOf: [{$ref: Parent}, {type: object, properties: {<prop>: {const: <value>}}}]}`.
fn self_reference_helper(parent: &str, property_name: &str, value: &str) -> Value {
    let mut helper = Mapping::new();
    helper.insert(
        val_s("allOf"),
        Value::Sequence(vec![
            ref_value(&schema_ref(parent)),
            const_constraint(property_name, value),
        ]),
    );
    Value::Mapping(helper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::children::classify;
    use crate::transform::graph::InheritanceGraph;
    use crate::transform::helpers::schemas;
    use crate::transform::parents::discover;

    fn plans(doc: &Value) -> Vec<Plan> {
        let schemas = schemas(doc).unwrap();
        let graph = InheritanceGraph::build(schemas);
        discover(schemas)
            .into_iter()
            .map(|candidate| {
                let (children, _) = classify(&candidate, schemas, &graph);
                Plan {
                    candidate,
                    children,
                }
            })
            .collect()
    }

    const LAYERED: &str = "
paths:
  /zoo:
    get:
      responses:
        '200':
          description: OK
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Animal'
components:
  schemas:
    Animal:
      type: object
      discriminator:
        propertyName: kind
        mapping:
          pet: '#/components/schemas/Pet'
          wild: '#/components/schemas/Wild'
    Pet:
      allOf:
        - $ref: '#/components/schemas/Animal'
      discriminator:
        propertyName: kind
        mapping:
          cat: '#/components/schemas/Cat'
          dog: '#/components/schemas/Dog'
    Wild:
      allOf:
        - $ref: '#/components/schemas/Animal'
    Cat:
      allOf:
        - $ref: '#/components/schemas/Pet'
    Dog:
      allOf:
        - $ref: '#/components/schemas/Pet'
";

    #[test]
    fn eligibility_propagates_through_new_wrappers() {
        let doc: Value = serde_yaml_ng::from_str(LAYERED).unwrap();
        let plans = plans(&doc);
        let index = RefIndex::build(&doc);
        let decision = decide(&plans, &index, &TransformOptions::default());

        // Pet is only inherited from, but AnimalPolymorphic lists it in oneOf
        assert!(decision.eligible.contains("Animal"));
        assert!(decision.eligible.contains("Pet"));
        assert!(decision.used.contains("Wild"));
    }

    #[test]
    fn pass_limit_stops_propagation() {
        let doc: Value = serde_yaml_ng::from_str(LAYERED).unwrap();
        let mut plans = plans(&doc);
        // Pet is checked before the Animal wrapper makes it used
        plans.reverse();
        let index = RefIndex::build(&doc);

        let limited = decide(&plans, &index, &TransformOptions::default().max_passes(1));
        assert!(limited.eligible.contains("Animal"));
        assert!(!limited.eligible.contains("Pet"));

        let settled = decide(&plans, &index, &TransformOptions::default());
        assert!(settled.eligible.contains("Pet"));
    }

    #[test]
    fn single_specialization_rules() {
        let doc: Value = serde_yaml_ng::from_str(
            "
paths:
  /a:
    get:
      responses:
        '200':
          description: OK
          content:
            application/json:
              schema:
                oneOf:
                  - $ref: '#/components/schemas/Solo'
                  - $ref: '#/components/schemas/Lonely'
components:
  schemas:
    Solo:
      discriminator:
        propertyName: kind
        mapping:
          solo: '#/components/schemas/Solo'
    Lonely:
      discriminator:
        propertyName: kind
        mapping:
          only: '#/components/schemas/Only'
          stray: '#/components/schemas/Stray'
    Only:
      allOf:
        - $ref: '#/components/schemas/Lonely'
    Stray:
      type: object
",
        )
        .unwrap();
        let plans = plans(&doc);
        let index = RefIndex::build(&doc);

        let decision = decide(&plans, &index, &TransformOptions::default());
        assert!(!decision.eligible.contains("Solo"));
        assert!(decision.eligible.contains("Lonely"));

        let strict = TransformOptions::default().ignore_single_specialization(true);
        let decision = decide(&plans, &index, &strict);
        assert!(decision.eligible.is_empty());
    }

    #[test]
    fn synthesize_builds_wrapper_tags_and_helper() {
        let mut doc: Value = serde_yaml_ng::from_str(
            "
components:
  schemas:
    Shape:
      description: A shape
      type: object
      discriminator:
        propertyName: shapeType
        mapping:
          shape: '#/components/schemas/Shape'
          circle: '#/components/schemas/Circle'
    Circle:
      allOf:
        - $ref: '#/components/schemas/Shape'
",
        )
        .unwrap();
        let plans = plans(&doc);
        let decision = Decision {
            eligible: HashSet::from(["Shape".to_string()]),
            used: HashSet::new(),
        };
        let options = TransformOptions::default();
        let mut created = Vec::new();
        let schemas = crate::transform::helpers::schemas_mut(&mut doc).unwrap();
        let wrapped = synthesize(schemas, &plans, &decision, &options, &mut created);

        assert_eq!(wrapped[0].wrapper, "ShapePolymorphic");
        assert_eq!(created, vec!["ShapeOneOf", "ShapePolymorphic"]);

        let wrapper = &doc["components"]["schemas"]["ShapePolymorphic"];
        assert_eq!(
            wrapper["oneOf"][0]["$ref"].as_str(),
            Some("#/components/schemas/ShapeOneOf")
        );
        assert_eq!(
            wrapper["oneOf"][1]["$ref"].as_str(),
            Some("#/components/schemas/Circle")
        );
        assert_eq!(
            wrapper["discriminator"]["mapping"]["shape"].as_str(),
            Some("#/components/schemas/ShapeOneOf")
        );
        assert!(wrapper["description"].as_str().unwrap().contains("shapeType"));

        let helper = &doc["components"]["schemas"]["ShapeOneOf"];
        assert_eq!(
            helper["allOf"][0]["$ref"].as_str(),
            Some("#/components/schemas/Shape")
        );
        assert_eq!(
            helper["allOf"][1]["properties"]["shapeType"]["const"].as_str(),
            Some("shape")
        );

        let circle = doc["components"]["schemas"]["Circle"]["allOf"]
            .as_sequence()
            .unwrap();
        assert_eq!(circle.len(), 2);
        assert_eq!(
            circle[1]["properties"]["shapeType"]["const"].as_str(),
            Some("circle")
        );
    }

    #[test]
    fn existing_tag_is_never_overridden() {
        let mut schemas: Mapping = serde_yaml_ng::from_str(
            "
Cat:
  allOf:
    - $ref: '#/components/schemas/Pet'
    - type: object
      properties:
        kind:
          const: feline
",
        )
        .unwrap();

        tag_child(&mut schemas, "Cat", "kind", "cat");
        tag_child(&mut schemas, "Cat", "kind", "feline");

        let all_of = schemas["Cat"]["allOf"].as_sequence().unwrap();
        assert_eq!(all_of.len(), 2);
        assert_eq!(all_of[1]["properties"]["kind"]["const"].as_str(), Some("feline"));
    }
}
