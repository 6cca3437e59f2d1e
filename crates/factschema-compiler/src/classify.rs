//! Fact-type classification.
//!
//! Every fact type with at least one role lands in exactly one shape, decided
//! by its arity and the uniqueness constraints on its roles:
//!
//! | roles | uniqueness                          | shape         |
//! |-------|-------------------------------------|---------------|
//! | 1     | any                                 | Unary         |
//! | 2     | a single-role UC                    | Functional    |
//! | 2     | compound UC over both, not a player | ArrayValued   |
//! | 2     | compound UC over both, a player     | Association   |
//! | ≥3    | compound UC within the fact type    | Association   |
//! | ≥2    | none                                | Independent   |
//!
//! Anything else (no roles, a single-role UC on an n-ary fact type) is a
//! model defect and fails the compilation.

use factschema_model::{ConstraintKind, FactType, FactTypeId, ModelSnapshot, RoleId};
use serde::Serialize;

use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum FactShape {
    /// Boolean property on the sole player.
    Unary { role: RoleId },
    /// Scalar or reference property on the owner (the UC'd role's player).
    Functional { owner: RoleId, value: RoleId },
    /// Array property on the first role's player.
    ArrayValued { owner: RoleId, item: RoleId },
    /// The fact type becomes its own resource, identified by `span`.
    Association { span: Vec<RoleId> },
    /// No property; entity players still get resources.
    Independent,
}

impl FactShape {
    pub fn label(&self) -> &'static str {
        match self {
            FactShape::Unary { .. } => "unary",
            FactShape::Functional { .. } => "functional",
            FactShape::ArrayValued { .. } => "array-valued",
            FactShape::Association { .. } => "association",
            FactShape::Independent => "independent",
        }
    }
}

pub fn classify(snapshot: &ModelSnapshot, id: FactTypeId) -> Result<FactShape, CompileError> {
    let fact_type = snapshot.fact_type(id);
    let roles = &fact_type.roles;
    let unclassified = |reason: &str| CompileError::Unclassified {
        fact_type: fact_type.title().to_string(),
        reason: reason.to_string(),
    };

    let shape = match roles.as_slice() {
        [] => return Err(unclassified("it has no roles")),
        [role] => FactShape::Unary { role: *role },
        [first, second] => {
            let single = roles.iter().copied().find(|r| has_single_role_uc(snapshot, *r));
            match single {
                Some(owner) => FactShape::Functional {
                    owner,
                    value: if owner == *first { *second } else { *first },
                },
                None => match compound_span(snapshot, fact_type) {
                    Some(span) if span.len() == 2 && !snapshot.is_objectified(id) => {
                        FactShape::ArrayValued {
                            owner: *first,
                            item: *second,
                        }
                    }
                    Some(span) => FactShape::Association { span },
                    None => FactShape::Independent,
                },
            }
        }
        _ => {
            if roles.iter().any(|r| has_single_role_uc(snapshot, *r)) {
                return Err(unclassified(
                    "a single-role uniqueness constraint cannot own an n-ary fact",
                ));
            }
            match compound_span(snapshot, fact_type) {
                Some(span) => FactShape::Association { span },
                None => FactShape::Independent,
            }
        }
    };

    tracing::debug!(fact_type = %fact_type.title(), shape = shape.label(), "classified");
    Ok(shape)
}

fn has_single_role_uc(snapshot: &ModelSnapshot, role: RoleId) -> bool {
    snapshot
        .spans_of_kind_on_role(role, ConstraintKind::UC)
        .any(|s| s.roles.len() == 1)
}

/// The first multi-role UC whose roles all belong to `fact_type`.
pub(crate) fn compound_span(snapshot: &ModelSnapshot, fact_type: &FactType) -> Option<Vec<RoleId>> {
    fact_type.roles.iter().find_map(|role| {
        snapshot
            .spans_of_kind_on_role(*role, ConstraintKind::UC)
            .find(|s| s.roles.len() > 1 && s.roles.iter().all(|r| fact_type.roles.contains(r)))
            .map(|s| s.roles.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use factschema_model::ModelDocument;

    fn snapshot(json: &str) -> ModelSnapshot {
        ModelDocument::from_json(json)
            .expect("parse")
            .resolve()
            .expect("resolve")
    }

    fn shape_of(snapshot: &ModelSnapshot, title: &str) -> Result<FactShape, CompileError> {
        classify(snapshot, snapshot.fact_type_by_title(title).expect("fact type").id)
    }

    const NOUNS: &str = r#"[
        {"name": "Person"}, {"name": "Order"}, {"name": "Product"}, {"name": "Store"},
        {"name": "Age", "objectType": "value", "valueType": "integer"}
    ]"#;

    #[test]
    fn unary_and_functional() {
        let s = snapshot(&format!(
            r#"{{"nouns": {NOUNS}, "factTypes": [
                {{"readings": ["Person smokes"]}},
                {{"readings": ["Person has Age"], "relationship": "many-to-one"}},
                {{"readings": ["Person places Order"], "relationship": "one-to-many"}}
            ]}}"#
        ));
        assert!(matches!(shape_of(&s, "Person smokes"), Ok(FactShape::Unary { .. })));

        let has_age = s.fact_type_by_title("Person has Age").unwrap();
        assert_eq!(
            shape_of(&s, "Person has Age").unwrap(),
            FactShape::Functional {
                owner: has_age.roles[0],
                value: has_age.roles[1]
            }
        );

        // one-to-many: the order owns the reference to its person
        let places = s.fact_type_by_title("Person places Order").unwrap();
        assert_eq!(
            shape_of(&s, "Person places Order").unwrap(),
            FactShape::Functional {
                owner: places.roles[1],
                value: places.roles[0]
            }
        );
    }

    #[test]
    fn compound_uniqueness_is_array_unless_objectified() {
        let s = snapshot(&format!(
            r#"{{"nouns": {NOUNS}, "factTypes": [
                {{"readings": ["Order contains Product"], "relationship": "many-to-many"}},
                {{"name": "Stocking", "readings": ["Store stocks Product"], "relationship": "many-to-many"}},
                {{"readings": ["Stocking has Age"], "relationship": "many-to-one"}}
            ]}}"#
        ));
        assert!(matches!(
            shape_of(&s, "Order contains Product"),
            Ok(FactShape::ArrayValued { .. })
        ));
        assert!(matches!(
            shape_of(&s, "Stocking"),
            Ok(FactShape::Association { ref span }) if span.len() == 2
        ));
    }

    #[test]
    fn ternary_and_unconstrained() {
        let s = snapshot(&format!(
            r#"{{"nouns": {NOUNS},
                "factTypes": [
                    {{"readings": ["Person buys Product at Store"]}},
                    {{"readings": ["Person visits Store"]}},
                    {{"readings": ["Person sells Product to Store"]}}
                ],
                "constraints": [
                    {{"kind": "UC", "roles": [
                        {{"factType": "Person buys Product at Store", "role": 0}},
                        {{"factType": "Person buys Product at Store", "role": 1}}
                    ]}},
                    {{"kind": "UC", "roles": [{{"factType": "Person sells Product to Store", "role": 0}}]}}
                ]
            }}"#
        ));
        assert!(matches!(
            shape_of(&s, "Person buys Product at Store"),
            Ok(FactShape::Association { .. })
        ));
        assert_eq!(shape_of(&s, "Person visits Store").unwrap(), FactShape::Independent);
        assert!(matches!(
            shape_of(&s, "Person sells Product to Store"),
            Err(CompileError::Unclassified { .. })
        ));
    }

    #[test]
    fn fact_type_without_roles_fails_loudly() {
        let s = snapshot(r#"{"factTypes": [{"name": "Nothing", "readings": ["it rains"]}]}"#);
        assert!(matches!(
            shape_of(&s, "Nothing"),
            Err(CompileError::Unclassified { .. })
        ));
    }
}
