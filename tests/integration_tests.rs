//! Integration tests for the complete compilation pipeline
//!
//! These tests drive model documents end to end:
//! - ModelDocument → ModelSnapshot → schema tiers → flattened schemas
//! - Path synthesis, tier deduplication and reference relabeling
//!
//! Run with: cargo test --test integration_tests

use factschema_compiler::{build, check_references, compile, flatten, GeneratorConfig};
use factschema_compiler::{OpenApiDocument, Schema};
use factschema_model::{ModelDocument, ModelSnapshot};
use serde_json::json;

fn snapshot(model: &str) -> ModelSnapshot {
    ModelDocument::from_json(model)
        .expect("parse")
        .resolve()
        .expect("resolve")
}

fn compiled(model: &str) -> OpenApiDocument {
    compile(&snapshot(model), &GeneratorConfig::default()).expect("compile")
}

fn property_names(schema: &Schema) -> Vec<String> {
    schema
        .properties
        .as_ref()
        .map(|p| p.keys().cloned().collect())
        .unwrap_or_default()
}

fn required(schema: &Schema) -> Vec<String> {
    schema.required.clone().unwrap_or_default()
}

// ============================================================================
// People and orders
// ============================================================================

const PEOPLE_AND_ORDERS: &str = r#"{
    "nouns": [
        {"name": "Person", "referenceScheme": ["PersonName"]},
        {"name": "PersonName", "objectType": "value", "valueType": "string"},
        {"name": "Age", "objectType": "value", "valueType": "integer", "minimum": 0},
        {"name": "Order", "referenceScheme": ["OrderNumber"]},
        {"name": "OrderNumber", "objectType": "value", "valueType": "string"}
    ],
    "factTypes": [
        {"readings": ["Person has PersonName"], "relationship": "many-to-one"},
        {"readings": ["Person has Age"], "relationship": "many-to-one"},
        {"readings": ["Person places Order"], "relationship": "one-to-many"},
        {"readings": ["Order has OrderNumber"], "relationship": "many-to-one"}
    ],
    "constraints": [
        {"kind": "MR", "roles": [{"factType": "Person has Age", "role": "Age"}]}
    ]
}"#;

#[test]
fn test_people_and_orders_get_resources_and_paths() {
    let document = compiled(PEOPLE_AND_ORDERS);
    let schemas = &document.components.schemas;

    let person = property_names(&schemas["Person"]);
    assert!(person.contains(&"name".to_string()), "{person:?}");
    assert!(person.contains(&"age".to_string()), "{person:?}");

    let order = property_names(&schemas["Order"]);
    assert!(order.contains(&"number".to_string()), "{order:?}");
    assert!(order.contains(&"person".to_string()), "{order:?}");

    for path in ["/people", "/orders"] {
        let item = document.paths.get(path).unwrap_or_else(|| panic!("missing {path}"));
        assert!(item.get.is_some(), "{path} has no list");
        assert!(item.post.is_some(), "{path} has no create");
    }
    assert!(document.paths.contains_key("/people/{name}"));
    assert!(document.paths.contains_key("/orders/{number}"));
}

#[test]
fn test_identifiers_and_mandatory_roles_are_required_on_create() {
    let mut built = build(&snapshot(PEOPLE_AND_ORDERS)).expect("build");
    flatten(&mut built.schemas).expect("flatten");

    let new_person = required(&built.schemas["NewPerson"]);
    for identifier in built.identifying_properties("Person") {
        assert!(new_person.contains(&identifier), "{identifier} not in {new_person:?}");
    }
    assert!(new_person.contains(&"age".to_string()));

    let new_order = required(&built.schemas["NewOrder"]);
    assert!(new_order.contains(&"number".to_string()));
}

#[test]
fn test_output_is_flat_and_fully_resolved() {
    let document = compiled(PEOPLE_AND_ORDERS);
    let schemas = &document.components.schemas;
    for (key, schema) in schemas {
        for entry in schema.all_of.iter().flatten() {
            let target = entry.component_target();
            assert!(
                !target.is_some_and(|t| schemas.contains_key(t)),
                "{key} still inherits from {target:?}"
            );
        }
    }

    let mut flattened = schemas.clone();
    flatten(&mut flattened).expect("flatten");
    assert_eq!(&flattened, schemas);

    check_references(&document).expect("every $ref resolves");
}

#[test]
fn test_merged_tiers_keep_every_field() {
    let mut built = build(&snapshot(PEOPLE_AND_ORDERS)).expect("build");
    flatten(&mut built.schemas).expect("flatten");
    let before = built.schemas.clone();

    let document = compiled(PEOPLE_AND_ORDERS);
    let after = &document.components.schemas;
    for (key, schema) in &before {
        let bare = key
            .strip_prefix("Update")
            .or_else(|| key.strip_prefix("New"))
            .unwrap_or(key);
        let survivor = after
            .get(key)
            .or_else(|| after.get(&format!("New{bare}")))
            .or_else(|| after.get(bare))
            .unwrap_or_else(|| panic!("{key} vanished"));
        for name in property_names(schema) {
            assert!(property_names(survivor).contains(&name), "{key}.{name} lost");
        }
        for name in required(schema) {
            assert!(required(survivor).contains(&name), "{key} requirement {name} lost");
        }
    }
}

// ============================================================================
// Support requests
// ============================================================================

const SUPPORT: &str = r#"{
    "nouns": [
        {"name": "Customer"},
        {"name": "SupportRequest"},
        {"name": "APIProduct"},
        {"name": "Priority", "objectType": "value", "valueType": "string",
         "enum": "low,medium,high,urgent"}
    ],
    "factTypes": [
        {"readings": ["Customer submits SupportRequest"], "relationship": "many-to-many"},
        {"readings": ["SupportRequest concerns APIProduct"], "relationship": "many-to-many"},
        {"readings": ["SupportRequest has Priority"], "relationship": "many-to-one"}
    ]
}"#;

#[test]
fn test_unreferenced_many_to_many_becomes_array() {
    let document = compiled(SUPPORT);
    let schemas = &document.components.schemas;

    let request = schemas["SupportRequest"].properties.as_ref().expect("properties");
    let products = &request["apiProducts"];
    assert_eq!(products.schema_type.as_deref(), Some("array"));
    assert_eq!(
        products.items.as_ref().and_then(|i| i.one_of.as_ref()).map(|o| o[1].component_target()),
        Some(Some("APIProduct"))
    );
    assert!(
        schemas.keys().all(|k| !k.contains("concerns")),
        "{:?}",
        schemas.keys().collect::<Vec<_>>()
    );

    let customer = property_names(&schemas["Customer"]);
    assert!(customer.contains(&"supportRequests".to_string()), "{customer:?}");
}

#[test]
fn test_enum_value_noun_becomes_enum_property() {
    let document = compiled(SUPPORT);
    let request = document.components.schemas["SupportRequest"]
        .properties
        .as_ref()
        .expect("properties");
    let priority = serde_json::to_value(&request["priority"]).unwrap();
    assert_eq!(priority["type"], json!("string"));
    assert_eq!(priority["enum"], json!(["low", "medium", "high", "urgent"]));
}

// ============================================================================
// Association entities
// ============================================================================

#[test]
fn test_objectified_fact_type_becomes_addressable_resource() {
    let document = compiled(
        r#"{
            "nouns": [
                {"name": "Person"},
                {"name": "Course"},
                {"name": "Grade", "objectType": "value", "valueType": "string"}
            ],
            "factTypes": [
                {"name": "Enrollment", "readings": ["Person enrolled in Course"],
                 "relationship": "many-to-many"},
                {"readings": ["Enrollment earns Grade"], "relationship": "many-to-one"}
            ]
        }"#,
    );
    let enrollment = &document.components.schemas["Enrollment"];
    let names = property_names(enrollment);
    for expected in ["course", "grade", "person"] {
        assert!(names.contains(&expected.to_string()), "{names:?}");
    }
    assert!(document.paths.contains_key("/enrollments"));
    assert!(
        document.paths.contains_key("/enrollments/{person}/{course}"),
        "{:?}",
        document.paths.keys().collect::<Vec<_>>()
    );
    assert!(document.paths.contains_key("/people/{id}"));
}

#[test]
fn test_broken_readings_fail_the_compilation() {
    let snapshot = snapshot(
        r#"{
            "nouns": [{"name": "Person"}, {"name": "Age", "objectType": "value"}],
            "factTypes": [
                {"readings": ["Person has Age"], "roles": ["Person", "Age"],
                 "relationship": "many-to-one"},
                {"name": "Silent", "readings": ["Person"], "roles": ["Person"]}
            ]
        }"#,
    );
    let err = compile(&snapshot, &GeneratorConfig::default()).unwrap_err();
    assert!(err.to_string().contains("Silent"), "{err}");
}
