//! ORM model compiler.
//!
//! Turns a resolved [`ModelSnapshot`] into one OpenAPI 3.1 document:
//!
//! 1. classify every fact type ([`classify`])
//! 2. build the three schema tiers per resource ([`builder`])
//! 3. flatten `allOf` chains to a fixed point ([`flatten`])
//! 4. synthesize CRUD paths, collapsing redundant tiers as each resource's
//!    operations become known ([`paths`], [`dedup`])
//! 5. relabel references to merged tiers and check that every `$ref`
//!    resolves
//!
//! The pass is a pure function of the snapshot and configuration; no state
//! survives between calls.

pub mod builder;
pub mod classify;
pub mod config;
pub mod dedup;
pub mod error;
pub mod flatten;
pub mod naming;
pub mod openapi;
pub mod paths;
pub mod schema;
pub mod template;

pub use builder::{build, BuiltSchemas, Resource};
pub use classify::{classify, FactShape};
pub use config::{Contact, GeneratorConfig};
pub use dedup::{check_references, dedup_tiers, Renames};
pub use error::CompileError;
pub use flatten::flatten;
pub use openapi::OpenApiDocument;
pub use schema::{Schema, SchemaMap};

use factschema_model::ModelSnapshot;
use serde_json::Value;

use crate::openapi::{Components, Info, OPENAPI_VERSION};
use crate::paths::{ERROR_MODEL_KEY, LIST_MODEL_KEY};

/// Compiles `snapshot` into an OpenAPI document.
pub fn compile(
    snapshot: &ModelSnapshot,
    config: &GeneratorConfig,
) -> Result<OpenApiDocument, CompileError> {
    let mut built = build(snapshot)?;
    flatten(&mut built.schemas)?;

    let mut renames = Renames::default();
    let paths = paths::synthesize(snapshot, config, &mut built, &mut renames)?;

    let mut schemas = built.schemas;
    schemas.insert(LIST_MODEL_KEY.to_string(), list_model());
    if let Some(template) = config.error_template() {
        schemas.insert(ERROR_MODEL_KEY.to_string(), template::schema_of(template));
    }

    let contact = (!config.contact.is_empty()).then(|| config.contact.clone());
    let mut document = OpenApiDocument {
        openapi: OPENAPI_VERSION.to_string(),
        info: Info {
            title: config.title.clone(),
            version: config.version.clone(),
            contact,
            description: config.description.clone(),
        },
        servers: config.servers.clone().filter(|s| !s.is_null()),
        paths,
        components: Components { schemas },
    };

    renames.apply(&mut document);
    check_references(&document)?;

    tracing::info!(
        resources = built.resources.len(),
        schemas = document.components.schemas.len(),
        paths = document.paths.len(),
        merged_tiers = renames.len(),
        "compiled model"
    );
    Ok(document)
}

/// Pagination envelope merged into every list response.
fn list_model() -> Schema {
    let field = |schema_type: &str, description: &str, example: i64| {
        let mut schema = Schema::typed(schema_type).with_description(description);
        schema.examples = Some(vec![Value::from(example)]);
        schema
    };
    let flag = |description: &str| {
        let mut schema = Schema::typed("boolean").with_description(description);
        schema.examples = Some(vec![Value::Bool(true)]);
        schema
    };
    let nullable = |mut schema: Schema| {
        schema.nullable = Some(true);
        schema
    };

    let mut model = Schema::typed("object");
    let properties = model.properties_mut();
    properties.insert("page".into(), field("number", "Current page number", 2));
    properties.insert(
        "nextPage".into(),
        nullable(field("number", "Number of the next page, null if it doesn't exist", 3)),
    );
    properties.insert(
        "prevPage".into(),
        nullable(field("number", "Number of the previous page, null if it doesn't exist", 1)),
    );
    properties.insert(
        "totalPages".into(),
        field("number", "Total pages available, based upon the limit", 3),
    );
    properties.insert(
        "totalCount".into(),
        field("number", "Total available records", 25),
    );
    properties.insert(
        "limit".into(),
        field("number", "Limit query parameter, defaults to 10", 10),
    );
    properties.insert(
        "pagingCounter".into(),
        field("number", "Number of the first record on the current page", 11),
    );
    properties.insert("hasPrevPage".into(), flag("Whether a previous page exists"));
    properties.insert("hasNextPage".into(), flag("Whether a next page exists"));
    model
}

#[cfg(test)]
mod tests {
    use super::*;
    use factschema_model::ModelDocument;
    use serde_json::json;

    fn compiled(model: &str, config: &GeneratorConfig) -> OpenApiDocument {
        let snapshot = ModelDocument::from_json(model)
            .expect("parse")
            .resolve()
            .expect("resolve");
        compile(&snapshot, config).expect("compile")
    }

    const ORDERS: &str = r#"{
        "nouns": [
            {"name": "Customer", "referenceScheme": ["CustomerId"]},
            {"name": "CustomerId", "objectType": "value", "valueType": "integer"},
            {"name": "Order", "referenceScheme": ["OrderNumber"]},
            {"name": "OrderNumber", "objectType": "value", "valueType": "string"}
        ],
        "factTypes": [
            {"readings": ["Customer has CustomerId"], "relationship": "many-to-one"},
            {"readings": ["Order has OrderNumber"], "relationship": "many-to-one"},
            {"readings": ["Order is placed by Customer"], "relationship": "many-to-one"}
        ]
    }"#;

    #[test]
    fn document_skeleton_and_info() {
        let config = GeneratorConfig {
            title: Some("Shop".into()),
            ..GeneratorConfig::default()
        };
        let document = compiled(ORDERS, &config);
        let value = serde_json::to_value(&document).unwrap();
        assert_eq!(value["openapi"], json!("3.1.0"));
        assert_eq!(value["info"], json!({"title": "Shop", "version": "1.0"}));
        assert!(value.get("servers").is_none());
        assert!(document.components.schemas.contains_key(LIST_MODEL_KEY));
        assert!(!document.components.schemas.contains_key(ERROR_MODEL_KEY));
        assert_eq!(
            document.components.schemas[LIST_MODEL_KEY].property_count(),
            9
        );
    }

    #[test]
    fn every_reference_resolves_after_relabeling() {
        let document = compiled(ORDERS, &GeneratorConfig::default());
        check_references(&document).expect("references resolve");
        let mut keys = Vec::new();
        document.for_each_schema(&mut |_, root| {
            root.walk(&mut |schema| {
                if let Some(target) = schema.component_target() {
                    keys.push(target.to_string());
                }
            })
        });
        assert!(keys.iter().all(|k| document.components.schemas.contains_key(k)));
        assert!(keys.iter().any(|k| k == "Customer"));
    }

    #[test]
    fn error_model_is_inferred_from_template() {
        let config = GeneratorConfig {
            error_template: Some(json!({"error": {"message": "", "code": 0}})),
            ..GeneratorConfig::default()
        };
        let document = compiled(ORDERS, &config);
        let error_model = &document.components.schemas[ERROR_MODEL_KEY];
        let error = &error_model.properties.as_ref().unwrap()["error"];
        assert_eq!(
            error.properties.as_ref().unwrap()["code"].schema_type.as_deref(),
            Some("number")
        );
    }

    #[test]
    fn compilation_is_deterministic() {
        let first = serde_json::to_string(&compiled(ORDERS, &GeneratorConfig::default())).unwrap();
        let second = serde_json::to_string(&compiled(ORDERS, &GeneratorConfig::default())).unwrap();
        assert_eq!(first, second);
    }
}
