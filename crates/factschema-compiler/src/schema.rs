//! Typed JSON Schema fragment, covering the keywords the compiler emits.
//!
//! Properties are kept in a `BTreeMap` so serialized output is stable.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// Prefix of every internal component reference.
pub const COMPONENT_PREFIX: &str = "#/components/schemas/";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "$id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Schema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<Schema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Schema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<Value>>,
}

impl Schema {
    pub fn typed(schema_type: &str) -> Self {
        Schema {
            schema_type: Some(schema_type.to_string()),
            ..Schema::default()
        }
    }

    /// `{"$ref": "#/components/schemas/<key>"}`
    pub fn component(key: &str) -> Self {
        Schema {
            reference: Some(format!("{COMPONENT_PREFIX}{key}")),
            ..Schema::default()
        }
    }

    pub fn array_of(items: Schema) -> Self {
        Schema {
            schema_type: Some("array".to_string()),
            items: Some(Box::new(items)),
            ..Schema::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Target key of an internal component reference.
    pub fn component_target(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .and_then(|r| r.strip_prefix(COMPONENT_PREFIX))
    }

    pub fn properties_mut(&mut self) -> &mut BTreeMap<String, Schema> {
        self.properties.get_or_insert_with(BTreeMap::new)
    }

    pub fn property_count(&self) -> usize {
        self.properties.as_ref().map_or(0, BTreeMap::len)
    }

    pub fn required_count(&self) -> usize {
        self.required.as_ref().map_or(0, Vec::len)
    }

    /// Adds `name` to `required` once.
    pub fn require(&mut self, name: &str) {
        let required = self.required.get_or_insert_with(Vec::new);
        if !required.iter().any(|r| r == name) {
            required.push(name.to_string());
        }
    }

    /// Visits this schema and every nested subschema, depth first.
    pub fn walk(&self, f: &mut impl FnMut(&Schema)) {
        f(self);
        if let Some(properties) = &self.properties {
            for property in properties.values() {
                property.walk(f);
            }
        }
        if let Some(items) = &self.items {
            items.walk(f);
        }
        for list in [&self.all_of, &self.one_of].into_iter().flatten() {
            for schema in list {
                schema.walk(f);
            }
        }
    }

    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Schema)) {
        f(self);
        if let Some(properties) = &mut self.properties {
            for property in properties.values_mut() {
                property.walk_mut(f);
            }
        }
        if let Some(items) = &mut self.items {
            items.walk_mut(f);
        }
        for list in [&mut self.all_of, &mut self.one_of].into_iter().flatten() {
            for schema in list {
                schema.walk_mut(f);
            }
        }
    }
}

/// The component map: schema key → schema.
pub type SchemaMap = BTreeMap<String, Schema>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_json_schema_keywords() {
        let mut schema = Schema::typed("object");
        schema.id = Some("Person".into());
        schema
            .properties_mut()
            .insert("age".into(), Schema::typed("integer"));
        schema.require("age");
        schema.require("age");
        schema.all_of = Some(vec![Schema::component("NewPerson")]);

        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({
                "$id": "Person",
                "type": "object",
                "properties": {"age": {"type": "integer"}},
                "required": ["age"],
                "allOf": [{"$ref": "#/components/schemas/NewPerson"}]
            })
        );
    }

    #[test]
    fn walk_reaches_nested_references() {
        let mut schema = Schema::array_of(Schema {
            one_of: Some(vec![Schema::typed("string"), Schema::component("Order")]),
            ..Schema::default()
        });
        let mut targets = Vec::new();
        schema.walk(&mut |s| targets.extend(s.component_target().map(str::to_string)));
        assert_eq!(targets, vec!["Order"]);

        schema.walk_mut(&mut |s| {
            if s.component_target() == Some("Order") {
                *s = Schema::component("Purchase");
            }
        });
        let one_of = schema.items.as_ref().unwrap().one_of.as_ref().unwrap();
        assert_eq!(one_of[1].component_target(), Some("Purchase"));
    }
}
