//! Typed OpenAPI 3.1 document.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::Contact;
use crate::schema::{Schema, SchemaMap};

pub const OPENAPI_VERSION: &str = "3.1.0";
pub const JSON_MEDIA_TYPE: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    pub openapi: String,
    pub info: Info,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servers: Option<Value>,
    pub paths: BTreeMap<String, PathItem>,
    pub components: Components,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Info {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    pub schemas: SchemaMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
}

impl PathItem {
    pub fn operations(&self) -> impl Iterator<Item = &Operation> + '_ {
        [&self.get, &self.post, &self.patch, &self.delete]
            .into_iter()
            .flatten()
    }

    fn operations_mut(&mut self) -> impl Iterator<Item = &mut Operation> + '_ {
        [
            &mut self.get,
            &mut self.post,
            &mut self.patch,
            &mut self.delete,
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub summary: String,
    pub operation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: BTreeMap<String, Response>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<BTreeMap<String, MediaType>>,
}

impl Response {
    /// A response whose JSON body is `schema`, or no body at all.
    pub fn json(description: impl Into<String>, schema: Option<Schema>) -> Self {
        Response {
            description: description.into(),
            content: schema.map(json_content),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Schema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    pub content: BTreeMap<String, MediaType>,
}

impl RequestBody {
    pub fn json(schema: Schema) -> Self {
        RequestBody {
            content: json_content(schema),
        }
    }
}

fn json_content(schema: Schema) -> BTreeMap<String, MediaType> {
    BTreeMap::from([(JSON_MEDIA_TYPE.to_string(), MediaType { schema })])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Path,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: Schema,
}

impl OpenApiDocument {
    /// Visits every top-level schema in components, parameters, request and
    /// response bodies, labelled with where it sits in the document.
    pub fn for_each_schema(&self, f: &mut impl FnMut(&str, &Schema)) {
        for (key, schema) in &self.components.schemas {
            f(&format!("components.schemas.{key}"), schema);
        }
        for (path, item) in &self.paths {
            for parameter in item.parameters.iter().flatten() {
                f(path, &parameter.schema);
            }
            for operation in item.operations() {
                let location = format!("{path} ({})", operation.operation_id);
                for parameter in operation.parameters.iter().flatten() {
                    f(&location, &parameter.schema);
                }
                if let Some(body) = &operation.request_body {
                    for media in body.content.values() {
                        f(&location, &media.schema);
                    }
                }
                for response in operation.responses.values() {
                    for media in response.content.iter().flat_map(|c| c.values()) {
                        f(&location, &media.schema);
                    }
                }
            }
        }
    }

    pub fn for_each_schema_mut(&mut self, f: &mut impl FnMut(&mut Schema)) {
        for schema in self.components.schemas.values_mut() {
            f(schema);
        }
        for item in self.paths.values_mut() {
            for parameter in item.parameters.iter_mut().flatten() {
                f(&mut parameter.schema);
            }
            for operation in item.operations_mut() {
                for parameter in operation.parameters.iter_mut().flatten() {
                    f(&mut parameter.schema);
                }
                if let Some(body) = &mut operation.request_body {
                    for media in body.content.values_mut() {
                        f(&mut media.schema);
                    }
                }
                for response in operation.responses.values_mut() {
                    for media in response.content.iter_mut().flat_map(|c| c.values_mut()) {
                        f(&mut media.schema);
                    }
                }
            }
        }
    }
}
