//! Generator configuration.
//!
//! Every field is optional in JSON; missing fields take the defaults below.

use factschema_model::Permission;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_VERSION: &str = "1.0";
pub const DEFAULT_REPLACEMENT_FIELD_PATH: &str = "data";
pub const DEFAULT_ERROR_MESSAGE_PATH: &str = "error.message";
pub const DEFAULT_ERROR_CODE_PATH: &str = "error.code";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorConfig {
    pub title: Option<String>,
    pub version: Option<String>,
    pub contact: Contact,
    pub description: Option<String>,
    /// Copied verbatim into the document's `servers`.
    pub servers: Option<Value>,
    /// Unioned with every resource's own permissions.
    pub global_permissions: Vec<Permission>,
    /// Dotted path inside the wrapper template where payloads go.
    pub replacement_field_path: String,
    pub global_wrapper_template: Option<Value>,
    pub error_template: Option<Value>,
    pub error_message_path: String,
    pub error_code_path: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            title: None,
            version: Some(DEFAULT_VERSION.to_string()),
            contact: Contact::default(),
            description: None,
            servers: None,
            global_permissions: vec![Permission::Login, Permission::RateLimit],
            replacement_field_path: DEFAULT_REPLACEMENT_FIELD_PATH.to_string(),
            global_wrapper_template: None,
            error_template: None,
            error_message_path: DEFAULT_ERROR_MESSAGE_PATH.to_string(),
            error_code_path: DEFAULT_ERROR_CODE_PATH.to_string(),
        }
    }
}

impl GeneratorConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The wrapper template, unless it is absent or an empty object.
    pub fn wrapper_template(&self) -> Option<&Value> {
        self.global_wrapper_template
            .as_ref()
            .filter(|t| !is_blank(t))
    }

    pub fn error_template(&self) -> Option<&Value> {
        self.error_template.as_ref().filter(|t| !is_blank(t))
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Contact {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.name.is_none() && self.url.is_none()
    }
}
