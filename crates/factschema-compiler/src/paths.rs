//! OpenAPI path synthesis.
//!
//! Every resource gets a collection path (`/plural`) carrying `list` and
//! `create`, and an item path (`/plural/{id...}`) carrying `read`, `update`
//! and `delete`, each gated by the resource's permissions. Bodies are wrapped
//! in the configured envelope; error responses are patched copies of the
//! configured error template.

use factschema_model::{ModelSnapshot, Permission};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::builder::BuiltSchemas;
use crate::config::GeneratorConfig;
use crate::dedup::{dedup_tiers, Renames};
use crate::error::CompileError;
use crate::naming::{article, capitalize, resource_plural, schema_key};
use crate::openapi::{Operation, Parameter, ParameterLocation, PathItem, RequestBody, Response};
use crate::schema::Schema;
use crate::template::{fill_template, patch_error};

pub const LIST_MODEL_KEY: &str = "ListModel";
pub const ERROR_MODEL_KEY: &str = "ErrorModel";

const RANGE_OPERATORS: [(&str, &str); 4] = [
    ("greater_than", "must be greater than"),
    ("greater_than_equal", "must be greater than or equal"),
    ("less_than", "must be less than"),
    ("less_than_equal", "must be less than or equal"),
];

/// Effective permissions of a resource: its own list (or the defaults)
/// unioned with the global list.
pub fn permissions(own: Option<&[Permission]>, global: &[Permission]) -> Vec<Permission> {
    let mut all: Vec<Permission> = own.unwrap_or(Permission::DEFAULTS.as_slice()).to_vec();
    for permission in global {
        if !all.contains(permission) {
            all.push(*permission);
        }
    }
    all
}

/// Builds the paths of every resource, adding `Where<K>` filter schemas and
/// collapsing each resource's tiers once its operations are known.
pub fn synthesize(
    snapshot: &ModelSnapshot,
    config: &GeneratorConfig,
    built: &mut BuiltSchemas,
    renames: &mut Renames,
) -> Result<BTreeMap<String, PathItem>, CompileError> {
    let mut synthesizer = PathSynthesizer {
        config,
        paths: BTreeMap::new(),
        base_paths: BTreeMap::new(),
    };

    let keys: Vec<String> = built.resources.keys().cloned().collect();
    for key in keys {
        let Some(resource) = built.resources.get(&key) else {
            continue;
        };
        let Some(update) = built.schemas.get(&format!("Update{key}")).cloned() else {
            continue;
        };
        let subject = resource.subject;
        let identifying = built.identifying_properties(&key);

        let permissions = permissions(
            snapshot.permissions_of(subject),
            &config.global_permissions,
        );
        let title = update.title.clone().unwrap_or_else(|| key.clone());
        let plural = resource_plural(snapshot.plural_of(subject), &title);
        let context = ResourceContext {
            key: &key,
            title: &title,
            plural: &plural,
            permissions: &permissions,
            is_id: identifying.len() == 1 && identifying[0] == "id",
        };

        if context.allows(Permission::List) {
            built
                .schemas
                .insert(format!("Where{key}"), where_schema(&key, &update));
        }
        synthesizer.collection(&context)?;
        synthesizer.item(&context, &update, &identifying);

        let patch_used = context.allows(Permission::Update);
        let post_used = context.allows(Permission::Create);
        dedup_tiers(&mut built.schemas, &key, patch_used, post_used, renames);
    }

    Ok(synthesizer.paths)
}

struct ResourceContext<'r> {
    key: &'r str,
    title: &'r str,
    plural: &'r str,
    permissions: &'r [Permission],
    is_id: bool,
}

impl ResourceContext<'_> {
    fn allows(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Plural-named resources (`Staff`) drop the article.
    fn noun_is_plural(&self) -> bool {
        self.plural == self.title
    }

    fn lower_key(&self) -> String {
        self.key.to_lowercase()
    }
}

struct PathSynthesizer<'c> {
    config: &'c GeneratorConfig,
    paths: BTreeMap<String, PathItem>,
    base_paths: BTreeMap<String, String>,
}

impl PathSynthesizer<'_> {
    // ========================================================================
    // Collection path
    // ========================================================================

    fn collection(&mut self, r: &ResourceContext<'_>) -> Result<(), CompileError> {
        let base_path = format!("/{}", schema_key(r.plural).to_lowercase());
        if let Some(first) = self.base_paths.get(&base_path) {
            return Err(CompileError::PathCollision {
                path: base_path,
                first: first.clone(),
                second: r.key.to_string(),
            });
        }
        self.base_paths.insert(base_path.clone(), r.key.to_string());

        let list = r.allows(Permission::List).then(|| self.list(r));
        let create = r.allows(Permission::Create).then(|| self.create(r));
        if list.is_none() && create.is_none() {
            return Ok(());
        }
        self.paths.insert(
            base_path,
            PathItem {
                parameters: Some(vec![depth_parameter()]),
                get: list,
                post: create,
                ..PathItem::default()
            },
        );
        Ok(())
    }

    fn list(&self, r: &ResourceContext<'_>) -> Operation {
        let items = self.wrap(Schema::array_of(Schema::component(r.key)));
        let body = Schema {
            all_of: Some(vec![items, Schema::component(LIST_MODEL_KEY)]),
            ..Schema::default()
        };
        let mut responses = self.error_responses(r, &[]);
        responses.insert(
            "200".to_string(),
            Response::json(format!("{} Found", r.plural), Some(body)),
        );

        Operation {
            summary: format!("Get {}", r.plural),
            operation_id: format!("get-{}-list", schema_key(r.plural).to_lowercase()),
            parameters: Some(list_parameters(r.key)),
            request_body: None,
            responses,
        }
    }

    fn create(&self, r: &ResourceContext<'_>) -> Operation {
        let (verb, done) = if r.is_id {
            ("Create", "Created")
        } else {
            ("Add", "Added")
        };
        let article = if r.noun_is_plural() { "" } else { "a " };

        let mut responses =
            self.error_responses(r, &[(400, "Missing Required Information".to_string())]);
        responses.insert(
            "200".to_string(),
            Response::json(
                format!("{} {done}", r.title),
                Some(self.wrap(Schema::component(r.key))),
            ),
        );

        Operation {
            summary: format!("{verb} {article}new {}", r.title),
            operation_id: format!("post-{}", r.lower_key()),
            parameters: None,
            request_body: Some(RequestBody::json(Schema::component(&format!("New{}", r.key)))),
            responses,
        }
    }

    // ========================================================================
    // Item path
    // ========================================================================

    fn item(&mut self, r: &ResourceContext<'_>, update: &Schema, identifying: &[String]) {
        let read = r.allows(Permission::Read);
        let update_allowed = r.allows(Permission::Update);
        let delete = r.allows(Permission::Delete);
        if !(read || update_allowed || delete) {
            return;
        }

        let mut parameters = id_parameters(update, identifying);
        let base_path = format!("/{}", schema_key(r.plural).to_lowercase());
        let segments: Vec<String> = parameters.iter().map(|p| format!("{{{}}}", p.name)).collect();
        let path = format!("{base_path}/{}", segments.join("/"));
        parameters.push(depth_parameter());

        let not_found = [(404, format!("{} Not Found", r.title))];
        let item = PathItem {
            parameters: Some(parameters),
            get: read.then(|| self.read(r, &not_found)),
            patch: update_allowed.then(|| self.update(r, &not_found)),
            delete: delete.then(|| self.delete(r, &not_found)),
            post: None,
        };
        self.paths.insert(path, item);
    }

    fn read(&self, r: &ResourceContext<'_>, errors: &[(u16, String)]) -> Operation {
        let article = if r.noun_is_plural() {
            String::new()
        } else {
            format!("{} ", article(r.title))
        };
        let mut responses = self.error_responses(r, errors);
        responses.insert(
            "200".to_string(),
            Response::json(
                format!("{} Found", r.title),
                Some(self.wrap(Schema::component(r.key))),
            ),
        );
        Operation {
            summary: format!("Retrieve {article}{}", r.title),
            operation_id: format!("get-{}", r.lower_key()),
            parameters: None,
            request_body: None,
            responses,
        }
    }

    fn update(&self, r: &ResourceContext<'_>, errors: &[(u16, String)]) -> Operation {
        let article = if r.noun_is_plural() { "" } else { "an " };
        let mut responses = self.error_responses(r, errors);
        responses.insert(
            "200".to_string(),
            Response::json(
                format!("{} Updated", r.title),
                Some(self.wrap(Schema::component(r.key))),
            ),
        );
        Operation {
            summary: format!("Update {article}existing {}", r.title),
            operation_id: format!("patch-{}", r.lower_key()),
            parameters: None,
            request_body: Some(RequestBody::json(Schema::component(&format!(
                "Update{}",
                r.key
            )))),
            responses,
        }
    }

    fn delete(&self, r: &ResourceContext<'_>, errors: &[(u16, String)]) -> Operation {
        let article = if r.noun_is_plural() { "" } else { "an " };
        let envelope = fill_template(
            None,
            self.config.wrapper_template(),
            &self.config.replacement_field_path,
        );
        let mut responses = self.error_responses(r, errors);
        responses.insert(
            "200".to_string(),
            Response::json(format!("{} Deleted", r.title), envelope),
        );
        Operation {
            summary: format!("Delete {article}existing {}", r.title),
            operation_id: format!("delete-{}", r.lower_key()),
            parameters: None,
            request_body: None,
            responses,
        }
    }

    // ========================================================================
    // Envelopes and errors
    // ========================================================================

    fn wrap(&self, payload: Schema) -> Schema {
        match self.config.wrapper_template() {
            Some(wrapper) => {
                fill_template(Some(payload), Some(wrapper), &self.config.replacement_field_path)
                    .unwrap_or_default()
            }
            None => payload,
        }
    }

    /// Error responses for one operation. Nothing is emitted without an
    /// error template; 401 and 429 follow `login` and `rateLimit`.
    fn error_responses(
        &self,
        r: &ResourceContext<'_>,
        extra: &[(u16, String)],
    ) -> BTreeMap<String, Response> {
        let mut responses = BTreeMap::new();
        let Some(template) = self.config.error_template() else {
            return responses;
        };

        let mut errors: Vec<(u16, String)> = Vec::new();
        if r.allows(Permission::Login) {
            errors.push((401, "Unauthorized".to_string()));
        }
        if r.allows(Permission::RateLimit) {
            errors.push((429, "Too Many Requests".to_string()));
        }
        errors.extend(extra.iter().cloned());

        for (code, message) in errors {
            responses.insert(
                code.to_string(),
                Response::json(message.clone(), Some(self.error_schema(template, &message, code))),
            );
        }
        responses
    }

    fn error_schema(&self, template: &Value, message: &str, code: u16) -> Schema {
        let example = patch_error(
            template,
            &self.config.error_message_path,
            &self.config.error_code_path,
            message,
            code,
        );
        Schema {
            examples: Some(vec![example]),
            ..Schema::component(ERROR_MODEL_KEY)
        }
    }
}

// ============================================================================
// Parameters and filters
// ============================================================================

fn depth_parameter() -> Parameter {
    Parameter {
        name: "depth".to_string(),
        location: ParameterLocation::Query,
        required: Some(false),
        description: Some(
            "The number of levels of related objects to include in the response".to_string(),
        ),
        schema: Schema::typed("integer"),
    }
}

fn list_parameters(key: &str) -> Vec<Parameter> {
    vec![
        Parameter {
            name: "sort".to_string(),
            location: ParameterLocation::Query,
            required: None,
            description: Some(
                "Name of a top-level field to sort by, ascending; prefix with \"-\" to sort descending"
                    .to_string(),
            ),
            schema: Schema::typed("string"),
        },
        Parameter {
            name: "limit".to_string(),
            location: ParameterLocation::Query,
            required: None,
            description: Some("Limit number of results, default 10".to_string()),
            schema: Schema::typed("number"),
        },
        Parameter {
            name: "where".to_string(),
            location: ParameterLocation::Query,
            required: None,
            description: Some("Search for results fitting criteria".to_string()),
            schema: Schema::component(&format!("Where{key}")),
        },
    ]
}

/// Path parameters for the identifying properties of the flattened update
/// tier. `oneOf` identifiers are unpacked: a composite inline shape
/// contributes each of its members, a scalar one contributes itself. A member
/// name shared by two composites is qualified with its owning property
/// (`buildingCode`, `wingCode`). With no identifiers the item is addressed by
/// a string `id`.
fn id_parameters(update: &Schema, identifying: &[String]) -> Vec<Parameter> {
    let mut found: Vec<IdMember> = Vec::new();
    let properties = update.properties.as_ref();
    for name in identifying {
        if let Some(property) = properties.and_then(|p| p.get(name)) {
            unpack_identifier(name, None, property, None, &mut found);
        }
    }
    if found.is_empty() {
        found.push(IdMember {
            name: "id".to_string(),
            owner: None,
            schema: Schema::typed("string"),
        });
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for member in &found {
        *counts.entry(member.name.as_str()).or_default() += 1;
    }
    let names: Vec<String> = found
        .iter()
        .map(|member| match &member.owner {
            Some(owner) if counts[member.name.as_str()] > 1 => {
                format!("{owner}{}", capitalize(&member.name))
            }
            _ => member.name.clone(),
        })
        .collect();

    found
        .into_iter()
        .zip(names)
        .map(|(member, name)| Parameter {
            name,
            location: ParameterLocation::Path,
            required: Some(true),
            description: member.schema.description.clone(),
            schema: Schema::typed(member.schema.schema_type.as_deref().unwrap_or("string")),
        })
        .collect()
}

struct IdMember {
    name: String,
    /// Property of the composite this member was unpacked from.
    owner: Option<String>,
    schema: Schema,
}

fn unpack_identifier(
    name: &str,
    owner: Option<&str>,
    property: &Schema,
    inherited: Option<&String>,
    out: &mut Vec<IdMember>,
) {
    let description = property.description.as_ref().or(inherited);
    match property.one_of.as_ref().and_then(|options| options.first()) {
        Some(inline) => match &inline.properties {
            Some(members) => {
                for (member, schema) in members {
                    unpack_identifier(member, Some(name), schema, description, out);
                }
            }
            None => unpack_identifier(name, owner, inline, description, out),
        },
        None => {
            let mut schema = property.clone();
            schema.description = description.cloned();
            out.push(IdMember {
                name: name.to_string(),
                owner: owner.map(str::to_string),
                schema,
            });
        }
    }
}

/// `Where<K>`: one operator object per property, plus recursive `and`/`or`.
/// Range operators only apply to numeric and date properties.
fn where_schema(key: &str, update: &Schema) -> Schema {
    let nested = || Schema::array_of(Schema::component(&format!("Where{key}")));
    let mut schema = Schema::typed("object");
    let properties = schema.properties_mut();
    properties.insert("and".to_string(), nested());
    properties.insert("or".to_string(), nested());

    for (name, property) in update.properties.iter().flatten() {
        let label = property.title.as_deref().unwrap_or(name);
        let typed = |description: String| Schema {
            schema_type: property.schema_type.clone(),
            description: Some(description),
            ..Schema::default()
        };
        let text = |description: String| Schema::typed("string").with_description(description);

        let mut operators = Schema::typed("object");
        let ops = operators.properties_mut();
        ops.insert("equals".into(), typed(format!("The {label} must be exactly equal.")));
        ops.insert(
            "not_equals".into(),
            typed(format!("Matches every record where the {label} is not equal.")),
        );
        if supports_ranges(property) {
            for (operator, phrase) in RANGE_OPERATORS {
                ops.insert(operator.into(), typed(format!("The {label} {phrase}.")));
            }
        }
        ops.insert(
            "like".into(),
            text("Case-insensitive; every word must be present, in any order.".to_string()),
        );
        ops.insert(
            "contains".into(),
            text(format!("Must contain the {label} entered, case-insensitive.")),
        );
        ops.insert(
            "in".into(),
            text(format!("The {label} must be one of the comma-delimited values.")),
        );
        ops.insert(
            "not_in".into(),
            text(format!("The {label} must not be one of the comma-delimited values.")),
        );
        ops.insert(
            "all".into(),
            text(format!("The {label} must contain every comma-delimited value.")),
        );
        ops.insert(
            "exists".into(),
            Schema::typed("boolean")
                .with_description(format!("Whether the {label} exists.")),
        );
        properties.insert(name.clone(), operators);
    }
    schema
}

fn supports_ranges(property: &Schema) -> bool {
    matches!(property.schema_type.as_deref(), Some("number" | "integer"))
        || matches!(property.format.as_deref(), Some("date" | "date-time"))
}
