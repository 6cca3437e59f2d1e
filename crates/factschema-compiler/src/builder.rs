//! Schema builder.
//!
//! Each resource gets three linked tiers:
//!
//! - `Update<K>`: the mutable property set, `allOf` its supertype's `Update`
//! - `New<K>`: `allOf` `Update<K>` (plus the supertype's `New`), carries the
//!   fields required on create
//! - `<K>`: `allOf` `New<K>` (plus the supertype's base), the read shape
//!
//! Classified fact types then attach properties to the owning tier.

use factschema_model::{
    ConstraintKind, FactTypeId, ModelError, ModelSnapshot, NounPattern, NounRef, ObjectType,
    RoleId, Token, ValueType,
};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::ops::Range;

use crate::classify::{classify, compound_span, FactShape};
use crate::error::CompileError;
use crate::naming::{
    capitalize, extract_property_name, pluralize, property_name, schema_key,
    strip_subject_prefix,
};
use crate::schema::{Schema, SchemaMap};

/// Component keys the path synthesizer adds on its own.
pub const RESERVED_KEYS: [&str; 2] = ["ListModel", "ErrorModel"];

/// Prefixes of the keys derived from a resource key.
pub const TIER_PREFIXES: [&str; 3] = ["New", "Update", "Where"];

/// A noun or fact type that became a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub subject: NounRef,
    /// Identifying property names in reference-scheme (or role) order.
    pub identifying: Vec<String>,
    pub super_key: Option<String>,
}

/// Builder output: the unflattened schema map plus what is known about each
/// resource key.
#[derive(Debug, Clone, Default)]
pub struct BuiltSchemas {
    pub schemas: SchemaMap,
    pub resources: BTreeMap<String, Resource>,
}

impl BuiltSchemas {
    /// Identifying properties of `key`, inherited from the nearest supertype
    /// that declares some.
    pub fn identifying_properties(&self, key: &str) -> Vec<String> {
        let mut cursor = self.resources.get(key);
        for _ in 0..=self.resources.len() {
            let Some(resource) = cursor else { break };
            if !resource.identifying.is_empty() {
                return resource.identifying.clone();
            }
            cursor = resource
                .super_key
                .as_deref()
                .and_then(|k| self.resources.get(k));
        }
        Vec::new()
    }
}

struct PropertySpec<'a> {
    object_name: &'a str,
    name: Option<String>,
    description: Option<String>,
    required: bool,
    property: Schema,
    example: Option<Value>,
}

pub struct SchemaBuilder<'m> {
    snapshot: &'m ModelSnapshot,
    pattern: NounPattern,
    schemas: SchemaMap,
    subjects: BTreeMap<String, NounRef>,
    identifying: BTreeMap<String, Vec<String>>,
}

/// Classifies every fact type and builds the schema map.
///
/// Phases run in a fixed order (associations, functional, array-valued,
/// unary, independent) and fact types within a phase by `order`, then id.
pub fn build(snapshot: &ModelSnapshot) -> Result<BuiltSchemas, CompileError> {
    let shapes = snapshot
        .ordered_fact_types()
        .into_iter()
        .map(|id| classify(snapshot, id).map(|shape| (id, shape)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut builder = SchemaBuilder::new(snapshot)?;
    for (id, shape) in &shapes {
        if let FactShape::Association { .. } = shape {
            builder.ensure_table(NounRef::FactType(*id))?;
        }
    }
    for (id, shape) in &shapes {
        if let FactShape::Functional { owner, value } = shape {
            builder.functional(*id, *owner, *value)?;
        }
    }
    for (id, shape) in &shapes {
        if let FactShape::ArrayValued { owner, item } = shape {
            builder.array_valued(*id, *owner, *item)?;
        }
    }
    for (id, shape) in &shapes {
        if let FactShape::Unary { role } = shape {
            builder.unary(*id, *role)?;
        }
    }
    for (id, shape) in &shapes {
        if let FactShape::Independent = shape {
            builder.independent(*id)?;
        }
    }
    builder.finish()
}

impl<'m> SchemaBuilder<'m> {
    pub fn new(snapshot: &'m ModelSnapshot) -> Result<Self, CompileError> {
        let pattern = NounPattern::new(snapshot.noun_names()).map_err(ModelError::from)?;
        Ok(SchemaBuilder {
            snapshot,
            pattern,
            schemas: SchemaMap::new(),
            subjects: BTreeMap::new(),
            identifying: BTreeMap::new(),
        })
    }

    fn table_mut(&mut self, key: &str) -> &mut Schema {
        self.schemas.entry(key.to_string()).or_default()
    }

    // ========================================================================
    // Tables
    // ========================================================================

    /// Materializes the three tiers of `subject` once and returns its key.
    pub fn ensure_table(&mut self, subject: NounRef) -> Result<String, CompileError> {
        let snapshot = self.snapshot;
        let title = snapshot.name_of(subject).to_string();
        let key = schema_key(&title);
        if let Some(existing) = self.subjects.get(&key) {
            if *existing != subject {
                return Err(CompileError::SchemaKeyCollision {
                    key,
                    first: snapshot.name_of(*existing).to_string(),
                    second: title,
                });
            }
            return Ok(key);
        }
        self.subjects.insert(key.clone(), subject);
        tracing::debug!(key = %key, "creating resource tiers");

        let update_key = format!("Update{key}");
        let new_key = format!("New{key}");
        let mut update = Schema {
            id: Some(update_key.clone()),
            title: Some(title.clone()),
            description: snapshot.description_of(subject).map(str::to_string),
            ..Schema::default()
        };
        let mut new = Schema {
            id: Some(new_key.clone()),
            all_of: Some(vec![Schema::component(&update_key)]),
            ..Schema::default()
        };
        let mut base = Schema {
            id: Some(key.clone()),
            all_of: Some(vec![Schema::component(&new_key)]),
            ..Schema::default()
        };

        if let NounRef::FactType(id) = subject {
            if update.description.is_none() {
                update.description = snapshot
                    .fact_type(id)
                    .primary_reading()
                    .map(|r| r.text.replacen("- ", " ", 1));
            }
        }
        if let Some(example) = snapshot.json_example_for(subject) {
            for tier in [&mut update, &mut new, &mut base] {
                tier.examples = Some(vec![example.clone()]);
            }
        }

        let super_type = snapshot.super_type_of(subject);
        match super_type {
            Some(parent) => {
                let parent_key = schema_key(snapshot.name_of(parent));
                update.all_of = Some(vec![Schema::component(&format!("Update{parent_key}"))]);
                if let Some(all_of) = &mut new.all_of {
                    all_of.push(Schema::component(&format!("New{parent_key}")));
                }
                if let Some(all_of) = &mut base.all_of {
                    all_of.push(Schema::component(&parent_key));
                }
            }
            None => update.schema_type = Some("object".to_string()),
        }

        self.schemas.insert(update_key, update);
        self.schemas.insert(new_key, new);
        self.schemas.insert(key.clone(), base);

        match subject {
            NounRef::Noun(id) => {
                for identifier in &snapshot.noun(id).reference_scheme {
                    let object = NounRef::Noun(*identifier);
                    self.add_identifying_property(&key, &title, object, true)?;
                }
            }
            NounRef::FactType(id) => {
                let span = compound_span(snapshot, snapshot.fact_type(id)).unwrap_or_default();
                for role in &snapshot.fact_type(id).roles {
                    let object = snapshot.role(*role).player;
                    self.add_identifying_property(&key, &title, object, span.contains(role))?;
                }
            }
        }

        if let Some(parent) = super_type {
            self.ensure_table(parent)?;
        }
        Ok(key)
    }

    fn add_identifying_property(
        &mut self,
        key: &str,
        title: &str,
        object: NounRef,
        required: bool,
    ) -> Result<(), CompileError> {
        let snapshot = self.snapshot;
        let object_name = snapshot.name_of(object);
        let property = self.create_property(object)?;
        let name = self.set_table_property(
            key,
            title,
            PropertySpec {
                object_name,
                name: None,
                description: Some(format!("{title} is uniquely identified by {object_name}")),
                required,
                property,
                example: None,
            },
        );
        self.identifying.entry(key.to_string()).or_default().push(name);
        Ok(())
    }

    /// Property schema for a role played by `object`.
    ///
    /// Value types map to a typed scalar with their facets. Anything else is
    /// a `oneOf` between its inline identifier shape and a `$ref` to its own
    /// resource, which is created on demand.
    pub fn create_property(&mut self, object: NounRef) -> Result<Schema, CompileError> {
        let snapshot = self.snapshot;
        let mut scheme = snapshot.identifying_players(object);
        let mut value_type = value_type_of(snapshot, object);
        let mut cursor = snapshot.super_type_of(object);
        while scheme.is_empty() && value_type.is_none() {
            let Some(parent) = cursor else { break };
            scheme = snapshot.identifying_players(parent);
            value_type = value_type_of(snapshot, parent);
            cursor = snapshot.super_type_of(parent);
        }
        if scheme.is_empty() && value_type.is_none() && is_value_noun(snapshot, object) {
            value_type = Some(ValueType::String);
        }

        if let Some(value_type) = value_type {
            let mut property = Schema::typed(value_type.as_str());
            if let NounRef::Noun(id) = object {
                apply_facets(&mut property, snapshot.noun(id));
            }
            return Ok(property);
        }

        let inline = match scheme.as_slice() {
            [] => Schema::default(),
            [single] => self.create_property(*single)?,
            players => {
                let mut composite = Schema::typed("object");
                for player in players {
                    let name = property_name(snapshot.name_of(*player));
                    let member = self.create_property(*player)?;
                    composite.properties_mut().insert(name.clone(), member);
                    composite.require(&name);
                }
                composite
            }
        };
        let key = self.ensure_table(object)?;
        Ok(Schema {
            one_of: Some(vec![inline, Schema::component(&key)]),
            ..Schema::default()
        })
    }

    /// Puts a property on `Update<key>` and returns its final name.
    ///
    /// A redundant subject prefix is stripped from the name. Required
    /// properties land on `New<key>`, except `id`, which is required on the
    /// read tier. Example values seed `Update<key>.examples[0]`.
    fn set_table_property(&mut self, key: &str, subject: &str, spec: PropertySpec<'_>) -> String {
        let mut property = spec.property;
        if spec.description.is_some() {
            property.description = spec.description;
        }
        let name = spec
            .name
            .unwrap_or_else(|| property_name(spec.object_name));
        let name = strip_subject_prefix(&name, subject);
        let example = spec
            .example
            .map(|value| coerce_example(&value, property.schema_type.as_deref()));

        let update_key = format!("Update{key}");
        self.table_mut(&update_key)
            .properties_mut()
            .insert(name.clone(), property);

        if spec.required {
            let target = if name == "id" {
                key.to_string()
            } else {
                format!("New{key}")
            };
            self.table_mut(&target).require(&name);
        }

        if let Some(example) = example {
            let examples = self
                .table_mut(&update_key)
                .examples
                .get_or_insert_with(Vec::new);
            if examples.is_empty() {
                examples.push(Value::Object(Default::default()));
            }
            if let Some(Value::Object(sample)) = examples.first_mut() {
                sample.insert(name.clone(), example);
            }
        }
        name
    }

    // ========================================================================
    // Fact type processors
    // ========================================================================

    fn predicate(&self, id: FactTypeId) -> Result<Vec<Token>, CompileError> {
        let fact_type = self.snapshot.fact_type(id);
        let reading = fact_type
            .primary_reading()
            .ok_or_else(|| CompileError::MissingReading {
                fact_type: fact_type.title().to_string(),
            })?;
        Ok(self.pattern.tokenize(&reading.text).0)
    }

    fn functional(
        &mut self,
        id: FactTypeId,
        owner: RoleId,
        value: RoleId,
    ) -> Result<(), CompileError> {
        let snapshot = self.snapshot;
        let subject = snapshot.role(owner).player;
        let object = snapshot.role(value).player;
        let key = self.ensure_table(subject)?;

        let mut tokens = self.predicate(id)?;
        let subject_name = snapshot.name_of(subject);
        let object_name = snapshot.name_of(object);
        let span = find_predicate_object(
            snapshot.fact_type(id).title(),
            &mut tokens,
            subject_name,
            Some(object_name),
            None,
        )?;
        let object_reading = capitalize_span(&mut tokens, span);
        let required = snapshot.role_has(owner, ConstraintKind::MR)
            || snapshot.role_has(value, ConstraintKind::MR);

        let property = self.create_property(object)?;
        self.set_table_property(
            &key,
            subject_name,
            PropertySpec {
                object_name,
                name: Some(extract_property_name(&object_reading)),
                description: Some(join(&tokens)),
                required,
                property,
                example: example_value(snapshot, id, value),
            },
        );
        Ok(())
    }

    fn array_valued(
        &mut self,
        id: FactTypeId,
        owner: RoleId,
        item: RoleId,
    ) -> Result<(), CompileError> {
        let snapshot = self.snapshot;
        let subject = snapshot.role(owner).player;
        let object = snapshot.role(item).player;
        let plural = snapshot.plural_of(object).filter(|p| !p.is_empty());

        let mut tokens = self.predicate(id)?;
        let span = find_predicate_object(
            snapshot.fact_type(id).title(),
            &mut tokens,
            snapshot.name_of(subject),
            Some(snapshot.name_of(object)),
            plural,
        )?;
        let object_reading = capitalize_span(&mut tokens, span);
        let mut name = extract_property_name(&object_reading);
        if plural.is_none() {
            name = pluralize(&name);
        }

        let key = self.ensure_table(subject)?;
        let items = self.create_property(object)?;
        let property = Schema::array_of(items).with_description(join(&tokens));
        self.table_mut(&format!("Update{key}"))
            .properties_mut()
            .insert(name, property);
        Ok(())
    }

    fn unary(&mut self, id: FactTypeId, role: RoleId) -> Result<(), CompileError> {
        let snapshot = self.snapshot;
        let subject = snapshot.role(role).player;
        let subject_name = snapshot.name_of(subject);
        let title = snapshot.fact_type(id).title();

        let mut tokens = self.predicate(id)?;
        let span = find_predicate_object(title, &mut tokens, subject_name, None, None)?;
        let object_reading: Vec<&str> = tokens[span].iter().map(|t| t.text.as_str()).collect();
        if object_reading.is_empty() {
            return Err(CompileError::EmptyPredicate {
                fact_type: title.to_string(),
                predicate: join(&tokens),
            });
        }
        let name = extract_property_name(&object_reading);

        let key = self.ensure_table(subject)?;
        self.set_table_property(
            &key,
            subject_name,
            PropertySpec {
                object_name: subject_name,
                name: Some(name),
                description: Some(join(&tokens)),
                required: snapshot.role_has(role, ConstraintKind::MR),
                property: Schema::typed("boolean"),
                example: example_value(snapshot, id, role),
            },
        );
        Ok(())
    }

    fn independent(&mut self, id: FactTypeId) -> Result<(), CompileError> {
        let snapshot = self.snapshot;
        for player in snapshot.players(id) {
            if !is_value_noun(snapshot, player) {
                self.ensure_table(player)?;
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<BuiltSchemas, CompileError> {
        let snapshot = self.snapshot;
        for (key, subject) in &self.subjects {
            if RESERVED_KEYS.contains(&key.as_str()) {
                return Err(CompileError::SchemaKeyCollision {
                    key: key.clone(),
                    first: "a generated component".to_string(),
                    second: snapshot.name_of(*subject).to_string(),
                });
            }
            for prefix in TIER_PREFIXES {
                let tier = format!("{prefix}{key}");
                if let Some(other) = self.subjects.get(&tier) {
                    return Err(CompileError::SchemaKeyCollision {
                        key: tier,
                        first: snapshot.name_of(*subject).to_string(),
                        second: snapshot.name_of(*other).to_string(),
                    });
                }
            }
        }

        let mut identifying = self.identifying;
        let resources = self
            .subjects
            .into_iter()
            .map(|(key, subject)| {
                let resource = Resource {
                    subject,
                    identifying: identifying.remove(&key).unwrap_or_default(),
                    super_key: snapshot
                        .super_type_of(subject)
                        .map(|parent| schema_key(snapshot.name_of(parent))),
                };
                (key, resource)
            })
            .collect();

        tracing::debug!(schemas = self.schemas.len(), "schema map built");
        Ok(BuiltSchemas {
            schemas: self.schemas,
            resources,
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn value_type_of(snapshot: &ModelSnapshot, r: NounRef) -> Option<ValueType> {
    match r {
        NounRef::Noun(id) => snapshot.noun(id).value_type,
        NounRef::FactType(_) => None,
    }
}

fn is_value_noun(snapshot: &ModelSnapshot, r: NounRef) -> bool {
    matches!(r, NounRef::Noun(id) if snapshot.noun(id).object_type == ObjectType::Value)
}

fn apply_facets(property: &mut Schema, noun: &factschema_model::Noun) {
    let facets = &noun.facets;
    property.format = facets.format.clone();
    property.pattern = facets.pattern.clone();
    if let Some(list) = &facets.enum_values {
        let values = list
            .split(',')
            .map(|v| match v.trim() {
                "null" => {
                    property.nullable = Some(true);
                    Value::Null
                }
                v => Value::String(v.to_string()),
            })
            .collect();
        property.enum_values = Some(values);
    }
    property.min_length = facets.min_length;
    property.max_length = facets.max_length;
    property.minimum = facets.minimum.clone();
    property.maximum = facets.maximum.clone();
    property.exclusive_minimum = facets.exclusive_minimum.clone();
    property.exclusive_maximum = facets.exclusive_maximum.clone();
    property.multiple_of = facets.multiple_of.clone();
}

/// Locates the object-side span of a tokenized reading.
///
/// With an object, the span runs from the token after the subject (or the
/// start, when the object comes first) but is narrowed to begin at a
/// hyphen-bound modifier or the object itself; a hyphen-bound object extends
/// it to the end. Without an object (unary) it is everything after the
/// subject. A declared plural replaces the object token.
fn find_predicate_object(
    fact_type: &str,
    tokens: &mut [Token],
    subject: &str,
    object: Option<&str>,
    plural: Option<&str>,
) -> Result<Range<usize>, CompileError> {
    let predicate = || tokens.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" ");
    let subject_index = tokens.iter().position(|t| t.names(subject)).ok_or_else(|| {
        CompileError::SubjectNotInReading {
            fact_type: fact_type.to_string(),
            subject: subject.to_string(),
            predicate: predicate(),
        }
    })?;
    let object_index = match object {
        Some(object) => Some(
            tokens
                .iter()
                .enumerate()
                .position(|(i, t)| i != subject_index && t.names(object))
                .ok_or_else(|| CompileError::ObjectNotInReading {
                    fact_type: fact_type.to_string(),
                    object: object.to_string(),
                    predicate: predicate(),
                })?,
        ),
        None => None,
    };

    if let (Some(plural), Some(index)) = (plural, object_index) {
        tokens[index] = Token::noun(capitalize(&factschema_model::reading::join_continuations(
            plural,
        )));
    }

    let len = tokens.len();
    let (mut begin, end) = match object_index {
        None => (subject_index + 1, len),
        Some(index) if subject_index < index => (
            subject_index + 1,
            if tokens[index].is_bound() { len } else { index + 1 },
        ),
        Some(index) => (0, index + 1),
    };
    if let Some(index) = object_index {
        while begin < len && begin != index && !tokens[begin].is_bound() {
            begin += 1;
        }
    }
    Ok(begin..end.max(begin))
}

/// Capitalizes the span's tokens in place (dropping binding hyphens) and
/// returns them.
fn capitalize_span(tokens: &mut [Token], span: Range<usize>) -> Vec<String> {
    tokens[span]
        .iter_mut()
        .map(|token| {
            token.text = capitalize(token.bare());
            token.text.clone()
        })
        .collect()
}

fn join(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn example_value(snapshot: &ModelSnapshot, id: FactTypeId, role: RoleId) -> Option<Value> {
    let position = snapshot.fact_type(id).roles.iter().position(|r| *r == role)?;
    snapshot
        .examples_for(id)?
        .values
        .get(position)
        .filter(|v| !v.is_null())
        .cloned()
}

/// Coerces a string example to the property's scalar type.
fn coerce_example(value: &Value, schema_type: Option<&str>) -> Value {
    let Value::String(text) = value else {
        return value.clone();
    };
    let text = text.trim();
    match schema_type {
        Some("integer") => text.parse::<i64>().map(Value::from).ok(),
        Some("number") => text
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        Some("boolean") => Some(Value::Bool(text == "true")),
        _ => None,
    }
    .unwrap_or_else(|| value.clone())
}
