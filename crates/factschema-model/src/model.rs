//! Arena-indexed ORM metamodel snapshot.
//!
//! Every entity lives in a flat vector and is addressed by its position.
//! Ids are assigned in declaration order when a [`crate::ModelDocument`] is
//! resolved, so iterating a snapshot is stable across runs.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

pub type Name = String;

// ============================================================================
// Ids
// ============================================================================

macro_rules! arena_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

arena_id!(NounId);
arena_id!(FactTypeId);
arena_id!(RoleId);
arena_id!(ConstraintId);

/// The player of a role: an object type, or a fact type objectified as a noun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NounRef {
    Noun(NounId),
    FactType(FactTypeId),
}

// ============================================================================
// Nouns
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    #[default]
    Entity,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Integer => "integer",
            ValueType::Boolean => "boolean",
            ValueType::Object => "object",
            ValueType::Array => "array",
        }
    }
}

/// JSON-Schema facets carried by value nouns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueFacets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Comma-separated enumeration, e.g. `"low, medium, high"`.
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
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
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    Create,
    Read,
    Update,
    Delete,
    List,
    Versioned,
    Login,
    RateLimit,
}

impl Permission {
    /// Applied when a noun or fact type does not list its own permissions.
    pub const DEFAULTS: [Permission; 6] = [
        Permission::Create,
        Permission::Read,
        Permission::Update,
        Permission::List,
        Permission::Login,
        Permission::RateLimit,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Noun {
    pub id: NounId,
    pub name: Name,
    pub plural: Option<String>,
    pub description: Option<String>,
    pub object_type: ObjectType,
    pub value_type: Option<ValueType>,
    pub facets: ValueFacets,
    /// Ordered identifying nouns.
    pub reference_scheme: Vec<NounId>,
    pub super_type: Option<NounId>,
    pub permissions: Option<Vec<Permission>>,
}

// ============================================================================
// Fact types, roles, readings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub text: String,
    pub http_verb: HttpVerb,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactType {
    pub id: FactTypeId,
    pub name: Option<Name>,
    pub description: Option<String>,
    pub plural: Option<String>,
    pub readings: Vec<Reading>,
    /// Roles in predicate order; the length is the arity.
    pub roles: Vec<RoleId>,
    pub order: Option<i64>,
    pub permissions: Option<Vec<Permission>>,
}

impl FactType {
    /// Display name: the explicit name, else the primary reading.
    pub fn title(&self) -> &str {
        self.name
            .as_deref()
            .or_else(|| self.readings.first().map(|r| r.text.as_str()))
            .unwrap_or("")
    }

    pub fn arity(&self) -> usize {
        self.roles.len()
    }

    pub fn primary_reading(&self) -> Option<&Reading> {
        self.readings.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub fact_type: FactTypeId,
    pub player: NounRef,
}

// ============================================================================
// Constraints
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Uniqueness
    UC,
    /// Mandatory role
    MR,
    /// Subset
    SS,
    /// Exclusion
    XC,
    /// Equality
    EQ,
    /// Inclusive-or
    OR,
    /// Exclusive-or
    XO,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Modality {
    #[default]
    Alethic,
    Deontic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub id: ConstraintId,
    pub kind: ConstraintKind,
    pub modality: Modality,
}

/// Applies one constraint to an ordered set of roles, possibly across fact types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSpan {
    pub constraint: ConstraintId,
    pub roles: Vec<RoleId>,
}

/// A concrete tuple filling each role of a fact type, positional by role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleGraph {
    pub fact_type: FactTypeId,
    pub values: Vec<Value>,
}

/// A verbatim JSON example for the schema family of a noun or fact type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonExample {
    pub subject: NounRef,
    pub example: Value,
}

// ============================================================================
// Snapshot
// ============================================================================

/// A consistent, read-only view of one model for one compilation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub nouns: Vec<Noun>,
    pub fact_types: Vec<FactType>,
    pub roles: Vec<Role>,
    pub constraints: Vec<Constraint>,
    pub spans: Vec<ConstraintSpan>,
    pub examples: Vec<ExampleGraph>,
    pub json_examples: Vec<JsonExample>,
}

impl ModelSnapshot {
    pub fn noun(&self, id: NounId) -> &Noun {
        &self.nouns[id.index()]
    }

    pub fn fact_type(&self, id: FactTypeId) -> &FactType {
        &self.fact_types[id.index()]
    }

    pub fn role(&self, id: RoleId) -> &Role {
        &self.roles[id.index()]
    }

    pub fn constraint(&self, id: ConstraintId) -> &Constraint {
        &self.constraints[id.index()]
    }

    pub fn noun_by_name(&self, name: &str) -> Option<&Noun> {
        self.nouns.iter().find(|n| n.name == name)
    }

    pub fn fact_type_by_title(&self, title: &str) -> Option<&FactType> {
        self.fact_types.iter().find(|f| f.title() == title)
    }

    pub fn name_of(&self, r: NounRef) -> &str {
        match r {
            NounRef::Noun(id) => &self.noun(id).name,
            NounRef::FactType(id) => self.fact_type(id).title(),
        }
    }

    pub fn description_of(&self, r: NounRef) -> Option<&str> {
        match r {
            NounRef::Noun(id) => self.noun(id).description.as_deref(),
            NounRef::FactType(id) => self.fact_type(id).description.as_deref(),
        }
    }

    pub fn plural_of(&self, r: NounRef) -> Option<&str> {
        match r {
            NounRef::Noun(id) => self.noun(id).plural.as_deref(),
            NounRef::FactType(id) => self.fact_type(id).plural.as_deref(),
        }
    }

    pub fn permissions_of(&self, r: NounRef) -> Option<&[Permission]> {
        match r {
            NounRef::Noun(id) => self.noun(id).permissions.as_deref(),
            NounRef::FactType(id) => self.fact_type(id).permissions.as_deref(),
        }
    }

    pub fn super_type_of(&self, r: NounRef) -> Option<NounRef> {
        match r {
            NounRef::Noun(id) => self.noun(id).super_type.map(NounRef::Noun),
            NounRef::FactType(_) => None,
        }
    }

    /// Identifying players: the reference scheme of a noun, the role players
    /// of an objectified fact type.
    pub fn identifying_players(&self, r: NounRef) -> Vec<NounRef> {
        match r {
            NounRef::Noun(id) => self
                .noun(id)
                .reference_scheme
                .iter()
                .copied()
                .map(NounRef::Noun)
                .collect(),
            NounRef::FactType(id) => self
                .fact_type(id)
                .roles
                .iter()
                .map(|r| self.role(*r).player)
                .collect(),
        }
    }

    pub fn players(&self, fact_type: FactTypeId) -> impl Iterator<Item = NounRef> + '_ {
        self.fact_type(fact_type)
            .roles
            .iter()
            .map(move |r| self.role(*r).player)
    }

    /// Spans that include `role`.
    pub fn spans_on_role(&self, role: RoleId) -> impl Iterator<Item = &ConstraintSpan> + '_ {
        self.spans.iter().filter(move |s| s.roles.contains(&role))
    }

    /// Spans of `kind` that include `role`.
    pub fn spans_of_kind_on_role(
        &self,
        role: RoleId,
        kind: ConstraintKind,
    ) -> impl Iterator<Item = &ConstraintSpan> + '_ {
        self.spans_on_role(role)
            .filter(move |s| self.constraint(s.constraint).kind == kind)
    }

    pub fn role_has(&self, role: RoleId, kind: ConstraintKind) -> bool {
        self.spans_of_kind_on_role(role, kind).next().is_some()
    }

    /// Fact types with a role played by `fact_type` objectified as a noun.
    pub fn objectifying_uses(&self, fact_type: FactTypeId) -> impl Iterator<Item = &Role> + '_ {
        self.roles
            .iter()
            .filter(move |r| r.player == NounRef::FactType(fact_type))
    }

    pub fn is_objectified(&self, fact_type: FactTypeId) -> bool {
        self.objectifying_uses(fact_type).next().is_some()
    }

    /// Every name the tokenizer should treat as atomic: all nouns plus the
    /// fact types that are played as nouns somewhere.
    pub fn noun_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.nouns.iter().map(|n| n.name.as_str()).collect();
        for ft in &self.fact_types {
            if self.is_objectified(ft.id) {
                names.push(ft.title());
            }
        }
        names
    }

    pub fn examples_for(&self, fact_type: FactTypeId) -> Option<&ExampleGraph> {
        self.examples.iter().find(|e| e.fact_type == fact_type)
    }

    pub fn json_example_for(&self, subject: NounRef) -> Option<&Value> {
        self.json_examples
            .iter()
            .find(|e| e.subject == subject)
            .map(|e| &e.example)
    }

    /// Fact type ids ordered by explicit `order`, then by id.
    pub fn ordered_fact_types(&self) -> Vec<FactTypeId> {
        let mut ids: Vec<FactTypeId> = self.fact_types.iter().map(|f| f.id).collect();
        ids.sort_by_key(|id| (self.fact_type(*id).order.unwrap_or(i64::MAX), *id));
        ids
    }
}
