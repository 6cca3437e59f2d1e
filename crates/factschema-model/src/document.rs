//! Author-facing model document and its resolution into a [`ModelSnapshot`].
//!
//! The document refers to nouns and fact types by name. Resolution assigns
//! arena ids in declaration order, derives missing roles from readings,
//! expands relationship shorthands into uniqueness constraints, and rejects
//! inconsistent models before any compilation starts.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::ModelError;
use crate::model::*;
use crate::reading::NounPattern;
use crate::validate;

// ============================================================================
// Declarations
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDocument {
    #[serde(default)]
    pub nouns: Vec<NounDecl>,
    #[serde(default)]
    pub fact_types: Vec<FactTypeDecl>,
    #[serde(default)]
    pub constraints: Vec<ConstraintDecl>,
    #[serde(default)]
    pub examples: Vec<ExampleDecl>,
    #[serde(default)]
    pub json_examples: Vec<JsonExampleDecl>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NounDecl {
    pub name: Name,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub object_type: ObjectType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    #[serde(flatten)]
    pub facets: ValueFacets,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_scheme: Vec<Name>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_type: Option<Name>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<Permission>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactTypeDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Name>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,
    #[serde(default)]
    pub readings: Vec<ReadingDecl>,
    /// Role players by name; derived from the first reading when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Name>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<RoleRelationship>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<Permission>>,
}

impl FactTypeDecl {
    fn title(&self) -> &str {
        self.name
            .as_deref()
            .or_else(|| self.readings.first().map(|r| r.text()))
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadingDecl {
    Text(String),
    Full {
        text: String,
        #[serde(default, rename = "httpVerb")]
        http_verb: HttpVerb,
        #[serde(default = "default_language")]
        language: String,
    },
}

fn default_language() -> String {
    "en".to_string()
}

impl ReadingDecl {
    pub fn text(&self) -> &str {
        match self {
            ReadingDecl::Text(text) | ReadingDecl::Full { text, .. } => text,
        }
    }

    fn resolve(&self) -> Reading {
        match self {
            ReadingDecl::Text(text) => Reading {
                text: text.clone(),
                http_verb: HttpVerb::default(),
                language: default_language(),
            },
            ReadingDecl::Full {
                text,
                http_verb,
                language,
            } => Reading {
                text: text.clone(),
                http_verb: *http_verb,
                language: language.clone(),
            },
        }
    }
}

/// Cardinality shorthand for binary fact types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoleRelationship {
    ManyToOne,
    OneToMany,
    ManyToMany,
    OneToOne,
}

impl RoleRelationship {
    pub fn as_str(self) -> &'static str {
        match self {
            RoleRelationship::ManyToOne => "many-to-one",
            RoleRelationship::OneToMany => "one-to-many",
            RoleRelationship::ManyToMany => "many-to-many",
            RoleRelationship::OneToOne => "one-to-one",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintDecl {
    pub kind: ConstraintKind,
    #[serde(default)]
    pub modality: Modality,
    pub roles: Vec<RoleSelector>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSelector {
    pub fact_type: Name,
    pub role: RolePosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RolePosition {
    Index(usize),
    Player(Name),
}

impl std::fmt::Display for RolePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RolePosition::Index(i) => write!(f, "#{i}"),
            RolePosition::Player(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleDecl {
    pub fact_type: Name,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonExampleDecl {
    pub noun: Name,
    pub example: Value,
}

// ============================================================================
// Resolution
// ============================================================================

impl ModelDocument {
    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn resolve(&self) -> Result<ModelSnapshot, ModelError> {
        Resolver::new(self)?.run()
    }
}

struct Resolver<'a> {
    doc: &'a ModelDocument,
    nouns_by_name: HashMap<&'a str, NounId>,
    fact_types_by_title: HashMap<&'a str, FactTypeId>,
    snapshot: ModelSnapshot,
}

impl<'a> Resolver<'a> {
    fn new(doc: &'a ModelDocument) -> Result<Self, ModelError> {
        let mut nouns_by_name = HashMap::new();
        for (i, noun) in doc.nouns.iter().enumerate() {
            if nouns_by_name
                .insert(noun.name.as_str(), NounId(i as u32))
                .is_some()
            {
                return Err(ModelError::DuplicateNoun(noun.name.clone()));
            }
        }

        let mut fact_types_by_title = HashMap::new();
        for (i, ft) in doc.fact_types.iter().enumerate() {
            if fact_types_by_title
                .insert(ft.title(), FactTypeId(i as u32))
                .is_some()
            {
                return Err(ModelError::DuplicateFactType(ft.title().to_string()));
            }
        }

        Ok(Resolver {
            doc,
            nouns_by_name,
            fact_types_by_title,
            snapshot: ModelSnapshot::default(),
        })
    }

    fn run(mut self) -> Result<ModelSnapshot, ModelError> {
        self.resolve_nouns()?;
        self.resolve_fact_types()?;
        check_relationship_arity(&self.snapshot, self.doc)?;
        self.resolve_constraints()?;
        self.expand_relationships();
        self.resolve_examples()?;
        validate::check_snapshot(&self.snapshot)?;
        Ok(self.snapshot)
    }

    fn noun_id(&self, name: &str, context: impl FnOnce() -> String) -> Result<NounId, ModelError> {
        self.nouns_by_name
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::UnknownNoun {
                name: name.to_string(),
                context: context(),
            })
    }

    fn fact_type_id(
        &self,
        title: &str,
        context: impl FnOnce() -> String,
    ) -> Result<FactTypeId, ModelError> {
        self.fact_types_by_title
            .get(title)
            .copied()
            .ok_or_else(|| ModelError::UnknownFactType {
                name: title.to_string(),
                context: context(),
            })
    }

    /// Nouns shadow fact types of the same name.
    fn player(&self, name: &str, context: impl FnOnce() -> String) -> Result<NounRef, ModelError> {
        if let Some(id) = self.nouns_by_name.get(name) {
            return Ok(NounRef::Noun(*id));
        }
        match self.fact_types_by_title.get(name) {
            Some(id) => Ok(NounRef::FactType(*id)),
            None => Err(ModelError::UnknownNoun {
                name: name.to_string(),
                context: context(),
            }),
        }
    }

    fn resolve_nouns(&mut self) -> Result<(), ModelError> {
        let doc = self.doc;
        for (i, decl) in doc.nouns.iter().enumerate() {
            let context = || format!("noun `{}`", decl.name);
            let reference_scheme = decl
                .reference_scheme
                .iter()
                .map(|n| self.noun_id(n, context))
                .collect::<Result<Vec<_>, _>>()?;
            let super_type = decl
                .super_type
                .as_deref()
                .map(|n| self.noun_id(n, context))
                .transpose()?;

            self.snapshot.nouns.push(Noun {
                id: NounId(i as u32),
                name: decl.name.clone(),
                plural: decl.plural.clone(),
                description: decl.description.clone(),
                object_type: decl.object_type,
                value_type: decl.value_type,
                facets: decl.facets.clone(),
                reference_scheme,
                super_type,
                permissions: decl.permissions.clone(),
            });
        }
        Ok(())
    }

    fn resolve_fact_types(&mut self) -> Result<(), ModelError> {
        let doc = self.doc;
        // Roles may be played by named fact types, so they join the alternation.
        let pattern = NounPattern::new(
            doc
                .nouns
                .iter()
                .map(|n| n.name.as_str())
                .chain(doc.fact_types.iter().filter_map(|f| f.name.as_deref())),
        )?;

        for (i, decl) in doc.fact_types.iter().enumerate() {
            let id = FactTypeId(i as u32);
            let title = decl.title();
            let readings: Vec<Reading> = decl.readings.iter().map(ReadingDecl::resolve).collect();

            let players: Vec<NounRef> = match &decl.roles {
                Some(names) => names
                    .iter()
                    .map(|n| self.player(n, || format!("fact type `{title}`")))
                    .collect::<Result<_, _>>()?,
                None => match readings.first() {
                    Some(reading) => pattern
                        .tokenize(&reading.text)
                        .nouns()
                        .map(|n| self.player(n, || format!("reading `{}`", reading.text)))
                        .collect::<Result<_, _>>()?,
                    None => Vec::new(),
                },
            };

            for reading in &readings {
                for noun in pattern.tokenize(&reading.text).nouns() {
                    let player = self.player(noun, || format!("reading `{}`", reading.text))?;
                    if !players.contains(&player) {
                        return Err(ModelError::ReadingOutOfScope {
                            fact_type: title.to_string(),
                            reading: reading.text.clone(),
                            noun: noun.to_string(),
                        });
                    }
                }
            }

            let mut roles = Vec::with_capacity(players.len());
            for player in players {
                let role_id = RoleId(self.snapshot.roles.len() as u32);
                self.snapshot.roles.push(Role {
                    id: role_id,
                    fact_type: id,
                    player,
                });
                roles.push(role_id);
            }

            self.snapshot.fact_types.push(FactType {
                id,
                name: decl.name.clone(),
                description: decl.description.clone(),
                plural: decl.plural.clone(),
                readings,
                roles,
                order: decl.order,
                permissions: decl.permissions.clone(),
            });
        }
        Ok(())
    }

    fn select_role(&self, selector: &RoleSelector) -> Result<RoleId, ModelError> {
        let ft_id = self.fact_type_id(&selector.fact_type, || "constraint".to_string())?;
        let ft = self.snapshot.fact_type(ft_id);
        let unknown = || ModelError::UnknownRole {
            fact_type: selector.fact_type.clone(),
            selector: selector.role.to_string(),
        };
        match &selector.role {
            RolePosition::Index(i) => ft.roles.get(*i).copied().ok_or_else(unknown),
            RolePosition::Player(name) => ft
                .roles
                .iter()
                .copied()
                .find(|r| self.snapshot.name_of(self.snapshot.role(*r).player) == name)
                .ok_or_else(unknown),
        }
    }

    fn push_constraint(&mut self, kind: ConstraintKind, modality: Modality, roles: Vec<RoleId>) {
        let id = ConstraintId(self.snapshot.constraints.len() as u32);
        self.snapshot.constraints.push(Constraint { id, kind, modality });
        self.snapshot.spans.push(ConstraintSpan {
            constraint: id,
            roles,
        });
    }

    fn resolve_constraints(&mut self) -> Result<(), ModelError> {
        let doc = self.doc;
        for (index, decl) in doc.constraints.iter().enumerate() {
            if decl.roles.is_empty() {
                return Err(ModelError::EmptySpan { index });
            }
            let roles = decl
                .roles
                .iter()
                .map(|s| self.select_role(s))
                .collect::<Result<Vec<_>, _>>()?;
            self.push_constraint(decl.kind, decl.modality, roles);
        }
        Ok(())
    }

    /// Shorthands only apply when neither role already carries a uniqueness
    /// constraint; explicit constraints always win.
    fn expand_relationships(&mut self) {
        let doc = self.doc;
        for (i, decl) in doc.fact_types.iter().enumerate() {
            let Some(relationship) = decl.relationship else {
                continue;
            };
            let roles = self.snapshot.fact_types[i].roles.clone();
            if roles.len() != 2 {
                continue;
            }
            if roles
                .iter()
                .any(|r| self.snapshot.role_has(*r, ConstraintKind::UC))
            {
                continue;
            }
            let uc = |roles: Vec<RoleId>| (ConstraintKind::UC, Modality::Alethic, roles);
            let expanded = match relationship {
                RoleRelationship::ManyToOne => vec![uc(vec![roles[0]])],
                RoleRelationship::OneToMany => vec![uc(vec![roles[1]])],
                RoleRelationship::ManyToMany => vec![uc(roles.clone())],
                RoleRelationship::OneToOne => vec![uc(vec![roles[0]]), uc(vec![roles[1]])],
            };
            for (kind, modality, roles) in expanded {
                self.push_constraint(kind, modality, roles);
            }
        }
    }

    fn resolve_examples(&mut self) -> Result<(), ModelError> {
        let doc = self.doc;
        for decl in &doc.examples {
            let fact_type = self.fact_type_id(&decl.fact_type, || "example".to_string())?;
            let arity = self.snapshot.fact_type(fact_type).arity();
            if decl.values.len() != arity {
                return Err(ModelError::ExampleArity {
                    fact_type: decl.fact_type.clone(),
                    got: decl.values.len(),
                    arity,
                });
            }
            self.snapshot.examples.push(ExampleGraph {
                fact_type,
                values: decl.values.clone(),
            });
        }
        for decl in &doc.json_examples {
            let subject = self.player(&decl.noun, || "JSON example".to_string())?;
            self.snapshot.json_examples.push(JsonExample {
                subject,
                example: decl.example.clone(),
            });
        }
        Ok(())
    }
}

/// Relationship shorthands only make sense on binary fact types.
fn check_relationship_arity(
    snapshot: &ModelSnapshot,
    doc: &ModelDocument,
) -> Result<(), ModelError> {
    for (decl, ft) in doc.fact_types.iter().zip(&snapshot.fact_types) {
        if let Some(relationship) = decl.relationship {
            if ft.arity() != 2 {
                return Err(ModelError::RelationshipArity {
                    fact_type: ft.title().to_string(),
                    relationship: relationship.as_str().to_string(),
                    arity: ft.arity(),
                });
            }
        }
    }
    Ok(())
}
