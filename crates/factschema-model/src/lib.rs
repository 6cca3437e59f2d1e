//! ORM (Object-Role Modeling) metamodel.
//!
//! Nouns, fact types, roles, readings and constraints as an arena-indexed
//! [`ModelSnapshot`], the author-facing [`ModelDocument`] it is resolved from,
//! and the predicate tokenizer the compiler uses to name properties.

pub mod digest;
pub mod document;
pub mod error;
pub mod model;
pub mod reading;
pub mod repository;
pub mod validate;

pub use digest::{digest_bytes, snapshot_digest, Fnv1a64};
pub use document::{
    ConstraintDecl, ExampleDecl, FactTypeDecl, JsonExampleDecl, ModelDocument, NounDecl,
    ReadingDecl, RoleRelationship, RolePosition, RoleSelector,
};
pub use error::ModelError;
pub use model::*;
pub use reading::{tokenize, NounPattern, Predicate, Token};
pub use repository::{JsonModelFile, ModelRepository};
