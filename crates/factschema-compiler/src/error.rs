use factschema_model::ModelError;
use thiserror::Error;

/// Fatal compilation failures. A compilation either yields a complete
/// document or one of these; partial output is never returned.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("fact type `{fact_type}` has no reading")]
    MissingReading { fact_type: String },

    #[error("subject `{subject}` not found in predicate `{predicate}` of fact type `{fact_type}`")]
    SubjectNotInReading {
        fact_type: String,
        subject: String,
        predicate: String,
    },

    #[error("object `{object}` not found in predicate `{predicate}` of fact type `{fact_type}`")]
    ObjectNotInReading {
        fact_type: String,
        object: String,
        predicate: String,
    },

    #[error("reading `{predicate}` of fact type `{fact_type}` names no property after its subject")]
    EmptyPredicate { fact_type: String, predicate: String },

    #[error("fact type `{fact_type}` matches no shape: {reason}")]
    Unclassified { fact_type: String, reason: String },

    #[error("schema key `{key}` is claimed by both `{first}` and `{second}`")]
    SchemaKeyCollision {
        key: String,
        first: String,
        second: String,
    },

    #[error("path `{path}` is claimed by both `{first}` and `{second}`")]
    PathCollision {
        path: String,
        first: String,
        second: String,
    },

    #[error("allOf chain of `{0}` does not terminate")]
    InheritanceCycle(String),

    #[error("`{reference}` in {location} does not resolve to a component schema")]
    DanglingReference { reference: String, location: String },
}
