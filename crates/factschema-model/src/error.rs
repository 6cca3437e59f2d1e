use thiserror::Error;

/// Model-integrity and loading failures. All of them abort a compilation.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("duplicate noun name `{0}`")]
    DuplicateNoun(String),

    #[error("duplicate fact type `{0}`")]
    DuplicateFactType(String),

    #[error("unknown noun `{name}` referenced by {context}")]
    UnknownNoun { name: String, context: String },

    #[error("unknown fact type `{name}` referenced by {context}")]
    UnknownFactType { name: String, context: String },

    #[error("fact type `{fact_type}` has no role `{selector}`")]
    UnknownRole { fact_type: String, selector: String },

    #[error("reading `{reading}` of fact type `{fact_type}` mentions `{noun}`, which plays no role in it")]
    ReadingOutOfScope {
        fact_type: String,
        reading: String,
        noun: String,
    },

    #[error("fact type `{fact_type}` declares relationship `{relationship}` but has {arity} roles (expected 2)")]
    RelationshipArity {
        fact_type: String,
        relationship: String,
        arity: usize,
    },

    #[error("example for fact type `{fact_type}` has {got} values for {arity} roles")]
    ExampleArity {
        fact_type: String,
        got: usize,
        arity: usize,
    },

    #[error("constraint #{index} spans no roles")]
    EmptySpan { index: usize },

    #[error("supertype cycle through {}", .0.join(" -> "))]
    SupertypeCycle(Vec<String>),

    #[error("identification cycle through {}", .0.join(" -> "))]
    IdentificationCycle(Vec<String>),

    #[error("identification through supertypes cycles through {}", .0.join(" -> "))]
    InheritedIdentificationCycle(Vec<String>),

    #[error("invalid noun pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to read model: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed model document: {0}")]
    Json(#[from] serde_json::Error),
}
