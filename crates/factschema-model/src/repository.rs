//! Read-only model sources.
//!
//! The compiler never talks to storage directly; a caller hands it whatever
//! implements [`ModelRepository`] and gets back one consistent snapshot.

use std::path::{Path, PathBuf};

use crate::document::ModelDocument;
use crate::error::ModelError;
use crate::model::ModelSnapshot;

pub trait ModelRepository {
    fn load_snapshot(&self) -> Result<ModelSnapshot, ModelError>;
}

impl ModelRepository for ModelDocument {
    fn load_snapshot(&self) -> Result<ModelSnapshot, ModelError> {
        self.resolve()
    }
}

impl ModelRepository for ModelSnapshot {
    fn load_snapshot(&self) -> Result<ModelSnapshot, ModelError> {
        Ok(self.clone())
    }
}

/// A model document stored as JSON on disk.
#[derive(Debug, Clone)]
pub struct JsonModelFile {
    path: PathBuf,
}

impl JsonModelFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonModelFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_document(&self) -> Result<ModelDocument, ModelError> {
        let text = std::fs::read_to_string(&self.path)?;
        ModelDocument::from_json(&text)
    }
}

impl ModelRepository for JsonModelFile {
    fn load_snapshot(&self) -> Result<ModelSnapshot, ModelError> {
        let doc = self.read_document()?;
        tracing::debug!(
            path = %self.path.display(),
            nouns = doc.nouns.len(),
            fact_types = doc.fact_types.len(),
            "loaded model document"
        );
        doc.resolve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn json_file_round_trips_through_snapshot() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{"nouns": [{{"name": "Person"}}, {{"name": "Age", "objectType": "value", "valueType": "integer"}}],
                "factTypes": [{{"readings": ["Person has Age"], "relationship": "many-to-one"}}]}}"#
        )
        .expect("write");

        let repo = JsonModelFile::new(file.path());
        let snapshot = repo.load_snapshot().expect("load");
        assert_eq!(snapshot.nouns.len(), 2);
        assert_eq!(snapshot.fact_types[0].arity(), 2);
        assert_eq!(snapshot.load_snapshot().expect("clone"), snapshot);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = JsonModelFile::new(dir.path().join("absent.json"))
            .load_snapshot()
            .unwrap_err();
        assert!(matches!(err, ModelError::Io(_)));
    }
}
