/// Batch and record file loading
/// Reads batch documents and offline record fixtures from JSON files

use crate::db::OrderRecord;
use serde::de::DeserializeOwned;
use shared::Document;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Duplicate document id in {path}: {id}")]
    DuplicateDocument { path: PathBuf, id: String },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, InputError> {
    let raw = fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&raw).map_err(|source| InputError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the documents of a batch (a JSON array of documents)
pub fn load_documents(path: &Path) -> Result<Vec<Document>, InputError> {
    let documents: Vec<Document> = read_json(path)?;

    let mut seen = std::collections::HashSet::new();
    for document in &documents {
        if !seen.insert(document.id.as_str()) {
            return Err(InputError::DuplicateDocument {
                path: path.to_path_buf(),
                id: document.id.clone(),
            });
        }
    }

    debug!("Loaded {} documents from {}", documents.len(), path.display());
    Ok(documents)
}

/// Load backend rows for an offline run (a JSON array of records)
pub fn load_records(path: &Path) -> Result<Vec<OrderRecord>, InputError> {
    let records: Vec<OrderRecord> = read_json(path)?;
    debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_documents() {
        let file = write_temp(
            r#"[
                {"id": "doc-1", "customer_number": "12345", "invoice_number": "INV-01"},
                {"id": "doc-2", "customer_number": "67890", "reject_reason": "blank page"}
            ]"#,
        );

        let documents = load_documents(file.path()).unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0], Document::new("doc-1", "12345", "INV-01"));
        assert_eq!(documents[1].invoice_number, "");
        assert_eq!(documents[1].reject_reason.as_deref(), Some("blank page"));
    }

    #[test]
    fn test_duplicate_document_ids() {
        let file = write_temp(r#"[{"id": "doc-1"}, {"id": "doc-1"}]"#);
        assert!(matches!(
            load_documents(file.path()),
            Err(InputError::DuplicateDocument { ref id, .. }) if id == "doc-1"
        ));
    }

    #[test]
    fn test_malformed_batch() {
        let file = write_temp("{not json");
        assert!(matches!(load_documents(file.path()), Err(InputError::Parse { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = load_records(Path::new("/nonexistent/records.json"));
        assert!(matches!(result, Err(InputError::Io { .. })));
    }

    #[test]
    fn test_load_records() {
        let file = write_temp(r#"[{"customer_number": "12345", "invoice_number": "INV-01"}]"#);
        let records = load_records(file.path()).unwrap();
        assert_eq!(records, vec![OrderRecord::new("12345", "INV-01")]);
    }
}
