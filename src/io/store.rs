use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access document store {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("document store {path:?} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// A source document kept for later runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: u64,
    pub filename: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Listing entry without the document text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentMeta {
    pub id: u64,
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    next_id: u64,
    documents: Vec<StoredDocument>,
}

/// JSON-file backed document store with auto-incrementing ids
#[derive(Debug)]
pub struct DocumentStore {
    path: PathBuf,
    file: StoreFile,
}

impl DocumentStore {
    /// Open the store at `path`, starting empty if the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let file = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreFile {
                next_id: 1,
                documents: vec![],
            },
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        debug!("Opened document store {:?} ({} documents)", path, file.documents.len());
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn add(&mut self, filename: impl Into<String>, text: impl Into<String>) -> Result<u64, StoreError> {
        let id = self.file.next_id.max(1);
        self.file.next_id = id + 1;
        self.file.documents.push(StoredDocument {
            id,
            filename: filename.into(),
            text: text.into(),
            created_at: Utc::now(),
        });
        self.persist()?;
        Ok(id)
    }

    /// Metadata of every document, newest first
    pub fn list(&self) -> Vec<DocumentMeta> {
        let mut metas: Vec<DocumentMeta> = self
            .file
            .documents
            .iter()
            .map(|d| DocumentMeta {
                id: d.id,
                filename: d.filename.clone(),
                created_at: d.created_at,
            })
            .collect();
        metas.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        metas
    }

    pub fn get(&self, id: u64) -> Option<&StoredDocument> {
        self.file.documents.iter().find(|d| d.id == id)
    }

    /// Remove a document; removing a missing id is a no-op
    pub fn delete(&mut self, id: u64) -> Result<(), StoreError> {
        let before = self.file.documents.len();
        self.file.documents.retain(|d| d.id != id);
        if self.file.documents.len() != before {
            self.persist()?;
        }
        Ok(())
    }

    fn persist(&self) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&self.file).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, json).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_get_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = DocumentStore::open(&path).unwrap();
        let first = store.add("cardio.txt", "Heart").unwrap();
        let second = store.add("renal.txt", "Kidney").unwrap();
        assert_eq!((first, second), (1, 2));

        let reopened = DocumentStore::open(&path).unwrap();
        assert_eq!(reopened.path(), path.as_path());
        let doc = reopened.get(2).unwrap();
        assert_eq!(doc.filename, "renal.txt");
        assert_eq!(doc.text, "Kidney");
        assert!(reopened.get(3).is_none());
    }

    #[test]
    fn test_list_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DocumentStore::open(dir.path().join("store.json")).unwrap();
        store.add("a.txt", "a").unwrap();
        store.add("b.txt", "b").unwrap();
        store.add("c.txt", "c").unwrap();

        let names: Vec<String> = store.list().into_iter().map(|m| m.filename).collect();
        assert_eq!(names, vec!["c.txt", "b.txt", "a.txt"]);
    }

    #[test]
    fn test_delete_and_ids_are_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        let mut store = DocumentStore::open(&path).unwrap();
        store.add("a.txt", "a").unwrap();
        let id = store.add("b.txt", "b").unwrap();

        store.delete(id).unwrap();
        store.delete(99).unwrap();
        assert!(store.get(id).is_none());

        let mut reopened = DocumentStore::open(&path).unwrap();
        assert_eq!(reopened.list().len(), 1);
        assert_eq!(reopened.add("c.txt", "c").unwrap(), 3);
    }

    #[test]
    fn test_corrupt_store_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            DocumentStore::open(&path),
            Err(StoreError::Corrupt { .. })
        ));
    }
}
