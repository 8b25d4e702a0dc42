//! Document store backed by JSON files in a `.trellis` directory.
//!
//! ```text
//! .trellis/
//!   config.toml
//!   instances.json      widget instance key -> list id
//!   lists/<id>.json     one document per list
//! ```
//!
//! Every write takes the directory lock and replaces the file atomically, so
//! concurrent writers degrade to last-writer-wins.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::io::lock::StoreLock;
use crate::model::{Group, ListId, RawDocument, new_id};
use crate::ops::normalize::is_valid_id;
use crate::sync::{DocumentStore, StoreError};

pub const LISTS_DIR: &str = "lists";
const INSTANCES_FILE: &str = "instances.json";

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open the store in `trellis_dir`, creating the lists directory if needed.
    pub fn open(trellis_dir: &Path) -> Result<Self, StoreError> {
        let lists = trellis_dir.join(LISTS_DIR);
        fs::create_dir_all(&lists).map_err(|source| StoreError::WriteError {
            path: lists,
            source,
        })?;
        Ok(FileStore {
            dir: trellis_dir.to_path_buf(),
        })
    }

    pub fn lists_dir(&self) -> PathBuf {
        self.dir.join(LISTS_DIR)
    }

    /// Path of the document file for `id`.
    pub fn document_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_id(id) {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.lists_dir().join(format!("{id}.json")))
    }

    fn read(&self, id: &str) -> Result<Option<RawDocument>, StoreError> {
        let path = self.document_path(id)?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::ReadError { path, source }),
        };
        let value: Value =
            serde_json::from_str(&text).map_err(|source| StoreError::ParseError { path, source })?;
        Ok(Some(raw_document(id, value)))
    }

    fn write(&self, doc: &RawDocument) -> Result<(), StoreError> {
        let path = self.document_path(&doc.id)?;
        let json = serde_json::to_string_pretty(doc)?;
        atomic_write(&path, json.as_bytes()).map_err(|source| StoreError::WriteError { path, source })
    }

    fn read_instances(&self) -> Result<IndexMap<String, ListId>, StoreError> {
        let path = self.dir.join(INSTANCES_FILE);
        match fs::read_to_string(&path) {
            Ok(text) => {
                serde_json::from_str(&text).map_err(|source| StoreError::ParseError { path, source })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(IndexMap::new()),
            Err(source) => Err(StoreError::ReadError { path, source }),
        }
    }

    fn write_instances(&self, instances: &IndexMap<String, ListId>) -> Result<(), StoreError> {
        let path = self.dir.join(INSTANCES_FILE);
        let json = serde_json::to_string_pretty(instances)?;
        atomic_write(&path, json.as_bytes()).map_err(|source| StoreError::WriteError { path, source })
    }

    /// Read `id`, apply `f`, and write it back under the lock.
    fn update(&self, id: &str, f: impl FnOnce(&mut RawDocument)) -> Result<(), StoreError> {
        let _lock = StoreLock::acquire_default(&self.dir)?;
        let mut doc = self
            .read(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        f(&mut doc);
        doc.updated_at = Utc::now();
        self.write(&doc)
    }
}

/// Build a raw document from whatever JSON the file holds. Only the outer
/// shape is read here; `groups` is left for the normalizer.
fn raw_document(id: &str, value: Value) -> RawDocument {
    let title = value
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let updated_at = value
        .get("updatedAt")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    let groups = match value {
        Value::Object(mut map) => map.remove("groups").unwrap_or(Value::Null),
        // a bare array is taken as the groups themselves
        other @ Value::Array(_) => other,
        _ => Value::Null,
    };
    RawDocument {
        id: id.to_string(),
        title,
        groups,
        updated_at,
    }
}

impl DocumentStore for FileStore {
    fn fetch(&self, id: &str) -> Result<Option<RawDocument>, StoreError> {
        self.read(id)
    }

    fn create(&self, instance_key: &str, title: &str, groups: &[Group]) -> Result<ListId, StoreError> {
        let _lock = StoreLock::acquire_default(&self.dir)?;
        let mut instances = self.read_instances()?;
        if let Some(id) = instances.get(instance_key)
            && self.read(id)?.is_some()
        {
            return Ok(id.clone());
        }

        let doc = RawDocument {
            id: new_id(),
            title: title.to_string(),
            groups: serde_json::to_value(groups)?,
            updated_at: Utc::now(),
        };
        self.write(&doc)?;
        instances.insert(instance_key.to_string(), doc.id.clone());
        self.write_instances(&instances)?;
        Ok(doc.id)
    }

    fn commit(&self, id: &str, groups: &[Group]) -> Result<(), StoreError> {
        let groups = serde_json::to_value(groups)?;
        self.update(id, |doc| doc.groups = groups)
    }

    fn rename(&self, id: &str, title: &str) -> Result<(), StoreError> {
        self.update(id, |doc| doc.title = title.to_string())
    }

    fn list_ids(&self) -> Result<Vec<ListId>, StoreError> {
        let dir = self.lists_dir();
        let entries = fs::read_dir(&dir).map_err(|source| StoreError::ReadError {
            path: dir.clone(),
            source,
        })?;
        let mut ids: Vec<ListId> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| list_id_from_path(&entry.path()))
            .collect();
        ids.sort();
        Ok(ids)
    }
}

/// The list id a document path belongs to, if it is a document path.
pub fn list_id_from_path(path: &Path) -> Option<ListId> {
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    is_valid_id(stem).then(|| stem.to_string())
}

// ---------------------------------------------------------------------------
// Atomic file write
// ---------------------------------------------------------------------------

/// Write `content` to `path` through a temp file in the same directory and
/// a rename, so readers never see a partial file.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
