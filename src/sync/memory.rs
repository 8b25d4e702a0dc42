use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::Utc;
use indexmap::IndexMap;

use crate::model::{Group, ListId, RawDocument, new_id};

use super::store::{DocumentStore, StoreError};

#[derive(Debug, Default)]
struct Inner {
    docs: IndexMap<ListId, RawDocument>,
    instances: HashMap<String, ListId>,
    offline: bool,
    failing_creates: u32,
    failing_commits: u32,
    failing_renames: u32,
    commits: u64,
}

/// In-process store. Clones share the same documents, so each clone acts as
/// a separate client of one store.
///
/// Failures can be injected per operation to exercise the error paths of
/// the sync layer.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.inner.borrow_mut().offline = offline;
    }

    /// Fail the next `n` creates.
    pub fn fail_creates(&self, n: u32) {
        self.inner.borrow_mut().failing_creates = n;
    }

    /// Fail the next `n` commits.
    pub fn fail_commits(&self, n: u32) {
        self.inner.borrow_mut().failing_commits = n;
    }

    /// Fail the next `n` renames.
    pub fn fail_renames(&self, n: u32) {
        self.inner.borrow_mut().failing_renames = n;
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> u64 {
        self.inner.borrow().commits
    }

    /// Store a document as-is, bypassing validation. Stands in for a write
    /// by another client, including a malformed one.
    pub fn put_raw(&self, doc: RawDocument) {
        self.inner.borrow_mut().docs.insert(doc.id.clone(), doc);
    }

    /// The stored form of a document.
    pub fn raw(&self, id: &str) -> Option<RawDocument> {
        self.inner.borrow().docs.get(id).cloned()
    }
}

/// Consume one injected failure from `counter`, if any remain.
fn take_failure(counter: &mut u32) -> bool {
    if *counter > 0 {
        *counter -= 1;
        true
    } else {
        false
    }
}

impl DocumentStore for MemoryStore {
    fn fetch(&self, id: &str) -> Result<Option<RawDocument>, StoreError> {
        let inner = self.inner.borrow();
        if inner.offline {
            return Err(StoreError::Unavailable("offline".into()));
        }
        Ok(inner.docs.get(id).cloned())
    }

    fn create(&self, instance_key: &str, title: &str, groups: &[Group]) -> Result<ListId, StoreError> {
        let mut inner = self.inner.borrow_mut();
        if inner.offline || take_failure(&mut inner.failing_creates) {
            return Err(StoreError::Unavailable("create rejected".into()));
        }
        if let Some(id) = inner.instances.get(instance_key)
            && inner.docs.contains_key(id)
        {
            return Ok(id.clone());
        }
        let id = new_id();
        let doc = RawDocument {
            id: id.clone(),
            title: title.to_string(),
            groups: serde_json::to_value(groups)?,
            updated_at: Utc::now(),
        };
        inner.docs.insert(id.clone(), doc);
        inner.instances.insert(instance_key.to_string(), id.clone());
        Ok(id)
    }

    fn commit(&self, id: &str, groups: &[Group]) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        if inner.offline || take_failure(&mut inner.failing_commits) {
            return Err(StoreError::Unavailable("commit rejected".into()));
        }
        let groups = serde_json::to_value(groups)?;
        let doc = inner
            .docs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        doc.groups = groups;
        doc.updated_at = Utc::now();
        inner.commits += 1;
        Ok(())
    }

    fn rename(&self, id: &str, title: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        if inner.offline || take_failure(&mut inner.failing_renames) {
            return Err(StoreError::Unavailable("rename rejected".into()));
        }
        let doc = inner
            .docs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        doc.title = title.to_string();
        doc.updated_at = Utc::now();
        Ok(())
    }

    fn list_ids(&self) -> Result<Vec<ListId>, StoreError> {
        let inner = self.inner.borrow();
        if inner.offline {
            return Err(StoreError::Unavailable("offline".into()));
        }
        Ok(inner.docs.keys().cloned().collect())
    }
}
