//! Bridge between the local optimistic tree and the document store.
//!
//! Store errors stop here. Creation failures block the panel behind
//! [`InitState::Failed`] until retried; commit and rename failures become
//! notifications and never roll back local state. A failed commit is kept,
//! one per list, and retried with exponential backoff from
//! [`SyncAdapter::tick`]. Once the retries run out the list is marked
//! diverged and the next hydration of it is adopted, so the store's copy
//! wins.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::model::{Group, ListDocument, ListId, SyncConfig};
use crate::ops::normalize::normalize_document;

use super::store::{DocumentStore, StoreError};

/// Error type for sync operations
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("no list has been initialized")]
    NotInitialized,
    #[error("could not create list: {0}")]
    CreateFailed(#[source] StoreError),
}

/// Whether the backing document exists yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitState {
    Pending,
    Ready(ListId),
    /// Creation was rejected; shown inline with a retry action
    Failed(String),
}

/// Result of a hydration pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hydration {
    /// The document does not exist in the store yet
    NotCreated,
    /// Local state should be replaced with this document
    Adopted(ListDocument),
    /// Local state is trusted over the store's copy
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Warning,
    Error,
}

/// A non-blocking message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// A commit that failed and is waiting for its next attempt
#[derive(Debug, Clone)]
struct PendingCommit {
    groups: Vec<Group>,
    attempts: u32,
    due: DateTime<Utc>,
}

/// Arguments of the last `ensure_document` call, kept for `retry_init`
#[derive(Debug, Clone)]
struct InitRequest {
    instance_key: String,
    name: String,
    groups: Vec<Group>,
}

#[derive(Debug)]
pub struct SyncAdapter<S> {
    store: S,
    config: SyncConfig,
    init: InitState,
    init_request: Option<InitRequest>,
    instances: HashMap<String, ListId>,
    /// Document id of the last adopted hydration
    hydrated: Option<ListId>,
    diverged: HashSet<ListId>,
    /// Failed commits by list, oldest first
    pending: IndexMap<ListId, PendingCommit>,
    notifications: Vec<Notification>,
}

impl<S: DocumentStore> SyncAdapter<S> {
    pub fn new(store: S, config: SyncConfig) -> Self {
        SyncAdapter {
            store,
            config,
            init: InitState::Pending,
            init_request: None,
            instances: HashMap::new(),
            hydrated: None,
            diverged: HashSet::new(),
            pending: IndexMap::new(),
            notifications: Vec::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn init_state(&self) -> &InitState {
        &self.init
    }

    /// Id of the document in use, once initialized.
    pub fn list_id(&self) -> Option<&str> {
        match &self.init {
            InitState::Ready(id) => Some(id),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Initialization
    // -----------------------------------------------------------------------

    /// Make sure a document exists for the widget `instance_key`, creating
    /// it with `name` and `groups` on first use. Repeated calls for the same
    /// instance converge on one document.
    pub fn ensure_document(
        &mut self,
        instance_key: &str,
        name: &str,
        groups: &[Group],
    ) -> Result<ListId, SyncError> {
        if let Some(id) = self.instances.get(instance_key) {
            self.init = InitState::Ready(id.clone());
            return Ok(id.clone());
        }
        match self.store.create(instance_key, name, groups) {
            Ok(id) => {
                info!(list = %id, instance = instance_key, "list ready");
                self.instances.insert(instance_key.to_string(), id.clone());
                self.init = InitState::Ready(id.clone());
                self.init_request = None;
                Ok(id)
            }
            Err(e) => {
                warn!(instance = instance_key, error = %e, "list creation failed");
                self.init = InitState::Failed(e.to_string());
                self.init_request = Some(InitRequest {
                    instance_key: instance_key.to_string(),
                    name: name.to_string(),
                    groups: groups.to_vec(),
                });
                Err(SyncError::CreateFailed(e))
            }
        }
    }

    /// Repeat the last failed `ensure_document`.
    pub fn retry_init(&mut self) -> Result<ListId, SyncError> {
        let request = self.init_request.take().ok_or(SyncError::NotInitialized)?;
        self.ensure_document(&request.instance_key, &request.name, &request.groups)
    }

    /// Use an existing document directly, without going through creation.
    pub fn attach(&mut self, list_id: &str) {
        self.init = InitState::Ready(list_id.to_string());
    }

    // -----------------------------------------------------------------------
    // Hydration
    // -----------------------------------------------------------------------

    /// Read `list_id` from the store and decide whether it replaces `local`.
    ///
    /// A document id seen for the first time is always adopted. For the
    /// id already adopted, the store's copy only wins while local state is
    /// empty with nothing waiting to be committed, or after the list
    /// diverged. An adopted list that still has a commit waiting to be
    /// retried comes back with the unsaved groups instead of the store's.
    pub fn hydrate(&mut self, list_id: &str, local: &[Group]) -> Hydration {
        let raw = match self.store.fetch(list_id) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Hydration::NotCreated,
            Err(e) => {
                self.notify(Level::Warning, format!("Could not load list: {e}"));
                return Hydration::Ignored;
            }
        };

        let first_time = self.hydrated.as_deref() != Some(list_id);
        let diverged = self.diverged.contains(list_id);
        let pending_here = self.pending.contains_key(list_id);
        if !first_time && !diverged && !(local.is_empty() && !pending_here) {
            debug!(list = list_id, "hydration ignored, local state is seeded");
            return Hydration::Ignored;
        }

        debug!(list = list_id, first_time, diverged, "hydration adopted");
        self.diverged.remove(list_id);
        self.hydrated = Some(list_id.to_string());
        let mut doc = normalize_document(&raw);
        if let Some(pending) = self.pending.get(list_id) {
            doc.groups = pending.groups.clone();
        }
        Hydration::Adopted(doc)
    }

    /// Whether the last commit of `list_id` was given up on.
    pub fn is_diverged(&self, list_id: &str) -> bool {
        self.diverged.contains(list_id)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Commit `groups` as the new tree of `list_id`. Returns `true` if the
    /// store accepted it right away.
    pub fn commit(&mut self, list_id: &str, groups: Vec<Group>) -> bool {
        self.commit_at(list_id, groups, Utc::now())
    }

    /// Like [`commit`](Self::commit), scheduling any retry relative to `now`.
    pub fn commit_at(&mut self, list_id: &str, groups: Vec<Group>, now: DateTime<Utc>) -> bool {
        if let Some(old) = self.pending.shift_remove(list_id) {
            debug!(list = list_id, attempts = old.attempts, "pending commit superseded");
        }
        match self.store.commit(list_id, &groups) {
            Ok(()) => {
                info!(list = list_id, groups = groups.len(), "committed");
                self.diverged.remove(list_id);
                true
            }
            Err(e) => {
                warn!(list = list_id, error = %e, "commit failed");
                if self.config.max_commit_retries == 0 {
                    self.give_up(list_id, &e);
                } else {
                    self.notify(Level::Warning, format!("Could not save changes: {e}. Retrying."));
                    let due = now + self.backoff(0);
                    self.pending.insert(
                        list_id.to_string(),
                        PendingCommit {
                            groups,
                            attempts: 0,
                            due,
                        },
                    );
                }
                false
            }
        }
    }

    /// Retry every failed commit that is due. Call periodically.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        let due: Vec<ListId> = self
            .pending
            .iter()
            .filter(|(_, pending)| now >= pending.due)
            .map(|(list_id, _)| list_id.clone())
            .collect();
        for list_id in due {
            let Some(mut pending) = self.pending.shift_remove(&list_id) else {
                continue;
            };
            pending.attempts += 1;
            match self.store.commit(&list_id, &pending.groups) {
                Ok(()) => {
                    info!(list = %list_id, attempts = pending.attempts, "commit retry succeeded");
                    self.diverged.remove(&list_id);
                }
                Err(e) if pending.attempts >= self.config.max_commit_retries => {
                    warn!(list = %list_id, error = %e, "commit retries exhausted");
                    self.give_up(&list_id, &e);
                }
                Err(e) => {
                    pending.due = now + self.backoff(pending.attempts);
                    debug!(
                        list = %list_id,
                        attempts = pending.attempts,
                        error = %e,
                        "commit retry failed"
                    );
                    self.pending.insert(list_id, pending);
                }
            }
        }
    }

    /// Whether any list has a failed commit waiting to be retried.
    pub fn has_pending_commit(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn has_pending_commit_for(&self, list_id: &str) -> bool {
        self.pending.contains_key(list_id)
    }

    /// When the next pending commit is due.
    pub fn next_retry_at(&self) -> Option<DateTime<Utc>> {
        self.pending.values().map(|p| p.due).min()
    }

    /// Rename `list_id`. Failures are reported, not retried.
    pub fn rename(&mut self, list_id: &str, title: &str) -> bool {
        match self.store.rename(list_id, title) {
            Ok(()) => {
                info!(list = list_id, title, "renamed");
                true
            }
            Err(e) => {
                warn!(list = list_id, error = %e, "rename failed");
                self.notify(Level::Warning, format!("Could not rename list: {e}"));
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn notify(&mut self, level: Level, message: String) {
        self.notifications.push(Notification {
            level,
            message,
            at: Utc::now(),
        });
    }

    fn give_up(&mut self, list_id: &str, error: &StoreError) {
        self.diverged.insert(list_id.to_string());
        self.notify(
            Level::Error,
            format!("Changes could not be saved ({error}). Reloading the list from the store."),
        );
    }

    /// Delay before retry number `attempt + 1`.
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let ms = self.config.retry_backoff_ms.saturating_mul(factor);
        Duration::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
    }
}
