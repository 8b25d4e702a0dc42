//! The list panel: one list document, its local tree, and the drag session
//! over it.
//!
//! The panel owns a [`DragController`] (the tree), a [`SyncAdapter`] (the
//! store) and a [`CollisionDetector`] (droppable geometry). Edits are refused
//! while a drag is running; every accepted edit and every changing drop is
//! committed once.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::dnd::{CollisionDetector, DragController, DragItem, DropOutcome, Point, Rect};
use crate::model::{Group, ListId, TrellisConfig};
use crate::ops::entity_ops::{self, EditError, EntityKind};
use crate::ops::locate;
use crate::sync::{DocumentStore, Hydration, InitState, Notification, SyncAdapter, SyncError};

/// Error type for panel actions
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    #[error("cannot edit while a drag is in progress")]
    DragInProgress,
    #[error("no list is open")]
    NotReady,
    #[error("list not found: {0}")]
    ListNotFound(ListId),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

pub struct Panel<S> {
    controller: DragController,
    adapter: SyncAdapter<S>,
    detector: CollisionDetector,
    title: String,
    /// Widget instance the open list belongs to
    instance: Option<String>,
    /// Entity whose text is being edited inline
    editing: Option<String>,
}

impl<S: DocumentStore> Panel<S> {
    pub fn new(store: S, config: &TrellisConfig) -> Self {
        Panel {
            controller: DragController::new(Vec::new(), &config.drag),
            adapter: SyncAdapter::new(store, config.sync.clone()),
            detector: CollisionDetector::new(),
            title: String::new(),
            instance: None,
            editing: None,
        }
    }

    pub fn tree(&self) -> &[Group] {
        self.controller.tree()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn list_id(&self) -> Option<&str> {
        self.adapter.list_id()
    }

    pub fn init_state(&self) -> &InitState {
        self.adapter.init_state()
    }

    pub fn store(&self) -> &S {
        self.adapter.store()
    }

    /// Id of the entity currently in inline edit mode.
    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn is_dragging(&self) -> bool {
        self.controller.is_dragging()
    }

    /// Whether a failed commit is waiting to be retried.
    pub fn has_pending_commit(&self) -> bool {
        self.adapter.has_pending_commit()
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.adapter.drain_notifications()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Open the list belonging to widget `instance_key`, creating it as
    /// `name` if it does not exist yet. Switching to another instance starts
    /// from an empty tree, so a new list never inherits the previous one's
    /// groups.
    pub fn open(&mut self, instance_key: &str, name: &str) -> Result<ListId, PanelError> {
        self.controller.cancel();
        if self.instance.as_deref() != Some(instance_key) {
            self.reset_local();
            self.instance = Some(instance_key.to_string());
        }
        let id = self
            .adapter
            .ensure_document(instance_key, name, self.controller.tree())?;
        self.refresh();
        Ok(id)
    }

    /// Retry a failed [`open`](Self::open).
    pub fn retry_init(&mut self) -> Result<ListId, PanelError> {
        let id = self.adapter.retry_init()?;
        self.refresh();
        Ok(id)
    }

    /// Open an existing list by id.
    pub fn attach(&mut self, list_id: &str) -> Result<(), PanelError> {
        self.controller.cancel();
        if self.adapter.list_id() != Some(list_id) {
            self.reset_local();
            self.instance = None;
        }
        self.adapter.attach(list_id);
        match self.refresh() {
            Hydration::NotCreated => Err(PanelError::ListNotFound(list_id.to_string())),
            _ => Ok(()),
        }
    }

    /// Forget the tree, title and droppables of the previous list.
    fn reset_local(&mut self) {
        self.controller.replace_tree(Vec::new());
        self.detector.clear();
        self.title.clear();
        self.editing = None;
    }

    /// Hydrate from the store. Skipped while dragging; the drag owns the tree.
    pub fn refresh(&mut self) -> Hydration {
        let Some(list_id) = self.adapter.list_id().map(str::to_string) else {
            return Hydration::NotCreated;
        };
        if self.controller.is_dragging() {
            debug!(list = %list_id, "refresh deferred during drag");
            return Hydration::Ignored;
        }
        let hydration = self.adapter.hydrate(&list_id, self.controller.tree());
        if let Hydration::Adopted(doc) = &hydration {
            self.title = doc.title.clone();
            self.controller.replace_tree(doc.groups.clone());
            let still_there = self
                .editing
                .as_deref()
                .is_none_or(|id| locate::contains_id(self.controller.tree(), id));
            if !still_there {
                self.editing = None;
            }
        }
        hydration
    }

    /// Periodic housekeeping: retries failed commits, and reloads the list
    /// from the store once its retries are exhausted.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        self.adapter.tick(now);
        if let Some(id) = self.adapter.list_id()
            && self.adapter.is_diverged(id)
        {
            self.refresh();
        }
    }

    pub fn rename(&mut self, title: &str) -> Result<bool, PanelError> {
        let list_id = self.adapter.list_id().ok_or(PanelError::NotReady)?.to_string();
        self.title = title.to_string();
        Ok(self.adapter.rename(&list_id, title))
    }

    // -----------------------------------------------------------------------
    // Edits
    // -----------------------------------------------------------------------

    /// Apply `f` to the tree and commit the result.
    fn apply<R>(
        &mut self,
        f: impl FnOnce(&mut Vec<Group>) -> Result<R, EditError>,
    ) -> Result<R, PanelError> {
        if self.controller.is_dragging() {
            return Err(PanelError::DragInProgress);
        }
        let list_id = self.adapter.list_id().ok_or(PanelError::NotReady)?.to_string();
        let result = self.controller.edit(f).ok_or(PanelError::DragInProgress)??;
        self.adapter.commit(&list_id, self.controller.tree().to_vec());
        Ok(result)
    }

    pub fn add_group(&mut self) -> Result<String, PanelError> {
        let id = self.apply(|groups| Ok(entity_ops::add_group(groups)))?;
        self.editing = Some(id.clone());
        Ok(id)
    }

    pub fn add_task(&mut self, group_id: &str) -> Result<String, PanelError> {
        let id = self.apply(|groups| entity_ops::add_task(groups, group_id))?;
        self.editing = Some(id.clone());
        Ok(id)
    }

    pub fn add_subtask(&mut self, task_id: &str) -> Result<String, PanelError> {
        let id = self.apply(|groups| entity_ops::add_subtask(groups, task_id))?;
        self.editing = Some(id.clone());
        Ok(id)
    }

    /// Set the title or text of any entity, ending its inline edit.
    pub fn set_text(&mut self, id: &str, text: &str) -> Result<EntityKind, PanelError> {
        let kind = self.apply(|groups| entity_ops::set_text(groups, id, text.to_string()))?;
        if self.editing.as_deref() == Some(id) {
            self.editing = None;
        }
        Ok(kind)
    }

    /// Leave inline edit mode without changing anything.
    pub fn finish_editing(&mut self) {
        self.editing = None;
    }

    pub fn toggle_completed(&mut self, id: &str) -> Result<bool, PanelError> {
        self.apply(|groups| entity_ops::toggle_completed(groups, id))
    }

    pub fn toggle_collapsed(&mut self, id: &str) -> Result<bool, PanelError> {
        self.apply(|groups| entity_ops::toggle_collapsed(groups, id))
    }

    pub fn delete(&mut self, id: &str) -> Result<EntityKind, PanelError> {
        let kind = self.apply(|groups| entity_ops::delete(groups, id))?;
        if self.editing.as_deref() == Some(id) {
            self.editing = None;
        }
        Ok(kind)
    }

    // -----------------------------------------------------------------------
    // Drag and drop
    // -----------------------------------------------------------------------

    pub fn register_droppable(&mut self, item: DragItem, rect: Rect) {
        self.detector.register(item, rect);
    }

    pub fn unregister_droppable(&mut self, item: &DragItem) {
        self.detector.unregister(item);
    }

    pub fn drag_start(&mut self, item: DragItem) -> bool {
        let started = self.controller.start(item);
        if started {
            self.editing = None;
        }
        started
    }

    /// Pointer moved during a drag. Resolves the target under the dragged
    /// box and returns it.
    pub fn drag_move(&mut self, pointer: Option<Point>, active_rect: Rect) -> Option<DragItem> {
        if !self.controller.is_dragging() {
            return None;
        }
        let target = self.detector.best(active_rect, pointer);
        self.controller.over(target.clone());
        target
    }

    /// Report the hover target directly, bypassing geometry.
    pub fn drag_over(&mut self, over: Option<DragItem>) -> bool {
        self.controller.over(over)
    }

    pub fn on_frame(&mut self) -> bool {
        self.controller.on_frame()
    }

    /// Drop on `over` and commit the result if anything moved.
    pub fn drag_end(&mut self, over: Option<DragItem>) -> DropOutcome {
        let outcome = self.controller.drop(over);
        if let DropOutcome::Commit(groups) = &outcome {
            match self.adapter.list_id().map(str::to_string) {
                Some(list_id) => {
                    self.adapter.commit(&list_id, groups.clone());
                }
                None => debug!("drop produced changes but no list is open"),
            }
        }
        outcome
    }

    pub fn drag_cancel(&mut self) -> bool {
        self.controller.cancel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::MemoryStore;
    use pretty_assertions::assert_eq;

    fn panel() -> Panel<MemoryStore> {
        let mut panel = Panel::new(MemoryStore::new(), &TrellisConfig::default());
        panel.open("widget", "Tasks").unwrap();
        panel
    }

    #[test]
    fn open_creates_and_hydrates() {
        let panel = panel();
        assert!(panel.list_id().is_some());
        assert_eq!(panel.title(), "Tasks");
        assert!(panel.tree().is_empty());
    }

    #[test]
    fn add_puts_placeholder_in_edit_mode() {
        let mut panel = panel();
        let group = panel.add_group().unwrap();
        assert_eq!(panel.editing(), Some(group.as_str()));
        let task = panel.add_task(&group).unwrap();
        assert_eq!(panel.editing(), Some(task.as_str()));
        panel.set_text(&task, "buy milk").unwrap();
        assert_eq!(panel.editing(), None);
        assert_eq!(panel.tree()[0].tasks[0].text, "buy milk");
        assert_eq!(panel.store().commit_count(), 3);
    }

    #[test]
    fn edits_are_refused_during_drag() {
        let mut panel = panel();
        let group = panel.add_group().unwrap();
        assert!(panel.drag_start(DragItem::Group(group.clone())));
        assert!(matches!(panel.add_task(&group), Err(PanelError::DragInProgress)));
        assert!(matches!(panel.delete(&group), Err(PanelError::DragInProgress)));
        panel.drag_cancel();
        assert!(panel.add_task(&group).is_ok());
    }

    #[test]
    fn edits_need_an_open_list() {
        let mut panel = Panel::new(MemoryStore::new(), &TrellisConfig::default());
        assert!(matches!(panel.add_group(), Err(PanelError::NotReady)));
        assert!(matches!(panel.rename("x"), Err(PanelError::NotReady)));
    }

    #[test]
    fn unknown_ids_surface_edit_errors() {
        let mut panel = panel();
        assert!(matches!(
            panel.toggle_completed("missing"),
            Err(PanelError::Edit(EditError::NotFound(_)))
        ));
    }

    #[test]
    fn failed_open_can_be_retried() {
        let store = MemoryStore::new();
        store.fail_creates(1);
        let mut panel = Panel::new(store, &TrellisConfig::default());
        assert!(panel.open("widget", "Tasks").is_err());
        assert!(matches!(panel.init_state(), InitState::Failed(_)));
        panel.retry_init().unwrap();
        assert_eq!(panel.title(), "Tasks");
    }

    #[test]
    fn second_instance_starts_from_an_empty_list() {
        let mut panel = panel();
        let first = panel.list_id().unwrap().to_string();
        let group = panel.add_group().unwrap();
        panel.set_text(&group, "private to the first widget").unwrap();

        let second = panel.open("other-widget", "Other").unwrap();
        assert_ne!(second, first);
        assert_eq!(panel.title(), "Other");
        assert!(panel.tree().is_empty());
        assert_eq!(panel.editing(), None);
        let stored = panel.store().fetch(&second).unwrap().unwrap();
        assert_eq!(stored.groups, serde_json::json!([]));
    }

    #[test]
    fn attach_missing_list() {
        let mut panel = Panel::new(MemoryStore::new(), &TrellisConfig::default());
        assert!(matches!(panel.attach("nope"), Err(PanelError::ListNotFound(_))));
    }

    #[test]
    fn drag_move_resolves_target_from_geometry() {
        let mut panel = panel();
        let a = panel.add_group().unwrap();
        let b = panel.add_group().unwrap();
        let t1 = panel.add_task(&a).unwrap();
        panel.register_droppable(DragItem::Task(t1.clone()), Rect::new(0.0, 0.0, 100.0, 20.0));
        panel.register_droppable(DragItem::TaskContainer(b.clone()), Rect::new(0.0, 100.0, 100.0, 40.0));

        panel.drag_start(DragItem::Task(t1.clone()));
        let target = panel.drag_move(Some(Point::new(50.0, 120.0)), Rect::new(0.0, 110.0, 100.0, 20.0));
        assert_eq!(target, Some(DragItem::TaskContainer(b.clone())));
        assert!(panel.on_frame());
        assert_eq!(panel.tree()[1].tasks[0].id, t1);

        let before = panel.store().commit_count();
        assert!(matches!(panel.drag_end(target), DropOutcome::Commit(_)));
        assert_eq!(panel.store().commit_count(), before + 1);
    }

    #[test]
    fn rename_updates_title_and_store() {
        let mut panel = panel();
        assert!(panel.rename("Groceries").unwrap());
        assert_eq!(panel.title(), "Groceries");
        let id = panel.list_id().unwrap().to_string();
        assert_eq!(panel.store().fetch(&id).unwrap().unwrap().title, "Groceries");
    }
}
