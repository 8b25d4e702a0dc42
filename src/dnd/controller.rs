//! Drag lifecycle: `Idle -> Dragging -> {dropped, cancelled} -> Idle`.
//!
//! The controller is the single owner of the local group tree. While a drag
//! is running it keeps a deep snapshot for rollback, filters repeated hover
//! events by a (active, over) key, and defers re-projection to the next
//! animation frame. A drop yields at most one tree to commit.

use std::borrow::Cow;

use tracing::debug;

use crate::model::{DragConfig, Group};
use crate::ops::locate;
use crate::ops::projection::project;

use super::item::DragItem;
use super::scheduler::FrameScheduler;

/// Result of ending a drag with a drop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// The tree changed during the drag; this is the tree to commit
    Commit(Vec<Group>),
    /// Dropped, but nothing moved
    Unchanged,
    /// No target under the pointer: the pre-drag tree was restored
    RolledBack,
    /// There was no drag in progress
    NotDragging,
}

/// A projection waiting for the next frame
#[derive(Debug, Clone, PartialEq, Eq)]
struct ProjectionRequest {
    active: DragItem,
    over: DragItem,
}

/// Bookkeeping for the drag in progress
#[derive(Debug, Clone)]
struct ActiveDrag {
    item: DragItem,
    snapshot: Vec<Group>,
    /// Last hover target processed; `Some(None)` means "over nothing"
    last_over: Option<Option<DragItem>>,
    /// Set once any projection replaced the tree
    dirty: bool,
}

#[derive(Debug, Clone)]
pub struct DragController {
    tree: Vec<Group>,
    drag: Option<ActiveDrag>,
    scheduler: FrameScheduler<ProjectionRequest>,
    live_preview: bool,
}

impl DragController {
    pub fn new(tree: Vec<Group>, config: &DragConfig) -> Self {
        DragController {
            tree,
            drag: None,
            scheduler: FrameScheduler::new(),
            live_preview: config.live_preview,
        }
    }

    /// The tree as currently shown, including any live projection.
    pub fn tree(&self) -> &[Group] {
        &self.tree
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// The item being dragged, if any.
    pub fn active(&self) -> Option<&DragItem> {
        self.drag.as_ref().map(|d| &d.item)
    }

    /// Whether a projection is waiting for the next frame.
    pub fn has_pending_frame(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Replace the tree wholesale. Refused while a drag owns the tree.
    pub fn replace_tree(&mut self, tree: Vec<Group>) -> bool {
        if self.is_dragging() {
            return false;
        }
        self.tree = tree;
        true
    }

    /// Run an edit against the tree. Refused (returns `None`) while dragging.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut Vec<Group>) -> R) -> Option<R> {
        if self.is_dragging() {
            return None;
        }
        Some(f(&mut self.tree))
    }

    /// Begin dragging `item`. Containers cannot be dragged, and a drag
    /// already in progress is left alone.
    pub fn start(&mut self, item: DragItem) -> bool {
        if !item.is_draggable() {
            debug!(%item, "drag start ignored: not draggable");
            return false;
        }
        if let Some(drag) = &self.drag {
            debug!(%item, current = %drag.item, "drag start ignored: already dragging");
            return false;
        }
        self.scheduler.cancel();
        debug!(%item, "drag start");
        self.drag = Some(ActiveDrag {
            item,
            snapshot: self.tree.clone(),
            last_over: None,
            dirty: false,
        });
        true
    }

    /// The pointer is now over `over`. Returns `true` if a projection was
    /// scheduled for the next frame.
    ///
    /// Repeats of the last processed target are ignored. Unless live preview
    /// is on, only moving a task into another group is projected while
    /// hovering; everything else is resolved on drop.
    pub fn over(&mut self, over: Option<DragItem>) -> bool {
        let Some(drag) = self.drag.as_mut() else {
            return false;
        };
        if drag.last_over.as_ref() == Some(&over) {
            return false;
        }
        drag.last_over = Some(over.clone());

        // a target that is not projected while hovering still retires
        // whatever the previous target queued
        let Some(over) = over else {
            self.scheduler.cancel();
            return false;
        };
        if !self.live_preview && !crosses_groups(&self.tree, &drag.item, &over) {
            self.scheduler.cancel();
            return false;
        }
        let request = ProjectionRequest {
            active: drag.item.clone(),
            over,
        };
        if self.scheduler.schedule(request) {
            debug!("pending projection superseded");
        }
        true
    }

    /// Animation-frame callback. Runs the pending projection, if any, and
    /// returns `true` when the visible tree changed.
    pub fn on_frame(&mut self) -> bool {
        let Some(request) = self.scheduler.take() else {
            return false;
        };
        let Some(drag) = self.drag.as_mut() else {
            return false;
        };
        let next = match project(&self.tree, &request.active, &request.over) {
            Cow::Owned(tree) => tree,
            Cow::Borrowed(_) => return false,
        };
        debug!(active = %request.active, over = %request.over, "projected");
        self.tree = next;
        drag.dirty = true;
        true
    }

    /// End the drag over `over`. Without a target this behaves like
    /// [`cancel`](Self::cancel).
    pub fn drop(&mut self, over: Option<DragItem>) -> DropOutcome {
        let Some(mut drag) = self.drag.take() else {
            return DropOutcome::NotDragging;
        };
        self.scheduler.cancel();

        let Some(over) = over else {
            debug!(item = %drag.item, "dropped outside any target, rolling back");
            self.tree = drag.snapshot;
            return DropOutcome::RolledBack;
        };

        let next = match project(&self.tree, &drag.item, &over) {
            Cow::Owned(tree) => Some(tree),
            Cow::Borrowed(_) => None,
        };
        if let Some(tree) = next {
            self.tree = tree;
            drag.dirty = true;
        }

        if drag.dirty {
            debug!(item = %drag.item, %over, "dropped with changes");
            DropOutcome::Commit(self.tree.clone())
        } else {
            debug!(item = %drag.item, %over, "dropped without changes");
            DropOutcome::Unchanged
        }
    }

    /// Abort the drag and restore the pre-drag tree. Returns `false` if no
    /// drag was in progress.
    pub fn cancel(&mut self) -> bool {
        self.scheduler.cancel();
        match self.drag.take() {
            Some(drag) => {
                debug!(item = %drag.item, "drag cancelled");
                self.tree = drag.snapshot;
                true
            }
            None => false,
        }
    }
}

/// Whether hovering `over` with `active` would move a task into another group.
fn crosses_groups(tree: &[Group], active: &DragItem, over: &DragItem) -> bool {
    let DragItem::Task(task_id) = active else {
        return false;
    };
    let Some(source) = locate::find_task(tree, task_id) else {
        return false;
    };
    let target = match over {
        DragItem::Task(id) => locate::find_task(tree, id).map(|loc| loc.group_index),
        DragItem::TaskContainer(id) | DragItem::Group(id) => locate::find_group(tree, id),
        DragItem::Subtask(_) | DragItem::SubtaskContainer(_) => None,
    };
    target.is_some_and(|index| index != source.group_index)
}
