use chrono::{DateTime, Utc};

use crate::model::{Group, Subtask, Task, placeholder_title};
use crate::ops::locate::{self, SubtaskLocation, TaskLocation};

/// Error type for entity edits
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("group not found: {0}")]
    GroupNotFound(String),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("subtask not found: {0}")]
    SubtaskNotFound(String),
    #[error("no group, task or subtask with id {0}")]
    NotFound(String),
}

/// Which hierarchy level an id lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Group,
    Task,
    Subtask,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Group => "group",
            EntityKind::Task => "task",
            EntityKind::Subtask => "subtask",
        }
    }
}

/// Which level `id` lives on, if it exists.
pub fn kind_of(groups: &[Group], id: &str) -> Option<EntityKind> {
    if locate::find_group(groups, id).is_some() {
        Some(EntityKind::Group)
    } else if locate::find_task(groups, id).is_some() {
        Some(EntityKind::Task)
    } else if locate::find_subtask(groups, id).is_some() {
        Some(EntityKind::Subtask)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Add
// ---------------------------------------------------------------------------

/// Append a blank group. Returns its id.
pub fn add_group(groups: &mut Vec<Group>) -> String {
    let group = Group::new(placeholder_title(groups.len()), Utc::now());
    let id = group.id.clone();
    groups.push(group);
    id
}

/// Append a blank task to a group. Returns its id.
pub fn add_task(groups: &mut [Group], group_id: &str) -> Result<String, EditError> {
    let now = Utc::now();
    let group = group_mut(groups, group_id)?;
    let task = Task::new(String::new(), now);
    let id = task.id.clone();
    group.tasks.push(task);
    group.touch(now);
    Ok(id)
}

/// Append a blank subtask to a task. Returns its id.
pub fn add_subtask(groups: &mut [Group], task_id: &str) -> Result<String, EditError> {
    let now = Utc::now();
    let loc = task_location(groups, task_id)?;
    let group = &mut groups[loc.group_index];
    group.touch(now);
    let task = &mut group.tasks[loc.task_index];
    let subtask = Subtask::new(String::new(), now);
    let id = subtask.id.clone();
    task.subtasks.push(subtask);
    // A fresh, incomplete subtask reopens the task
    task.derive_completed();
    task.touch(now);
    Ok(id)
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

pub fn set_group_title(groups: &mut [Group], group_id: &str, title: String) -> Result<(), EditError> {
    let group = group_mut(groups, group_id)?;
    group.title = title;
    group.touch(Utc::now());
    Ok(())
}

pub fn set_task_text(groups: &mut [Group], task_id: &str, text: String) -> Result<(), EditError> {
    let now = Utc::now();
    let (group_updated_at, task) = task_mut(groups, task_id)?;
    task.text = text;
    task.touch(now);
    *group_updated_at = now;
    Ok(())
}

pub fn set_subtask_text(
    groups: &mut [Group],
    subtask_id: &str,
    text: String,
) -> Result<(), EditError> {
    let now = Utc::now();
    let loc = subtask_location(groups, subtask_id)?;
    let group = &mut groups[loc.group_index];
    group.touch(now);
    let task = &mut group.tasks[loc.task_index];
    task.touch(now);
    let subtask = &mut task.subtasks[loc.subtask_index];
    subtask.text = text;
    subtask.touch(now);
    Ok(())
}

/// Set the text of whatever entity carries `id` (group title for groups).
pub fn set_text(groups: &mut [Group], id: &str, text: String) -> Result<EntityKind, EditError> {
    let kind = kind_of(groups, id).ok_or_else(|| EditError::NotFound(id.to_string()))?;
    match kind {
        EntityKind::Group => set_group_title(groups, id, text)?,
        EntityKind::Task => set_task_text(groups, id, text)?,
        EntityKind::Subtask => set_subtask_text(groups, id, text)?,
    }
    Ok(kind)
}

// ---------------------------------------------------------------------------
// Toggles
// ---------------------------------------------------------------------------

/// Toggle a task's completion, cascading the new value to all of its
/// subtasks. Returns the new value.
pub fn toggle_task(groups: &mut [Group], task_id: &str) -> Result<bool, EditError> {
    let now = Utc::now();
    let (group_updated_at, task) = task_mut(groups, task_id)?;
    let completed = !task.completed;
    for subtask in &mut task.subtasks {
        if subtask.completed != completed {
            subtask.completed = completed;
            subtask.touch(now);
        }
    }
    task.completed = completed;
    task.touch(now);
    *group_updated_at = now;
    Ok(completed)
}

/// Toggle one subtask and recompute the parent task's completion.
/// Siblings are untouched. Returns the subtask's new value.
pub fn toggle_subtask(groups: &mut [Group], subtask_id: &str) -> Result<bool, EditError> {
    let now = Utc::now();
    let loc = subtask_location(groups, subtask_id)?;
    let group = &mut groups[loc.group_index];
    group.touch(now);
    let task = &mut group.tasks[loc.task_index];
    let subtask = &mut task.subtasks[loc.subtask_index];
    subtask.completed = !subtask.completed;
    subtask.touch(now);
    let completed = subtask.completed;
    task.derive_completed();
    task.touch(now);
    Ok(completed)
}

/// Toggle completion of a task or subtask by id.
pub fn toggle_completed(groups: &mut [Group], id: &str) -> Result<bool, EditError> {
    match kind_of(groups, id) {
        Some(EntityKind::Task) => toggle_task(groups, id),
        Some(EntityKind::Subtask) => toggle_subtask(groups, id),
        Some(EntityKind::Group) | None => Err(EditError::NotFound(id.to_string())),
    }
}

pub fn toggle_group_collapsed(groups: &mut [Group], group_id: &str) -> Result<bool, EditError> {
    let group = group_mut(groups, group_id)?;
    group.collapsed = !group.collapsed;
    group.touch(Utc::now());
    Ok(group.collapsed)
}

pub fn toggle_task_collapsed(groups: &mut [Group], task_id: &str) -> Result<bool, EditError> {
    let now = Utc::now();
    let (group_updated_at, task) = task_mut(groups, task_id)?;
    task.collapsed = !task.collapsed;
    task.touch(now);
    *group_updated_at = now;
    Ok(task.collapsed)
}

/// Toggle the collapsed flag of a group or task by id.
pub fn toggle_collapsed(groups: &mut [Group], id: &str) -> Result<bool, EditError> {
    match kind_of(groups, id) {
        Some(EntityKind::Group) => toggle_group_collapsed(groups, id),
        Some(EntityKind::Task) => toggle_task_collapsed(groups, id),
        Some(EntityKind::Subtask) | None => Err(EditError::NotFound(id.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

pub fn delete_group(groups: &mut Vec<Group>, group_id: &str) -> Result<Group, EditError> {
    let idx = locate::find_group(groups, group_id)
        .ok_or_else(|| EditError::GroupNotFound(group_id.to_string()))?;
    Ok(groups.remove(idx))
}

pub fn delete_task(groups: &mut [Group], task_id: &str) -> Result<Task, EditError> {
    let loc = task_location(groups, task_id)?;
    let group = &mut groups[loc.group_index];
    group.touch(Utc::now());
    Ok(group.tasks.remove(loc.task_index))
}

/// Remove a subtask; the parent task's completion is recomputed from what remains.
pub fn delete_subtask(groups: &mut [Group], subtask_id: &str) -> Result<Subtask, EditError> {
    let now = Utc::now();
    let loc = subtask_location(groups, subtask_id)?;
    let group = &mut groups[loc.group_index];
    group.touch(now);
    let task = &mut group.tasks[loc.task_index];
    let removed = task.subtasks.remove(loc.subtask_index);
    task.derive_completed();
    task.touch(now);
    Ok(removed)
}

/// Delete whatever entity carries `id`.
pub fn delete(groups: &mut Vec<Group>, id: &str) -> Result<EntityKind, EditError> {
    let kind = kind_of(groups, id).ok_or_else(|| EditError::NotFound(id.to_string()))?;
    match kind {
        EntityKind::Group => {
            delete_group(groups, id)?;
        }
        EntityKind::Task => {
            delete_task(groups, id)?;
        }
        EntityKind::Subtask => {
            delete_subtask(groups, id)?;
        }
    }
    Ok(kind)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn group_mut<'a>(groups: &'a mut [Group], group_id: &str) -> Result<&'a mut Group, EditError> {
    groups
        .iter_mut()
        .find(|g| g.id == group_id)
        .ok_or_else(|| EditError::GroupNotFound(group_id.to_string()))
}

fn task_location(groups: &[Group], task_id: &str) -> Result<TaskLocation, EditError> {
    locate::find_task(groups, task_id).ok_or_else(|| EditError::TaskNotFound(task_id.to_string()))
}

fn subtask_location(groups: &[Group], subtask_id: &str) -> Result<SubtaskLocation, EditError> {
    locate::find_subtask(groups, subtask_id)
        .ok_or_else(|| EditError::SubtaskNotFound(subtask_id.to_string()))
}

/// A task together with its owning group's `updated_at`.
fn task_mut<'a>(
    groups: &'a mut [Group],
    task_id: &str,
) -> Result<(&'a mut DateTime<Utc>, &'a mut Task), EditError> {
    let loc = task_location(groups, task_id)?;
    let Group {
        updated_at, tasks, ..
    } = &mut groups[loc.group_index];
    Ok((updated_at, &mut tasks[loc.task_index]))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::normalize::normalize_at;
    use chrono::TimeZone;
    use serde_json::json;

    fn long_ago() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    fn sample() -> Vec<Group> {
        normalize_at(
            &json!([
                { "id": "A", "title": "Home", "tasks": [
                    { "id": "T", "text": "clean", "subtasks": [
                        { "id": "S1", "completed": false },
                        { "id": "S2", "completed": false },
                    ] },
                    { "id": "U", "text": "cook" },
                ] },
                { "id": "B", "title": "Work" },
            ]),
            long_ago(),
        )
    }

    // --- Completion ---

    #[test]
    fn toggling_task_cascades_to_subtasks() {
        let mut groups = sample();
        assert!(toggle_task(&mut groups, "T").unwrap());
        let task = &groups[0].tasks[0];
        assert!(task.completed);
        assert!(task.subtasks.iter().all(|s| s.completed));

        // Un-toggling one subtask recomputes the parent
        assert!(!toggle_subtask(&mut groups, "S1").unwrap());
        let task = &groups[0].tasks[0];
        assert!(!task.completed);
        assert!(!task.subtasks[0].completed);
        assert!(task.subtasks[1].completed);
    }

    #[test]
    fn toggling_subtask_does_not_touch_siblings() {
        let mut groups = sample();
        toggle_subtask(&mut groups, "S1").unwrap();
        let task = &groups[0].tasks[0];
        assert!(task.subtasks[0].completed);
        assert!(!task.subtasks[1].completed);
        assert!(!task.completed);

        toggle_subtask(&mut groups, "S2").unwrap();
        assert!(groups[0].tasks[0].completed);
    }

    #[test]
    fn toggling_task_without_subtasks_flips_flag() {
        let mut groups = sample();
        assert!(toggle_task(&mut groups, "U").unwrap());
        assert!(!toggle_task(&mut groups, "U").unwrap());
    }

    #[test]
    fn toggle_completed_rejects_groups() {
        let mut groups = sample();
        assert_eq!(
            toggle_completed(&mut groups, "A"),
            Err(EditError::NotFound("A".into()))
        );
        assert!(toggle_completed(&mut groups, "S2").unwrap());
    }

    // --- Timestamps ---

    #[test]
    fn editing_a_task_refreshes_task_and_group() {
        let mut groups = sample();
        set_task_text(&mut groups, "T", "scrub".into()).unwrap();
        assert_eq!(groups[0].tasks[0].text, "scrub");
        assert!(groups[0].tasks[0].updated_at > long_ago());
        assert!(groups[0].updated_at > long_ago());
        assert_eq!(groups[0].tasks[1].updated_at, long_ago());
        assert_eq!(groups[1].updated_at, long_ago());
    }

    #[test]
    fn editing_a_subtask_refreshes_ancestors() {
        let mut groups = sample();
        set_subtask_text(&mut groups, "S2", "floors".into()).unwrap();
        let task = &groups[0].tasks[0];
        assert_eq!(task.subtasks[1].text, "floors");
        assert!(task.subtasks[1].updated_at > long_ago());
        assert_eq!(task.subtasks[0].updated_at, long_ago());
        assert!(task.updated_at > long_ago());
        assert!(groups[0].updated_at > long_ago());
    }

    // --- Add ---

    #[test]
    fn add_inserts_blank_placeholders() {
        let mut groups = sample();
        let gid = add_group(&mut groups);
        assert_eq!(groups[2].id, gid);
        assert_eq!(groups[2].title, "Group 3");

        let tid = add_task(&mut groups, &gid).unwrap();
        assert_eq!(groups[2].tasks[0].id, tid);
        assert_eq!(groups[2].tasks[0].text, "");

        let sid = add_subtask(&mut groups, &tid).unwrap();
        assert_eq!(groups[2].tasks[0].subtasks[0].id, sid);
    }

    #[test]
    fn adding_subtask_reopens_completed_task() {
        let mut groups = sample();
        toggle_task(&mut groups, "T").unwrap();
        add_subtask(&mut groups, "T").unwrap();
        assert!(!groups[0].tasks[0].completed);
    }

    #[test]
    fn add_to_missing_parent_fails() {
        let mut groups = sample();
        assert_eq!(
            add_task(&mut groups, "nope"),
            Err(EditError::GroupNotFound("nope".into()))
        );
        assert_eq!(
            add_subtask(&mut groups, "A"),
            Err(EditError::TaskNotFound("A".into()))
        );
    }

    // --- Collapse ---

    #[test]
    fn toggle_collapsed_by_level() {
        let mut groups = sample();
        assert!(toggle_collapsed(&mut groups, "A").unwrap());
        assert!(groups[0].collapsed);
        assert!(toggle_collapsed(&mut groups, "T").unwrap());
        assert!(groups[0].tasks[0].collapsed);
        assert!(toggle_collapsed(&mut groups, "S1").is_err());
    }

    // --- Delete ---

    #[test]
    fn delete_removes_from_parent() {
        let mut groups = sample();
        assert_eq!(delete(&mut groups, "U").unwrap(), EntityKind::Task);
        assert_eq!(groups[0].tasks.len(), 1);
        assert_eq!(delete(&mut groups, "B").unwrap(), EntityKind::Group);
        assert_eq!(groups.len(), 1);
        assert!(delete(&mut groups, "B").is_err());
    }

    #[test]
    fn deleting_last_open_subtask_completes_task() {
        let mut groups = sample();
        toggle_subtask(&mut groups, "S1").unwrap();
        delete_subtask(&mut groups, "S2").unwrap();
        assert!(groups[0].tasks[0].completed);
    }

    #[test]
    fn every_group_can_be_deleted() {
        let mut groups = sample();
        delete_group(&mut groups, "A").unwrap();
        delete_group(&mut groups, "B").unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn set_text_dispatches_by_level() {
        let mut groups = sample();
        assert_eq!(set_text(&mut groups, "B", "Office".into()).unwrap(), EntityKind::Group);
        assert_eq!(groups[1].title, "Office");
        assert_eq!(set_text(&mut groups, "S1", "sink".into()).unwrap(), EntityKind::Subtask);
        assert_eq!(groups[0].tasks[0].subtasks[0].text, "sink");
    }
}
