//! Hypothetical moves over the group tree.
//!
//! [`project`] answers "what would the tree look like if `active` were
//! dropped on `over`". It never mutates its input: when the move changes
//! nothing (or is not allowed) the input comes back as [`Cow::Borrowed`],
//! so callers can detect a no-op without comparing trees.
//!
//! Rules:
//! - group over anything inside a group: move to that group's index
//! - task over task: insert before it, possibly in another group
//! - task over a group or its task container: append to that group
//! - subtask over subtask / subtask container: reorder within the same task
//!   only; subtasks never change parent
//!
//! Every other pairing is a no-op.

use std::borrow::Cow;

use chrono::{DateTime, Utc};

use crate::dnd::item::DragItem;
use crate::model::Group;
use crate::ops::locate;

/// Project `active` dropped on `over`, stamping moved entities with the current time.
pub fn project<'a>(groups: &'a [Group], active: &DragItem, over: &DragItem) -> Cow<'a, [Group]> {
    project_at(groups, active, over, Utc::now())
}

/// Project `active` dropped on `over`, stamping moved entities with `now`.
pub fn project_at<'a>(
    groups: &'a [Group],
    active: &DragItem,
    over: &DragItem,
    now: DateTime<Utc>,
) -> Cow<'a, [Group]> {
    let moved = match active {
        DragItem::Group(id) => move_group(groups, id, over, now),
        DragItem::Task(id) => move_task(groups, id, over, now),
        DragItem::Subtask(id) => move_subtask(groups, id, over, now),
        DragItem::TaskContainer(_) | DragItem::SubtaskContainer(_) => None,
    };
    match moved {
        Some(tree) => Cow::Owned(tree),
        None => Cow::Borrowed(groups),
    }
}

/// Group index that `over` points into, for group moves.
fn owning_group(groups: &[Group], over: &DragItem) -> Option<usize> {
    match over {
        DragItem::Group(id) | DragItem::TaskContainer(id) => locate::find_group(groups, id),
        DragItem::Task(id) | DragItem::SubtaskContainer(id) => {
            locate::find_task(groups, id).map(|loc| loc.group_index)
        }
        DragItem::Subtask(id) => locate::find_subtask(groups, id).map(|loc| loc.group_index),
    }
}

fn move_group(
    groups: &[Group],
    group_id: &str,
    over: &DragItem,
    now: DateTime<Utc>,
) -> Option<Vec<Group>> {
    let from = locate::find_group(groups, group_id)?;
    let to = owning_group(groups, over)?;
    if from == to {
        return None;
    }

    let mut tree = groups.to_vec();
    let mut group = tree.remove(from);
    group.touch(now);
    tree.insert(to, group);
    Some(tree)
}

fn move_task(
    groups: &[Group],
    task_id: &str,
    over: &DragItem,
    now: DateTime<Utc>,
) -> Option<Vec<Group>> {
    let source = locate::find_task(groups, task_id)?;

    let (target_group, mut target_index) = match over {
        DragItem::Task(id) if id == task_id => return None,
        DragItem::Task(id) => {
            let loc = locate::find_task(groups, id)?;
            (loc.group_index, loc.task_index)
        }
        DragItem::TaskContainer(id) | DragItem::Group(id) => {
            let index = locate::find_group(groups, id)?;
            (index, groups[index].tasks.len())
        }
        DragItem::Subtask(_) | DragItem::SubtaskContainer(_) => return None,
    };

    let same_group = target_group == source.group_index;
    if same_group && source.task_index < target_index {
        // Removing the task first shifts everything after it down by one
        target_index -= 1;
    }
    if same_group && target_index == source.task_index {
        return None;
    }

    let mut tree = groups.to_vec();
    let mut task = tree[source.group_index].tasks.remove(source.task_index);
    task.touch(now);
    tree[source.group_index].touch(now);

    let target = &mut tree[target_group];
    let index = target_index.min(target.tasks.len());
    target.tasks.insert(index, task);
    target.touch(now);
    Some(tree)
}

fn move_subtask(
    groups: &[Group],
    subtask_id: &str,
    over: &DragItem,
    now: DateTime<Utc>,
) -> Option<Vec<Group>> {
    let source = locate::find_subtask(groups, subtask_id)?;
    let parent = source.task();

    let mut target_index = match over {
        DragItem::Subtask(id) if id == subtask_id => return None,
        DragItem::Subtask(id) => {
            let loc = locate::find_subtask(groups, id)?;
            if loc.task() != parent {
                return None;
            }
            loc.subtask_index
        }
        DragItem::SubtaskContainer(id) => {
            let loc = locate::find_task(groups, id)?;
            if loc != parent {
                return None;
            }
            groups[loc.group_index].tasks[loc.task_index].subtasks.len()
        }
        DragItem::Group(_) | DragItem::Task(_) | DragItem::TaskContainer(_) => return None,
    };

    if source.subtask_index < target_index {
        target_index -= 1;
    }
    if target_index == source.subtask_index {
        return None;
    }

    let mut tree = groups.to_vec();
    let group = &mut tree[source.group_index];
    group.touch(now);
    let task = &mut group.tasks[source.task_index];
    let subtask = task.subtasks.remove(source.subtask_index);
    let index = target_index.min(task.subtasks.len());
    task.subtasks.insert(index, subtask);
    task.touch(now);
    Some(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::normalize::normalize_at;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn long_ago() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    fn later() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    /// A=[T1,T2], B=[T3], C=[] ; T1 has subtasks S1..S3, T3 has S4
    fn sample() -> Vec<Group> {
        normalize_at(
            &json!([
                { "id": "A", "tasks": [
                    { "id": "T1", "subtasks": [{ "id": "S1" }, { "id": "S2" }, { "id": "S3" }] },
                    { "id": "T2" },
                ] },
                { "id": "B", "tasks": [{ "id": "T3", "subtasks": [{ "id": "S4" }] }] },
                { "id": "C" },
            ]),
            long_ago(),
        )
    }

    fn group_ids(groups: &[Group]) -> Vec<&str> {
        groups.iter().map(|g| g.id.as_str()).collect()
    }

    fn task_ids<'a>(groups: &'a [Group], group_id: &str) -> Vec<&'a str> {
        let g = groups.iter().find(|g| g.id == group_id).unwrap();
        g.tasks.iter().map(|t| t.id.as_str()).collect()
    }

    fn subtask_ids<'a>(groups: &'a [Group], task_id: &str) -> Vec<&'a str> {
        let loc = locate::find_task(groups, task_id).unwrap();
        groups[loc.group_index].tasks[loc.task_index]
            .subtasks
            .iter()
            .map(|s| s.id.as_str())
            .collect()
    }

    fn task(id: &str) -> DragItem {
        DragItem::Task(id.into())
    }

    fn subtask(id: &str) -> DragItem {
        DragItem::Subtask(id.into())
    }

    fn group(id: &str) -> DragItem {
        DragItem::Group(id.into())
    }

    fn assert_unchanged(groups: &[Group], result: Cow<'_, [Group]>) {
        match result {
            Cow::Borrowed(same) => assert!(std::ptr::eq(same, groups)),
            Cow::Owned(_) => panic!("expected a no-op projection"),
        }
    }

    // --- Groups ---

    #[test]
    fn group_over_group_moves_to_its_index() {
        let groups = sample();
        let moved = project_at(&groups, &group("A"), &group("C"), later());
        assert_eq!(group_ids(&moved), vec!["B", "C", "A"]);
        assert_eq!(moved[2].updated_at, later());
        assert_eq!(moved[0].updated_at, long_ago());
    }

    #[test]
    fn group_reorder_round_trip_restores_order() {
        let groups = sample();
        let forward = project_at(&groups, &group("A"), &group("B"), later()).into_owned();
        assert_eq!(group_ids(&forward), vec!["B", "A", "C"]);
        let back = project_at(&forward, &group("A"), &group("B"), later()).into_owned();
        assert_eq!(group_ids(&back), group_ids(&groups));
    }

    #[test]
    fn group_over_itself_is_noop() {
        let groups = sample();
        assert_unchanged(&groups, project(&groups, &group("B"), &group("B")));
    }

    #[test]
    fn group_over_task_uses_owning_group() {
        let groups = sample();
        let moved = project_at(&groups, &group("C"), &task("T2"), later());
        assert_eq!(group_ids(&moved), vec!["C", "A", "B"]);
    }

    // --- Tasks ---

    #[test]
    fn task_over_other_group_container_appends() {
        let groups = sample();
        let moved = project_at(&groups, &task("T1"), &DragItem::TaskContainer("B".into()), later());
        assert_eq!(task_ids(&moved, "A"), vec!["T2"]);
        assert_eq!(task_ids(&moved, "B"), vec!["T3", "T1"]);
        // moved task keeps its subtasks
        assert_eq!(subtask_ids(&moved, "T1"), vec!["S1", "S2", "S3"]);
    }

    #[test]
    fn task_over_task_in_other_group_inserts_before() {
        let groups = sample();
        let moved = project_at(&groups, &task("T2"), &task("T3"), later());
        assert_eq!(task_ids(&moved, "A"), vec!["T1"]);
        assert_eq!(task_ids(&moved, "B"), vec!["T2", "T3"]);
    }

    #[test]
    fn task_over_empty_group_appends() {
        let groups = sample();
        let moved = project_at(&groups, &task("T3"), &group("C"), later());
        assert_eq!(task_ids(&moved, "B"), Vec::<&str>::new());
        assert_eq!(task_ids(&moved, "C"), vec!["T3"]);
    }

    #[test]
    fn cross_group_move_stamps_both_groups_and_task() {
        let groups = sample();
        let moved = project_at(&groups, &task("T1"), &group("B"), later());
        assert_eq!(moved[0].updated_at, later());
        assert_eq!(moved[1].updated_at, later());
        assert_eq!(moved[2].updated_at, long_ago());
        assert_eq!(moved[1].tasks[1].updated_at, later());
        assert_eq!(moved[1].tasks[0].updated_at, long_ago());
    }

    #[test]
    fn task_moving_up_within_group() {
        let groups = sample();
        let moved = project_at(&groups, &task("T2"), &task("T1"), later());
        assert_eq!(task_ids(&moved, "A"), vec!["T2", "T1"]);
    }

    #[test]
    fn task_over_next_sibling_is_noop_after_shift() {
        let groups = sample();
        // Source precedes target: the target index drops by one and lands
        // back on the source slot.
        assert_unchanged(&groups, project(&groups, &task("T1"), &task("T2")));
    }

    #[test]
    fn task_over_own_container_moves_to_end() {
        let groups = sample();
        let moved = project_at(&groups, &task("T1"), &DragItem::TaskContainer("A".into()), later());
        assert_eq!(task_ids(&moved, "A"), vec!["T2", "T1"]);
        // already last: nothing to do
        assert_unchanged(&groups, project(&groups, &task("T2"), &group("A")));
    }

    #[test]
    fn task_over_subtask_targets_are_ignored() {
        let groups = sample();
        assert_unchanged(&groups, project(&groups, &task("T2"), &subtask("S4")));
        assert_unchanged(
            &groups,
            project(&groups, &task("T2"), &DragItem::SubtaskContainer("T3".into())),
        );
    }

    #[test]
    fn missing_entities_are_noops() {
        let groups = sample();
        assert_unchanged(&groups, project(&groups, &task("gone"), &group("B")));
        assert_unchanged(&groups, project(&groups, &task("T1"), &task("gone")));
        assert_unchanged(&groups, project(&groups, &group("gone"), &group("A")));
        assert_unchanged(&groups, project(&groups, &subtask("gone"), &subtask("S1")));
    }

    #[test]
    fn containers_cannot_be_active() {
        let groups = sample();
        assert_unchanged(
            &groups,
            project(&groups, &DragItem::TaskContainer("A".into()), &group("B")),
        );
    }

    // --- Subtasks ---

    #[test]
    fn subtask_reorders_within_task() {
        let groups = sample();
        let moved = project_at(&groups, &subtask("S3"), &subtask("S1"), later());
        assert_eq!(subtask_ids(&moved, "T1"), vec!["S3", "S1", "S2"]);
        assert_eq!(moved[0].tasks[0].updated_at, later());
        assert_eq!(moved[0].updated_at, later());
    }

    #[test]
    fn subtask_over_own_container_moves_to_end() {
        let groups = sample();
        let moved = project_at(
            &groups,
            &subtask("S1"),
            &DragItem::SubtaskContainer("T1".into()),
            later(),
        );
        assert_eq!(subtask_ids(&moved, "T1"), vec!["S2", "S3", "S1"]);
    }

    #[test]
    fn subtask_cannot_leave_its_task() {
        let groups = sample();
        assert_unchanged(&groups, project(&groups, &subtask("S1"), &subtask("S4")));
        assert_unchanged(
            &groups,
            project(&groups, &subtask("S1"), &DragItem::SubtaskContainer("T3".into())),
        );
        assert_unchanged(&groups, project(&groups, &subtask("S1"), &task("T3")));
    }

    #[test]
    fn input_is_never_mutated() {
        let groups = sample();
        let before = groups.clone();
        let _ = project(&groups, &task("T1"), &group("B"));
        let _ = project(&groups, &subtask("S3"), &subtask("S1"));
        assert_eq!(groups, before);
    }
}
