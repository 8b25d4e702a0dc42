use crate::model::Group;

/// Position of a task inside the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskLocation {
    pub group_index: usize,
    pub task_index: usize,
}

/// Position of a subtask inside the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtaskLocation {
    pub group_index: usize,
    pub task_index: usize,
    pub subtask_index: usize,
}

impl SubtaskLocation {
    /// Location of the owning task
    pub fn task(&self) -> TaskLocation {
        TaskLocation {
            group_index: self.group_index,
            task_index: self.task_index,
        }
    }
}

/// Index of a group by id.
pub fn find_group(groups: &[Group], group_id: &str) -> Option<usize> {
    groups.iter().position(|g| g.id == group_id)
}

/// Find a task by id. `None` means it no longer exists.
pub fn find_task(groups: &[Group], task_id: &str) -> Option<TaskLocation> {
    for (group_index, group) in groups.iter().enumerate() {
        if let Some(task_index) = group.tasks.iter().position(|t| t.id == task_id) {
            return Some(TaskLocation {
                group_index,
                task_index,
            });
        }
    }
    None
}

/// Find a subtask by id. `None` means it no longer exists.
pub fn find_subtask(groups: &[Group], subtask_id: &str) -> Option<SubtaskLocation> {
    for (group_index, group) in groups.iter().enumerate() {
        for (task_index, task) in group.tasks.iter().enumerate() {
            if let Some(subtask_index) = task.subtasks.iter().position(|s| s.id == subtask_id) {
                return Some(SubtaskLocation {
                    group_index,
                    task_index,
                    subtask_index,
                });
            }
        }
    }
    None
}

/// Whether any group, task or subtask carries this id.
pub fn contains_id(groups: &[Group], id: &str) -> bool {
    find_group(groups, id).is_some()
        || find_task(groups, id).is_some()
        || find_subtask(groups, id).is_some()
}
