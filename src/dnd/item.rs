use std::fmt;
use std::str::FromStr;

/// Anything that can be dragged or dropped onto.
///
/// Containers carry the id of their owner: a `TaskContainer` is the append
/// region of a group's task list, a `SubtaskContainer` that of a task's
/// subtask list. Containers are drop targets only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DragItem {
    Group(String),
    Task(String),
    Subtask(String),
    TaskContainer(String),
    SubtaskContainer(String),
}

impl DragItem {
    /// The id this descriptor carries
    pub fn id(&self) -> &str {
        match self {
            DragItem::Group(id)
            | DragItem::Task(id)
            | DragItem::Subtask(id)
            | DragItem::TaskContainer(id)
            | DragItem::SubtaskContainer(id) => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DragItem::Group(_) => "group",
            DragItem::Task(_) => "task",
            DragItem::Subtask(_) => "subtask",
            DragItem::TaskContainer(_) => "tasks",
            DragItem::SubtaskContainer(_) => "subtasks",
        }
    }

    /// Only groups, tasks and subtasks can be picked up.
    pub fn is_draggable(&self) -> bool {
        matches!(
            self,
            DragItem::Group(_) | DragItem::Task(_) | DragItem::Subtask(_)
        )
    }
}

impl fmt::Display for DragItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseDragItemError {
    #[error("expected KIND:ID, got {0:?}")]
    MissingSeparator(String),
    #[error("unknown item kind {0:?} (expected group, task, subtask, tasks or subtasks)")]
    UnknownKind(String),
    #[error("empty id in {0:?}")]
    EmptyId(String),
}

impl FromStr for DragItem {
    type Err = ParseDragItemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| ParseDragItemError::MissingSeparator(s.to_string()))?;
        let id = id.trim();
        if id.is_empty() {
            return Err(ParseDragItemError::EmptyId(s.to_string()));
        }
        let id = id.to_string();
        match kind.trim() {
            "group" => Ok(DragItem::Group(id)),
            "task" => Ok(DragItem::Task(id)),
            "subtask" => Ok(DragItem::Subtask(id)),
            "tasks" => Ok(DragItem::TaskContainer(id)),
            "subtasks" => Ok(DragItem::SubtaskContainer(id)),
            other => Err(ParseDragItemError::UnknownKind(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_kind() {
        assert_eq!("group:g1".parse(), Ok(DragItem::Group("g1".into())));
        assert_eq!("task:t1".parse(), Ok(DragItem::Task("t1".into())));
        assert_eq!("subtask:s1".parse(), Ok(DragItem::Subtask("s1".into())));
        assert_eq!("tasks:g1".parse(), Ok(DragItem::TaskContainer("g1".into())));
        assert_eq!(
            "subtasks:t1".parse(),
            Ok(DragItem::SubtaskContainer("t1".into()))
        );
    }

    #[test]
    fn rejects_unknown_shapes() {
        assert!(matches!(
            "t1".parse::<DragItem>(),
            Err(ParseDragItemError::MissingSeparator(_))
        ));
        assert!(matches!(
            "column:t1".parse::<DragItem>(),
            Err(ParseDragItemError::UnknownKind(_))
        ));
        assert!(matches!(
            "task: ".parse::<DragItem>(),
            Err(ParseDragItemError::EmptyId(_))
        ));
    }

    #[test]
    fn display_round_trips() {
        let item = DragItem::SubtaskContainer("abc".into());
        assert_eq!(item.to_string(), "subtasks:abc");
        assert_eq!(item.to_string().parse(), Ok(item));
    }

    #[test]
    fn containers_are_not_draggable() {
        assert!(DragItem::Group("g".into()).is_draggable());
        assert!(!DragItem::TaskContainer("g".into()).is_draggable());
        assert!(!DragItem::SubtaskContainer("t".into()).is_draggable());
    }
}
