use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generate a fresh entity id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Placeholder title for the group at `index` (0-based)
pub fn placeholder_title(index: usize) -> String {
    format!("Group {}", index + 1)
}

/// Outermost level: a titled, collapsible bucket of tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub title: String,
    pub collapsed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tasks: Vec<Task>,
}

/// Middle level. `completed` follows the subtasks whenever there are any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub collapsed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub subtasks: Vec<Subtask>,
}

/// Leaf level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// A blank group stamped at `now`
    pub fn new(title: String, now: DateTime<Utc>) -> Self {
        Group {
            id: new_id(),
            title,
            collapsed: false,
            created_at: now,
            updated_at: now,
            tasks: Vec::new(),
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl Task {
    pub fn new(text: String, now: DateTime<Utc>) -> Self {
        Task {
            id: new_id(),
            text,
            completed: false,
            collapsed: false,
            created_at: now,
            updated_at: now,
            subtasks: Vec::new(),
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Recompute `completed` from the subtasks. Leaves the flag alone when
    /// there are no subtasks, since it is then set directly.
    pub fn derive_completed(&mut self) {
        if !self.subtasks.is_empty() {
            self.completed = self.subtasks.iter().all(|s| s.completed);
        }
    }
}

impl Subtask {
    pub fn new(text: String, now: DateTime<Utc>) -> Self {
        Subtask {
            id: new_id(),
            text,
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
