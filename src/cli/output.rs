use serde::Serialize;

use crate::model::{Group, Task};
use crate::util::unicode::{single_line, truncate_to_width};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ListJson<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub groups: &'a [Group],
}

#[derive(Serialize)]
pub struct ListSummaryJson {
    pub id: String,
    pub title: String,
    pub groups: usize,
    pub tasks: usize,
    pub completed: usize,
}

#[derive(Serialize)]
pub struct CreatedJson<'a> {
    pub kind: &'a str,
    pub id: &'a str,
}

#[derive(Serialize)]
pub struct MoveJson<'a> {
    /// "moved", "unchanged" or "rolled_back"
    pub outcome: &'a str,
    pub groups: &'a [Group],
}

impl ListSummaryJson {
    pub fn new(id: String, title: String, groups: &[Group]) -> Self {
        let tasks = groups.iter().flat_map(|g| &g.tasks);
        ListSummaryJson {
            id,
            title,
            groups: groups.len(),
            tasks: tasks.clone().count(),
            completed: tasks.filter(|t| t.completed).count(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tree rendering
// ---------------------------------------------------------------------------

/// Render a list as an indented tree, one entity per line with its id last.
/// Collapsed groups and tasks hide their children unless `show_all`.
pub fn render_tree(title: &str, groups: &[Group], max_width: usize, show_all: bool) -> String {
    let mut out = String::new();
    out.push_str(&single_line(title));
    out.push('\n');
    if groups.is_empty() {
        out.push_str("  (empty)\n");
        return out;
    }
    for group in groups {
        let marker = if group.collapsed { '▸' } else { '▾' };
        push_line(&mut out, 0, &marker.to_string(), &group.title, &group.id, max_width);
        if group.collapsed && !show_all {
            continue;
        }
        for task in &group.tasks {
            render_task(&mut out, task, max_width, show_all);
        }
    }
    out
}

fn render_task(out: &mut String, task: &Task, max_width: usize, show_all: bool) {
    let mut marker = check(task.completed).to_string();
    if task.collapsed && !task.subtasks.is_empty() {
        marker.push('+');
    }
    push_line(out, 1, &marker, &task.text, &task.id, max_width);
    if task.collapsed && !show_all {
        return;
    }
    for subtask in &task.subtasks {
        push_line(out, 2, check(subtask.completed), &subtask.text, &subtask.id, max_width);
    }
}

fn check(completed: bool) -> &'static str {
    if completed { "[x]" } else { "[ ]" }
}

fn push_line(out: &mut String, depth: usize, marker: &str, text: &str, id: &str, max_width: usize) {
    let text = truncate_to_width(&single_line(text), max_width);
    out.push_str(&"  ".repeat(depth + 1));
    out.push_str(marker);
    if !text.is_empty() {
        out.push(' ');
        out.push_str(&text);
    }
    out.push_str("  #");
    out.push_str(id);
    out.push('\n');
}
