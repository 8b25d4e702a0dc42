//! Repair of groups received from the store.
//!
//! Anything the store hands back is coerced into canonical [`Group`]s:
//! missing or invalid ids are regenerated, missing titles get a
//! sequence-based placeholder, flags are coerced from truthy/falsy values and
//! children always come out as vectors. Nothing here fails. Re-normalizing
//! canonical data returns it unchanged.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;
use serde_json::{Map, Value};

use crate::model::{Group, ListDocument, RawDocument, Subtask, Task, new_id, placeholder_title};

static ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,127}$").expect("valid id pattern"));

const UNTITLED_LIST: &str = "Untitled";

/// Normalize a raw children tree, stamping defaulted timestamps with the current time.
pub fn normalize(raw: &Value) -> Vec<Group> {
    normalize_at(raw, Utc::now())
}

/// Normalize a raw children tree. `now` fills in missing timestamps.
///
/// Accepts a bare array of groups or an object with a `groups` array; any
/// other shape yields an empty tree.
pub fn normalize_at(raw: &Value, now: DateTime<Utc>) -> Vec<Group> {
    let mut seen = HashSet::new();
    group_entries(raw)
        .iter()
        .enumerate()
        .map(|(index, entry)| normalize_group(entry, index, now, &mut seen))
        .collect()
}

/// Normalize a whole document as received from the store.
pub fn normalize_document(raw: &RawDocument) -> ListDocument {
    let title = raw.title.trim();
    ListDocument {
        id: raw.id.clone(),
        title: if title.is_empty() {
            UNTITLED_LIST.to_string()
        } else {
            raw.title.clone()
        },
        groups: normalize(&raw.groups),
        updated_at: raw.updated_at,
    }
}

/// Whether `id` is acceptable as an entity id
pub fn is_valid_id(id: &str) -> bool {
    ID_PATTERN.is_match(id)
}

fn group_entries(raw: &Value) -> &[Value] {
    match raw {
        Value::Array(items) => items,
        Value::Object(map) => children(map, "groups"),
        _ => &[],
    }
}

fn normalize_group(
    entry: &Value,
    index: usize,
    now: DateTime<Utc>,
    seen: &mut HashSet<String>,
) -> Group {
    let empty = Map::new();
    let fields = entry.as_object().unwrap_or(&empty);

    let title = text_field(fields, &["title", "name"])
        .or_else(|| orphan_text(entry))
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| placeholder_title(index));
    let created_at = timestamp(fields.get("createdAt")).unwrap_or(now);

    Group {
        id: take_id(fields.get("id"), seen),
        title,
        collapsed: truthy(fields.get("collapsed")),
        created_at,
        updated_at: timestamp(fields.get("updatedAt")).unwrap_or(created_at),
        tasks: children(fields, "tasks")
            .iter()
            .map(|t| normalize_task(t, now, seen))
            .collect(),
    }
}

fn normalize_task(entry: &Value, now: DateTime<Utc>, seen: &mut HashSet<String>) -> Task {
    let empty = Map::new();
    let fields = entry.as_object().unwrap_or(&empty);
    let created_at = timestamp(fields.get("createdAt")).unwrap_or(now);

    let mut task = Task {
        id: take_id(fields.get("id"), seen),
        text: text_field(fields, &["text", "title"])
            .or_else(|| orphan_text(entry))
            .unwrap_or_default(),
        completed: truthy(fields.get("completed")),
        collapsed: truthy(fields.get("collapsed")),
        created_at,
        updated_at: timestamp(fields.get("updatedAt")).unwrap_or(created_at),
        subtasks: children(fields, "subtasks")
            .iter()
            .map(|s| normalize_subtask(s, now, seen))
            .collect(),
    };
    task.derive_completed();
    task
}

fn normalize_subtask(entry: &Value, now: DateTime<Utc>, seen: &mut HashSet<String>) -> Subtask {
    let empty = Map::new();
    let fields = entry.as_object().unwrap_or(&empty);
    let created_at = timestamp(fields.get("createdAt")).unwrap_or(now);

    Subtask {
        id: take_id(fields.get("id"), seen),
        text: text_field(fields, &["text", "title"])
            .or_else(|| orphan_text(entry))
            .unwrap_or_default(),
        completed: truthy(fields.get("completed")),
        created_at,
        updated_at: timestamp(fields.get("updatedAt")).unwrap_or(created_at),
    }
}

fn children<'a>(fields: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    fields
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Keep the incoming id when it is valid and not already taken, else mint one.
fn take_id(raw: Option<&Value>, seen: &mut HashSet<String>) -> String {
    let candidate = match raw {
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    if let Some(id) = candidate
        && is_valid_id(&id)
        && seen.insert(id.clone())
    {
        return id;
    }
    let id = new_id();
    seen.insert(id.clone());
    id
}

fn text_field(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match fields.get(*key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// A bare string sitting where an entity object belongs becomes its text.
fn orphan_text(entry: &Value) -> Option<String> {
    entry.as_str().map(str::to_string)
}

/// Coerce any JSON value to a flag. Strings spelling out a false value count as false.
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "false" | "0" | "no" | "off"
        ),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// RFC 3339 strings or epoch milliseconds
fn timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap()
    }

    fn assert_idempotent(raw: Value) {
        let once = normalize_at(&raw, fixed_now());
        let reserialized = serde_json::to_value(&once).unwrap();
        let twice = normalize_at(&reserialized, fixed_now());
        assert_eq!(once, twice);
    }

    #[test]
    fn idempotent_on_empty_input() {
        assert_idempotent(json!([]));
        assert_idempotent(json!(null));
        assert_idempotent(json!({}));
    }

    #[test]
    fn idempotent_on_partial_input() {
        assert_idempotent(json!([
            { "title": "Work", "tasks": [{ "text": "a", "subtasks": [{ "text": "b" }] }] },
            { "id": "g-2" },
        ]));
    }

    #[test]
    fn idempotent_on_garbage_input() {
        assert_idempotent(json!([1, "loose", [true], { "tasks": "nope", "id": "!!" }]));
        assert_idempotent(json!("not a tree"));
        assert_idempotent(json!({ "groups": [{ "tasks": [null, 7] }] }));
    }

    #[test]
    fn repairs_group_without_ids_or_flags() {
        let groups = normalize_at(&json!([{ "tasks": [{ "text": "buy milk" }] }]), fixed_now());
        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert!(is_valid_id(&group.id));
        assert_eq!(group.title, "Group 1");
        assert!(!group.collapsed);
        assert_eq!(group.tasks.len(), 1);
        let task = &group.tasks[0];
        assert!(is_valid_id(&task.id));
        assert_eq!(task.text, "buy milk");
        assert!(!task.completed);
        assert!(task.subtasks.is_empty());
        assert_eq!(task.created_at, fixed_now());
    }

    #[test]
    fn placeholder_title_follows_position() {
        let groups = normalize_at(&json!([{ "title": "Named" }, {}, { "title": "  " }]), fixed_now());
        let titles: Vec<&str> = groups.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["Named", "Group 2", "Group 3"]);
    }

    #[test]
    fn keeps_valid_ids_and_stringifies_numbers() {
        let groups = normalize_at(&json!([{ "id": "g1", "tasks": [{ "id": 42 }] }]), fixed_now());
        assert_eq!(groups[0].id, "g1");
        assert_eq!(groups[0].tasks[0].id, "42");
    }

    #[test]
    fn duplicate_and_invalid_ids_are_regenerated() {
        let groups = normalize_at(
            &json!([
                { "id": "same", "tasks": [{ "id": "same" }, { "id": "has space" }] },
            ]),
            fixed_now(),
        );
        assert_eq!(groups[0].id, "same");
        assert_ne!(groups[0].tasks[0].id, "same");
        assert_ne!(groups[0].tasks[1].id, "has space");
        assert!(is_valid_id(&groups[0].tasks[1].id));
    }

    #[test]
    fn coerces_flags() {
        assert!(truthy(Some(&json!(true))));
        assert!(truthy(Some(&json!(1))));
        assert!(truthy(Some(&json!("yes"))));
        assert!(truthy(Some(&json!({}))));
        assert!(!truthy(Some(&json!(0))));
        assert!(!truthy(Some(&json!(""))));
        assert!(!truthy(Some(&json!("false"))));
        assert!(!truthy(Some(&json!(null))));
        assert!(!truthy(None));
    }

    #[test]
    fn non_array_children_become_empty() {
        let groups = normalize_at(
            &json!([{ "tasks": { "0": "x" } }, { "tasks": [{ "subtasks": 3 }] }]),
            fixed_now(),
        );
        assert!(groups[0].tasks.is_empty());
        assert!(groups[1].tasks[0].subtasks.is_empty());
    }

    #[test]
    fn loose_strings_are_kept_as_entities() {
        let groups = normalize_at(&json!(["Errands"]), fixed_now());
        assert_eq!(groups[0].title, "Errands");
        let groups = normalize_at(&json!([{ "tasks": ["call mom"] }]), fixed_now());
        assert_eq!(groups[0].tasks[0].text, "call mom");
    }

    #[test]
    fn task_completion_is_derived_from_subtasks() {
        let groups = normalize_at(
            &json!([{ "tasks": [
                { "completed": true, "subtasks": [{ "completed": true }, { "completed": false }] },
                { "completed": false, "subtasks": [{ "completed": 1 }] },
            ] }]),
            fixed_now(),
        );
        assert!(!groups[0].tasks[0].completed);
        assert!(groups[0].tasks[1].completed);
    }

    #[test]
    fn parses_timestamps_in_both_encodings() {
        let groups = normalize_at(
            &json!([
                { "createdAt": "2024-01-02T03:04:05Z" },
                { "createdAt": 1_700_000_000_000i64, "updatedAt": "garbage" },
            ]),
            fixed_now(),
        );
        assert_eq!(
            groups[0].created_at,
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
        );
        assert_eq!(groups[0].updated_at, groups[0].created_at);
        assert_eq!(groups[1].created_at.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(groups[1].updated_at, groups[1].created_at);
    }

    #[test]
    fn accepts_wrapped_groups_object() {
        let groups = normalize_at(&json!({ "groups": [{ "title": "A" }] }), fixed_now());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].title, "A");
    }

    #[test]
    fn document_title_defaults() {
        let raw = RawDocument {
            id: "list-1".into(),
            title: String::new(),
            groups: json!([]),
            updated_at: fixed_now(),
        };
        let doc = normalize_document(&raw);
        assert_eq!(doc.title, "Untitled");
        assert!(doc.groups.is_empty());
    }
}
