use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::Group;

/// Opaque id of a list document in the shared store
pub type ListId = String;

/// The root document: a titled, ordered sequence of groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocument {
    pub id: ListId,
    pub title: String,
    pub groups: Vec<Group>,
    pub updated_at: DateTime<Utc>,
}

/// A document as handed back by a store, before normalization.
/// `groups` may hold anything the store was given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDocument {
    pub id: ListId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub groups: serde_json::Value,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}
