use serde::{Deserialize, Serialize};

/// Configuration from `.trellis/config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrellisConfig {
    #[serde(default)]
    pub list: ListConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub drag: DragConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListConfig {
    /// Name given to lists created without an explicit `--name`
    #[serde(default = "default_list_name")]
    pub name: String,
}

impl Default for ListConfig {
    fn default() -> Self {
        ListConfig {
            name: default_list_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Retries of a failed commit before the list is considered diverged
    #[serde(default = "default_max_commit_retries")]
    pub max_commit_retries: u32,
    /// Delay before the first retry; doubles on each further attempt
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            max_commit_retries: default_max_commit_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragConfig {
    /// Re-project every move while hovering, not only cross-group task moves.
    #[serde(default)]
    pub live_preview: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiConfig {
    /// Task text wider than this many cells is truncated in tree output
    #[serde(default = "default_max_text_width")]
    pub max_text_width: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            max_text_width: default_max_text_width(),
        }
    }
}

fn default_list_name() -> String {
    "Tasks".to_string()
}

fn default_max_commit_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_max_text_width() -> usize {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: TrellisConfig = toml::from_str("").unwrap();
        assert_eq!(config, TrellisConfig::default());
        assert_eq!(config.sync.max_commit_retries, 3);
        assert_eq!(config.sync.retry_backoff_ms, 500);
        assert!(!config.drag.live_preview);
        assert_eq!(config.ui.max_text_width, 60);
    }

    #[test]
    fn partial_sections_fill_in() {
        let config: TrellisConfig = toml::from_str(
            r#"
[drag]
live_preview = true

[sync]
retry_backoff_ms = 50
"#,
        )
        .unwrap();
        assert!(config.drag.live_preview);
        assert_eq!(config.sync.retry_backoff_ms, 50);
        assert_eq!(config.sync.max_commit_retries, 3);
        assert_eq!(config.list.name, "Tasks");
    }
}
