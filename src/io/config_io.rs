use std::fs;
use std::path::{Path, PathBuf};

use crate::io::file_store::{LISTS_DIR, atomic_write};
use crate::model::TrellisConfig;

pub const TRELLIS_DIR: &str = ".trellis";
pub const CONFIG_FILE: &str = "config.toml";

/// Error type for workspace configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("not a trellis workspace: no .trellis/config.toml found (run `trl init`)")]
    NotAWorkspace,
    #[error("already initialized: {0} exists")]
    AlreadyInitialized(PathBuf),
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config.toml: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("could not serialize config.toml: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Find the workspace root by walking up from `start` until a directory
/// holding `.trellis/config.toml` is found.
pub fn discover_workspace(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(TRELLIS_DIR).join(CONFIG_FILE).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(ConfigError::NotAWorkspace);
        }
    }
}

pub fn trellis_dir(root: &Path) -> PathBuf {
    root.join(TRELLIS_DIR)
}

/// Read `config.toml` from a `.trellis` directory. Missing keys take defaults.
pub fn read_config(trellis_dir: &Path) -> Result<TrellisConfig, ConfigError> {
    let path = trellis_dir.join(CONFIG_FILE);
    let text = fs::read_to_string(&path).map_err(|source| ConfigError::ReadError { path, source })?;
    Ok(toml::from_str(&text)?)
}

pub fn write_config(trellis_dir: &Path, config: &TrellisConfig) -> Result<(), ConfigError> {
    let path = trellis_dir.join(CONFIG_FILE);
    let text = toml::to_string_pretty(config)?;
    atomic_write(&path, text.as_bytes()).map_err(|source| ConfigError::WriteError { path, source })
}

/// Create `.trellis/` under `root` with a config file and an empty lists
/// directory. Returns the `.trellis` path.
pub fn init_workspace(root: &Path, config: &TrellisConfig) -> Result<PathBuf, ConfigError> {
    let dir = trellis_dir(root);
    if dir.join(CONFIG_FILE).exists() {
        return Err(ConfigError::AlreadyInitialized(dir));
    }
    let lists = dir.join(LISTS_DIR);
    fs::create_dir_all(&lists).map_err(|source| ConfigError::WriteError {
        path: lists,
        source,
    })?;
    write_config(&dir, config)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn init_then_discover_from_subdirectory() {
        let tmp = TempDir::new().unwrap();
        init_workspace(tmp.path(), &TrellisConfig::default()).unwrap();
        let nested = tmp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(discover_workspace(&nested).unwrap(), tmp.path());
        assert!(tmp.path().join(".trellis/lists").is_dir());
    }

    #[test]
    fn discover_fails_outside_workspace() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            discover_workspace(tmp.path()),
            Err(ConfigError::NotAWorkspace)
        ));
    }

    #[test]
    fn init_twice_is_refused() {
        let tmp = TempDir::new().unwrap();
        init_workspace(tmp.path(), &TrellisConfig::default()).unwrap();
        assert!(matches!(
            init_workspace(tmp.path(), &TrellisConfig::default()),
            Err(ConfigError::AlreadyInitialized(_))
        ));
    }

    #[test]
    fn config_round_trips_through_disk() {
        let tmp = TempDir::new().unwrap();
        let mut config = TrellisConfig::default();
        config.list.name = "Chores".into();
        config.drag.live_preview = true;
        let dir = init_workspace(tmp.path(), &config).unwrap();
        assert_eq!(read_config(&dir).unwrap(), config);
    }

    #[test]
    fn partial_config_takes_defaults() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[sync]\nmax_commit_retries = 7\n").unwrap();
        let config = read_config(tmp.path()).unwrap();
        assert_eq!(config.sync.max_commit_retries, 7);
        assert_eq!(config.sync.retry_backoff_ms, 500);
        assert_eq!(config.ui.max_text_width, 60);
    }

    #[test]
    fn bad_toml_is_reported() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[sync\n").unwrap();
        assert!(matches!(read_config(tmp.path()), Err(ConfigError::ParseError(_))));
    }
}
