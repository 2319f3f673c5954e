//! Storage layer for JSON persistence
//!
//! Every data file lives in one config directory. Writes go through a
//! temporary sibling file and a rename, so a crash mid-write leaves either
//! the old or the new content on disk, never a truncated mix.

use crate::config::app::NAME;
use crate::error::{AppError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Get the default application config directory path
pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join(NAME))
        .ok_or_else(|| {
            AppError::Config(
                "Could not determine config directory. HOME environment variable may not be set."
                    .to_string(),
            )
        })
}

/// Resolve the config directory, honoring an explicit override
pub fn resolve_config_dir(override_dir: Option<&Path>) -> Result<PathBuf> {
    match override_dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => config_dir(),
    }
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| {
        let msg = match e.kind() {
            ErrorKind::PermissionDenied => {
                format!("Permission denied: cannot create directory {:?}", dir)
            }
            _ => format!("Failed to create directory {:?}: {}", dir, e),
        };
        AppError::Config(msg)
    })
}

/// Read file contents; a missing file is `Ok(None)`
fn read_file(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(AppError::Config(format!(
            "Permission denied: cannot read {:?}",
            path
        ))),
        Err(e) => Err(AppError::Config(format!("Failed to read {:?}: {}", path, e))),
    }
}

/// Replace `path` with `content` via a temporary file and rename
fn write_file_atomic(path: &Path, content: &str) -> Result<()> {
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| AppError::Config(format!("Not a file path: {:?}", path)))?;
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, content).map_err(|e| {
        let msg = match e.kind() {
            ErrorKind::PermissionDenied => format!("Permission denied: cannot write to {:?}", path),
            ErrorKind::ReadOnlyFilesystem => {
                format!("Cannot write to {:?}: filesystem is read-only", path)
            }
            _ => format!("Failed to write to {:?}: {}", path, e),
        };
        AppError::Config(msg)
    })?;

    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        AppError::Config(format!("Failed to replace {:?}: {}", path, e))
    })
}

/// Load data from a JSON file
///
/// Returns `None` if the file doesn't exist or is blank.
/// Returns an error if the file exists but can't be read or parsed.
pub fn load_from<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match read_file(path)? {
        Some(c) => c,
        None => return Ok(None),
    };

    if content.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| AppError::Config(format!("Failed to parse {:?}: {}", path, e)))
}

/// Save data to a JSON file
///
/// Creates parent directories if they don't exist.
pub fn save_to<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }

    let content = serde_json::to_string_pretty(data)
        .map_err(|e| AppError::Config(format!("Failed to serialize data: {}", e)))?;

    write_file_atomic(path, &content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::env::temp_dir;
    use std::sync::atomic::{AtomicU32, Ordering};

    static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn temp_path(name: &str) -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        temp_dir().join(format!(
            "courtside_storage_{}_{}_{}.json",
            std::process::id(),
            id,
            name
        ))
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        label: String,
        count: u32,
    }

    #[test]
    fn save_then_load() {
        let path = temp_path("roundtrip");
        let data = Sample {
            label: "air horn".to_string(),
            count: 3,
        };

        save_to(&path, &data).unwrap();
        let loaded: Option<Sample> = load_from(&path).unwrap();
        assert_eq!(loaded, Some(data));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_loads_as_none() {
        let loaded: Option<Sample> = load_from(&temp_path("absent")).unwrap();
        assert_eq!(loaded, None);
    }

    #[test]
    fn blank_file_loads_as_none() {
        let path = temp_path("blank");
        fs::write(&path, "  \n").unwrap();

        let loaded: Option<Sample> = load_from(&path).unwrap();
        assert_eq!(loaded, None);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn invalid_json_is_an_error_naming_the_file() {
        let path = temp_path("broken");
        fs::write(&path, "{ not json").unwrap();

        let err = load_from::<Sample>(&path).unwrap_err().to_string();
        assert!(err.contains("broken"), "{err}");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let path = temp_path("atomic");
        save_to(&path, &Sample { label: "x".into(), count: 1 }).unwrap();

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        assert!(!PathBuf::from(tmp).exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn save_overwrites_previous_content() {
        let path = temp_path("overwrite");
        save_to(&path, &Sample { label: "old".into(), count: 1 }).unwrap();
        save_to(&path, &Sample { label: "new".into(), count: 2 }).unwrap();

        let loaded: Sample = load_from(&path).unwrap().unwrap();
        assert_eq!(loaded.label, "new");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn save_creates_parent_dirs() {
        let root = temp_dir().join(format!(
            "courtside_nested_{}_{}",
            std::process::id(),
            TEST_COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        let path = root.join("deeper").join("data.json");

        save_to(&path, &Sample { label: "nested".into(), count: 9 }).unwrap();
        assert!(path.exists());

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn override_dir_wins() {
        let dir = temp_dir().join("courtside_override");
        assert_eq!(resolve_config_dir(Some(&dir)).unwrap(), dir);
    }
}
