//! JSON snapshot files for the session store.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::PersistError;
use crate::store::StoreSnapshot;

/// Read a snapshot from `path`. A missing file yields an empty snapshot.
pub fn load_snapshot(path: &Path) -> Result<StoreSnapshot, PersistError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no snapshot file, starting empty");
            return Ok(StoreSnapshot::default());
        }
        Err(source) => {
            return Err(PersistError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&text).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a snapshot to `path`.
///
/// The JSON goes to a sibling temporary file first and is renamed over the
/// target, so readers never observe a partially written file.
pub fn save_snapshot(path: &Path, snapshot: &StoreSnapshot) -> Result<(), PersistError> {
    let json = serde_json::to_string_pretty(snapshot).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = temp_path(path);
    let io_err = |source| PersistError::Io {
        path: tmp.clone(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(&tmp, json).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), sessions = snapshot.sessions.len(), "snapshot saved");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SessionStore;
    use fb_core::{Choice, Segment, StoryMetadata};
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let snap = load_snapshot(&dir.path().join("none.json")).unwrap();
        assert!(snap.sessions.is_empty());
        assert!(snap.current.is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("sessions.json");

        let mut store = SessionStore::new();
        store
            .create_session(
                "s1".into(),
                Segment::new(1, "Hello.").with_choices([Choice::new("A", "Wave")]),
                StoryMetadata::new("Pip", "meadow", "kite"),
            )
            .unwrap();
        store.set_current(&"s1".into()).unwrap();

        save_snapshot(&path, &store.snapshot()).unwrap();
        assert!(!temp_path(&path).exists());

        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded, store.snapshot());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_snapshot(&path),
            Err(PersistError::Json { .. })
        ));
    }
}
