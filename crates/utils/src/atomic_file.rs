//! Atomic file writes so a crashed run never leaves a half-written report

use autobake_core::{Error, Result};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Write data to a file atomically by writing to a temporary sibling and renaming
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        Some(_) => PathBuf::from("."),
        None => {
            return Err(Error::configuration(format!(
                "cannot write to '{}': not a file path",
                path.display()
            )))
        }
    };

    fs::create_dir_all(&parent)
        .map_err(|e| Error::file_system(&parent, "create parent directory", e))?;

    // Same directory as the target so the rename never crosses filesystems
    let temp_path = parent.join(format!(".{}.tmp", Uuid::new_v4()));

    let written = (|| -> Result<()> {
        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .map_err(|e| Error::file_system(&temp_path, "create temporary file", e))?;
        file.write_all(content)
            .map_err(|e| Error::file_system(&temp_path, "write temporary file", e))?;
        file.sync_all()
            .map_err(|e| Error::file_system(&temp_path, "sync temporary file", e))
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        Error::file_system(path, "atomic rename", e)
    })
}

/// Serialize `value` as pretty JSON and write it atomically
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut json = serde_json::to_vec_pretty(value)?;
    json.push(b'\n');
    write_atomic(path, &json)
}
