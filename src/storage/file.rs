use std::fs;
use std::io;
use std::path::Path;

use super::{LogLayout, LogStore};
use crate::utils::paths::ensure_parent_exists;

/// Read the log at `path`. A missing file is an empty store.
pub fn load_log(path: &Path, layout: &dyn LogLayout) -> io::Result<LogStore> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(LogStore::parse(&content, layout)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(LogStore::default()),
        Err(e) => Err(e),
    }
}

/// Replace the log at `path` via a temp file and rename.
pub fn save_log(path: &Path, store: &LogStore, layout: &dyn LogLayout) -> io::Result<()> {
    ensure_parent_exists(path)?;

    let content = store.serialize(layout);
    let temp_path = path.with_extension("tmp");

    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)
}
