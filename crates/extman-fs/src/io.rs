//! Atomic I/O operations with file locking

use fs2::FileExt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Error, NormalizedPath, Result};

/// Distinguishes temp files of concurrent writers within one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write content atomically to a file with locking.
///
/// Content goes to a temp file in the same directory, which is exclusively
/// locked, synced and then renamed over the target. Readers see either the
/// previous descriptor or the new one, never a torn write.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let native_path = path.to_native();

    if let Some(parent) = native_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_name = format!(
        ".{}.{}.{}.tmp",
        native_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    let temp_path = native_path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;

    temp_file.unlock().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    fs::rename(&temp_path, &native_path).map_err(|e| Error::io(&native_path, e))?;

    tracing::trace!(path = %path, bytes = content.len(), "Wrote file atomically");
    Ok(())
}

/// Read text content from a file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Write text content to a file atomically.
pub fn write_text(path: &NormalizedPath, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
}

/// Remove a file. A file that is already gone is not an error.
///
/// Returns `true` when a file was actually deleted.
pub fn remove_file(path: &NormalizedPath) -> Result<bool> {
    let native_path = path.to_native();
    match fs::remove_file(&native_path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(&native_path, e)),
    }
}

/// Remove `dir` and its ancestors while they are empty, stopping at `root`.
///
/// `root` itself is never removed.
pub fn prune_empty_dirs(dir: &NormalizedPath, root: &NormalizedPath) -> Result<()> {
    let mut current = Some(dir.clone());
    while let Some(path) = current {
        if path == *root || !path.as_str().starts_with(root.as_str()) {
            break;
        }
        let native = path.to_native();
        let is_empty = match fs::read_dir(&native) {
            Ok(mut entries) => entries.next().is_none(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                current = path.parent();
                continue;
            }
            Err(e) => return Err(Error::io(&native, e)),
        };
        if !is_empty {
            break;
        }
        fs::remove_dir(&native).map_err(|e| Error::io(&native, e))?;
        current = path.parent();
    }
    Ok(())
}

/// Recursively collect files under `dir` whose extension is `extension`.
///
/// A missing directory yields an empty list. Results are sorted so callers
/// get a stable load order.
pub fn list_files(dir: &NormalizedPath, extension: &str) -> Result<Vec<NormalizedPath>> {
    let mut found = Vec::new();
    if !dir.is_dir() {
        return Ok(found);
    }

    let mut pending = vec![dir.clone()];
    while let Some(current) = pending.pop() {
        let native = current.to_native();
        let entries = fs::read_dir(&native).map_err(|e| Error::io(&native, e))?;
        for entry in entries.flatten() {
            let path = NormalizedPath::new(entry.path());
            if path.is_dir() {
                pending.push(path);
            } else if path.extension() == Some(extension) {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}
