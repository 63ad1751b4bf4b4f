//! Temp-file-then-rename writes.
//!
//! Every mutation of a live file goes through [`write_atomic`]. The temp file
//! is created next to the target so the final rename never crosses a
//! filesystem boundary. If the writer closure fails (or panics) the temp file
//! is dropped, which unlinks it, and the target keeps its previous bytes.

use crate::error::{Result, StorageError};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Write `target` through a sibling temp file and an atomic rename.
///
/// Permission bits of an existing `target` are carried over to the new file.
/// A new `target` gets the same mode a plain create would give it (0666
/// less the umask on Unix).
pub fn write_atomic<F>(target: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "vocabmaster".to_string());

    let existing = fs::metadata(target).ok().map(|meta| meta.permissions());

    let prefix = format!(".{file_name}.");
    let mut builder = tempfile::Builder::new();
    builder.prefix(&prefix).suffix(".tmp");
    if existing.is_none() {
        plain_create_mode(&mut builder);
    }
    let mut tmp = builder.tempfile_in(dir).map_err(StorageError::io(dir))?;

    write(tmp.as_file_mut()).map_err(StorageError::io(target))?;
    tmp.as_file_mut()
        .flush()
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(StorageError::io(tmp.path()))?;

    if let Some(permissions) = existing {
        fs::set_permissions(tmp.path(), permissions).map_err(StorageError::io(target))?;
    }

    tmp.persist(target)
        .map_err(|err| StorageError::io(target)(err.error))?;
    tracing::debug!(path = %target.display(), "atomic write committed");
    Ok(())
}

#[cfg(unix)]
fn plain_create_mode(builder: &mut tempfile::Builder<'_, '_>) {
    use std::os::unix::fs::PermissionsExt;
    builder.permissions(fs::Permissions::from_mode(0o666));
}

#[cfg(not(unix))]
fn plain_create_mode(_builder: &mut tempfile::Builder<'_, '_>) {}

/// Convenience wrapper for callers that already hold the full content.
pub fn write_atomic_bytes(target: &Path, bytes: &[u8]) -> Result<()> {
    write_atomic(target, |file| file.write_all(bytes))
}
