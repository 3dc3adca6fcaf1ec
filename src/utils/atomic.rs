//! Atomic file operations
//!
//! Store files are replaced, never edited in place:
//!
//! 1. Write the new content to a sibling `.tmp` file
//! 2. `sync_all()` it
//! 3. Optionally copy the current file to a backup path (itself via a temp file)
//! 4. Rename the temp file over the destination
//!
//! The destination is only ever touched by the final rename, so it always
//! holds either the old content or the new content.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Result type for atomic operations
pub type AtomicResult<T> = Result<T, AtomicError>;

/// Errors that can occur during atomic operations
#[derive(Debug, thiserror::Error)]
pub enum AtomicError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Path of the temp file used while replacing `path`
pub fn temp_path_for(path: &Path) -> PathBuf {
    path.with_extension("tmp")
}

/// Atomically replace `path` with whatever `write_fn` writes
///
/// When `backup` is given and `path` already exists, the current file is
/// copied to `backup` just before the final rename.
pub fn atomic_write_with<F>(path: &Path, backup: Option<&Path>, write_fn: F) -> AtomicResult<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let temp_path = temp_path_for(path);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    {
        let mut file = File::create(&temp_path)?;
        if let Err(e) = write_fn(&mut file).and_then(|_| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
    }

    if let Some(backup) = backup {
        if path.exists() {
            if let Err(e) = copy_to_backup(path, backup) {
                let _ = fs::remove_file(&temp_path);
                return Err(e.into());
            }
        }
    }

    fs::rename(&temp_path, path)?;

    Ok(())
}

fn copy_to_backup(path: &Path, backup: &Path) -> io::Result<()> {
    let backup_temp = temp_path_for(backup);
    let result = fs::copy(path, &backup_temp)
        .and_then(|_| File::open(&backup_temp)?.sync_all())
        .and_then(|_| fs::rename(&backup_temp, backup));
    if result.is_err() {
        let _ = fs::remove_file(&backup_temp);
    }
    result
}

/// Remove `.tmp` files left behind by interrupted writes
///
/// Walks `dir` recursively. Returns how many files were removed.
pub fn cleanup_temp_files<P: AsRef<Path>>(dir: P) -> AtomicResult<usize> {
    let dir = dir.as_ref();
    let mut cleaned = 0;

    if !dir.exists() {
        return Ok(0);
    }

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type()?.is_dir() {
            cleaned += cleanup_temp_files(&path)?;
        } else if path.extension().map(|e| e == "tmp").unwrap_or(false) {
            fs::remove_file(&path)?;
            cleaned += 1;
        }
    }

    Ok(cleaned)
}
