//! On-disk layout of a user's event store
//!
//! A store file is JSONL: a `StoreMeta` header line followed by one
//! serialized `EventRecord` per line. Saves go through
//! `atomic_write_with`, and the previous good file is kept as a backup.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{FeedError, FeedResult};
use crate::types::{EventRecord, StoreMeta};
use crate::utils::atomic_write_with;

/// Reads and writes one store file plus its backup
pub struct StoreFile {
    path: PathBuf,
    backup_path: PathBuf,
}

impl StoreFile {
    pub fn new(path: PathBuf, backup_path: PathBuf) -> Self {
        Self { path, backup_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write `records` atomically, rotating the current file to the backup
    pub fn save<'a, I>(&self, user: &str, records: I) -> FeedResult<()>
    where
        I: ExactSizeIterator<Item = &'a EventRecord>,
    {
        let meta = StoreMeta::new(user, records.len());

        atomic_write_with(&self.path, Some(self.backup_path.as_path()), |file| {
            let to_io = |e: serde_json::Error| std::io::Error::new(std::io::ErrorKind::InvalidData, e);

            writeln!(file, "{}", meta.to_json_line().map_err(to_io)?)?;
            for record in records {
                writeln!(file, "{}", serde_json::to_string(record).map_err(to_io)?)?;
            }
            Ok(())
        })?;

        debug!(
            path = %self.path.display(),
            records = meta.record_count,
            "Saved event store"
        );

        Ok(())
    }

    /// Load the primary file. `None` when neither it nor a backup exists.
    ///
    /// A missing primary next to a backup means a save was interrupted
    /// (or the file was removed by hand); the backup is loaded instead.
    pub fn load(&self) -> FeedResult<Option<(StoreMeta, Vec<EventRecord>)>> {
        if !self.path.exists() && self.backup_path.exists() {
            warn!(
                path = %self.path.display(),
                "Event store missing, falling back to backup"
            );
            return self.load_backup();
        }
        read_store(&self.path)
    }

    /// Load the backup written by the previous save
    pub fn load_backup(&self) -> FeedResult<Option<(StoreMeta, Vec<EventRecord>)>> {
        let loaded = read_store(&self.backup_path)?;
        if let Some((_, records)) = &loaded {
            info!(
                path = %self.backup_path.display(),
                records = records.len(),
                "Recovered event store from backup"
            );
        }
        Ok(loaded)
    }
}

fn read_store(path: &Path) -> FeedResult<Option<(StoreMeta, Vec<EventRecord>)>> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    // First line is metadata
    let meta_line = lines
        .next()
        .ok_or_else(|| FeedError::StorageCorrupt(format!("{}: empty store file", path.display())))?
        .map_err(|e| read_error(path, e))?;
    let meta = StoreMeta::from_json_line(&meta_line).map_err(|e| {
        FeedError::StorageCorrupt(format!("{}: bad header: {}", path.display(), e))
    })?;

    if !meta.is_supported() {
        return Err(FeedError::StorageCorrupt(format!(
            "{}: unsupported store format {:?} version {}",
            path.display(),
            meta.format,
            meta.version
        )));
    }

    let mut records = Vec::with_capacity(meta.record_count);
    for (line_num, line_result) in lines.enumerate() {
        let line = line_result.map_err(|e| read_error(path, e))?;
        if line.trim().is_empty() {
            continue;
        }

        let record: EventRecord = serde_json::from_str(&line).map_err(|e| {
            FeedError::StorageCorrupt(format!("{}: line {}: {}", path.display(), line_num + 2, e))
        })?;
        records.push(record);
    }

    if records.len() != meta.record_count {
        warn!(
            path = %path.display(),
            expected = meta.record_count,
            found = records.len(),
            "Event store record count mismatch"
        );
    }

    Ok(Some((meta, records)))
}

/// Undecodable bytes mean a corrupt store, anything else is a real IO failure
fn read_error(path: &Path, e: std::io::Error) -> FeedError {
    if e.kind() == std::io::ErrorKind::InvalidData {
        FeedError::StorageCorrupt(format!("{}: {}", path.display(), e))
    } else {
        FeedError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_file() -> (StoreFile, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let file = StoreFile::new(
            temp_dir.path().join("events.jsonl"),
            temp_dir.path().join("events.jsonl.bak"),
        );
        (file, temp_dir)
    }

    fn record(id: &str) -> EventRecord {
        EventRecord::from_json(
            json!({
                "id": id,
                "created_at": "2024-06-01T12:00:00Z",
                "repo": {"name": "acme/widgets"},
                "actor": {"login": "octocat"},
                "payload": {"issue": {"title": "Leak", "html_url": "https://example/issues/1"}}
            }),
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_save_and_load() {
        let (file, _temp_dir) = create_test_file();
        let records = vec![record("1"), record("2")];

        file.save("octocat", records.iter()).unwrap();

        let (meta, loaded) = file.load().unwrap().unwrap();
        assert_eq!(meta.user, "octocat");
        assert_eq!(meta.record_count, 2);
        assert_eq!(loaded, records);
    }

    #[test]
    fn test_missing_file_returns_none() {
        let (file, _temp_dir) = create_test_file();
        assert!(!file.exists());
        assert!(file.load().unwrap().is_none());
        assert!(file.load_backup().unwrap().is_none());
    }

    #[test]
    fn test_missing_primary_loads_backup() {
        let (file, _temp_dir) = create_test_file();
        file.save("octocat", [record("1")].iter()).unwrap();
        fs::rename(file.path(), file.backup_path()).unwrap();

        let (_, loaded) = file.load().unwrap().unwrap();
        assert_eq!(loaded, vec![record("1")]);
    }

    #[test]
    fn test_save_keeps_primary_while_rotating() {
        let (file, _temp_dir) = create_test_file();
        file.save("octocat", [record("1")].iter()).unwrap();
        file.save("octocat", [record("1"), record("2")].iter()).unwrap();

        let (_, current) = file.load().unwrap().unwrap();
        let (_, previous) = file.load_backup().unwrap().unwrap();
        assert_eq!(current.len(), 2);
        assert_eq!(previous, vec![record("1")]);
    }

    #[test]
    fn test_empty_file_is_corrupt() {
        let (file, _temp_dir) = create_test_file();
        fs::write(file.path(), "").unwrap();
        assert!(matches!(file.load(), Err(FeedError::StorageCorrupt(_))));
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let (file, _temp_dir) = create_test_file();
        fs::write(file.path(), b"\x80\x04\x95pickle").unwrap();
        assert!(matches!(file.load(), Err(FeedError::StorageCorrupt(_))));
    }

    #[test]
    fn test_bad_record_line_is_corrupt() {
        let (file, _temp_dir) = create_test_file();
        file.save("octocat", [record("1")].iter()).unwrap();

        let mut content = fs::read_to_string(file.path()).unwrap();
        content.push_str("{\"id\": 5}\n");
        fs::write(file.path(), content).unwrap();

        match file.load() {
            Err(FeedError::StorageCorrupt(msg)) => assert!(msg.contains("line 3")),
            other => panic!("expected corrupt store, got {:?}", other),
        }
    }

    #[test]
    fn test_future_version_is_corrupt() {
        let (file, _temp_dir) = create_test_file();
        let mut meta = StoreMeta::new("octocat", 0);
        meta.version = 99;
        fs::write(file.path(), format!("{}\n", meta.to_json_line().unwrap())).unwrap();

        assert!(matches!(file.load(), Err(FeedError::StorageCorrupt(_))));
    }

    #[test]
    fn test_count_mismatch_still_loads() {
        let (file, _temp_dir) = create_test_file();
        let meta = StoreMeta::new("octocat", 5);
        let line = serde_json::to_string(&record("1")).unwrap();
        fs::write(file.path(), format!("{}\n{}\n", meta.to_json_line().unwrap(), line)).unwrap();

        let (_, records) = file.load().unwrap().unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_backup_holds_previous_save() {
        let (file, _temp_dir) = create_test_file();
        file.save("octocat", [record("1")].iter()).unwrap();
        file.save("octocat", [record("1"), record("2")].iter()).unwrap();

        let (_, latest) = file.load().unwrap().unwrap();
        let (_, previous) = file.load_backup().unwrap().unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(previous.len(), 1);
    }
}
