//! File-based StateStore implementation.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::codec::{Record, RecordCodec};
use crate::error::{Result, StoreError};
use crate::schema::MessageType;
use crate::store::StateStore;

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Stores each record as a raw protobuf blob at the given path.
///
/// # Write protocol
///
/// 1. Encode the record.
/// 2. Write it to a uniquely named temp file next to the target and fsync.
/// 3. Rename the temp file over the target, then fsync the directory.
///
/// A crash at any point leaves either the old file or the new one. Parent
/// directories are never created: a record can only be written where its
/// entity directory already exists.
///
/// Once the rename succeeds the write is reported as done. A failed
/// directory fsync after that point is logged, not returned.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    codec: RecordCodec,
    sync_dir: fn(&Path) -> io::Result<()>,
}

impl Default for FileStateStore {
    fn default() -> Self {
        Self {
            codec: RecordCodec,
            sync_dir: sync_parent,
        }
    }
}

impl FileStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn with_dir_sync(sync_dir: fn(&Path) -> io::Result<()>) -> Self {
        Self {
            codec: RecordCodec,
            sync_dir,
        }
    }
}

impl StateStore for FileStateStore {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn load(&self, path: &Path, message_type: &MessageType) -> Result<Option<Record>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };

        let record = self.codec.decode(&bytes, message_type)?;

        tracing::debug!(
            "Loaded {} ({} bytes) from {}",
            message_type.name(),
            bytes.len(),
            path.display()
        );

        Ok(Some(record))
    }

    fn write(&self, path: &Path, record: &Record, message_type: &MessageType) -> Result<()> {
        let bytes = self.codec.encode(record, message_type)?;
        let temp_path = temp_path_for(path);

        if let Err(e) = write_synced(&temp_path, &bytes) {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::io(&temp_path, e));
        }

        // Atomic rename
        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::io(path, e));
        }

        // The target already holds the new bytes.
        if let Err(e) = (self.sync_dir)(path) {
            tracing::warn!(
                "Saved {} but directory sync failed: {}",
                path.display(),
                e
            );
        }

        tracing::debug!(
            "Saved {} ({} bytes) to {}",
            message_type.name(),
            bytes.len(),
            path.display()
        );

        Ok(())
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::File::open(dir)?.sync_all(),
        _ => Ok(()),
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// `<dir>/.<name>.<pid>.<seq>.tmp`, unique per process and call.
fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("record");
    let tmp_name = format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TEMP_SEQ.fetch_add(1, Ordering::Relaxed)
    );
    match path.parent() {
        Some(parent) => parent.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;
    use crate::records::CurrencyRecord;
    use crate::testing::fixture_schema;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileStateStore) {
        let temp_dir = TempDir::new().unwrap();
        (temp_dir, FileStateStore::new())
    }

    fn sample(id: &str, balance: i64) -> CurrencyRecord {
        CurrencyRecord {
            id: id.to_string(),
            balance,
            ..CurrencyRecord::default()
        }
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_write_and_read() {
        let (temp, store) = setup();
        let schema = fixture_schema();
        let path = temp.path().join("1.currency");

        let record = sample("1", 25).to_record(&schema).unwrap();
        store.write(&path, &record, schema.currency()).unwrap();

        assert!(store.exists(&path));
        let loaded = store.read(&path, schema.currency()).unwrap();
        assert_eq!(loaded, record);
        assert_eq!(dir_entries(temp.path()), vec!["1.currency".to_string()]);
    }

    #[test]
    fn test_overwrite_replaces_contents() {
        let (temp, store) = setup();
        let schema = fixture_schema();
        let path = temp.path().join("1.currency");

        let first = sample("1", 25).to_record(&schema).unwrap();
        let second = sample("1", 99).to_record(&schema).unwrap();
        store.write(&path, &first, schema.currency()).unwrap();
        store.write(&path, &second, schema.currency()).unwrap();

        let loaded = store.read(&path, schema.currency()).unwrap();
        assert_eq!(CurrencyRecord::from_record(&loaded, &schema).unwrap().balance, 99);
        assert_eq!(dir_entries(temp.path()), vec!["1.currency".to_string()]);
    }

    #[test]
    fn test_missing_file() {
        let (temp, store) = setup();
        let schema = fixture_schema();
        let path = temp.path().join("nobody").join("nobody.currency");

        assert!(!store.exists(&path));
        assert!(store.load(&path, schema.currency()).unwrap().is_none());
        assert!(store.read(&path, schema.currency()).unwrap_err().is_not_found());
        assert!(!temp.path().join("nobody").exists());
    }

    #[test]
    fn test_malformed_file_is_a_decode_error() {
        let (temp, store) = setup();
        let schema = fixture_schema();
        let path = temp.path().join("bad.land");
        // Field 1, length-delimited, claims 100 bytes but carries 2.
        fs::write(&path, [0x0a, 0x64, 0x01, 0x02]).unwrap();

        let err = store.read(&path, schema.land()).unwrap_err();
        assert!(matches!(err, StoreError::Codec(CodecError::Decode { .. })));
    }

    #[test]
    fn test_write_without_parent_dir_fails_cleanly() {
        let (temp, store) = setup();
        let schema = fixture_schema();
        let path = temp.path().join("missing").join("x.currency");

        let record = sample("x", 1).to_record(&schema).unwrap();
        let err = store.write(&path, &record, schema.currency()).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(!temp.path().join("missing").exists());
    }

    #[test]
    fn test_dir_sync_failure_after_rename_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let store = FileStateStore::with_dir_sync(|_| Err(io::Error::other("fsync refused")));
        let schema = fixture_schema();
        let path = temp.path().join("1.currency");

        let record = sample("1", 7).to_record(&schema).unwrap();
        store.write(&path, &record, schema.currency()).unwrap();

        assert_eq!(store.read(&path, schema.currency()).unwrap(), record);
        assert_eq!(dir_entries(temp.path()), vec!["1.currency".to_string()]);
    }

    #[test]
    fn test_write_rejects_wrong_message_type() {
        let (temp, store) = setup();
        let schema = fixture_schema();
        let path = temp.path().join("1.land");

        let record = sample("1", 1).to_record(&schema).unwrap();
        let err = store.write(&path, &record, schema.land()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Codec(CodecError::MessageTypeMismatch { .. })
        ));
        assert!(dir_entries(temp.path()).is_empty());
    }

    #[test]
    fn test_temp_paths_are_unique_siblings() {
        let target = Path::new("/data/7/7.land");
        let a = temp_path_for(target);
        let b = temp_path_for(target);
        assert_ne!(a, b);
        assert_eq!(a.parent(), target.parent());
    }
}
