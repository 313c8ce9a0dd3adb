//! File Store
//!
//! One file per key in a directory. The file's modification time is the
//! staleness clock, so entries survive restarts until their TTL lapses.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::{CacheError, Result, StoreError};
use crate::logging::Logger;
use crate::store::{log_lookup, log_set, Store, StoreKind, StoreOptions};

const ENTRY_EXTENSION: &str = "cache";

// == File Store ==
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    timeout: Duration,
    logger: Logger,
}

impl FileStore {
    /// Creates the store, creating its directory if needed.
    ///
    /// Without a `location` the store lives in `<temp dir>/icebox`.
    pub fn new(options: &StoreOptions) -> Result<Self> {
        let timeout = options.require_timeout()?;
        let dir = options
            .location
            .clone()
            .unwrap_or_else(default_location);

        fs::create_dir_all(&dir).map_err(|source| CacheError::Location {
            path: dir.clone(),
            source,
        })?;

        Ok(Self {
            dir,
            timeout,
            logger: options.logger_or_default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Entry file for a key: hex SHA-256 of the key.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir
            .join(format!("{}.{}", hex::encode(digest), ENTRY_EXTENSION))
    }

    // Temp file in the same directory, then rename over the entry: readers see
    // either the previous entry or the new one, never a partial write.
    fn write_entry(&self, path: &Path, value: &[u8]) -> std::result::Result<(), StoreError> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|err| StoreError::Io(err.error))?;
        Ok(())
    }

    fn age(path: &Path) -> std::result::Result<Option<Duration>, StoreError> {
        let modified = match fs::metadata(path) {
            Ok(meta) if meta.is_file() => meta.modified()?,
            Ok(_) => return Err(io::Error::other("entry is not a regular file").into()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        Ok(Some(age))
    }

    fn read_fresh(&self, key: &str) -> Option<Vec<u8>> {
        if self.is_stale(key) {
            return None;
        }
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!("file store: cannot read {}: {}", path.display(), err);
                None
            }
        }
    }
}

impl Store for FileStore {
    fn kind(&self) -> StoreKind {
        StoreKind::File
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set(&self, key: &str, value: &[u8]) -> bool {
        log_set(&self.logger, key);
        let path = self.path_for(key);
        match self.write_entry(&path, value) {
            Ok(()) => true,
            Err(err) => {
                warn!("file store: cannot write {}: {}", path.display(), err);
                false
            }
        }
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let value = self.read_fresh(key);
        log_lookup(&self.logger, key, value.is_some());
        value
    }

    fn exists(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    fn is_stale(&self, key: &str) -> bool {
        let path = self.path_for(key);
        match Self::age(&path) {
            Ok(Some(age)) => age >= self.timeout,
            Ok(None) => true,
            Err(err) => {
                warn!("file store: cannot stat {}: {}", path.display(), err);
                true
            }
        }
    }
}

fn default_location() -> PathBuf {
    std::env::temp_dir().join("icebox")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread::{self, sleep};

    fn store_in(dir: &Path, timeout: Duration) -> FileStore {
        FileStore::new(
            &StoreOptions::new()
                .timeout(timeout)
                .location(dir)
                .logger(Logger::silent()),
        )
        .unwrap()
    }

    #[test]
    fn test_file_store_requires_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileStore::new(&StoreOptions::new().location(dir.path()));
        assert!(matches!(result, Err(CacheError::MissingTimeout)));
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        let store = store_in(&nested, Duration::from_secs(1));
        assert!(nested.is_dir());
        assert_eq!(store.dir(), nested.as_path());
    }

    #[test]
    fn test_unusable_location_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("plain-file");
        fs::write(&blocker, b"not a directory").unwrap();

        let result = FileStore::new(
            &StoreOptions::new()
                .timeout(Duration::from_secs(1))
                .location(&blocker),
        );
        assert!(matches!(result, Err(CacheError::Location { .. })));
    }

    #[test]
    fn test_store_and_retrieve() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), Duration::from_secs(1));

        assert!(store.set("abc", b"{\"one\":[1,2,3]}"));
        assert!(store.exists("abc"));
        assert!(!store.is_stale("abc"));
        assert_eq!(store.get("abc"), Some(b"{\"one\":[1,2,3]}".to_vec()));
    }

    #[test]
    fn test_missing_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), Duration::from_secs(1));

        assert_eq!(store.get("never-set"), None);
        assert!(!store.exists("never-set"));
        assert!(store.is_stale("never-set"));
    }

    #[test]
    fn test_miss_after_timeout_while_file_remains() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), Duration::from_millis(300));

        store.set("abc", b"hi");
        sleep(Duration::from_millis(450));

        assert!(store.exists("abc"));
        assert!(store.is_stale("abc"));
        assert_eq!(store.get("abc"), None);
    }

    #[test]
    fn test_entries_survive_a_new_store_instance() {
        let dir = tempfile::tempdir().unwrap();
        store_in(dir.path(), Duration::from_secs(60)).set("abc", b"persisted");

        let reopened = store_in(dir.path(), Duration::from_secs(60));
        assert_eq!(reopened.get("abc"), Some(b"persisted".to_vec()));
    }

    #[test]
    fn test_filenames_are_filesystem_safe_and_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), Duration::from_secs(1));

        let a = store.path_for("GET http://example.com/?a=1");
        let b = store.path_for("GET http://example.com/?a=2");
        assert_ne!(a, b);

        let name = a.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with(".cache"));
        assert!(name.trim_end_matches(".cache").chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a.parent(), Some(dir.path()));
    }

    #[test]
    fn test_one_file_per_key_and_no_leftover_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), Duration::from_secs(60));

        store.set("one", b"1");
        store.set("two", b"2");
        store.set("one", b"uno");

        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 2);
        assert_eq!(store.get("one"), Some(b"uno".to_vec()));
    }

    #[test]
    fn test_concurrent_writers_never_expose_partial_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(dir.path(), Duration::from_secs(60)));
        let values: Vec<Vec<u8>> = (0..4u8).map(|i| vec![b'a' + i; 64 * 1024]).collect();

        let writers: Vec<_> = values
            .iter()
            .cloned()
            .map(|value| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..20 {
                        assert!(store.set("shared", &value));
                    }
                })
            })
            .collect();

        for _ in 0..50 {
            if let Some(read) = store.get("shared") {
                assert!(values.contains(&read), "observed a torn entry");
            }
        }

        for writer in writers {
            writer.join().unwrap();
        }
        let last = store.get("shared").unwrap();
        assert!(values.contains(&last));
    }

    #[test]
    fn test_unreadable_entry_degrades_to_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), Duration::from_secs(60));
        fs::create_dir(store.path_for("abc")).unwrap();

        assert_eq!(store.get("abc"), None);
        assert!(store.is_stale("abc"));
        assert!(!store.exists("abc"));
    }

    #[test]
    fn test_set_fails_when_directory_disappears() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join("entries");
        let store = store_in(&location, Duration::from_secs(60));
        fs::remove_dir_all(&location).unwrap();

        assert!(!store.set("abc", b"lost"));
        assert_eq!(store.get("abc"), None);
    }
}
