//! JSON-file backend.
//!
//! The whole store is a single JSON array. Appends read the array, push the new record and
//! replace the file atomically (temp file in the same directory, then rename), so readers
//! always see either the old or the new array. Appends to the same file are serialised
//! within the process. The file is identified by its canonical parent directory, so
//! `data/../data/locations.json` and a symlinked directory share one guard. A backing file
//! that is itself a symlink is not resolved.

use std::collections::HashMap;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use pottysnitch_core::{Error, LocationSubmission, Result};
use serde_json::Value;

use crate::store::LocationStore;

/// Default location of the backing file, relative to the working directory.
pub const DEFAULT_DATA_PATH: &str = "data/locations.json";

type WriteLock = tokio::sync::Mutex<()>;

/// Per-file append guards shared by every store in the process. Entries whose guard is no
/// longer held by any append are dropped on the next lookup.
static WRITE_LOCKS: Mutex<Option<HashMap<PathBuf, Weak<WriteLock>>>> = Mutex::new(None);

fn write_lock_for(key: PathBuf) -> Arc<WriteLock> {
    let mut guard = WRITE_LOCKS.lock();
    let locks = guard.get_or_insert_with(HashMap::new);
    locks.retain(|_, lock| lock.strong_count() > 0);

    if let Some(lock) = locks.get(&key).and_then(Weak::upgrade) {
        return lock;
    }

    let lock = Arc::new(WriteLock::new(()));
    locks.insert(key, Arc::downgrade(&lock));
    lock
}

/// Creates the parent directory and returns the file's path under its canonical form.
fn lock_key(path: &Path) -> Result<PathBuf> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(dir)?;

    let dir = std::fs::canonicalize(dir)?;
    Ok(match path.file_name() {
        Some(name) => dir.join(name),
        None => dir,
    })
}

/// Location store backed by one JSON file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store for the given backing file. Nothing is touched on disk until the first
    /// append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for JsonFileStore {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_PATH)
    }
}

#[async_trait]
impl LocationStore for JsonFileStore {
    async fn read_all(&self) -> Result<Vec<LocationSubmission>> {
        let path = self.path.clone();
        run_blocking(move || load(&path)).await
    }

    async fn append(&self, submission: LocationSubmission) -> Result<usize> {
        let path = self.path.clone();
        let key = run_blocking(move || lock_key(&path)).await?;
        let lock = write_lock_for(key);
        let _guard = lock.lock().await;

        let path = self.path.clone();
        let count = run_blocking(move || append_to(&path, submission)).await?;

        tracing::debug!(path = %self.path.display(), count, "Appended location");
        Ok(count)
    }

    fn describe(&self) -> String {
        format!("json file {}", self.path.display())
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::internal(format!("store task failed: {e}")))?
}

/// Reads the backing file. A missing file is an empty store.
fn load(path: &Path) -> Result<Vec<LocationSubmission>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let value: Value =
        serde_json::from_slice(&bytes).map_err(|e| Error::corrupt_store(path, e.to_string()))?;

    let Value::Array(elements) = value else {
        return Err(Error::corrupt_store(
            path,
            "expected a JSON array of submissions",
        ));
    };

    elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| match element {
            Value::Object(map) => Ok(LocationSubmission::from(map)),
            _ => Err(Error::corrupt_store(
                path,
                format!("element {index} is not a JSON object"),
            )),
        })
        .collect()
}

fn append_to(path: &Path, submission: LocationSubmission) -> Result<usize> {
    let mut records = load(path)?;
    records.push(submission);
    write_atomic(path, &records)?;

    Ok(records.len())
}

fn write_atomic(path: &Path, records: &[LocationSubmission]) -> Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(parent_dir(path))?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, records)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;

    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn cafe(n: usize) -> LocationSubmission {
        LocationSubmission::new(format!("Cafe {n}"), format!("{n} Main St"), 40.0, -73.0)
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locations.json");
        let store = JsonFileStore::new(&path);

        let missing = store.read_all().await.unwrap();
        assert!(missing.is_empty());
        assert!(!path.exists());

        std::fs::write(&path, "[]").unwrap();
        let empty = store.read_all().await.unwrap();
        assert_eq!(missing, empty);
    }

    #[tokio::test]
    async fn test_append_then_read() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("locations.json"));

        store.append(cafe(1)).await.unwrap();
        let before = store.read_all().await.unwrap().len();

        let submission = cafe(2);
        let count = store.append(submission.clone()).await.unwrap();

        let records = store.read_all().await.unwrap();
        assert_eq!(records.len(), before + 1);
        assert_eq!(count, records.len());
        assert_eq!(records.last(), Some(&submission));
    }

    #[tokio::test]
    async fn test_preserves_insertion_order() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("locations.json"));

        for n in 0..5 {
            store.append(cafe(n)).await.unwrap();
        }

        let names: Vec<_> = store
            .read_all()
            .await
            .unwrap()
            .iter()
            .map(|s| s.name().unwrap().to_string())
            .collect();
        assert_eq!(names, ["Cafe 0", "Cafe 1", "Cafe 2", "Cafe 3", "Cafe 4"]);
    }

    #[tokio::test]
    async fn test_creates_missing_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("data").join("locations.json");
        let store = JsonFileStore::new(&path);

        store.append(cafe(1)).await.unwrap();

        assert!(path.exists());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locations.json");
        let store = JsonFileStore::new(&path);

        for contents in ["{not json", "", "{}", "null", "[1, 2]"] {
            std::fs::write(&path, contents).unwrap();
            let err = store.read_all().await.unwrap_err();
            assert!(
                matches!(err, Error::CorruptStore { .. }),
                "{contents:?} gave {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_append_to_corrupt_file_fails_without_overwriting() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locations.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = JsonFileStore::new(&path);

        assert!(store.append(cafe(1)).await.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[tokio::test]
    async fn test_file_is_a_pretty_json_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locations.json");
        let store = JsonFileStore::new(&path);

        store.append(cafe(1)).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n  {"));
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["properties"]["name"], "Cafe 1");
        assert_eq!(value[0]["properties"]["formatted"], "1 Main St");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("locations.json")]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_are_not_lost() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locations.json");
        let store = Arc::new(JsonFileStore::new(&path));
        let other = Arc::new(JsonFileStore::new(&path));

        let appends = (0..32).map(|n| {
            let store = if n % 2 == 0 {
                Arc::clone(&store)
            } else {
                Arc::clone(&other)
            };
            tokio::spawn(async move { store.append(cafe(n)).await })
        });

        for result in futures::future::join_all(appends).await {
            result.unwrap().unwrap();
        }

        assert_eq!(store.count().await.unwrap(), 32);
    }

    #[tokio::test]
    async fn test_off_type_fields_are_not_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locations.json");
        let legacy = r#"[
            {"properties": {"name": "Old Cafe", "lat": "40.0", "lon": "-73.0", "doorCode": 1234}},
            {"properties": null, "metadata": {"status": "Pending"}}
        ]"#;
        std::fs::write(&path, legacy).unwrap();
        let store = JsonFileStore::new(&path);

        let records = store.read_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name(), Some("Old Cafe"));
        assert_eq!(records[0].coordinate(), None);

        assert_eq!(store.append(cafe(1)).await.unwrap(), 3);
        let value: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["properties"]["lat"], "40.0");
        assert_eq!(value[0]["properties"]["doorCode"], 1234);
        assert_eq!(value[1]["properties"], Value::Null);
    }

    #[tokio::test]
    async fn test_records_are_stored_verbatim() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("locations.json"));
        let bodies = [
            serde_json::json!({"properties": {"name": "Cafe X", "lat": 40, "lon": -73}}),
            serde_json::json!({"metadata": {"submitted_at": "x"}}),
            serde_json::json!({"properties": null}),
        ];

        for body in &bodies {
            let submission: LocationSubmission = serde_json::from_value(body.clone()).unwrap();
            store.append(submission).await.unwrap();
        }

        let stored = serde_json::to_value(store.read_all().await.unwrap()).unwrap();
        assert_eq!(stored, Value::Array(bodies.to_vec()));
        assert!(stored[0]["properties"]["lat"].is_i64());
    }

    #[test]
    fn test_lock_key_resolves_aliases() {
        let dir = tempdir().unwrap();
        let direct = dir.path().join("data").join("locations.json");
        let dotted = dir
            .path()
            .join("data")
            .join("..")
            .join("data")
            .join("locations.json");

        assert_eq!(lock_key(&direct).unwrap(), lock_key(&dotted).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_lock_key_resolves_symlinked_directories() {
        let dir = tempdir().unwrap();
        let real = dir.path().join("data");
        std::fs::create_dir_all(&real).unwrap();
        let alias = dir.path().join("alias");
        std::os::unix::fs::symlink(&real, &alias).unwrap();

        assert_eq!(
            lock_key(&real.join("locations.json")).unwrap(),
            lock_key(&alias.join("locations.json")).unwrap()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_through_aliased_paths() {
        let dir = tempdir().unwrap();
        let direct = Arc::new(JsonFileStore::new(dir.path().join("data").join("locations.json")));
        let dotted = Arc::new(JsonFileStore::new(
            dir.path()
                .join("data")
                .join("..")
                .join("data")
                .join("locations.json"),
        ));

        let appends = (0..32).map(|n| {
            let store = if n % 2 == 0 {
                Arc::clone(&direct)
            } else {
                Arc::clone(&dotted)
            };
            tokio::spawn(async move { store.append(cafe(n)).await })
        });

        for result in futures::future::join_all(appends).await {
            result.unwrap().unwrap();
        }

        assert_eq!(direct.count().await.unwrap(), 32);
        assert_eq!(dotted.count().await.unwrap(), 32);
    }

    #[tokio::test]
    async fn test_idle_write_locks_are_released() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locations.json");
        let store = JsonFileStore::new(&path);

        store.append(cafe(1)).await.unwrap();
        store.append(cafe(2)).await.unwrap();

        let key = lock_key(&path).unwrap();
        let held = WRITE_LOCKS
            .lock()
            .as_ref()
            .and_then(|locks| locks.get(&key).map(Weak::strong_count))
            .unwrap_or(0);
        assert_eq!(held, 0);

        let lock = write_lock_for(key.clone());
        write_lock_for(PathBuf::from("/nonexistent/other.json"));
        let live = WRITE_LOCKS
            .lock()
            .as_ref()
            .map_or(0, |locks| usize::from(locks.contains_key(&key)));
        assert_eq!(live, 1);
        assert!(Arc::ptr_eq(&lock, &write_lock_for(key)));
    }

    #[test]
    fn test_describe_names_the_file() {
        let store = JsonFileStore::default();
        assert_eq!(store.path(), Path::new(DEFAULT_DATA_PATH));
        assert!(store.describe().contains("locations.json"));
    }
}
