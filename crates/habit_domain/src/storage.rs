use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::error::{HabitError, Result};
use crate::habit::Habit;

/// Storage slot holding the whole habit list.
pub const HABITS_KEY: &str = "@habits_data";

/// Raw get/set of one serialized blob per key. A `set` is all-or-nothing.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// One `<key>.json` file per key under `dir`.
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '@') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|err| HabitError::StorageRead {
                key: key.to_string(),
                reason: err.to_string(),
            })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let write_err = |err: std::io::Error| HabitError::StorageWrite {
            key: key.to_string(),
            reason: err.to_string(),
        };
        fs::create_dir_all(&self.dir).map_err(write_err)?;
        let path = self.path_for(key);
        let tmp_path = path.with_extension(format!("json.tmp.{}", std::process::id()));
        fs::write(&tmp_path, value).map_err(write_err)?;
        if let Err(err) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(write_err(err));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Reads and writes the habit list as one JSON array. `load` fails open and
/// `save` fails silently; the `try_` variants expose the errors.
pub struct HabitStore {
    backend: Box<dyn KeyValueStore>,
    key: String,
}

impl HabitStore {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self::with_key(backend, HABITS_KEY)
    }

    pub fn with_key(backend: Box<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn try_load(&self) -> Result<Vec<Habit>> {
        let Some(raw) = self.backend.get(&self.key)? else {
            return Ok(Vec::new());
        };
        let habits: Vec<Habit> =
            serde_json::from_str(&raw).map_err(|err| HabitError::StorageRead {
                key: self.key.clone(),
                reason: err.to_string(),
            })?;
        Ok(dedupe_ids(habits))
    }

    pub fn load(&self) -> Vec<Habit> {
        match self.try_load() {
            Ok(habits) => {
                debug!(key = %self.key, count = habits.len(), "habits loaded");
                habits
            }
            Err(err) => {
                error!(%err, "unable to read habits, starting empty");
                Vec::new()
            }
        }
    }

    pub fn try_save(&self, habits: &[Habit]) -> Result<()> {
        let raw = serde_json::to_string(habits).map_err(|err| HabitError::StorageWrite {
            key: self.key.clone(),
            reason: err.to_string(),
        })?;
        self.backend.set(&self.key, &raw)
    }

    pub fn save(&self, habits: &[Habit]) {
        match self.try_save(habits) {
            Ok(()) => debug!(key = %self.key, count = habits.len(), "habits saved"),
            Err(err) => error!(%err, "unable to save habits"),
        }
    }
}

fn dedupe_ids(habits: Vec<Habit>) -> Vec<Habit> {
    let mut seen = HashSet::new();
    habits
        .into_iter()
        .filter(|habit| {
            let fresh = seen.insert(habit.id.clone());
            if !fresh {
                warn!(habit_id = %habit.id, "dropping habit with duplicate id");
            }
            fresh
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::HabitDraft;
    use crate::repository;
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::tempdir;

    fn sample() -> Vec<Habit> {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 7, 15, 0).unwrap();
        let list = repository::create(&[], HabitDraft::new("Read"), now).unwrap();
        let list = repository::create(&list, HabitDraft::new("Walk"), now).unwrap();
        let id = list[0].id.clone();
        repository::toggle_completion(&list, &id, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap())
            .applied()
            .unwrap()
    }

    #[test]
    fn file_store_round_trips_list() {
        let dir = tempdir().unwrap();
        let store = HabitStore::new(Box::new(FileKeyValueStore::new(dir.path())));
        assert!(store.load().is_empty());

        let habits = sample();
        store.try_save(&habits).unwrap();
        assert_eq!(store.load(), habits);
        assert!(dir.path().join("@habits_data.json").exists());
    }

    #[test]
    fn corrupt_blob_loads_empty() {
        let backend = MemoryKeyValueStore::new();
        backend.set(HABITS_KEY, "{not json").unwrap();
        let store = HabitStore::new(Box::new(backend));
        assert!(matches!(
            store.try_load(),
            Err(HabitError::StorageRead { .. })
        ));
        assert!(store.load().is_empty());
    }

    #[test]
    fn duplicate_ids_keep_first_record() {
        let mut habits = sample();
        habits[1].id = habits[0].id.clone();
        let store = HabitStore::new(Box::new(MemoryKeyValueStore::new()));
        store.save(&habits);
        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].title, "Read");
    }

    #[test]
    fn unwritable_directory_fails_silently() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        fs::write(&blocker, "file, not a directory").unwrap();
        let store = HabitStore::new(Box::new(FileKeyValueStore::new(&blocker)));
        assert!(matches!(
            store.try_save(&sample()),
            Err(HabitError::StorageWrite { .. })
        ));
        store.save(&sample());
        assert!(store.load().is_empty());
    }
}
