use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::models::Task;

/// Key the task snapshot is stored under, shared by load and save.
pub const STORAGE_KEY: &str = "task-manager-tasks";
const FILE_SUFFIX: &str = "json";

/// Why the task snapshot could not be read or written.
#[derive(Debug)]
pub enum StorageError {
    /// The backend could not be reached or refused the operation.
    Io(std::io::Error),
    /// The stored bytes are not a task list, or the tasks failed to encode.
    Json(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "snapshot backend unavailable: {err}"),
            StorageError::Json(err) => write!(f, "snapshot is not a task list: {err}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(err) => Some(err),
            StorageError::Json(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        StorageError::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        StorageError::Json(value)
    }
}

/// Byte-oriented key-value backend the task snapshot lives in.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;
}

/// One file per key under `root`, written atomically.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.{FILE_SUFFIX}"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let mut file = match File::open(self.path_for(key)) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        Ok(Some(buf))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let temp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(value)?;
            file.sync_all()?;
        }
        fs::rename(temp_path, path)?;
        Ok(())
    }
}

/// In-process backend for tests and hosts that do not need durability.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| std::io::Error::other("memory store poisoned"))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| std::io::Error::other("memory store poisoned"))?;
        guard.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Reads and writes the task snapshot. `load` and `save` never fail: read
/// problems degrade to an empty collection and write problems are logged and
/// dropped.
pub struct Persistence<S: KeyValueStore> {
    backend: S,
}

impl<S: KeyValueStore> Persistence<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn load(&self) -> Vec<Task> {
        match self.try_load() {
            Ok(tasks) => tasks,
            Err(err) => {
                log::warn!("storage: failed to load tasks key={STORAGE_KEY}: {err}");
                Vec::new()
            }
        }
    }

    pub fn save(&self, tasks: &[Task]) {
        if let Err(err) = self.try_save(tasks) {
            log::warn!(
                "storage: failed to save tasks key={STORAGE_KEY} count={}: {err}",
                tasks.len()
            );
        }
    }

    pub fn try_load(&self) -> Result<Vec<Task>, StorageError> {
        match self.backend.get(STORAGE_KEY)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn try_save(&self, tasks: &[Task]) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(tasks)?;
        self.backend.set(STORAGE_KEY, &json)
    }
}
