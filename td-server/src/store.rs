use std::{
  fs, io,
  path::{Path, PathBuf},
};

use dashmap::DashMap;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("Invalid store key `{0}`")]
  InvalidKey(String),

  #[error("Failed to create store directory {path}: {source}")]
  CreateDirFailed { path: PathBuf, source: io::Error },

  #[error("Failed to access store entry `{key}`: {source}")]
  Io { key: String, source: io::Error },

  #[error("Store entry `{key}` is not valid json: {source}")]
  Json {
    key: String,
    source: serde_json::Error,
  },
}

/// String key-value persistence
///
/// Values are opaque strings, encoding is done by `load_json`/`save_json`.
pub trait KeyValueStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

  fn remove(&self, key: &str) -> Result<(), StoreError>;
}

pub fn load_json<T: DeserializeOwned>(
  store: &(impl KeyValueStore + ?Sized),
  key: &str,
) -> Result<Option<T>, StoreError> {
  let Some(data) = store.get(key)? else {
    return Ok(None);
  };

  serde_json::from_str(&data)
    .map(Some)
    .map_err(|source| StoreError::Json {
      key: key.into(),
      source,
    })
}

pub fn save_json<T: Serialize + ?Sized>(
  store: &(impl KeyValueStore + ?Sized),
  key: &str,
  value: &T,
) -> Result<(), StoreError> {
  let data = serde_json::to_string(value).map_err(|source| StoreError::Json {
    key: key.into(),
    source,
  })?;

  store.set(key, &data)
}

/// Stores every key as `<key>.json` inside one directory
#[derive(Debug)]
pub struct JsonFileStore {
  dir: PathBuf,
}

impl JsonFileStore {
  pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
    let dir = dir.into();
    fs::create_dir_all(&dir).map_err(|source| StoreError::CreateDirFailed {
      path: dir.clone(),
      source,
    })?;

    Ok(Self { dir })
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
    let valid = !key.is_empty()
      && key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if !valid {
      return Err(StoreError::InvalidKey(key.into()));
    }

    Ok(self.dir.join(format!("{key}.json")))
  }

  fn io_error(key: &str) -> impl FnOnce(io::Error) -> StoreError {
    move |source| StoreError::Io {
      key: key.into(),
      source,
    }
  }
}

impl KeyValueStore for JsonFileStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(self.path_for(key)?) {
      Ok(data) => Ok(Some(data)),
      Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(error) => Err(Self::io_error(key)(error)),
    }
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let path = self.path_for(key)?;
    // Write next to the target and rename so a crash never leaves a truncated entry
    let tmp_path = path.with_extension("json.tmp");

    fs::write(&tmp_path, value).map_err(Self::io_error(key))?;
    fs::rename(&tmp_path, &path).map_err(Self::io_error(key))
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    match fs::remove_file(self.path_for(key)?) {
      Ok(()) => Ok(()),
      Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(error) => Err(Self::io_error(key)(error)),
    }
  }
}

/// Process-lifetime store, nothing survives a restart
#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: DashMap<String, String>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    Ok(self.entries.get(key).map(|entry| entry.value().clone()))
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    self.entries.insert(key.into(), value.into());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    self.entries.remove(key);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use serde::Deserialize;

  use super::*;

  #[derive(Debug, PartialEq, Serialize, Deserialize)]
  struct Entry {
    name: String,
    count: u32,
  }

  #[test]
  fn file_store_round_trips_json() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path().join("nested")).unwrap();

    assert_eq!(load_json::<Entry>(&store, "player-config").unwrap(), None);

    let entry = Entry {
      name: "a".into(),
      count: 3,
    };
    save_json(&store, "player-config", &entry).unwrap();
    assert_eq!(load_json::<Entry>(&store, "player-config").unwrap(), Some(entry));
    assert!(store.dir().join("player-config.json").exists());

    store.remove("player-config").unwrap();
    store.remove("player-config").unwrap();
    assert_eq!(store.get("player-config").unwrap(), None);
  }

  #[test]
  fn file_store_rejects_path_like_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();

    assert!(matches!(
      store.set("../escape", "{}"),
      Err(StoreError::InvalidKey(_))
    ));
    assert!(matches!(store.get(""), Err(StoreError::InvalidKey(_))));
  }

  #[test]
  fn corrupt_entries_are_reported() {
    let store = MemoryStore::new();
    store.set("player-controller", "{not json").unwrap();

    assert!(matches!(
      load_json::<Entry>(&store, "player-controller"),
      Err(StoreError::Json { .. })
    ));
  }
}
