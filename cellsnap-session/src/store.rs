//! Key-value stores backing a session
//!
//! The session only needs string get/set/remove. [`MemoryStore`] keeps items
//! in process; [`FileStore`] writes one JSON file per key and replaces it
//! atomically.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to persist {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// String key-value storage
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&mut self, key: &str) -> Result<()>;
}

/// In-process store
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    items: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.items.remove(key);
        Ok(())
    }
}

/// Directory-backed store, one `<key>.json` file per item
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path for a key; path separators are percent-encoded so distinct
    /// keys never share a file
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len());
        for c in key.chars() {
            match c {
                '%' => name.push_str("%25"),
                '/' => name.push_str("%2F"),
                '\\' => name.push_str("%5C"),
                ':' => name.push_str("%3A"),
                c => name.push(c),
            }
        }
        self.root.join(format!("{name}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(key);

        let mut file = tempfile::NamedTempFile::new_in(&self.root)?;
        file.write_all(value.as_bytes())?;
        file.flush()?;
        file.persist(&path).map_err(|err| StoreError::Persist {
            path,
            source: err.error,
        })?;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Store selected by configuration
#[derive(Debug, Clone)]
pub enum AnyStore {
    Memory(MemoryStore),
    File(FileStore),
}

impl KeyValueStore for AnyStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        match self {
            AnyStore::Memory(store) => store.get_item(key),
            AnyStore::File(store) => store.get_item(key),
        }
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        match self {
            AnyStore::Memory(store) => store.set_item(key, value),
            AnyStore::File(store) => store.set_item(key, value),
        }
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        match self {
            AnyStore::Memory(store) => store.remove_item(key),
            AnyStore::File(store) => store.remove_item(key),
        }
    }
}
