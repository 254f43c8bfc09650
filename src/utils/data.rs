use crate::error::StoreError;
use crate::store::{Entity, MemoryStore, Store, Tables};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Save any serializable value to a pretty-printed JSON file
pub fn save_to_cache<T: Serialize + ?Sized>(value: &T, cache_file: &Path) -> Result<()> {
    if let Some(parent) = cache_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(value).context("Failed to serialize data")?;
    std::fs::write(cache_file, json)
        .with_context(|| format!("Failed to write {}", cache_file.display()))?;
    Ok(())
}

/// Load a value previously written with [`save_to_cache`]
pub fn load_from_cache<T: DeserializeOwned>(cache_file: &Path) -> Result<T> {
    let json = std::fs::read_to_string(cache_file)
        .with_context(|| format!("Failed to read {}", cache_file.display()))?;
    let value = serde_json::from_str(&json)
        .with_context(|| format!("Failed to deserialize {}", cache_file.display()))?;
    Ok(value)
}

/// Write serializable rows to a CSV file with a header line
pub fn save_rows_to_csv<T: Serialize>(rows: &[T], filename: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(filename)
        .with_context(|| format!("Failed to create CSV file {}", filename.display()))?;
    for row in rows {
        writer.serialize(row).context("Failed to write CSV row")?;
    }
    writer.flush().context("Failed to flush CSV file")?;
    Ok(())
}

/// A [`MemoryStore`] mirrored to a JSON file after every change
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Open the ledger file, starting empty if it does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let tables: Tables = if path.exists() {
            load_from_cache(&path)?
        } else {
            Tables::default()
        };
        Ok(Self {
            path,
            inner: MemoryStore::from_tables(tables),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        save_to_cache(self.inner.tables(), &self.path)
            .map_err(|e| StoreError::Persist(format!("{:#}", e)))
    }
}

impl Store for JsonFileStore {
    fn get<E: Entity>(&self, id: u64) -> Result<E, StoreError> {
        self.inner.get(id)
    }

    fn find<E: Entity, P: Fn(&E) -> bool>(&self, predicate: P) -> Result<Vec<E>, StoreError> {
        self.inner.find(predicate)
    }

    fn insert<E: Entity>(&mut self, entity: E) -> Result<E, StoreError> {
        let entity = self.inner.insert(entity)?;
        self.flush()?;
        Ok(entity)
    }

    fn save<E: Entity>(&mut self, entity: &E) -> Result<(), StoreError> {
        self.inner.save(entity)?;
        self.flush()
    }

    fn delete<E: Entity>(&mut self, id: u64) -> Result<(), StoreError> {
        self.inner.delete::<E>(id)?;
        self.flush()
    }
}
