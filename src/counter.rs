//! Persistent count of completed operations.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const COUNTER_KEY: &str = "totalOperations";

/// Persistence for the counter value.
pub trait CounterStore: Send {
    fn load(&self) -> Result<u64>;
    fn store(&self, value: u64) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    /// `<data dir>/pdfsuite/counter.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("pdfsuite").join("counter.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CounterStore for JsonFileStore {
    fn load(&self) -> Result<u64> {
        if !self.path.exists() {
            return Ok(0);
        }
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read counter: {}", self.path.display()))?;
        let value: Value = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse counter: {}", self.path.display()))?;
        value
            .get(COUNTER_KEY)
            .and_then(Value::as_u64)
            .with_context(|| format!("Counter file has no {} entry", COUNTER_KEY))
    }

    fn store(&self, value: u64) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let mut map = Map::new();
        map.insert(COUNTER_KEY.to_string(), Value::from(value));
        std::fs::write(&self.path, serde_json::to_string_pretty(&map)?)
            .with_context(|| format!("Failed to write counter: {}", self.path.display()))
    }
}

/// Keeps the value in memory only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    value: std::sync::Mutex<u64>,
}

impl CounterStore for MemoryStore {
    fn load(&self) -> Result<u64> {
        Ok(*self.value.lock().map_err(|_| anyhow::anyhow!("counter lock poisoned"))?)
    }

    fn store(&self, value: u64) -> Result<()> {
        *self.value.lock().map_err(|_| anyhow::anyhow!("counter lock poisoned"))? = value;
        Ok(())
    }
}

/// Count of operations completed on this machine.
///
/// Storage failures never surface as errors: a failed read starts from
/// zero, a failed write is logged and the in-memory value stays current.
pub struct OperationCounter {
    value: u64,
    store: Box<dyn CounterStore>,
}

impl OperationCounter {
    pub fn load(store: Box<dyn CounterStore>) -> Self {
        let value = match store.load() {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Could not load operation counter, starting from 0: {:#}", e);
                0
            }
        };
        OperationCounter { value, store }
    }

    pub fn get(&self) -> u64 {
        self.value
    }

    pub fn increment(&mut self) -> u64 {
        self.value = self.value.saturating_add(1);
        self.persist();
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0;
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = self.store.store(self.value) {
            tracing::warn!("Could not save operation counter: {:#}", e);
        }
    }
}

impl std::fmt::Debug for OperationCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationCounter")
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}
