use async_trait::async_trait;
use drill_core::model::{InitLevel, Item, ItemCollection, ItemId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape for one item.
///
/// `position` is 1-based and only orders the rows; ids are reassigned
/// densely on load. A rating is kept as the raw stored number so a bad row
/// is reported instead of silently dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub position: u64,
    pub prompt: String,
    pub answer: String,
    pub group: Option<String>,
    pub tries: u32,
    pub fails: u32,
    pub last_step: u64,
    pub init_level: Option<u8>,
}

impl ItemRecord {
    /// A never-seen item; history fields default to zero / unset.
    #[must_use]
    pub fn new(position: u64, prompt: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            position,
            prompt: prompt.into(),
            answer: answer.into(),
            group: None,
            tries: 0,
            fails: 0,
            last_step: 0,
            init_level: None,
        }
    }

    #[must_use]
    pub fn from_item(item: &Item) -> Self {
        Self {
            position: item.id().position(),
            prompt: item.prompt().to_owned(),
            answer: item.answer().to_owned(),
            group: item.group().map(str::to_owned),
            tries: item.tries(),
            fails: item.fails(),
            last_step: item.last_step(),
            init_level: item.init_level().map(InitLevel::value),
        }
    }

    /// Convert the record back into a domain `Item` with the given id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for an out-of-range rating or
    /// when `fails > tries`.
    pub fn into_item(self, id: ItemId) -> Result<Item, StorageError> {
        let init_level = self
            .init_level
            .map(InitLevel::from_u8)
            .transpose()
            .map_err(|e| StorageError::Serialization(format!("row {}: {e}", self.position)))?;

        Item::from_persisted(
            id,
            self.prompt,
            self.answer,
            self.group,
            self.tries,
            self.fails,
            self.last_step,
            init_level,
        )
        .map_err(|e| StorageError::Serialization(format!("row {}: {e}", self.position)))
    }
}

/// Snapshot every item of a collection in position order.
#[must_use]
pub fn records_from_collection(items: &ItemCollection) -> Vec<ItemRecord> {
    items.iter().map(ItemRecord::from_item).collect()
}

/// Rebuild a collection from stored rows, ordered by `position`.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if a row is invalid, and
/// `StorageError::Conflict` if two rows share the same prompt and answer.
pub fn collection_from_records(
    mut records: Vec<ItemRecord>,
) -> Result<ItemCollection, StorageError> {
    records.sort_by_key(|record| record.position);
    check_unique_pairs(&records)?;

    let mut items = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let id = u32::try_from(index)
            .map(ItemId::new)
            .map_err(|_| StorageError::Serialization("too many items".into()))?;
        items.push(record.into_item(id)?);
    }

    ItemCollection::from_items(items).map_err(|e| {
        tracing::warn!(error = %e, "stored items failed validation");
        StorageError::Conflict(e.to_string())
    })
}

fn check_unique_pairs(records: &[ItemRecord]) -> Result<(), StorageError> {
    let mut seen: HashMap<(&str, &str), u64> = HashMap::with_capacity(records.len());
    for record in records {
        let pair = (record.prompt.as_str(), record.answer.as_str());
        if let Some(first) = seen.insert(pair, record.position) {
            tracing::warn!(first, second = record.position, "duplicate stored pair");
            return Err(StorageError::Conflict(format!(
                "rows {first} and {} both hold {:?} / {:?}",
                record.position, record.prompt, record.answer
            )));
        }
    }
    Ok(())
}

/// The durable home of an item collection.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Load every stored item in position order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the rows cannot be read or fail validation.
    async fn load_all(&self) -> Result<ItemCollection, StorageError>;

    /// Overwrite the stored collection with `items`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the collection cannot be written.
    async fn save_all(&self, items: &ItemCollection) -> Result<(), StorageError>;
}

/// In-memory store for tests and throwaway runs.
///
/// Clones share the same rows and save counter.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    records: Arc<Mutex<Vec<ItemRecord>>>,
    saves: Arc<AtomicUsize>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_records(records: Vec<ItemRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            saves: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of successful `save_all` calls so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Copy of the currently stored rows.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn records(&self) -> Result<Vec<ItemRecord>, StorageError> {
        let guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }
}

#[async_trait]
impl ItemStore for InMemoryRepository {
    async fn load_all(&self) -> Result<ItemCollection, StorageError> {
        collection_from_records(self.records()?)
    }

    async fn save_all(&self, items: &ItemCollection) -> Result<(), StorageError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = records_from_collection(items);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Aggregates the store behind a trait object for the services layer.
#[derive(Clone)]
pub struct Storage {
    pub items: Arc<dyn ItemStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let items: Arc<dyn ItemStore> = Arc::new(InMemoryRepository::new());
        Self { items }
    }
}
