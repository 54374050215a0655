use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::catalog::{Catalog, CatalogItem, ProductId};
use crate::constants::SELECTION_STORAGE_KEY;
use crate::storage::{KeyValueStore, MemoryStore};
use crate::utils::{Result, RoutineError};

/// Persisted form of the selection
#[derive(Debug, Serialize, Deserialize)]
struct SelectionSnapshot {
    saved_at: DateTime<Local>,
    items: Vec<CatalogItem>,
}

/// Outcome of a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    Added,
    Removed,
}

/// The user's current set of chosen products.
///
/// Order is insertion order, identifiers are unique. Every mutation writes a
/// snapshot to the backing store (best-effort) and bumps a revision that
/// observers can watch.
pub struct SelectionStore {
    items: Vec<CatalogItem>,
    store: Box<dyn KeyValueStore>,
    revision: watch::Sender<u64>,
}

impl SelectionStore {
    /// Selection that is forgotten when the process exits
    pub fn in_memory() -> Self {
        Self::hydrate(Box::new(MemoryStore::new()))
    }

    /// Hydrate from the store. Missing or malformed snapshots give an empty
    /// selection; the failure is logged and never returned.
    pub fn hydrate(store: Box<dyn KeyValueStore>) -> Self {
        let items = match store.read(SELECTION_STORAGE_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<SelectionSnapshot>(&json) {
                Ok(snapshot) => dedup(snapshot.items),
                Err(e) => {
                    warn!("Ignoring malformed saved selection: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Could not read saved selection: {}", e);
                Vec::new()
            }
        };
        debug!("Restored {} selected products", items.len());

        Self {
            items,
            store,
            revision: watch::Sender::new(0),
        }
    }

    /// Add an item. Returns false (and does nothing) if it is already selected.
    pub fn add(&mut self, item: CatalogItem) -> bool {
        if self.contains(&item.id) {
            return false;
        }
        self.items.push(item);
        self.changed();
        true
    }

    /// Remove by id. Returns false if it was not selected.
    pub fn remove(&mut self, id: &ProductId) -> bool {
        let Some(index) = self.items.iter().position(|item| &item.id == id) else {
            return false;
        };
        self.items.remove(index);
        self.changed();
        true
    }

    /// Select the product if it isn't, deselect it if it is.
    ///
    /// A selected id that vanished from the catalog can still be removed.
    pub fn toggle(&mut self, id: &ProductId, catalog: &Catalog) -> Result<Toggled> {
        if self.remove(id) {
            return Ok(Toggled::Removed);
        }
        let item = catalog
            .find(id)
            .ok_or_else(|| RoutineError::UnknownProduct(id.to_string()))?;
        self.add(item.clone());
        Ok(Toggled::Added)
    }

    /// Empty the selection unconditionally. `Session::clear` asks first.
    pub(crate) fn clear(&mut self) {
        self.items.clear();
        self.changed();
    }

    pub fn all(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn contains(&self, id: &ProductId) -> bool {
        self.items.iter().any(|item| &item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Watch for selection changes; the value is bumped on every mutation
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn changed(&mut self) {
        self.persist();
        self.revision.send_modify(|rev| *rev += 1);
    }

    fn persist(&self) {
        let snapshot = SelectionSnapshot {
            saved_at: Local::now(),
            items: self.items.clone(),
        };
        let result = serde_json::to_string(&snapshot)
            .map_err(|e| RoutineError::Persistence(e.to_string()))
            .and_then(|json| self.store.write(SELECTION_STORAGE_KEY, &json));
        if let Err(e) = result {
            warn!("Failed to save selection, continuing in memory: {}", e);
        }
    }
}

fn dedup(items: Vec<CatalogItem>) -> Vec<CatalogItem> {
    let mut unique: Vec<CatalogItem> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.iter().any(|seen| seen.id == item.id) {
            unique.push(item);
        }
    }
    unique
}
