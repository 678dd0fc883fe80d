//! Generic append/update/list collection backed by a single JSON file.
//!
//! Implements spec §4.1's literal on-disk contract directly
//! (`{ "<key>": [item, …] }`, write-to-temp-then-rename) rather than WAL
//! replay: there is exactly one writer process per metadata directory, so
//! event sourcing buys nothing
//! here.

use crate::error::{StoreError, StoreResult};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Implemented by every entity stored in a [`Collection`] so it can be
/// indexed by its own id without the collection needing to know the
/// concrete id newtype.
pub trait HasId {
    fn id(&self) -> Uuid;
}

struct CollectionState<T> {
    items: HashMap<Uuid, T>,
    /// Insertion order, so `list()` returns a stable, deterministic
    /// ordering instead of `HashMap`'s arbitrary iteration order.
    order: Vec<Uuid>,
}

/// A single JSON-file-backed collection of entities of type `T`.
pub struct Collection<T> {
    key: &'static str,
    path: PathBuf,
    state: RwLock<CollectionState<T>>,
}

impl<T> Collection<T>
where
    T: Clone + HasId + Serialize + DeserializeOwned,
{
    /// Load a collection from `dir/<key>.json`, creating an empty one if
    /// the file doesn't exist yet.
    pub fn load(dir: &Path, key: &'static str) -> StoreResult<Self> {
        let path = dir.join(format!("{key}.json"));
        let (items, order) = if path.exists() {
            let bytes = fs::read(&path).map_err(|source| StoreError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let wrapper: HashMap<String, Vec<T>> =
                serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                    path: path.display().to_string(),
                    source,
                })?;
            let list = wrapper.into_values().next().unwrap_or_default();
            let mut items = HashMap::with_capacity(list.len());
            let mut order = Vec::with_capacity(list.len());
            for item in list {
                let id = item.id();
                order.push(id);
                items.insert(id, item);
            }
            (items, order)
        } else {
            (HashMap::new(), Vec::new())
        };

        Ok(Self { key, path, state: RwLock::new(CollectionState { items, order }) })
    }

    pub fn get(&self, id: Uuid) -> Option<T> {
        self.state.read().items.get(&id).cloned()
    }

    pub fn list(&self) -> Vec<T> {
        let state = self.state.read();
        state.order.iter().filter_map(|id| state.items.get(id).cloned()).collect()
    }

    pub fn list_filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.list().into_iter().filter(pred).collect()
    }

    /// Insert or overwrite `item` under its own id, then persist.
    pub fn put(&self, item: T) -> StoreResult<()> {
        let id = item.id();
        {
            let mut state = self.state.write();
            if !state.items.contains_key(&id) {
                state.order.push(id);
            }
            state.items.insert(id, item);
        }
        self.persist()
    }

    /// Mutate the item under `id` in place via `f`, then persist. Returns
    /// `Ok(None)` if no such item exists (caller decides whether that's an
    /// error).
    pub fn update(&self, id: Uuid, f: impl FnOnce(&mut T)) -> StoreResult<Option<T>> {
        let updated = {
            let mut state = self.state.write();
            match state.items.get_mut(&id) {
                Some(item) => {
                    f(item);
                    Some(item.clone())
                }
                None => None,
            }
        };
        if updated.is_some() {
            self.persist()?;
        }
        Ok(updated)
    }

    pub fn remove(&self, id: Uuid) -> StoreResult<Option<T>> {
        let removed = {
            let mut state = self.state.write();
            let removed = state.items.remove(&id);
            if removed.is_some() {
                state.order.retain(|i| *i != id);
            }
            removed
        };
        if removed.is_some() {
            self.persist()?;
        }
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.state.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write `{ "<key>": [item, …] }` to a temp file in the same directory
    /// and rename over the real path, so readers never observe a partial
    /// write.
    fn persist(&self) -> StoreResult<()> {
        let state = self.state.read();
        let list: Vec<&T> = state.order.iter().filter_map(|id| state.items.get(id)).collect();
        let mut wrapper = HashMap::new();
        wrapper.insert(self.key.to_string(), list);
        let json = serde_json::to_vec_pretty(&wrapper).map_err(|source| StoreError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })?;
        drop(state);

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        use std::io::Write;
        tmp.write_all(&json).map_err(|source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io {
            path: self.path.display().to_string(),
            source: e.error,
        })?;
        tracing::debug!(collection = self.key, path = %self.path.display(), "persisted collection");
        Ok(())
    }
}

#[cfg(test)]
#[path = "collection_tests.rs"]
mod tests;
