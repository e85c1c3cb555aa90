use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use crate::checkpoint::{Checkpoint, CheckpointError, CheckpointStore};

/// Keeps serialized checkpoints in process memory.
///
/// Checkpoints are stored as JSON so a load always yields an independent
/// copy, exactly as with the persistent stores.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, (i64, String)>>,
    counter: Mutex<i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryStore {
    fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let json = serde_json::to_string(checkpoint)?;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let order = match entries.get(&checkpoint.id) {
            Some((order, _)) => *order,
            None => {
                let mut counter = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
                *counter += 1;
                *counter
            }
        };
        entries.insert(checkpoint.id.clone(), (order, json));
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(id)
            .map(|(_, json)| Checkpoint::from_json(json))
            .transpose()
    }

    fn delete(&self, id: &str) -> Result<bool, CheckpointError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.remove(id).is_some())
    }

    fn list(&self) -> Result<Vec<String>, CheckpointError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<(i64, String)> = entries
            .iter()
            .map(|(id, (order, _))| (*order, id.clone()))
            .collect();
        ids.sort();
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }
}
