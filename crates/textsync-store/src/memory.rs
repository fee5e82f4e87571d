//! In-memory record store for tests and ephemeral runs.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use textsync_core::{NewRecord, RecordPatch, StoreFailure, TextRecord, TextStore};

/// Map-backed `TextStore` with the same visible semantics as the embedded
/// store: timestamps set on write, nothing touched on the skip path.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<(String, String), TextRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records of one project, in no particular order.
    pub fn all(&self, project_id: &str) -> Vec<TextRecord> {
        self.records
            .read()
            .expect("memory store poisoned")
            .values()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("memory store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TextStore for MemoryStore {
    async fn find(
        &self,
        key: &str,
        project_id: &str,
    ) -> Result<Option<TextRecord>, StoreFailure> {
        Ok(self
            .records
            .read()
            .map_err(|_| StoreFailure("memory store poisoned".into()))?
            .get(&(key.to_string(), project_id.to_string()))
            .cloned())
    }

    async fn insert(&self, record: NewRecord) -> Result<TextRecord, StoreFailure> {
        let now = Utc::now().to_rfc3339();
        let stored = TextRecord {
            key: record.key.clone(),
            project_id: record.project_id.clone(),
            value: record.value,
            translation: None,
            status: record.status,
            category: record.category,
            sources: record.sources,
            created_at: now.clone(),
            updated_at: now,
        };
        self.records
            .write()
            .map_err(|_| StoreFailure("memory store poisoned".into()))?
            .insert((record.key, record.project_id), stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        key: &str,
        project_id: &str,
        patch: RecordPatch,
    ) -> Result<TextRecord, StoreFailure> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreFailure("memory store poisoned".into()))?;
        let record = records
            .get_mut(&(key.to_string(), project_id.to_string()))
            .ok_or_else(|| StoreFailure(format!("record not found: {key}")))?;
        if let Some(value) = patch.value {
            record.value = value;
        }
        if let Some(category) = patch.category {
            record.category = category;
        }
        if let Some(sources) = patch.sources {
            record.sources = sources;
        }
        if let Some(status) = patch.status {
            record.status = status;
        }
        record.updated_at = Utc::now().to_rfc3339();
        Ok(record.clone())
    }
}
