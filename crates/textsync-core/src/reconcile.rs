//! Import reconciliation: diffing an extracted batch against the persisted
//! record set and deciding create/update/demote/skip per key.
//!
//! `draft` and `in_review` records are still being worked on, so a
//! re-import from the source document overwrites them silently — the
//! document is the source of truth until a human approves. An `approved`
//! record is frozen: an unchanged value is a true no-op, a changed value
//! forces the record back to `in_review` for a human to look at rather
//! than quietly altering shipped content.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::record::{ImportItem, Sources, TextRecord, TextStatus};

/// Error surface the persistence collaborator reports to the reconciler.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreFailure(pub String);

/// Fields for a record the reconciler creates.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub key: String,
    pub project_id: String,
    pub value: String,
    pub category: String,
    pub sources: Sources,
    pub status: TextStatus,
}

/// Fields import may touch on an existing record. `None` leaves a field
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    pub value: Option<String>,
    pub category: Option<String>,
    pub sources: Option<Sources>,
    pub status: Option<TextStatus>,
}

/// Persistence collaborator the reconciler requires; implemented by the
/// storage layer. All operations are scoped to one project.
#[async_trait]
pub trait TextStore: Send + Sync {
    /// Look up a record by key within a project.
    async fn find(
        &self,
        key: &str,
        project_id: &str,
    ) -> Result<Option<TextRecord>, StoreFailure>;

    /// Insert a new record; the store fills in timestamps.
    async fn insert(&self, record: NewRecord) -> Result<TextRecord, StoreFailure>;

    /// Apply a patch to an existing record; the store bumps `updated_at`.
    async fn update(
        &self,
        key: &str,
        project_id: &str,
        patch: RecordPatch,
    ) -> Result<TextRecord, StoreFailure>;
}

/// Per-key decision of the reconciliation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No record exists: create as `draft`.
    Create,
    /// `draft` or `in_review`: overwrite unconditionally, status unchanged.
    Overwrite,
    /// `approved` with a changed value: overwrite and force `in_review`.
    Demote,
    /// `approved` with an unchanged value: no write at all.
    Skip,
}

/// Evaluate the state machine for one key. Pure; no I/O.
pub fn decide(existing: Option<&TextRecord>, incoming_value: &str) -> Decision {
    match existing {
        None => Decision::Create,
        Some(record) => match record.status {
            TextStatus::Draft | TextStatus::InReview => Decision::Overwrite,
            TextStatus::Approved if record.value == incoming_value => Decision::Skip,
            TextStatus::Approved => Decision::Demote,
        },
    }
}

/// What happened to one batch item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemAction {
    Created,
    Updated,
    MovedToReview,
    Skipped,
    Error,
}

impl ItemAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemAction::Created => "created",
            ItemAction::Updated => "updated",
            ItemAction::MovedToReview => "moved_to_review",
            ItemAction::Skipped => "skipped",
            ItemAction::Error => "error",
        }
    }
}

/// Per-item evidence of the reconciler's decision, one per input item in
/// input order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ItemOutcome {
    pub key: String,
    pub action: ItemAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemOutcome {
    fn acted(key: &str, action: ItemAction) -> Self {
        Self {
            key: key.to_string(),
            action,
            reason: None,
            error: None,
        }
    }

    fn skipped(key: &str) -> Self {
        Self {
            key: key.to_string(),
            action: ItemAction::Skipped,
            reason: Some("unchanged".to_string()),
            error: None,
        }
    }

    fn failed(key: &str, message: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            action: ItemAction::Error,
            reason: None,
            error: Some(message.into()),
        }
    }
}

/// Batch-level failure. Per-item problems never surface here; they are
/// reported in the item's own [`ItemOutcome`].
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// No project scope was supplied; nothing was processed.
    #[error("no project scope supplied for batch")]
    MissingProject,
}

/// Category recorded when an item arrives without one.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Applies one deduplicated batch against the store, one independent
/// decision per key.
pub struct Reconciler<'a, S: TextStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: TextStore + ?Sized> Reconciler<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Reconcile `items` against the records of `project_id`.
    ///
    /// Returns one outcome per input item, in input order. One item's
    /// failure never aborts the rest; the only whole-batch failure is a
    /// missing project scope. Items already applied stay applied if the
    /// caller drops the future mid-batch.
    pub async fn run(
        &self,
        project_id: &str,
        items: &[ImportItem],
    ) -> Result<Vec<ItemOutcome>, ReconcileError> {
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return Err(ReconcileError::MissingProject);
        }

        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            outcomes.push(self.apply(project_id, item).await);
        }
        info!(
            project = project_id,
            total = outcomes.len(),
            errors = outcomes.iter().filter(|o| o.action == ItemAction::Error).count(),
            "batch reconciled"
        );
        Ok(outcomes)
    }

    async fn apply(&self, project_id: &str, item: &ImportItem) -> ItemOutcome {
        if item.key.is_empty() || item.value.is_empty() {
            warn!(key = %item.key, "malformed import item");
            let key = if item.key.is_empty() { "unknown" } else { &item.key };
            return ItemOutcome::failed(key, "missing key or value");
        }

        let existing = match self.store.find(&item.key, project_id).await {
            Ok(found) => found,
            Err(e) => return ItemOutcome::failed(&item.key, e.to_string()),
        };

        match decide(existing.as_ref(), &item.value) {
            Decision::Create => {
                let record = NewRecord {
                    key: item.key.clone(),
                    project_id: project_id.to_string(),
                    value: item.value.clone(),
                    category: item
                        .category
                        .clone()
                        .unwrap_or_else(|| UNCATEGORIZED.to_string()),
                    sources: item.sources.clone().unwrap_or_default(),
                    status: TextStatus::Draft,
                };
                match self.store.insert(record).await {
                    Ok(_) => {
                        info!(key = %item.key, "created");
                        ItemOutcome::acted(&item.key, ItemAction::Created)
                    }
                    Err(e) => ItemOutcome::failed(&item.key, e.to_string()),
                }
            }
            Decision::Overwrite => match self.store.update(&item.key, project_id, self.patch(item, None)).await {
                Ok(_) => {
                    info!(key = %item.key, "updated");
                    ItemOutcome::acted(&item.key, ItemAction::Updated)
                }
                Err(e) => ItemOutcome::failed(&item.key, e.to_string()),
            },
            Decision::Demote => {
                let patch = self.patch(item, Some(TextStatus::InReview));
                match self.store.update(&item.key, project_id, patch).await {
                    Ok(_) => {
                        info!(key = %item.key, "moved to review");
                        ItemOutcome::acted(&item.key, ItemAction::MovedToReview)
                    }
                    Err(e) => ItemOutcome::failed(&item.key, e.to_string()),
                }
            }
            Decision::Skip => ItemOutcome::skipped(&item.key),
        }
    }

    fn patch(&self, item: &ImportItem, status: Option<TextStatus>) -> RecordPatch {
        RecordPatch {
            value: Some(item.value.clone()),
            // `None` keeps the existing category/sources, matching the
            // import contract: absent metadata is not an erasure.
            category: item.category.clone(),
            sources: item.sources.clone(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// In-process store double: a mutexed map plus an optional key that
    /// fails every write, for error-isolation tests.
    #[derive(Default)]
    struct MapStore {
        records: Mutex<HashMap<(String, String), TextRecord>>,
        fail_key: Option<String>,
    }

    impl MapStore {
        fn failing_on(key: &str) -> Self {
            Self {
                records: Mutex::new(HashMap::new()),
                fail_key: Some(key.to_string()),
            }
        }

        fn seed(&self, key: &str, value: &str, status: TextStatus) {
            let record = TextRecord {
                key: key.to_string(),
                project_id: "p1".into(),
                value: value.to_string(),
                translation: None,
                status,
                category: "seeded".into(),
                sources: Sources::default(),
                created_at: "2026-08-01T00:00:00Z".into(),
                updated_at: "2026-08-01T00:00:00Z".into(),
            };
            self.records
                .lock()
                .unwrap()
                .insert((key.to_string(), "p1".into()), record);
        }

        fn get(&self, key: &str) -> Option<TextRecord> {
            self.records
                .lock()
                .unwrap()
                .get(&(key.to_string(), "p1".to_string()))
                .cloned()
        }

        fn check_fail(&self, key: &str) -> Result<(), StoreFailure> {
            if self.fail_key.as_deref() == Some(key) {
                return Err(StoreFailure("write rejected".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl TextStore for MapStore {
        async fn find(
            &self,
            key: &str,
            project_id: &str,
        ) -> Result<Option<TextRecord>, StoreFailure> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .get(&(key.to_string(), project_id.to_string()))
                .cloned())
        }

        async fn insert(&self, record: NewRecord) -> Result<TextRecord, StoreFailure> {
            self.check_fail(&record.key)?;
            let stored = TextRecord {
                key: record.key.clone(),
                project_id: record.project_id.clone(),
                value: record.value,
                translation: None,
                status: record.status,
                category: record.category,
                sources: record.sources,
                created_at: "2026-08-02T00:00:00Z".into(),
                updated_at: "2026-08-02T00:00:00Z".into(),
            };
            self.records
                .lock()
                .unwrap()
                .insert((record.key, record.project_id), stored.clone());
            Ok(stored)
        }

        async fn update(
            &self,
            key: &str,
            project_id: &str,
            patch: RecordPatch,
        ) -> Result<TextRecord, StoreFailure> {
            self.check_fail(key)?;
            let mut records = self.records.lock().unwrap();
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
            record.updated_at = "2026-08-03T00:00:00Z".into();
            Ok(record.clone())
        }
    }

    fn item(key: &str, value: &str) -> ImportItem {
        ImportItem {
            key: key.into(),
            value: value.into(),
            category: None,
            sources: None,
        }
    }

    #[tokio::test]
    async fn absent_key_is_created_as_draft() {
        let store = MapStore::default();
        let outcomes = Reconciler::new(&store)
            .run("p1", &[item("a", "hi")])
            .await
            .unwrap();
        assert_eq!(outcomes[0].action, ItemAction::Created);
        let record = store.get("a").unwrap();
        assert_eq!(record.status, TextStatus::Draft);
        assert_eq!(record.value, "hi");
        assert_eq!(record.category, UNCATEGORIZED);
    }

    #[tokio::test]
    async fn draft_is_overwritten_in_place() {
        let store = MapStore::default();
        store.seed("a", "old", TextStatus::Draft);
        let outcomes = Reconciler::new(&store)
            .run("p1", &[item("a", "hi")])
            .await
            .unwrap();
        assert_eq!(outcomes[0].action, ItemAction::Updated);
        let record = store.get("a").unwrap();
        assert_eq!(record.value, "hi");
        assert_eq!(record.status, TextStatus::Draft);
    }

    #[tokio::test]
    async fn in_review_is_overwritten_in_place() {
        let store = MapStore::default();
        store.seed("a", "old", TextStatus::InReview);
        let outcomes = Reconciler::new(&store)
            .run("p1", &[item("a", "hi")])
            .await
            .unwrap();
        assert_eq!(outcomes[0].action, ItemAction::Updated);
        assert_eq!(store.get("a").unwrap().status, TextStatus::InReview);
    }

    #[tokio::test]
    async fn approved_unchanged_is_skipped_untouched() {
        let store = MapStore::default();
        store.seed("a", "hi", TextStatus::Approved);
        let before = store.get("a").unwrap();
        let outcomes = Reconciler::new(&store)
            .run("p1", &[item("a", "hi")])
            .await
            .unwrap();
        assert_eq!(outcomes[0].action, ItemAction::Skipped);
        assert_eq!(outcomes[0].reason.as_deref(), Some("unchanged"));
        // True no-op: nothing mutated, updated_at not bumped.
        assert_eq!(store.get("a").unwrap(), before);
    }

    #[tokio::test]
    async fn approved_changed_is_demoted_to_review() {
        let store = MapStore::default();
        store.seed("a", "hi", TextStatus::Approved);
        let outcomes = Reconciler::new(&store)
            .run("p1", &[item("a", "bye")])
            .await
            .unwrap();
        assert_eq!(outcomes[0].action, ItemAction::MovedToReview);
        let record = store.get("a").unwrap();
        assert_eq!(record.value, "bye");
        assert_eq!(record.status, TextStatus::InReview);
    }

    #[tokio::test]
    async fn missing_key_is_a_per_item_error() {
        let store = MapStore::default();
        let outcomes = Reconciler::new(&store)
            .run("p1", &[item("", "x")])
            .await
            .unwrap();
        assert_eq!(outcomes[0].action, ItemAction::Error);
        assert_eq!(outcomes[0].key, "unknown");
        assert!(outcomes[0].error.as_deref().unwrap().contains("missing key"));
    }

    #[tokio::test]
    async fn missing_value_is_a_per_item_error() {
        let store = MapStore::default();
        let outcomes = Reconciler::new(&store)
            .run("p1", &[item("a", "")])
            .await
            .unwrap();
        assert_eq!(outcomes[0].action, ItemAction::Error);
        assert_eq!(outcomes[0].key, "a");
    }

    #[tokio::test]
    async fn missing_project_fails_the_whole_batch() {
        let store = MapStore::default();
        let result = Reconciler::new(&store).run("  ", &[item("a", "hi")]).await;
        assert!(matches!(result, Err(ReconcileError::MissingProject)));
        assert!(store.get("a").is_none());
    }

    #[tokio::test]
    async fn store_failure_does_not_abort_the_batch() {
        let store = MapStore::failing_on("bad");
        let outcomes = Reconciler::new(&store)
            .run("p1", &[item("good1", "x"), item("bad", "y"), item("good2", "z")])
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].action, ItemAction::Created);
        assert_eq!(outcomes[1].action, ItemAction::Error);
        assert_eq!(outcomes[1].error.as_deref(), Some("write rejected"));
        assert_eq!(outcomes[2].action, ItemAction::Created);
        // Neighbours' persisted state is untouched by the failure.
        assert_eq!(store.get("good1").unwrap().value, "x");
        assert_eq!(store.get("good2").unwrap().value, "z");
        assert!(store.get("bad").is_none());
    }

    #[tokio::test]
    async fn outcomes_preserve_input_order() {
        let store = MapStore::default();
        store.seed("b", "same", TextStatus::Approved);
        let outcomes = Reconciler::new(&store)
            .run("p1", &[item("c", "new"), item("b", "same"), item("", "x")])
            .await
            .unwrap();
        let actions: Vec<_> = outcomes.iter().map(|o| o.action).collect();
        assert_eq!(
            actions,
            vec![ItemAction::Created, ItemAction::Skipped, ItemAction::Error]
        );
    }

    #[tokio::test]
    async fn merged_batch_creates_one_record_per_key() {
        use crate::batch::merge_items;
        let store = MapStore::default();
        let merged = merge_items(vec![item("dup", "first"), item("dup", "second")]);
        let outcomes = Reconciler::new(&store).run("p1", &merged).await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(store.get("dup").unwrap().value, "first");
    }

    #[tokio::test]
    async fn update_keeps_metadata_when_item_has_none() {
        let store = MapStore::default();
        store.seed("a", "old", TextStatus::Draft);
        Reconciler::new(&store)
            .run("p1", &[item("a", "new")])
            .await
            .unwrap();
        // Category seeded as "seeded" survives an item without one.
        assert_eq!(store.get("a").unwrap().category, "seeded");
    }

    #[test]
    fn decide_is_pure_and_total() {
        assert_eq!(decide(None, "x"), Decision::Create);
        let mut record = TextRecord {
            key: "a".into(),
            project_id: "p1".into(),
            value: "x".into(),
            translation: None,
            status: TextStatus::Draft,
            category: "c".into(),
            sources: Sources::default(),
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert_eq!(decide(Some(&record), "y"), Decision::Overwrite);
        record.status = TextStatus::InReview;
        assert_eq!(decide(Some(&record), "y"), Decision::Overwrite);
        record.status = TextStatus::Approved;
        assert_eq!(decide(Some(&record), "x"), Decision::Skip);
        assert_eq!(decide(Some(&record), "y"), Decision::Demote);
    }

    #[test]
    fn outcome_serializes_with_snake_case_action() {
        let outcome = ItemOutcome::skipped("a");
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"skipped\""));
        assert!(json.contains("\"unchanged\""));
        let moved = ItemOutcome::acted("b", ItemAction::MovedToReview);
        assert!(serde_json::to_string(&moved).unwrap().contains("moved_to_review"));
    }
}
