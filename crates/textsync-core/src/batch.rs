//! Per-batch accumulation of extracted text nodes.
//!
//! [`BatchBuilder`] is an explicit accumulator the extraction layer owns
//! for exactly one export: it assigns keys (reusing embedded ones), skips
//! empty text, and merges duplicate keys so the batch handed to the
//! reconciler never contains two items with the same key. No ambient
//! per-session state survives it.

use std::collections::HashMap;

use crate::key::{self, HashCase, KeyContext, KeyStrategy};
use crate::record::{ImportItem, Sources};

/// Accumulates one import batch, deduplicated by key in first-seen order.
#[derive(Debug)]
pub struct BatchBuilder {
    strategy: KeyStrategy,
    case: HashCase,
    file_id: Option<String>,
    items: Vec<ImportItem>,
    index: HashMap<String, usize>,
}

impl BatchBuilder {
    pub fn new(strategy: KeyStrategy) -> Self {
        Self {
            strategy,
            case: HashCase::default(),
            file_id: None,
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Override the hash casing for the hashed strategy.
    pub fn with_hash_case(mut self, case: HashCase) -> Self {
        self.case = case;
        self
    }

    /// Record the origin document id on every item's provenance.
    pub fn with_file(mut self, file_id: impl Into<String>) -> Self {
        self.file_id = Some(file_id.into());
        self
    }

    /// Add one text node to the batch.
    ///
    /// `label` is the node's short string label, checked for an embedded
    /// `T:` key before any derivation; `node_id` lands in the item's
    /// provenance. Returns the assigned key so the caller can write
    /// `T:{key}` back onto the node, or `None` when the text is empty
    /// after trimming and the node is excluded.
    pub fn push(
        &mut self,
        text: &str,
        label: Option<&str>,
        node_id: Option<&str>,
        ctx: &KeyContext,
    ) -> Option<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        let key = match label.and_then(key::embedded_key) {
            Some(existing) => existing.to_string(),
            None => key::derive_key(trimmed, ctx, self.strategy, self.case)?,
        };

        let category = Some(key::slugify(&ctx.page_name)).filter(|c| c != "text");

        match self.index.get(&key) {
            Some(&at) => {
                let item = &mut self.items[at];
                // Duplicate key: first non-empty value wins, provenance accumulates.
                if item.value.is_empty() {
                    item.value = trimmed.to_string();
                }
                if let Some(id) = node_id {
                    item.sources
                        .get_or_insert_with(Sources::default)
                        .nodes
                        .push(id.to_string());
                }
            }
            None => {
                let sources = Sources {
                    file_id: self.file_id.clone(),
                    nodes: node_id.map(str::to_string).into_iter().collect(),
                };
                self.items.push(ImportItem {
                    key: key.clone(),
                    value: trimmed.to_string(),
                    category,
                    sources: Some(sources).filter(|s| !s.is_empty()),
                });
                self.index.insert(key.clone(), self.items.len() - 1);
            }
        }
        Some(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consume the builder, yielding the deduplicated batch in first-seen
    /// order.
    pub fn finish(self) -> Vec<ImportItem> {
        self.items
    }
}

/// Merge an already-keyed batch (e.g. read from a file) by key.
///
/// Same contract as [`BatchBuilder`]: first-seen order, first non-empty
/// value wins, provenance accumulates. Items with an empty key pass
/// through unmerged so the reconciler can report them individually.
pub fn merge_items(items: Vec<ImportItem>) -> Vec<ImportItem> {
    let mut merged: Vec<ImportItem> = Vec::with_capacity(items.len());
    let mut index: HashMap<String, usize> = HashMap::new();
    for item in items {
        if item.key.is_empty() {
            merged.push(item);
            continue;
        }
        match index.get(&item.key) {
            Some(&at) => {
                let kept = &mut merged[at];
                if kept.value.is_empty() {
                    kept.value = item.value;
                }
                if kept.category.is_none() {
                    kept.category = item.category;
                }
                if let Some(extra) = item.sources {
                    let sources = kept.sources.get_or_insert_with(Sources::default);
                    if sources.file_id.is_none() {
                        sources.file_id = extra.file_id;
                    }
                    sources.nodes.extend(extra.nodes);
                }
            }
            None => {
                index.insert(item.key.clone(), merged.len());
                merged.push(item);
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> KeyContext {
        KeyContext::within("Header", "Landing")
    }

    #[test]
    fn assigns_and_returns_keys() {
        let mut batch = BatchBuilder::new(KeyStrategy::Contextual);
        let key = batch.push("Get started", None, Some("1:2"), &ctx()).unwrap();
        assert_eq!(key, "header_get_started");
        let items = batch.finish();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].value, "Get started");
        assert_eq!(items[0].category.as_deref(), Some("landing"));
    }

    #[test]
    fn reuses_embedded_label_key() {
        let mut batch = BatchBuilder::new(KeyStrategy::Contextual);
        let key = batch
            .push("Completely new text", Some("T:old_key_1234"), None, &ctx())
            .unwrap();
        assert_eq!(key, "old_key_1234");
    }

    #[test]
    fn skips_empty_text() {
        let mut batch = BatchBuilder::new(KeyStrategy::Hashed);
        assert_eq!(batch.push("   ", None, None, &ctx()), None);
        assert!(batch.is_empty());
    }

    #[test]
    fn merges_duplicate_keys_into_one_item() {
        let mut batch = BatchBuilder::new(KeyStrategy::Contextual);
        batch.push("Sign in", None, Some("1:2"), &ctx());
        batch.push("Sign in", None, Some("3:4"), &ctx());
        let items = batch.finish();
        assert_eq!(items.len(), 1);
        let sources = items[0].sources.as_ref().unwrap();
        assert_eq!(sources.nodes, vec!["1:2".to_string(), "3:4".to_string()]);
    }

    #[test]
    fn file_id_lands_in_provenance() {
        let mut batch = BatchBuilder::new(KeyStrategy::Hashed).with_file("fig123");
        batch.push("Hello World", None, Some("9:9"), &ctx());
        let items = batch.finish();
        assert_eq!(items[0].sources.as_ref().unwrap().file_id.as_deref(), Some("fig123"));
    }

    #[test]
    fn first_seen_order_is_preserved() {
        let mut batch = BatchBuilder::new(KeyStrategy::Hashed);
        batch.push("one", None, None, &ctx());
        batch.push("two", None, None, &ctx());
        batch.push("one", None, None, &ctx());
        let keys: Vec<_> = batch.finish().into_iter().map(|i| i.key).collect();
        assert_eq!(keys.len(), 2);
        assert!(keys[0].starts_with("one_"));
        assert!(keys[1].starts_with("two_"));
    }

    #[test]
    fn merge_items_dedups_by_key() {
        let items = vec![
            ImportItem {
                key: "a".into(),
                value: "".into(),
                category: None,
                sources: None,
            },
            ImportItem {
                key: "a".into(),
                value: "hi".into(),
                category: Some("home".into()),
                sources: Some(Sources {
                    file_id: None,
                    nodes: vec!["1:1".into()],
                }),
            },
            ImportItem {
                key: "b".into(),
                value: "bye".into(),
                category: None,
                sources: None,
            },
        ];
        let merged = merge_items(items);
        assert_eq!(merged.len(), 2);
        // Later node's value wins only because the first had none.
        assert_eq!(merged[0].value, "hi");
        assert_eq!(merged[0].category.as_deref(), Some("home"));
        assert_eq!(merged[1].key, "b");
    }

    #[test]
    fn merge_items_keeps_first_nonempty_value() {
        let items = vec![
            ImportItem {
                key: "a".into(),
                value: "first".into(),
                category: None,
                sources: None,
            },
            ImportItem {
                key: "a".into(),
                value: "second".into(),
                category: None,
                sources: None,
            },
        ];
        let merged = merge_items(items);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].value, "first");
    }

    #[test]
    fn merge_items_passes_empty_keys_through() {
        let items = vec![
            ImportItem {
                key: "".into(),
                value: "x".into(),
                category: None,
                sources: None,
            },
            ImportItem {
                key: "".into(),
                value: "y".into(),
                category: None,
                sources: None,
            },
        ];
        assert_eq!(merge_items(items).len(), 2);
    }
}
