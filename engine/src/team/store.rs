//! Entry lookup for retries
//!
//! A retry names its subject by id; the store resolves the entry and the
//! history that precedes it.

use crate::journal::JournalEntry;
use async_trait::async_trait;

/// Failure inside an entry store backend
#[derive(Debug, Clone, thiserror::Error)]
#[error("Entry store error: {0}")]
pub struct StoreError(pub String);

/// Source of journal entries for retry resolution
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// The entry with this id, if any
    async fn get(&self, id: &str) -> Result<Option<JournalEntry>, StoreError>;

    /// Up to `limit` entries created before `entry`, most recent first
    async fn history_before(
        &self,
        entry: &JournalEntry,
        limit: usize,
    ) -> Result<Vec<JournalEntry>, StoreError>;
}

/// In-process store over a fixed set of entries
#[derive(Debug, Clone, Default)]
pub struct MemoryEntryStore {
    // Most recent first
    entries: Vec<JournalEntry>,
}

impl MemoryEntryStore {
    pub fn new(mut entries: Vec<JournalEntry>) -> Self {
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl EntryStore for MemoryEntryStore {
    async fn get(&self, id: &str) -> Result<Option<JournalEntry>, StoreError> {
        Ok(self.entries.iter().find(|e| e.id == id).cloned())
    }

    async fn history_before(
        &self,
        entry: &JournalEntry,
        limit: usize,
    ) -> Result<Vec<JournalEntry>, StoreError> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.id != entry.id && e.created_at < entry.created_at)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn entry(id: &str, day: i64) -> JournalEntry {
        JournalEntry {
            id: id.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::days(day),
            title: Some(format!("Entry {}", id)),
            moment: None,
            initial_thoughts: None,
            tags: Vec::new(),
            analysis: None,
        }
    }

    #[tokio::test]
    async fn test_get_and_history() {
        let store = MemoryEntryStore::new(vec![
            entry("a", 0),
            entry("c", 2),
            entry("b", 1),
            entry("d", 3),
        ]);
        assert_eq!(store.len(), 4);

        let subject = store.get("c").await.unwrap().unwrap();
        let history = store.history_before(&subject, 5).await.unwrap();
        let ids: Vec<&str> = history.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);

        let history = store.history_before(&subject, 1).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, "b");

        assert!(store.get("missing").await.unwrap().is_none());
    }
}
