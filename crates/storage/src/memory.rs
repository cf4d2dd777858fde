use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::store::{Document, DocumentStore, StoreError};

/// In-memory document store. Used by tests and demos; keeps insertion
/// order per collection, upserts in place.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<&'static str, Vec<(String, Value)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<&'static str, Vec<(String, Value)>>>, StoreError> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Unavailable("poisoned lock".to_string()))
    }
}

impl DocumentStore for MemoryStore {
    async fn get_all<T: Document>(&self) -> Result<Vec<T>, StoreError> {
        let guard = self.lock()?;
        guard
            .get(T::COLLECTION)
            .map(|records| {
                records
                    .iter()
                    .map(|(_, body)| serde_json::from_value(body.clone()).map_err(StoreError::from))
                    .collect()
            })
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn save_many<T: Document>(&self, records: &[T]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut guard = self.lock()?;
        let collection = guard.entry(T::COLLECTION).or_default();
        for record in records {
            let body = serde_json::to_value(record)?;
            match collection.iter_mut().find(|(id, _)| id.as_str() == record.id()) {
                Some((_, slot)) => *slot = body,
                None => collection.push((record.id().to_string(), body)),
            }
        }
        Ok(())
    }

    async fn delete_many<T: Document>(&self, ids: &[String]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut guard = self.lock()?;
        if let Some(collection) = guard.get_mut(T::COLLECTION) {
            collection.retain(|(id, _)| !ids.contains(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fieldbook_core::{Expense, Money};

    fn expense(vendor: &str) -> Expense {
        Expense::new(
            vendor,
            NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            Money::from_cents(10000),
        )
    }

    #[tokio::test]
    async fn round_trips_in_insertion_order() {
        let store = MemoryStore::new();
        let (a, b) = (expense("Ace Hardware"), expense("Shell"));
        store.save_many(&[a.clone(), b.clone()]).await.unwrap();

        let loaded: Vec<Expense> = store.get_all().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].vendor, "Ace Hardware");
        assert_eq!(loaded[1].vendor, "Shell");
    }

    #[tokio::test]
    async fn upsert_replaces_by_id_keeping_position() {
        let store = MemoryStore::new();
        let (mut a, b) = (expense("Ace Hardware"), expense("Shell"));
        store.save_many(&[a.clone(), b]).await.unwrap();

        a.vendor = "Ace Hardware #42".to_string();
        store.save_many(&[a]).await.unwrap();

        let loaded: Vec<Expense> = store.get_all().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].vendor, "Ace Hardware #42");
    }

    #[tokio::test]
    async fn delete_many_removes_only_named_ids() {
        let store = MemoryStore::new();
        let (a, b) = (expense("Ace Hardware"), expense("Shell"));
        store.save_many(&[a.clone(), b.clone()]).await.unwrap();
        store
            .delete_many::<Expense>(&[a.id.clone()])
            .await
            .unwrap();

        let loaded: Vec<Expense> = store.get_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, b.id);
    }
}
