//! Repository layer - domain-facing access to the record store
//!
//! Owns the store behind an async mutex and republishes a snapshot of all
//! records (with tags) on a watch channel after every mutation, so the
//! presentation layer can observe changes without polling.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::store::error::StoreResult;
use crate::store::records::RecordStore;
use crate::store::types::{Profile, Record};

/// Shared, observable repository over a [`RecordStore`]
#[derive(Clone)]
pub struct Repository {
    store: Arc<Mutex<RecordStore>>,
    snapshot: watch::Sender<Vec<Record>>,
}

impl Repository {
    /// Wrap a store; the initial snapshot is loaded eagerly
    pub fn new(store: RecordStore) -> StoreResult<Self> {
        let initial = store.all_records()?;
        let (snapshot, _) = watch::channel(initial);
        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            snapshot,
        })
    }

    /// Subscribe to the stream of full-record snapshots
    pub fn subscribe(&self) -> watch::Receiver<Vec<Record>> {
        self.snapshot.subscribe()
    }

    /// Insert a record and republish
    pub async fn add(&self, record: &Record) -> StoreResult<()> {
        let mut store = self.store.lock().await;
        store.insert_record(record)?;
        self.republish(&store)
    }

    /// Update a record and republish
    pub async fn update(&self, record: &Record) -> StoreResult<()> {
        let mut store = self.store.lock().await;
        store.update_record(record)?;
        self.republish(&store)
    }

    /// Delete a record and republish
    pub async fn delete(&self, id: &Uuid) -> StoreResult<()> {
        let mut store = self.store.lock().await;
        store.delete_record(id)?;
        self.republish(&store)
    }

    /// Load a record by id
    pub async fn get(&self, id: &Uuid) -> StoreResult<Option<Record>> {
        self.store.lock().await.get_record(id)
    }

    /// All records with tags, ordered by date
    pub async fn all(&self) -> StoreResult<Vec<Record>> {
        self.store.lock().await.all_records()
    }

    /// All known tag names
    pub async fn tag_names(&self) -> StoreResult<Vec<String>> {
        self.store.lock().await.tag_names()
    }

    /// Load the user profile
    pub async fn profile(&self) -> StoreResult<Profile> {
        self.store.lock().await.get_profile()
    }

    /// Save the user profile
    pub async fn set_profile(&self, profile: &Profile) -> StoreResult<()> {
        self.store.lock().await.set_profile(profile)
    }

    /// Run a closure against the locked store (reminders, maintenance)
    pub async fn with_store<T>(
        &self,
        f: impl FnOnce(&mut RecordStore) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut store = self.store.lock().await;
        f(&mut store)
    }

    fn republish(&self, store: &RecordStore) -> StoreResult<()> {
        let records = store.all_records()?;
        // send_replace never fails even with no subscribers
        self.snapshot.send_replace(records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::RecordType;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_mutations_republish_snapshot() {
        let repo = Repository::new(RecordStore::open_in_memory().unwrap()).unwrap();
        let mut rx = repo.subscribe();
        assert!(rx.borrow().is_empty());

        let record = Record::new(RecordType::Consultation, date(2024, 3, 1)).tag("gp");
        repo.add(&record).await.unwrap();

        rx.changed().await.unwrap();
        {
            let snapshot = rx.borrow();
            assert_eq!(snapshot.len(), 1);
            assert_eq!(snapshot[0].tags, vec!["gp"]);
        }

        repo.delete(&record.id).await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_get_and_all_reflect_updates() {
        let repo = Repository::new(RecordStore::open_in_memory().unwrap()).unwrap();
        let mut record = Record::new(RecordType::VitalSign, date(2024, 3, 1)).measurement(64.0, "bpm");
        repo.add(&record).await.unwrap();

        record.description = Some("Resting heart rate".to_string());
        repo.update(&record).await.unwrap();

        let loaded = repo.get(&record.id).await.unwrap().unwrap();
        assert_eq!(loaded.description.as_deref(), Some("Resting heart rate"));
        assert_eq!(repo.all().await.unwrap().len(), 1);
    }
}
