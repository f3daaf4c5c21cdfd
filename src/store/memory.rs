//! In-memory [`ContactStore`] implementation for testing and as a reference
//! backend.
//!
//! Keeps records in a `Vec` behind `std::sync::RwLock` and tracks pending
//! writes and commit calls so tests can assert on commit behavior.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use anyhow::{bail, Result};
use uuid::Uuid;

use crate::models::{LabeledValue, MultiField, RawRecord, SingleField};

use super::{ContactStore, ExistingRecord};

/// In-memory contact store.
#[derive(Default)]
pub struct MemoryContactStore {
    records: RwLock<Vec<ExistingRecord>>,
    pending: AtomicBool,
    commits: AtomicUsize,
}

impl MemoryContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store with existing records; returns their ids.
    pub fn seed(&self, records: impl IntoIterator<Item = RawRecord>) -> Vec<String> {
        let mut guard = self.records.write().unwrap();
        records
            .into_iter()
            .map(|data| {
                let id = Uuid::new_v4().to_string();
                guard.push(ExistingRecord {
                    id: id.clone(),
                    data,
                });
                id
            })
            .collect()
    }

    /// Snapshot of the current records, for assertions.
    pub fn records(&self) -> Vec<ExistingRecord> {
        self.records.read().unwrap().clone()
    }

    /// Number of commit calls so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    fn mutate<F>(&self, record_id: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut RawRecord) -> bool,
    {
        let mut guard = self.records.write().unwrap();
        let Some(record) = guard.iter_mut().find(|r| r.id == record_id) else {
            bail!("no record with id '{record_id}'");
        };
        if !apply(&mut record.data) {
            bail!("field not applicable to record '{record_id}'");
        }
        self.pending.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl ContactStore for MemoryContactStore {
    fn load_all(&self) -> Result<Vec<ExistingRecord>> {
        Ok(self.records())
    }

    fn create(&self, record: &RawRecord) -> Result<ExistingRecord> {
        let created = ExistingRecord {
            id: Uuid::new_v4().to_string(),
            data: record.clone(),
        };
        self.records.write().unwrap().push(created.clone());
        self.pending.store(true, Ordering::SeqCst);
        Ok(created)
    }

    fn set_single_value(&self, record_id: &str, field: SingleField, value: &str) -> Result<()> {
        self.mutate(record_id, |data| data.set_single_value(field, value))
    }

    fn set_image(&self, record_id: &str, image: &[u8]) -> Result<()> {
        self.mutate(record_id, |data| data.set_image(image.to_vec()))
    }

    fn add_multi_values(
        &self,
        record_id: &str,
        field: MultiField,
        values: &[LabeledValue],
    ) -> Result<()> {
        self.mutate(record_id, |data| data.add_multi_values(field, values))
    }

    fn has_pending_changes(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    fn commit(&self) -> Result<()> {
        self.pending.store(false, Ordering::SeqCst);
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PersonRecord;

    fn person(first: &str, last: &str) -> RawRecord {
        RawRecord::Person(PersonRecord {
            first_name: first.to_string(),
            last_name: last.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn create_assigns_an_id_and_marks_pending() {
        let store = MemoryContactStore::new();
        assert!(!store.has_pending_changes());

        let created = store.create(&person("Arnold", "Alpha")).unwrap();
        assert!(!created.id.is_empty());
        assert!(store.has_pending_changes());
        assert_eq!(store.records().len(), 1);
    }

    #[test]
    fn commit_clears_pending_and_counts() {
        let store = MemoryContactStore::new();
        store.create(&person("Arnold", "Alpha")).unwrap();
        store.commit().unwrap();
        assert!(!store.has_pending_changes());
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn mutations_on_unknown_ids_are_rejected() {
        let store = MemoryContactStore::new();
        assert!(store
            .set_single_value("missing", SingleField::JobTitle, "CEO")
            .is_err());
    }

    #[test]
    fn inapplicable_fields_are_rejected() {
        let store = MemoryContactStore::new();
        let ids = store.seed([RawRecord::Organization(Default::default())]);
        assert!(store
            .set_single_value(&ids[0], SingleField::JobTitle, "CEO")
            .is_err());
    }

    #[test]
    fn multi_values_append_in_order() {
        let store = MemoryContactStore::new();
        let ids = store.seed([person("Arnold", "Alpha")]);
        store
            .add_multi_values(
                &ids[0],
                MultiField::Phone,
                &[
                    LabeledValue::new("mobile", "555-0100"),
                    LabeledValue::new("work", "555-0101"),
                ],
            )
            .unwrap();

        let records = store.records();
        let phones = records[0].data.multi_values(MultiField::Phone);
        assert_eq!(phones.len(), 2);
        assert_eq!(phones[0].value, "555-0100");
    }
}
