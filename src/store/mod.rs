//! Contact store abstraction.
//!
//! The [`ContactStore`] trait covers the operations the import pipeline
//! needs from the platform contact store. Mutation calls are synchronous
//! from the orchestrator's perspective and may be rejected individually;
//! the store has no multi-record transaction primitive, so partially
//! applied sources are not rolled back.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`load_all`](ContactStore::load_all) | Snapshot of all existing records |
//! | [`create`](ContactStore::create) | Create a new record |
//! | [`set_single_value`](ContactStore::set_single_value) | Set one single-value field |
//! | [`set_image`](ContactStore::set_image) | Set the contact image |
//! | [`add_multi_values`](ContactStore::add_multi_values) | Append multi-value entries |
//! | [`has_pending_changes`](ContactStore::has_pending_changes) | Any uncommitted writes? |
//! | [`commit`](ContactStore::commit) | Persist pending writes |

pub mod memory;

use anyhow::Result;

use crate::models::{LabeledValue, MultiField, RawRecord, SingleField};

/// A record that already exists in the contact store, paired with its
/// store-assigned id so staged changes can be applied to it later.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingRecord {
    pub id: String,
    pub data: RawRecord,
}

/// Abstract platform contact store.
///
/// Implementations must be `Send + Sync`; the pipeline only ever calls them
/// from its single batch task.
pub trait ContactStore: Send + Sync {
    /// Load every existing record. A failure here is the one condition that
    /// aborts a whole batch before any source is processed.
    fn load_all(&self) -> Result<Vec<ExistingRecord>>;

    /// Create a new record and return it with its assigned id.
    fn create(&self, record: &RawRecord) -> Result<ExistingRecord>;

    /// Set one single-value field on an existing record.
    fn set_single_value(&self, record_id: &str, field: SingleField, value: &str) -> Result<()>;

    /// Set the contact image on an existing record.
    fn set_image(&self, record_id: &str, image: &[u8]) -> Result<()>;

    /// Append entries to a multi-value field on an existing record.
    fn add_multi_values(
        &self,
        record_id: &str,
        field: MultiField,
        values: &[LabeledValue],
    ) -> Result<()>;

    /// Whether any writes are waiting to be committed.
    fn has_pending_changes(&self) -> bool;

    /// Persist pending writes. Called once per source that wrote anything.
    fn commit(&self) -> Result<()>;
}
