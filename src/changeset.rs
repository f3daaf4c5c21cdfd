//! Field-level change computation for one matched old/new record pair.
//!
//! The merge policy is additive and non-destructive: remote data can fill
//! gaps and append new contact points, never overwrite or delete what the
//! user already has locally.

use std::collections::{BTreeMap, HashSet};

use crate::models::{LabeledValue, MultiField, RawRecord, SingleField};
use crate::store::ExistingRecord;

/// Single-value fields considered by the diff, in apply order.
pub const SINGLE_FIELDS: [SingleField; 7] = [
    SingleField::Prefix,
    SingleField::Suffix,
    SingleField::Nickname,
    SingleField::MiddleName,
    SingleField::Organization,
    SingleField::JobTitle,
    SingleField::Department,
];

/// Multi-value fields considered by the diff, in apply order.
pub const MULTI_FIELDS: [MultiField; 6] = [
    MultiField::Phone,
    MultiField::Email,
    MultiField::Url,
    MultiField::Address,
    MultiField::InstantMessage,
    MultiField::SocialProfile,
];

/// The staged mutations to apply to one pre-existing record.
///
/// Never constructed empty: [`ChangeSet::compute`] returns `None` when no
/// field produces a staged change.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    /// Store id of the record these changes apply to.
    pub record_id: String,
    /// Single-value fields to set, staged only for fields currently unset
    /// on the old record.
    pub single_updates: BTreeMap<SingleField, String>,
    /// Multi-value entries to append, keyed by field.
    pub multi_additions: BTreeMap<MultiField, Vec<LabeledValue>>,
    /// Image to set, staged only when the old record has none.
    pub image: Option<Vec<u8>>,
}

impl ChangeSet {
    /// Diff a matched pair and stage the applicable updates.
    ///
    /// Single-value fields are sticky: any existing value, even a different
    /// one, suppresses the update. Multi-value entries are compared by value
    /// alone, so a changed label for an already-present value is not a
    /// change, and a value repeated in the new record is staged once.
    pub fn compute(old: &ExistingRecord, new: &RawRecord) -> Option<ChangeSet> {
        let mut single_updates = BTreeMap::new();
        for field in SINGLE_FIELDS {
            if old.data.single_value(field).is_some() {
                continue;
            }
            if let Some(value) = new.single_value(field) {
                single_updates.insert(field, value.to_string());
            }
        }

        let mut multi_additions = BTreeMap::new();
        for field in MULTI_FIELDS {
            let mut present: HashSet<&str> = old
                .data
                .multi_values(field)
                .iter()
                .map(|entry| entry.value.as_str())
                .collect();
            let staged: Vec<LabeledValue> = new
                .multi_values(field)
                .iter()
                .filter(|entry| present.insert(entry.value.as_str()))
                .cloned()
                .collect();
            if !staged.is_empty() {
                multi_additions.insert(field, staged);
            }
        }

        let image = match (old.data.image(), new.image()) {
            (None, Some(image)) => Some(image.to_vec()),
            _ => None,
        };

        if single_updates.is_empty() && multi_additions.is_empty() && image.is_none() {
            return None;
        }
        Some(ChangeSet {
            record_id: old.id.clone(),
            single_updates,
            multi_additions,
            image,
        })
    }

    /// Number of staged field updates, for summaries.
    pub fn staged_count(&self) -> usize {
        self.single_updates.len()
            + self
                .multi_additions
                .values()
                .map(|entries| entries.len())
                .sum::<usize>()
            + usize::from(self.image.is_some())
    }
}
