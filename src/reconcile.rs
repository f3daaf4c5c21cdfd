//! Set reconciliation between the contact-store snapshot and a freshly
//! parsed record batch.
//!
//! Classifies each incoming record as an addition, a change against exactly
//! one existing record, or a skip when identity is ambiguous. Pure function
//! of its inputs: it never fails, never touches the store, and is correct
//! independent of input ordering.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::changeset::ChangeSet;
use crate::identity::RecordIdentity;
use crate::models::RawRecord;
use crate::store::ExistingRecord;

/// Classification result of one reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    /// Genuinely new records to create in the store.
    pub additions: Vec<RawRecord>,
    /// Field-level changes against uniquely matched existing records.
    pub changes: Vec<ChangeSet>,
    /// Incoming records dropped because several of them shared one identity.
    /// Counts every record under the shared identity, including the first.
    pub duplicate_skips: u32,
    /// Incoming records dropped because several existing records matched.
    /// Counts the matching existing records, not the incoming record.
    pub ambiguous_skips: u32,
}

impl ReconcileOutcome {
    /// True when the pass produced nothing to apply and nothing to report.
    pub fn is_noop(&self) -> bool {
        self.additions.is_empty()
            && self.changes.is_empty()
            && self.duplicate_skips == 0
            && self.ambiguous_skips == 0
    }
}

/// Reconcile a new record batch against the existing records.
///
/// 1. Deduplicate incoming records by identity. An identity claimed by more
///    than one incoming record is dropped entirely, first claimant included;
///    neither record is silently preferred. Records without an identity are
///    excluded up front and counted nowhere.
/// 2. Bucket the surviving records against the existing collection: zero
///    matches is an addition, exactly one match is a candidate pair, two or
///    more matches are skipped as ambiguous.
/// 3. Compute change sets for the candidate pairs; pairs that differ in no
///    applicable field are dropped silently.
pub fn reconcile(
    existing: &[ExistingRecord],
    incoming: &[RawRecord],
    match_nickname: bool,
) -> ReconcileOutcome {
    let mut outcome = ReconcileOutcome::default();

    // Identity -> unique incoming record; None marks an identity dropped as
    // a duplicate. First-seen order is kept so additions come out in file
    // order.
    let mut unique: HashMap<RecordIdentity, Option<&RawRecord>> = HashMap::new();
    let mut order: Vec<RecordIdentity> = Vec::new();
    for record in incoming {
        let Some(identity) = RecordIdentity::of(record, match_nickname) else {
            continue;
        };
        match unique.entry(identity) {
            Entry::Vacant(slot) => {
                order.push(slot.key().clone());
                slot.insert(Some(record));
            }
            Entry::Occupied(mut slot) => {
                // The first collision charges both colliding records.
                outcome.duplicate_skips += if slot.get().is_some() { 2 } else { 1 };
                slot.insert(None);
            }
        }
    }

    let mut by_identity: HashMap<RecordIdentity, Vec<&ExistingRecord>> = HashMap::new();
    for record in existing {
        if let Some(identity) = RecordIdentity::of(&record.data, match_nickname) {
            by_identity.entry(identity).or_default().push(record);
        }
    }

    for identity in &order {
        let Some(Some(record)) = unique.get(identity) else {
            continue;
        };
        match by_identity.get(identity).map(Vec::as_slice) {
            None => outcome.additions.push((*record).clone()),
            Some([matched]) => {
                if let Some(change) = ChangeSet::compute(matched, record) {
                    outcome.changes.push(change);
                }
            }
            Some(matches) => outcome.ambiguous_skips += matches.len() as u32,
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LabeledValue, OrganizationRecord, PersonRecord};

    fn person(first: &str, last: &str) -> RawRecord {
        RawRecord::Person(PersonRecord {
            first_name: first.to_string(),
            last_name: last.to_string(),
            ..Default::default()
        })
    }

    fn stored(id: &str, record: RawRecord) -> ExistingRecord {
        ExistingRecord {
            id: id.to_string(),
            data: record,
        }
    }

    #[test]
    fn new_record_becomes_an_addition() {
        let outcome = reconcile(&[], &[person("Arnold", "Alpha")], false);
        assert_eq!(outcome.additions.len(), 1);
        assert!(outcome.changes.is_empty());
        assert_eq!(outcome.duplicate_skips, 0);
        assert_eq!(outcome.ambiguous_skips, 0);
    }

    #[test]
    fn duplicate_in_batch_drops_both_and_counts_both() {
        let outcome = reconcile(
            &[],
            &[person("Arnold", "Alpha"), person("Arnold", "Alpha")],
            false,
        );
        assert!(outcome.additions.is_empty());
        assert!(outcome.changes.is_empty());
        assert_eq!(outcome.duplicate_skips, 2);
    }

    #[test]
    fn triple_duplicate_counts_three() {
        let outcome = reconcile(
            &[],
            &[
                person("Arnold", "Alpha"),
                person("Arnold", "Alpha"),
                person("Arnold", "Alpha"),
            ],
            false,
        );
        assert!(outcome.additions.is_empty());
        assert_eq!(outcome.duplicate_skips, 3);
    }

    #[test]
    fn ambiguous_match_counts_matching_existing_records() {
        let existing = [
            stored("a", person("Arnold", "Alpha")),
            stored("b", person("Arnold", "Alpha")),
        ];
        let outcome = reconcile(&existing, &[person("Arnold", "Alpha")], false);
        assert!(outcome.additions.is_empty());
        assert!(outcome.changes.is_empty());
        assert_eq!(outcome.ambiguous_skips, 2);
    }

    #[test]
    fn nameless_records_contribute_nothing() {
        let outcome = reconcile(
            &[stored("a", person("", ""))],
            &[person("", ""), person("", "")],
            false,
        );
        assert!(outcome.is_noop());
    }

    #[test]
    fn matched_pair_with_changes_yields_one_change_set() {
        let existing = [stored(
            "a",
            RawRecord::Person(PersonRecord {
                first_name: "Arnold".to_string(),
                last_name: "Alpha".to_string(),
                job_title: Some("Existing".to_string()),
                ..Default::default()
            }),
        )];
        let incoming = [RawRecord::Person(PersonRecord {
            first_name: "Arnold".to_string(),
            last_name: "Alpha".to_string(),
            job_title: Some("New".to_string()),
            phones: vec![LabeledValue::new("mobile", "555")],
            ..Default::default()
        })];

        let outcome = reconcile(&existing, &incoming, false);
        assert!(outcome.additions.is_empty());
        assert_eq!(outcome.changes.len(), 1);

        let change = &outcome.changes[0];
        assert_eq!(change.record_id, "a");
        // Job title is already set locally and stays untouched.
        assert!(change.single_updates.is_empty());
        assert_eq!(
            change.multi_additions.get(&crate::models::MultiField::Phone),
            Some(&vec![LabeledValue::new("mobile", "555")])
        );
    }

    #[test]
    fn identical_matched_pair_is_dropped_silently() {
        let record = person("Arnold", "Alpha");
        let outcome = reconcile(&[stored("a", record.clone())], &[record], false);
        assert!(outcome.is_noop());
    }

    #[test]
    fn nickname_splits_identities_when_enabled() {
        let with_nick = RawRecord::Person(PersonRecord {
            first_name: "Arnold".to_string(),
            last_name: "Alpha".to_string(),
            nickname: Some("Arnie".to_string()),
            ..Default::default()
        });
        let existing = [stored("a", person("Arnold", "Alpha"))];

        // With nickname matching the identities differ: one addition.
        let outcome = reconcile(&existing, &[with_nick.clone()], true);
        assert_eq!(outcome.additions.len(), 1);

        // Without it they collapse into a matched pair staging the nickname.
        let outcome = reconcile(&existing, &[with_nick], false);
        assert!(outcome.additions.is_empty());
        assert_eq!(outcome.changes.len(), 1);
    }

    #[test]
    fn organizations_reconcile_independently_of_people() {
        let org = RawRecord::Organization(OrganizationRecord {
            name: "Acme".to_string(),
            ..Default::default()
        });
        let existing = [stored("a", person("Acme", ""))];
        let outcome = reconcile(&existing, &[org], false);
        assert_eq!(outcome.additions.len(), 1);
        assert_eq!(outcome.ambiguous_skips, 0);
    }

    #[test]
    fn reconciliation_is_deterministic() {
        let existing = [
            stored("a", person("Arnold", "Alpha")),
            stored("b", person("Berta", "Beta")),
        ];
        let incoming = [
            person("Berta", "Beta"),
            person("Carla", "Gamma"),
            person("Carla", "Gamma"),
        ];

        let first = reconcile(&existing, &incoming, false);
        let second = reconcile(&existing, &incoming, false);
        assert_eq!(first.additions, second.additions);
        assert_eq!(first.changes, second.changes);
        assert_eq!(first.duplicate_skips, second.duplicate_skips);
        assert_eq!(first.ambiguous_skips, second.ambiguous_skips);
    }
}
