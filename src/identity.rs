//! Derived matching keys for contact records.
//!
//! A [`RecordIdentity`] is computed from a record's name fields and used only
//! for equality and hashing during one reconciliation pass. It is cheap,
//! deterministic, and never persisted.

use crate::models::RawRecord;

/// A variant key matching records across the old and new collections.
///
/// Person and organization keys are distinct even when the textual payload
/// coincides: a person named "Acme" and an organization named "Acme" are
/// different identities. Matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordIdentity {
    Person {
        first_name: String,
        last_name: String,
        /// Included only when the owning source opts into nickname matching.
        nickname: Option<String>,
    },
    Organization {
        name: String,
    },
}

impl RecordIdentity {
    /// Derive the identity of a record, or `None` when the record has no
    /// usable name. Records without an identity are excluded from
    /// reconciliation entirely.
    pub fn of(record: &RawRecord, include_nickname: bool) -> Option<RecordIdentity> {
        match record {
            RawRecord::Person(p) => {
                let nickname = if include_nickname {
                    p.nickname.clone()
                } else {
                    None
                };
                let nameless = p.first_name.is_empty()
                    && p.last_name.is_empty()
                    && nickname.as_deref().unwrap_or("").is_empty();
                if nameless {
                    return None;
                }
                Some(RecordIdentity::Person {
                    first_name: p.first_name.clone(),
                    last_name: p.last_name.clone(),
                    nickname,
                })
            }
            RawRecord::Organization(o) => {
                if o.name.is_empty() {
                    return None;
                }
                Some(RecordIdentity::Organization {
                    name: o.name.clone(),
                })
            }
        }
    }
}
