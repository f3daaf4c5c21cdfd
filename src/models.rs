//! Core data models for cardsync.
//!
//! These types represent configured sources, parsed contact records, and the
//! per-field vocabulary shared by the change-set computation and the contact
//! store. Records are immutable values once produced by the parser; identity
//! and equality are structural.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::freshness::FreshnessStamp;

/// How the transport authenticates against the remote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    #[default]
    None,
    Basic,
}

/// Connection descriptor for a remote contact-card endpoint.
///
/// The password is usually absent here and merged in from the credential
/// store right before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub url: String,
    #[serde(default)]
    pub auth: AuthMethod,
    /// Login page some servers redirect to when authentication fails.
    #[serde(default)]
    pub login_url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Result of the most recent import attempt for a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastImportOutcome {
    pub success: bool,
    pub message: String,
    pub finished_at: DateTime<Utc>,
    /// Freshness stamp to compare against on the next pass.
    pub stamp: Option<FreshnessStamp>,
}

/// A configured remote contact-card source.
///
/// Sources have immutable value semantics: they are created once, persisted
/// externally, and mutated only by replacing the whole value after an import
/// attempt or a configuration edit. The id is assigned at creation and never
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    id: String,
    pub name: String,
    pub connection: Connection,
    /// Include the nickname when matching records by identity.
    #[serde(default)]
    pub match_nickname: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub last_outcome: Option<LastImportOutcome>,
}

fn default_enabled() -> bool {
    true
}

impl Source {
    /// Create a new source with a freshly assigned id.
    pub fn new(name: impl Into<String>, connection: Connection) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            connection,
            match_nickname: false,
            enabled: true,
            last_outcome: None,
        }
    }

    /// Stable identifier, assigned once at creation.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Freshness stamp recorded by the last successful import, if any.
    pub fn last_stamp(&self) -> Option<&FreshnessStamp> {
        self.last_outcome.as_ref().and_then(|o| o.stamp.as_ref())
    }
}

/// A (label, value) pair in an ordered multi-value field, e.g.
/// `("mobile", "+1 555 0100")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabeledValue {
    pub label: String,
    pub value: String,
}

impl LabeledValue {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Single-value contact fields tracked by the change-set computation.
///
/// Once any of these carries a value on an existing record it is never
/// overwritten by remote data.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SingleField {
    Prefix,
    Suffix,
    Nickname,
    MiddleName,
    Organization,
    JobTitle,
    Department,
}

/// Ordered multi-value contact fields. Remote entries are purely additive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MultiField {
    Phone,
    Email,
    Url,
    Address,
    InstantMessage,
    SocialProfile,
}

/// A person contact entry parsed from a downloaded card file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersonRecord {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub phones: Vec<LabeledValue>,
    #[serde(default)]
    pub emails: Vec<LabeledValue>,
    #[serde(default)]
    pub urls: Vec<LabeledValue>,
    #[serde(default)]
    pub addresses: Vec<LabeledValue>,
    #[serde(default)]
    pub instant_messages: Vec<LabeledValue>,
    #[serde(default)]
    pub social_profiles: Vec<LabeledValue>,
    #[serde(default)]
    pub image: Option<Vec<u8>>,
}

/// An organization contact entry parsed from a downloaded card file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrganizationRecord {
    pub name: String,
    #[serde(default)]
    pub emails: Vec<LabeledValue>,
}

/// A parsed contact entry, discriminated by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RawRecord {
    Person(PersonRecord),
    Organization(OrganizationRecord),
}

impl RawRecord {
    /// Current value of a single-value field, `None` when the field is absent
    /// or does not apply to this record kind. An absent field is distinct
    /// from an empty string.
    pub fn single_value(&self, field: SingleField) -> Option<&str> {
        match self {
            RawRecord::Person(p) => match field {
                SingleField::Prefix => p.prefix.as_deref(),
                SingleField::Suffix => p.suffix.as_deref(),
                SingleField::Nickname => p.nickname.as_deref(),
                SingleField::MiddleName => p.middle_name.as_deref(),
                SingleField::Organization => p.organization.as_deref(),
                SingleField::JobTitle => p.job_title.as_deref(),
                SingleField::Department => p.department.as_deref(),
            },
            RawRecord::Organization(_) => None,
        }
    }

    /// Entries of a multi-value field, empty when the field does not apply
    /// to this record kind.
    pub fn multi_values(&self, field: MultiField) -> &[LabeledValue] {
        match self {
            RawRecord::Person(p) => match field {
                MultiField::Phone => &p.phones,
                MultiField::Email => &p.emails,
                MultiField::Url => &p.urls,
                MultiField::Address => &p.addresses,
                MultiField::InstantMessage => &p.instant_messages,
                MultiField::SocialProfile => &p.social_profiles,
            },
            RawRecord::Organization(o) => match field {
                MultiField::Email => &o.emails,
                _ => &[],
            },
        }
    }

    /// Contact image bytes, if the record carries one.
    pub fn image(&self) -> Option<&[u8]> {
        match self {
            RawRecord::Person(p) => p.image.as_deref(),
            RawRecord::Organization(_) => None,
        }
    }

    /// Set a single-value field. Returns `false` when the field does not
    /// apply to this record kind.
    pub fn set_single_value(&mut self, field: SingleField, value: impl Into<String>) -> bool {
        let RawRecord::Person(p) = self else {
            return false;
        };
        let slot = match field {
            SingleField::Prefix => &mut p.prefix,
            SingleField::Suffix => &mut p.suffix,
            SingleField::Nickname => &mut p.nickname,
            SingleField::MiddleName => &mut p.middle_name,
            SingleField::Organization => &mut p.organization,
            SingleField::JobTitle => &mut p.job_title,
            SingleField::Department => &mut p.department,
        };
        *slot = Some(value.into());
        true
    }

    /// Append entries to a multi-value field. Returns `false` when the field
    /// does not apply to this record kind.
    pub fn add_multi_values(&mut self, field: MultiField, values: &[LabeledValue]) -> bool {
        let slot = match self {
            RawRecord::Person(p) => match field {
                MultiField::Phone => &mut p.phones,
                MultiField::Email => &mut p.emails,
                MultiField::Url => &mut p.urls,
                MultiField::Address => &mut p.addresses,
                MultiField::InstantMessage => &mut p.instant_messages,
                MultiField::SocialProfile => &mut p.social_profiles,
            },
            RawRecord::Organization(o) => match field {
                MultiField::Email => &mut o.emails,
                _ => return false,
            },
        };
        slot.extend_from_slice(values);
        true
    }

    /// Set the contact image. Returns `false` for organization records.
    pub fn set_image(&mut self, image: Vec<u8>) -> bool {
        match self {
            RawRecord::Person(p) => {
                p.image = Some(image);
                true
            }
            RawRecord::Organization(_) => false,
        }
    }

    /// Human-readable name for log lines and summaries.
    pub fn display_name(&self) -> String {
        match self {
            RawRecord::Person(p) => {
                let full = format!("{} {}", p.first_name, p.last_name);
                let full = full.trim();
                if full.is_empty() {
                    p.nickname.clone().unwrap_or_default()
                } else {
                    full.to_string()
                }
            }
            RawRecord::Organization(o) => o.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org(name: &str) -> RawRecord {
        RawRecord::Organization(OrganizationRecord {
            name: name.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn single_fields_do_not_apply_to_organizations() {
        let mut record = org("Acme");
        assert!(!record.set_single_value(SingleField::JobTitle, "CEO"));
        assert_eq!(record.single_value(SingleField::JobTitle), None);
    }

    #[test]
    fn organizations_accept_only_email_multi_values() {
        let mut record = org("Acme");
        assert!(record.add_multi_values(
            MultiField::Email,
            &[LabeledValue::new("work", "office@acme.test")]
        ));
        assert!(!record.add_multi_values(
            MultiField::Phone,
            &[LabeledValue::new("main", "555-0100")]
        ));
        assert_eq!(record.multi_values(MultiField::Email).len(), 1);
        assert!(record.multi_values(MultiField::Phone).is_empty());
    }

    #[test]
    fn source_id_survives_outcome_replacement() {
        let source = Source::new(
            "team",
            Connection {
                url: "https://cards.example.test/team.vcf".to_string(),
                auth: AuthMethod::None,
                login_url: None,
                username: None,
                password: None,
            },
        );
        let id = source.id().to_string();
        let mut updated = source.clone();
        updated.last_outcome = Some(LastImportOutcome {
            success: true,
            message: "2 added, 0 updated".to_string(),
            finished_at: Utc::now(),
            stamp: None,
        });
        assert_eq!(updated.id(), id);
    }
}
