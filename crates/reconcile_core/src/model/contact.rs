//! Contact domain model.
//!
//! # Responsibility
//! - Define the single persisted record shape used by identity resolution.
//! - Provide record-local validation for link and contact-field rules.
//!
//! # Invariants
//! - `id` is store-assigned, monotonic and never reused.
//! - At least one of `email` / `phone_number` is set.
//! - `linked_id` is set iff `link_precedence == Secondary`.
//! - `created_at` is immutable and, with `id` as tie-breaker, totally orders
//!   records for precedence decisions.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned identifier of a contact record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(pub i64);

impl ContactId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl Display for ContactId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of a record inside its cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkPrecedence {
    /// Canonical head of a cluster.
    Primary,
    /// Record attached to a primary through `linked_id`.
    Secondary,
}

impl LinkPrecedence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "primary" => Some(Self::Primary),
            "secondary" => Some(Self::Secondary),
            _ => None,
        }
    }
}

/// Record-local validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactValidationError {
    /// Neither email nor phone number is set.
    MissingContactFields,
    /// Secondary record without a `linked_id`.
    SecondaryWithoutLink,
    /// Primary record carrying a `linked_id`.
    PrimaryWithLink(ContactId),
    /// Record linked to itself.
    SelfLink(ContactId),
}

impl Display for ContactValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingContactFields => {
                write!(f, "contact requires at least one of email or phone number")
            }
            Self::SecondaryWithoutLink => write!(f, "secondary contact requires linked_id"),
            Self::PrimaryWithLink(linked_id) => {
                write!(f, "primary contact must not link to {linked_id}")
            }
            Self::SelfLink(id) => write!(f, "contact {id} cannot link to itself"),
        }
    }
}

impl Error for ContactValidationError {}

/// Persisted contact record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    /// Set only for secondaries; always points at a primary.
    pub linked_id: Option<ContactId>,
    pub link_precedence: LinkPrecedence,
    /// Epoch milliseconds, assigned by the store clock.
    pub created_at: i64,
    /// Epoch milliseconds, refreshed on every mutation.
    pub updated_at: i64,
    /// Soft-delete marker. Deleted records never take part in resolution.
    pub deleted_at: Option<i64>,
}

impl Contact {
    /// Checks record-local invariants.
    ///
    /// Cross-record rules (the link target being a primary) are enforced by
    /// the resolution engine, not here.
    pub fn validate(&self) -> Result<(), ContactValidationError> {
        if self.email.is_none() && self.phone_number.is_none() {
            return Err(ContactValidationError::MissingContactFields);
        }

        match (self.link_precedence, self.linked_id) {
            (LinkPrecedence::Secondary, None) => Err(ContactValidationError::SecondaryWithoutLink),
            (LinkPrecedence::Primary, Some(linked_id)) => {
                Err(ContactValidationError::PrimaryWithLink(linked_id))
            }
            (_, Some(linked_id)) if linked_id == self.id => {
                Err(ContactValidationError::SelfLink(self.id))
            }
            _ => Ok(()),
        }
    }

    pub fn is_primary(&self) -> bool {
        self.link_precedence == LinkPrecedence::Primary
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Precedence order: older first, then lower id.
    pub fn seniority_cmp(&self, other: &Self) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Field set for inserting a new record. The store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub linked_id: Option<ContactId>,
    pub link_precedence: LinkPrecedence,
}

impl NewContact {
    /// New cluster head.
    pub fn primary(email: Option<String>, phone_number: Option<String>) -> Self {
        Self {
            email,
            phone_number,
            linked_id: None,
            link_precedence: LinkPrecedence::Primary,
        }
    }

    /// Record attached to an existing primary.
    pub fn secondary(
        primary_id: ContactId,
        email: Option<String>,
        phone_number: Option<String>,
    ) -> Self {
        Self {
            email,
            phone_number,
            linked_id: Some(primary_id),
            link_precedence: LinkPrecedence::Secondary,
        }
    }

    pub fn validate(&self) -> Result<(), ContactValidationError> {
        if self.email.is_none() && self.phone_number.is_none() {
            return Err(ContactValidationError::MissingContactFields);
        }
        match (self.link_precedence, self.linked_id) {
            (LinkPrecedence::Secondary, None) => Err(ContactValidationError::SecondaryWithoutLink),
            (LinkPrecedence::Primary, Some(linked_id)) => {
                Err(ContactValidationError::PrimaryWithLink(linked_id))
            }
            _ => Ok(()),
        }
    }
}

/// Link mutation applied during canonicalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactLink {
    pub link_precedence: LinkPrecedence,
    pub linked_id: Option<ContactId>,
}

impl ContactLink {
    /// Demotes/re-points a record under `primary_id`.
    pub fn secondary_of(primary_id: ContactId) -> Self {
        Self {
            link_precedence: LinkPrecedence::Secondary,
            linked_id: Some(primary_id),
        }
    }
}

/// One primary and every active record linked to it.
///
/// Construction guarantees a primary head, so the formatter never sees an
/// empty or headless cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    primary: Contact,
    secondaries: Vec<Contact>,
}

impl Cluster {
    /// Builds a cluster and orders secondaries by seniority.
    ///
    /// Returns `None` when `primary` is not a primary record.
    pub fn new(primary: Contact, mut secondaries: Vec<Contact>) -> Option<Self> {
        if !primary.is_primary() {
            return None;
        }
        secondaries.sort_by(Contact::seniority_cmp);
        Some(Self {
            primary,
            secondaries,
        })
    }

    pub fn primary(&self) -> &Contact {
        &self.primary
    }

    pub fn secondaries(&self) -> &[Contact] {
        &self.secondaries
    }

    /// Primary first, then secondaries oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &Contact> {
        std::iter::once(&self.primary).chain(self.secondaries.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(id: i64, created_at: i64, precedence: LinkPrecedence) -> Contact {
        Contact {
            id: ContactId(id),
            email: Some(format!("user{id}@example.com")),
            phone_number: None,
            linked_id: match precedence {
                LinkPrecedence::Primary => None,
                LinkPrecedence::Secondary => Some(ContactId(1)),
            },
            link_precedence: precedence,
            created_at,
            updated_at: created_at,
            deleted_at: None,
        }
    }

    #[test]
    fn validate_rejects_record_without_contact_fields() {
        let mut record = contact(1, 10, LinkPrecedence::Primary);
        record.email = None;
        assert_eq!(
            record.validate(),
            Err(ContactValidationError::MissingContactFields)
        );
    }

    #[test]
    fn validate_enforces_link_shape() {
        let mut secondary = contact(2, 10, LinkPrecedence::Secondary);
        secondary.linked_id = None;
        assert_eq!(
            secondary.validate(),
            Err(ContactValidationError::SecondaryWithoutLink)
        );

        let mut primary = contact(3, 10, LinkPrecedence::Primary);
        primary.linked_id = Some(ContactId(1));
        assert_eq!(
            primary.validate(),
            Err(ContactValidationError::PrimaryWithLink(ContactId(1)))
        );

        let mut self_linked = contact(1, 10, LinkPrecedence::Secondary);
        self_linked.linked_id = Some(ContactId(1));
        assert_eq!(
            self_linked.validate(),
            Err(ContactValidationError::SelfLink(ContactId(1)))
        );
    }

    #[test]
    fn seniority_breaks_timestamp_ties_by_id() {
        let older = contact(5, 100, LinkPrecedence::Primary);
        let tie_low_id = contact(2, 200, LinkPrecedence::Primary);
        let tie_high_id = contact(9, 200, LinkPrecedence::Primary);

        assert_eq!(older.seniority_cmp(&tie_low_id), Ordering::Less);
        assert_eq!(tie_low_id.seniority_cmp(&tie_high_id), Ordering::Less);
    }

    #[test]
    fn cluster_requires_primary_head_and_sorts_secondaries() {
        let secondary = contact(2, 10, LinkPrecedence::Secondary);
        assert!(Cluster::new(secondary.clone(), Vec::new()).is_none());

        let newer = contact(4, 30, LinkPrecedence::Secondary);
        let cluster = Cluster::new(
            contact(1, 5, LinkPrecedence::Primary),
            vec![newer, secondary],
        )
        .expect("primary head");
        let ids: Vec<_> = cluster.iter().map(|record| record.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 4]);
        assert_eq!(cluster.secondaries().len(), 2);
    }
}
