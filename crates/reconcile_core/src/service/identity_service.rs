//! Identity resolution use-case service.
//!
//! # Responsibility
//! - Resolve a contact fragment into its consolidated identity.
//! - Merge clusters joined by the fragment and record novel information.
//!
//! # Invariants
//! - Invalid fragments are rejected before any store access.
//! - Every cluster keeps exactly one primary, the most senior record.
//! - Secondaries always link directly to a primary.
//! - Resolving the same fragment twice creates nothing the second time.
//!
//! # Concurrency
//! `resolve_in_transaction` runs the whole read-merge-write sequence inside a
//! SQLite `IMMEDIATE` transaction, which takes the write lock up front. Two
//! writers therefore never both observe "no match" for the same fragment.

use crate::identity::canonicalize::canonicalize;
use crate::identity::format::{format_identity, ConsolidatedIdentity};
use crate::identity::novelty::detect_novelty;
use crate::model::contact::{Cluster, Contact, ContactId, ContactLink, NewContact};
use crate::model::fragment::{ContactFragment, FragmentError};
use crate::repo::contact_repo::{ContactRepository, RepoError, SqliteContactRepository};
use log::{error, info, warn};
use rusqlite::{Connection, TransactionBehavior};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Upper bound on `linked_id` hops when locating a secondary's primary.
const MAX_LINK_HOPS: usize = 8;

/// Errors surfaced by identity resolution.
#[derive(Debug)]
pub enum IdentityError {
    /// Caller error: fragment missing both fields or malformed.
    InvalidFragment(FragmentError),
    /// Persistence failure, lock timeout or corrupted link data.
    StoreUnavailable(RepoError),
}

impl IdentityError {
    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFragment(_) => "invalid_fragment",
            Self::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

impl Display for IdentityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFragment(err) => write!(f, "{err}"),
            Self::StoreUnavailable(err) => write!(f, "contact store unavailable: {err}"),
        }
    }
}

impl Error for IdentityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidFragment(err) => Some(err),
            Self::StoreUnavailable(err) => Some(err),
        }
    }
}

impl From<FragmentError> for IdentityError {
    fn from(value: FragmentError) -> Self {
        Self::InvalidFragment(value)
    }
}

impl From<RepoError> for IdentityError {
    fn from(value: RepoError) -> Self {
        Self::StoreUnavailable(value)
    }
}

impl From<rusqlite::Error> for IdentityError {
    fn from(value: rusqlite::Error) -> Self {
        Self::StoreUnavailable(value.into())
    }
}

/// How a resolution ended; reported in log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    NewPrimary,
    Existing,
    Extended,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::NewPrimary => "new_primary",
            Self::Existing => "existing",
            Self::Extended => "extended",
        }
    }
}

/// Identity resolution engine over a contact record store.
pub struct IdentityService<R: ContactRepository> {
    repo: R,
}

impl<R: ContactRepository> IdentityService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Validates raw input and resolves it.
    ///
    /// Validation failures return before the repository is touched.
    pub fn identify(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> Result<ConsolidatedIdentity, IdentityError> {
        let fragment = ContactFragment::new(email, phone_number)?;
        self.resolve(&fragment)
    }

    /// Resolves a validated fragment into its consolidated identity.
    ///
    /// # Contract
    /// - No match: a new primary is created from the fragment.
    /// - Matches: every cluster touched by a match is merged under the most
    ///   senior primary, then a secondary holding only the new field(s) is
    ///   added when the fragment carries unseen information.
    pub fn resolve(
        &self,
        fragment: &ContactFragment,
    ) -> Result<ConsolidatedIdentity, IdentityError> {
        let started_at = Instant::now();
        let matches = self
            .repo
            .find_by_email_or_phone(fragment.email(), fragment.phone_number())?;

        if matches.is_empty() {
            let created = self.repo.create_contact(&NewContact::primary(
                fragment.email().map(str::to_string),
                fragment.phone_number().map(str::to_string),
            ))?;
            let primary_id = created.id;
            let cluster = Cluster::new(created, Vec::new()).ok_or_else(|| {
                RepoError::InvalidData(format!("created contact {primary_id} is not a primary"))
            })?;
            log_resolved(Outcome::NewPrimary, primary_id, 0, 0, started_at);
            return Ok(format_identity(&cluster));
        }

        let primaries = self.implicated_primaries(&matches)?;
        let merged = primaries.len().saturating_sub(1);
        let primary_id = match primaries.as_slice() {
            [only] => only.id,
            _ => {
                let outcome = canonicalize(&self.repo, primaries)?.ok_or_else(|| {
                    RepoError::InvalidData("matched contacts resolve to no primary".to_string())
                })?;
                info!(
                    "event=cluster_merge module=identity status=ok primary_id={} demoted={} repointed={}",
                    outcome.primary_id, outcome.demoted, outcome.repointed
                );
                outcome.primary_id
            }
        };

        let mut cluster = self.load_cluster(primary_id)?;
        let mut outcome = Outcome::Existing;
        if let Some(novelty) = detect_novelty(&cluster, fragment) {
            let created = self
                .repo
                .create_contact(&novelty.secondary_for(primary_id, fragment))?;
            info!(
                "event=secondary_create module=identity status=ok primary_id={} contact_id={} email_new={} phone_new={}",
                primary_id, created.id, novelty.email_is_new, novelty.phone_is_new
            );
            cluster = self.load_cluster(primary_id)?;
            outcome = Outcome::Extended;
        }

        log_resolved(outcome, primary_id, matches.len(), merged, started_at);
        Ok(format_identity(&cluster))
    }

    /// Returns the identity containing `contact_id`, without mutating anything.
    pub fn identity_of(
        &self,
        contact_id: ContactId,
    ) -> Result<Option<ConsolidatedIdentity>, IdentityError> {
        let Some(contact) = self.repo.get_contact(contact_id)? else {
            return Ok(None);
        };
        let primary_id = match contact.linked_id {
            None => contact.id,
            Some(_) => self.follow_to_primary(&contact)?.0.id,
        };
        Ok(Some(format_identity(&self.load_cluster(primary_id)?)))
    }

    /// Matched primaries plus the primary behind every matched secondary,
    /// without duplicates.
    fn implicated_primaries(&self, matches: &[Contact]) -> Result<Vec<Contact>, IdentityError> {
        let mut primaries: Vec<Contact> = matches
            .iter()
            .filter(|record| record.is_primary())
            .cloned()
            .collect();
        let mut seen: HashSet<ContactId> = primaries.iter().map(|record| record.id).collect();

        for secondary in matches.iter().filter(|record| !record.is_primary()) {
            if secondary.linked_id.is_some_and(|linked| seen.contains(&linked)) {
                continue;
            }
            let (primary, hops) = self.follow_to_primary(secondary)?;
            if hops > 1 {
                warn!(
                    "event=link_chain_flatten module=identity status=ok contact_id={} primary_id={} hops={}",
                    secondary.id, primary.id, hops
                );
                self.repo
                    .update_link(secondary.id, ContactLink::secondary_of(primary.id))?;
            }
            if seen.insert(primary.id) {
                primaries.push(primary);
            }
        }

        Ok(primaries)
    }

    /// Walks `linked_id` until a primary is reached; returns it with the hop
    /// count.
    fn follow_to_primary(&self, record: &Contact) -> Result<(Contact, usize), IdentityError> {
        let mut current_id = record.id;
        let mut next = record.linked_id;
        for hop in 1..=MAX_LINK_HOPS {
            let Some(linked_id) = next else {
                break;
            };
            let linked = self.repo.get_contact(linked_id)?.ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "contact {current_id} links to missing contact {linked_id}"
                ))
            })?;
            if linked.is_primary() {
                return Ok((linked, hop));
            }
            current_id = linked.id;
            next = linked.linked_id;
        }

        Err(RepoError::InvalidData(format!(
            "contact {} has no reachable primary within {MAX_LINK_HOPS} links",
            record.id
        ))
        .into())
    }

    fn load_cluster(&self, primary_id: ContactId) -> Result<Cluster, IdentityError> {
        self.repo.load_cluster(primary_id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("primary contact {primary_id} is missing")).into()
        })
    }
}

/// Validates input, then resolves it atomically against `conn`.
///
/// # Errors
/// - `InvalidFragment` before the transaction is opened.
/// - `StoreUnavailable` for SQLite failures, including busy timeouts; the
///   transaction is rolled back so a retry converges to the same state.
pub fn resolve_in_transaction(
    conn: &mut Connection,
    email: Option<&str>,
    phone_number: Option<&str>,
) -> Result<ConsolidatedIdentity, IdentityError> {
    let fragment = match ContactFragment::new(email, phone_number) {
        Ok(fragment) => fragment,
        Err(err) => {
            info!(
                "event=identity_resolve module=identity status=rejected error_code=invalid_fragment reason={}",
                err
            );
            return Err(err.into());
        }
    };

    let result = run_in_transaction(conn, &fragment);
    if let Err(err) = &result {
        error!(
            "event=identity_resolve module=identity status=error error_code={} error={}",
            err.code(),
            err
        );
    }
    result
}

fn run_in_transaction(
    conn: &mut Connection,
    fragment: &ContactFragment,
) -> Result<ConsolidatedIdentity, IdentityError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let identity = {
        let repo = SqliteContactRepository::try_new(&tx)?;
        IdentityService::new(repo).resolve(fragment)?
    };
    tx.commit()?;
    Ok(identity)
}

fn log_resolved(
    outcome: Outcome,
    primary_id: ContactId,
    matched: usize,
    merged: usize,
    started_at: Instant,
) {
    info!(
        "event=identity_resolve module=identity status=ok outcome={} primary_id={} matched={} merged={} duration_ms={}",
        outcome.as_str(),
        primary_id,
        matched,
        merged,
        started_at.elapsed().as_millis()
    );
}
