//! Cluster canonicalization.
//!
//! # Responsibility
//! - Pick the single canonical primary among primaries found to share an
//!   identity.
//! - Demote the others and re-point their secondaries so the hierarchy stays
//!   one level deep.
//!
//! # Invariants
//! - The canonical primary is the most senior record (`created_at`, then
//!   `id`), independent of input order.
//! - A demoted primary is rewritten before any of its secondaries, so no read
//!   observes a secondary linked to a secondary.
//! - Re-running on an already merged cluster changes nothing.

use crate::model::contact::{Contact, ContactId, ContactLink};
use crate::repo::contact_repo::{ContactRepository, RepoResult};
use log::debug;

/// Outcome of sorting a primary set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPlan {
    pub canonical: Contact,
    /// Primaries to demote, most senior first.
    pub demoted: Vec<Contact>,
}

/// Counts of mutations applied by [`canonicalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalOutcome {
    pub primary_id: ContactId,
    pub demoted: usize,
    pub repointed: usize,
}

/// Orders `primaries` by seniority and splits off the canonical head.
///
/// Duplicate ids collapse to one entry. Returns `None` for an empty input.
pub fn plan_canonicalization(mut primaries: Vec<Contact>) -> Option<CanonicalPlan> {
    primaries.sort_by(Contact::seniority_cmp);
    primaries.dedup_by_key(|record| record.id);

    let mut iter = primaries.into_iter();
    let canonical = iter.next()?;
    Some(CanonicalPlan {
        canonical,
        demoted: iter.collect(),
    })
}

/// Merges every cluster headed by `primaries` under the most senior one.
///
/// Returns `None` for an empty input.
pub fn canonicalize<R>(repo: &R, primaries: Vec<Contact>) -> RepoResult<Option<CanonicalOutcome>>
where
    R: ContactRepository + ?Sized,
{
    let Some(plan) = plan_canonicalization(primaries) else {
        return Ok(None);
    };
    apply_plan(repo, &plan).map(Some)
}

/// Writes a plan to the store.
pub fn apply_plan<R>(repo: &R, plan: &CanonicalPlan) -> RepoResult<CanonicalOutcome>
where
    R: ContactRepository + ?Sized,
{
    let primary_id = plan.canonical.id;
    let link = ContactLink::secondary_of(primary_id);
    let mut repointed = 0;

    for demoted in &plan.demoted {
        repo.update_link(demoted.id, link)?;
        for secondary in repo.list_secondaries(demoted.id)? {
            repo.update_link(secondary.id, link)?;
            repointed += 1;
        }
        debug!(
            "event=cluster_demote module=identity status=ok primary_id={} demoted_id={}",
            primary_id, demoted.id
        );
    }

    Ok(CanonicalOutcome {
        primary_id,
        demoted: plan.demoted.len(),
        repointed,
    })
}
