//! Novelty detection for incoming fragments.
//!
//! # Invariants
//! - A fragment whose values all already appear in the cluster is never new.
//! - A secondary created from novelty carries only the new field(s).

use crate::model::contact::{Cluster, ContactId, NewContact};
use crate::model::fragment::ContactFragment;

/// Which fragment fields are absent from every record of a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Novelty {
    pub email_is_new: bool,
    pub phone_is_new: bool,
}

impl Novelty {
    /// Record capturing only the new information, linked to `primary_id`.
    pub fn secondary_for(self, primary_id: ContactId, fragment: &ContactFragment) -> NewContact {
        let email = fragment
            .email()
            .filter(|_| self.email_is_new)
            .map(str::to_string);
        let phone_number = fragment
            .phone_number()
            .filter(|_| self.phone_is_new)
            .map(str::to_string);
        NewContact::secondary(primary_id, email, phone_number)
    }
}

/// Returns `None` when the fragment adds nothing to `cluster`.
pub fn detect_novelty(cluster: &Cluster, fragment: &ContactFragment) -> Option<Novelty> {
    let email_is_new = fragment.email().is_some_and(|email| {
        !cluster
            .iter()
            .any(|record| record.email.as_deref() == Some(email))
    });
    let phone_is_new = fragment.phone_number().is_some_and(|phone| {
        !cluster
            .iter()
            .any(|record| record.phone_number.as_deref() == Some(phone))
    });

    if email_is_new || phone_is_new {
        Some(Novelty {
            email_is_new,
            phone_is_new,
        })
    } else {
        None
    }
}
