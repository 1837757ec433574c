//! Response formatting for resolved clusters.
//!
//! Pure and deterministic: same cluster in, same view out.

use crate::model::contact::{Cluster, ContactId};
use serde::{Deserialize, Serialize};

/// Consolidated view of one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedIdentity {
    pub primary_contact_id: ContactId,
    /// First-seen order, primary's email first when present.
    pub emails: Vec<String>,
    /// First-seen order, primary's phone first when present.
    pub phone_numbers: Vec<String>,
    /// Every non-primary record, oldest first.
    pub secondary_contact_ids: Vec<ContactId>,
}

/// Builds the deduplicated view of `cluster`.
pub fn format_identity(cluster: &Cluster) -> ConsolidatedIdentity {
    let mut emails: Vec<String> = Vec::new();
    let mut phone_numbers: Vec<String> = Vec::new();

    for record in cluster.iter() {
        push_unique(&mut emails, record.email.as_deref());
        push_unique(&mut phone_numbers, record.phone_number.as_deref());
    }

    ConsolidatedIdentity {
        primary_contact_id: cluster.primary().id,
        emails,
        phone_numbers,
        secondary_contact_ids: cluster.secondaries().iter().map(|record| record.id).collect(),
    }
}

// Clusters are small; a linear scan keeps first-seen order without extra state.
fn push_unique(values: &mut Vec<String>, candidate: Option<&str>) {
    if let Some(value) = candidate {
        if !values.iter().any(|existing| existing == value) {
            values.push(value.to_string());
        }
    }
}
