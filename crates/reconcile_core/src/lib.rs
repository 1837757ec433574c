//! Core domain logic for contact identity reconciliation.
//! This crate is the single source of truth for cluster invariants.

pub mod db;
pub mod identity;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{DbError, DbOptions};
pub use identity::canonicalize::{canonicalize, plan_canonicalization, CanonicalPlan};
pub use identity::format::{format_identity, ConsolidatedIdentity};
pub use identity::novelty::{detect_novelty, Novelty};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::contact::{
    Cluster, Contact, ContactId, ContactLink, ContactValidationError, LinkPrecedence, NewContact,
};
pub use model::fragment::{ContactFragment, FragmentError};
pub use repo::contact_repo::{ContactRepository, RepoError, RepoResult, SqliteContactRepository};
pub use service::identity_service::{resolve_in_transaction, IdentityError, IdentityService};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
