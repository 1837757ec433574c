//! Identity resolution building blocks.
//!
//! # Responsibility
//! - Merge clusters that turned out to be one identity (`canonicalize`).
//! - Decide whether a fragment adds information to a cluster (`novelty`).
//! - Render a cluster into the consolidated output view (`format`).
//!
//! Orchestration of these steps lives in `service::identity_service`.

pub mod canonicalize;
pub mod format;
pub mod novelty;
