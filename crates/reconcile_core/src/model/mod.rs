//! Contact domain model.
//!
//! # Responsibility
//! - Define the persisted contact record and its cluster grouping.
//! - Define the validated input fragment consumed by resolution.
//!
//! # Invariants
//! - Every record is identified by a store-assigned `ContactId`.
//! - Deletion is represented by the `deleted_at` soft-delete marker only.

pub mod contact;
pub mod fragment;
