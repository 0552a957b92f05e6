//! Domain model for student records.
//!
//! # Responsibility
//! - Define the canonical student record shared by store and callers.
//! - Own field-level validation rules.
//!
//! # Invariants
//! - Stored records are identified by a store-assigned `RecordId`.
//! - Deletion is a hard delete; there is no tombstone state.

pub mod student;
