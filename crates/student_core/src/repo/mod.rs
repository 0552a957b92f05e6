//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the data access contract for student records.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `Student::validate()` before persistence.
//! - Storage-level UNIQUE failures surface as `ConstraintViolation`, never as
//!   opaque storage errors.

pub mod student_repo;
