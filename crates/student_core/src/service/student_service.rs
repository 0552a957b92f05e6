//! Student use-case service.
//!
//! # Responsibility
//! - Provide the caller-facing record store contract.
//! - Run the optimistic `student_id` pre-check ahead of writes.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - The UNIQUE constraint stays the source of truth; the pre-check only
//!   produces the same `ConstraintViolation` earlier.

use crate::model::student::{RecordId, Student};
use crate::repo::student_repo::{RepoError, RepoResult, StudentRepository};
use log::info;

/// Use-case service wrapper for student record operations.
pub struct StudentService<R: StudentRepository> {
    repo: R,
}

impl<R: StudentRepository> StudentService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Inserts a record without a pre-check and returns its new id.
    pub fn insert_student(&self, student: &Student) -> RepoResult<RecordId> {
        self.repo.insert_student(student)
    }

    /// Checks `student_id` availability, then inserts.
    ///
    /// # Contract
    /// - Returns `ConstraintViolation` without writing when the id is taken.
    /// - Returns the stored record with its assigned `id`.
    pub fn register_student(&self, student: &Student) -> RepoResult<Student> {
        student.validate()?;
        if self.repo.is_student_id_taken(&student.student_id, None)? {
            info!("event=student_register module=service status=rejected reason=student_id_taken");
            return Err(RepoError::ConstraintViolation {
                student_id: student.student_id.clone(),
            });
        }

        let id = self.repo.insert_student(student)?;
        let mut stored = student.clone();
        stored.id = Some(id);
        Ok(stored)
    }

    /// Gets one record by id.
    ///
    /// # Errors
    /// - `NotFound` when no record has this id.
    pub fn get_student(&self, id: RecordId) -> RepoResult<Student> {
        self.repo.get_student(id)?.ok_or(RepoError::NotFound(id))
    }

    /// Lists every record ordered by name.
    pub fn list_students(&self) -> RepoResult<Vec<Student>> {
        self.repo.list_students()
    }

    /// Substring search on name, student id and course.
    pub fn search_students(&self, query: &str) -> RepoResult<Vec<Student>> {
        self.repo.search_students(query)
    }

    /// Search-as-you-type entry point: a blank query lists everything.
    pub fn find_students(&self, query: &str) -> RepoResult<Vec<Student>> {
        let query = query.trim();
        if query.is_empty() {
            return self.repo.list_students();
        }
        self.repo.search_students(query)
    }

    /// Replaces all mutable fields and returns rows affected (0 or 1).
    pub fn update_student(&self, student: &Student) -> RepoResult<usize> {
        self.repo.update_student(student)
    }

    /// Checks `student_id` availability against other records, then updates.
    ///
    /// # Contract
    /// - Keeping the record's own `student_id` is always allowed.
    /// - Returns `NotFound` when the record no longer exists.
    pub fn save_student(&self, student: &Student) -> RepoResult<()> {
        let id = student.id.ok_or(RepoError::MissingRecordId)?;
        student.validate()?;
        if self.repo.is_student_id_taken(&student.student_id, Some(id))? {
            info!("event=student_save module=service status=rejected reason=student_id_taken id={id}");
            return Err(RepoError::ConstraintViolation {
                student_id: student.student_id.clone(),
            });
        }

        if self.repo.update_student(student)? == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    /// Deletes by id and returns rows affected; unknown ids are a no-op.
    pub fn delete_student(&self, id: RecordId) -> RepoResult<usize> {
        self.repo.delete_student(id)
    }

    pub fn count_students(&self) -> RepoResult<u64> {
        self.repo.count_students()
    }

    pub fn is_student_id_taken(
        &self,
        student_id: &str,
        exclude: Option<RecordId>,
    ) -> RepoResult<bool> {
        self.repo.is_student_id_taken(student_id, exclude)
    }
}
