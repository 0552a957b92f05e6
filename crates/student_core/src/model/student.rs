//! Student domain model.
//!
//! # Responsibility
//! - Define the record persisted in the `students` table.
//! - Validate required fields before any write reaches storage.
//!
//! # Invariants
//! - `id` is `None` until the store assigns one on insert.
//! - `student_id`, `name`, `email`, `phone` and `course` are never blank.
//! - `gpa` is finite; `0.0` means "not specified".
//! - An empty `enrollment_date` means "not specified".

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned surrogate key of a persisted student row.
pub type RecordId = i64;

/// Validation failure for student field invariants.
#[derive(Debug, Clone, PartialEq)]
pub enum StudentValidationError {
    /// A required text field is empty or whitespace only.
    EmptyField(&'static str),
    /// GPA is NaN or infinite.
    InvalidGpa(f64),
}

impl Display for StudentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "{field} must not be empty"),
            Self::InvalidGpa(value) => {
                write!(f, "gpa ({value}) must be a finite number")
            }
        }
    }
}

impl Error for StudentValidationError {}

/// Canonical student record.
///
/// All mutable fields are replaced wholesale on update; there is no partial
/// update shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StudentWire")]
pub struct Student {
    /// Store-assigned key. `None` for records not yet inserted.
    pub id: Option<RecordId>,
    /// Institution-issued identifier, unique across the store.
    pub student_id: String,
    pub name: String,
    /// Free-form contact address; format is not checked.
    pub email: String,
    pub phone: String,
    pub course: String,
    /// Free-form date text. Empty when not specified.
    pub enrollment_date: String,
    /// Grade point average. `0.0` when not specified.
    pub gpa: f64,
}

#[derive(Deserialize)]
struct StudentWire {
    #[serde(default)]
    id: Option<RecordId>,
    student_id: String,
    name: String,
    email: String,
    phone: String,
    course: String,
    #[serde(default)]
    enrollment_date: String,
    #[serde(default)]
    gpa: f64,
}

impl TryFrom<StudentWire> for Student {
    type Error = StudentValidationError;

    fn try_from(value: StudentWire) -> Result<Self, Self::Error> {
        let student = Self {
            id: value.id,
            student_id: value.student_id,
            name: value.name,
            email: value.email,
            phone: value.phone,
            course: value.course,
            enrollment_date: value.enrollment_date,
            gpa: value.gpa,
        };
        student.validate()?;
        Ok(student)
    }
}

impl Student {
    /// Creates an unsaved record with the required fields set.
    ///
    /// Optional fields start as "not specified". Validation is deferred to
    /// [`Student::validate`] so forms can build records incrementally.
    pub fn new(
        student_id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        course: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            student_id: student_id.into(),
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            course: course.into(),
            enrollment_date: String::new(),
            gpa: 0.0,
        }
    }

    pub fn with_enrollment_date(mut self, enrollment_date: impl Into<String>) -> Self {
        self.enrollment_date = enrollment_date.into();
        self
    }

    pub fn with_gpa(mut self, gpa: f64) -> Self {
        self.gpa = gpa;
        self
    }

    /// Checks field invariants.
    ///
    /// # Errors
    /// - `EmptyField` for the first blank required field, in column order.
    /// - `InvalidGpa` when `gpa` is NaN or infinite.
    pub fn validate(&self) -> Result<(), StudentValidationError> {
        let required = [
            ("student_id", &self.student_id),
            ("name", &self.name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("course", &self.course),
        ];
        if let Some(&(field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(StudentValidationError::EmptyField(field));
        }

        if !self.gpa.is_finite() {
            return Err(StudentValidationError::InvalidGpa(self.gpa));
        }

        Ok(())
    }

    /// Returns whether all field invariants hold.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Returns whether the record has been persisted.
    pub fn is_stored(&self) -> bool {
        self.id.is_some()
    }

    pub fn has_enrollment_date(&self) -> bool {
        !self.enrollment_date.is_empty()
    }

    /// GPA rendered with two decimals, e.g. `3.50`.
    pub fn formatted_gpa(&self) -> String {
        format!("{:.2}", self.gpa)
    }
}
