//! Student repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD, search, count and uniqueness queries over `students`.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Listing and search order is `name ASC, id ASC`.
//! - Update and delete report rows affected; a missing row is not an error.
//! - Reads return every stored row; only undecodable columns are errors.
//! - `student_id` uniqueness is enforced by the table, not by this module.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::student::{RecordId, Student, StudentValidationError};
use log::{debug, warn};
use rusqlite::types::FromSql;
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const STUDENTS_TABLE: &str = "students";
const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "student_id",
    "name",
    "email",
    "phone",
    "course",
    "enrollment_date",
    "gpa",
];

const STUDENT_SELECT_SQL: &str = "SELECT
    id,
    student_id,
    name,
    email,
    phone,
    course,
    enrollment_date,
    gpa
FROM students";

const LIKE_ESCAPE: char = '\\';

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for student persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(StudentValidationError),
    /// The persistence layer failed to open, read or write.
    StorageUnavailable(DbError),
    NotFound(RecordId),
    /// Another stored record already owns this `student_id`.
    ConstraintViolation {
        student_id: String,
    },
    /// Update was called with a record that was never stored.
    MissingRecordId,
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::StorageUnavailable(err) => write!(f, "storage unavailable: {err}"),
            Self::NotFound(id) => write!(f, "student not found: {id}"),
            Self::ConstraintViolation { student_id } => {
                write!(f, "student_id `{student_id}` is already taken")
            }
            Self::MissingRecordId => write!(f, "record has no id; insert it first"),
            Self::InvalidData(message) => write!(f, "invalid persisted student data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::StorageUnavailable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StudentValidationError> for RepoError {
    fn from(value: StudentValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::StorageUnavailable(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::StorageUnavailable(DbError::Sqlite(value))
    }
}

/// Repository interface for student record operations.
pub trait StudentRepository {
    /// Persists a new record and returns its store-assigned id.
    ///
    /// Any `id` already set on `student` is ignored.
    fn insert_student(&self, student: &Student) -> RepoResult<RecordId>;
    fn get_student(&self, id: RecordId) -> RepoResult<Option<Student>>;
    /// Returns every record ordered by name.
    fn list_students(&self) -> RepoResult<Vec<Student>>;
    /// Substring match on `name`, `student_id` or `course`.
    fn search_students(&self, query: &str) -> RepoResult<Vec<Student>>;
    /// Replaces all mutable fields of the row with `student.id`.
    fn update_student(&self, student: &Student) -> RepoResult<usize>;
    fn delete_student(&self, id: RecordId) -> RepoResult<usize>;
    fn count_students(&self) -> RepoResult<u64>;
    /// Returns whether a record other than `exclude` owns `student_id`.
    fn is_student_id_taken(&self, student_id: &str, exclude: Option<RecordId>)
        -> RepoResult<bool>;
}

/// SQLite-backed student repository.
pub struct SqliteStudentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStudentRepository<'conn> {
    /// Wraps a connection after checking it carries the expected schema.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` for a damaged schema.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    /// Wraps a connection whose schema the caller has already checked.
    pub(crate) fn from_verified(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl StudentRepository for SqliteStudentRepository<'_> {
    fn insert_student(&self, student: &Student) -> RepoResult<RecordId> {
        student.validate()?;

        self.conn
            .execute(
                "INSERT INTO students (
                    student_id,
                    name,
                    email,
                    phone,
                    course,
                    enrollment_date,
                    gpa
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    student.student_id.as_str(),
                    student.name.as_str(),
                    student.email.as_str(),
                    student.phone.as_str(),
                    student.course.as_str(),
                    enrollment_date_to_db(student),
                    student.gpa,
                ],
            )
            .map_err(|err| map_write_error(err, &student.student_id))?;

        let id = self.conn.last_insert_rowid();
        debug!("event=student_insert module=repo status=ok id={id}");
        Ok(id)
    }

    fn get_student(&self, id: RecordId) -> RepoResult<Option<Student>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STUDENT_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_student_row(row)?));
        }

        Ok(None)
    }

    fn list_students(&self) -> RepoResult<Vec<Student>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STUDENT_SELECT_SQL} ORDER BY name ASC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut students = Vec::new();

        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }

        debug!(
            "event=student_list module=repo status=ok count={}",
            students.len()
        );
        Ok(students)
    }

    fn search_students(&self, query: &str) -> RepoResult<Vec<Student>> {
        let mut stmt = self.conn.prepare(&format!(
            "{STUDENT_SELECT_SQL}
             WHERE name LIKE ?1 ESCAPE '{LIKE_ESCAPE}'
                OR student_id LIKE ?1 ESCAPE '{LIKE_ESCAPE}'
                OR course LIKE ?1 ESCAPE '{LIKE_ESCAPE}'
             ORDER BY name ASC, id ASC;"
        ))?;

        let mut rows = stmt.query([contains_pattern(query)])?;
        let mut students = Vec::new();

        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }

        debug!(
            "event=student_search module=repo status=ok query_len={} count={}",
            query.chars().count(),
            students.len()
        );
        Ok(students)
    }

    fn update_student(&self, student: &Student) -> RepoResult<usize> {
        let id = student.id.ok_or(RepoError::MissingRecordId)?;
        student.validate()?;

        let changed = self
            .conn
            .execute(
                "UPDATE students
                 SET
                    student_id = ?1,
                    name = ?2,
                    email = ?3,
                    phone = ?4,
                    course = ?5,
                    enrollment_date = ?6,
                    gpa = ?7
                 WHERE id = ?8;",
                params![
                    student.student_id.as_str(),
                    student.name.as_str(),
                    student.email.as_str(),
                    student.phone.as_str(),
                    student.course.as_str(),
                    enrollment_date_to_db(student),
                    student.gpa,
                    id,
                ],
            )
            .map_err(|err| map_write_error(err, &student.student_id))?;

        debug!("event=student_update module=repo status=ok id={id} rows={changed}");
        Ok(changed)
    }

    fn delete_student(&self, id: RecordId) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM students WHERE id = ?1;", [id])?;

        debug!("event=student_delete module=repo status=ok id={id} rows={changed}");
        Ok(changed)
    }

    fn count_students(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM students;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }

    fn is_student_id_taken(
        &self,
        student_id: &str,
        exclude: Option<RecordId>,
    ) -> RepoResult<bool> {
        let taken: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM students
                WHERE student_id = ?1
                  AND (?2 IS NULL OR id != ?2)
            );",
            params![student_id, exclude],
            |row| row.get(0),
        )?;
        Ok(taken == 1)
    }
}

fn ensure_schema_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let columns = stmt
        .query_map([STUDENTS_TABLE], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    if columns.is_empty() {
        return Err(RepoError::MissingRequiredTable(STUDENTS_TABLE));
    }

    for &column in REQUIRED_COLUMNS {
        if !columns.iter().any(|existing| existing == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: STUDENTS_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn parse_student_row(row: &Row<'_>) -> RepoResult<Student> {
    let id: RecordId = column(row, "id")?;
    let student = Student {
        id: Some(id),
        student_id: column(row, "student_id")?,
        name: column(row, "name")?,
        email: column(row, "email")?,
        phone: column(row, "phone")?,
        course: column(row, "course")?,
        enrollment_date: column::<Option<String>>(row, "enrollment_date")?.unwrap_or_default(),
        gpa: column::<Option<f64>>(row, "gpa")?.unwrap_or(0.0),
    };

    // Rows written outside this repository are returned as stored.
    if let Err(err) = student.validate() {
        warn!("event=student_read module=repo status=invalid_row id={id} reason={err}");
    }
    Ok(student)
}

/// Reads one column, reporting type mismatches as `InvalidData`.
fn column<T: FromSql>(row: &Row<'_>, name: &str) -> RepoResult<T> {
    row.get(name).map_err(|err| match err {
        rusqlite::Error::InvalidColumnType(..) | rusqlite::Error::FromSqlConversionFailure(..) => {
            RepoError::InvalidData(format!("cannot decode students.{name}: {err}"))
        }
        other => other.into(),
    })
}

fn enrollment_date_to_db(student: &Student) -> Option<&str> {
    if student.has_enrollment_date() {
        Some(student.enrollment_date.as_str())
    } else {
        None
    }
}

fn map_write_error(err: rusqlite::Error, student_id: &str) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
            return RepoError::ConstraintViolation {
                student_id: student_id.to_string(),
            };
        }
    }
    err.into()
}

/// Builds a `LIKE` pattern matching `query` anywhere, with wildcards escaped.
fn contains_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for ch in query.chars() {
        if matches!(ch, '%' | '_') || ch == LIKE_ESCAPE {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
