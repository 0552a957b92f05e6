use student_core::db::migrations::latest_version;
use student_core::db::open_db_in_memory;
use student_core::{RepoError, SqliteStudentRepository, Student, StudentRepository};
use rusqlite::Connection;

#[test]
fn insert_and_get_roundtrip_populates_id_only() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let student = student("S100", "Amy Lee", "CS101")
        .with_enrollment_date("2024-09-01")
        .with_gpa(3.75);
    let id = repo.insert_student(&student).unwrap();

    let loaded = repo.get_student(id).unwrap().unwrap();
    assert_eq!(loaded.id, Some(id));
    assert_eq!(Student { id: None, ..loaded }, student);
}

#[test]
fn optional_fields_roundtrip_as_not_specified() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let id = repo.insert_student(&student("S1", "Amy", "CS")).unwrap();

    let loaded = repo.get_student(id).unwrap().unwrap();
    assert_eq!(loaded.enrollment_date, "");
    assert_eq!(loaded.gpa, 0.0);
    let stored_date: Option<String> = conn
        .query_row(
            "SELECT enrollment_date FROM students WHERE id = ?1;",
            [id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored_date, None);
}

#[test]
fn get_unknown_id_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    assert!(repo.get_student(42).unwrap().is_none());
}

#[test]
fn list_is_sorted_by_name_regardless_of_insert_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    repo.insert_student(&student("A1", "Zoe", "CS")).unwrap();
    repo.insert_student(&student("A2", "Amy", "CS")).unwrap();
    repo.insert_student(&student("A3", "Mia", "MATH")).unwrap();

    assert_eq!(names(&repo.list_students().unwrap()), ["Amy", "Mia", "Zoe"]);
}

#[test]
fn list_breaks_name_ties_by_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let first = repo.insert_student(&student("B2", "Sam", "CS")).unwrap();
    let second = repo.insert_student(&student("B1", "Sam", "CS")).unwrap();

    let ids: Vec<_> = repo
        .list_students()
        .unwrap()
        .into_iter()
        .map(|item| item.id.unwrap())
        .collect();
    assert_eq!(ids, [first, second]);
}

#[test]
fn list_on_empty_store_is_empty() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    assert!(repo.list_students().unwrap().is_empty());
    assert_eq!(repo.count_students().unwrap(), 0);
}

#[test]
fn search_matches_substring_of_name_student_id_or_course() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    repo.insert_student(&student("S1", "Amy Lee", "CS101")).unwrap();
    repo.insert_student(&student("S2", "Ben Cole", "MATH")).unwrap();
    repo.insert_student(&student("X77", "Cara Diaz", "ART")).unwrap();

    assert_eq!(names(&repo.search_students("CS").unwrap()), ["Amy Lee"]);
    assert_eq!(names(&repo.search_students("Col").unwrap()), ["Ben Cole"]);
    assert_eq!(names(&repo.search_students("X7").unwrap()), ["Cara Diaz"]);
    assert!(repo.search_students("nobody").unwrap().is_empty());
}

#[test]
fn search_follows_sqlite_like_case_folding() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    repo.insert_student(&student("S1", "Amy Lee", "CS101")).unwrap();

    assert_eq!(names(&repo.search_students("amy").unwrap()), ["Amy Lee"]);
}

#[test]
fn search_with_empty_query_returns_everything_in_list_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    repo.insert_student(&student("A1", "Zoe", "CS")).unwrap();
    repo.insert_student(&student("A2", "Amy", "BIO")).unwrap();

    assert_eq!(repo.search_students("").unwrap(), repo.list_students().unwrap());
}

#[test]
fn search_treats_like_wildcards_literally() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    repo.insert_student(&student("S_1", "Amy", "CS")).unwrap();
    repo.insert_student(&student("S21", "Ben", "CS")).unwrap();

    assert_eq!(names(&repo.search_students("S_").unwrap()), ["Amy"]);
    assert!(repo.search_students("%").unwrap().is_empty());
}

#[test]
fn search_results_are_subset_of_list() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    repo.insert_student(&student("S1", "Amy Lee", "CS101")).unwrap();
    repo.insert_student(&student("S2", "Ben Cole", "MATH")).unwrap();

    let all = repo.list_students().unwrap();
    for query in ["e", "S", "MATH", "zzz"] {
        for hit in repo.search_students(query).unwrap() {
            assert!(all.contains(&hit), "{query} returned unknown record");
        }
    }
}

#[test]
fn duplicate_student_id_insert_is_constraint_violation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    repo.insert_student(&student("S100", "Amy", "CS")).unwrap();
    assert!(repo.is_student_id_taken("S100", None).unwrap());

    let err = repo
        .insert_student(&student("S100", "Ben", "MATH"))
        .unwrap_err();
    assert!(matches!(err, RepoError::ConstraintViolation { student_id } if student_id == "S100"));
    assert_eq!(repo.count_students().unwrap(), 1);
}

#[test]
fn update_replaces_all_mutable_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let id = repo
        .insert_student(&student("S1", "Amy", "CS").with_gpa(2.5))
        .unwrap();

    let mut edited = Student::new("S1-B", "Amy Lee", "amy@uni.edu", "555-0100", "MATH")
        .with_enrollment_date("2025-01-15")
        .with_gpa(3.9);
    edited.id = Some(id);
    assert_eq!(repo.update_student(&edited).unwrap(), 1);

    assert_eq!(repo.get_student(id).unwrap().unwrap(), edited);
}

#[test]
fn update_keeping_own_student_id_succeeds() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let id = repo.insert_student(&student("S100", "Amy", "CS")).unwrap();
    assert!(!repo.is_student_id_taken("S100", Some(id)).unwrap());

    let mut edited = repo.get_student(id).unwrap().unwrap();
    edited.course = "MATH".to_string();
    assert_eq!(repo.update_student(&edited).unwrap(), 1);
}

#[test]
fn update_into_another_records_student_id_is_constraint_violation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    repo.insert_student(&student("S1", "Amy", "CS")).unwrap();
    let id = repo.insert_student(&student("S2", "Ben", "CS")).unwrap();

    let mut edited = repo.get_student(id).unwrap().unwrap();
    edited.student_id = "S1".to_string();
    let err = repo.update_student(&edited).unwrap_err();
    assert!(matches!(err, RepoError::ConstraintViolation { .. }));
    assert_eq!(repo.get_student(id).unwrap().unwrap().student_id, "S2");
}

#[test]
fn update_unknown_id_affects_zero_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let mut ghost = student("S1", "Amy", "CS");
    ghost.id = Some(999);
    assert_eq!(repo.update_student(&ghost).unwrap(), 0);
    assert_eq!(repo.count_students().unwrap(), 0);
}

#[test]
fn update_without_id_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let err = repo.update_student(&student("S1", "Amy", "CS")).unwrap_err();
    assert!(matches!(err, RepoError::MissingRecordId));
}

#[test]
fn validation_failure_blocks_insert_and_update() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let err = repo.insert_student(&student("S1", "  ", "CS")).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));

    let id = repo.insert_student(&student("S1", "Amy", "CS")).unwrap();
    let mut edited = repo.get_student(id).unwrap().unwrap();
    edited.gpa = f64::INFINITY;
    let err = repo.update_student(&edited).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn delete_removes_record_and_unknown_id_is_noop() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let id = repo.insert_student(&student("S1", "Amy", "CS")).unwrap();
    repo.insert_student(&student("S2", "Ben", "CS")).unwrap();

    assert_eq!(repo.delete_student(id).unwrap(), 1);
    assert!(repo.get_student(id).unwrap().is_none());
    assert_eq!(repo.count_students().unwrap(), 1);

    assert_eq!(repo.delete_student(id).unwrap(), 0);
    assert_eq!(repo.delete_student(12345).unwrap(), 0);
    assert_eq!(repo.count_students().unwrap(), 1);
}

#[test]
fn count_tracks_inserts_minus_deletes() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let mut ids = Vec::new();
    for n in 0..5 {
        ids.push(
            repo.insert_student(&student(&format!("S{n}"), "Amy", "CS"))
                .unwrap(),
        );
    }
    repo.delete_student(ids[1]).unwrap();
    repo.delete_student(ids[3]).unwrap();
    repo.delete_student(ids[3]).unwrap();

    assert_eq!(repo.count_students().unwrap(), 3);
}

#[test]
fn deleted_ids_are_never_reused() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    repo.insert_student(&student("S1", "Amy", "CS")).unwrap();
    let last = repo.insert_student(&student("S2", "Ben", "CS")).unwrap();
    repo.delete_student(last).unwrap();

    let next = repo.insert_student(&student("S3", "Cara", "CS")).unwrap();
    assert!(next > last);
}

#[test]
fn student_id_is_free_again_after_delete() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let id = repo.insert_student(&student("S1", "Amy", "CS")).unwrap();
    repo.delete_student(id).unwrap();

    assert!(!repo.is_student_id_taken("S1", None).unwrap());
    repo.insert_student(&student("S1", "Ben", "CS")).unwrap();
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteStudentRepository::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_students_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteStudentRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("students"))
    ));
}

#[test]
fn repository_rejects_students_table_missing_gpa_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE students (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id TEXT UNIQUE NOT NULL,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT NOT NULL,
            course TEXT NOT NULL,
            enrollment_date TEXT
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteStudentRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "students",
            column: "gpa"
        })
    ));
}

#[test]
fn listing_returns_rows_that_break_field_rules() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    repo.insert_student(&student("S1", "Amy", "CS")).unwrap();
    let id = repo.insert_student(&student("S2", "Ben", "CS")).unwrap();
    conn.execute("UPDATE students SET phone = '' WHERE id = ?1;", [id])
        .unwrap();

    let all = repo.list_students().unwrap();
    assert_eq!(all.len() as u64, repo.count_students().unwrap());
    assert_eq!(names(&all), ["Amy", "Ben"]);
    assert_eq!(names(&repo.search_students("Ben").unwrap()), ["Ben"]);
    assert_eq!(repo.get_student(id).unwrap().unwrap().phone, "");
}

#[test]
fn undecodable_column_is_reported_as_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let id = repo.insert_student(&student("S1", "Amy", "CS")).unwrap();
    conn.execute("UPDATE students SET gpa = 'n/a' WHERE id = ?1;", [id])
        .unwrap();

    let err = repo.get_student(id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(message) if message.contains("gpa")));
}

#[test]
fn negative_gpa_roundtrips() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let id = repo
        .insert_student(&student("S1", "Amy", "CS").with_gpa(-1.0))
        .unwrap();

    assert_eq!(repo.get_student(id).unwrap().unwrap().gpa, -1.0);
}

#[test]
fn write_on_read_only_connection_is_storage_unavailable() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();
    let id = repo.insert_student(&student("S1", "Amy", "CS")).unwrap();
    conn.execute_batch("PRAGMA query_only = ON;").unwrap();

    let err = repo.insert_student(&student("S2", "Ben", "CS")).unwrap_err();
    assert!(matches!(err, RepoError::StorageUnavailable(_)));

    let mut edited = repo.get_student(id).unwrap().unwrap();
    edited.student_id = "S1".to_string();
    let err = repo.update_student(&edited).unwrap_err();
    assert!(matches!(err, RepoError::StorageUnavailable(_)));
    assert_eq!(repo.count_students().unwrap(), 1);
}

fn student(student_id: &str, name: &str, course: &str) -> Student {
    Student::new(student_id, name, "someone@example.com", "555-0100", course)
}

fn names(students: &[Student]) -> Vec<&str> {
    students.iter().map(|item| item.name.as_str()).collect()
}
