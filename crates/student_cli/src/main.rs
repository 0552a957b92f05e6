//! Command-line front end for the student record store.
//!
//! # Responsibility
//! - Collect field input from arguments and call store operations.
//! - Own the caller-side duties: uniqueness pre-check before writes and
//!   "blank search lists everything".

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use student_core::config::{ensure_db_dir, load_config};
use student_core::{
    init_logging, RecordId, RepoError, SqliteStudentRepository, Student, StudentService,
    StudentStore, StudentValidationError, StoreConfig,
};

#[derive(Parser)]
#[command(name = "student")]
#[command(version)]
#[command(about = "Manage locally stored student records")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overrides the config value
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new student
    Add(StudentFields),

    /// Show one student by record id
    Show { id: RecordId },

    /// List all students ordered by name
    List,

    /// Search name, student id and course
    Search {
        /// Substring to look for; empty lists everything
        #[arg(default_value = "")]
        query: String,
    },

    /// Replace every field of an existing student
    Edit {
        id: RecordId,
        #[command(flatten)]
        fields: StudentFields,
    },

    /// Delete a student by record id
    Delete {
        id: RecordId,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Print the number of stored students
    Count,
}

#[derive(Args)]
struct StudentFields {
    #[arg(long)]
    student_id: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    course: String,
    #[arg(long, default_value = "")]
    enrollment_date: String,
    #[arg(long, default_value_t = 0.0)]
    gpa: f64,
}

impl StudentFields {
    fn into_student(self) -> Student {
        Student::new(
            self.student_id,
            self.name,
            self.email,
            self.phone,
            self.course,
        )
        .with_enrollment_date(self.enrollment_date)
        .with_gpa(self.gpa)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?.unwrap_or_default();
    if let Some(database) = cli.database {
        config.database_path = database;
    }
    config.validate()?;

    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir)?;
    }

    let store = open_store(&config)?;
    let service = store.service();
    run(&service, cli.command)
}

fn open_store(config: &StoreConfig) -> anyhow::Result<StudentStore> {
    ensure_db_dir(&config.database_path)?;
    StudentStore::open(&config.database_path).with_context(|| {
        format!(
            "failed to open student database at {}",
            config.database_path.display()
        )
    })
}

fn run(
    service: &StudentService<SqliteStudentRepository<'_>>,
    command: Commands,
) -> anyhow::Result<()> {
    match command {
        Commands::Add(fields) => {
            let student = fields.into_student();
            check_fields(&student)?;
            match service.register_student(&student) {
                Ok(stored) => {
                    info!("event=cli_add module=cli status=ok");
                    println!("Student added with id {}", stored.id.unwrap_or_default());
                }
                Err(RepoError::ConstraintViolation { student_id }) => {
                    bail!("Student ID {student_id} already exists");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Commands::Show { id } => match service.get_student(id) {
            Ok(student) => print_detail(&student),
            Err(RepoError::NotFound(_)) => bail!("Student not found"),
            Err(err) => return Err(err.into()),
        },
        Commands::List => print_rows(&service.list_students()?),
        Commands::Search { query } => print_rows(&service.find_students(&query)?),
        Commands::Edit { id, fields } => {
            let mut student = fields.into_student();
            student.id = Some(id);
            check_fields(&student)?;
            match service.save_student(&student) {
                Ok(()) => println!("Student updated"),
                Err(RepoError::ConstraintViolation { student_id }) => {
                    bail!("Student ID {student_id} already exists");
                }
                Err(RepoError::NotFound(_)) => bail!("Student no longer exists"),
                Err(err) => return Err(err.into()),
            }
        }
        Commands::Delete { id, yes } => {
            let student = match service.get_student(id) {
                Ok(student) => student,
                Err(RepoError::NotFound(_)) => bail!("Student not found"),
                Err(err) => return Err(err.into()),
            };
            if !yes && !confirm(&format!("Delete {}? [y/N] ", student.name))? {
                println!("Cancelled");
                return Ok(());
            }
            service.delete_student(id)?;
            println!("Student deleted");
        }
        Commands::Count => println!("{}", service.count_students()?),
    }
    Ok(())
}

fn check_fields(student: &Student) -> anyhow::Result<()> {
    match student.validate() {
        Ok(()) => Ok(()),
        Err(StudentValidationError::EmptyField(field)) => {
            bail!("please fill in all required fields: {field} is empty")
        }
        Err(err) => bail!("{err}"),
    }
}

fn print_rows(students: &[Student]) {
    if students.is_empty() {
        println!("No students found");
        return;
    }
    for student in students {
        println!(
            "{:>5}  {:<12} {:<28} {}",
            student.id.unwrap_or_default(),
            student.student_id,
            student.name,
            student.course
        );
    }
    println!("Total: {}", students.len());
}

fn print_detail(student: &Student) {
    println!("Student ID:  {}", student.student_id);
    println!("Name:        {}", student.name);
    println!("Email:       {}", student.email);
    println!("Phone:       {}", student.phone);
    println!("Course:      {}", student.course);
    if student.has_enrollment_date() {
        println!("Enrolled:    {}", student.enrollment_date);
    } else {
        println!("Enrolled:    N/A");
    }
    println!("GPA:         {}", student.formatted_gpa());
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    use std::io::Write;

    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
