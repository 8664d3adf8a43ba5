//! # SQLite
//!
//! Single-file relational store.
//!
//! ## Tables
//!
//! - `students`: auto-assigned id, name, unique phone, password hash,
//!   and optional branch/college/year/address
//! - `admins`: auto-assigned id, unique username, optional phone, password hash
//!
//! ## Access
//!
//! - One connection behind a mutex, shared by every request
//! - Every statement runs on the blocking pool while holding the lock
//! - The dashboard listing holds the lock for the life of its cursor, see [`crate::stream`]
//! - A default `admin` account is seeded on startup if missing
use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use rusqlite::{Connection, OptionalExtension, Rows, params, types::Value};
use tokio::task::spawn_blocking;
use tracing::{info, warn};

use crate::{
    error::DatabaseError,
    models::{Credentials, NewAdmin, NewStudent, Student, StudentUpdate},
    stream::{RowCursor, StreamError, StreamOutcome, collect_within},
};

pub const IN_MEMORY: &str = ":memory:";

pub const DEFAULT_ADMIN: &str = "admin";
pub const DEFAULT_ADMIN_PHONE: &str = "9876543210";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS students (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        phone TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        branch TEXT,
        college TEXT,
        year TEXT,
        address TEXT
    );

    CREATE TABLE IF NOT EXISTS admins (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        phone TEXT,
        password TEXT NOT NULL
    );
"#;

const STUDENT_COLUMNS: usize = 7;

const LIST_STUDENTS: &str =
    "SELECT id, name, phone, branch, college, year, address FROM students ORDER BY id";

const GET_STUDENT: &str =
    "SELECT id, name, phone, branch, college, year, address FROM students WHERE id = ?1";

#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self, DatabaseError> {
        let connection = if path == IN_MEMORY {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };

        info!("Opened database at {path}");

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Creates both tables and seeds the default admin with `admin_password_hash`.
    pub async fn init(&self, admin_password_hash: String) -> Result<(), DatabaseError> {
        let seeded = self
            .run(move |connection| {
                connection.execute_batch(SCHEMA)?;

                Ok(connection.execute(
                    "INSERT OR IGNORE INTO admins (username, phone, password) VALUES (?1, ?2, ?3)",
                    params![DEFAULT_ADMIN, DEFAULT_ADMIN_PHONE, admin_password_hash],
                )?)
            })
            .await?;

        if seeded > 0 {
            info!("Seeded default admin account '{DEFAULT_ADMIN}'");
        }

        Ok(())
    }

    async fn run<T, F>(&self, operation: F) -> Result<T, DatabaseError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, DatabaseError> + Send + 'static,
    {
        let connection = self.connection.clone();

        spawn_blocking(move || {
            let guard = connection.lock().unwrap_or_else(PoisonError::into_inner);
            operation(&guard)
        })
        .await
        .map_err(|e| DatabaseError::Task(e.to_string()))?
    }

    pub async fn insert_student(&self, student: NewStudent) -> Result<i64, DatabaseError> {
        self.run(move |connection| {
            connection.execute(
                "INSERT INTO students (name, phone, password, branch, college, year, address)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    student.name,
                    student.phone,
                    student.password_hash,
                    student.branch,
                    student.college,
                    student.year,
                    student.address,
                ],
            )?;

            Ok(connection.last_insert_rowid())
        })
        .await
    }

    pub async fn student_credentials(
        &self,
        phone: String,
    ) -> Result<Option<Credentials>, DatabaseError> {
        self.run(move |connection| {
            Ok(connection
                .query_row(
                    "SELECT id, password FROM students WHERE phone = ?1",
                    [phone],
                    |row| {
                        Ok(Credentials {
                            id: row.get(0)?,
                            password_hash: row.get(1)?,
                        })
                    },
                )
                .optional()?)
        })
        .await
    }

    pub async fn get_student(&self, id: i64) -> Result<Student, DatabaseError> {
        self.run(move |connection| {
            let mut statement = connection.prepare(GET_STUDENT)?;
            let mut cursor = SqliteCursor::new(statement.query([id])?, STUDENT_COLUMNS);

            let row = cursor.advance()?.ok_or(DatabaseError::NotFound)?;

            Ok(decode_student(row)?)
        })
        .await
    }

    /// Returns whether a row was touched. Missing ids are not an error.
    pub async fn update_student(
        &self,
        id: i64,
        update: StudentUpdate,
    ) -> Result<bool, DatabaseError> {
        let changed = self
            .run(move |connection| {
                Ok(connection.execute(
                    "UPDATE students SET branch = ?1, college = ?2, year = ?3, address = ?4
                     WHERE id = ?5",
                    params![update.branch, update.college, update.year, update.address, id],
                )?)
            })
            .await?;

        if changed == 0 {
            warn!("Update matched no student with id {id}");
        }

        Ok(changed > 0)
    }

    /// Returns whether a row was removed. Missing ids are not an error.
    pub async fn delete_student(&self, id: i64) -> Result<bool, DatabaseError> {
        let deleted = self
            .run(move |connection| {
                Ok(connection.execute("DELETE FROM students WHERE id = ?1", [id])?)
            })
            .await?;

        if deleted == 0 {
            warn!("Delete matched no student with id {id}");
        }

        Ok(deleted > 0)
    }

    pub async fn insert_admin(&self, admin: NewAdmin) -> Result<i64, DatabaseError> {
        self.run(move |connection| {
            connection.execute(
                "INSERT INTO admins (username, phone, password) VALUES (?1, ?2, ?3)",
                params![admin.username, admin.phone, admin.password_hash],
            )?;

            Ok(connection.last_insert_rowid())
        })
        .await
    }

    pub async fn admin_credentials(
        &self,
        username: String,
    ) -> Result<Option<Credentials>, DatabaseError> {
        self.run(move |connection| {
            Ok(connection
                .query_row(
                    "SELECT id, password FROM admins WHERE username = ?1",
                    [username],
                    |row| {
                        Ok(Credentials {
                            id: row.get(0)?,
                            password_hash: row.get(1)?,
                        })
                    },
                )
                .optional()?)
        })
        .await
    }

    /// Streams every student in id order. The producer owns the connection
    /// lock and the cursor until the stream ends or `deadline` passes.
    pub async fn list_students(&self, deadline: Duration) -> StreamOutcome<Student> {
        let connection = self.connection.clone();

        collect_within(deadline, move |producer| {
            let guard = connection.lock().unwrap_or_else(PoisonError::into_inner);

            let mut statement = match guard.prepare(LIST_STUDENTS) {
                Ok(statement) => statement,
                Err(e) => return producer.fail(StreamError::cursor(e)),
            };

            let rows = match statement.query([]) {
                Ok(rows) => rows,
                Err(e) => return producer.fail(StreamError::cursor(e)),
            };

            producer.drain(SqliteCursor::new(rows, STUDENT_COLUMNS), decode_student);
        })
        .await
    }
}

#[cfg(test)]
impl Database {
    pub(crate) async fn execute_for_tests(&self, sql: &'static str) {
        self.run(move |connection| Ok(connection.execute_batch(sql)?))
            .await
            .unwrap();
    }
}

/// Adapts [`rusqlite::Rows`] to [`RowCursor`], copying each row out as owned values.
pub struct SqliteCursor<'stmt> {
    rows: Rows<'stmt>,
    width: usize,
}

impl<'stmt> SqliteCursor<'stmt> {
    pub fn new(rows: Rows<'stmt>, width: usize) -> Self {
        Self { rows, width }
    }
}

impl RowCursor for SqliteCursor<'_> {
    type Row = Vec<Value>;

    fn advance(&mut self) -> Result<Option<Vec<Value>>, StreamError> {
        let width = self.width;

        let Some(row) = self.rows.next().map_err(StreamError::cursor)? else {
            return Ok(None);
        };

        (0..width)
            .map(|column| {
                row.get::<_, Value>(column)
                    .map_err(|e| StreamError::decode(column, e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

/// Column order matches [`LIST_STUDENTS`]. NULL text columns become empty strings.
pub fn decode_student(row: Vec<Value>) -> Result<Student, StreamError> {
    Ok(Student {
        id: integer(&row, 0)?,
        name: text(&row, 1)?,
        phone: text(&row, 2)?,
        branch: text(&row, 3)?,
        college: text(&row, 4)?,
        year: text(&row, 5)?,
        address: text(&row, 6)?,
    })
}

fn integer(row: &[Value], column: usize) -> Result<i64, StreamError> {
    match row.get(column) {
        Some(Value::Integer(value)) => Ok(*value),
        other => Err(mismatch(column, "integer", other)),
    }
}

fn text(row: &[Value], column: usize) -> Result<String, StreamError> {
    match row.get(column) {
        Some(Value::Text(value)) => Ok(value.clone()),
        Some(Value::Null) => Ok(String::new()),
        other => Err(mismatch(column, "text", other)),
    }
}

fn mismatch(column: usize, expected: &str, found: Option<&Value>) -> StreamError {
    match found {
        Some(value) => StreamError::decode(
            column,
            format!(
                "expected {expected}, found {}",
                value.data_type().to_string().to_lowercase()
            ),
        ),
        None => StreamError::decode(column, "missing column"),
    }
}
