//! SQLite persistence for users and tasks.
//!
//! A single connection serialized behind an async mutex; every statement is a
//! single-row or single-query operation, so no multi-step transactions are
//! needed. Task lookups that mutate or display a task are always scoped to
//! `(id, user_id)` so ownership is enforced at the query level.

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::{PasswordHash, Task, User};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("username already taken")]
    DuplicateUsername,

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type DbResult<T> = Result<T, DbError>;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS user (
        id       INTEGER PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS task (
        id            INTEGER PRIMARY KEY,
        user_id       INTEGER NOT NULL REFERENCES user(id),
        text          TEXT NOT NULL,
        deadline_date TEXT NOT NULL,
        done          INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_task_user ON task(user_id, deadline_date);
";

/// Handle to the application database.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (creating if needed) the database file and ensure the schema.
    pub fn open(path: &Path) -> DbResult<Self> {
        Self::init(Connection::open(path)?)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> DbResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ── Users ────────────────────────────────────────────────────────────

    /// Insert a new user. Fails with [`DbError::DuplicateUsername`] if the
    /// username is already taken.
    pub async fn create_user(&self, username: &str, password: &PasswordHash) -> DbResult<User> {
        let conn = self.conn.lock().await;
        let result = conn.execute(
            "INSERT INTO user (username, password) VALUES (?1, ?2)",
            params![username, password.as_str()],
        );
        match result {
            Ok(_) => Ok(User {
                id: conn.last_insert_rowid(),
                username: username.to_string(),
                password: password.clone(),
            }),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(DbError::DuplicateUsername)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn user_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let conn = self.conn.lock().await;
        let user = conn
            .query_row(
                "SELECT id, username, password FROM user WHERE username = ?1",
                params![username],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    pub async fn user_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let conn = self.conn.lock().await;
        let user = conn
            .query_row(
                "SELECT id, username, password FROM user WHERE id = ?1",
                params![id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    // ── Tasks ────────────────────────────────────────────────────────────

    pub async fn create_task(
        &self,
        user_id: i64,
        text: &str,
        deadline_date: NaiveDate,
    ) -> DbResult<Task> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO task (user_id, text, deadline_date, done) VALUES (?1, ?2, ?3, 0)",
            params![user_id, text, deadline_date],
        )?;
        Ok(Task {
            id: conn.last_insert_rowid(),
            user_id,
            text: text.to_string(),
            deadline_date,
            done: false,
        })
    }

    /// Fetch a task by id, scoped to its owner. A wrong id and a foreign
    /// owner both come back as `None`.
    pub async fn task_for_user(&self, id: i64, user_id: i64) -> DbResult<Option<Task>> {
        let conn = self.conn.lock().await;
        let task = conn
            .query_row(
                "SELECT id, user_id, text, deadline_date, done
                 FROM task WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    /// All tasks for a user, ordered by deadline ascending.
    pub async fn tasks_for_user(&self, user_id: i64) -> DbResult<Vec<Task>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, text, deadline_date, done
             FROM task WHERE user_id = ?1
             ORDER BY deadline_date ASC, id ASC",
        )?;
        let tasks = stmt
            .query_map(params![user_id], row_to_task)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Update an owned task's text, deadline, and completion flag.
    /// Returns `false` when the task does not exist or is owned by someone
    /// else.
    pub async fn update_task(
        &self,
        id: i64,
        user_id: i64,
        text: &str,
        deadline_date: NaiveDate,
        done: bool,
    ) -> DbResult<bool> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE task SET text = ?3, deadline_date = ?4, done = ?5
             WHERE id = ?1 AND user_id = ?2",
            params![id, user_id, text, deadline_date, done],
        )?;
        Ok(changed > 0)
    }

    /// Delete an owned task. Returns `false` on a miss, same as
    /// [`Database::update_task`].
    pub async fn delete_task(&self, id: i64, user_id: i64) -> DbResult<bool> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "DELETE FROM task WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password: PasswordHash::from_stored(row.get(2)?),
    })
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        text: row.get(2)?,
        deadline_date: row.get(3)?,
        done: row.get(4)?,
    })
}
