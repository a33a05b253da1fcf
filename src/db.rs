//! SQLite store for users, tasks and narrative plans

use chrono::{Local, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::error::{PdcaError, Result};
use crate::models::{
    Plan, PlanPeriod, TIMESTAMP_FORMAT, Task, TaskInput, TaskStatus, UserProfile, WorkLocation,
    format_timestamp,
};

const TASK_COLUMNS: &str = "id, owner_id, title, start_at, end_at, is_all_day, status, \
     do_text, check_text, act_text, is_internal_work, external_location, created_at, updated_at";

/// Hashed secrets stored with an account
#[derive(Debug, Clone)]
pub struct Credentials {
    pub password_hash: String,
    pub security_question: String,
    pub security_answer_hash: String,
}

#[cfg(test)]
impl Credentials {
    pub fn placeholder() -> Self {
        Self {
            password_hash: "hash".into(),
            security_question: "birthplace".into(),
            security_answer_hash: "answer-hash".into(),
        }
    }
}

/// Thread-safe database wrapper
pub struct Database {
    conn: Mutex<Connection>,
}

fn now() -> String {
    Local::now().naive_local().format(TIMESTAMP_FORMAT).to_string()
}

fn text_column_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(|e| text_column_error(idx, e))
}

fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    let id: String = row.get(0)?;
    let status: String = row.get(6)?;
    let location = if row.get::<_, i32>(10)? != 0 {
        WorkLocation::Internal
    } else {
        WorkLocation::External {
            location: row.get(11)?,
        }
    };

    Ok(Task {
        id: Uuid::parse_str(&id).map_err(|e| text_column_error(0, e))?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        start: timestamp_column(row, 3)?,
        end: timestamp_column(row, 4)?,
        all_day: row.get::<_, i32>(5)? != 0,
        status: TaskStatus::from_db(&status),
        do_text: row.get(7)?,
        check_text: row.get(8)?,
        act_text: row.get(9)?,
        location,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn user_from_row(row: &Row) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: row.get(0)?,
        username: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn location_columns(location: &WorkLocation) -> (i32, Option<&str>) {
    match location {
        WorkLocation::Internal => (1, None),
        WorkLocation::External { location } => (0, location.as_deref()),
    }
}

fn period_columns(period: &PlanPeriod) -> (&'static str, String) {
    match period {
        PlanPeriod::Week(_) => ("week", period.key()),
        PlanPeriod::Month(_) => ("month", period.key()),
    }
}

impl Database {
    /// Open or create the database
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "Opened database");
        Self::with_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // Single statements only; a poisoned lock still guards a usable connection.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                security_question TEXT NOT NULL,
                security_answer_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                owner_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                start_at TEXT NOT NULL,
                end_at TEXT NOT NULL,
                is_all_day INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'PLAN',
                do_text TEXT,
                check_text TEXT,
                act_text TEXT,
                is_internal_work INTEGER NOT NULL DEFAULT 1,
                external_location TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (owner_id) REFERENCES users(id)
            );

            CREATE TABLE IF NOT EXISTS plans (
                owner_id INTEGER NOT NULL,
                period_kind TEXT NOT NULL CHECK (period_kind IN ('week', 'month')),
                period_key TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (owner_id, period_kind, period_key),
                FOREIGN KEY (owner_id) REFERENCES users(id)
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_owner_start ON tasks(owner_id, start_at);
            CREATE INDEX IF NOT EXISTS idx_tasks_owner_end ON tasks(owner_id, end_at);
            "#,
        )?;

        Ok(())
    }

    // Users

    /// Insert a new account. Username and email must both be unused.
    pub fn create_user(
        &self,
        username: &str,
        name: &str,
        email: &str,
        credentials: &Credentials,
    ) -> Result<UserProfile> {
        let conn = self.conn();

        let taken: Option<String> = conn
            .query_row(
                "SELECT username FROM users WHERE username = ?1 OR email = ?2",
                params![username, email],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(existing) = taken {
            let field = if existing == username { "username" } else { "email" };
            return Err(PdcaError::validation(format!("{field} is already registered")));
        }

        conn.execute(
            "INSERT INTO users (username, password_hash, name, email,
                                security_question, security_answer_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                username,
                &credentials.password_hash,
                name,
                email,
                &credentials.security_question,
                &credentials.security_answer_hash,
                now()
            ],
        )?;
        let id = conn.last_insert_rowid();

        conn.query_row(
            "SELECT id, username, name, email, created_at FROM users WHERE id = ?1",
            params![id],
            user_from_row,
        )
        .map_err(Into::into)
    }

    pub fn get_user(&self, id: i64) -> Result<Option<UserProfile>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, username, name, email, created_at FROM users WHERE id = ?1",
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Profile plus stored secrets, for credential checks
    pub fn user_credentials(&self, username: &str) -> Result<Option<(UserProfile, Credentials)>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, username, name, email, created_at,
                    password_hash, security_question, security_answer_hash
             FROM users WHERE username = ?1",
            params![username],
            |row| {
                let credentials = Credentials {
                    password_hash: row.get(5)?,
                    security_question: row.get(6)?,
                    security_answer_hash: row.get(7)?,
                };
                Ok((user_from_row(row)?, credentials))
            },
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn update_password(&self, user_id: i64, password_hash: &str) -> Result<()> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE users SET password_hash = ?2 WHERE id = ?1",
            params![user_id, password_hash],
        )?;
        if changed == 0 {
            return Err(PdcaError::not_found(format!("User {user_id}")));
        }
        Ok(())
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<UserProfile>> {
        Ok(self.user_credentials(username)?.map(|(user, _)| user))
    }

    // Tasks

    /// Tasks of one owner ordered by start time. With bounds, only tasks
    /// overlapping `[start, end]` (inclusive) are returned, using the same
    /// three-clause test as `stats::overlaps`.
    pub fn list_tasks(
        &self,
        owner_id: i64,
        range: Option<(NaiveDateTime, NaiveDateTime)>,
    ) -> Result<Vec<Task>> {
        let conn = self.conn();

        let tasks = if let Some((start, end)) = range {
            let (start, end) = (format_timestamp(&start), format_timestamp(&end));
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE owner_id = ?1 AND (
                     (start_at >= ?2 AND start_at <= ?3) OR
                     (end_at >= ?2 AND end_at <= ?3) OR
                     (start_at <= ?2 AND end_at >= ?3)
                 )
                 ORDER BY start_at, created_at"
            ))?;
            stmt.query_map(params![owner_id, start, end], task_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = ?1 ORDER BY start_at, created_at"
            ))?;
            stmt.query_map(params![owner_id], task_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        };

        Ok(tasks)
    }

    pub fn get_task(&self, owner_id: i64, id: Uuid) -> Result<Option<Task>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND owner_id = ?2"),
            params![id.to_string(), owner_id],
            task_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn create_task(&self, owner_id: i64, input: &TaskInput) -> Result<Task> {
        input.validate()?;
        let id = Uuid::new_v4();
        let stamp = now();
        let (internal, external) = location_columns(&input.location);

        {
            let conn = self.conn();
            conn.execute(
                &format!(
                    "INSERT INTO tasks ({TASK_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
                ),
                params![
                    id.to_string(),
                    owner_id,
                    input.title.trim(),
                    format_timestamp(&input.start),
                    format_timestamp(&input.end),
                    input.all_day as i32,
                    input.status.as_str(),
                    &input.do_text,
                    &input.check_text,
                    &input.act_text,
                    internal,
                    external,
                    &stamp,
                    &stamp,
                ],
            )?;
        }

        tracing::debug!(task_id = %id, owner_id, "Task created");
        self.get_task(owner_id, id)?
            .ok_or_else(|| PdcaError::not_found(format!("Task {id}")))
    }

    /// Replace all editable fields of an existing task
    pub fn update_task(&self, owner_id: i64, id: Uuid, input: &TaskInput) -> Result<Task> {
        input.validate()?;
        let (internal, external) = location_columns(&input.location);

        let changed = {
            let conn = self.conn();
            conn.execute(
                r#"UPDATE tasks SET title = ?3, start_at = ?4, end_at = ?5, is_all_day = ?6,
                   status = ?7, do_text = ?8, check_text = ?9, act_text = ?10,
                   is_internal_work = ?11, external_location = ?12, updated_at = ?13
                   WHERE id = ?1 AND owner_id = ?2"#,
                params![
                    id.to_string(),
                    owner_id,
                    input.title.trim(),
                    format_timestamp(&input.start),
                    format_timestamp(&input.end),
                    input.all_day as i32,
                    input.status.as_str(),
                    &input.do_text,
                    &input.check_text,
                    &input.act_text,
                    internal,
                    external,
                    now(),
                ],
            )?
        };

        if changed == 0 {
            return Err(PdcaError::not_found(format!("Task {id}")));
        }

        self.get_task(owner_id, id)?
            .ok_or_else(|| PdcaError::not_found(format!("Task {id}")))
    }

    pub fn delete_task(&self, owner_id: i64, id: Uuid) -> Result<()> {
        let conn = self.conn();
        let changed = conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND owner_id = ?2",
            params![id.to_string(), owner_id],
        )?;
        if changed == 0 {
            return Err(PdcaError::not_found(format!("Task {id}")));
        }
        Ok(())
    }

    // Plans

    pub fn get_plan(&self, owner_id: i64, period: PlanPeriod) -> Result<Option<Plan>> {
        let (kind, key) = period_columns(&period);
        let conn = self.conn();
        conn.query_row(
            "SELECT content, created_at, updated_at FROM plans
             WHERE owner_id = ?1 AND period_kind = ?2 AND period_key = ?3",
            params![owner_id, kind, key],
            |row| {
                Ok(Plan {
                    owner_id,
                    period,
                    content: row.get(0)?,
                    created_at: row.get(1)?,
                    updated_at: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(Into::into)
    }

    /// Create the plan for a period or overwrite its content
    pub fn upsert_plan(&self, owner_id: i64, period: PlanPeriod, content: &str) -> Result<Plan> {
        let (kind, key) = period_columns(&period);
        let stamp = now();
        {
            let conn = self.conn();
            conn.execute(
                r#"INSERT INTO plans (owner_id, period_kind, period_key, content, created_at, updated_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                   ON CONFLICT (owner_id, period_kind, period_key)
                   DO UPDATE SET content = excluded.content, updated_at = excluded.updated_at"#,
                params![owner_id, kind, key, content, stamp],
            )?;
        }

        self.get_plan(owner_id, period)?
            .ok_or_else(|| PdcaError::not_found(format!("Plan {key}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{MonthId, WeekId};
    use crate::models::parse_timestamp;

    fn db_with_user() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let user = db
            .create_user("kim", "Kim", "kim@example.com", &Credentials::placeholder())
            .unwrap();
        (db, user.id)
    }

    fn input(title: &str, start: &str, end: &str) -> TaskInput {
        TaskInput {
            title: title.to_string(),
            start: parse_timestamp(start).unwrap(),
            end: parse_timestamp(end).unwrap(),
            all_day: false,
            status: TaskStatus::Plan,
            do_text: None,
            check_text: None,
            act_text: None,
            location: WorkLocation::Internal,
        }
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let (db, _) = db_with_user();
        let err = db
            .create_user("kim", "Other", "other@example.com", &Credentials::placeholder())
            .unwrap_err();
        assert!(matches!(err, PdcaError::Validation { .. }));
        assert!(err.to_string().contains("username"));
    }

    #[test]
    fn test_update_password() {
        let (db, owner) = db_with_user();
        db.update_password(owner, "new-hash").unwrap();

        let (user, stored) = db.user_credentials("kim").unwrap().unwrap();
        assert_eq!(user.id, owner);
        assert_eq!(stored.password_hash, "new-hash");
        assert_eq!(stored.security_question, "birthplace");

        assert!(matches!(
            db.update_password(999, "x"),
            Err(PdcaError::NotFound { .. })
        ));
    }

    #[test]
    fn test_task_crud() {
        let (db, owner) = db_with_user();

        let mut draft = input("Write plan", "2025-03-10T09:00", "2025-03-10T10:30");
        draft.location = WorkLocation::External {
            location: Some("Plant 2".into()),
        };
        let task = db.create_task(owner, &draft).unwrap();
        assert_eq!(task.title, "Write plan");
        assert_eq!(task.location, draft.location);

        let mut edit = draft.clone();
        edit.status = TaskStatus::Completed;
        edit.check_text = Some("on time".into());
        let updated = db.update_task(owner, task.id, &edit).unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);
        assert_eq!(updated.check_text.as_deref(), Some("on time"));

        db.delete_task(owner, task.id).unwrap();
        assert!(db.get_task(owner, task.id).unwrap().is_none());
        assert!(matches!(
            db.delete_task(owner, task.id),
            Err(PdcaError::NotFound { .. })
        ));
    }

    #[test]
    fn test_create_rejects_end_before_start() {
        let (db, owner) = db_with_user();
        let bad = input("Backwards", "2025-03-10T10:00", "2025-03-10T09:00");
        assert!(matches!(
            db.create_task(owner, &bad),
            Err(PdcaError::Validation { .. })
        ));
    }

    #[test]
    fn test_tasks_are_scoped_to_owner() {
        let (db, owner) = db_with_user();
        let other = db
            .create_user("lee", "Lee", "lee@example.com", &Credentials::placeholder())
            .unwrap()
            .id;
        let task = db
            .create_task(owner, &input("Mine", "2025-03-10T09:00", "2025-03-10T10:00"))
            .unwrap();

        assert!(db.get_task(other, task.id).unwrap().is_none());
        assert!(db.list_tasks(other, None).unwrap().is_empty());
        assert!(matches!(
            db.update_task(other, task.id, &input("Theirs", "2025-03-10T09:00", "2025-03-10T10:00")),
            Err(PdcaError::NotFound { .. })
        ));
    }

    #[test]
    fn test_list_tasks_overlap_query() {
        let (db, owner) = db_with_user();
        for (title, start, end) in [
            ("inside", "2025-03-12T09:00", "2025-03-12T10:00"),
            ("starts before", "2025-03-09T22:00", "2025-03-10T01:00"),
            ("ends after", "2025-03-16T23:00", "2025-03-17T02:00"),
            ("spans", "2025-03-01T00:00", "2025-03-31T00:00"),
            ("before", "2025-03-08T09:00", "2025-03-08T10:00"),
            ("after", "2025-03-17T09:00", "2025-03-17T10:00"),
        ] {
            db.create_task(owner, &input(title, start, end)).unwrap();
        }

        let range = "2025-10".parse::<WeekId>().unwrap().range().timestamp_bounds();
        let titles: Vec<_> = db
            .list_tasks(owner, Some(range))
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["spans", "starts before", "inside", "ends after"]);
        assert_eq!(db.list_tasks(owner, None).unwrap().len(), 6);
    }

    #[test]
    fn test_plan_upsert_overwrites() {
        let (db, owner) = db_with_user();
        let week = PlanPeriod::Week("2025-10".parse().unwrap());
        let month = PlanPeriod::Month("2025-03".parse::<MonthId>().unwrap());

        assert!(db.get_plan(owner, week).unwrap().is_none());
        db.upsert_plan(owner, week, "first draft").unwrap();
        let plan = db.upsert_plan(owner, week, "final").unwrap();
        assert_eq!(plan.content, "final");
        assert_eq!(db.get_plan(owner, week).unwrap().unwrap().content, "final");

        // Same key string, different kind
        assert!(db.get_plan(owner, month).unwrap().is_none());
    }
}
