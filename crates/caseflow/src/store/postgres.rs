//! Postgres-backed case store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::CaseRepository;
use crate::case::{CaseStatus, NewCase, OpenCase, SupportCase};
use crate::error::StoreError;

/// Postgres unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

/// Case store over a Postgres pool.
pub struct PgCaseStore {
    pool: PgPool,
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

type CaseRow = (
    Uuid,                    // id
    String,                  // task_number
    String,                  // user_id
    String,                  // original_text
    String,                  // translated_text
    String,                  // status
    Option<String>,          // response_text
    Option<DateTime<Utc>>,   // reminder_sent_at
    DateTime<Utc>,           // created_at
    DateTime<Utc>,           // updated_at
);

type OpenRow = (
    Uuid,
    String,
    String,
    String,
    String,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
    DateTime<Utc>,
    String, // email
    String, // username
);

impl PgCaseStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the database with a small pool.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Create the engine's tables when they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS support_cases (
                id UUID PRIMARY KEY,
                task_number TEXT NOT NULL UNIQUE,
                user_id TEXT NOT NULL REFERENCES users(id),
                original_text TEXT NOT NULL,
                translated_text TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'open',
                response_text TEXT,
                reminder_sent_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS support_cases_status_idx ON support_cases (status)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn row_to_case(row: CaseRow) -> Result<SupportCase, StoreError> {
    let status = CaseStatus::parse(&row.5).ok_or_else(|| StoreError::InvalidStatus(row.5.clone()))?;
    Ok(SupportCase {
        id: row.0,
        task_number: row.1,
        user_id: row.2,
        original_text: row.3,
        translated_text: row.4,
        status,
        response_text: row.6,
        reminder_sent_at: row.7,
        created_at: row.8,
        updated_at: row.9,
    })
}

#[async_trait]
impl CaseRepository for PgCaseStore {
    async fn create(&self, case: NewCase) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let result = sqlx::query(
            r#"
            INSERT INTO support_cases
                (id, task_number, user_id, original_text, translated_text, status)
            VALUES ($1, $2, $3, $4, $5, 'open')
            "#,
        )
        .bind(id)
        .bind(&case.task_number)
        .bind(&case.user_id)
        .bind(&case.original_text)
        .bind(&case.translated_text)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                tracing::info!(task_number = %case.task_number, "created support case");
                Ok(id)
            }
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Err(StoreError::DuplicateTaskNumber(case.task_number))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn resolve_if_open(
        &self,
        task_number: &str,
        response_text: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE support_cases
            SET status = 'resolved', response_text = $2, updated_at = now()
            WHERE task_number = $1 AND status = 'open'
            "#,
        )
        .bind(task_number)
        .bind(response_text)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_open(&self) -> Result<Vec<OpenCase>, StoreError> {
        let rows = sqlx::query_as::<_, OpenRow>(
            r#"
            SELECT c.id, c.task_number, c.user_id, c.original_text, c.translated_text,
                   c.reminder_sent_at, c.created_at, c.updated_at,
                   u.email, u.username
            FROM support_cases c
            JOIN users u ON u.id = c.user_id
            WHERE c.status = 'open'
            ORDER BY c.created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| OpenCase {
                case: SupportCase {
                    id: row.0,
                    task_number: row.1,
                    user_id: row.2,
                    original_text: row.3,
                    translated_text: row.4,
                    status: CaseStatus::Open,
                    response_text: None,
                    reminder_sent_at: row.5,
                    created_at: row.6,
                    updated_at: row.7,
                },
                email: row.8,
                username: row.9,
            })
            .collect())
    }

    async fn mark_reminder_sent(&self, task_number: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE support_cases
            SET reminder_sent_at = now(), updated_at = now()
            WHERE task_number = $1
            "#,
        )
        .bind(task_number)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, task_number: &str) -> Result<Option<SupportCase>, StoreError> {
        let row = sqlx::query_as::<_, CaseRow>(
            r#"
            SELECT id, task_number, user_id, original_text, translated_text,
                   status, response_text, reminder_sent_at, created_at, updated_at
            FROM support_cases
            WHERE task_number = $1
            "#,
        )
        .bind(task_number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_case).transpose()
    }
}
