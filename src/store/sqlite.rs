//! SQLite-backed review store.

use super::{NewPullRequest, Store, StoreError, StoreTx};
use crate::db::pool::DbPool;
use crate::db::{self, DbError};
use crate::models::{PullRequest, PullRequestShort, PullRequestStatus, TeamMember, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Sqlite, Transaction};
use std::path::Path;

/// Review store persisted in a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Wrap an already migrated pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open (and migrate) the database at `db_path`.
    pub async fn open(db_path: &Path) -> Result<Self, DbError> {
        let pool = db::initialize(db_path).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl Store for SqliteStore {
    type Tx = SqliteTx;

    async fn begin(&self) -> Result<SqliteTx, StoreError> {
        // Take the write lock up front; a deferred transaction that reads
        // first would fail with SQLITE_BUSY when it later tries to write.
        let tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        Ok(SqliteTx { tx })
    }

    async fn begin_read(&self) -> Result<SqliteTx, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(SqliteTx { tx })
    }
}

/// An open SQLite transaction. Rolled back on drop unless committed.
pub struct SqliteTx {
    tx: Transaction<'static, Sqlite>,
}

/// Raw `pull_requests` row; timestamps are Unix milliseconds.
#[derive(Debug, FromRow)]
struct PullRequestRow {
    pull_request_id: String,
    pull_request_name: String,
    author_id: String,
    status: String,
    created_at: i64,
    merged_at: Option<i64>,
}

#[derive(Debug, FromRow)]
struct PullRequestShortRow {
    pull_request_id: String,
    pull_request_name: String,
    author_id: String,
    status: String,
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp out of range: {}", millis)))
}

impl PullRequestRow {
    fn into_model(self, assigned_reviewers: Vec<String>) -> Result<PullRequest, StoreError> {
        Ok(PullRequest {
            status: PullRequestStatus::from(self.status.as_str()),
            created_at: from_millis(self.created_at)?,
            merged_at: self.merged_at.map(from_millis).transpose()?,
            pull_request_id: self.pull_request_id,
            pull_request_name: self.pull_request_name,
            author_id: self.author_id,
            assigned_reviewers,
        })
    }
}

impl From<PullRequestShortRow> for PullRequestShort {
    fn from(row: PullRequestShortRow) -> Self {
        Self {
            status: PullRequestStatus::from(row.status.as_str()),
            pull_request_id: row.pull_request_id,
            pull_request_name: row.pull_request_name,
            author_id: row.author_id,
        }
    }
}

#[async_trait]
impl StoreTx for SqliteTx {
    async fn team_exists(&mut self, team_name: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM teams WHERE team_name = ?)")
                .bind(team_name)
                .fetch_one(&mut *self.tx)
                .await?;
        Ok(exists)
    }

    async fn insert_team(&mut self, team_name: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO teams (team_name) VALUES (?)")
            .bind(team_name)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn upsert_user(&mut self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, team_name, is_active)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE
            SET username = excluded.username,
                team_name = excluded.team_name,
                is_active = excluded.is_active
            "#,
        )
        .bind(&user.user_id)
        .bind(&user.username)
        .bind(&user.team_name)
        .bind(user.is_active)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn list_team_members(
        &mut self,
        team_name: &str,
    ) -> Result<Vec<TeamMember>, StoreError> {
        let members = sqlx::query_as::<_, TeamMember>(
            r#"
            SELECT user_id, username, is_active
            FROM users
            WHERE team_name = ?
            ORDER BY username, user_id
            "#,
        )
        .bind(team_name)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(members)
    }

    async fn get_user(&mut self, user_id: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT user_id, username, team_name, is_active FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn set_user_active(
        &mut self,
        user_id: &str,
        is_active: bool,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_active = ?
            WHERE user_id = ?
            RETURNING user_id, username, team_name, is_active
            "#,
        )
        .bind(is_active)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn pr_exists(&mut self, pull_request_id: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM pull_requests WHERE pull_request_id = ?)",
        )
        .bind(pull_request_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn insert_pr(&mut self, pr: &NewPullRequest<'_>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO pull_requests (pull_request_id, pull_request_name, author_id, status, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(pr.pull_request_id)
        .bind(pr.pull_request_name)
        .bind(pr.author_id)
        .bind(PullRequestStatus::Open.to_string())
        .bind(pr.created_at.timestamp_millis())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn get_pr(&mut self, pull_request_id: &str) -> Result<Option<PullRequest>, StoreError> {
        let row = sqlx::query_as::<_, PullRequestRow>(
            r#"
            SELECT pull_request_id, pull_request_name, author_id, status, created_at, merged_at
            FROM pull_requests
            WHERE pull_request_id = ?
            "#,
        )
        .bind(pull_request_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let reviewers = self.list_reviewers(pull_request_id).await?;
        row.into_model(reviewers).map(Some)
    }

    async fn update_pr_status(
        &mut self,
        pull_request_id: &str,
        status: PullRequestStatus,
        merged_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE pull_requests SET status = ?, merged_at = ? WHERE pull_request_id = ?")
            .bind(status.to_string())
            .bind(merged_at.map(|t| t.timestamp_millis()))
            .bind(pull_request_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn list_active_teammates(
        &mut self,
        team_name: &str,
        exclude_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT user_id FROM users
            WHERE team_name = ? AND is_active = 1 AND user_id != ?
            ORDER BY user_id
            "#,
        )
        .bind(team_name)
        .bind(exclude_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(ids)
    }

    async fn insert_reviewer_assignment(
        &mut self,
        pull_request_id: &str,
        user_id: &str,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO pr_reviewers (pull_request_id, user_id) VALUES (?, ?)")
            .bind(pull_request_id)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_reviewer_assignment(
        &mut self,
        pull_request_id: &str,
        user_id: &str,
    ) -> Result<bool, StoreError> {
        let result =
            sqlx::query("DELETE FROM pr_reviewers WHERE pull_request_id = ? AND user_id = ?")
                .bind(pull_request_id)
                .bind(user_id)
                .execute(&mut *self.tx)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_reviewers(&mut self, pull_request_id: &str) -> Result<Vec<String>, StoreError> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT user_id FROM pr_reviewers WHERE pull_request_id = ? ORDER BY rowid",
        )
        .bind(pull_request_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(ids)
    }

    async fn is_assigned_reviewer(
        &mut self,
        pull_request_id: &str,
        user_id: &str,
    ) -> Result<bool, StoreError> {
        let assigned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM pr_reviewers WHERE pull_request_id = ? AND user_id = ?)",
        )
        .bind(pull_request_id)
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(assigned)
    }

    async fn list_reviewed_prs(
        &mut self,
        user_id: &str,
    ) -> Result<Vec<PullRequestShort>, StoreError> {
        let rows = sqlx::query_as::<_, PullRequestShortRow>(
            r#"
            SELECT pr.pull_request_id, pr.pull_request_name, pr.author_id, pr.status
            FROM pull_requests pr
            JOIN pr_reviewers r ON pr.pull_request_id = r.pull_request_id
            WHERE r.user_id = ?
            ORDER BY pr.created_at DESC, pr.rowid DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(PullRequestShort::from).collect())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
