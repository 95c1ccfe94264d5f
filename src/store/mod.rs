//! Review store abstraction.
//!
//! The workflow engine never touches SQL directly. It opens a transaction
//! through [`Store`], runs the reads and writes it needs through
//! [`StoreTx`], and calls [`StoreTx::commit`]. Dropping a transaction
//! without committing rolls it back, which is also what happens when the
//! caller's future is cancelled mid-operation.
//!
//! Absent rows are reported as `None`/`false`; deciding which domain error
//! that means is left to the engine.

pub mod memory;
pub mod sqlite;

use crate::models::{PullRequest, PullRequestShort, PullRequestStatus, TeamMember, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Store-level failures. Always infrastructure, never a domain outcome.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    /// A uniqueness or reference constraint rejected the write.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// A stored value could not be mapped back into a model.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// A pull request as it is first written, before any reviewer is attached.
#[derive(Debug, Clone)]
pub struct NewPullRequest<'a> {
    pub pull_request_id: &'a str,
    pub pull_request_name: &'a str,
    pub author_id: &'a str,
    pub created_at: DateTime<Utc>,
}

/// Entry point to a durable review store.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    type Tx: StoreTx;

    /// Open a transaction for a read-decide-write sequence.
    ///
    /// Implementations must serialize these against each other so two
    /// callers never decide on the same prior reviewer state.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Open a transaction that only reads.
    async fn begin_read(&self) -> Result<Self::Tx, StoreError>;
}

/// Operations available inside a store transaction.
#[async_trait]
pub trait StoreTx: Send {
    async fn team_exists(&mut self, team_name: &str) -> Result<bool, StoreError>;

    async fn insert_team(&mut self, team_name: &str) -> Result<(), StoreError>;

    /// Insert the user, or overwrite username, team and active flag if the
    /// user ID is already known.
    async fn upsert_user(&mut self, user: &User) -> Result<(), StoreError>;

    /// Members of `team_name` ordered by username.
    async fn list_team_members(&mut self, team_name: &str)
        -> Result<Vec<TeamMember>, StoreError>;

    async fn get_user(&mut self, user_id: &str) -> Result<Option<User>, StoreError>;

    /// Update the active flag, returning the updated user if it exists.
    async fn set_user_active(
        &mut self,
        user_id: &str,
        is_active: bool,
    ) -> Result<Option<User>, StoreError>;

    async fn pr_exists(&mut self, pull_request_id: &str) -> Result<bool, StoreError>;

    /// Insert a pull request in the `OPEN` state.
    async fn insert_pr(&mut self, pr: &NewPullRequest<'_>) -> Result<(), StoreError>;

    /// Full pull request state including current reviewers.
    async fn get_pr(&mut self, pull_request_id: &str) -> Result<Option<PullRequest>, StoreError>;

    async fn update_pr_status(
        &mut self,
        pull_request_id: &str,
        status: PullRequestStatus,
        merged_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    /// User IDs of active members of `team_name`, excluding `exclude_id`.
    async fn list_active_teammates(
        &mut self,
        team_name: &str,
        exclude_id: &str,
    ) -> Result<Vec<String>, StoreError>;

    async fn insert_reviewer_assignment(
        &mut self,
        pull_request_id: &str,
        user_id: &str,
    ) -> Result<(), StoreError>;

    /// Remove an assignment. Returns whether a row was removed.
    async fn delete_reviewer_assignment(
        &mut self,
        pull_request_id: &str,
        user_id: &str,
    ) -> Result<bool, StoreError>;

    /// Reviewer user IDs in assignment order.
    async fn list_reviewers(&mut self, pull_request_id: &str) -> Result<Vec<String>, StoreError>;

    async fn is_assigned_reviewer(
        &mut self,
        pull_request_id: &str,
        user_id: &str,
    ) -> Result<bool, StoreError>;

    /// Pull requests `user_id` currently reviews, newest first.
    async fn list_reviewed_prs(&mut self, user_id: &str)
        -> Result<Vec<PullRequestShort>, StoreError>;

    /// Make every write of this transaction visible at once.
    async fn commit(self) -> Result<(), StoreError>;
}
