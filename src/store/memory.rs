//! In-process review store.
//!
//! Every transaction holds the store lock for its whole lifetime and works
//! on a private copy of the state, which replaces the shared state only on
//! commit. Transactions are therefore fully serialized and a dropped one
//! leaves no trace.

use super::{NewPullRequest, Store, StoreError, StoreTx};
use crate::models::{PullRequest, PullRequestShort, PullRequestStatus, TeamMember, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    teams: BTreeSet<String>,
    users: HashMap<String, User>,
    pull_requests: HashMap<String, StoredPullRequest>,
    /// Insertion counter used to break created_at ties.
    next_seq: u64,
}

#[derive(Debug, Clone)]
struct StoredPullRequest {
    pr: PullRequest,
    seq: u64,
}

/// Review store kept entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lock(&self) -> MemoryTx {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        MemoryTx { guard, working }
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        Ok(self.lock().await)
    }

    async fn begin_read(&self) -> Result<MemoryTx, StoreError> {
        Ok(self.lock().await)
    }
}

/// An open in-memory transaction.
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

impl MemoryTx {
    fn pull_request_mut(&mut self, pull_request_id: &str) -> Result<&mut PullRequest, StoreError> {
        self.working
            .pull_requests
            .get_mut(pull_request_id)
            .map(|stored| &mut stored.pr)
            .ok_or_else(|| {
                StoreError::Constraint(format!("unknown pull request {}", pull_request_id))
            })
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn team_exists(&mut self, team_name: &str) -> Result<bool, StoreError> {
        Ok(self.working.teams.contains(team_name))
    }

    async fn insert_team(&mut self, team_name: &str) -> Result<(), StoreError> {
        if !self.working.teams.insert(team_name.to_string()) {
            return Err(StoreError::Constraint(format!(
                "duplicate team {}",
                team_name
            )));
        }
        Ok(())
    }

    async fn upsert_user(&mut self, user: &User) -> Result<(), StoreError> {
        if !self.working.teams.contains(&user.team_name) {
            return Err(StoreError::Constraint(format!(
                "unknown team {}",
                user.team_name
            )));
        }
        self.working
            .users
            .insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn list_team_members(
        &mut self,
        team_name: &str,
    ) -> Result<Vec<TeamMember>, StoreError> {
        let mut members: Vec<TeamMember> = self
            .working
            .users
            .values()
            .filter(|u| u.team_name == team_name)
            .cloned()
            .map(TeamMember::from)
            .collect();
        members.sort_by(|a, b| {
            a.username
                .cmp(&b.username)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(members)
    }

    async fn get_user(&mut self, user_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.working.users.get(user_id).cloned())
    }

    async fn set_user_active(
        &mut self,
        user_id: &str,
        is_active: bool,
    ) -> Result<Option<User>, StoreError> {
        Ok(self.working.users.get_mut(user_id).map(|user| {
            user.is_active = is_active;
            user.clone()
        }))
    }

    async fn pr_exists(&mut self, pull_request_id: &str) -> Result<bool, StoreError> {
        Ok(self.working.pull_requests.contains_key(pull_request_id))
    }

    async fn insert_pr(&mut self, pr: &NewPullRequest<'_>) -> Result<(), StoreError> {
        if self.working.pull_requests.contains_key(pr.pull_request_id) {
            return Err(StoreError::Constraint(format!(
                "duplicate pull request {}",
                pr.pull_request_id
            )));
        }
        if !self.working.users.contains_key(pr.author_id) {
            return Err(StoreError::Constraint(format!(
                "unknown author {}",
                pr.author_id
            )));
        }

        let seq = self.working.next_seq;
        self.working.next_seq += 1;
        self.working.pull_requests.insert(
            pr.pull_request_id.to_string(),
            StoredPullRequest {
                pr: PullRequest {
                    pull_request_id: pr.pull_request_id.to_string(),
                    pull_request_name: pr.pull_request_name.to_string(),
                    author_id: pr.author_id.to_string(),
                    status: PullRequestStatus::Open,
                    assigned_reviewers: Vec::new(),
                    created_at: pr.created_at,
                    merged_at: None,
                },
                seq,
            },
        );
        Ok(())
    }

    async fn get_pr(&mut self, pull_request_id: &str) -> Result<Option<PullRequest>, StoreError> {
        Ok(self
            .working
            .pull_requests
            .get(pull_request_id)
            .map(|stored| stored.pr.clone()))
    }

    async fn update_pr_status(
        &mut self,
        pull_request_id: &str,
        status: PullRequestStatus,
        merged_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        // SQL UPDATE semantics: an unknown ID is a no-op
        if let Some(stored) = self.working.pull_requests.get_mut(pull_request_id) {
            stored.pr.status = status;
            stored.pr.merged_at = merged_at;
        }
        Ok(())
    }

    async fn list_active_teammates(
        &mut self,
        team_name: &str,
        exclude_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = self
            .working
            .users
            .values()
            .filter(|u| u.team_name == team_name && u.is_active && u.user_id != exclude_id)
            .map(|u| u.user_id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn insert_reviewer_assignment(
        &mut self,
        pull_request_id: &str,
        user_id: &str,
    ) -> Result<(), StoreError> {
        if !self.working.users.contains_key(user_id) {
            return Err(StoreError::Constraint(format!("unknown reviewer {}", user_id)));
        }
        let pr = self.pull_request_mut(pull_request_id)?;
        if pr.has_reviewer(user_id) {
            return Err(StoreError::Constraint(format!(
                "{} already reviews {}",
                user_id, pull_request_id
            )));
        }
        pr.assigned_reviewers.push(user_id.to_string());
        Ok(())
    }

    async fn delete_reviewer_assignment(
        &mut self,
        pull_request_id: &str,
        user_id: &str,
    ) -> Result<bool, StoreError> {
        let Some(stored) = self.working.pull_requests.get_mut(pull_request_id) else {
            return Ok(false);
        };
        let before = stored.pr.assigned_reviewers.len();
        stored.pr.assigned_reviewers.retain(|r| r != user_id);
        Ok(stored.pr.assigned_reviewers.len() < before)
    }

    async fn list_reviewers(&mut self, pull_request_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .working
            .pull_requests
            .get(pull_request_id)
            .map(|stored| stored.pr.assigned_reviewers.clone())
            .unwrap_or_default())
    }

    async fn is_assigned_reviewer(
        &mut self,
        pull_request_id: &str,
        user_id: &str,
    ) -> Result<bool, StoreError> {
        Ok(self
            .working
            .pull_requests
            .get(pull_request_id)
            .is_some_and(|stored| stored.pr.has_reviewer(user_id)))
    }

    async fn list_reviewed_prs(
        &mut self,
        user_id: &str,
    ) -> Result<Vec<PullRequestShort>, StoreError> {
        let mut reviewed: Vec<&StoredPullRequest> = self
            .working
            .pull_requests
            .values()
            .filter(|stored| stored.pr.has_reviewer(user_id))
            .collect();
        reviewed.sort_by(|a, b| {
            b.pr.created_at
                .cmp(&a.pr.created_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });
        Ok(reviewed
            .into_iter()
            .map(|stored| PullRequestShort::from(&stored.pr))
            .collect())
    }

    async fn commit(self) -> Result<(), StoreError> {
        let MemoryTx { mut guard, working } = self;
        *guard = working;
        Ok(())
    }
}
