//! Review workflow engine.
//!
//! Each public operation runs as a single store transaction: it reads what
//! it needs, decides (consulting the selector for reviewer candidates),
//! writes, and commits. Any early return drops the transaction, which rolls
//! back every write made so far.

use crate::error::AppError;
use crate::models::{PullRequest, PullRequestShort, PullRequestStatus, Team, TeamMember, User};
use crate::selector::{self, AssignmentPolicy};
use crate::store::{NewPullRequest, Store, StoreTx};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Result of a successful reviewer reassignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reassignment {
    pub pr: PullRequest,
    /// User ID of the reviewer that took over.
    pub replaced_by: String,
}

/// Orchestrates team, user and pull request operations on top of a store.
pub struct ReviewService<S: Store> {
    store: S,
    policy: AssignmentPolicy,
    rng: Mutex<StdRng>,
}

/// Current time truncated to the millisecond precision the store keeps.
fn now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

impl<S: Store> ReviewService<S> {
    /// Create a service drawing randomness from OS entropy.
    pub fn new(store: S, policy: AssignmentPolicy) -> Self {
        Self::with_rng(store, policy, StdRng::from_entropy())
    }

    /// Create a service with an explicit random source.
    pub fn with_rng(store: S, policy: AssignmentPolicy, rng: StdRng) -> Self {
        Self {
            store,
            policy,
            rng: Mutex::new(rng),
        }
    }

    /// Create a team and upsert its members.
    ///
    /// Members already known under another team move to this one and take
    /// the username and active flag given here.
    pub async fn create_team(
        &self,
        team_name: &str,
        members: &[TeamMember],
    ) -> Result<Team, AppError> {
        let mut tx = self.store.begin().await?;

        if tx.team_exists(team_name).await? {
            log::debug!("[review] Team {} already exists", team_name);
            return Err(AppError::TeamExists {
                team_name: team_name.to_string(),
            });
        }

        tx.insert_team(team_name).await?;
        for member in members {
            tx.upsert_user(&User::from_member(member, team_name)).await?;
        }

        let members = tx.list_team_members(team_name).await?;
        tx.commit().await?;

        log::info!(
            "[review] Created team {} with {} members",
            team_name,
            members.len()
        );

        Ok(Team {
            team_name: team_name.to_string(),
            members,
        })
    }

    /// Get a team with its members ordered by username.
    pub async fn get_team(&self, team_name: &str) -> Result<Team, AppError> {
        let mut tx = self.store.begin_read().await?;

        if !tx.team_exists(team_name).await? {
            return Err(AppError::not_found_with_id("team", team_name));
        }

        let members = tx.list_team_members(team_name).await?;

        Ok(Team {
            team_name: team_name.to_string(),
            members,
        })
    }

    /// Set a user's active flag.
    ///
    /// Existing reviewer assignments are left untouched; the flag only
    /// affects future candidate selection.
    pub async fn set_user_active(&self, user_id: &str, is_active: bool) -> Result<User, AppError> {
        let mut tx = self.store.begin().await?;

        let user = tx
            .set_user_active(user_id, is_active)
            .await?
            .ok_or_else(|| AppError::not_found_with_id("user", user_id))?;

        tx.commit().await?;

        log::info!("[review] User {} is_active={}", user_id, is_active);
        Ok(user)
    }

    /// Create a pull request and assign reviewers from the author's team.
    pub async fn create_pr(
        &self,
        pull_request_id: &str,
        pull_request_name: &str,
        author_id: &str,
    ) -> Result<PullRequest, AppError> {
        let mut tx = self.store.begin().await?;

        if tx.pr_exists(pull_request_id).await? {
            return Err(AppError::PrExists {
                pull_request_id: pull_request_id.to_string(),
            });
        }

        let author = tx
            .get_user(author_id)
            .await?
            .ok_or_else(|| AppError::not_found_with_id("author", author_id))?;

        let candidates = tx
            .list_active_teammates(&author.team_name, &author.user_id)
            .await?;
        let reviewers = self.choose_reviewers(&candidates)?;

        let created_at = now();
        tx.insert_pr(&NewPullRequest {
            pull_request_id,
            pull_request_name,
            author_id,
            created_at,
        })
        .await?;

        for reviewer in &reviewers {
            tx.insert_reviewer_assignment(pull_request_id, reviewer)
                .await?;
        }

        tx.commit().await?;

        log::info!(
            "[review] Created PR {} by {} with reviewers {:?}",
            pull_request_id,
            author_id,
            reviewers
        );

        Ok(PullRequest {
            pull_request_id: pull_request_id.to_string(),
            pull_request_name: pull_request_name.to_string(),
            author_id: author_id.to_string(),
            status: PullRequestStatus::Open,
            assigned_reviewers: reviewers,
            created_at,
            merged_at: None,
        })
    }

    /// Merge a pull request.
    ///
    /// Merging an already merged pull request returns its current state
    /// unchanged.
    pub async fn merge_pr(&self, pull_request_id: &str) -> Result<PullRequest, AppError> {
        let mut tx = self.store.begin().await?;

        let mut pr = tx
            .get_pr(pull_request_id)
            .await?
            .ok_or_else(|| AppError::not_found_with_id("PR", pull_request_id))?;

        if pr.is_merged() {
            log::debug!("[review] PR {} already merged", pull_request_id);
            return Ok(pr);
        }

        let merged_at = now();
        tx.update_pr_status(pull_request_id, PullRequestStatus::Merged, Some(merged_at))
            .await?;
        tx.commit().await?;

        log::info!("[review] Merged PR {}", pull_request_id);

        pr.status = PullRequestStatus::Merged;
        pr.merged_at = Some(merged_at);
        Ok(pr)
    }

    /// Replace `old_user_id` on an open pull request with a random active
    /// teammate who is neither the author nor already reviewing it.
    pub async fn reassign_reviewer(
        &self,
        pull_request_id: &str,
        old_user_id: &str,
    ) -> Result<Reassignment, AppError> {
        let mut tx = self.store.begin().await?;

        let pr = tx
            .get_pr(pull_request_id)
            .await?
            .ok_or_else(|| AppError::not_found_with_id("PR", pull_request_id))?;

        if pr.is_merged() {
            return Err(AppError::PrMerged {
                pull_request_id: pull_request_id.to_string(),
            });
        }

        if !tx.is_assigned_reviewer(pull_request_id, old_user_id).await? {
            return Err(AppError::NotAssigned {
                pull_request_id: pull_request_id.to_string(),
                user_id: old_user_id.to_string(),
            });
        }

        let old_reviewer = tx
            .get_user(old_user_id)
            .await?
            .ok_or_else(|| AppError::not_found_with_id("user", old_user_id))?;

        let teammates = tx
            .list_active_teammates(&old_reviewer.team_name, &pr.author_id)
            .await?;
        let current = tx.list_reviewers(pull_request_id).await?;
        let candidates = selector::exclude(teammates, &current);

        let replacement = self
            .choose_replacement(&candidates)?
            .ok_or_else(|| AppError::NoCandidate {
                pull_request_id: pull_request_id.to_string(),
            })?;

        tx.delete_reviewer_assignment(pull_request_id, old_user_id)
            .await?;
        tx.insert_reviewer_assignment(pull_request_id, &replacement)
            .await?;

        let pr = tx
            .get_pr(pull_request_id)
            .await?
            .ok_or_else(|| AppError::internal("pull request vanished during reassignment"))?;

        tx.commit().await?;

        log::info!(
            "[review] Reassigned PR {} from {} to {}",
            pull_request_id,
            old_user_id,
            replacement
        );

        Ok(Reassignment {
            pr,
            replaced_by: replacement,
        })
    }

    /// Pull requests `user_id` currently reviews, newest first.
    ///
    /// Unknown users simply have no reviews.
    pub async fn get_user_reviews(&self, user_id: &str) -> Result<Vec<PullRequestShort>, AppError> {
        let mut tx = self.store.begin_read().await?;
        Ok(tx.list_reviewed_prs(user_id).await?)
    }

    /// Get the full state of a pull request.
    pub async fn get_pr(&self, pull_request_id: &str) -> Result<PullRequest, AppError> {
        let mut tx = self.store.begin_read().await?;
        tx.get_pr(pull_request_id)
            .await?
            .ok_or_else(|| AppError::not_found_with_id("PR", pull_request_id))
    }

    fn choose_reviewers(&self, candidates: &[String]) -> Result<Vec<String>, AppError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| AppError::internal("reviewer rng lock poisoned"))?;
        Ok(selector::select_reviewers(
            candidates,
            self.policy.reviewers_per_pr,
            &mut *rng,
        ))
    }

    fn choose_replacement(&self, candidates: &[String]) -> Result<Option<String>, AppError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| AppError::internal("reviewer rng lock poisoned"))?;
        Ok(selector::pick_replacement(candidates, &mut *rng))
    }
}
