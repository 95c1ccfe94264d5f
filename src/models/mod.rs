//! Data models for the review service.
//!
//! These models represent the teams, users, and pull requests stored by the
//! review store and returned to API clients.
//!
//! All models derive Serialize for JSON responses; flat records also derive
//! FromRow for SQLx queries.

pub mod pull_request;
pub mod team;
pub mod user;

// Re-exports for convenient access
pub use pull_request::{PullRequest, PullRequestShort, PullRequestStatus};
pub use team::Team;
pub use user::{TeamMember, User};
