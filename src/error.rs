//! Application error types.
//!
//! Domain failures carry a stable code that the HTTP layer exposes to
//! clients. Infrastructure failures collapse into a single internal error
//! code; their detail is kept for server-side logs only.

use thiserror::Error;

/// Errors returned by the review workflow operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// A team with this name already exists.
    #[error("team_name already exists")]
    TeamExists { team_name: String },

    /// A pull request with this ID already exists.
    #[error("PR id already exists")]
    PrExists { pull_request_id: String },

    /// The pull request is merged and its reviewers are frozen.
    #[error("cannot reassign on merged PR")]
    PrMerged { pull_request_id: String },

    /// The user is not an assigned reviewer of the pull request.
    #[error("reviewer is not assigned to this PR")]
    NotAssigned {
        pull_request_id: String,
        user_id: String,
    },

    /// No active teammate is left to take over the review.
    #[error("no active replacement candidate in team")]
    NoCandidate { pull_request_id: String },

    /// Requested resource not found.
    #[error("{resource} not found")]
    NotFound { resource: String, id: Option<String> },

    /// Invalid input provided.
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// The review store failed.
    #[error("Database error: {message}")]
    Database { message: String },

    /// Internal application error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Create a not found error with ID.
    pub fn not_found_with_id(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: Some(id.into()),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: None,
        }
    }

    /// Create an invalid input error with field name.
    pub fn invalid_input_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TeamExists { .. } => "TEAM_EXISTS",
            Self::PrExists { .. } => "PR_EXISTS",
            Self::PrMerged { .. } => "PR_MERGED",
            Self::NotAssigned { .. } => "NOT_ASSIGNED",
            Self::NoCandidate { .. } => "NO_CANDIDATE",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidInput { .. } => "INVALID_REQUEST",
            Self::Database { .. } | Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Whether this is an infrastructure failure rather than a domain outcome.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Database { .. } | Self::Internal { .. })
    }
}

impl From<crate::store::StoreError> for AppError {
    fn from(err: crate::store::StoreError) -> Self {
        Self::Database {
            message: err.to_string(),
        }
    }
}
