//! PR review service - team-based pull request reviewer assignment.
//!
//! Teams of users are registered up front. Opening a pull request assigns
//! up to two random active teammates of the author as reviewers; reviewers
//! can later be swapped for another eligible teammate until the pull
//! request is merged.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod selector;
pub mod service;
pub mod store;

pub use error::AppError;
pub use service::{Reassignment, ReviewService};
