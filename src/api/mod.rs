//! HTTP API for the review service.
//!
//! JSON over HTTP. Every domain error is rendered as
//! `{"error": {"code", "message"}}` by [`error::ApiErr`].

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiErr;
pub use handlers::ApiState;
pub use server::serve;

use crate::service::ReviewService;
use crate::store::Store;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the API router.
///
/// Each request is dropped with `408 Request Timeout` once `request_timeout`
/// elapses, which rolls back whatever transaction it had open.
pub fn router<S: Store>(service: Arc<ReviewService<S>>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/team/add", post(handlers::create_team::<S>))
        .route("/team/get", get(handlers::get_team::<S>))
        .route("/users/setIsActive", post(handlers::set_is_active::<S>))
        .route("/users/getReview", get(handlers::get_user_reviews::<S>))
        .route("/pullRequest/create", post(handlers::create_pr::<S>))
        .route("/pullRequest/merge", post(handlers::merge_pr::<S>))
        .route("/pullRequest/reassign", post(handlers::reassign_reviewer::<S>))
        .route("/pullRequest/get", get(handlers::get_pr::<S>))
        .with_state(service)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    request_timeout,
                )),
        )
}
