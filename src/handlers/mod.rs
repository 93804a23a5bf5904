mod health;
mod metrics;
mod spendings;
mod users;

use axum::{Router, middleware, routing::{get, post}};
use std::sync::Arc;

use crate::error::ApiError;
use crate::middleware::admission;
use crate::state::AppState;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use spendings::{create_spending, delete_spending, find_spending, find_user_spendings, update_spending};
pub use users::{create_user, delete_user, find_user, update_user};

// Every route, including unknown paths, passes the admission layer first
pub fn router(state: Arc<AppState>) -> Router {
    let limiter = Arc::clone(&state.limiter);

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/v1/users", post(create_user))
        .route(
            "/api/v1/users/{user_id}",
            get(find_user).put(update_user).delete(delete_user),
        )
        .route("/api/v1/users/{user_id}/spendings", get(find_user_spendings))
        .route("/api/v1/spendings", post(create_spending))
        .route(
            "/api/v1/spendings/{spending_id}",
            get(find_spending).put(update_spending).delete(delete_spending),
        )
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(limiter, admission))
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound("route".to_string())
}
