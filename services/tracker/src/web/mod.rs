pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

pub use rest::{
    create_region_handler, delete_region_handler, list_occupants_handler, list_regions_handler,
    list_volumes_handler, move_region_handler, post_event_handler, resize_region_handler,
    user_visits_handler,
};
pub use state::AppState;

/// Builds the complete HTTP router over the shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/events", post(post_event_handler))
        .route("/regions", get(list_regions_handler).post(create_region_handler))
        .route("/regions/{id}", axum::routing::delete(delete_region_handler))
        .route("/regions/{id}/size", put(resize_region_handler))
        .route("/regions/{id}/transform", put(move_region_handler))
        .route("/regions/{id}/occupants", get(list_occupants_handler))
        .route("/users/{user_id}/visits", get(user_visits_handler))
        .route("/volumes", get(list_volumes_handler))
        .with_state(state)
}
