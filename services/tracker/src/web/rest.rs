//! services/tracker/src/web/rest.rs
//!
//! Contains the Axum handlers for the HTTP surface: presence events posted by
//! the hosting world, region administration, and visit queries.

use crate::web::protocol::{
    CreateRegionRequest, DeleteRegionResponse, RegionView, UserVisitsResponse,
};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use presence_core::{
    EventOutcome, HostEvent, Occupant, RegionDescriptor, RegionGeometry, TrackingError, Transform,
};
use std::sync::Arc;
use tracing::{error, warn};

type HandlerError = (StatusCode, String);

/// Maps a tracking failure onto an HTTP status, logging server-side faults.
fn reject(e: TrackingError) -> HandlerError {
    let status = match &e {
        TrackingError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        TrackingError::NotFound(_) => StatusCode::NOT_FOUND,
        TrackingError::DuplicateId(_) => StatusCode::CONFLICT,
        TrackingError::Persistence(_) => {
            error!("Persistence failure: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}

//=========================================================================================
// Presence Events
//=========================================================================================

/// Dispatches one event from the hosting world.
///
/// The roster learns about a join before the registry does, and forgets a
/// user only after their open sessions are closed.
pub async fn post_event_handler(
    State(state): State<Arc<AppState>>,
    Json(event): Json<HostEvent>,
) -> Result<Json<EventOutcome>, HandlerError> {
    let mut tracker = state.tracker.lock().await;

    let departing = match &event {
        HostEvent::UserJoined { user_id } => {
            state.roster.join(user_id);
            None
        }
        HostEvent::UserLeft { user_id } => Some(user_id.clone()),
        _ => None,
    };

    let result = tracker.dispatch(event).await;
    if let Some(user_id) = departing {
        state.roster.leave(&user_id);
    }

    result.map(Json).map_err(|e| {
        warn!("Event rejected: {}", e);
        reject(e)
    })
}

//=========================================================================================
// Region Administration
//=========================================================================================

pub async fn list_regions_handler(State(state): State<Arc<AppState>>) -> Json<Vec<RegionView>> {
    let tracker = state.tracker.lock().await;
    let views = tracker
        .regions()
        .into_iter()
        .map(|descriptor| {
            let occupants = tracker
                .region(&descriptor.id)
                .map(|region| region.occupant_count())
                .unwrap_or(0);
            RegionView {
                descriptor,
                occupants,
            }
        })
        .collect();
    Json(views)
}

pub async fn create_region_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRegionRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let mut tracker = state.tracker.lock().await;
    let descriptor = tracker
        .create_region(&request.id, request.geometry, request.transform)
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(descriptor)))
}

pub async fn delete_region_handler(
    State(state): State<Arc<AppState>>,
    Path(region_id): Path<String>,
) -> Result<Json<DeleteRegionResponse>, HandlerError> {
    let mut tracker = state.tracker.lock().await;
    let closed_visits = tracker.delete_region(&region_id).await.map_err(reject)?;
    Ok(Json(DeleteRegionResponse {
        region_id,
        closed_visits,
    }))
}

pub async fn resize_region_handler(
    State(state): State<Arc<AppState>>,
    Path(region_id): Path<String>,
    Json(geometry): Json<RegionGeometry>,
) -> Result<Json<RegionDescriptor>, HandlerError> {
    let mut tracker = state.tracker.lock().await;
    tracker
        .resize_region(&region_id, geometry)
        .await
        .map(Json)
        .map_err(reject)
}

pub async fn move_region_handler(
    State(state): State<Arc<AppState>>,
    Path(region_id): Path<String>,
    Json(transform): Json<Transform>,
) -> Result<Json<RegionDescriptor>, HandlerError> {
    let mut tracker = state.tracker.lock().await;
    tracker
        .move_region(&region_id, transform)
        .await
        .map(Json)
        .map_err(reject)
}

pub async fn list_occupants_handler(
    State(state): State<Arc<AppState>>,
    Path(region_id): Path<String>,
) -> Result<Json<Vec<Occupant>>, HandlerError> {
    let tracker = state.tracker.lock().await;
    tracker.occupants(&region_id).map(Json).map_err(reject)
}

//=========================================================================================
// Queries
//=========================================================================================

/// Every region record for a user. A user with no history gets an empty map.
pub async fn user_visits_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Json<UserVisitsResponse> {
    let tracker = state.tracker.lock().await;
    let visits = tracker.visits_for_user(&user_id);
    Json(UserVisitsResponse { user_id, visits })
}

/// The trigger volumes the host should currently have spawned.
pub async fn list_volumes_handler(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<RegionDescriptor>> {
    Json(state.volumes.snapshot())
}
