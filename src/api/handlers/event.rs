use axum::{extract::{State, Path}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::{
    requests::CreateEventRequest,
    responses::{CapacityResponse, EventResponse},
};
use crate::domain::models::{entrant::EntrantStatus, event::{Event, NewEventParams}};
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

async fn with_counts(state: &AppState, event: Event) -> Result<EventResponse, AppError> {
    let waiting_count = state.entrant_repo.count_by_status(&event.id, EntrantStatus::Waiting).await?;
    Ok(EventResponse {
        has_available_spots: event.capacity().has_available_spots(),
        waiting_count,
        event,
    })
}

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("Event name is required".into()));
    }
    if payload.max_capacity < 1 {
        return Err(AppError::Validation("max_capacity must be at least 1".into()));
    }
    let max_waiting_list_size = payload.max_waiting_list_size.unwrap_or(0);
    if max_waiting_list_size < 0 {
        return Err(AppError::Validation("max_waiting_list_size cannot be negative".into()));
    }

    let event = Event::new(NewEventParams {
        name,
        description: payload.description.unwrap_or_default(),
        max_capacity: payload.max_capacity,
        max_waiting_list_size,
    });
    let created = state.event_repo.create(&event).await?;

    info!("Created event: {} ({})", created.name, created.id);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let events = state.event_repo.list().await?;
    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = state.event_repo.find_by_id(&event_id).await?
        .ok_or(AppError::NotFound("Event not found".into()))?;

    Ok(Json(with_counts(&state, event).await?))
}

pub async fn reconcile_capacity(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let capacity = state.lifecycle.reconcile_capacity(&event_id).await?;
    Ok(Json(CapacityResponse { event_id, capacity }))
}
