use axum::{extract::{State, Path, Query}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::requests::EmailQuery;
use crate::error::AppError;
use std::sync::Arc;

pub async fn list_for_recipient(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EmailQuery>,
) -> Result<impl IntoResponse, AppError> {
    if query.email.trim().is_empty() {
        return Err(AppError::Validation("email is required".into()));
    }
    let notifications = state.notification_repo.list_by_recipient(&query.email).await?;
    Ok(Json(notifications))
}

pub async fn list_for_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.event_repo.find_by_id(&event_id).await?
        .ok_or(AppError::NotFound("Event not found".into()))?;

    let notifications = state.notification_repo.list_for_event(&event_id).await?;
    Ok(Json(notifications))
}
