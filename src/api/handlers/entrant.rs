use axum::{extract::{State, Path, Query}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::{
    requests::{EmailQuery, EntrantListQuery, JoinWaitingListRequest, RespondInvitationRequest},
    responses::{EntrantResponse, RegistrationResponse},
};
use crate::domain::models::entrant::EntrantStatus;
use crate::domain::services::lifecycle::JoinRequest;
use crate::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;

pub async fn join_waiting_list(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Json(payload): Json<JoinWaitingListRequest>,
) -> Result<impl IntoResponse, AppError> {
    let entrant = state.lifecycle.join_waiting_list(&event_id, JoinRequest {
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
    }).await?;

    Ok((StatusCode::CREATED, Json(EntrantResponse::from(entrant))))
}

pub async fn list_entrants(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Query(query): Query<EntrantListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            EntrantStatus::parse(raw)
                .ok_or(AppError::Validation(format!("Unknown status: {}", raw)))?,
        ),
    };

    let entrants = state.lifecycle.list_entrants(&event_id, status).await?;
    let body: Vec<EntrantResponse> = entrants.into_iter().map(EntrantResponse::from).collect();
    Ok(Json(body))
}

pub async fn list_registrations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EmailQuery>,
) -> Result<impl IntoResponse, AppError> {
    let entrants = state.lifecycle.registration_history(&query.email).await?;

    let mut names: HashMap<String, String> = HashMap::new();
    let mut body = Vec::with_capacity(entrants.len());
    for entrant in entrants {
        let event_name = match names.get(&entrant.event_id) {
            Some(name) => name.clone(),
            None => {
                let name = state.event_repo.find_by_id(&entrant.event_id).await?
                    .map(|e| e.name)
                    .unwrap_or_default();
                names.insert(entrant.event_id.clone(), name.clone());
                name
            }
        };
        body.push(RegistrationResponse { entrant: EntrantResponse::from(entrant), event_name });
    }

    Ok(Json(body))
}

pub async fn get_entrant(
    State(state): State<Arc<AppState>>,
    Path(entrant_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entrant = state.lifecycle.get_entrant(&entrant_id).await?;
    Ok(Json(EntrantResponse::from(entrant)))
}

pub async fn cancel_entrant(
    State(state): State<Arc<AppState>>,
    Path(entrant_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entrant = state.lifecycle.cancel_entrant(&entrant_id).await?;
    Ok(Json(EntrantResponse::from(entrant)))
}

pub async fn leave_waiting_list(
    State(state): State<Arc<AppState>>,
    Path(entrant_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entrant = state.lifecycle.leave_waiting_list(&entrant_id).await?;
    Ok(Json(EntrantResponse::from(entrant)))
}

pub async fn respond_to_invitation(
    State(state): State<Arc<AppState>>,
    Path(entrant_id): Path<String>,
    Json(payload): Json<RespondInvitationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let entrant = state.lifecycle.respond_to_invitation(&entrant_id, payload.accept).await?;
    Ok(Json(EntrantResponse::from(entrant)))
}
