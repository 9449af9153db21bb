use axum::{extract::{State, Path}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::{
    requests::RunLotteryRequest,
    responses::{DrawResponse, EntrantResponse},
};
use crate::error::AppError;
use std::sync::Arc;

pub async fn run_lottery(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Json(payload): Json<RunLotteryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = state.lifecycle.run_lottery(&event_id, payload.count as usize).await?;
    Ok(Json(DrawResponse::from(result)))
}

pub async fn draw_replacement(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entrant = state.lifecycle.draw_replacement(&event_id).await?;
    Ok(Json(EntrantResponse::from(entrant)))
}
