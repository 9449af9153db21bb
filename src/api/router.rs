use axum::{
    body::Body,
    extract::Request,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{health, event, entrant, lottery, notification};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Events
        .route("/api/v1/events", post(event::create_event).get(event::list_events))
        .route("/api/v1/events/{event_id}", get(event::get_event))
        .route("/api/v1/events/{event_id}/capacity/reconcile", post(event::reconcile_capacity))

        // Waiting list
        .route("/api/v1/events/{event_id}/waiting-list", post(entrant::join_waiting_list))
        .route("/api/v1/events/{event_id}/entrants", get(entrant::list_entrants))

        // Draws
        .route("/api/v1/events/{event_id}/lottery", post(lottery::run_lottery))
        .route("/api/v1/events/{event_id}/replacement", post(lottery::draw_replacement))

        // Entrant lifecycle
        .route("/api/v1/entrants", get(entrant::list_registrations))
        .route("/api/v1/entrants/{entrant_id}", get(entrant::get_entrant))
        .route("/api/v1/entrants/{entrant_id}/cancel", post(entrant::cancel_entrant))
        .route("/api/v1/entrants/{entrant_id}/leave", post(entrant::leave_waiting_list))
        .route("/api/v1/entrants/{entrant_id}/respond", post(entrant::respond_to_invitation))

        // Notifications
        .route("/api/v1/notifications", get(notification::list_for_recipient))
        .route("/api/v1/events/{event_id}/notifications", get(notification::list_for_event))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .with_state(state)
}
