// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, patch},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AppointmentCellState};

pub fn appointment_routes(config: Arc<AppConfig>) -> Router {
    let state = AppointmentCellState::new(config);
    appointment_routes_with_state(state)
}

pub fn appointment_routes_with_state(state: AppointmentCellState) -> Router {
    let config = state.config.clone();
    let state = Arc::new(state);

    // Cancellation records require authentication
    let protected_routes = Router::new()
        .route("/cancellations", post(handlers::create_cancellation))
        .route("/cancellations/recent", get(handlers::get_recent_cancellations))
        .route("/cancellations/summary", get(handlers::get_cancellation_summary))
        .route("/cancellations/{cancellation_id}", get(handlers::get_cancellation))
        .route("/cancellations/{cancellation_id}/reschedule", patch(handlers::link_reschedule))
        .route("/{appointment_id}/cancellations", get(handlers::get_appointment_cancellations))
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    // Pure display helpers
    let public_routes = Router::new()
        .route("/display/badge", get(handlers::get_status_badge))
        .route("/display/priority", post(handlers::get_priority_label));

    Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .with_state(state)
}
