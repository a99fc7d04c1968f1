// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, CancellationListQuery, CancellationSummaryQuery, CreateCancellationRequest,
    RescheduleLinkRequest,
};
use crate::services::cancellation::CancellationService;
use crate::services::display::{badge_text, badge_variant, priority_label_from_value};

/// Shared state for the appointment routes.
#[derive(Clone)]
pub struct AppointmentCellState {
    pub config: Arc<AppConfig>,
    pub cancellations: CancellationService,
}

impl AppointmentCellState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let cancellations = CancellationService::from_config(&config);
        Self { config, cancellations }
    }
}

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct BadgeQuery {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct PriorityLabelRequest {
    #[serde(default)]
    pub priority: Value,
    pub label: Option<String>,
}

fn to_app_error(error: AppointmentError) -> AppError {
    match error {
        AppointmentError::CancellationNotFound => AppError::NotFound("Cancellation not found".to_string()),
        e @ AppointmentError::AlreadyRescheduled { .. } => AppError::Conflict(e.to_string()),
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        e if e.is_validation() => AppError::ValidationError(e.to_string()),
        e => AppError::Internal(e.to_string()),
    }
}

// ==============================================================================
// CANCELLATION HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_cancellation(
    State(state): State<Arc<AppointmentCellState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(mut request): Json<CreateCancellationRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    // The acting user defaults to the caller
    if request.cancelled_by_user.as_deref().map_or(true, |id| id.trim().is_empty()) {
        request.cancelled_by_user = Some(user.id.clone());
    }

    let cancellation = state.cancellations
        .create_cancellation(request, Some(auth.token()))
        .await
        .map_err(to_app_error)?;

    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "cancellation": cancellation,
        "message": "Cancellation recorded successfully"
    }))))
}

#[axum::debug_handler]
pub async fn get_cancellation(
    State(state): State<Arc<AppointmentCellState>>,
    Path(cancellation_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let cancellation = state.cancellations
        .get_cancellation(cancellation_id, Some(auth.token()))
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(cancellation)))
}

#[axum::debug_handler]
pub async fn link_reschedule(
    State(state): State<Arc<AppointmentCellState>>,
    Path(cancellation_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<RescheduleLinkRequest>,
) -> Result<Json<Value>, AppError> {
    let cancellation = state.cancellations
        .link_reschedule(cancellation_id, request.new_appointment_id, Some(auth.token()))
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "cancellation": cancellation,
        "message": "Cancellation linked to rescheduled appointment"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment_cancellations(
    State(state): State<Arc<AppointmentCellState>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let cancellations = state.cancellations
        .cancellations_for_appointment(appointment_id, Some(auth.token()))
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "appointment_id": appointment_id,
        "cancellations": cancellations,
        "total": cancellations.len()
    })))
}

#[axum::debug_handler]
pub async fn get_recent_cancellations(
    State(state): State<Arc<AppointmentCellState>>,
    Query(query): Query<CancellationListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let cancellations = state.cancellations
        .recent_cancellations(query, Some(auth.token()))
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "cancellations": cancellations,
        "total": cancellations.len()
    })))
}

#[axum::debug_handler]
pub async fn get_cancellation_summary(
    State(state): State<Arc<AppointmentCellState>>,
    Query(query): Query<CancellationSummaryQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() && !user.has_role("doctor") {
        return Err(AppError::Auth("Only doctors and admins can view cancellation reports".to_string()));
    }

    let summary = state.cancellations
        .cancellation_summary(query.from_date, query.to_date, Some(auth.token()))
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(summary)))
}

// ==============================================================================
// DISPLAY HANDLERS
// ==============================================================================

pub async fn get_status_badge(Query(query): Query<BadgeQuery>) -> Json<Value> {
    Json(json!({
        "status": query.status,
        "variant": badge_variant(&query.status),
        "text": badge_text(&query.status)
    }))
}

pub async fn get_priority_label(Json(request): Json<PriorityLabelRequest>) -> Json<Value> {
    Json(json!({
        "label": priority_label_from_value(&request.priority, request.label.as_deref())
    }))
}
