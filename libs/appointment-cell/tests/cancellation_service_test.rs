use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use appointment_cell::models::*;
use appointment_cell::services::cancellation::CancellationService;
use appointment_cell::services::store::InMemoryCancellationStore;

fn service() -> CancellationService {
    CancellationService::new(Arc::new(InMemoryCancellationStore::new()))
}

fn request(appointment_id: Uuid, reason: &str, cancelled_by: &str) -> CreateCancellationRequest {
    CreateCancellationRequest {
        appointment_id: Some(appointment_id),
        reason: reason.to_string(),
        reason_details: None,
        cancelled_by: cancelled_by.to_string(),
        cancelled_by_user: Some("user-42".to_string()),
    }
}

#[tokio::test]
async fn test_create_applies_defaults() {
    let service = service();
    let appointment_id = Uuid::new_v4();
    let before = Utc::now();

    let created = service
        .create_cancellation(request(appointment_id, "patient-request", "patient"), None)
        .await
        .unwrap();

    assert_eq!(created.appointment, appointment_id);
    assert_eq!(created.reason, CancellationReason::PatientRequest);
    assert_eq!(created.cancelled_by, CancelledBy::Patient);
    assert!(!created.is_rescheduled);
    assert_eq!(created.new_appointment, None);
    assert!(created.cancelled_at >= before && created.cancelled_at <= Utc::now());
}

#[tokio::test]
async fn test_round_trip_preserves_fields() {
    let service = service();
    let created = service
        .create_cancellation(request(Uuid::new_v4(), "doctor-unavailable", "doctor"), None)
        .await
        .unwrap();

    let reloaded = service.get_cancellation(created.id, None).await.unwrap();

    assert_eq!(reloaded.reason, created.reason);
    assert_eq!(reloaded.cancelled_by, created.cancelled_by);
    assert_eq!(reloaded.cancelled_by_user, "user-42");
    assert!((reloaded.cancelled_at - created.cancelled_at).num_seconds().abs() < 1);
}

#[tokio::test]
async fn test_invalid_reason_rejected() {
    let result = service()
        .create_cancellation(request(Uuid::new_v4(), "invalid-value", "patient"), None)
        .await;

    assert_matches!(result, Err(AppointmentError::InvalidReason(value)) if value == "invalid-value");
}

#[tokio::test]
async fn test_invalid_actor_role_rejected() {
    let result = service()
        .create_cancellation(request(Uuid::new_v4(), "weather", "nurse"), None)
        .await;

    assert_matches!(result, Err(AppointmentError::InvalidActorRole(_)));
}

#[tokio::test]
async fn test_missing_appointment_rejected() {
    let mut req = request(Uuid::new_v4(), "emergency", "system");
    req.appointment_id = None;

    let result = service().create_cancellation(req, None).await;
    assert_matches!(result, Err(AppointmentError::MissingAppointmentReference));
}

#[tokio::test]
async fn test_missing_actor_user_rejected() {
    let mut req = request(Uuid::new_v4(), "emergency", "system");
    req.cancelled_by_user = Some("   ".to_string());

    let result = service().create_cancellation(req, None).await;
    assert_matches!(result, Err(AppointmentError::ValidationError(_)));

    let mut absent = request(Uuid::new_v4(), "emergency", "system");
    absent.cancelled_by_user = None;
    let result = service().create_cancellation(absent, None).await;
    assert_matches!(result, Err(AppointmentError::ValidationError(_)));
}

#[tokio::test]
async fn test_reason_details_length_boundary() {
    let service = service();

    let mut at_limit = request(Uuid::new_v4(), "other", "admin");
    at_limit.reason_details = Some("a".repeat(500));
    let created = assert_ok!(service.create_cancellation(at_limit, None).await);
    assert_eq!(created.reason_details.as_deref().map(str::len), Some(500));

    let mut over_limit = request(Uuid::new_v4(), "other", "admin");
    over_limit.reason_details = Some("a".repeat(501));
    let err = assert_err!(service.create_cancellation(over_limit, None).await);
    assert_eq!(err, AppointmentError::ReasonDetailsTooLong { length: 501, max: 500 });
}

#[tokio::test]
async fn test_reason_details_are_trimmed() {
    let service = service();

    let mut padded = request(Uuid::new_v4(), "weather", "patient");
    padded.reason_details = Some(format!("  {}  ", "b".repeat(500)));
    let created = service.create_cancellation(padded, None).await.unwrap();
    assert_eq!(created.reason_details, Some("b".repeat(500)));

    let mut blank = request(Uuid::new_v4(), "weather", "patient");
    blank.reason_details = Some("   ".to_string());
    let created = service.create_cancellation(blank, None).await.unwrap();
    assert_eq!(created.reason_details, None);
}

#[tokio::test]
async fn test_link_reschedule_sets_flag() {
    let service = service();
    let created = service
        .create_cancellation(request(Uuid::new_v4(), "weather", "patient"), None)
        .await
        .unwrap();
    let replacement = Uuid::new_v4();

    let linked = service.link_reschedule(created.id, replacement, None).await.unwrap();
    assert!(linked.is_rescheduled);
    assert_eq!(linked.new_appointment, Some(replacement));

    // Everything else is untouched
    assert_eq!(linked.reason, created.reason);
    assert_eq!(linked.cancelled_at, created.cancelled_at);
}

#[tokio::test]
async fn test_link_reschedule_same_target_is_idempotent() {
    let service = service();
    let created = service
        .create_cancellation(request(Uuid::new_v4(), "weather", "patient"), None)
        .await
        .unwrap();
    let replacement = Uuid::new_v4();

    let first = service.link_reschedule(created.id, replacement, None).await.unwrap();
    let second = service.link_reschedule(created.id, replacement, None).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_link_reschedule_different_target_conflicts() {
    let service = service();
    let created = service
        .create_cancellation(request(Uuid::new_v4(), "weather", "patient"), None)
        .await
        .unwrap();
    let first = Uuid::new_v4();
    service.link_reschedule(created.id, first, None).await.unwrap();

    let result = service.link_reschedule(created.id, Uuid::new_v4(), None).await;
    assert_matches!(result, Err(AppointmentError::AlreadyRescheduled { existing }) if existing == first);
}

#[tokio::test]
async fn test_link_reschedule_unknown_or_self() {
    let service = service();
    let result = service.link_reschedule(Uuid::new_v4(), Uuid::new_v4(), None).await;
    assert_matches!(result, Err(AppointmentError::CancellationNotFound));

    let appointment_id = Uuid::new_v4();
    let created = service
        .create_cancellation(request(appointment_id, "weather", "patient"), None)
        .await
        .unwrap();
    let result = service.link_reschedule(created.id, appointment_id, None).await;
    assert_matches!(result, Err(AppointmentError::ValidationError(_)));
}

#[tokio::test]
async fn test_cancellations_for_appointment_newest_first() {
    let service = service();
    let appointment_id = Uuid::new_v4();

    let first = service
        .create_cancellation(request(appointment_id, "weather", "patient"), None)
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = service
        .create_cancellation(request(appointment_id, "emergency", "doctor"), None)
        .await
        .unwrap();
    service
        .create_cancellation(request(Uuid::new_v4(), "other", "admin"), None)
        .await
        .unwrap();

    let listed = service.cancellations_for_appointment(appointment_id, None).await.unwrap();
    assert_eq!(listed.iter().map(|c| c.id).collect::<Vec<_>>(), vec![second.id, first.id]);
}

#[tokio::test]
async fn test_recent_cancellations_respects_limit() {
    let service = service();
    for _ in 0..3 {
        service
            .create_cancellation(request(Uuid::new_v4(), "system-error", "system"), None)
            .await
            .unwrap();
    }

    let recent = service
        .recent_cancellations(CancellationListQuery { limit: Some(2) }, None)
        .await
        .unwrap();
    assert_eq!(recent.len(), 2);
}

#[tokio::test]
async fn test_summary_counts_window() {
    let service = service();
    let weather = service
        .create_cancellation(request(Uuid::new_v4(), "weather", "patient"), None)
        .await
        .unwrap();
    service
        .create_cancellation(request(Uuid::new_v4(), "weather", "doctor"), None)
        .await
        .unwrap();
    service
        .create_cancellation(request(Uuid::new_v4(), "emergency", "doctor"), None)
        .await
        .unwrap();
    service.link_reschedule(weather.id, Uuid::new_v4(), None).await.unwrap();

    let summary = service.cancellation_summary(None, None, None).await.unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.rescheduled, 1);
    assert_eq!(summary.by_reason.get(&CancellationReason::Weather), Some(&2));
    assert_eq!(summary.by_actor.get(&CancelledBy::Doctor), Some(&2));

    let future = service
        .cancellation_summary(Some(Utc::now() + Duration::hours(1)), None, None)
        .await
        .unwrap();
    assert_eq!(future.total, 0);

    let inverted = service
        .cancellation_summary(Some(Utc::now()), Some(Utc::now() - Duration::days(1)), None)
        .await;
    assert_matches!(inverted, Err(AppointmentError::ValidationError(_)));
}
