// libs/appointment-cell/src/services/store.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{AppointmentCancellation, AppointmentError};

/// Time window and size bound for listing recent cancellations.
#[derive(Debug, Clone, Copy)]
pub struct RecentWindow {
    pub limit: usize,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

impl RecentWindow {
    pub fn latest(limit: usize) -> Self {
        Self {
            limit,
            from_date: None,
            to_date: None,
        }
    }

    fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from_date.map_or(true, |from| at >= from)
            && self.to_date.map_or(true, |to| at <= to)
    }
}

/// Persistence boundary for cancellation records.
///
/// Records are insert-only apart from the reschedule link, and there is no delete.
#[async_trait]
pub trait CancellationStore: Send + Sync {
    async fn insert(
        &self,
        cancellation: &AppointmentCancellation,
        auth_token: Option<&str>,
    ) -> Result<AppointmentCancellation, AppointmentError>;

    async fn find_by_id(
        &self,
        id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Option<AppointmentCancellation>, AppointmentError>;

    /// Newest first.
    async fn find_by_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Vec<AppointmentCancellation>, AppointmentError>;

    /// Newest first.
    async fn list_recent(
        &self,
        window: RecentWindow,
        auth_token: Option<&str>,
    ) -> Result<Vec<AppointmentCancellation>, AppointmentError>;

    /// Sets the reschedule link only if the record is not linked yet.
    /// Returns `None` when no unlinked record with that id exists.
    async fn mark_rescheduled(
        &self,
        id: Uuid,
        new_appointment_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Option<AppointmentCancellation>, AppointmentError>;
}

// ==============================================================================
// SUPABASE (POSTGREST) STORE
// ==============================================================================

pub struct SupabaseCancellationStore {
    supabase: SupabaseClient,
    collection_path: String,
}

impl SupabaseCancellationStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            collection_path: config.cancellations_path(),
        }
    }

    fn parse_rows(rows: Vec<Value>) -> Result<Vec<AppointmentCancellation>, AppointmentError> {
        rows.into_iter()
            .map(|row| {
                let record: AppointmentCancellation = serde_json::from_value(row)
                    .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse cancellation: {}", e)))?;
                if let Err(e) = record.validate() {
                    warn!("Stored cancellation {} is inconsistent: {}", record.id, e);
                }
                Ok(record)
            })
            .collect()
    }

    async fn get_rows(&self, query: &str, auth_token: Option<&str>) -> Result<Vec<AppointmentCancellation>, AppointmentError> {
        let path = format!("{}?{}", self.collection_path, query);
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await.map_err(|e| {
            error!("Cancellation query failed: {}", e);
            AppointmentError::DatabaseError(e.to_string())
        })?;

        Self::parse_rows(rows)
    }
}

#[async_trait]
impl CancellationStore for SupabaseCancellationStore {
    async fn insert(
        &self,
        cancellation: &AppointmentCancellation,
        auth_token: Option<&str>,
    ) -> Result<AppointmentCancellation, AppointmentError> {
        let body = serde_json::to_value(cancellation)
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to encode cancellation: {}", e)))?;

        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            &self.collection_path,
            auth_token,
            Some(body),
            Some(SupabaseClient::return_representation()),
        ).await.map_err(|e| {
            error!("Failed to insert cancellation {}: {}", cancellation.id, e);
            AppointmentError::DatabaseError(e.to_string())
        })?;

        Self::parse_rows(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError("Failed to create cancellation".to_string()))
    }

    async fn find_by_id(
        &self,
        id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Option<AppointmentCancellation>, AppointmentError> {
        let rows = self.get_rows(&format!("id=eq.{}", id), auth_token).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_by_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Vec<AppointmentCancellation>, AppointmentError> {
        self.get_rows(
            &format!("appointment=eq.{}&order=cancelled_at.desc", appointment_id),
            auth_token,
        ).await
    }

    async fn list_recent(
        &self,
        window: RecentWindow,
        auth_token: Option<&str>,
    ) -> Result<Vec<AppointmentCancellation>, AppointmentError> {
        let mut query_parts = vec![
            "order=cancelled_at.desc".to_string(),
            format!("limit={}", window.limit),
        ];
        if let Some(from) = window.from_date {
            query_parts.push(format!("cancelled_at=gte.{}", urlencoding::encode(&from.to_rfc3339())));
        }
        if let Some(to) = window.to_date {
            query_parts.push(format!("cancelled_at=lte.{}", urlencoding::encode(&to.to_rfc3339())));
        }

        self.get_rows(&query_parts.join("&"), auth_token).await
    }

    async fn mark_rescheduled(
        &self,
        id: Uuid,
        new_appointment_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Option<AppointmentCancellation>, AppointmentError> {
        // The is_rescheduled filter makes the update a compare-and-set
        let path = format!("{}?id=eq.{}&is_rescheduled=eq.false", self.collection_path, id);
        let body = json!({
            "is_rescheduled": true,
            "new_appointment": new_appointment_id,
        });

        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            auth_token,
            Some(body),
            Some(SupabaseClient::return_representation()),
        ).await.map_err(|e| {
            error!("Failed to link cancellation {}: {}", id, e);
            AppointmentError::DatabaseError(e.to_string())
        })?;

        Ok(Self::parse_rows(rows)?.into_iter().next())
    }
}

// ==============================================================================
// IN-MEMORY STORE
// ==============================================================================

/// Process-local store used when no document store is configured.
#[derive(Default)]
pub struct InMemoryCancellationStore {
    records: RwLock<Vec<AppointmentCancellation>>,
}

impl InMemoryCancellationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn newest_first(mut records: Vec<AppointmentCancellation>) -> Vec<AppointmentCancellation> {
        records.sort_by(|a, b| b.cancelled_at.cmp(&a.cancelled_at));
        records
    }
}

#[async_trait]
impl CancellationStore for InMemoryCancellationStore {
    async fn insert(
        &self,
        cancellation: &AppointmentCancellation,
        _auth_token: Option<&str>,
    ) -> Result<AppointmentCancellation, AppointmentError> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id == cancellation.id) {
            return Err(AppointmentError::DatabaseError(format!(
                "duplicate cancellation id {}", cancellation.id
            )));
        }
        records.push(cancellation.clone());
        debug!("Stored cancellation {} in memory ({} total)", cancellation.id, records.len());
        Ok(cancellation.clone())
    }

    async fn find_by_id(
        &self,
        id: Uuid,
        _auth_token: Option<&str>,
    ) -> Result<Option<AppointmentCancellation>, AppointmentError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_appointment(
        &self,
        appointment_id: Uuid,
        _auth_token: Option<&str>,
    ) -> Result<Vec<AppointmentCancellation>, AppointmentError> {
        let records = self.records.read().await;
        let matching = records.iter()
            .filter(|r| r.appointment == appointment_id)
            .cloned()
            .collect();
        Ok(Self::newest_first(matching))
    }

    async fn list_recent(
        &self,
        window: RecentWindow,
        _auth_token: Option<&str>,
    ) -> Result<Vec<AppointmentCancellation>, AppointmentError> {
        let records = self.records.read().await;
        let in_window = records.iter()
            .filter(|r| window.contains(r.cancelled_at))
            .cloned()
            .collect();

        let mut newest = Self::newest_first(in_window);
        newest.truncate(window.limit);
        Ok(newest)
    }

    async fn mark_rescheduled(
        &self,
        id: Uuid,
        new_appointment_id: Uuid,
        _auth_token: Option<&str>,
    ) -> Result<Option<AppointmentCancellation>, AppointmentError> {
        let mut records = self.records.write().await;
        let Some(record) = records.iter_mut().find(|r| r.id == id && !r.is_rescheduled) else {
            return Ok(None);
        };

        record.is_rescheduled = true;
        record.new_appointment = Some(new_appointment_id);
        Ok(Some(record.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::models::{CancellationReason, CancelledBy};

    fn record_at(appointment: Uuid, at: DateTime<Utc>) -> AppointmentCancellation {
        let mut record = AppointmentCancellation::new(
            appointment,
            CancellationReason::PatientRequest,
            None,
            CancelledBy::Patient,
            "patient-1".to_string(),
        );
        record.cancelled_at = at;
        record
    }

    #[tokio::test]
    async fn test_in_memory_orders_newest_first() {
        let store = InMemoryCancellationStore::new();
        let appointment = Uuid::new_v4();
        let now = Utc::now();

        let older = record_at(appointment, now - Duration::hours(2));
        let newer = record_at(appointment, now);
        store.insert(&older, None).await.unwrap();
        store.insert(&newer, None).await.unwrap();
        store.insert(&record_at(Uuid::new_v4(), now), None).await.unwrap();

        let found = store.find_by_appointment(appointment, None).await.unwrap();
        assert_eq!(found.iter().map(|r| r.id).collect::<Vec<_>>(), vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn test_in_memory_window_and_limit() {
        let store = InMemoryCancellationStore::new();
        let now = Utc::now();
        for hours in 0..5 {
            store.insert(&record_at(Uuid::new_v4(), now - Duration::hours(hours)), None).await.unwrap();
        }

        let latest = store.list_recent(RecentWindow::latest(2), None).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert!(latest[0].cancelled_at >= latest[1].cancelled_at);

        let window = RecentWindow {
            limit: 10,
            from_date: Some(now - Duration::minutes(150)),
            to_date: None,
        };
        assert_eq!(store.list_recent(window, None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_in_memory_mark_rescheduled_only_once() {
        let store = InMemoryCancellationStore::new();
        let record = record_at(Uuid::new_v4(), Utc::now());
        store.insert(&record, None).await.unwrap();

        let first = Uuid::new_v4();
        let linked = store.mark_rescheduled(record.id, first, None).await.unwrap().unwrap();
        assert!(linked.is_linked_to(first));

        assert!(store.mark_rescheduled(record.id, Uuid::new_v4(), None).await.unwrap().is_none());
        assert!(store.mark_rescheduled(Uuid::new_v4(), first, None).await.unwrap().is_none());
    }
}
