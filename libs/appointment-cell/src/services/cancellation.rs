// libs/appointment-cell/src/services/cancellation.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_utils::text::{char_len, normalize_optional_text};

use crate::models::{
    AppointmentCancellation, AppointmentError, CancellationListQuery, CancellationReason,
    CancellationSummary, CancelledBy, CreateCancellationRequest, MAX_REASON_DETAILS_CHARS,
};
use crate::services::store::{
    CancellationStore, InMemoryCancellationStore, RecentWindow, SupabaseCancellationStore,
};

/// Upper bound on records scanned when building a summary.
pub const SUMMARY_SCAN_LIMIT: usize = 1000;

/// Creates and reads cancellation audit records.
///
/// Cancelling never touches the appointment's own status; callers update the
/// appointment separately and nothing here ties the two writes together.
#[derive(Clone)]
pub struct CancellationService {
    store: Arc<dyn CancellationStore>,
}

impl CancellationService {
    pub fn new(store: Arc<dyn CancellationStore>) -> Self {
        Self { store }
    }

    /// Supabase when the store is configured, otherwise an in-memory store.
    pub fn from_config(config: &AppConfig) -> Self {
        let store: Arc<dyn CancellationStore> = if config.is_configured() {
            info!("Using document store at {} for cancellations", config.supabase_url);
            Arc::new(SupabaseCancellationStore::new(config))
        } else {
            warn!("Document store not configured, cancellations will not survive a restart");
            Arc::new(InMemoryCancellationStore::new())
        };

        Self::new(store)
    }

    /// Validates the request and inserts a new, unlinked record stamped with the current time.
    pub async fn create_cancellation(
        &self,
        request: CreateCancellationRequest,
        auth_token: Option<&str>,
    ) -> Result<AppointmentCancellation, AppointmentError> {
        let cancellation = Self::build_cancellation(request).map_err(|e| {
            warn!("Rejected cancellation request: {}", e);
            e
        })?;

        debug!("Recording cancellation {} for appointment {}", cancellation.id, cancellation.appointment);
        let stored = self.store.insert(&cancellation, auth_token).await?;

        info!(
            "Appointment {} cancelled by {} ({}): {}",
            stored.appointment, stored.cancelled_by, stored.cancelled_by_user, stored.reason
        );
        Ok(stored)
    }

    fn build_cancellation(request: CreateCancellationRequest) -> Result<AppointmentCancellation, AppointmentError> {
        let appointment = request.appointment_id
            .ok_or(AppointmentError::MissingAppointmentReference)?;
        let reason: CancellationReason = request.reason.parse()?;
        let cancelled_by: CancelledBy = request.cancelled_by.parse()?;

        let reason_details = normalize_optional_text(request.reason_details.as_deref());
        if let Some(details) = &reason_details {
            let length = char_len(details);
            if length > MAX_REASON_DETAILS_CHARS {
                return Err(AppointmentError::ReasonDetailsTooLong {
                    length,
                    max: MAX_REASON_DETAILS_CHARS,
                });
            }
        }

        let cancelled_by_user = normalize_optional_text(request.cancelled_by_user.as_deref())
            .ok_or_else(|| AppointmentError::ValidationError("cancelled_by_user is required".to_string()))?;

        let cancellation = AppointmentCancellation::new(
            appointment,
            reason,
            reason_details,
            cancelled_by,
            cancelled_by_user,
        );
        cancellation.validate()?;
        Ok(cancellation)
    }

    /// Links a cancellation to the appointment that replaced it.
    ///
    /// Relinking to the same appointment is a no-op; relinking elsewhere is a conflict.
    pub async fn link_reschedule(
        &self,
        cancellation_id: Uuid,
        new_appointment_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<AppointmentCancellation, AppointmentError> {
        let current = self.get_cancellation(cancellation_id, auth_token).await?;

        if current.appointment == new_appointment_id {
            return Err(AppointmentError::ValidationError(
                "an appointment cannot replace itself".to_string()
            ));
        }

        if let Some(existing) = Self::existing_link(&current, new_appointment_id)? {
            return Ok(existing);
        }

        match self.store.mark_rescheduled(cancellation_id, new_appointment_id, auth_token).await? {
            Some(updated) => {
                updated.validate()?;
                info!("Cancellation {} rescheduled to appointment {}", cancellation_id, new_appointment_id);
                Ok(updated)
            }
            None => {
                // Lost a race with another link, or the record vanished
                let latest = self.get_cancellation(cancellation_id, auth_token).await?;
                Self::existing_link(&latest, new_appointment_id)?.ok_or_else(|| {
                    AppointmentError::DatabaseError(format!("cancellation {} could not be linked", cancellation_id))
                })
            }
        }
    }

    fn existing_link(
        record: &AppointmentCancellation,
        new_appointment_id: Uuid,
    ) -> Result<Option<AppointmentCancellation>, AppointmentError> {
        match record.new_appointment {
            Some(existing) if record.is_rescheduled && existing != new_appointment_id => {
                warn!("Cancellation {} already rescheduled to {}", record.id, existing);
                Err(AppointmentError::AlreadyRescheduled { existing })
            }
            Some(_) if record.is_rescheduled => Ok(Some(record.clone())),
            _ => Ok(None),
        }
    }

    pub async fn get_cancellation(
        &self,
        cancellation_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<AppointmentCancellation, AppointmentError> {
        debug!("Fetching cancellation: {}", cancellation_id);

        self.store.find_by_id(cancellation_id, auth_token).await?
            .ok_or(AppointmentError::CancellationNotFound)
    }

    pub async fn cancellations_for_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Vec<AppointmentCancellation>, AppointmentError> {
        debug!("Fetching cancellations for appointment: {}", appointment_id);
        self.store.find_by_appointment(appointment_id, auth_token).await
    }

    pub async fn recent_cancellations(
        &self,
        query: CancellationListQuery,
        auth_token: Option<&str>,
    ) -> Result<Vec<AppointmentCancellation>, AppointmentError> {
        let limit = query.effective_limit() as usize;
        debug!("Listing {} most recent cancellations", limit);
        self.store.list_recent(RecentWindow::latest(limit), auth_token).await
    }

    /// Counts by reason and actor over `[from_date, to_date]`, newest records first.
    pub async fn cancellation_summary(
        &self,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
        auth_token: Option<&str>,
    ) -> Result<CancellationSummary, AppointmentError> {
        if let (Some(from), Some(to)) = (from_date, to_date) {
            if from > to {
                return Err(AppointmentError::ValidationError(
                    "from_date must not be after to_date".to_string()
                ));
            }
        }

        let window = RecentWindow {
            limit: SUMMARY_SCAN_LIMIT,
            from_date,
            to_date,
        };
        let records = self.store.list_recent(window, auth_token).await?;
        if records.len() == SUMMARY_SCAN_LIMIT {
            warn!("Cancellation summary hit the scan limit of {} records", SUMMARY_SCAN_LIMIT);
        }

        Ok(CancellationSummary::from_records(&records, from_date, to_date))
    }
}
