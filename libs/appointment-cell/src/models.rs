// libs/appointment-cell/src/models.rs
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_REASON_DETAILS_CHARS: usize = 500;
pub const DEFAULT_LIST_LIMIT: u32 = 20;
pub const MAX_LIST_LIMIT: u32 = 100;

// ==============================================================================
// APPOINTMENT STATUS
// ==============================================================================

/// Lifecycle status of an appointment. Owned by the appointment record, not by this cell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Booked,
    Upcoming,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "booked",
            AppointmentStatus::Upcoming => "upcoming",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booked" => Ok(AppointmentStatus::Booked),
            "upcoming" => Ok(AppointmentStatus::Upcoming),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(AppointmentError::ValidationError(format!("unknown appointment status '{}'", other))),
        }
    }
}

// ==============================================================================
// CANCELLATION TAXONOMY
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum CancellationReason {
    PatientRequest,
    DoctorUnavailable,
    Emergency,
    Weather,
    SystemError,
    Other,
}

impl CancellationReason {
    pub const ALL: [CancellationReason; 6] = [
        CancellationReason::PatientRequest,
        CancellationReason::DoctorUnavailable,
        CancellationReason::Emergency,
        CancellationReason::Weather,
        CancellationReason::SystemError,
        CancellationReason::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CancellationReason::PatientRequest => "patient-request",
            CancellationReason::DoctorUnavailable => "doctor-unavailable",
            CancellationReason::Emergency => "emergency",
            CancellationReason::Weather => "weather",
            CancellationReason::SystemError => "system-error",
            CancellationReason::Other => "other",
        }
    }
}

impl fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CancellationReason {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|reason| reason.as_str() == s)
            .ok_or_else(|| AppointmentError::InvalidReason(s.to_string()))
    }
}

/// Role of whoever performed the cancellation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Patient,
    Doctor,
    Admin,
    System,
}

impl CancelledBy {
    pub const ALL: [CancelledBy; 4] = [
        CancelledBy::Patient,
        CancelledBy::Doctor,
        CancelledBy::Admin,
        CancelledBy::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CancelledBy::Patient => "patient",
            CancelledBy::Doctor => "doctor",
            CancelledBy::Admin => "admin",
            CancelledBy::System => "system",
        }
    }
}

impl fmt::Display for CancelledBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CancelledBy {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| AppointmentError::InvalidActorRole(s.to_string()))
    }
}

// ==============================================================================
// CANCELLATION RECORD
// ==============================================================================

/// Audit entry describing why and by whom an appointment was cancelled.
///
/// `appointment`, `cancelled_by_user` and `new_appointment` are loose references:
/// nothing here checks that the referenced rows exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentCancellation {
    pub id: Uuid,
    pub appointment: Uuid,
    pub reason: CancellationReason,
    #[serde(default)]
    pub reason_details: Option<String>,
    pub cancelled_by: CancelledBy,
    pub cancelled_by_user: String,
    #[serde(default)]
    pub is_rescheduled: bool,
    #[serde(default)]
    pub new_appointment: Option<Uuid>,
    pub cancelled_at: DateTime<Utc>,
}

impl AppointmentCancellation {
    pub fn new(
        appointment: Uuid,
        reason: CancellationReason,
        reason_details: Option<String>,
        cancelled_by: CancelledBy,
        cancelled_by_user: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            appointment,
            reason,
            reason_details,
            cancelled_by,
            cancelled_by_user,
            is_rescheduled: false,
            new_appointment: None,
            cancelled_at: Utc::now(),
        }
    }

    /// `new_appointment` is set exactly when the record is flagged as rescheduled.
    pub fn validate(&self) -> Result<(), AppointmentError> {
        if self.is_rescheduled != self.new_appointment.is_some() {
            return Err(AppointmentError::ValidationError(format!(
                "cancellation {} has is_rescheduled={} but new_appointment={:?}",
                self.id, self.is_rescheduled, self.new_appointment
            )));
        }

        if let Some(details) = &self.reason_details {
            let length = details.chars().count();
            if length > MAX_REASON_DETAILS_CHARS {
                return Err(AppointmentError::ReasonDetailsTooLong {
                    length,
                    max: MAX_REASON_DETAILS_CHARS,
                });
            }
        }

        Ok(())
    }

    pub fn is_linked_to(&self, appointment_id: Uuid) -> bool {
        self.new_appointment == Some(appointment_id)
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Raw cancellation input. Enum fields stay strings so bad values surface as typed errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCancellationRequest {
    pub appointment_id: Option<Uuid>,
    pub reason: String,
    pub reason_details: Option<String>,
    pub cancelled_by: String,
    pub cancelled_by_user: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleLinkRequest {
    pub new_appointment_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancellationListQuery {
    pub limit: Option<u32>,
}

impl CancellationListQuery {
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancellationSummaryQuery {
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

/// Cancellation counts for reporting views.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CancellationSummary {
    pub total: u32,
    pub rescheduled: u32,
    pub by_reason: BTreeMap<CancellationReason, u32>,
    pub by_actor: BTreeMap<CancelledBy, u32>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

impl CancellationSummary {
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a AppointmentCancellation>,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
    ) -> Self {
        let mut summary = Self {
            from_date,
            to_date,
            ..Self::default()
        };

        for record in records {
            summary.total += 1;
            if record.is_rescheduled {
                summary.rescheduled += 1;
            }
            *summary.by_reason.entry(record.reason).or_insert(0) += 1;
            *summary.by_actor.entry(record.cancelled_by).or_insert(0) += 1;
        }

        summary
    }

    pub fn reschedule_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.rescheduled as f64 / self.total as f64
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Missing appointment reference")]
    MissingAppointmentReference,

    #[error("Invalid cancellation reason: {0}")]
    InvalidReason(String),

    #[error("Invalid actor role: {0}")]
    InvalidActorRole(String),

    #[error("Reason details too long: {length} characters (max {max})")]
    ReasonDetailsTooLong { length: usize, max: usize },

    #[error("Cancellation not found")]
    CancellationNotFound,

    #[error("Cancellation already rescheduled to appointment {existing}")]
    AlreadyRescheduled { existing: Uuid },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AppointmentError {
    /// Local input problems; retrying the same request cannot succeed.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppointmentError::MissingAppointmentReference
                | AppointmentError::InvalidReason(_)
                | AppointmentError::InvalidActorRole(_)
                | AppointmentError::ReasonDetailsTooLong { .. }
                | AppointmentError::ValidationError(_)
        )
    }
}
