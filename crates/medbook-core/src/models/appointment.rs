use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::api::ApiError;

use super::doctor::Specialty;

/// Appointment lifecycle state. Older front-end builds sent lowercase values
/// (`pending`, `confirmed`); anything unrecognised is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    Other(String),
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 3] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "SCHEDULED" => AppointmentStatus::Scheduled,
            "COMPLETED" => AppointmentStatus::Completed,
            "CANCELLED" | "CANCELED" => AppointmentStatus::Cancelled,
            _ => AppointmentStatus::Other(s.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AppointmentStatus::Scheduled => "SCHEDULED",
            AppointmentStatus::Completed => "COMPLETED",
            AppointmentStatus::Cancelled => "CANCELLED",
            AppointmentStatus::Other(s) => s.as_str(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            AppointmentStatus::Scheduled => "Scheduled".to_string(),
            AppointmentStatus::Completed => "Completed".to_string(),
            AppointmentStatus::Cancelled => "Cancelled".to_string(),
            AppointmentStatus::Other(s) => {
                let mut chars = s.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => "Unknown".to_string(),
                }
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self == AppointmentStatus::Cancelled
    }
}

impl From<String> for AppointmentStatus {
    fn from(s: String) -> Self {
        AppointmentStatus::parse(&s)
    }
}

impl From<AppointmentStatus> for String {
    fn from(status: AppointmentStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// A foreign key that some endpoints expand into an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelatedRecord {
    Id(i64),
    Expanded {
        #[serde(default)]
        id: Option<i64>,
        #[serde(default)]
        user_name: Option<String>,
    },
}

impl RelatedRecord {
    pub fn id(&self) -> Option<i64> {
        match self {
            RelatedRecord::Id(id) => Some(*id),
            RelatedRecord::Expanded { id, .. } => *id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            RelatedRecord::Id(_) => None,
            RelatedRecord::Expanded { user_name, .. } => user_name.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    #[serde(default)]
    pub patient: Option<RelatedRecord>,
    #[serde(default)]
    pub doctor: Option<RelatedRecord>,
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub patient_full_name: Option<String>,
    #[serde(default)]
    pub patient_first_name: Option<String>,
    #[serde(default)]
    pub patient_last_name: Option<String>,
    #[serde(default)]
    pub patient_email: Option<String>,
    #[serde(default)]
    pub specialty: Option<Specialty>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub date: Option<String>,
    /// `HH:MM` or `HH:MM:SS`
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default = "default_status")]
    pub status: AppointmentStatus,
}

fn default_status() -> AppointmentStatus {
    AppointmentStatus::Scheduled
}

impl Appointment {
    pub fn patient_id(&self) -> Option<i64> {
        self.patient.as_ref().and_then(RelatedRecord::id)
    }

    pub fn doctor_id(&self) -> Option<i64> {
        self.doctor.as_ref().and_then(RelatedRecord::id)
    }

    /// Best available patient name; serializers disagree on where it lives.
    pub fn patient_display_name(&self) -> String {
        let non_empty = |s: &Option<String>| s.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

        if let Some(name) = non_empty(&self.patient_name) {
            return name;
        }
        if let Some(name) = self.patient.as_ref().and_then(RelatedRecord::name) {
            return name.to_string();
        }
        if let Some(name) = non_empty(&self.patient_full_name) {
            return name;
        }
        if let (Some(first), Some(last)) = (non_empty(&self.patient_first_name), non_empty(&self.patient_last_name)) {
            return format!("{} {}", first, last);
        }
        if let Some(email) = non_empty(&self.patient_email) {
            return email;
        }
        match self.patient_id() {
            Some(id) => format!("Patient #{}", id),
            None => "Unknown patient".to_string(),
        }
    }

    pub fn doctor_display_name(&self) -> String {
        if let Some(name) = self.doctor_name.as_deref().filter(|s| !s.trim().is_empty()) {
            return name.to_string();
        }
        if let Some(name) = self.doctor.as_ref().and_then(RelatedRecord::name) {
            return name.to_string();
        }
        match self.doctor_id() {
            Some(id) => format!("Doctor #{}", id),
            None => "Unassigned".to_string(),
        }
    }

    pub fn scheduled_at(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::parse_from_str(self.date.as_deref()?, "%Y-%m-%d").ok()?;
        let time = match self.time.as_deref().and_then(parse_time) {
            Some(time) => time,
            None => NaiveTime::from_hms_opt(0, 0, 0)?,
        };
        Some(date.and_time(time))
    }
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// Booking payload for `POST /api/appointments/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub specialty: Specialty,
    pub date: String,
    pub time: String,
    pub doctor: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

impl NewAppointment {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.specialty.as_str().trim().is_empty() || self.date.trim().is_empty() || self.time.trim().is_empty() {
            return Err(ApiError::Validation("Please fill in all required fields".to_string()));
        }
        if NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").is_err() {
            return Err(ApiError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", self.date)));
        }
        if parse_time(self.time.trim()).is_none() {
            return Err(ApiError::Validation(format!("Invalid time '{}', expected HH:MM", self.time)));
        }
        Ok(())
    }
}
