use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// Specialty values the backend is known to use, with display labels.
/// The backend mixes casing (`ortho`, `cardio`), so values are kept verbatim.
const KNOWN_SPECIALTIES: &[(&str, &str)] = &[
    ("GENERALDOCTOR", "General Doctor"),
    ("DENTIST", "Dentist"),
    ("ONCOLOGIST", "Oncologist"),
    ("ortho", "Orthopaedic"),
    ("OPTICIAN", "Optician"),
    ("PAEDIATRICIAN", "Paediatrician"),
    ("cardio", "Cardiologist"),
];

/// A doctor's specialty, stored as the exact wire value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Specialty(pub String);

impl Specialty {
    pub fn new(value: impl Into<String>) -> Self {
        Specialty(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve user input ("dentist", "Orthopaedic", "cardio") to a known
    /// value; unknown input is kept as typed.
    pub fn from_input(input: &str) -> Self {
        let trimmed = input.trim();
        KNOWN_SPECIALTIES
            .iter()
            .find(|(value, label)| value.eq_ignore_ascii_case(trimmed) || label.eq_ignore_ascii_case(trimmed))
            .map(|(value, _)| Specialty::new(*value))
            .unwrap_or_else(|| Specialty::new(trimmed))
    }

    pub fn label(&self) -> &str {
        KNOWN_SPECIALTIES
            .iter()
            .find(|(value, _)| *value == self.0)
            .map(|(_, label)| *label)
            .unwrap_or(self.0.as_str())
    }

    pub fn known() -> Vec<Specialty> {
        KNOWN_SPECIALTIES.iter().map(|(v, _)| Specialty::new(*v)).collect()
    }
}

impl std::fmt::Display for Specialty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: i64,
    #[serde(default)]
    pub user: Option<i64>,
    #[serde(default, alias = "user_full_name")]
    pub user_name: Option<String>,
    #[serde(default)]
    pub specialty: Option<Specialty>,
    #[serde(default)]
    pub specialty_display: Option<String>,
    #[serde(default)]
    pub hospital: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
}

impl Doctor {
    pub fn display_name(&self) -> String {
        match self.user_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => format!("Dr. {}", name),
            _ => format!("Doctor #{}", self.id),
        }
    }

    pub fn specialty_label(&self) -> String {
        self.specialty_display
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| self.specialty.as_ref().map(|s| s.label().to_string()))
            .unwrap_or_else(|| "-".to_string())
    }
}

/// Payload for `/api/profiles/doctor/setup/`.
#[derive(Debug, Clone, Serialize)]
pub struct DoctorProfileForm {
    pub specialty: Specialty,
    pub hospital: String,
    pub license_number: String,
}

impl DoctorProfileForm {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.specialty.as_str().trim().is_empty() {
            return Err(ApiError::Validation("Please choose a specialty".to_string()));
        }
        if self.license_number.trim().is_empty() {
            return Err(ApiError::Validation("License number is required".to_string()));
        }
        Ok(())
    }
}
