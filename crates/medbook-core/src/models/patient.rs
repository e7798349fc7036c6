use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// A patient's medical profile as returned by `/api/patients/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    #[serde(default)]
    pub user: Option<i64>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub chronic_illness: Option<String>,
    #[serde(default)]
    pub current_medications: Option<String>,
    #[serde(default)]
    pub family_medical_history: Option<String>,
    #[serde(default)]
    pub emergency_contact_name: Option<String>,
    #[serde(default)]
    pub emergency_contact_phone: Option<String>,
    #[serde(default)]
    pub insurance_type: Option<String>,
    #[serde(default)]
    pub last_appointment: Option<String>,
    #[serde(default)]
    pub last_doctor: Option<String>,
}

impl Patient {
    pub fn display_name(&self) -> String {
        match self.user_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Patient #{}", self.id),
        }
    }

    /// Seed an edit form with the current values.
    pub fn to_update(&self) -> PatientUpdate {
        PatientUpdate {
            blood_type: self.blood_type.clone(),
            allergies: self.allergies.clone(),
            chronic_illness: self.chronic_illness.clone(),
            current_medications: self.current_medications.clone(),
            family_medical_history: self.family_medical_history.clone(),
            emergency_contact_name: self.emergency_contact_name.clone(),
            emergency_contact_phone: self.emergency_contact_phone.clone(),
            insurance_type: self.insurance_type.clone(),
            last_appointment: self.last_appointment.clone(),
            last_doctor: self.last_doctor.clone(),
        }
    }
}

/// Row in a doctor's patient list (`/api/doctor/patients/`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorPatient {
    #[serde(alias = "id")]
    pub patient_id: i64,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "phone_number")]
    pub phone: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default, alias = "last_appointment")]
    pub last_appointment_date: Option<String>,
    #[serde(default)]
    pub blood_type: Option<String>,
}

impl DoctorPatient {
    pub fn display_name(&self) -> String {
        self.full_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("Patient #{}", self.patient_id))
    }
}

/// The patient list comes back either bare or wrapped in a paginated envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PatientPage {
    Paginated {
        results: Vec<DoctorPatient>,
        #[serde(default)]
        count: Option<u64>,
    },
    List(Vec<DoctorPatient>),
}

impl PatientPage {
    pub fn into_patients(self) -> Vec<DoctorPatient> {
        match self {
            PatientPage::Paginated { results, .. } => results,
            PatientPage::List(list) => list,
        }
    }
}

/// Partial update; `None` fields are left untouched by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chronic_illness: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_medications: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_medical_history: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_contact_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_contact_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_appointment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_doctor: Option<String>,
}

impl PatientUpdate {
    pub fn is_empty(&self) -> bool {
        *self == PatientUpdate::default()
    }

    /// Set a field by its wire name, as typed on the command line.
    pub fn set_field(&mut self, name: &str, value: String) -> Result<(), ApiError> {
        let slot = match name {
            "blood_type" => &mut self.blood_type,
            "allergies" => &mut self.allergies,
            "chronic_illness" => &mut self.chronic_illness,
            "current_medications" => &mut self.current_medications,
            "family_medical_history" => &mut self.family_medical_history,
            "emergency_contact_name" => &mut self.emergency_contact_name,
            "emergency_contact_phone" => &mut self.emergency_contact_phone,
            "insurance_type" => &mut self.insurance_type,
            "last_appointment" => &mut self.last_appointment,
            "last_doctor" => &mut self.last_doctor,
            other => return Err(ApiError::Validation(format!("Unknown patient field '{}'", other))),
        };
        *slot = Some(value);
        Ok(())
    }
}

/// First-time medical profile (`/api/profiles/patient/setup/`).
#[derive(Debug, Clone, Default, Serialize)]
pub struct PatientProfileForm {
    #[serde(flatten)]
    pub fields: PatientUpdate,
}

impl PatientProfileForm {
    pub fn validate(&self) -> Result<(), ApiError> {
        let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        if !has(&self.fields.blood_type) && !has(&self.fields.allergies) && !has(&self.fields.chronic_illness) {
            return Err(ApiError::Validation(
                "Please fill in at least one of the medical information fields.".to_string(),
            ));
        }
        Ok(())
    }
}
