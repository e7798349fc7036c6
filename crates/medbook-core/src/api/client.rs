//! Typed client for the medbook REST API.
//!
//! Every call goes through [`AuthenticatedSession::request`], so token
//! refresh and the login redirect signal are handled in one place. This layer
//! only turns statuses into [`ApiError`]s and bodies into models.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::{AuthenticatedSession, CredentialStore};
use crate::models::{
    Appointment, AppointmentStatus, Dashboard, Doctor, DoctorPatient, DoctorProfileForm, NewAppointment,
    Patient, PatientPage, PatientProfileForm, PatientUpdate, Specialty, UserAccount,
};

use super::request::{ApiRequest, ApiResponse};
use super::transport::{ReqwestTransport, Transport};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

pub struct MedbookClient<T = ReqwestTransport> {
    session: Arc<AuthenticatedSession<T>>,
    initial_backoff: Duration,
}

impl<T> Clone for MedbookClient<T> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            initial_backoff: self.initial_backoff,
        }
    }
}

impl MedbookClient<ReqwestTransport> {
    /// Client against `base_url` using the default endpoints.
    pub fn connect(
        base_url: &str,
        timeout: Duration,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(base_url, timeout)?;
        Ok(Self::new(Arc::new(AuthenticatedSession::new(transport, store))))
    }
}

impl<T: Transport> MedbookClient<T> {
    pub fn new(session: Arc<AuthenticatedSession<T>>) -> Self {
        Self {
            session,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }

    /// Override the first 429 backoff; it doubles on each retry.
    pub fn with_backoff(mut self, initial: Duration) -> Self {
        self.initial_backoff = initial;
        self
    }

    pub fn session(&self) -> &AuthenticatedSession<T> {
        &self.session
    }

    /// Send through the session, retrying 429s with exponential backoff.
    /// Returns only successful responses.
    async fn send(&self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let response = self.session.request(req).await?;
            if response.is_success() {
                return Ok(response);
            }
            if response.status != 429 {
                debug!(path = %req.path, status = response.status, "Request failed");
                return Err(ApiError::from_status(response.status, &response.body));
            }

            retries += 1;
            if retries > MAX_RATE_LIMIT_RETRIES {
                return Err(ApiError::RateLimited);
            }
            warn!(path = %req.path, retry = retries, backoff_ms = (backoff.as_millis() as u64), "Rate limited, backing off");
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }

    async fn fetch<R: DeserializeOwned>(&self, req: ApiRequest) -> Result<R, ApiError> {
        self.send(&req).await?.json()
    }

    async fn execute(&self, req: ApiRequest) -> Result<(), ApiError> {
        self.send(&req).await.map(|_| ())
    }

    // ===== Account =====

    pub async fn dashboard(&self) -> Result<Dashboard, ApiError> {
        self.fetch(ApiRequest::get("/dashboard/")).await
    }

    pub async fn current_user(&self) -> Result<UserAccount, ApiError> {
        self.fetch(ApiRequest::get("/api/user/profile/")).await
    }

    /// Dashboard and appointment list fetched concurrently.
    pub async fn overview(&self) -> Result<(Dashboard, Vec<Appointment>), ApiError> {
        futures::try_join!(self.dashboard(), self.appointments())
    }

    // ===== Doctors =====

    pub async fn doctors(&self) -> Result<Vec<Doctor>, ApiError> {
        self.fetch(ApiRequest::get("/api/doctors/")).await
    }

    pub async fn doctor(&self, id: i64) -> Result<Doctor, ApiError> {
        self.fetch(ApiRequest::get(format!("/api/doctors/{}/", id))).await
    }

    /// Specialty wire value -> display label, as the backend defines them.
    pub async fn doctor_specialties(&self) -> Result<BTreeMap<String, String>, ApiError> {
        self.fetch(ApiRequest::get("/api/doctors/specialties/")).await
    }

    pub async fn doctors_by_specialty(&self, specialty: &Specialty) -> Result<Vec<Doctor>, ApiError> {
        self.fetch(ApiRequest::get(format!("/api/doctors/specialty/{}/", specialty.as_str())))
            .await
    }

    // ===== Appointments =====

    /// Appointments visible to the current account; the backend scopes them by role.
    pub async fn appointments(&self) -> Result<Vec<Appointment>, ApiError> {
        self.fetch(ApiRequest::get("/api/appointments/")).await
    }

    pub async fn book_appointment(&self, booking: &NewAppointment) -> Result<Appointment, ApiError> {
        booking.validate()?;
        self.fetch(ApiRequest::post("/api/appointments/").json(booking)?).await
    }

    pub async fn cancel_appointment(&self, id: i64) -> Result<(), ApiError> {
        self.execute(ApiRequest::delete(format!("/api/appointments/{}/", id))).await
    }

    pub async fn update_appointment_status(&self, id: i64, status: &AppointmentStatus) -> Result<(), ApiError> {
        let req = ApiRequest::put(format!("/api/appointments/{}/status/", id))
            .with_body(serde_json::json!({ "status": status.as_str() }));
        self.execute(req).await
    }

    /// Appointments for one patient. The `patient` query is only a hint: some
    /// backends ignore it and answer 200 with everything, others reject it,
    /// so the result is always filtered here.
    pub async fn patient_appointments(&self, patient_id: i64) -> Result<Vec<Appointment>, ApiError> {
        let requested = self
            .fetch::<Vec<Appointment>>(ApiRequest::get("/api/appointments/").query("patient", patient_id))
            .await;
        let list = match requested {
            Ok(list) => list,
            Err(e @ (ApiError::ServerError { .. } | ApiError::NotFound(_) | ApiError::InvalidResponse(_))) => {
                debug!(patient_id, error = %e, "Patient filter unsupported, fetching all appointments");
                self.appointments().await?
            }
            Err(e) => return Err(e),
        };
        Ok(list.into_iter().filter(|a| a.patient_id() == Some(patient_id)).collect())
    }

    // ===== Patients =====

    pub async fn patients(&self) -> Result<Vec<Patient>, ApiError> {
        self.fetch(ApiRequest::get("/api/patients/")).await
    }

    pub async fn patient(&self, id: i64) -> Result<Patient, ApiError> {
        self.fetch(ApiRequest::get(format!("/api/patients/{}/", id))).await
    }

    pub async fn update_patient(&self, id: i64, update: &PatientUpdate) -> Result<Patient, ApiError> {
        if update.is_empty() {
            return Err(ApiError::Validation("Nothing to update".to_string()));
        }
        self.fetch(ApiRequest::put(format!("/api/patients/{}/", id)).json(update)?).await
    }

    pub async fn delete_patient(&self, id: i64) -> Result<(), ApiError> {
        self.execute(ApiRequest::delete(format!("/api/patients/{}/", id))).await
    }

    /// The signed-in doctor's patients.
    pub async fn doctor_patients(&self) -> Result<Vec<DoctorPatient>, ApiError> {
        let page: PatientPage = self.fetch(ApiRequest::get("/api/doctor/patients/")).await?;
        Ok(page.into_patients())
    }

    pub async fn doctor_patient(&self, id: i64) -> Result<Patient, ApiError> {
        self.fetch(ApiRequest::get(format!("/api/doctor/patients/{}/", id))).await
    }

    pub async fn doctor_update_patient(&self, id: i64, update: &PatientUpdate) -> Result<Patient, ApiError> {
        if update.is_empty() {
            return Err(ApiError::Validation("Nothing to update".to_string()));
        }
        self.fetch(ApiRequest::put(format!("/api/doctor/patients/{}/update/", id)).json(update)?)
            .await
    }

    // ===== Profile setup =====

    pub async fn setup_patient_profile(&self, form: &PatientProfileForm) -> Result<Patient, ApiError> {
        form.validate()?;
        self.fetch(ApiRequest::post("/api/profiles/patient/setup/").json(form)?).await
    }

    pub async fn setup_doctor_profile(&self, form: &DoctorProfileForm) -> Result<Doctor, ApiError> {
        form.validate()?;
        self.fetch(ApiRequest::post("/api/profiles/doctor/setup/").json(form)?).await
    }
}
