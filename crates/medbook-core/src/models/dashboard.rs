use serde::{Deserialize, Serialize};

use super::doctor::Doctor;
use super::patient::Patient;
use super::person::{Role, UserAccount};

/// Landing payload from `/dashboard/`. Which profile is present depends on
/// the account's role; the backend flags accounts whose profile does not
/// match their role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dashboard {
    #[serde(default)]
    pub user: Option<UserAccount>,
    #[serde(default)]
    pub patient: Option<Patient>,
    #[serde(default)]
    pub doctor: Option<Doctor>,
    #[serde(default)]
    pub role_mismatch: bool,
}

impl Dashboard {
    pub fn role(&self) -> Option<&Role> {
        self.user.as_ref().and_then(|u| u.role.as_ref())
    }

    /// True when the account still has to complete its profile setup.
    pub fn needs_profile_setup(&self) -> bool {
        match self.role() {
            Some(Role::Patient) => self.patient.is_none(),
            Some(Role::Doctor) => self.doctor.is_none(),
            _ => false,
        }
    }
}
