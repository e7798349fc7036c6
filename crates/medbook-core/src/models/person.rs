use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// Account role as the backend reports it. The front end historically sent
/// both `patient` and `PATIENT`, so parsing ignores case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
    Other(String),
}

impl Role {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "PATIENT" => Role::Patient,
            "DOCTOR" => Role::Doctor,
            "ADMIN" => Role::Admin,
            _ => Role::Other(s.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Patient => "PATIENT",
            Role::Doctor => "DOCTOR",
            Role::Admin => "ADMIN",
            Role::Other(s) => s.as_str(),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Role::Patient => "Patient",
            Role::Doctor => "Doctor",
            Role::Admin => "Administrator",
            Role::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Role::parse(&s)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MALE" | "M" => Some(Gender::Male),
            "FEMALE" | "F" => Some(Gender::Female),
            "OTHER" => Some(Gender::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserAccount {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "phone_number")]
    pub phone: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

impl UserAccount {
    /// "First Last", falling back to the username.
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("").trim();
        let last = self.last_name.as_deref().unwrap_or("").trim();
        let full = format!("{} {}", first, last).trim().to_string();
        if !full.is_empty() {
            full
        } else {
            self.username.clone().unwrap_or_else(|| "User".to_string())
        }
    }
}

/// Sign-up payload for `/api/auth/register/`.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    /// ISO date, `YYYY-MM-DD`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    pub role: Role,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    /// Checks the backend would reject anyway, done before any network call.
    pub fn validate(&self) -> Result<(), ApiError> {
        for (field, value) in [
            ("first name", &self.first_name),
            ("last name", &self.last_name),
            ("username", &self.username),
            ("email", &self.email),
            ("password", &self.password),
        ] {
            if value.trim().is_empty() {
                return Err(ApiError::Validation(format!("Missing {}", field)));
            }
        }
        if self.password != self.confirm_password {
            return Err(ApiError::Validation("Passwords do not match".to_string()));
        }
        if let Some(ref dob) = self.date_of_birth {
            if chrono::NaiveDate::parse_from_str(dob, "%Y-%m-%d").is_err() {
                return Err(ApiError::Validation(format!(
                    "Date of birth must be YYYY-MM-DD, got {}",
                    dob
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
impl RegistrationForm {
    pub(crate) fn sample() -> Self {
        Self {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            username: "jdoe".to_string(),
            email: "jane@example.com".to_string(),
            phone: Some("555-123-4567".to_string()),
            gender: Some(Gender::Female),
            date_of_birth: Some("1990-04-12".to_string()),
            role: Role::Patient,
            password: "s3cret!".to_string(),
            confirm_password: "s3cret!".to_string(),
        }
    }
}
