//! Data models for medbook entities.
//!
//! Wire names follow the backend's snake_case JSON. Most fields are optional
//! because the backend's serializers vary by endpoint and role.
//!
//! - `UserAccount`, `Role`, `Gender`, `RegistrationForm`: accounts
//! - `Doctor`, `Specialty`, `DoctorProfileForm`: doctors
//! - `Appointment`, `AppointmentStatus`, `NewAppointment`: bookings
//! - `Patient`, `DoctorPatient`, `PatientUpdate`, `PatientProfileForm`: medical profiles
//! - `Dashboard`: the role-aware landing payload

pub mod appointment;
pub mod dashboard;
pub mod doctor;
pub mod patient;
pub mod person;

pub use appointment::{Appointment, AppointmentStatus, NewAppointment, RelatedRecord};
pub use dashboard::Dashboard;
pub use doctor::{Doctor, DoctorProfileForm, Specialty};
pub use patient::{DoctorPatient, Patient, PatientPage, PatientProfileForm, PatientUpdate};
pub use person::{Gender, RegistrationForm, Role, UserAccount};
