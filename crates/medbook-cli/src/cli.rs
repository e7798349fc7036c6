//! Command-line interface definition and argument parsing

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use medbook_core::models::{AppointmentStatus, Gender, Role};
use medbook_core::CredentialBackend;

/// Command-line arguments for medbook
#[derive(Parser, Debug)]
#[command(
    name = "medbook",
    about = "Book appointments and manage medical profiles from the terminal",
    version
)]
pub struct Cli {
    /// Backend address (overrides the config file)
    #[arg(long, global = true, env = "MEDBOOK_API_URL")]
    pub api_url: Option<String>,

    /// Where to keep tokens: keyring or file
    #[arg(long, global = true)]
    pub credentials: Option<CredentialBackend>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and store tokens
    Login {
        #[arg(long, short)]
        username: Option<String>,
    },

    /// Sign out and forget stored tokens
    Logout,

    /// Create an account
    Register(RegisterArgs),

    /// Show session state and the signed-in account
    #[command(alias = "whoami")]
    Status,

    /// Role-aware overview with upcoming appointments
    Dashboard,

    /// List doctors
    Doctors {
        /// Only doctors with this specialty (value or label)
        #[arg(long)]
        specialty: Option<String>,
    },

    /// List specialties offered by the backend
    Specialties,

    #[command(subcommand)]
    Appointments(AppointmentCommand),

    #[command(subcommand)]
    Patients(PatientCommand),

    /// First-time profile setup
    #[command(subcommand)]
    Profile(ProfileCommand),
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long, value_parser = parse_gender)]
    pub gender: Option<Gender>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub date_of_birth: Option<String>,
    #[arg(long, default_value = "patient", value_parser = parse_role)]
    pub role: Role,
}

/// Manage appointments
#[derive(Subcommand, Debug)]
pub enum AppointmentCommand {
    /// List appointments visible to you
    List {
        #[arg(long, value_parser = parse_status)]
        status: Option<AppointmentStatus>,
        /// Only this patient's appointments
        #[arg(long)]
        patient: Option<i64>,
    },

    /// Book an appointment
    Book {
        #[arg(long)]
        doctor: i64,
        /// YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// HH:MM
        #[arg(long)]
        time: String,
        /// Defaults to the doctor's specialty
        #[arg(long)]
        specialty: Option<String>,
        #[arg(long, default_value = "")]
        reason: String,
    },

    /// Cancel an appointment
    Cancel { id: i64 },

    /// Change an appointment's status
    Status {
        id: i64,
        #[arg(value_parser = parse_status)]
        status: AppointmentStatus,
    },
}

/// Manage patient profiles
#[derive(Subcommand, Debug)]
pub enum PatientCommand {
    /// List patients (a doctor sees their own patients)
    List,

    /// Show one patient's profile
    Show { id: i64 },

    /// Update profile fields
    Update {
        id: i64,
        /// field=value, e.g. --set allergies=Penicillin
        #[arg(long = "set", short = 's', value_parser = parse_assignment, required = true)]
        fields: Vec<(String, String)>,
    },

    /// Delete a patient profile
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Medical profile for a patient account
    Patient {
        #[arg(long)]
        blood_type: Option<String>,
        #[arg(long)]
        allergies: Option<String>,
        #[arg(long)]
        chronic_illness: Option<String>,
        #[arg(long)]
        current_medications: Option<String>,
        #[arg(long)]
        emergency_contact_name: Option<String>,
        #[arg(long)]
        emergency_contact_phone: Option<String>,
        #[arg(long)]
        insurance_type: Option<String>,
    },

    /// Practice details for a doctor account
    Doctor {
        #[arg(long)]
        specialty: String,
        #[arg(long, default_value = "")]
        hospital: String,
        #[arg(long)]
        license_number: String,
    },
}

fn parse_gender(arg: &str) -> Result<Gender, String> {
    Gender::parse(arg).ok_or_else(|| format!("Unknown gender: {}. Valid options: male, female, other", arg))
}

fn parse_role(arg: &str) -> Result<Role, String> {
    match Role::parse(arg) {
        Role::Other(_) => Err(format!("Unknown role: {}. Valid options: patient, doctor", arg)),
        role => Ok(role),
    }
}

fn parse_status(arg: &str) -> Result<AppointmentStatus, String> {
    match AppointmentStatus::parse(arg) {
        AppointmentStatus::Other(_) => Err(format!(
            "Unknown status: {}. Valid options: scheduled, completed, cancelled",
            arg
        )),
        status => Ok(status),
    }
}

fn parse_assignment(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => Ok((field.trim().to_string(), value.to_string())),
        _ => Err(format!("Expected field=value, got '{}'", arg)),
    }
}
