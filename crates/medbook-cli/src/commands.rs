//! Subcommand handlers. Each one builds requests through `MedbookClient`
//! and prints the result; auth failures propagate to `main` as `ApiError`.

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use medbook_core::api::{ApiError, MedbookClient};
use medbook_core::auth::{CredentialStore, FileStore, StorageKey};
use medbook_core::models::{
    AppointmentStatus, DoctorProfileForm, NewAppointment, PatientProfileForm, PatientUpdate, RegistrationForm,
    Role, Specialty,
};
use medbook_core::views::{AppointmentBook, DoctorDirectory};
use medbook_core::{Config, CredentialBackend};
use tracing::{debug, warn};

use crate::cli::{AppointmentCommand, Commands, PatientCommand, ProfileCommand, RegisterArgs};
use crate::output;

/// Appointments shown on the dashboard
const DASHBOARD_UPCOMING: usize = 5;

pub async fn dispatch(command: Commands, mut config: Config) -> Result<()> {
    let store = config.credential_store()?;
    let client = MedbookClient::connect(&config.base_url(), config.timeout(), store)
        .context("Failed to create HTTP client")?;

    match command {
        Commands::Login { username } => login(&client, &mut config, username).await,
        Commands::Logout => {
            client.session().logout().await;
            println!("Logged out.");
            Ok(())
        }
        Commands::Register(args) => register(&client, args).await,
        Commands::Status => status(&client, &config).await,
        Commands::Dashboard => dashboard(&client).await,
        Commands::Doctors { specialty } => doctors(&client, specialty).await,
        Commands::Specialties => specialties(&client).await,
        Commands::Appointments(cmd) => appointments(&client, cmd).await,
        Commands::Patients(cmd) => patients(&client, cmd).await,
        Commands::Profile(cmd) => profile(&client, cmd).await,
    }
}

fn prompt_username(default: Option<&str>) -> Result<String> {
    match default {
        Some(name) => print!("Username [{}]: ", name),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    let username = username.trim();
    Ok(match (username.is_empty(), default) {
        (true, Some(name)) => name.to_string(),
        _ => username.to_string(),
    })
}

async fn login(client: &MedbookClient, config: &mut Config, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(name) => name,
        None => prompt_username(config.last_username.as_deref())?,
    };
    let password = rpassword::prompt_password("Password: ")?;
    if username.is_empty() || password.is_empty() {
        bail!("Username and password required");
    }

    let outcome = match client.session().login(&username, &password).await {
        Ok(outcome) => outcome,
        Err(ApiError::ServerError { status: 400 | 401, .. }) => bail!("Invalid username or password"),
        Err(e) => return Err(e.into()),
    };

    config.last_username = Some(username.clone());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    let name = outcome.user.as_ref().map(|u| u.display_name()).unwrap_or(username);
    match outcome.role {
        Some(role) => println!("Logged in as {} ({}).", name, role),
        None => println!("Logged in as {}.", name),
    }
    Ok(())
}

async fn register(client: &MedbookClient, args: RegisterArgs) -> Result<()> {
    let password = rpassword::prompt_password("Password: ")?;
    let confirm_password = rpassword::prompt_password("Confirm password: ")?;

    let form = RegistrationForm {
        first_name: args.first_name,
        last_name: args.last_name,
        username: args.username,
        email: args.email,
        phone: args.phone,
        gender: args.gender,
        date_of_birth: args.date_of_birth,
        role: args.role,
        password,
        confirm_password,
    };
    let outcome = client.session().register(&form).await?;

    if let Some(message) = outcome.message {
        println!("{}", message);
    }
    if outcome.logged_in {
        println!("Account created and signed in as {}.", form.username);
        println!("Next: run `medbook profile {}` to complete your profile.", profile_command_for(&form.role));
    } else {
        println!("Account created. Run `medbook login` to sign in.");
    }
    Ok(())
}

fn profile_command_for(role: &Role) -> &'static str {
    match role {
        Role::Doctor => "doctor",
        _ => "patient",
    }
}

async fn status(client: &MedbookClient, config: &Config) -> Result<()> {
    let session = client.session();
    println!("Server:      {}", config.base_url());
    println!("Credentials: {:?}", config.credential_backend);

    if !session.is_authenticated() {
        println!("Status:      not logged in");
        return Ok(());
    }
    let user = client.current_user().await?;
    println!("Status:      logged in");
    if let Some(role) = session.role() {
        println!("Role:        {}", role);
    }
    println!("Tokens:      {}", token_summary(session.store().as_ref())?);
    if config.credential_backend == CredentialBackend::File {
        if let Some(saved) = FileStore::new(config.cache_dir()?).updated_at()? {
            println!("Saved:       {}", saved.format("%Y-%m-%d %H:%M UTC"));
        }
    }
    println!();
    output::print_user(&user);
    Ok(())
}

/// What the store holds, for `status`. Without a refresh token the session
/// ends as soon as the access token expires.
fn token_summary(store: &dyn CredentialStore) -> Result<&'static str> {
    if store.credential()?.is_some() {
        return Ok("access and refresh");
    }
    Ok(match store.get(StorageKey::Access)? {
        Some(_) => "access only (log in again when it expires)",
        None => "none",
    })
}

async fn dashboard(client: &MedbookClient) -> Result<()> {
    let (dash, appointments) = client.overview().await?;

    match dash.user {
        Some(ref user) => println!("Welcome, {}", user.display_name()),
        None => println!("Welcome"),
    }
    if let Some(role) = dash.role() {
        println!("Signed in as {}", role);
    }
    if dash.role_mismatch {
        println!("Warning: your profile does not match your account role. Contact an administrator.");
    }
    if dash.needs_profile_setup() {
        let role = dash.role().cloned().unwrap_or(Role::Patient);
        println!("Your profile is incomplete. Run `medbook profile {}` to finish it.", profile_command_for(&role));
    }
    if let Some(ref doctor) = dash.doctor {
        println!("{} - {}", doctor.display_name(), doctor.specialty_label());
    }
    if let Some(ref patient) = dash.patient {
        println!();
        output::print_patient(patient);
    }

    let book = AppointmentBook::new(appointments);
    println!();
    println!(
        "Appointments: {} scheduled, {} completed, {} cancelled",
        book.count(&AppointmentStatus::Scheduled),
        book.count(&AppointmentStatus::Completed),
        book.count(&AppointmentStatus::Cancelled),
    );
    let upcoming: Vec<_> = book
        .chronological()
        .into_iter()
        .filter(|a| a.status == AppointmentStatus::Scheduled)
        .take(DASHBOARD_UPCOMING)
        .collect();
    if !upcoming.is_empty() {
        println!();
        output::print_appointments(&upcoming);
    }
    Ok(())
}

async fn doctors(client: &MedbookClient, specialty: Option<String>) -> Result<()> {
    let directory = DoctorDirectory::new(client.doctors().await?);
    match specialty {
        Some(input) => {
            let specialty = Specialty::from_input(&input);
            debug!(specialty = %specialty.as_str(), "Filtering doctors");
            output::print_doctors(&directory.for_specialty(&specialty));
        }
        None => {
            let all: Vec<_> = directory.all().iter().collect();
            output::print_doctors(&all);
        }
    }
    Ok(())
}

async fn specialties(client: &MedbookClient) -> Result<()> {
    let specialties = client.doctor_specialties().await?;
    if specialties.is_empty() {
        println!("No specialties configured.");
    }
    for (value, label) in &specialties {
        println!("{:<16} {}", value, label);
    }
    Ok(())
}

async fn appointments(client: &MedbookClient, command: AppointmentCommand) -> Result<()> {
    match command {
        AppointmentCommand::List { status, patient } => {
            let list = match patient {
                Some(id) => client.patient_appointments(id).await?,
                None => client.appointments().await?,
            };
            let book = AppointmentBook::new(list);
            let rows = match status {
                Some(ref status) => book.by_status(status),
                None => book.chronological(),
            };
            output::print_appointments(&rows);
        }
        AppointmentCommand::Book {
            doctor,
            date,
            time,
            specialty,
            reason,
        } => {
            let directory = DoctorDirectory::new(client.doctors().await?);
            let chosen = directory
                .get(doctor)
                .ok_or_else(|| anyhow::anyhow!("Doctor #{} not found", doctor))?;
            let specialty = match specialty {
                Some(input) => Specialty::from_input(&input),
                None => chosen
                    .specialty
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("{} has no specialty on file; pass --specialty", chosen.display_name()))?,
            };
            if !directory.for_specialty(&specialty).iter().any(|d| d.id == doctor) {
                bail!("{} does not practise {}", chosen.display_name(), specialty);
            }

            let booked = client
                .book_appointment(&NewAppointment {
                    specialty,
                    date,
                    time,
                    doctor,
                    reason,
                })
                .await?;
            println!("Appointment booked.");
            output::print_appointments(&[&booked]);
        }
        AppointmentCommand::Cancel { id } => {
            client.cancel_appointment(id).await?;
            println!("Appointment #{} cancelled.", id);
        }
        AppointmentCommand::Status { id, status } => {
            let book = AppointmentBook::new(client.appointments().await?);
            let current = book
                .get(id)
                .map(|a| a.status.clone())
                .ok_or_else(|| anyhow::anyhow!("Appointment #{} not found", id))?;
            if !AppointmentBook::status_options(&current).contains(&status) {
                println!("Appointment #{} is already {}.", id, current);
                return Ok(());
            }

            client.update_appointment_status(id, &status).await?;
            println!("Appointment #{} is now {}.", id, status);
        }
    }
    Ok(())
}

async fn patients(client: &MedbookClient, command: PatientCommand) -> Result<()> {
    let as_doctor = client.session().role() == Some(Role::Doctor);

    match command {
        PatientCommand::List => {
            if as_doctor {
                output::print_doctor_patients(&client.doctor_patients().await?);
            } else {
                output::print_patients(&client.patients().await?);
            }
        }
        PatientCommand::Show { id } => {
            let patient = if as_doctor {
                client.doctor_patient(id).await?
            } else {
                client.patient(id).await?
            };
            output::print_patient(&patient);

            let book = AppointmentBook::new(client.patient_appointments(id).await?);
            if !book.is_empty() {
                println!();
                output::print_appointments(&book.chronological());
            }
        }
        PatientCommand::Update { id, fields } => {
            let mut update = PatientUpdate::default();
            for (field, value) in fields {
                update.set_field(&field, value)?;
            }
            let patient = if as_doctor {
                client.doctor_update_patient(id, &update).await?
            } else {
                client.update_patient(id, &update).await?
            };
            println!("Patient profile updated.");
            output::print_patient(&patient);
        }
        PatientCommand::Delete { id } => {
            client.delete_patient(id).await?;
            println!("Patient #{} deleted.", id);
        }
    }
    Ok(())
}

async fn profile(client: &MedbookClient, command: ProfileCommand) -> Result<()> {
    match command {
        ProfileCommand::Patient {
            blood_type,
            allergies,
            chronic_illness,
            current_medications,
            emergency_contact_name,
            emergency_contact_phone,
            insurance_type,
        } => {
            let form = PatientProfileForm {
                fields: PatientUpdate {
                    blood_type,
                    allergies,
                    chronic_illness,
                    current_medications,
                    emergency_contact_name,
                    emergency_contact_phone,
                    insurance_type,
                    ..Default::default()
                },
            };
            let patient = client.setup_patient_profile(&form).await?;
            println!("Medical profile saved.");
            output::print_patient(&patient);
        }
        ProfileCommand::Doctor {
            specialty,
            hospital,
            license_number,
        } => {
            let form = DoctorProfileForm {
                specialty: Specialty::from_input(&specialty),
                hospital,
                license_number,
            };
            let doctor = client.setup_doctor_profile(&form).await?;
            println!("Doctor profile saved: {} - {}", doctor.display_name(), doctor.specialty_label());
        }
    }
    Ok(())
}
