//! Plain-text tables for terminal output.

use medbook_core::models::{Appointment, Doctor, DoctorPatient, Patient, UserAccount};
use medbook_core::utils::{format_date, format_phone, format_time, or_dash, truncate_string};

const NAME_WIDTH: usize = 24;

pub fn print_appointments(appointments: &[&Appointment]) {
    if appointments.is_empty() {
        println!("No appointments.");
        return;
    }
    println!(
        "{:>5}  {:<13} {:<6} {:<w$} {:<w$} {:<16} {}",
        "ID", "DATE", "TIME", "PATIENT", "DOCTOR", "SPECIALTY", "STATUS",
        w = NAME_WIDTH
    );
    for a in appointments {
        println!(
            "{:>5}  {:<13} {:<6} {:<w$} {:<w$} {:<16} {}",
            a.id,
            a.date.as_deref().map(format_date).unwrap_or_else(|| "-".to_string()),
            a.time.as_deref().map(format_time).unwrap_or_else(|| "-".to_string()),
            truncate_string(&a.patient_display_name(), NAME_WIDTH),
            truncate_string(&a.doctor_display_name(), NAME_WIDTH),
            a.specialty.as_ref().map(|s| s.label().to_string()).unwrap_or_else(|| "-".to_string()),
            a.status,
            w = NAME_WIDTH
        );
    }
}

pub fn print_doctors(doctors: &[&Doctor]) {
    if doctors.is_empty() {
        println!("No doctors found.");
        return;
    }
    println!("{:>5}  {:<w$} {:<16} {}", "ID", "NAME", "SPECIALTY", "HOSPITAL", w = NAME_WIDTH);
    for d in doctors {
        println!(
            "{:>5}  {:<w$} {:<16} {}",
            d.id,
            truncate_string(&d.display_name(), NAME_WIDTH),
            d.specialty_label(),
            or_dash(d.hospital.as_deref()),
            w = NAME_WIDTH
        );
    }
}

pub fn print_doctor_patients(patients: &[DoctorPatient]) {
    if patients.is_empty() {
        println!("No patients yet.");
        return;
    }
    println!(
        "{:>5}  {:<w$} {:>4}  {:<16} {:<6} {}",
        "ID", "NAME", "AGE", "PHONE", "BLOOD", "LAST VISIT",
        w = NAME_WIDTH
    );
    for p in patients {
        println!(
            "{:>5}  {:<w$} {:>4}  {:<16} {:<6} {}",
            p.patient_id,
            truncate_string(&p.display_name(), NAME_WIDTH),
            p.age.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string()),
            p.phone.as_deref().map(format_phone).unwrap_or_else(|| "-".to_string()),
            or_dash(p.blood_type.as_deref()),
            p.last_appointment_date.as_deref().map(format_date).unwrap_or_else(|| "-".to_string()),
            w = NAME_WIDTH
        );
    }
}

pub fn print_patients(patients: &[Patient]) {
    if patients.is_empty() {
        println!("No patients found.");
        return;
    }
    println!("{:>5}  {:<w$} {:<6} {:<24} {}", "ID", "NAME", "BLOOD", "ALLERGIES", "INSURANCE", w = NAME_WIDTH);
    for p in patients {
        println!(
            "{:>5}  {:<w$} {:<6} {:<24} {}",
            p.id,
            truncate_string(&p.display_name(), NAME_WIDTH),
            or_dash(p.blood_type.as_deref()),
            truncate_string(&or_dash(p.allergies.as_deref()), 24),
            or_dash(p.insurance_type.as_deref()),
            w = NAME_WIDTH
        );
    }
}

pub fn print_patient(patient: &Patient) {
    println!("{} (#{})", patient.display_name(), patient.id);
    let rows = [
        ("Blood type", patient.blood_type.as_deref()),
        ("Allergies", patient.allergies.as_deref()),
        ("Chronic illness", patient.chronic_illness.as_deref()),
        ("Medications", patient.current_medications.as_deref()),
        ("Family history", patient.family_medical_history.as_deref()),
        ("Emergency contact", patient.emergency_contact_name.as_deref()),
        ("Insurance", patient.insurance_type.as_deref()),
        ("Last doctor", patient.last_doctor.as_deref()),
    ];
    for (label, value) in rows {
        println!("  {:<18} {}", label, or_dash(value));
    }
    if let Some(phone) = patient.emergency_contact_phone.as_deref() {
        println!("  {:<18} {}", "Emergency phone", format_phone(phone));
    }
    if let Some(date) = patient.last_appointment.as_deref() {
        println!("  {:<18} {}", "Last appointment", format_date(date));
    }
}

pub fn print_user(user: &UserAccount) {
    println!("{}", user.display_name());
    if let Some(ref username) = user.username {
        println!("  {:<10} {}", "Username", username);
    }
    if let Some(ref email) = user.email {
        println!("  {:<10} {}", "Email", email);
    }
    if let Some(ref phone) = user.phone {
        println!("  {:<10} {}", "Phone", format_phone(phone));
    }
    if let Some(ref role) = user.role {
        println!("  {:<10} {}", "Role", role);
    }
}
