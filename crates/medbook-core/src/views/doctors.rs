use std::collections::BTreeSet;

use crate::models::{Doctor, Specialty};
use crate::utils::cmp_ignore_case;

/// Loaded doctors, filtered locally by specialty when booking.
#[derive(Debug, Clone, Default)]
pub struct DoctorDirectory {
    doctors: Vec<Doctor>,
}

impl DoctorDirectory {
    pub fn new(doctors: Vec<Doctor>) -> Self {
        Self { doctors }
    }

    pub fn replace(&mut self, doctors: Vec<Doctor>) {
        self.doctors = doctors;
    }

    pub fn all(&self) -> &[Doctor] {
        &self.doctors
    }

    pub fn get(&self, id: i64) -> Option<&Doctor> {
        self.doctors.iter().find(|d| d.id == id)
    }

    /// Doctors practising `specialty`, by name. No specialty chosen yet means
    /// no doctors to offer.
    pub fn for_specialty(&self, specialty: &Specialty) -> Vec<&Doctor> {
        if specialty.as_str().trim().is_empty() {
            return Vec::new();
        }
        let mut matches: Vec<&Doctor> = self
            .doctors
            .iter()
            .filter(|d| d.specialty.as_ref() == Some(specialty))
            .collect();
        matches.sort_by(|a, b| cmp_ignore_case(&a.display_name(), &b.display_name()));
        matches
    }

    /// Distinct specialties present in the directory.
    pub fn specialties(&self) -> Vec<Specialty> {
        self.doctors
            .iter()
            .filter_map(|d| d.specialty.clone())
            .filter(|s| !s.as_str().trim().is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor(id: i64, name: &str, specialty: Option<&str>) -> Doctor {
        Doctor {
            id,
            user: None,
            user_name: Some(name.to_string()),
            specialty: specialty.map(Specialty::new),
            specialty_display: None,
            hospital: None,
            license_number: None,
        }
    }

    fn directory() -> DoctorDirectory {
        DoctorDirectory::new(vec![
            doctor(1, "Zed Ortiz", Some("DENTIST")),
            doctor(2, "amy Bell", Some("DENTIST")),
            doctor(3, "Carl Fox", Some("cardio")),
            doctor(4, "No Spec", None),
        ])
    }

    #[test]
    fn test_for_specialty_filters_and_sorts() {
        let dir = directory();
        let ids: Vec<i64> = dir.for_specialty(&Specialty::new("DENTIST")).iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert!(dir.for_specialty(&Specialty::new("ONCOLOGIST")).is_empty());
    }

    #[test]
    fn test_empty_specialty_yields_nothing() {
        assert!(directory().for_specialty(&Specialty::new("")).is_empty());
    }

    #[test]
    fn test_specialties_distinct() {
        let specialties = directory().specialties();
        assert_eq!(specialties, vec![Specialty::new("DENTIST"), Specialty::new("cardio")]);
    }
}
