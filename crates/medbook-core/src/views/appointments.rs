use std::cmp::Ordering;

use crate::models::{Appointment, AppointmentStatus};

/// The appointment list as last loaded, plus the edits the server has
/// confirmed since. Mutations never call the server themselves.
#[derive(Debug, Clone, Default)]
pub struct AppointmentBook {
    appointments: Vec<Appointment>,
}

impl AppointmentBook {
    pub fn new(appointments: Vec<Appointment>) -> Self {
        Self { appointments }
    }

    pub fn replace(&mut self, appointments: Vec<Appointment>) {
        self.appointments = appointments;
    }

    pub fn all(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn len(&self) -> usize {
        self.appointments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.appointments.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == id)
    }

    /// Newly booked appointments go to the top.
    pub fn insert_booked(&mut self, appointment: Appointment) {
        self.appointments.retain(|a| a.id != appointment.id);
        self.appointments.insert(0, appointment);
    }

    pub fn remove(&mut self, id: i64) -> Option<Appointment> {
        let pos = self.appointments.iter().position(|a| a.id == id)?;
        Some(self.appointments.remove(pos))
    }

    /// Returns false if no appointment has that id.
    pub fn set_status(&mut self, id: i64, status: AppointmentStatus) -> bool {
        match self.appointments.iter_mut().find(|a| a.id == id) {
            Some(appointment) => {
                appointment.status = status;
                true
            }
            None => false,
        }
    }

    pub fn by_status(&self, status: &AppointmentStatus) -> Vec<&Appointment> {
        self.appointments.iter().filter(|a| a.status == *status).collect()
    }

    pub fn count(&self, status: &AppointmentStatus) -> usize {
        self.appointments.iter().filter(|a| a.status == *status).count()
    }

    /// Statuses an appointment can be moved to from `current`.
    pub fn status_options(current: &AppointmentStatus) -> Vec<AppointmentStatus> {
        AppointmentStatus::ALL
            .iter()
            .filter(|s| *s != current)
            .cloned()
            .collect()
    }

    /// Soonest first; appointments without a parseable date go last.
    pub fn chronological(&self) -> Vec<&Appointment> {
        let mut sorted: Vec<&Appointment> = self.appointments.iter().collect();
        sorted.sort_by(|a, b| match (a.scheduled_at(), b.scheduled_at()) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        });
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appt(id: i64, date: Option<&str>, status: &str) -> Appointment {
        let json = serde_json::json!({
            "id": id,
            "patient": 1,
            "doctor": 2,
            "date": date,
            "time": "10:00",
            "status": status,
        });
        serde_json::from_value(json).unwrap()
    }

    fn book() -> AppointmentBook {
        AppointmentBook::new(vec![
            appt(1, Some("2025-03-05"), "SCHEDULED"),
            appt(2, Some("2025-03-01"), "COMPLETED"),
            appt(3, None, "SCHEDULED"),
        ])
    }

    #[test]
    fn test_insert_booked_prepends() {
        let mut book = book();
        book.insert_booked(appt(9, Some("2025-04-01"), "SCHEDULED"));
        assert_eq!(book.all()[0].id, 9);
        assert_eq!(book.len(), 4);

        // Re-inserting the same id replaces rather than duplicates
        book.insert_booked(appt(2, Some("2025-03-01"), "SCHEDULED"));
        assert_eq!(book.len(), 4);
        assert_eq!(book.all()[0].id, 2);
    }

    #[test]
    fn test_remove_and_set_status() {
        let mut book = book();
        assert_eq!(book.remove(1).map(|a| a.id), Some(1));
        assert!(book.remove(1).is_none());
        assert!(book.get(1).is_none());

        assert!(book.set_status(3, AppointmentStatus::Cancelled));
        assert!(book.get(3).unwrap().status.is_cancelled());
        assert!(!book.set_status(42, AppointmentStatus::Completed));
    }

    #[test]
    fn test_status_grouping() {
        let book = book();
        assert_eq!(book.count(&AppointmentStatus::Scheduled), 2);
        assert_eq!(book.count(&AppointmentStatus::Cancelled), 0);
        let done: Vec<i64> = book.by_status(&AppointmentStatus::Completed).iter().map(|a| a.id).collect();
        assert_eq!(done, vec![2]);
    }

    #[test]
    fn test_status_options_exclude_current() {
        let options = AppointmentBook::status_options(&AppointmentStatus::Scheduled);
        assert_eq!(options, vec![AppointmentStatus::Completed, AppointmentStatus::Cancelled]);

        let from_unknown = AppointmentBook::status_options(&AppointmentStatus::Other("pending".to_string()));
        assert_eq!(from_unknown.len(), 3);
    }

    #[test]
    fn test_chronological() {
        let book = book();
        let ids: Vec<i64> = book.chronological().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }
}
