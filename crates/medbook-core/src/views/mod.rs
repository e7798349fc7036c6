//! Client-side state for list views.
//!
//! These hold what a front end shows between server round trips: the
//! appointment list with its optimistic edits, the doctor directory with the
//! specialty filter, and a guard that drops results of superseded loads.

pub mod appointments;
pub mod doctors;
pub mod load;

pub use appointments::AppointmentBook;
pub use doctors::DoctorDirectory;
pub use load::{LoadGuard, LoadTicket};
