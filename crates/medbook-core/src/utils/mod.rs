//! Display helpers shared by front ends.

pub mod format;

pub use format::{cmp_ignore_case, format_date, format_phone, format_time, or_dash, truncate_string};
