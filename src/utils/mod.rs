//! Utility functions and helpers
//!
//! Timestamp parsing/formatting and atomic file writes.

pub mod atomic;
pub mod time;

pub use atomic::{atomic_write_with, cleanup_temp_files, AtomicError, AtomicResult};
pub use time::{days, format_event_date, parse_event_date, relative_age, EVENT_DATE_FORMAT};
