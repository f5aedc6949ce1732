//! Utility functions.

pub mod strings;

pub use strings::{command_id, format_duration, snake_case};
