//! Core data models for the print order intake service.
//!
//! Orders serialize with camelCase field names, matching what the intake
//! form submits and what the admin screens read back.

pub mod order;
pub mod stored_file;
