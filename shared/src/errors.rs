//! Shared error types for the time-entry ledger

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Invalid hours value: {value}")]
    InvalidHours { value: String },

    #[error("Invalid date: {input}")]
    InvalidDate { input: String },

    #[error("Invalid UUID: {input}")]
    InvalidUuid { input: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Unrecognized day name: {input}")]
    UnknownDayName { input: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
