//! Error types for record and goal validation.

use thiserror::Error;

/// Validation failures for shared types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid date (expected zero-padded YYYY-MM-DD): {0}")]
    InvalidDate(String),

    #[error("invalid month: {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },

    #[error("invalid goal id (lowercase letters, digits and '-' only): {0}")]
    InvalidGoalId(String),

    #[error("goal {id} ends ({end}) before it starts ({start})")]
    InvalidGoalRange {
        id: String,
        start: String,
        end: String,
    },
}

pub type TypesResult<T> = Result<T, TypesError>;
