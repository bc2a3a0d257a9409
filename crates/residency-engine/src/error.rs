//! Error types for residency-engine operations.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResidencyError {
    #[error("Invalid interval: start {start} is after end {end}")]
    InvalidInterval { start: NaiveDate, end: NaiveDate },

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),
}

pub type Result<T> = std::result::Result<T, ResidencyError>;
