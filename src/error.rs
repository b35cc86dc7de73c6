use crate::models::UsageKind;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("Invalid usage type: {0}")]
    InvalidUsageType(String),

    #[error("Missing required field {field} for usage type {usage_type}")]
    MissingRequiredField {
        field: &'static str,
        usage_type: UsageKind,
    },

    #[error("End time {end_time} precedes begin time {begin_time}")]
    InvalidInterval {
        begin_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    },

    #[error("Database error: {0}")]
    DatabaseError(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<mongodb::error::Error> for UsageError {
    fn from(err: mongodb::error::Error) -> Self {
        UsageError::DatabaseError(anyhow::Error::new(err))
    }
}
