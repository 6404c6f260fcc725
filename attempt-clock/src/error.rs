use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::AttemptId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown attempt: {0}")]
    UnknownAttempt(AttemptId),

    #[error("Attempt already started: {0}")]
    AttemptExists(AttemptId),

    #[error("Attempt retired: {0}")]
    AttemptRetired(AttemptId),

    #[error("Invalid attempt window: {0}")]
    InvalidWindow(String),

    #[error("Deadline exceeded for attempt {attempt_id} (hard deadline {hard_deadline})")]
    DeadlineExceeded {
        attempt_id: AttemptId,
        hard_deadline: DateTime<Utc>,
    },

    #[error("Quiz is not active")]
    QuizNotActive,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
