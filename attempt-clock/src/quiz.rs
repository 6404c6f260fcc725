use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Opening hours of a quiz. Either bound may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizWindow {
    #[serde(default)]
    pub opens_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closes_at: Option<DateTime<Utc>>,
}

impl QuizWindow {
    pub fn new(opens_at: DateTime<Utc>, closes_at: DateTime<Utc>) -> Self {
        Self {
            opens_at: Some(opens_at),
            closes_at: Some(closes_at),
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        is_quiz_active(now, self)
    }

    /// `Err(QuizNotActive)` unless the quiz is active at `now`
    pub fn ensure_active(&self, now: DateTime<Utc>) -> Result<(), Error> {
        if self.is_active(now) {
            Ok(())
        } else {
            Err(Error::QuizNotActive)
        }
    }
}

/// Whether attempts may be started or continued at `now`.
///
/// The window is half open, `[opens_at, closes_at)`. A missing or inverted
/// bound means inactive.
pub fn is_quiz_active(now: DateTime<Utc>, window: &QuizWindow) -> bool {
    match (window.opens_at, window.closes_at) {
        (Some(opens_at), Some(closes_at)) if opens_at < closes_at => {
            opens_at <= now && now < closes_at
        }
        _ => false,
    }
}
