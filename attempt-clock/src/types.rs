use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::Error;

/// Identifier of one quiz attempt
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(String);

impl AttemptId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AttemptId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AttemptId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Where an attempt stands at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    Open,
    GraceWindow,
    Closed,
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttemptState::Open => "open",
            AttemptState::GraceWindow => "grace_window",
            AttemptState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Timing envelope of one attempt.
///
/// `hard_deadline` is always `start + allotted`. The grace buffer is never
/// negative, and once `closed` is set the window stays closed. Deserialized
/// windows go through the same checks as [`AttemptWindow::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WindowRecord")]
pub struct AttemptWindow {
    pub attempt_id: AttemptId,
    pub start: DateTime<Utc>,
    pub hard_deadline: DateTime<Utc>,
    #[serde(rename = "grace_buffer_ms", with = "delta_ms")]
    pub grace_buffer: TimeDelta,
    pub closed: bool,
}

impl AttemptWindow {
    pub fn new(
        attempt_id: AttemptId,
        start: DateTime<Utc>,
        allotted: TimeDelta,
        grace_buffer: TimeDelta,
    ) -> Result<Self, Error> {
        if allotted < TimeDelta::zero() {
            return Err(Error::InvalidWindow(format!(
                "allotted time must not be negative, got {}ms",
                allotted.num_milliseconds()
            )));
        }
        if grace_buffer < TimeDelta::zero() {
            return Err(Error::InvalidWindow(format!(
                "grace buffer must not be negative, got {}ms",
                grace_buffer.num_milliseconds()
            )));
        }

        let hard_deadline = start
            .checked_add_signed(allotted)
            .ok_or_else(|| Error::InvalidWindow("hard deadline out of range".to_string()))?;
        if hard_deadline.checked_add_signed(grace_buffer).is_none() {
            return Err(Error::InvalidWindow(
                "grace deadline out of range".to_string(),
            ));
        }

        Ok(Self {
            attempt_id,
            start,
            hard_deadline,
            grace_buffer,
            closed: false,
        })
    }

    /// Last instant at which a save is still accepted
    pub fn grace_deadline(&self) -> DateTime<Utc> {
        // Range checked in `new`.
        self.hard_deadline
            .checked_add_signed(self.grace_buffer)
            .unwrap_or(self.hard_deadline)
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> AttemptState {
        if self.closed {
            AttemptState::Closed
        } else if now <= self.hard_deadline {
            AttemptState::Open
        } else if now <= self.grace_deadline() {
            AttemptState::GraceWindow
        } else {
            AttemptState::Closed
        }
    }

    /// Working time left before the hard deadline; the grace buffer is not
    /// counted.
    pub fn remaining_time(&self, now: DateTime<Utc>) -> TimeDelta {
        if self.closed {
            return TimeDelta::zero();
        }
        (self.hard_deadline - now).max(TimeDelta::zero())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Unchecked wire form of [`AttemptWindow`]
#[derive(Deserialize)]
struct WindowRecord {
    attempt_id: AttemptId,
    start: DateTime<Utc>,
    hard_deadline: DateTime<Utc>,
    #[serde(rename = "grace_buffer_ms", with = "delta_ms")]
    grace_buffer: TimeDelta,
    #[serde(default)]
    closed: bool,
}

impl TryFrom<WindowRecord> for AttemptWindow {
    type Error = Error;

    fn try_from(record: WindowRecord) -> Result<Self, Error> {
        let allotted = record.hard_deadline - record.start;
        let mut window =
            AttemptWindow::new(record.attempt_id, record.start, allotted, record.grace_buffer)?;
        window.closed = record.closed;
        Ok(window)
    }
}

/// Proof that a save was accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveReceipt {
    pub attempt_id: AttemptId,
    pub accepted_at: DateTime<Utc>,
    /// Accepted after the hard deadline, inside the grace buffer
    pub in_grace: bool,
}

pub(crate) mod delta_ms {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(delta: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(delta.num_milliseconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<TimeDelta, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = i64::deserialize(deserializer)?;
        TimeDelta::try_milliseconds(millis)
            .ok_or_else(|| serde::de::Error::custom("duration out of range"))
    }
}
