//! # Attempt Clock
//!
//! Deadline and grace-period enforcement for timed quiz attempts. An attempt
//! is `Open` until its hard deadline, in its `GraceWindow` for a short buffer
//! after that, and `Closed` afterwards or once a save has been accepted.

mod clock;
mod config;
mod error;
mod quiz;
mod types;

pub use clock::AttemptClock;
pub use config::AttemptPolicy;
pub use error::Error;
pub use quiz::{is_quiz_active, QuizWindow};
pub use types::{AttemptId, AttemptState, AttemptWindow, SaveReceipt};

pub type Result<T> = std::result::Result<T, Error>;
