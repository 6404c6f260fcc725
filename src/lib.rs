//! Timed quiz execution: runs submissions through the code execution engine
//! and gates saves on the attempt's deadline, both behind the quiz's own
//! opening hours.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::{future::Future, path::Path, sync::Arc};
use tracing::{debug, warn};

pub use attempt_clock::{
    is_quiz_active, AttemptClock, AttemptId, AttemptPolicy, AttemptState, AttemptWindow,
    QuizWindow, SaveReceipt,
};
pub use code_exec::{
    CancellationToken, EngineConfig, ExecutionCoordinator, ExecutionLimits, ExecutionStage,
    RunOptions, RunRequest, RunResult, SupportedLanguage, TerminationReason,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Engine(#[from] code_exec::Error),

    #[error(transparent)]
    Attempt(#[from] attempt_clock::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl Error {
    /// The save or run was refused because the quiz is closed
    pub fn is_quiz_not_active(&self) -> bool {
        matches!(self, Error::Attempt(attempt_clock::Error::QuizNotActive))
    }

    /// The save arrived after the attempt's grace buffer
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(
            self,
            Error::Attempt(attempt_clock::Error::DeadlineExceeded { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizExecConfig {
    pub engine: EngineConfig,
    pub attempts: AttemptPolicy,
}

impl QuizExecConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: QuizExecConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.attempts.validate()?;
        Ok(())
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_attempts(mut self, attempts: AttemptPolicy) -> Self {
        self.attempts = attempts;
        self
    }
}

/// Execution engine and attempt clock behind one quiz-aware front.
///
/// Every run and every save is refused with `QuizNotActive` unless the
/// enclosing quiz is open at the time of the call.
#[derive(Clone)]
pub struct QuizExec {
    engine: ExecutionCoordinator,
    clock: Arc<AttemptClock>,
}

impl QuizExec {
    pub fn new(config: QuizExecConfig) -> Result<Self> {
        config.validate()?;
        let engine = ExecutionCoordinator::from_config(config.engine)?;
        let clock = Arc::new(AttemptClock::new(config.attempts));
        Ok(Self { engine, clock })
    }

    pub fn engine(&self) -> &ExecutionCoordinator {
        &self.engine
    }

    pub fn clock(&self) -> &AttemptClock {
        &self.clock
    }

    pub fn list_supported_languages(&self) -> &[SupportedLanguage] {
        self.engine.list_supported_languages()
    }

    pub async fn run_code(
        &self,
        quiz: &QuizWindow,
        now: DateTime<Utc>,
        request: RunRequest,
    ) -> Result<RunResult> {
        self.run_code_with_cancellation(quiz, now, request, CancellationToken::new())
            .await
    }

    pub async fn run_code_with_cancellation(
        &self,
        quiz: &QuizWindow,
        now: DateTime<Utc>,
        request: RunRequest,
        cancel: CancellationToken,
    ) -> Result<RunResult> {
        ensure_quiz_active(quiz, now)?;
        Ok(self
            .engine
            .run_code_with_cancellation(request, cancel)
            .await?)
    }

    /// Start an attempt at `start` with the policy's grace buffer
    pub fn start_attempt(
        &self,
        quiz: &QuizWindow,
        attempt_id: AttemptId,
        start: DateTime<Utc>,
        allotted: TimeDelta,
    ) -> Result<AttemptWindow> {
        ensure_quiz_active(quiz, start)?;
        Ok(self.clock.start_attempt(attempt_id, start, allotted)?)
    }

    pub fn evaluate_save(
        &self,
        quiz: &QuizWindow,
        attempt_id: &AttemptId,
        now: DateTime<Utc>,
    ) -> Result<SaveReceipt> {
        ensure_quiz_active(quiz, now)?;
        Ok(self.clock.evaluate_save(attempt_id, now)?)
    }

    /// Evaluate a save and hand the receipt to `persist` only if it was
    /// accepted. `persist` is never called for a rejected save.
    pub async fn save_with<F, Fut, T>(
        &self,
        quiz: &QuizWindow,
        attempt_id: &AttemptId,
        now: DateTime<Utc>,
        persist: F,
    ) -> Result<T>
    where
        F: FnOnce(SaveReceipt) -> Fut,
        Fut: Future<Output = T>,
    {
        let receipt = self.evaluate_save(quiz, attempt_id, now)?;
        debug!(attempt_id = %attempt_id, "Handing accepted save to persistence");
        Ok(persist(receipt).await)
    }
}

fn ensure_quiz_active(quiz: &QuizWindow, now: DateTime<Utc>) -> Result<()> {
    quiz.ensure_active(now).map_err(|e| {
        warn!(%now, opens_at = ?quiz.opens_at, closes_at = ?quiz.closes_at, "Quiz is not active");
        Error::from(e)
    })
}
