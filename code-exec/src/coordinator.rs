use std::sync::Arc;
use tokio::{sync::Semaphore, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    config::EngineConfig,
    error::Error,
    registry::RunnerRegistry,
    sandbox::{Sandbox, CANCELLED},
    types::{
        ExecutionLimits, ExecutionStage, RunRequest, RunResult, SupportedLanguage,
        TerminationReason,
    },
};

/// Front door of the engine.
///
/// Resolves the language, bounds how many executions run at once and turns
/// every way an execution can end into exactly one [`RunResult`]. Cheap to
/// clone; clones share the registry and the concurrency budget.
#[derive(Clone)]
pub struct ExecutionCoordinator {
    registry: Arc<RunnerRegistry>,
    semaphore: Arc<Semaphore>,
    config: Arc<EngineConfig>,
}

impl ExecutionCoordinator {
    pub fn new(registry: Arc<RunnerRegistry>, config: EngineConfig) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            registry,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_executions)),
            config: Arc::new(config),
        })
    }

    /// Coordinator over the built-in runners
    pub fn from_config(config: EngineConfig) -> Result<Self, Error> {
        let registry = RunnerRegistry::from_config(&config)?;
        Self::new(Arc::new(registry), config)
    }

    pub fn list_supported_languages(&self) -> &[SupportedLanguage] {
        self.registry.list_supported_languages()
    }

    pub fn registry(&self) -> &RunnerRegistry {
        &self.registry
    }

    pub fn limits(&self) -> &ExecutionLimits {
        &self.config.limits
    }

    /// Execute one submission.
    ///
    /// Only an unknown language is an `Err`; everything that happens once
    /// the language is known is described by the returned [`RunResult`].
    pub async fn run_code(&self, request: RunRequest) -> Result<RunResult, Error> {
        self.run_code_with_cancellation(request, CancellationToken::new())
            .await
    }

    /// Like [`run_code`](Self::run_code), but `cancel` stops the execution,
    /// queued or running, with a `Killed` result.
    pub async fn run_code_with_cancellation(
        &self,
        request: RunRequest,
        cancel: CancellationToken,
    ) -> Result<RunResult, Error> {
        let runner = self.registry.resolve(&request.language)?;
        let language = runner.language().id.clone();

        let _permit = tokio::select! {
            permit = self.semaphore.acquire() => permit.map_err(|e| {
                Error::System(format!("Failed to acquire execution permit: {}", e))
            })?,
            _ = cancel.cancelled() => {
                warn!(language = %language, "Execution cancelled while queued");
                return Ok(RunResult::aborted(
                    TerminationReason::Killed,
                    ExecutionStage::Run,
                    CANCELLED,
                ));
            }
        };

        debug!(language = %language, "Starting code execution");

        let sandbox = match Sandbox::new(&self.config.sandbox_root).await {
            Ok(sandbox) => sandbox,
            Err(e) => {
                error!(language = %language, error = %e, "Failed to prepare sandbox");
                return Ok(RunResult::runner_fault(ExecutionStage::Run, e.to_string()));
            }
        };
        let first_stage = if runner.compile_command(&sandbox).is_some() {
            ExecutionStage::Compile
        } else {
            ExecutionStage::Run
        };

        let limits = self.config.limits.clone();
        let budget = limits.supervision_budget();
        let task_cancel = cancel.child_token();

        // The sandbox moves into the task, so it is removed whichever way the
        // task ends: completion, panic or abort.
        let mut task = SupervisedTask(tokio::spawn(async move {
            runner
                .execute(
                    &sandbox,
                    &request.source,
                    request.stdin.as_deref(),
                    &limits,
                    request.options,
                    &task_cancel,
                )
                .await
        }));

        let result = match time::timeout(budget, &mut task.0).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                let diagnostic = if join_error.is_panic() {
                    "Runner panicked".to_string()
                } else {
                    format!("Runner task failed: {}", join_error)
                };
                RunResult::runner_fault(first_stage, diagnostic)
            }
            Err(_) => {
                task.abort_and_wait().await;
                RunResult::runner_fault(
                    first_stage,
                    format!(
                        "Execution exceeded its supervision budget of {}ms",
                        budget.as_millis()
                    ),
                )
            }
        };

        match result.termination_reason {
            TerminationReason::RunnerFault => error!(
                language = %language,
                stage = ?result.stage,
                diagnostic = ?result.diagnostic,
                "Runner fault"
            ),
            TerminationReason::TimedOut | TerminationReason::Killed => warn!(
                language = %language,
                stage = ?result.stage,
                reason = %result.termination_reason,
                duration_ms = result.duration_ms,
                "Execution stopped by the engine or a signal"
            ),
            TerminationReason::Completed => info!(
                language = %language,
                stage = ?result.stage,
                exit_code = ?result.exit_code,
                duration_ms = result.duration_ms,
                "Code execution completed"
            ),
        }

        Ok(result)
    }

    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Aborts the execution task if the caller stops waiting for it.
struct SupervisedTask(JoinHandle<RunResult>);

impl SupervisedTask {
    async fn abort_and_wait(&mut self) {
        self.0.abort();
        // Resolves once the task's future, and with it the sandbox, is dropped.
        let _ = (&mut self.0).await;
    }
}

impl Drop for SupervisedTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}
