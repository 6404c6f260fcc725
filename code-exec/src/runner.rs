use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    error::Error,
    languages::check_command,
    sandbox::{ProcessLimits, ProcessOutcome, Sandbox},
    types::{
        CommandSpec, ExecutionLimits, ExecutionStage, RunOptions, RunResult, SupportedLanguage,
        TerminationReason,
    },
};

/// Compilers and their intermediate files need more room than a submission.
const MIN_COMPILE_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// Trait for language-specific runners
///
/// Implementors describe how to build and start a program; the provided
/// [`LanguageRunner::execute`] drives the compile and run stages inside a
/// [`Sandbox`].
#[async_trait]
pub trait LanguageRunner: Send + Sync {
    fn language(&self) -> &SupportedLanguage;

    /// Host binaries this runner needs
    fn required_tools(&self) -> Vec<&str>;

    /// Name of the source file inside the sandbox working directory
    fn source_file_name(&self) -> &str;

    /// Build step, if the language has one
    fn compile_command(&self, _sandbox: &Sandbox) -> Option<CommandSpec> {
        None
    }

    /// Command that runs the submission
    fn run_command(&self, sandbox: &Sandbox, limits: &ExecutionLimits) -> CommandSpec;

    /// Whether the memory ceiling is also applied as `RLIMIT_AS`.
    ///
    /// Runtimes that reserve large virtual mappings up front (JVM, V8, Go)
    /// return `false`; their resident memory is still watched by the sandbox,
    /// and they get the ceiling as a runtime flag to keep the heap under it.
    fn limits_address_space(&self) -> bool {
        true
    }

    /// Check if all required tools are available
    fn check_tools(&self) -> Result<(), Error> {
        let missing: Vec<_> = self
            .required_tools()
            .into_iter()
            .filter(|tool| !check_command(tool))
            .collect();

        if !missing.is_empty() {
            return Err(Error::System(format!(
                "Missing required tools: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// Run one submission inside `sandbox`.
    ///
    /// Always produces a result; toolchain problems surface as
    /// [`TerminationReason::RunnerFault`].
    async fn execute(
        &self,
        sandbox: &Sandbox,
        source: &str,
        stdin: Option<&str>,
        limits: &ExecutionLimits,
        capture: RunOptions,
        cancel: &CancellationToken,
    ) -> RunResult {
        let language = &self.language().id;
        let compile = self.compile_command(sandbox);
        let first_stage = if compile.is_some() {
            ExecutionStage::Compile
        } else {
            ExecutionStage::Run
        };

        if let Err(e) = self.check_tools() {
            warn!(language = %language, error = %e, "Toolchain unavailable");
            return RunResult::runner_fault(first_stage, e.to_string());
        }

        if let Err(e) = sandbox.write_file(self.source_file_name(), source).await {
            return RunResult::runner_fault(first_stage, e.to_string());
        }

        let mut compile_duration_ms = None;
        if let Some(compile) = compile {
            debug!(language = %language, sandbox = %sandbox.id(), "Compiling submission");
            let compile_limits = ProcessLimits {
                wall_time: limits.compile_timeout,
                memory_bytes: Some(limits.max_compile_memory_bytes.max(limits.max_memory_bytes)),
                limit_address_space: false,
                file_size_bytes: limits.max_file_size_bytes.max(MIN_COMPILE_FILE_SIZE),
                output_bytes: limits.max_output_bytes,
                cleanup_margin: limits.cleanup_margin,
            };
            let outcome = sandbox
                .run_process(&compile, None, &compile_limits, capture, cancel)
                .await;
            compile_duration_ms = Some(outcome.duration.as_millis() as u64);

            let compiled = outcome.termination == TerminationReason::Completed
                && outcome.exit_code == Some(0);
            if !compiled {
                debug!(
                    language = %language,
                    reason = %outcome.termination,
                    exit_code = ?outcome.exit_code,
                    "Compilation did not succeed"
                );
                return into_result(outcome, ExecutionStage::Compile, compile_duration_ms);
            }
        }

        let run_limits = ProcessLimits {
            wall_time: limits.max_duration,
            memory_bytes: Some(limits.max_memory_bytes),
            limit_address_space: self.limits_address_space(),
            file_size_bytes: limits.max_file_size_bytes,
            output_bytes: limits.max_output_bytes,
            cleanup_margin: limits.cleanup_margin,
        };
        let run = self.run_command(sandbox, limits);
        let outcome = sandbox
            .run_process(&run, stdin, &run_limits, capture, cancel)
            .await;

        into_result(outcome, ExecutionStage::Run, compile_duration_ms)
    }
}

fn into_result(
    outcome: ProcessOutcome,
    stage: ExecutionStage,
    compile_duration_ms: Option<u64>,
) -> RunResult {
    RunResult {
        exit_code: outcome.exit_code,
        stdout: outcome.stdout.text,
        stderr: outcome.stderr.text,
        stdout_truncated: outcome.stdout.truncated,
        stderr_truncated: outcome.stderr.truncated,
        duration_ms: outcome.duration.as_millis() as u64,
        termination_reason: outcome.termination,
        stage,
        signal: outcome.signal,
        compile_duration_ms,
        diagnostic: outcome.diagnostic,
    }
}
