use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A language the engine can execute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SupportedLanguage {
    /// Unique lower-case key, e.g. `python3`
    pub id: String,
    /// Human readable name
    pub display_name: String,
    /// Toolchain version or language standard, when meaningful
    #[serde(default)]
    pub version: Option<String>,
}

impl SupportedLanguage {
    pub fn new(id: &str, display_name: &str, version: Option<&str>) -> Self {
        Self {
            id: id.to_ascii_lowercase(),
            display_name: display_name.to_string(),
            version: version.map(str::to_string),
        }
    }
}

/// Per-request capture switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    #[serde(default = "enabled")]
    pub capture_stdout: bool,
    #[serde(default = "enabled")]
    pub capture_stderr: bool,
}

fn enabled() -> bool {
    true
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            capture_stdout: true,
            capture_stderr: true,
        }
    }
}

impl RunOptions {
    /// Only the exit status is of interest; both streams are discarded.
    pub fn exit_status_only() -> Self {
        Self {
            capture_stdout: false,
            capture_stderr: false,
        }
    }
}

/// Code execution request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    /// Language identifier or alias
    pub language: String,
    /// Source code to execute
    pub source: String,
    /// Input data fed to the program's stdin
    #[serde(default)]
    pub stdin: Option<String>,
    #[serde(default)]
    pub options: RunOptions,
}

impl RunRequest {
    pub fn new(language: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            source: source.into(),
            stdin: None,
            options: RunOptions::default(),
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }
}

/// Why an execution ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The process exited on its own; its exit code is authoritative.
    Completed,
    /// The wall-clock (or CPU backstop) ceiling was hit.
    TimedOut,
    /// Terminated by a signal, or by cancellation of the request.
    Killed,
    /// The toolchain or sandbox could not run the submission at all.
    RunnerFault,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminationReason::Completed => "completed",
            TerminationReason::TimedOut => "timed_out",
            TerminationReason::Killed => "killed",
            TerminationReason::RunnerFault => "runner_fault",
        };
        f.write_str(s)
    }
}

/// Where in the pipeline an execution stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStage {
    Compile,
    Run,
}

/// Execution result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Exit status reported by the process; `None` when it did not exit on its own
    pub exit_code: Option<i32>,
    /// Program output (stdout), possibly truncated
    pub stdout: String,
    /// Program errors (stderr), possibly truncated
    pub stderr: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    /// Wall-clock time of the last stage that ran
    pub duration_ms: u64,
    pub termination_reason: TerminationReason,
    pub stage: ExecutionStage,
    /// Terminating signal, if any
    #[serde(default)]
    pub signal: Option<i32>,
    #[serde(default)]
    pub compile_duration_ms: Option<u64>,
    /// Operator-facing detail for faults and engine-initiated kills
    #[serde(default)]
    pub diagnostic: Option<String>,
}

impl RunResult {
    pub fn runner_fault(stage: ExecutionStage, diagnostic: impl Into<String>) -> Self {
        Self::aborted(TerminationReason::RunnerFault, stage, diagnostic)
    }

    pub(crate) fn aborted(
        reason: TerminationReason,
        stage: ExecutionStage,
        diagnostic: impl Into<String>,
    ) -> Self {
        Self {
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            stdout_truncated: false,
            stderr_truncated: false,
            duration_ms: 0,
            termination_reason: reason,
            stage,
            signal: None,
            compile_duration_ms: None,
            diagnostic: Some(diagnostic.into()),
        }
    }

    /// Ran to completion and reported success.
    pub fn is_success(&self) -> bool {
        self.termination_reason == TerminationReason::Completed
            && self.stage == ExecutionStage::Run
            && self.exit_code == Some(0)
    }

    pub fn is_truncated(&self) -> bool {
        self.stdout_truncated || self.stderr_truncated
    }
}

/// Work outside the stage ceilings: tool lookup, source write, spawning
const STAGE_OVERHEAD: Duration = Duration::from_secs(5);

/// Resource ceilings applied to every execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionLimits {
    /// Wall-clock ceiling of the run stage
    #[serde(rename = "max_duration_ms", with = "duration_ms")]
    pub max_duration: Duration,
    /// Address space ceiling (bytes)
    pub max_memory_bytes: u64,
    /// Per-stream capture ceiling (bytes)
    pub max_output_bytes: usize,
    /// Largest file the program may write (bytes)
    pub max_file_size_bytes: u64,
    /// Wall-clock ceiling of the compile stage
    #[serde(rename = "compile_timeout_ms", with = "duration_ms")]
    pub compile_timeout: Duration,
    /// Resident memory ceiling of the compile stage (bytes)
    pub max_compile_memory_bytes: u64,
    /// Time allowed for killing and reaping after a stage ends
    #[serde(rename = "cleanup_margin_ms", with = "duration_ms")]
    pub cleanup_margin: Duration,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(5),
            max_memory_bytes: 256 * 1024 * 1024, // 256MB
            max_output_bytes: 64 * 1024,         // 64KB
            max_file_size_bytes: 16 * 1024 * 1024,
            compile_timeout: Duration::from_secs(30),
            max_compile_memory_bytes: 1024 * 1024 * 1024, // 1GB
            cleanup_margin: Duration::from_secs(2),
        }
    }
}

impl ExecutionLimits {
    /// Upper bound on how long a single execution may keep the caller waiting.
    ///
    /// Both stage ceilings and their cleanup margins, plus a fixed allowance
    /// for the tool check, the source write and spawning.
    pub fn supervision_budget(&self) -> Duration {
        self.compile_timeout + self.max_duration + self.cleanup_margin * 2 + STAGE_OVERHEAD
    }

    pub fn max_memory_mb(&self) -> u64 {
        (self.max_memory_bytes / (1024 * 1024)).max(1)
    }
}

/// A program invocation prepared by a language runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
