use anyhow::Context;
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Parser, Subcommand};
use quiz_exec::{
    AttemptId, QuizExec, QuizExecConfig, QuizWindow, RunOptions, RunRequest,
    TerminationReason,
};
use serde_json::json;
use std::{path::PathBuf, process::ExitCode, time::Duration};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Exit status reported when the submission ran out of time
const EXIT_TIMED_OUT: u8 = 124;
const EXIT_KILLED: u8 = 137;
/// sysexits EX_SOFTWARE
const EXIT_RUNNER_FAULT: u8 = 70;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// Maximum number of concurrent executions
    #[arg(short, long, global = true)]
    max_concurrent: Option<usize>,

    /// Wall-clock limit of the run stage in milliseconds
    #[arg(long, global = true)]
    time_limit_ms: Option<u64>,

    /// Memory limit in bytes
    #[arg(long, global = true)]
    memory_limit: Option<u64>,

    /// Per-stream output limit in bytes
    #[arg(long, global = true)]
    output_limit: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the supported languages
    Languages,

    /// Execute a source file
    Run {
        /// Language id or alias
        #[arg(short, long)]
        language: String,

        /// Source file to execute
        #[arg(short, long)]
        source: PathBuf,

        /// File fed to the program's stdin
        #[arg(long)]
        stdin: Option<PathBuf>,

        /// Discard the program's stdout
        #[arg(long)]
        no_stdout: bool,

        /// Discard the program's stderr
        #[arg(long)]
        no_stderr: bool,
    },

    /// Decide whether a save at a given instant would be accepted
    CheckSave {
        /// Attempt start (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,

        /// Allotted working time in seconds
        #[arg(long)]
        allotted_secs: i64,

        /// Instant of the save (RFC 3339)
        #[arg(long)]
        at: DateTime<Utc>,

        /// Grace buffer in seconds; defaults to the configured policy
        #[arg(long)]
        grace_secs: Option<i64>,

        /// Quiz opening time (RFC 3339); with --quiz-closes gates the save
        #[arg(long, requires = "quiz_closes")]
        quiz_opens: Option<DateTime<Utc>>,

        /// Quiz closing time (RFC 3339)
        #[arg(long, requires = "quiz_opens")]
        quiz_closes: Option<DateTime<Utc>>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(args: &Args) -> anyhow::Result<QuizExecConfig> {
    let mut config = match &args.config {
        Some(path) => QuizExecConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => QuizExecConfig::default(),
    };

    if let Some(max) = args.max_concurrent {
        config.engine.max_concurrent_executions = max;
    }
    if let Some(ms) = args.time_limit_ms {
        config.engine.limits.max_duration = Duration::from_millis(ms);
    }
    if let Some(bytes) = args.memory_limit {
        config.engine.limits.max_memory_bytes = bytes;
    }
    if let Some(bytes) = args.output_limit {
        config.engine.limits.max_output_bytes = bytes;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let config = load_config(&args)?;
    let quiz_exec = QuizExec::new(config)?;

    match args.command {
        Command::Languages => {
            let languages = quiz_exec.list_supported_languages();
            println!("{}", serde_json::to_string_pretty(languages)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Run {
            language,
            source,
            stdin,
            no_stdout,
            no_stderr,
        } => {
            let code = tokio::fs::read_to_string(&source)
                .await
                .with_context(|| format!("reading source file {}", source.display()))?;
            let mut request = RunRequest::new(language, code).with_options(RunOptions {
                capture_stdout: !no_stdout,
                capture_stderr: !no_stderr,
            });
            if let Some(path) = stdin {
                let input = tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("reading stdin file {}", path.display()))?;
                request = request.with_stdin(input);
            }

            let result = quiz_exec.engine().run_code(request).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);

            let status = match result.termination_reason {
                TerminationReason::Completed => {
                    result.exit_code.map(|c| (c & 0xff) as u8).unwrap_or(1)
                }
                TerminationReason::TimedOut => EXIT_TIMED_OUT,
                TerminationReason::Killed => EXIT_KILLED,
                TerminationReason::RunnerFault => EXIT_RUNNER_FAULT,
            };
            Ok(ExitCode::from(status))
        }
        Command::CheckSave {
            start,
            allotted_secs,
            at,
            grace_secs,
            quiz_opens,
            quiz_closes,
        } => {
            let allotted = TimeDelta::try_seconds(allotted_secs)
                .context("allotted time out of range")?;
            let attempt_id = AttemptId::generate();
            let clock = quiz_exec.clock();
            let window = match grace_secs {
                Some(secs) => clock.start_attempt_with_grace(
                    attempt_id.clone(),
                    start,
                    allotted,
                    TimeDelta::try_seconds(secs).context("grace buffer out of range")?,
                )?,
                None => clock.start_attempt(attempt_id.clone(), start, allotted)?,
            };
            let state = clock.state(&attempt_id, at)?;

            let decision = match (quiz_opens, quiz_closes) {
                (Some(opens), Some(closes)) => {
                    quiz_exec.evaluate_save(&QuizWindow::new(opens, closes), &attempt_id, at)
                }
                _ => clock.evaluate_save(&attempt_id, at).map_err(Into::into),
            };

            let (accepted, mut report) = match decision {
                Ok(receipt) => (true, json!({ "accepted": true, "receipt": receipt })),
                Err(e) => (false, json!({ "accepted": false, "reason": e.to_string() })),
            };
            info!(attempt_id = %attempt_id, accepted, state = %state, "Save evaluated");

            report["state"] = json!(state);
            report["window"] = json!(window);
            report["remaining_ms"] = json!(window.remaining_time(at).num_milliseconds());
            println!("{}", serde_json::to_string_pretty(&report)?);

            Ok(if accepted {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
