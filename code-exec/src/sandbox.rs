use crate::{
    capture::{CapturedOutput, StreamCapture},
    error::Error,
    types::{CommandSpec, RunOptions, TerminationReason},
};
use nix::sys::resource::{setrlimit, Resource};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::{
    future::pending,
    io,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::Instant,
};
use tokio::{
    fs,
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    process::Command,
    time::{self, Duration},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Minimal PATH exposed to submissions and toolchains
const SANDBOX_PATH: &str = "/usr/local/bin:/usr/bin:/bin";
const READ_CHUNK: usize = 8 * 1024;
const MEMORY_SAMPLE_INTERVAL: Duration = Duration::from_millis(25);
pub(crate) const CANCELLED: &str = "execution cancelled";

/// Ceilings for one process launched inside a sandbox
#[derive(Debug, Clone)]
pub struct ProcessLimits {
    pub wall_time: Duration,
    /// Resident memory ceiling of the whole process group, enforced by
    /// sampling; `None` leaves memory unbounded
    pub memory_bytes: Option<u64>,
    /// Also apply `memory_bytes` as `RLIMIT_AS`
    pub limit_address_space: bool,
    pub file_size_bytes: u64,
    pub output_bytes: usize,
    pub cleanup_margin: Duration,
}

impl ProcessLimits {
    fn cpu_seconds(&self) -> u64 {
        // Backstop only; the wall clock is the real ceiling.
        self.wall_time.as_secs() + 2
    }
}

/// What happened to one process
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub stdout: CapturedOutput,
    pub stderr: CapturedOutput,
    pub duration: Duration,
    pub termination: TerminationReason,
    pub diagnostic: Option<String>,
}

impl ProcessOutcome {
    fn fault(diagnostic: String) -> Self {
        Self {
            exit_code: None,
            signal: None,
            stdout: CapturedOutput::default(),
            stderr: CapturedOutput::default(),
            duration: Duration::ZERO,
            termination: TerminationReason::RunnerFault,
            diagnostic: Some(diagnostic),
        }
    }
}

/// Ephemeral, exclusively owned working area for one execution.
///
/// Layout under the root directory:
/// - `work/`: current directory of every process, holds the source and build output
/// - `home/`: `HOME` of every process
/// - `tmp/`: `TMPDIR` of every process
///
/// The whole tree is removed when the sandbox is dropped.
pub struct Sandbox {
    id: String,
    root_dir: PathBuf,
}

impl Sandbox {
    /// Create a new sandbox directory under `base_dir`
    pub async fn new(base_dir: &Path) -> Result<Self, Error> {
        let id = Uuid::new_v4().to_string();
        let root_dir = base_dir.join(format!("sandbox-{}", id));

        fs::create_dir_all(&root_dir)
            .await
            .map_err(|e| Error::Sandbox(format!("Failed to create sandbox directory: {}", e)))?;

        // From here on Drop owns the cleanup.
        let sandbox = Sandbox { id, root_dir };

        for dir in &["work", "home", "tmp"] {
            fs::create_dir_all(sandbox.root_dir.join(dir))
                .await
                .map_err(|e| {
                    Error::Sandbox(format!("Failed to create {} directory: {}", dir, e))
                })?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&sandbox.root_dir, std::fs::Permissions::from_mode(0o700))
                .await
                .map_err(|e| Error::Sandbox(format!("Failed to set permissions: {}", e)))?;
        }

        debug!(sandbox = %sandbox.id, root = %sandbox.root_dir.display(), "Sandbox created");
        Ok(sandbox)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root_dir.join("work")
    }

    pub fn home_dir(&self) -> PathBuf {
        self.root_dir.join("home")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.root_dir.join("tmp")
    }

    /// Absolute path of a file in the working directory, as a string for command lines
    pub fn work_path(&self, name: &str) -> String {
        self.work_dir().join(name).to_string_lossy().into_owned()
    }

    /// Write a file into the working directory
    pub async fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf, Error> {
        let path = self.work_dir().join(name);
        fs::write(&path, contents)
            .await
            .map_err(|e| Error::Sandbox(format!("Failed to write {}: {}", name, e)))?;
        Ok(path)
    }

    /// Run one process inside the sandbox.
    ///
    /// The process gets its own process group, which is killed with `SIGKILL`
    /// on timeout, on cancellation, when its resident memory goes over the
    /// ceiling, after it exits (to take stray children with it) and when this
    /// future is dropped. Never fails: problems starting the process are
    /// reported as `RunnerFault`.
    pub async fn run_process(
        &self,
        spec: &CommandSpec,
        stdin: Option<&str>,
        limits: &ProcessLimits,
        capture: RunOptions,
        cancel: &CancellationToken,
    ) -> ProcessOutcome {
        let program = match resolve_program(&spec.program) {
            Ok(path) => path,
            Err(e) => return ProcessOutcome::fault(e.to_string()),
        };

        debug!(sandbox = %self.id, program = %program.display(), args = ?spec.args, "Spawning process");

        let mut command = Command::new(&program);
        command
            .args(&spec.args)
            .env_clear()
            .env("PATH", SANDBOX_PATH)
            .env("HOME", self.home_dir())
            .env("TMPDIR", self.tmp_dir())
            .env("LANG", "C.UTF-8")
            .envs(spec.env.iter().map(|(k, v)| (k, v)))
            .current_dir(self.work_dir())
            .stdin(piped_if(stdin.is_some()))
            .stdout(piped_if(capture.capture_stdout))
            .stderr(piped_if(capture.capture_stderr))
            .process_group(0)
            .kill_on_drop(true);

        let address_space = limits.memory_bytes.filter(|_| limits.limit_address_space);
        let file_size = limits.file_size_bytes;
        let cpu_time = limits.cpu_seconds();

        unsafe {
            command.pre_exec(move || {
                setrlimit(Resource::RLIMIT_CORE, 0, 0)?;
                setrlimit(Resource::RLIMIT_FSIZE, file_size, file_size)?;
                setrlimit(Resource::RLIMIT_CPU, cpu_time, cpu_time)?;
                if let Some(bytes) = address_space {
                    setrlimit(Resource::RLIMIT_AS, bytes, bytes)?;
                }
                Ok(())
            });
        }

        let started = Instant::now();
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ProcessOutcome::fault(format!(
                    "Failed to spawn {}: {}",
                    program.display(),
                    e
                ))
            }
        };

        let mut group = ProcessGroup::new(child.id());

        let feeder = match (stdin, child.stdin.take()) {
            (Some(input), Some(mut pipe)) => {
                let bytes = input.as_bytes().to_vec();
                Some(tokio::spawn(async move {
                    if let Err(e) = pipe.write_all(&bytes).await {
                        // The program may legitimately exit without reading its input.
                        debug!("stdin not fully consumed: {}", e);
                    }
                    // Dropping the pipe signals EOF.
                }))
            }
            _ => None,
        };

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let mut out_capture = StreamCapture::new(limits.output_bytes);
        let mut err_capture = StreamCapture::new(limits.output_bytes);
        let mut out_buf = vec![0u8; READ_CHUNK];
        let mut err_buf = vec![0u8; READ_CHUNK];

        let deadline = time::Instant::now() + limits.wall_time;
        let mut memory_tick = time::interval(MEMORY_SAMPLE_INTERVAL);
        memory_tick.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        let mut status: Option<ExitStatus> = None;
        let mut killed_for: Option<(TerminationReason, String)> = None;
        let mut wait_error: Option<String> = None;
        // Set once the process has exited or been killed; bounds the drain.
        let mut hard_stop: Option<time::Instant> = None;

        loop {
            if status.is_some() && stdout.is_none() && stderr.is_none() {
                break;
            }

            tokio::select! {
                read = read_chunk(&mut stdout, &mut out_buf), if stdout.is_some() => match read {
                    Ok(0) | Err(_) => stdout = None,
                    Ok(n) => out_capture.push(&out_buf[..n]),
                },
                read = read_chunk(&mut stderr, &mut err_buf), if stderr.is_some() => match read {
                    Ok(0) | Err(_) => stderr = None,
                    Ok(n) => err_capture.push(&err_buf[..n]),
                },
                waited = child.wait(), if status.is_none() && wait_error.is_none() => {
                    match waited {
                        Ok(exit) => status = Some(exit),
                        Err(e) => wait_error = Some(format!("Failed to wait for process: {}", e)),
                    }
                    group.kill();
                    hard_stop.get_or_insert(time::Instant::now() + limits.cleanup_margin);
                },
                _ = time::sleep_until(deadline), if killed_for.is_none() && status.is_none() => {
                    warn!(sandbox = %self.id, timeout_ms = limits.wall_time.as_millis() as u64, "Process timed out, killing process group");
                    killed_for = Some((
                        TerminationReason::TimedOut,
                        format!("Wall-clock limit of {}ms exceeded", limits.wall_time.as_millis()),
                    ));
                    group.kill();
                    hard_stop.get_or_insert(time::Instant::now() + limits.cleanup_margin);
                },
                _ = cancel.cancelled(), if killed_for.is_none() && status.is_none() => {
                    warn!(sandbox = %self.id, "Execution cancelled, killing process group");
                    killed_for = Some((TerminationReason::Killed, CANCELLED.to_string()));
                    group.kill();
                    hard_stop.get_or_insert(time::Instant::now() + limits.cleanup_margin);
                },
                _ = memory_tick.tick(), if limits.memory_bytes.is_some() && killed_for.is_none() && status.is_none() => {
                    let ceiling = limits.memory_bytes.unwrap_or(u64::MAX);
                    let resident = group.resident_bytes();
                    if resident > ceiling {
                        warn!(sandbox = %self.id, resident, ceiling, "Memory limit exceeded, killing process group");
                        killed_for = Some((
                            TerminationReason::Killed,
                            format!("Memory limit of {} bytes exceeded ({} bytes resident)", ceiling, resident),
                        ));
                        group.kill();
                        hard_stop.get_or_insert(time::Instant::now() + limits.cleanup_margin);
                    }
                },
                _ = time::sleep_until(hard_stop.unwrap_or(deadline)), if hard_stop.is_some() => {
                    debug!(sandbox = %self.id, "Cleanup margin elapsed, abandoning output drain");
                    break;
                },
            }
        }

        let duration = started.elapsed();
        group.kill();
        if let Some(feeder) = feeder {
            feeder.abort();
        }

        for (stream, capture) in [("stdout", &out_capture), ("stderr", &err_capture)] {
            if capture.is_truncated() {
                debug!(sandbox = %self.id, stream, discarded = capture.discarded(), "Output truncated");
            }
        }
        let stdout = out_capture.finish();
        let stderr = err_capture.finish();

        if let Some((reason, diagnostic)) = killed_for {
            return ProcessOutcome {
                exit_code: None,
                signal: Some(Signal::SIGKILL as i32),
                stdout,
                stderr,
                duration,
                termination: reason,
                diagnostic: Some(diagnostic),
            };
        }

        let Some(status) = status else {
            let diagnostic =
                wait_error.unwrap_or_else(|| "Process did not report an exit status".to_string());
            error!(sandbox = %self.id, "{}", diagnostic);
            return ProcessOutcome {
                stdout,
                stderr,
                duration,
                ..ProcessOutcome::fault(diagnostic)
            };
        };

        let (exit_code, signal, termination, diagnostic) = classify(status);
        ProcessOutcome {
            exit_code,
            signal,
            stdout,
            stderr,
            duration,
            termination,
            diagnostic,
        }
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        // Clean up sandbox directory
        if let Err(e) = std::fs::remove_dir_all(&self.root_dir) {
            if e.kind() != io::ErrorKind::NotFound {
                error!(sandbox = %self.id, "Failed to clean up sandbox directory: {}", e);
            }
        } else {
            debug!(sandbox = %self.id, "Sandbox removed");
        }
    }
}

/// Kills the whole process group of a spawned child; also on drop.
struct ProcessGroup {
    pgid: Option<Pid>,
}

impl ProcessGroup {
    fn new(leader: Option<u32>) -> Self {
        Self {
            pgid: leader.map(|pid| Pid::from_raw(pid as i32)),
        }
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid {
            // ESRCH just means every member is already gone.
            let _ = killpg(pgid, Signal::SIGKILL);
        }
    }

    /// Resident memory of every live member of the group, in bytes
    fn resident_bytes(&self) -> u64 {
        match self.pgid {
            Some(pgid) => group_resident_bytes(pgid.as_raw()),
            None => 0,
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

fn group_resident_bytes(pgid: i32) -> u64 {
    let Ok(entries) = std::fs::read_dir("/proc") else {
        return 0;
    };
    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
        .filter(|pid| process_group_of(*pid) == Some(pgid))
        .filter_map(resident_bytes_of)
        .sum()
}

fn process_group_of(pid: u32) -> Option<i32> {
    let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
    // After the command name: state, ppid, pgrp.
    stat.rsplit_once(')')?
        .1
        .split_whitespace()
        .nth(2)?
        .parse()
        .ok()
}

/// `VmRSS` of one process; zombies have none.
fn resident_bytes_of(pid: u32) -> Option<u64> {
    let status = std::fs::read_to_string(format!("/proc/{}/status", pid)).ok()?;
    let kb: u64 = status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))?
        .split_whitespace()
        .next()?
        .parse()
        .ok()?;
    Some(kb * 1024)
}

fn piped_if(enabled: bool) -> Stdio {
    if enabled {
        Stdio::piped()
    } else {
        Stdio::null()
    }
}

async fn read_chunk<R: AsyncRead + Unpin>(
    reader: &mut Option<R>,
    buf: &mut [u8],
) -> io::Result<usize> {
    match reader {
        Some(reader) => reader.read(buf).await,
        None => pending().await,
    }
}

/// Absolute paths are used as-is, bare names are looked up on the host PATH.
fn resolve_program(program: &str) -> Result<PathBuf, Error> {
    let path = Path::new(program);
    if path.is_absolute() {
        return if path.exists() {
            Ok(path.to_path_buf())
        } else {
            Err(Error::Sandbox(format!("Command not found: {}", program)))
        };
    }
    which::which(program).map_err(|_| Error::Sandbox(format!("Command not found: {}", program)))
}

fn classify(
    status: ExitStatus,
) -> (
    Option<i32>,
    Option<i32>,
    TerminationReason,
    Option<String>,
) {
    if let Some(code) = status.code() {
        return (Some(code), None, TerminationReason::Completed, None);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            if signal == Signal::SIGXCPU as i32 {
                return (
                    None,
                    Some(signal),
                    TerminationReason::TimedOut,
                    Some("CPU time limit exceeded".to_string()),
                );
            }
            return (
                None,
                Some(signal),
                TerminationReason::Killed,
                Some(format!("Terminated by signal {}", signal)),
            );
        }
    }

    (
        None,
        None,
        TerminationReason::Killed,
        Some(format!("Abnormal termination: {}", status)),
    )
}
