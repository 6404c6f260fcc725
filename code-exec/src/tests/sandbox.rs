use crate::{
    languages::skip_if_not_available,
    sandbox::{ProcessLimits, Sandbox},
    tests::{fixtures::test_scenarios::PYTHON_HOLD_MEMORY, utils::defaults::default_test_limits},
    CancellationToken, CommandSpec, Result, RunOptions, TerminationReason,
};
use tempfile::tempdir;
use tokio::time::Duration;

fn process_limits(wall_time: Duration) -> ProcessLimits {
    let limits = default_test_limits();
    ProcessLimits {
        wall_time,
        memory_bytes: None,
        limit_address_space: false,
        file_size_bytes: limits.max_file_size_bytes,
        output_bytes: limits.max_output_bytes,
        cleanup_margin: limits.cleanup_margin,
    }
}

#[tokio::test]
async fn test_sandbox_layout_and_cleanup() -> Result<()> {
    let base = tempdir()?;
    let sandbox = Sandbox::new(base.path()).await?;
    let root = sandbox.root_dir().to_path_buf();

    assert!(root.starts_with(base.path()));
    assert!(sandbox.work_dir().is_dir());
    assert!(sandbox.home_dir().is_dir());
    assert!(sandbox.tmp_dir().is_dir());

    let written = sandbox.write_file("main.txt", "contents").await?;
    assert_eq!(std::fs::read_to_string(written)?, "contents");

    drop(sandbox);
    assert!(!root.exists());
    Ok(())
}

#[tokio::test]
async fn test_sandboxes_are_distinct() -> Result<()> {
    let base = tempdir()?;
    let first = Sandbox::new(base.path()).await?;
    let second = Sandbox::new(base.path()).await?;
    assert_ne!(first.id(), second.id());
    assert_ne!(first.root_dir(), second.root_dir());
    Ok(())
}

#[tokio::test]
async fn test_sandbox_basic() -> Result<()> {
    if skip_if_not_available(&["echo"]) {
        return Ok(());
    }
    let base = tempdir()?;
    let sandbox = Sandbox::new(base.path()).await?;

    let outcome = sandbox
        .run_process(
            &CommandSpec::new("echo").arg("Hello"),
            None,
            &process_limits(Duration::from_secs(5)),
            RunOptions::default(),
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(outcome.termination, TerminationReason::Completed);
    assert_eq!(outcome.exit_code, Some(0));
    assert_eq!(outcome.stdout.text.trim(), "Hello");
    assert!(outcome.stderr.text.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_sandbox_input() -> Result<()> {
    if skip_if_not_available(&["cat"]) {
        return Ok(());
    }
    let base = tempdir()?;
    let sandbox = Sandbox::new(base.path()).await?;

    let outcome = sandbox
        .run_process(
            &CommandSpec::new("cat"),
            Some("test input"),
            &process_limits(Duration::from_secs(5)),
            RunOptions::default(),
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(outcome.stdout.text, "test input");
    Ok(())
}

#[tokio::test]
async fn test_sandbox_unread_input_does_not_block() -> Result<()> {
    if skip_if_not_available(&["true"]) {
        return Ok(());
    }
    let base = tempdir()?;
    let sandbox = Sandbox::new(base.path()).await?;
    let input = "x".repeat(4 * 1024 * 1024);

    let outcome = sandbox
        .run_process(
            &CommandSpec::new("true"),
            Some(&input),
            &process_limits(Duration::from_secs(5)),
            RunOptions::default(),
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(outcome.termination, TerminationReason::Completed);
    assert_eq!(outcome.exit_code, Some(0));
    Ok(())
}

#[tokio::test]
async fn test_sandbox_timeout() -> Result<()> {
    if skip_if_not_available(&["sleep"]) {
        return Ok(());
    }
    let base = tempdir()?;
    let sandbox = Sandbox::new(base.path()).await?;

    let outcome = sandbox
        .run_process(
            &CommandSpec::new("sleep").arg("10"),
            None,
            &process_limits(Duration::from_millis(500)),
            RunOptions::default(),
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(outcome.termination, TerminationReason::TimedOut);
    assert_eq!(outcome.exit_code, None);
    assert!(outcome.duration < Duration::from_secs(3));
    Ok(())
}

#[tokio::test]
async fn test_sandbox_signal_is_reported() -> Result<()> {
    if skip_if_not_available(&["bash"]) {
        return Ok(());
    }
    let base = tempdir()?;
    let sandbox = Sandbox::new(base.path()).await?;

    let outcome = sandbox
        .run_process(
            &CommandSpec::new("bash").args(["-c", "kill -SEGV $$"]),
            None,
            &process_limits(Duration::from_secs(5)),
            RunOptions::default(),
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(outcome.termination, TerminationReason::Killed);
    assert_eq!(outcome.signal, Some(nix::sys::signal::Signal::SIGSEGV as i32));
    assert_eq!(outcome.exit_code, None);
    Ok(())
}

#[tokio::test]
async fn test_sandbox_missing_program() -> Result<()> {
    let base = tempdir()?;
    let sandbox = Sandbox::new(base.path()).await?;

    let outcome = sandbox
        .run_process(
            &CommandSpec::new("/nonexistent/toolchain"),
            None,
            &process_limits(Duration::from_secs(5)),
            RunOptions::default(),
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(outcome.termination, TerminationReason::RunnerFault);
    assert!(outcome
        .diagnostic
        .unwrap_or_default()
        .contains("/nonexistent/toolchain"));
    Ok(())
}

#[tokio::test]
async fn test_sandbox_cancellation() -> Result<()> {
    if skip_if_not_available(&["sleep"]) {
        return Ok(());
    }
    let base = tempdir()?;
    let sandbox = Sandbox::new(base.path()).await?;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = sandbox
        .run_process(
            &CommandSpec::new("sleep").arg("10"),
            None,
            &process_limits(Duration::from_secs(20)),
            RunOptions::default(),
            &cancel,
        )
        .await;
    assert_eq!(outcome.termination, TerminationReason::Killed);
    assert!(outcome.duration < Duration::from_secs(3));
    Ok(())
}

#[tokio::test]
async fn test_sandbox_resident_memory_ceiling() -> Result<()> {
    if skip_if_not_available(&["python3"]) {
        return Ok(());
    }
    let base = tempdir()?;
    let sandbox = Sandbox::new(base.path()).await?;
    let ceiling = 64 * 1024 * 1024;
    let limits = ProcessLimits {
        memory_bytes: Some(ceiling),
        ..process_limits(Duration::from_secs(20))
    };

    let outcome = sandbox
        .run_process(
            &CommandSpec::new("python3").args(["-c", PYTHON_HOLD_MEMORY]),
            None,
            &limits,
            RunOptions::default(),
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(outcome.termination, TerminationReason::Killed);
    assert_eq!(outcome.exit_code, None);
    assert!(outcome
        .diagnostic
        .unwrap_or_default()
        .starts_with(&format!("Memory limit of {} bytes exceeded", ceiling)));
    assert!(outcome.stdout.text.is_empty());
    assert!(outcome.duration < Duration::from_secs(10));
    Ok(())
}

#[tokio::test]
async fn test_sandbox_memory_under_ceiling_completes() -> Result<()> {
    if skip_if_not_available(&["echo"]) {
        return Ok(());
    }
    let base = tempdir()?;
    let sandbox = Sandbox::new(base.path()).await?;
    let limits = ProcessLimits {
        memory_bytes: Some(64 * 1024 * 1024),
        limit_address_space: true,
        ..process_limits(Duration::from_secs(5))
    };

    let outcome = sandbox
        .run_process(
            &CommandSpec::new("echo").arg("small"),
            None,
            &limits,
            RunOptions::default(),
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(outcome.termination, TerminationReason::Completed);
    assert_eq!(outcome.stdout.text.trim(), "small");
    Ok(())
}
