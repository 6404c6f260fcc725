use super::super::fixtures::{
    code_samples::RUST_HELLO,
    test_scenarios::{RUST_COMPILE_ERROR, RUST_PANIC, RUST_WITH_TIMEOUT},
    with_input::RUST_DOUBLE,
};
use super::*;
use crate::ExecutionStage;

const TOOLS: &[&str] = &["rustc"];

#[tokio::test]
async fn test_rust_basic() -> Result<()> {
    test_language_execution(TOOLS, "rust", RUST_HELLO).await
}

#[tokio::test]
async fn test_rust_input() -> Result<()> {
    let Some(result) = run_language(TOOLS, "rs", RUST_DOUBLE, Some("21\n")).await? else {
        return Ok(());
    };
    assert_eq!(result.stdout.trim(), "42");
    Ok(())
}

#[tokio::test]
async fn test_rust_compile_error() -> Result<()> {
    let Some(result) = run_language(TOOLS, "rust", RUST_COMPILE_ERROR, None).await? else {
        return Ok(());
    };
    assert_eq!(result.stage, ExecutionStage::Compile);
    assert_ne!(result.exit_code, Some(0));
    assert!(result.stderr.contains("mismatched types"));
    Ok(())
}

#[tokio::test]
async fn test_rust_panic_exit_code() -> Result<()> {
    let Some(result) = run_language(TOOLS, "rust", RUST_PANIC, None).await? else {
        return Ok(());
    };
    assert_eq!(result.stage, ExecutionStage::Run);
    assert_eq!(result.exit_code, Some(101));
    assert!(result.stderr.contains("boom"));
    Ok(())
}

#[tokio::test]
async fn test_rust_timeout() -> Result<()> {
    let Some(result) = run_language(TOOLS, "rust", RUST_WITH_TIMEOUT, None).await? else {
        return Ok(());
    };
    assert_eq!(result.termination_reason, TerminationReason::TimedOut);
    assert_eq!(result.exit_code, None);
    Ok(())
}
