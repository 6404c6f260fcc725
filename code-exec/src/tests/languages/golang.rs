use super::super::fixtures::{
    code_samples::GO_HELLO,
    test_scenarios::{GO_COMPILE_ERROR, GO_WITH_TIMEOUT},
    with_input::GO_ECHO,
};
use super::*;
use crate::ExecutionStage;

const TOOLS: &[&str] = &["go"];

#[tokio::test]
async fn test_go_basic() -> Result<()> {
    test_language_execution(TOOLS, "go", GO_HELLO).await
}

#[tokio::test]
async fn test_go_input() -> Result<()> {
    let Some(result) = run_language(TOOLS, "golang", GO_ECHO, Some("a\nb\n")).await? else {
        return Ok(());
    };
    assert_eq!(result.stdout, "got a\ngot b\n");
    Ok(())
}

#[tokio::test]
async fn test_go_compile_error() -> Result<()> {
    let Some(result) = run_language(TOOLS, "go", GO_COMPILE_ERROR, None).await? else {
        return Ok(());
    };
    assert_eq!(result.termination_reason, TerminationReason::Completed);
    assert_eq!(result.stage, ExecutionStage::Compile);
    assert!(result.stderr.contains("undefined"));
    Ok(())
}

#[tokio::test]
async fn test_go_timeout() -> Result<()> {
    let Some(result) = run_language(TOOLS, "go", GO_WITH_TIMEOUT, None).await? else {
        return Ok(());
    };
    assert_eq!(result.termination_reason, TerminationReason::TimedOut);
    assert_eq!(result.stage, ExecutionStage::Run);
    assert!(result.compile_duration_ms.is_some());
    Ok(())
}
