use super::super::fixtures::{
    code_samples::PYTHON_HELLO,
    test_scenarios::{PYTHON_RAISE, PYTHON_SYNTAX_ERROR},
    with_input::PYTHON_SUM,
};
use super::*;
use crate::ExecutionStage;

const TOOLS: &[&str] = &["python3"];

#[tokio::test]
async fn test_python_basic() -> Result<()> {
    test_language_execution(TOOLS, "python3", PYTHON_HELLO).await
}

#[tokio::test]
async fn test_python_input() -> Result<()> {
    let Some(result) = run_language(TOOLS, "py", PYTHON_SUM, Some("1 2 3\n4\n")).await? else {
        return Ok(());
    };
    assert_eq!(result.stdout.trim(), "10");
    Ok(())
}

#[tokio::test]
async fn test_python_syntax_error_is_a_program_failure() -> Result<()> {
    let Some(result) = run_language(TOOLS, "python3", PYTHON_SYNTAX_ERROR, None).await? else {
        return Ok(());
    };
    assert_eq!(result.termination_reason, TerminationReason::Completed);
    assert_eq!(result.stage, ExecutionStage::Run);
    assert_ne!(result.exit_code, Some(0));
    assert!(result.stderr.contains("SyntaxError"));
    Ok(())
}

#[tokio::test]
async fn test_python_uncaught_exception() -> Result<()> {
    let Some(result) = run_language(TOOLS, "python", PYTHON_RAISE, None).await? else {
        return Ok(());
    };
    assert_eq!(result.exit_code, Some(1));
    assert!(result.stderr.contains("ValueError: boom"));
    Ok(())
}
