use super::super::fixtures::{
    code_samples::JS_HELLO, test_scenarios::JS_UNCAUGHT, with_input::JS_UPPER,
};
use super::*;

const TOOLS: &[&str] = &["node"];

#[tokio::test]
async fn test_javascript_basic() -> Result<()> {
    test_language_execution(TOOLS, "javascript", JS_HELLO).await
}

#[tokio::test]
async fn test_javascript_input() -> Result<()> {
    let Some(result) = run_language(TOOLS, "js", JS_UPPER, Some("quiet words")).await? else {
        return Ok(());
    };
    assert_eq!(result.stdout.trim(), "QUIET WORDS");
    Ok(())
}

#[tokio::test]
async fn test_javascript_uncaught_error() -> Result<()> {
    let Some(result) = run_language(TOOLS, "node", JS_UNCAUGHT, None).await? else {
        return Ok(());
    };
    assert_eq!(result.termination_reason, TerminationReason::Completed);
    assert_ne!(result.exit_code, Some(0));
    assert!(result.stderr.contains("boom"));
    Ok(())
}
