use super::super::fixtures::{code_samples::TS_HELLO, test_scenarios::TS_TYPE_ERROR};
use super::*;
use crate::ExecutionStage;

const TOOLS: &[&str] = &["tsc", "node"];

#[tokio::test]
async fn test_typescript_basic() -> Result<()> {
    test_language_execution(TOOLS, "typescript", TS_HELLO).await
}

#[tokio::test]
async fn test_typescript_type_error_stops_at_compile() -> Result<()> {
    let Some(result) = run_language(TOOLS, "ts", TS_TYPE_ERROR, None).await? else {
        return Ok(());
    };
    assert_eq!(result.stage, ExecutionStage::Compile);
    assert_ne!(result.exit_code, Some(0));
    // tsc reports diagnostics on stdout.
    assert!(result.stdout.contains("TS2322") || result.stderr.contains("TS2322"));
    Ok(())
}
