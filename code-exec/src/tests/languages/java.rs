use super::super::fixtures::{code_samples::JAVA_HELLO, test_scenarios::JAVA_EXIT_CODE};
use super::*;

const TOOLS: &[&str] = &["java", "javac"];

#[tokio::test]
async fn test_java_basic() -> Result<()> {
    test_language_execution(TOOLS, "java", JAVA_HELLO).await
}

#[tokio::test]
async fn test_java_exit_code_and_stderr() -> Result<()> {
    let Some(result) = run_language(TOOLS, "java", JAVA_EXIT_CODE, None).await? else {
        return Ok(());
    };
    assert_eq!(result.exit_code, Some(7));
    assert_eq!(result.stderr.trim(), "failing");
    Ok(())
}
