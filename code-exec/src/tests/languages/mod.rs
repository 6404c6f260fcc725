use super::utils::defaults::test_coordinator;
use crate::{languages::skip_if_not_available, Result, RunRequest, RunResult, TerminationReason};
use tempfile::tempdir;

pub mod golang;
pub mod java;
pub mod javascript;
pub mod python;
pub mod rust;
pub mod typescript;

/// Runs `code` through a fresh coordinator; `None` when a tool is missing.
pub(crate) async fn run_language(
    tools: &[&str],
    language: &str,
    code: &str,
    stdin: Option<&str>,
) -> Result<Option<RunResult>> {
    if skip_if_not_available(tools) {
        return Ok(None);
    }
    let root = tempdir()?;
    let coordinator = test_coordinator(root.path())?;

    let mut request = RunRequest::new(language, code);
    if let Some(stdin) = stdin {
        request = request.with_stdin(stdin);
    }
    Ok(Some(coordinator.run_code(request).await?))
}

// Common test utilities for language tests
pub(crate) async fn test_language_execution(tools: &[&str], language: &str, code: &str) -> Result<()> {
    let Some(result) = run_language(tools, language, code, None).await? else {
        return Ok(());
    };
    assert_eq!(
        result.termination_reason,
        TerminationReason::Completed,
        "{:?}",
        result
    );
    assert!(result.is_success(), "{:?}", result);
    assert!(result.stdout.contains("Hello from"));
    assert!(result.stderr.is_empty(), "{}", result.stderr);
    Ok(())
}
