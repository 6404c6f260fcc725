mod languages;
mod sandbox;
mod utils;

use crate::{languages::skip_if_not_available, Error, RunRequest, TerminationReason};
use fixtures::code_samples::BASH_HELLO;
use tempfile::tempdir;
use utils::{defaults::test_coordinator, fs::entry_count};

#[tokio::test]
async fn test_bash_execution() -> Result<(), Error> {
    if skip_if_not_available(&["bash"]) {
        return Ok(());
    }
    let root = tempdir()?;
    let coordinator = test_coordinator(root.path())?;

    let result = coordinator.run_code(RunRequest::new("bash", BASH_HELLO)).await?;
    assert_eq!(result.termination_reason, TerminationReason::Completed);
    assert_eq!(result.exit_code, Some(0));
    assert_eq!(result.stdout, "Hello from Bash!\n");
    assert!(result.stderr.is_empty());
    assert!(result.is_success());
    assert_eq!(entry_count(root.path()), 0);
    Ok(())
}

#[tokio::test]
async fn test_alias_and_case_resolve_to_same_runner() -> Result<(), Error> {
    if skip_if_not_available(&["bash"]) {
        return Ok(());
    }
    let root = tempdir()?;
    let coordinator = test_coordinator(root.path())?;

    for language in ["bash", "BASH", "sh"] {
        let result = coordinator
            .run_code(RunRequest::new(language, BASH_HELLO))
            .await?;
        assert_eq!(result.stdout.trim(), "Hello from Bash!");
    }
    Ok(())
}

#[tokio::test]
async fn test_result_serializes_for_outer_layers() -> Result<(), Error> {
    if skip_if_not_available(&["bash"]) {
        return Ok(());
    }
    let root = tempdir()?;
    let coordinator = test_coordinator(root.path())?;

    let result = coordinator.run_code(RunRequest::new("bash", BASH_HELLO)).await?;
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["termination_reason"], "completed");
    assert_eq!(json["stage"], "run");
    assert_eq!(json["exit_code"], 0);
    Ok(())
}
