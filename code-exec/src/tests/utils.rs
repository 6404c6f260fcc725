pub mod defaults {
    use crate::{EngineConfig, ExecutionCoordinator, ExecutionLimits, Result};
    use std::path::Path;
    use tokio::time::Duration;

    pub fn default_test_limits() -> ExecutionLimits {
        ExecutionLimits {
            max_duration: default_timeout(),
            cleanup_margin: Duration::from_secs(1),
            ..ExecutionLimits::default()
        }
    }

    pub fn test_config(sandbox_root: &Path) -> EngineConfig {
        EngineConfig::default()
            .with_sandbox_root(sandbox_root)
            .with_limits(default_test_limits())
    }

    pub fn test_coordinator(sandbox_root: &Path) -> Result<ExecutionCoordinator> {
        ExecutionCoordinator::from_config(test_config(sandbox_root))
    }

    pub fn default_timeout() -> Duration {
        Duration::from_secs(5)
    }

    pub fn short_timeout() -> Duration {
        Duration::from_secs(1)
    }
}

pub mod process {
    use std::time::{Duration, Instant};

    /// Whether `pid` has exited; zombies count as exited.
    pub fn is_gone(pid: i32) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Err(_) => true,
            Ok(stat) => stat
                .rsplit(')')
                .next()
                .and_then(|rest| rest.split_whitespace().next())
                .map(|state| state == "Z" || state == "X")
                .unwrap_or(false),
        }
    }

    /// Polls until `pid` is gone or `timeout` passes.
    pub async fn wait_until_gone(pid: i32, timeout: Duration) -> bool {
        let started = Instant::now();
        while started.elapsed() < timeout {
            if is_gone(pid) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        is_gone(pid)
    }

    pub fn first_pid(stdout: &str) -> i32 {
        stdout
            .lines()
            .next()
            .and_then(|line| line.trim().parse().ok())
            .unwrap_or_else(|| panic!("expected a pid in output: {:?}", stdout))
    }
}

pub mod fs {
    use std::path::Path;

    pub fn entry_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }
}
