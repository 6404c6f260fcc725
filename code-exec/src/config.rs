use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path, path::PathBuf, time::Duration};

use crate::{error::Error, types::ExecutionLimits};

/// Engine configuration
///
/// Every field has a default, so an empty TOML document is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Executions allowed to run at the same time
    pub max_concurrent_executions: usize,
    /// Directory under which per-execution sandboxes are created
    pub sandbox_root: PathBuf,
    /// Ceilings applied to every execution
    pub limits: ExecutionLimits,
    /// Language id -> compiler, interpreter or JDK home override
    pub toolchains: HashMap<String, String>,
    /// Restrict the registry to these language ids; `None` enables all built-ins
    pub enabled_languages: Option<Vec<String>>,
    /// `GOCACHE` shared by every Go compile; `None` gives each sandbox its own
    pub go_build_cache: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_executions: 10,
            sandbox_root: std::env::temp_dir(),
            limits: ExecutionLimits::default(),
            toolchains: HashMap::new(),
            enabled_languages: None,
            go_build_cache: None,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.max_concurrent_executions == 0 {
            return Err(Error::Config(
                "max_concurrent_executions must be at least 1".to_string(),
            ));
        }
        let limits = &self.limits;
        if limits.max_duration.is_zero() {
            return Err(Error::Config("max_duration_ms must be positive".to_string()));
        }
        if limits.compile_timeout.is_zero() {
            return Err(Error::Config("compile_timeout_ms must be positive".to_string()));
        }
        if limits.max_memory_bytes < 1024 * 1024 {
            return Err(Error::Config(
                "max_memory_bytes must be at least 1 MiB".to_string(),
            ));
        }
        if limits.max_compile_memory_bytes < 1024 * 1024 {
            return Err(Error::Config(
                "max_compile_memory_bytes must be at least 1 MiB".to_string(),
            ));
        }
        if limits.max_file_size_bytes == 0 {
            return Err(Error::Config(
                "max_file_size_bytes must be positive".to_string(),
            ));
        }
        if let Some(enabled) = &self.enabled_languages {
            if enabled.is_empty() {
                return Err(Error::Config(
                    "enabled_languages must not be empty when set".to_string(),
                ));
            }
        }
        if let Some(cache) = &self.go_build_cache {
            if !cache.is_absolute() {
                return Err(Error::Config(format!(
                    "go_build_cache must be an absolute path, got {}",
                    cache.display()
                )));
            }
        }
        Ok(())
    }

    pub fn with_max_concurrent_executions(mut self, max: usize) -> Self {
        self.max_concurrent_executions = max;
        self
    }

    pub fn with_sandbox_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sandbox_root = root.into();
        self
    }

    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.limits.max_duration = max_duration;
        self
    }

    pub fn with_max_output_bytes(mut self, max_output_bytes: usize) -> Self {
        self.limits.max_output_bytes = max_output_bytes;
        self
    }

    pub fn with_max_memory_bytes(mut self, max_memory_bytes: u64) -> Self {
        self.limits.max_memory_bytes = max_memory_bytes;
        self
    }

    pub fn with_toolchain(mut self, language: &str, path: impl Into<String>) -> Self {
        self.toolchains
            .insert(language.to_ascii_lowercase(), path.into());
        self
    }

    pub fn with_enabled_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled_languages = Some(languages.into_iter().map(Into::into).collect());
        self
    }
}
