use std::path::PathBuf;

use crate::{
    runner::LanguageRunner,
    sandbox::Sandbox,
    types::{CommandSpec, ExecutionLimits, SupportedLanguage},
};

pub struct GoRunner {
    language: SupportedLanguage,
    go: String,
    build_cache: Option<PathBuf>,
}

impl GoRunner {
    /// `build_cache` is a `GOCACHE` shared by every compile; without one each
    /// sandbox starts from an empty cache.
    pub fn new(go: Option<String>, build_cache: Option<PathBuf>) -> Self {
        Self {
            language: SupportedLanguage::new("go", "Go", None),
            go: go.unwrap_or_else(|| "go".to_string()),
            build_cache,
        }
    }
}

impl LanguageRunner for GoRunner {
    fn language(&self) -> &SupportedLanguage {
        &self.language
    }

    fn required_tools(&self) -> Vec<&str> {
        vec![self.go.as_str()]
    }

    fn source_file_name(&self) -> &str {
        "main.go"
    }

    fn compile_command(&self, sandbox: &Sandbox) -> Option<CommandSpec> {
        let tmp = sandbox.tmp_dir();
        let cache = self
            .build_cache
            .clone()
            .unwrap_or_else(|| tmp.join("go-build"));
        Some(
            CommandSpec::new(&self.go)
                .args(["build", "-o", "main", "main.go"])
                .env("GOCACHE", cache.to_string_lossy())
                .env("GOPATH", tmp.join("go").to_string_lossy())
                .env("GOTOOLCHAIN", "local")
                .env("GOFLAGS", "-mod=mod")
                .env("CGO_ENABLED", "0"),
        )
    }

    fn run_command(&self, sandbox: &Sandbox, limits: &ExecutionLimits) -> CommandSpec {
        CommandSpec::new(sandbox.work_path("main"))
            .env("GOMEMLIMIT", format!("{}MiB", limits.max_memory_mb()))
    }

    fn limits_address_space(&self) -> bool {
        false
    }
}
