use crate::{
    runner::LanguageRunner,
    sandbox::Sandbox,
    types::{CommandSpec, ExecutionLimits, SupportedLanguage},
};

pub struct RustRunner {
    language: SupportedLanguage,
    edition: String,
    rustc: String,
    /// rustup proxies locate toolchains through these; the sandbox HOME hides them.
    toolchain_env: Vec<(String, String)>,
}

impl RustRunner {
    pub fn new(edition: Option<String>, rustc: Option<String>) -> Self {
        let edition = edition.unwrap_or_else(|| "2021".to_string());
        Self {
            language: SupportedLanguage::new("rust", "Rust", Some(&edition)),
            edition,
            rustc: rustc.unwrap_or_else(|| "rustc".to_string()),
            toolchain_env: host_toolchain_env(),
        }
    }
}

fn host_toolchain_env() -> Vec<(String, String)> {
    let home = std::env::var("HOME").ok();
    let mut env = Vec::new();
    for (key, fallback) in [("RUSTUP_HOME", ".rustup"), ("CARGO_HOME", ".cargo")] {
        let value = std::env::var(key)
            .ok()
            .or_else(|| home.as_ref().map(|home| format!("{}/{}", home, fallback)));
        if let Some(value) = value {
            env.push((key.to_string(), value));
        }
    }
    if let Ok(toolchain) = std::env::var("RUSTUP_TOOLCHAIN") {
        env.push(("RUSTUP_TOOLCHAIN".to_string(), toolchain));
    }
    env
}

impl LanguageRunner for RustRunner {
    fn language(&self) -> &SupportedLanguage {
        &self.language
    }

    fn required_tools(&self) -> Vec<&str> {
        vec![self.rustc.as_str()]
    }

    fn source_file_name(&self) -> &str {
        "main.rs"
    }

    fn compile_command(&self, _sandbox: &Sandbox) -> Option<CommandSpec> {
        let mut spec = CommandSpec::new(&self.rustc)
            .args(["--edition", self.edition.as_str()])
            .args(["-O", "-o", "main", "main.rs"]);
        spec.env.extend(self.toolchain_env.iter().cloned());
        Some(spec)
    }

    fn run_command(&self, sandbox: &Sandbox, _limits: &ExecutionLimits) -> CommandSpec {
        CommandSpec::new(sandbox.work_path("main"))
    }
}
