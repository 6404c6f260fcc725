use crate::{
    runner::LanguageRunner,
    sandbox::Sandbox,
    types::{CommandSpec, ExecutionLimits, SupportedLanguage},
};

/// Runs a single `Main.java`; the submission must declare `public class Main`.
pub struct JavaRunner {
    language: SupportedLanguage,
    java_home: Option<String>,
}

impl JavaRunner {
    pub fn new(java_home: Option<String>) -> Self {
        Self {
            language: SupportedLanguage::new("java", "Java", None),
            java_home,
        }
    }

    fn tool(&self, name: &str) -> String {
        match &self.java_home {
            Some(home) => format!("{}/bin/{}", home.trim_end_matches('/'), name),
            None => name.to_string(),
        }
    }
}

impl LanguageRunner for JavaRunner {
    fn language(&self) -> &SupportedLanguage {
        &self.language
    }

    fn required_tools(&self) -> Vec<&str> {
        // Overridden homes are checked when the process is spawned.
        match self.java_home {
            Some(_) => Vec::new(),
            None => vec!["java", "javac"],
        }
    }

    fn source_file_name(&self) -> &str {
        "Main.java"
    }

    fn compile_command(&self, _sandbox: &Sandbox) -> Option<CommandSpec> {
        Some(
            CommandSpec::new(self.tool("javac"))
                .args(["-encoding", "UTF-8", "-J-Xss16m", "-d", ".", "Main.java"]),
        )
    }

    fn run_command(&self, _sandbox: &Sandbox, limits: &ExecutionLimits) -> CommandSpec {
        CommandSpec::new(self.tool("java"))
            .arg(format!("-Xmx{}m", limits.max_memory_mb()))
            .args(["-Xss64m", "-XX:+UseSerialGC", "-cp", ".", "Main"])
    }

    fn limits_address_space(&self) -> bool {
        false
    }
}
