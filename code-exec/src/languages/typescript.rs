use crate::{
    runner::LanguageRunner,
    sandbox::Sandbox,
    types::{CommandSpec, ExecutionLimits, SupportedLanguage},
};

/// Compiles with `tsc` to CommonJS, then runs the output with Node.js.
pub struct TypeScriptRunner {
    language: SupportedLanguage,
    target: String,
    tsc: String,
    node: String,
}

impl TypeScriptRunner {
    pub fn new(target: Option<String>, tsc: Option<String>, node: Option<String>) -> Self {
        let target = target.unwrap_or_else(|| "es2020".to_string());
        Self {
            language: SupportedLanguage::new("typescript", "TypeScript", Some(&target)),
            target,
            tsc: tsc.unwrap_or_else(|| "tsc".to_string()),
            node: node.unwrap_or_else(|| "node".to_string()),
        }
    }
}

impl LanguageRunner for TypeScriptRunner {
    fn language(&self) -> &SupportedLanguage {
        &self.language
    }

    fn required_tools(&self) -> Vec<&str> {
        vec![self.tsc.as_str(), self.node.as_str()]
    }

    fn source_file_name(&self) -> &str {
        "main.ts"
    }

    fn compile_command(&self, sandbox: &Sandbox) -> Option<CommandSpec> {
        Some(
            CommandSpec::new(&self.tsc)
                .args(["--target", self.target.as_str()])
                .args(["--module", "commonjs", "--strict", "--outDir"])
                .arg(sandbox.work_dir().to_string_lossy())
                .arg("main.ts"),
        )
    }

    fn run_command(&self, _sandbox: &Sandbox, limits: &ExecutionLimits) -> CommandSpec {
        CommandSpec::new(&self.node)
            .arg(format!("--max-old-space-size={}", limits.max_memory_mb()))
            .arg("main.js")
    }

    fn limits_address_space(&self) -> bool {
        false
    }
}
