use crate::{
    runner::LanguageRunner,
    sandbox::Sandbox,
    types::{CommandSpec, ExecutionLimits, SupportedLanguage},
};

pub struct CRunner {
    language: SupportedLanguage,
    std_version: String,
    compiler: String,
}

impl CRunner {
    pub fn new(std_version: Option<String>, compiler: Option<String>) -> Self {
        let std_version = std_version.unwrap_or_else(|| "17".to_string());
        Self {
            language: SupportedLanguage::new("c", "C", Some(&format!("c{}", std_version))),
            std_version,
            compiler: compiler.unwrap_or_else(|| "gcc".to_string()),
        }
    }
}

impl LanguageRunner for CRunner {
    fn language(&self) -> &SupportedLanguage {
        &self.language
    }

    fn required_tools(&self) -> Vec<&str> {
        vec![self.compiler.as_str()]
    }

    fn source_file_name(&self) -> &str {
        "main.c"
    }

    fn compile_command(&self, _sandbox: &Sandbox) -> Option<CommandSpec> {
        Some(
            CommandSpec::new(&self.compiler)
                .arg(format!("-std=c{}", self.std_version))
                .args(["-O2", "-pipe", "-o", "main", "main.c", "-lm"]),
        )
    }

    fn run_command(&self, sandbox: &Sandbox, _limits: &ExecutionLimits) -> CommandSpec {
        CommandSpec::new(sandbox.work_path("main"))
    }
}
