use crate::{
    runner::LanguageRunner,
    sandbox::Sandbox,
    types::{CommandSpec, ExecutionLimits, SupportedLanguage},
};

pub struct BashRunner {
    language: SupportedLanguage,
    shell: String,
}

impl BashRunner {
    pub fn new(shell: Option<String>) -> Self {
        Self {
            language: SupportedLanguage::new("bash", "Bash", None),
            shell: shell.unwrap_or_else(|| "bash".to_string()),
        }
    }
}

impl LanguageRunner for BashRunner {
    fn language(&self) -> &SupportedLanguage {
        &self.language
    }

    fn required_tools(&self) -> Vec<&str> {
        vec![self.shell.as_str()]
    }

    fn source_file_name(&self) -> &str {
        "main.sh"
    }

    fn run_command(&self, _sandbox: &Sandbox, _limits: &ExecutionLimits) -> CommandSpec {
        CommandSpec::new(&self.shell).args(["--noprofile", "--norc", "main.sh"])
    }
}
