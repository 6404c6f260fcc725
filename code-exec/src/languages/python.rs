use crate::{
    runner::LanguageRunner,
    sandbox::Sandbox,
    types::{CommandSpec, ExecutionLimits, SupportedLanguage},
};

pub struct PythonRunner {
    language: SupportedLanguage,
    interpreter: String,
}

impl PythonRunner {
    pub fn new(interpreter: Option<String>) -> Self {
        Self {
            language: SupportedLanguage::new("python3", "Python", Some("3")),
            interpreter: interpreter.unwrap_or_else(|| "python3".to_string()),
        }
    }
}

impl LanguageRunner for PythonRunner {
    fn language(&self) -> &SupportedLanguage {
        &self.language
    }

    fn required_tools(&self) -> Vec<&str> {
        vec![self.interpreter.as_str()]
    }

    fn source_file_name(&self) -> &str {
        "main.py"
    }

    fn run_command(&self, _sandbox: &Sandbox, _limits: &ExecutionLimits) -> CommandSpec {
        // -I: ignore PYTHON* variables and the user site, -B: no .pyc files
        CommandSpec::new(&self.interpreter).args(["-I", "-B", "main.py"])
    }
}
