use crate::{
    runner::LanguageRunner,
    sandbox::Sandbox,
    types::{CommandSpec, ExecutionLimits, SupportedLanguage},
};

pub struct PhpRunner {
    language: SupportedLanguage,
    php: String,
}

impl PhpRunner {
    pub fn new(php: Option<String>) -> Self {
        Self {
            language: SupportedLanguage::new("php", "PHP", None),
            php: php.unwrap_or_else(|| "php".to_string()),
        }
    }
}

impl LanguageRunner for PhpRunner {
    fn language(&self) -> &SupportedLanguage {
        &self.language
    }

    fn required_tools(&self) -> Vec<&str> {
        vec![self.php.as_str()]
    }

    fn source_file_name(&self) -> &str {
        "main.php"
    }

    fn run_command(&self, _sandbox: &Sandbox, limits: &ExecutionLimits) -> CommandSpec {
        CommandSpec::new(&self.php)
            .arg("-d")
            .arg(format!("memory_limit={}M", limits.max_memory_mb()))
            .args(["-d", "display_errors=stderr", "main.php"])
    }
}
