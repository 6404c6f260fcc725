use crate::{
    runner::LanguageRunner,
    sandbox::Sandbox,
    types::{CommandSpec, ExecutionLimits, SupportedLanguage},
};

pub struct JavaScriptRunner {
    language: SupportedLanguage,
    node: String,
}

impl JavaScriptRunner {
    pub fn new(node: Option<String>) -> Self {
        Self {
            language: SupportedLanguage::new("javascript", "JavaScript (Node.js)", None),
            node: node.unwrap_or_else(|| "node".to_string()),
        }
    }
}

impl LanguageRunner for JavaScriptRunner {
    fn language(&self) -> &SupportedLanguage {
        &self.language
    }

    fn required_tools(&self) -> Vec<&str> {
        vec![self.node.as_str()]
    }

    fn source_file_name(&self) -> &str {
        "main.js"
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
