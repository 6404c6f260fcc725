use std::{collections::HashMap, fmt, sync::Arc};
use tracing::{debug, info};

use crate::{
    config::EngineConfig,
    error::Error,
    languages::{builtin_runners, BUILTIN_ALIASES},
    runner::LanguageRunner,
    types::SupportedLanguage,
};

/// Immutable language id -> runner map.
///
/// Built once at startup through [`RegistryBuilder`] and shared behind an
/// `Arc`; lookups never lock.
pub struct RunnerRegistry {
    runners: HashMap<String, Arc<dyn LanguageRunner>>,
    aliases: HashMap<String, String>,
    languages: Vec<SupportedLanguage>,
}

impl RunnerRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Registry of the built-in runners, shaped by `config`
    pub fn from_config(config: &EngineConfig) -> Result<Self, Error> {
        let mut builder = RunnerRegistry::builder();

        let enabled = config.enabled_languages.as_ref().map(|ids| {
            ids.iter()
                .map(|id| normalize(id))
                .collect::<Vec<_>>()
        });

        let runners = builtin_runners(config);
        if let Some(enabled) = &enabled {
            for id in enabled {
                if !runners.iter().any(|r| &r.language().id == id) {
                    return Err(Error::Config(format!(
                        "enabled_languages names an unknown language: {}",
                        id
                    )));
                }
            }
        }

        for runner in runners {
            let id = runner.language().id.clone();
            if enabled.as_ref().is_some_and(|ids| !ids.contains(&id)) {
                debug!(language = %id, "Language disabled by configuration");
                continue;
            }
            builder = builder.register(runner);
        }

        for (alias, target) in BUILTIN_ALIASES {
            if builder.has_language(target) {
                builder = builder.alias(alias, target);
            }
        }

        let registry = builder.build()?;
        info!(
            languages = ?registry.languages.iter().map(|l| l.id.as_str()).collect::<Vec<_>>(),
            "Runner registry initialised"
        );
        Ok(registry)
    }

    /// All registered languages in registration order
    pub fn list_supported_languages(&self) -> &[SupportedLanguage] {
        &self.languages
    }

    /// Look up the runner for an id or alias, ignoring case
    pub fn resolve(&self, language: &str) -> Result<Arc<dyn LanguageRunner>, Error> {
        let key = normalize(language);
        let id = self.aliases.get(&key).unwrap_or(&key);
        self.runners
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnsupportedLanguage(language.to_string()))
    }

    pub fn is_supported(&self, language: &str) -> bool {
        self.resolve(language).is_ok()
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

impl fmt::Debug for RunnerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerRegistry")
            .field("languages", &self.languages)
            .field("aliases", &self.aliases)
            .finish()
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    runners: Vec<Arc<dyn LanguageRunner>>,
    aliases: Vec<(String, String)>,
}

impl RegistryBuilder {
    pub fn register(mut self, runner: Arc<dyn LanguageRunner>) -> Self {
        self.runners.push(runner);
        self
    }

    pub fn alias(mut self, alias: &str, language: &str) -> Self {
        self.aliases.push((normalize(alias), normalize(language)));
        self
    }

    fn has_language(&self, id: &str) -> bool {
        self.runners.iter().any(|r| r.language().id == id)
    }

    pub fn build(self) -> Result<RunnerRegistry, Error> {
        let mut runners = HashMap::with_capacity(self.runners.len());
        let mut languages = Vec::with_capacity(self.runners.len());

        for runner in self.runners {
            let id = normalize(&runner.language().id);
            if runners.contains_key(&id) {
                return Err(Error::DuplicateLanguage(id));
            }
            languages.push(runner.language().clone());
            runners.insert(id, runner);
        }

        let mut aliases = HashMap::with_capacity(self.aliases.len());
        for (alias, target) in self.aliases {
            if runners.contains_key(&alias) || aliases.contains_key(&alias) {
                return Err(Error::DuplicateLanguage(alias));
            }
            if !runners.contains_key(&target) {
                return Err(Error::Config(format!(
                    "Alias {} points at unknown language {}",
                    alias, target
                )));
            }
            aliases.insert(alias, target);
        }

        Ok(RunnerRegistry {
            runners,
            aliases,
            languages,
        })
    }
}

fn normalize(language: &str) -> String {
    language.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::{BashRunner, PythonRunner};

    #[test]
    fn test_default_registry_lists_builtins_in_order() {
        let registry = RunnerRegistry::from_config(&EngineConfig::default()).unwrap();
        let ids: Vec<_> = registry
            .list_supported_languages()
            .iter()
            .map(|l| l.id.as_str())
            .collect();
        assert_eq!(
            ids,
            vec![
                "bash",
                "c",
                "cpp",
                "go",
                "java",
                "javascript",
                "php",
                "python3",
                "rust",
                "typescript"
            ]
        );
    }

    #[test]
    fn test_every_listed_language_resolves() {
        let registry = RunnerRegistry::from_config(&EngineConfig::default()).unwrap();
        for language in registry.list_supported_languages() {
            let runner = registry.resolve(&language.id).unwrap();
            assert_eq!(runner.language(), language);
        }
    }

    #[test]
    fn test_resolve_is_case_insensitive_and_follows_aliases() {
        let registry = RunnerRegistry::from_config(&EngineConfig::default()).unwrap();
        assert_eq!(registry.resolve("Python3").unwrap().language().id, "python3");
        assert_eq!(registry.resolve(" PY ").unwrap().language().id, "python3");
        assert_eq!(registry.resolve("c++").unwrap().language().id, "cpp");
        assert_eq!(registry.resolve("golang").unwrap().language().id, "go");
        // Aliases are never listed.
        assert!(!registry
            .list_supported_languages()
            .iter()
            .any(|l| l.id == "py"));
    }

    #[test]
    fn test_unknown_language() {
        let registry = RunnerRegistry::from_config(&EngineConfig::default()).unwrap();
        match registry.resolve("cobol") {
            Err(Error::UnsupportedLanguage(id)) => assert_eq!(id, "cobol"),
            other => panic!("expected UnsupportedLanguage, got {:?}", other.map(|_| ())),
        }
        assert!(!registry.is_supported(""));
    }

    #[test]
    fn test_enabled_languages_restricts_registry() {
        let config = EngineConfig::default().with_enabled_languages(["Python3", "bash"]);
        let registry = RunnerRegistry::from_config(&config).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.is_supported("py"));
        assert!(registry.is_supported("sh"));
        assert!(!registry.is_supported("cpp"));
        assert!(!registry.is_supported("c++"));
    }

    #[test]
    fn test_enabled_languages_rejects_unknown_ids() {
        let config = EngineConfig::default().with_enabled_languages(["python3", "cobol"]);
        assert!(matches!(
            RunnerRegistry::from_config(&config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let result = RunnerRegistry::builder()
            .register(Arc::new(PythonRunner::new(None)))
            .register(Arc::new(PythonRunner::new(Some("python3.12".to_string()))))
            .build();
        assert!(matches!(result, Err(Error::DuplicateLanguage(id)) if id == "python3"));
    }

    #[test]
    fn test_alias_validation() {
        let shadowing = RunnerRegistry::builder()
            .register(Arc::new(PythonRunner::new(None)))
            .register(Arc::new(BashRunner::new(None)))
            .alias("bash", "python3")
            .build();
        assert!(matches!(shadowing, Err(Error::DuplicateLanguage(_))));

        let dangling = RunnerRegistry::builder()
            .register(Arc::new(BashRunner::new(None)))
            .alias("zsh", "fish")
            .build();
        assert!(matches!(dangling, Err(Error::Config(_))));
    }

    #[test]
    fn test_registry_is_shareable_across_threads() {
        let registry = Arc::new(RunnerRegistry::from_config(&EngineConfig::default()).unwrap());
        let handles: Vec<_> = ["python3", "cpp", "java", "go"]
            .into_iter()
            .map(|id| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.resolve(id).map(|r| r.language().id.clone()))
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }
    }
}
