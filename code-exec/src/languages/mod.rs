//! Language-specific runner implementations

mod bash;
mod c;
mod cpp;
mod go;
mod java;
mod javascript;
mod php;
mod python;
mod rust;
mod typescript;

pub use bash::BashRunner;
pub use c::CRunner;
pub use cpp::CppRunner;
pub use go::GoRunner;
pub use java::JavaRunner;
pub use javascript::JavaScriptRunner;
pub use php::PhpRunner;
pub use python::PythonRunner;
pub use rust::RustRunner;
pub use typescript::TypeScriptRunner;

use std::sync::Arc;
use which::which;

use crate::{config::EngineConfig, runner::LanguageRunner};

/// Aliases accepted for the built-in languages
pub const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("sh", "bash"),
    ("c++", "cpp"),
    ("cxx", "cpp"),
    ("golang", "go"),
    ("js", "javascript"),
    ("node", "javascript"),
    ("python", "python3"),
    ("py", "python3"),
    ("rs", "rust"),
    ("ts", "typescript"),
];

/// Every built-in runner, in listing order.
///
/// `config.toolchains` maps a language id to the compiler, interpreter or
/// (for Java) JDK home to use instead of the one found on `PATH`. TypeScript
/// output runs on the `javascript` interpreter.
pub fn builtin_runners(config: &EngineConfig) -> Vec<Arc<dyn LanguageRunner>> {
    let tool = |id: &str| config.toolchains.get(id).cloned();

    vec![
        Arc::new(BashRunner::new(tool("bash"))),
        Arc::new(CRunner::new(None, tool("c"))),
        Arc::new(CppRunner::new(None, tool("cpp"))),
        Arc::new(GoRunner::new(tool("go"), config.go_build_cache.clone())),
        Arc::new(JavaRunner::new(tool("java"))),
        Arc::new(JavaScriptRunner::new(tool("javascript"))),
        Arc::new(PhpRunner::new(tool("php"))),
        Arc::new(PythonRunner::new(tool("python3"))),
        Arc::new(RustRunner::new(None, tool("rust"))),
        Arc::new(TypeScriptRunner::new(
            None,
            tool("typescript"),
            tool("javascript"),
        )),
    ]
}

pub(crate) fn check_command(cmd: &str) -> bool {
    which(cmd).is_ok()
}

#[cfg(test)]
pub(crate) fn skip_if_not_available(tools: &[&str]) -> bool {
    let missing: Vec<_> = tools
        .iter()
        .filter(|tool| !check_command(tool))
        .map(|s| (*s).to_string())
        .collect();

    if !missing.is_empty() {
        eprintln!("Skipping test: {} not available", missing.join(", "));
        return true;
    }
    false
}
