//! # Code Execution Engine
//!
//! Runs untrusted snippets in one of several languages inside a throwaway
//! sandbox directory and process group, under wall-clock, memory, file size
//! and output ceilings. Every execution that gets past language resolution
//! yields exactly one [`RunResult`].

mod capture;
mod config;
mod coordinator;
mod error;
pub mod languages;
mod registry;
mod runner;
mod sandbox;
mod types;

#[cfg(test)]
mod tests;

pub use capture::TRUNCATION_MARKER;
pub use config::EngineConfig;
pub use coordinator::ExecutionCoordinator;
pub use error::Error;
pub use registry::{RegistryBuilder, RunnerRegistry};
pub use runner::LanguageRunner;
pub use sandbox::Sandbox;
pub use types::{
    CommandSpec, ExecutionLimits, ExecutionStage, RunOptions, RunRequest, RunResult,
    SupportedLanguage, TerminationReason,
};

pub use tokio_util::sync::CancellationToken;

/// Result type for code execution operations
pub type Result<T> = std::result::Result<T, Error>;
