pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod i18n;
pub mod llm;
pub mod logging;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{OrchestratorError, OrchestratorResult};
pub use generator::workflow::{OrchestrationResult, launch, run_orchestration};
