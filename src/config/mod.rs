//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for the workers and
//! each workload, `AppPaths` for cross-platform directories, `ModelStore` for
//! model files, and TOML persistence via `AppConfig::load` / `AppConfig::save`.

pub mod models;
pub mod paths;
pub mod settings;

pub use models::ModelStore;
pub use paths::AppPaths;
pub use settings::{AppConfig, TranscriptionConfig, TranslationConfig, WorkerConfig};
