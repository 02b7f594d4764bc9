//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (`settings.toml`):
//!   Windows: %APPDATA%\inference-offload\
//!   macOS:   ~/Library/Application Support/inference-offload/
//!   Linux:   ~/.config/inference-offload/
//!
//! Data dir (model files):
//!   Windows: %LOCALAPPDATA%\inference-offload\
//!   macOS:   ~/Library/Application Support/inference-offload/
//!   Linux:   ~/.local/share/inference-offload/

use std::path::PathBuf;

/// Resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory holding model weight files.
    pub models_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "inference-offload";

    /// Falls back to the current directory if the platform has no standard
    /// location.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            config_dir,
            models_dir: data_dir.join("models"),
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
