//! Configuration management for the chat coordinator.
//!
//! Configuration is loaded from multiple sources, later sources overriding
//! earlier ones:
//! 1. Built-in defaults
//! 2. User-specified TOML configuration file
//! 3. Environment variables (prefixed with `LOCALCHAT_`, `__` as the key
//!    separator, e.g. `LOCALCHAT_MODEL__NAME`)
//! 4. Command-line arguments

use anyhow::{anyhow, Result};
use clap::Parser;
use config::Config;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application name for XDG directories
const APP_NAME: &str = "localchat";

const DEFAULT_MODEL_NAME: &str = "Llama-3.2-1B-Instruct-Q4_K_M.gguf";
const DEFAULT_ASSET_DIR: &str = "./assets";

/// Command-line arguments
#[derive(Debug, Parser)]
#[clap(version, about)]
pub struct Args {
    /// Configuration file path
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Model file name inside the bundled asset directory
    #[clap(long)]
    pub model: Option<String>,

    /// Directory holding the read-only bundled model asset
    #[clap(long)]
    pub asset_dir: Option<PathBuf>,

    /// Durable data directory (defaults to the XDG data home)
    #[clap(long)]
    pub data_dir: Option<PathBuf>,

    /// Tracing filter directive, e.g. "localchat_core=debug"
    #[clap(long)]
    pub log_filter: Option<String>,
}

/// Top-level coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Model asset configuration
    pub model: ModelConfig,
}

/// Model asset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Logical asset identifier: the model file name
    pub name: String,
    /// Read-only directory the bundled asset ships in
    pub asset_dir: PathBuf,
    /// Durable storage root override; XDG data home when unset
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl ChatConfig {
    /// Load configuration from defaults, an optional TOML file, and the
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("model.name", DEFAULT_MODEL_NAME)?
            .set_default("model.asset_dir", DEFAULT_ASSET_DIR)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.to_path_buf()));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("LOCALCHAT").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(model) = &args.model {
            self.model.name = model.clone();
        }
        if let Some(asset_dir) = &args.asset_dir {
            self.model.asset_dir = asset_dir.clone();
        }
        if let Some(data_dir) = &args.data_dir {
            self.model.data_dir = Some(data_dir.clone());
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig {
                name: DEFAULT_MODEL_NAME.to_string(),
                asset_dir: PathBuf::from(DEFAULT_ASSET_DIR),
                data_dir: None,
            },
        }
    }
}

/// Durable storage layout for model artifacts.
pub struct StorageLayout {
    data_home: PathBuf,
}

impl StorageLayout {
    /// Resolve the durable storage root: an explicit override, or the XDG
    /// data home for the application.
    pub fn new(data_dir: Option<&Path>) -> Result<Self> {
        let data_home = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => xdg::BaseDirectories::with_prefix(APP_NAME)
                .map_err(|e| anyhow!("Failed to create XDG base directories: {}", e))?
                .get_data_home(),
        };
        Ok(Self { data_home })
    }

    /// Directory holding provisioned model artifacts.
    pub fn models_dir(&self) -> PathBuf {
        self.data_home.join("models")
    }

    /// Durable path for a model artifact by name.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.models_dir().join(sanitize_filename(model_name))
    }
}

/// Sanitize a filename to be safe for filesystem storage
fn sanitize_filename(name: &str) -> String {
    name.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_")
        .replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ChatConfig::load(None).unwrap();
        assert_eq!(config.model.name, DEFAULT_MODEL_NAME);
        assert_eq!(config.model.asset_dir, PathBuf::from(DEFAULT_ASSET_DIR));
        assert!(config.model.data_dir.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[model]\nname = \"tiny.gguf\"\nasset_dir = \"/opt/assets\"\n",
        )
        .unwrap();

        let config = ChatConfig::load(Some(&path)).unwrap();
        assert_eq!(config.model.name, "tiny.gguf");
        assert_eq!(config.model.asset_dir, PathBuf::from("/opt/assets"));
    }

    #[test]
    fn test_args_override_file() {
        let mut config = ChatConfig::default();
        let args = Args {
            config: None,
            model: Some("other.gguf".to_string()),
            asset_dir: None,
            data_dir: Some(PathBuf::from("/tmp/data")),
            log_filter: None,
        };
        config.apply_args(&args);
        assert_eq!(config.model.name, "other.gguf");
        assert_eq!(config.model.data_dir, Some(PathBuf::from("/tmp/data")));
        assert_eq!(config.model.asset_dir, PathBuf::from(DEFAULT_ASSET_DIR));
    }

    #[test]
    fn test_storage_layout_override() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(Some(dir.path())).unwrap();
        assert_eq!(layout.models_dir(), dir.path().join("models"));
        assert_eq!(
            layout.model_path("my model.gguf"),
            dir.path().join("models").join("my_model.gguf")
        );
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("hello/world"), "hello_world");
        assert_eq!(sanitize_filename("model:v1.0"), "model_v1.0");
        assert_eq!(sanitize_filename("test file.gguf"), "test_file.gguf");
    }
}
