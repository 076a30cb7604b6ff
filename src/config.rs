//! Configuration for schema loading and export
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (fbs-graph.toml)
//! - Environment variables (FBS_GRAPH__*)
//!
//! ## Example config file (fbs-graph.toml):
//! ```toml
//! [input]
//! path = "./schemas"
//! pattern = "*.fbs"
//! recursive = false
//! skip_prefixes = ["vendor/"]
//!
//! [resolve]
//! policy = "strict"
//!
//! [export]
//! output_format = "pretty"
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::context::{LoadConfig, ResolvePolicy};
use crate::error::Result;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Where schema files are read from
    #[serde(default)]
    pub input: InputConfig,

    /// Type resolution settings
    #[serde(default)]
    pub resolve: ResolveConfig,

    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,
}

/// Input configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Schema directory
    #[serde(default = "default_input_path")]
    pub path: PathBuf,

    /// Glob matched against paths relative to `path`
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Descend into subdirectories
    #[serde(default)]
    pub recursive: bool,

    /// Relative path prefixes to ignore
    #[serde(default)]
    pub skip_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolveConfig {
    #[serde(default)]
    pub policy: ResolvePolicy,
}

/// Export configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output format (pretty or compact)
    #[serde(default)]
    pub output_format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

fn default_input_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_pattern() -> String {
    "*.fbs".to_string()
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
            pattern: default_pattern(),
            recursive: false,
            skip_prefixes: Vec::new(),
        }
    }
}

impl GraphConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the defaults
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = ["fbs-graph.toml", ".fbs-graph.toml", "config/fbs-graph.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "fbs-graph", "fbs-graph") {
            let xdg_config = config_dir.config_dir().join("fbs-graph.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // FBS_GRAPH__RESOLVE__POLICY=strict
        builder = builder.add_source(
            Environment::with_prefix("FBS_GRAPH")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Schema directory (resolves relative paths)
    pub fn input_path(&self) -> PathBuf {
        if self.input.path.is_absolute() {
            self.input.path.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.input.path)
        }
    }

    /// Settings for [`Context::load`](crate::context::Context::load)
    pub fn load_config(&self) -> LoadConfig {
        LoadConfig {
            pattern: self.input.pattern.clone(),
            recursive: self.input.recursive,
            skip_prefixes: self.input.skip_prefixes.clone(),
            policy: self.resolve.policy,
        }
    }
}
