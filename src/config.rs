//! Configuration management for the schema engine
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (contract-schemas.toml)
//! - Environment variables (CONTRACT_SCHEMAS__*)
//!
//! ## Example config file (contract-schemas.toml):
//! ```toml
//! [validation]
//! null_as_absent = false
//!
//! [json_schema]
//! dialect = "https://json-schema.org/draft/2020-12/schema"
//! defs_key = "$defs"
//! include_descriptions = true
//!
//! [export]
//! output_format = "pretty"
//! include_checksums = true
//!
//! [codegen]
//! derives = ["Debug", "Clone", "PartialEq", "Serialize", "Deserialize"]
//! serde_rename_all = "camelCase"
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::catalog::ModelCatalog;
use crate::codegen::CodegenConfig;
use crate::error::Result;
use crate::json_schema::JsonSchemaOptions;
use crate::validator::ValidationOptions;

/// Main configuration for the schema engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Validator derivation settings
    #[serde(default)]
    pub validation: ValidationOptions,

    /// JSON-Schema derivation settings
    #[serde(default)]
    pub json_schema: JsonSchemaOptions,

    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Code generation settings
    #[serde(default)]
    pub codegen: CodegenConfig,
}

/// Export configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output format (pretty or compact)
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Write a checksums.sha256 listing next to the schemas
    #[serde(default = "default_true")]
    pub include_checksums: bool,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

impl OutputFormat {
    pub fn render(&self, value: &serde_json::Value) -> serde_json::Result<String> {
        match self {
            OutputFormat::Pretty => serde_json::to_string_pretty(value),
            OutputFormat::Compact => serde_json::to_string(value),
        }
    }
}

fn default_true() -> bool {
    true
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Pretty,
            include_checksums: true,
        }
    }
}

impl EngineConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = [
            "contract-schemas.toml",
            ".contract-schemas.toml",
            "config/contract-schemas.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "contract", "contract-schemas") {
            let xdg_config = config_dir.config_dir().join("contract-schemas.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("CONTRACT_SCHEMAS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load configuration from one file only, ignoring other sources
    pub fn from_file(path: &Path) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path).required(true))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Empty catalog that derives with these settings
    pub fn catalog(&self) -> ModelCatalog {
        ModelCatalog::new()
            .with_json_options(self.json_schema.clone())
            .with_validation_options(self.validation)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e)
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
