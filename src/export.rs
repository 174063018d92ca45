//! Schema Export
//!
//! Writes a catalog's JSON-Schema documents to a directory for external
//! consumers:
//!
//! ```text
//! out/
//! ├── Address.schema.json
//! ├── User.schema.json
//! ├── manifest.json
//! └── checksums.sha256
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::catalog::ModelCatalog;
use crate::checksum::Checksum;
use crate::config::ExportConfig;
use crate::error::{Result, SchemaError};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const CHECKSUMS_FILE: &str = "checksums.sha256";

/// One exported schema document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedSchema {
    pub name: String,
    pub file: String,
    /// Checksum of the canonicalized document
    pub checksum: Checksum,
}

/// Index of an export directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportManifest {
    pub schemas: Vec<ExportedSchema>,
    /// `$schema` dialect of every document
    pub dialect: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Combined checksum of all schema checksums, in manifest order
    pub manifest_checksum: Checksum,
}

impl ExportManifest {
    pub fn new(schemas: Vec<ExportedSchema>, dialect: Option<String>) -> Self {
        let manifest_checksum = Checksum::combine(schemas.iter().map(|s| &s.checksum));
        Self {
            schemas,
            dialect,
            created_at: Utc::now(),
            manifest_checksum,
        }
    }

    pub fn get_schema(&self, name: &str) -> Option<&ExportedSchema> {
        self.schemas.iter().find(|s| s.name == name)
    }

    /// Load `manifest.json` from an export directory
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(dir.as_ref().join(MANIFEST_FILE))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// File name of a model's exported document
pub fn schema_file_name(model: &str) -> String {
    format!("{}.schema.json", model)
}

/// Export every model in `catalog` to `output_dir`
pub fn export_catalog(
    catalog: &ModelCatalog,
    output_dir: impl AsRef<Path>,
    config: &ExportConfig,
) -> Result<ExportManifest> {
    let output = output_dir.as_ref();
    fs::create_dir_all(output)?;

    let mut exported = Vec::with_capacity(catalog.len());
    for name in catalog.names() {
        let document = catalog.json_schema(name)?;
        let file = schema_file_name(name);
        fs::write(output.join(&file), config.output_format.render(&document)?)?;

        exported.push(ExportedSchema {
            name: name.to_string(),
            file,
            checksum: Checksum::from_json(&document),
        });
    }

    let manifest = ExportManifest::new(exported, catalog.json_options().dialect.clone());
    fs::write(output.join(MANIFEST_FILE), serde_json::to_string_pretty(&manifest)?)?;

    if config.include_checksums {
        let mut listing = String::new();
        for entry in &manifest.schemas {
            listing.push_str(&entry.checksum.listing_line(&entry.file));
            listing.push('\n');
        }
        fs::write(output.join(CHECKSUMS_FILE), listing)?;
    }

    tracing::info!(
        dir = %output.display(),
        schemas = manifest.schemas.len(),
        checksum = %manifest.manifest_checksum,
        "catalog exported"
    );
    Ok(manifest)
}

/// Re-read an export directory and return the files whose content no longer
/// matches the manifest
pub fn verify_export(dir: impl AsRef<Path>) -> Result<Vec<String>> {
    let dir = dir.as_ref();
    let manifest = ExportManifest::load(dir)?;

    let mut mismatched = Vec::new();
    for entry in &manifest.schemas {
        let path = dir.join(&entry.file);
        if !path.exists() {
            mismatched.push(entry.file.clone());
            continue;
        }
        let document: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)
            .map_err(|e| SchemaError::InvalidFormat(format!("{}: {}", entry.file, e)))?;
        if !entry.checksum.verify_json(&document) {
            mismatched.push(entry.file.clone());
        }
    }

    if !mismatched.is_empty() {
        tracing::warn!(dir = %dir.display(), files = ?mismatched, "export checksum mismatch");
    }
    Ok(mismatched)
}
