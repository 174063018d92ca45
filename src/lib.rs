//! Contract Schemas
//!
//! A schema compilation engine. One declaration of a data contract (scalars,
//! enums, models) is compiled into three artifacts that cannot drift apart:
//!
//! - a runtime validator that reports every violation in an input at once
//! - a structural type schema (GraphQL-equivalent) that stitches across
//!   independently built schemas
//! - a JSON-Schema document, with nested models resolved lazily
//!
//! ## Features
//!
//! - **Shared scalars**: `ScalarCache` hands out one instance per name so
//!   type schemas reconcile by identity
//! - **Field composition**: `optional` and `array` modifiers projected
//!   consistently into all three artifacts
//! - **Forward references**: `ModelCatalog` resolves named and recursive models
//! - **Code generation**: typed Rust mirrors of a schema
//! - **Export**: JSON-Schema files with a checksummed manifest
//!
//! ## Example
//!
//! ```
//! use contract_schemas::{FieldSlot, ModelDescriptor, ScalarCache};
//! use serde_json::json;
//!
//! let cache = ScalarCache::global();
//! let user = ModelDescriptor::declare(
//!     "User",
//!     [
//!         ("id", FieldSlot::of(cache.non_empty_string())),
//!         ("tags", FieldSlot::of(cache.string()).array().optional()),
//!     ],
//! );
//!
//! assert!(user.derive_validator().is_valid(&json!({ "id": "u1" })));
//! assert_eq!(user.derive_json_schema()["required"], json!(["id"]));
//! ```

pub mod cache;
pub mod catalog;
pub mod checksum;
pub mod codegen;
pub mod config;
pub mod enumeration;
pub mod error;
pub mod export;
pub mod field;
pub mod json_schema;
pub mod model;
pub mod scalar;
pub mod type_schema;
pub mod validator;
pub mod violation;

pub use cache::ScalarCache;
pub use catalog::{DanglingRef, ModelCatalog, ModelResolver};
pub use checksum::Checksum;
pub use codegen::{generate_rust, CodegenConfig, GeneratedOutput};
pub use config::{EngineConfig, ExportConfig, OutputFormat};
pub use enumeration::EnumDescriptor;
pub use error::{Result, SchemaError};
pub use export::{export_catalog, ExportManifest};
pub use field::{Descriptor, FieldSlot, ModelRef};
pub use json_schema::{resolve, JsonNode, JsonSchemaOptions};
pub use model::{ModelBuilder, ModelDescriptor};
pub use scalar::{Constraint, Format, ScalarDescriptor, ScalarKind};
pub use type_schema::{ObjectType, TypeDefinition, TypeRef, TypeSchema};
pub use validator::{ModelValidator, ValidationOptions};
pub use violation::{PathSegment, Violation, ViolationKind, Violations};
