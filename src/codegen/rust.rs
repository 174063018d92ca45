//! Rust Code Emitter
//!
//! Renders a `TypeSchema` as serde-annotated Rust source.
//!
//! Key constraints:
//! - Output order is deterministic: scalar aliases, enums, then structs,
//!   each sorted by name
//! - Wire names survive unchanged through `#[serde(rename)]`
//! - Boxing decisions come from `CycleAnalysis`, never from the emitter

use crate::enumeration::EnumDescriptor;
use crate::scalar::{builtin, ScalarDescriptor, ScalarKind};
use crate::type_schema::{ObjectField, ObjectType, TypeDefinition, TypeSchema};

use super::names::{field_ident, type_ident, unraw};
use super::{CodegenConfig, CycleAnalysis, GeneratedOutput};

const HEADER: &str = "// Generated by contract-schemas. Do not edit.\n\nuse serde::{Deserialize, Serialize};\n";

// =============================================================================
// Public API
// =============================================================================

pub fn emit_schema(schema: &TypeSchema, cycles: &CycleAnalysis, config: &CodegenConfig) -> GeneratedOutput {
    let mut output = GeneratedOutput {
        code: HEADER.to_string(),
        types: Vec::new(),
        boxed_fields: Vec::new(),
    };

    let mut scalars = Vec::new();
    let mut enums = Vec::new();
    let mut objects = Vec::new();
    for definition in schema.types() {
        match definition {
            TypeDefinition::Scalar(s) => scalars.push(s),
            TypeDefinition::Enum(e) => enums.push(e),
            TypeDefinition::Object(o) => objects.push(o),
        }
    }

    for scalar in scalars {
        if let Some(code) = emit_scalar_alias(scalar) {
            output.code.push('\n');
            output.code.push_str(&code);
            output.types.push(type_ident(scalar.name()));
        }
    }
    for e in enums {
        output.code.push('\n');
        output.code.push_str(&emit_enum(e, config));
        output.types.push(type_ident(e.name()));
    }
    for object in objects {
        output.code.push('\n');
        output.code.push_str(&emit_struct(object, cycles, config, &mut output.boxed_fields));
        output.types.push(type_ident(&object.name));
    }

    tracing::debug!(
        types = output.types.len(),
        boxed = output.boxed_fields.len(),
        "rust code generated"
    );
    output
}

pub fn emit_empty() -> GeneratedOutput {
    GeneratedOutput {
        code: HEADER.to_string(),
        types: Vec::new(),
        boxed_fields: Vec::new(),
    }
}

// =============================================================================
// Type Mapping
// =============================================================================

/// Rust type for a named schema type
fn rust_type_name(name: &str) -> String {
    match name {
        builtin::STRING | builtin::ID => "String".to_string(),
        builtin::INT => "i64".to_string(),
        builtin::FLOAT => "f64".to_string(),
        builtin::BOOLEAN => "bool".to_string(),
        other => type_ident(other),
    }
}

fn kind_type(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::String => "String",
        ScalarKind::Integer => "i64",
        ScalarKind::Number => "f64",
        ScalarKind::Boolean => "bool",
        ScalarKind::Any => "serde_json::Value",
        ScalarKind::Object => "serde_json::Map<String, serde_json::Value>",
    }
}

// =============================================================================
// Scalar Emission
// =============================================================================

fn emit_scalar_alias(scalar: &ScalarDescriptor) -> Option<String> {
    if builtin::NATIVE.contains(&scalar.name()) {
        return None;
    }
    let mut output = String::new();
    write_doc(&mut output, scalar.description());
    output.push_str(&format!(
        "pub type {} = {};\n",
        type_ident(scalar.name()),
        kind_type(scalar.kind())
    ));
    Some(output)
}

// =============================================================================
// Enum Emission
// =============================================================================

fn emit_enum(e: &EnumDescriptor, config: &CodegenConfig) -> String {
    let mut output = String::new();
    write_doc(&mut output, e.description());
    write_attributes(&mut output, config);

    output.push_str(&format!("pub enum {} {{\n", type_ident(e.name())));
    for value in e.values() {
        let variant = type_ident(value);
        if unraw(&variant) != value {
            output.push_str(&format!("    #[serde(rename = \"{}\")]\n", escape_str(value)));
        }
        output.push_str(&format!("    {},\n", variant));
    }
    output.push_str("}\n");
    output
}

// =============================================================================
// Struct Emission
// =============================================================================

fn emit_struct(
    object: &ObjectType,
    cycles: &CycleAnalysis,
    config: &CodegenConfig,
    boxed: &mut Vec<(String, String)>,
) -> String {
    let type_name = type_ident(&object.name);
    let mut output = String::new();
    write_doc(&mut output, object.description.as_deref());
    write_attributes(&mut output, config);

    output.push_str(&format!("pub struct {} {{\n", type_name));
    for field in &object.fields {
        let needs_box = !field.ty.is_list() && cycles.is_back_edge(&object.name, field.ty.base_name());
        if needs_box {
            boxed.push((type_name.clone(), field.name.clone()));
        }
        emit_field(&mut output, field, needs_box);
    }
    output.push_str("}\n");
    output
}

fn emit_field(output: &mut String, field: &ObjectField, needs_box: bool) {
    let ident = field_ident(&field.name);
    if unraw(&ident) != field.name {
        output.push_str(&format!("    #[serde(rename = \"{}\")]\n", escape_str(&field.name)));
    }

    let optional = field.ty.is_nullable();
    if optional {
        output.push_str("    #[serde(default, skip_serializing_if = \"Option::is_none\")]\n");
    }

    let base = rust_type_name(field.ty.base_name());
    let shaped = if field.ty.is_list() {
        format!("Vec<{}>", base)
    } else if needs_box {
        format!("Box<{}>", base)
    } else {
        base
    };
    let full_type = if optional {
        format!("Option<{}>", shaped)
    } else {
        shaped
    };

    output.push_str(&format!("    pub {}: {},\n", ident, full_type));
}

// =============================================================================
// Helper Utilities
// =============================================================================

fn write_attributes(output: &mut String, config: &CodegenConfig) {
    if !config.derives.is_empty() {
        output.push_str(&format!("#[derive({})]\n", config.derives.join(", ")));
    }
    if let Some(ref rename_all) = config.serde_rename_all {
        output.push_str(&format!("#[serde(rename_all = \"{}\")]\n", rename_all));
    }
}

fn write_doc(output: &mut String, description: Option<&str>) {
    if let Some(description) = description {
        for line in description.lines() {
            output.push_str(&format!("/// {}\n", line));
        }
    }
}

fn escape_str(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ScalarCache;
    use crate::catalog::ModelCatalog;
    use crate::codegen::{generate_catalog, generate_model};
    use crate::field::{FieldSlot, ModelRef};
    use crate::model::ModelDescriptor;
    use std::sync::Arc;

    #[test]
    fn test_struct_emission() {
        let cache = ScalarCache::new();
        let status = Arc::new(EnumDescriptor::new("Status", ["open", "in-progress"]).unwrap());
        let model = ModelDescriptor::builder("Ticket")
            .description("A support ticket")
            .field("id", FieldSlot::of(cache.id()))
            .field("type", FieldSlot::of(cache.string()))
            .field("status", FieldSlot::of(status))
            .field("reporterEmail", FieldSlot::of(cache.email()).optional())
            .field("tags", FieldSlot::of(cache.string()).array().optional())
            .field("priority", FieldSlot::of(cache.int()))
            .build();

        let generated = generate_model(&model, &CodegenConfig::default()).unwrap();
        let code = &generated.code;

        assert!(code.contains("pub type EmailAddress = String;\n"));
        assert!(code.contains(
            "#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\npub enum Status {\n    #[serde(rename = \"open\")]\n    Open,\n    #[serde(rename = \"in-progress\")]\n    InProgress,\n}\n"
        ));
        assert!(code.contains("/// A support ticket\n"));
        assert!(code.contains("    pub id: String,\n"));
        assert!(code.contains("    pub r#type: String,\n"));
        assert!(code.contains(
            "    #[serde(rename = \"reporterEmail\")]\n    #[serde(default, skip_serializing_if = \"Option::is_none\")]\n    pub reporter_email: Option<EmailAddress>,\n"
        ));
        assert!(code.contains("    pub tags: Option<Vec<String>>,\n"));
        assert!(code.contains("    pub priority: i64,\n"));
        assert_eq!(generated.types, vec!["EmailAddress", "Status", "Ticket"]);
        assert!(generated.boxed_fields.is_empty());
    }

    #[test]
    fn test_recursive_fields_are_boxed() {
        let cache = ScalarCache::new();
        let mut catalog = ModelCatalog::new();
        catalog.register(ModelDescriptor::declare(
            "Category",
            [
                ("name", FieldSlot::of(cache.string())),
                ("parent", FieldSlot::of(ModelRef::named("Category")).optional()),
                ("children", FieldSlot::of(ModelRef::named("Category")).array()),
            ],
        ));

        let generated = generate_catalog(&catalog, &CodegenConfig::default()).unwrap();
        assert!(generated.code.contains("    pub parent: Option<Box<Category>>,\n"));
        assert!(generated.code.contains("    pub children: Vec<Category>,\n"));
        assert_eq!(
            generated.boxed_fields,
            vec![("Category".to_string(), "parent".to_string())]
        );
    }

    #[test]
    fn test_rename_all_and_derives() {
        let cache = ScalarCache::new();
        let model = ModelDescriptor::declare("Flag", [("enabled", FieldSlot::of(cache.boolean()))]);
        let config = CodegenConfig {
            derives: vec!["Debug".to_string(), "Serialize".to_string()],
            serde_rename_all: Some("camelCase".to_string()),
        };

        let generated = generate_model(&model, &config).unwrap();
        assert!(generated.code.contains(
            "#[derive(Debug, Serialize)]\n#[serde(rename_all = \"camelCase\")]\npub struct Flag {\n    pub enabled: bool,\n}\n"
        ));
    }

    #[test]
    fn test_empty_catalog() {
        let generated = generate_catalog(&ModelCatalog::new(), &CodegenConfig::default()).unwrap();
        assert!(generated.types.is_empty());
        assert!(generated.code.starts_with("// Generated by contract-schemas"));
    }
}
