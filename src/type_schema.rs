//! Type Schemas
//!
//! The structural, stitchable type representation (GraphQL-equivalent).
//! Every scalar, enum and model becomes a *named* definition; fields point at
//! definitions by name, so recursive and shared models are expressed by
//! reference and never inlined.
//!
//! Stitching rules when two schemas define the same name:
//! - scalars must be the same instance (see `ScalarCache`)
//! - enums must list the same values in the same order
//! - objects must declare the same fields with the same type references

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::catalog::ModelResolver;
use crate::enumeration::EnumDescriptor;
use crate::error::{Result, SchemaError};
use crate::field::{Descriptor, ModelRef};
use crate::model::ModelDescriptor;
use crate::scalar::{builtin, ScalarDescriptor};

// =============================================================================
// TypeRef
// =============================================================================

/// Reference to a named type with nullability and list wrapping
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn list(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    pub fn non_null(inner: TypeRef) -> Self {
        TypeRef::NonNull(Box::new(inner))
    }

    /// True unless the outermost wrapper is `NonNull`
    pub fn is_nullable(&self) -> bool {
        !matches!(self, TypeRef::NonNull(_))
    }

    /// True if the type (ignoring outer `NonNull`) is a list
    pub fn is_list(&self) -> bool {
        match self {
            TypeRef::NonNull(inner) => inner.is_list(),
            TypeRef::List(_) => true,
            TypeRef::Named(_) => false,
        }
    }

    /// Innermost named type
    pub fn base_name(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.base_name(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{}", name),
            TypeRef::List(inner) => write!(f, "[{}]", inner),
            TypeRef::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

// =============================================================================
// Definitions
// =============================================================================

/// A field of an object type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectField {
    pub name: String,
    pub ty: TypeRef,
}

/// A composite type derived from a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectType {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<ObjectField>,
}

impl ObjectType {
    /// Mirror a model's fields exactly
    pub fn from_model(model: &ModelDescriptor) -> Self {
        Self {
            name: model.name().to_string(),
            description: model.description().map(str::to_string),
            fields: model
                .fields()
                .map(|(name, slot)| ObjectField {
                    name: name.clone(),
                    ty: slot.type_ref(),
                })
                .collect(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&ObjectField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A named type definition
#[derive(Debug, Clone)]
pub enum TypeDefinition {
    Scalar(Arc<ScalarDescriptor>),
    Enum(Arc<EnumDescriptor>),
    Object(ObjectType),
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Scalar(s) => s.name(),
            TypeDefinition::Enum(e) => e.name(),
            TypeDefinition::Object(o) => &o.name,
        }
    }

    /// Check that `other` may share this definition's name
    fn reconcile(&self, other: &TypeDefinition) -> Result<()> {
        let conflict = |reason: &str| SchemaError::TypeConflict {
            name: self.name().to_string(),
            reason: reason.to_string(),
        };
        match (self, other) {
            (TypeDefinition::Scalar(a), TypeDefinition::Scalar(b)) => {
                if Arc::ptr_eq(a, b) {
                    Ok(())
                } else {
                    Err(conflict("two distinct scalar instances share this name"))
                }
            }
            (TypeDefinition::Enum(a), TypeDefinition::Enum(b)) => {
                if a.values() == b.values() {
                    Ok(())
                } else {
                    Err(conflict("enum values differ"))
                }
            }
            (TypeDefinition::Object(a), TypeDefinition::Object(b)) => {
                if a.fields == b.fields {
                    Ok(())
                } else {
                    Err(conflict("object fields differ"))
                }
            }
            _ => Err(conflict("definitions are of different kinds")),
        }
    }
}

// =============================================================================
// TypeSchema
// =============================================================================

/// A root type plus every named definition it reaches
#[derive(Debug, Clone)]
pub struct TypeSchema {
    root: String,
    types: BTreeMap<String, TypeDefinition>,
}

impl TypeSchema {
    /// Derive the schema of `model`.
    ///
    /// Named model references are followed through `resolver` when given and
    /// must resolve. Without a resolver they stay as bare names for a later
    /// `merge` to supply.
    pub fn for_model(model: &ModelDescriptor, resolver: Option<&dyn ModelResolver>) -> Result<Self> {
        let mut schema = TypeSchema {
            root: model.name().to_string(),
            types: BTreeMap::new(),
        };
        let mut visited = HashSet::new();
        schema.collect_model(model, resolver, &mut visited)?;
        Ok(schema)
    }

    /// Every occurrence of a model is reconciled against the first one of
    /// its name, so two different shapes under one name conflict.
    fn collect_model(
        &mut self,
        model: &ModelDescriptor,
        resolver: Option<&dyn ModelResolver>,
        visited: &mut HashSet<String>,
    ) -> Result<()> {
        self.insert(TypeDefinition::Object(ObjectType::from_model(model)))?;
        if !visited.insert(model.name().to_string()) {
            return Ok(());
        }

        for (_, slot) in model.fields() {
            match slot.descriptor() {
                Descriptor::Scalar(scalar) => {
                    self.insert(TypeDefinition::Scalar(Arc::clone(scalar)))?;
                }
                Descriptor::Enum(e) => {
                    self.insert(TypeDefinition::Enum(Arc::clone(e)))?;
                }
                Descriptor::Model(ModelRef::Inline(nested)) => {
                    self.collect_model(nested, resolver, visited)?;
                }
                Descriptor::Model(ModelRef::Named(name)) => {
                    if let Some(resolver) = resolver {
                        let nested = resolver
                            .resolve_model(name)
                            .ok_or_else(|| SchemaError::UnresolvedModel(name.clone()))?;
                        self.collect_model(&nested, Some(resolver), visited)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn insert(&mut self, definition: TypeDefinition) -> Result<()> {
        match self.types.get(definition.name()) {
            Some(existing) => existing.reconcile(&definition),
            None => {
                self.types.insert(definition.name().to_string(), definition);
                Ok(())
            }
        }
    }

    /// Stitch another schema into this one
    pub fn merge(&mut self, other: &TypeSchema) -> Result<()> {
        for definition in other.types.values() {
            self.insert(definition.clone())?;
        }
        Ok(())
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn root_object(&self) -> Option<&ObjectType> {
        self.object(&self.root)
    }

    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        match self.types.get(name) {
            Some(TypeDefinition::Object(o)) => Some(o),
            _ => None,
        }
    }

    /// Definitions sorted by name
    pub fn types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values()
    }

    /// Referenced type names with no definition in this schema
    pub fn missing_types(&self) -> Vec<String> {
        let mut missing: Vec<String> = self
            .types
            .values()
            .filter_map(|d| match d {
                TypeDefinition::Object(o) => Some(o),
                _ => None,
            })
            .flat_map(|o| o.fields.iter().map(|f| f.ty.base_name().to_string()))
            .filter(|name| !self.types.contains_key(name))
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }

    /// Render as SDL text
    pub fn to_sdl(&self) -> String {
        let mut output = String::new();

        for definition in self.types.values() {
            match definition {
                TypeDefinition::Scalar(scalar) => {
                    if builtin::NATIVE.contains(&scalar.name()) {
                        continue;
                    }
                    write_description(&mut output, scalar.description(), "");
                    output.push_str(&format!("scalar {}\n\n", scalar.name()));
                }
                TypeDefinition::Enum(e) => {
                    write_description(&mut output, e.description(), "");
                    output.push_str(&format!("enum {} {{\n", e.name()));
                    let mut taken = HashSet::new();
                    for value in e.values() {
                        let mut name = sdl_enum_value(value);
                        while !taken.insert(name.clone()) {
                            name.push('_');
                        }
                        if name != *value {
                            write_description(&mut output, Some(value.as_str()), "  ");
                        }
                        output.push_str(&format!("  {}\n", name));
                    }
                    output.push_str("}\n\n");
                }
                TypeDefinition::Object(object) => {
                    write_description(&mut output, object.description.as_deref(), "");
                    output.push_str(&format!("type {} {{\n", object.name));
                    for field in &object.fields {
                        output.push_str(&format!("  {}: {}\n", field.name, field.ty));
                    }
                    output.push_str("}\n\n");
                }
            }
        }

        output.truncate(output.trim_end().len());
        output.push('\n');
        output
    }
}

fn write_description(output: &mut String, description: Option<&str>, indent: &str) {
    if let Some(description) = description {
        let escaped = description.replace("\"\"\"", "\\\"\"\"");
        output.push_str(&format!("{}\"\"\"{}\"\"\"\n", indent, escaped));
    }
}

/// GraphQL enum values must match `[_A-Za-z][_0-9A-Za-z]*` and may not be
/// `true`, `false` or `null`. Other wire values are rewritten; the caller
/// keeps the wire value as the description.
fn sdl_enum_value(value: &str) -> String {
    let mut name: String = value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    if matches!(name.as_str(), "true" | "false" | "null") {
        name.push('_');
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ScalarCache;
    use crate::field::FieldSlot;
    use crate::scalar::ScalarKind;

    #[test]
    fn test_nested_models_by_reference() {
        let cache = ScalarCache::new();
        let status = Arc::new(EnumDescriptor::new("Status", ["open", "closed"]).unwrap());
        let tag = ModelDescriptor::declare("Tag", [("label", FieldSlot::of(cache.non_empty_string()))]);
        let ticket = ModelDescriptor::declare(
            "Ticket",
            [
                ("id", FieldSlot::of(cache.id())),
                ("status", FieldSlot::of(Arc::clone(&status))),
                ("tags", FieldSlot::of(tag).array().optional()),
            ],
        );

        let schema = ticket.derive_type_schema().unwrap();
        let root = schema.root_object().unwrap();
        assert_eq!(root.field("tags").unwrap().ty.to_string(), "[Tag!]");
        assert_eq!(root.field("status").unwrap().ty.to_string(), "Status!");
        assert!(schema.object("Tag").is_some());
        assert!(matches!(schema.get("Status"), Some(TypeDefinition::Enum(_))));
        assert!(schema.missing_types().is_empty());
    }

    #[test]
    fn test_merge_requires_same_scalar_instance() {
        let shared = ScalarCache::new();
        let a = ModelDescriptor::declare("A", [("when", FieldSlot::of(shared.date()))]);
        let b = ModelDescriptor::declare("B", [("when", FieldSlot::of(shared.date()))]);

        let mut merged = a.derive_type_schema().unwrap();
        merged.merge(&b.derive_type_schema().unwrap()).unwrap();
        assert!(merged.object("B").is_some());

        let other = ScalarCache::new();
        let c = ModelDescriptor::declare("C", [("when", FieldSlot::of(other.date()))]);
        let err = merged.merge(&c.derive_type_schema().unwrap()).unwrap_err();
        assert!(matches!(err, SchemaError::TypeConflict { ref name, .. } if name == "Date"));
    }

    #[test]
    fn test_enums_reconcile_by_name() {
        let one = Arc::new(EnumDescriptor::new("Color", ["red", "blue"]).unwrap());
        let two = Arc::new(EnumDescriptor::new("Color", ["red", "blue"]).unwrap());
        let three = Arc::new(EnumDescriptor::new("Color", ["blue", "red"]).unwrap());

        let a = ModelDescriptor::declare("A", [("c", FieldSlot::of(one))]);
        let b = ModelDescriptor::declare("B", [("c", FieldSlot::of(two))]);
        let c = ModelDescriptor::declare("C", [("c", FieldSlot::of(three))]);

        let mut merged = a.derive_type_schema().unwrap();
        assert!(merged.merge(&b.derive_type_schema().unwrap()).is_ok());
        assert!(merged.merge(&c.derive_type_schema().unwrap()).is_err());
    }

    #[test]
    fn test_to_sdl() {
        let cache = ScalarCache::new();
        let money = Arc::new(
            ScalarDescriptor::builder("Money", ScalarKind::String)
                .description("Decimal amount")
                .build(),
        );
        let model = ModelDescriptor::builder("Invoice")
            .description("A billable document")
            .field("number", FieldSlot::of(cache.string()))
            .field("total", FieldSlot::of(money))
            .field("notes", FieldSlot::of(cache.string()).array().optional())
            .build();

        let sdl = model.derive_type_schema().unwrap().to_sdl();
        assert_eq!(
            sdl,
            "\"\"\"A billable document\"\"\"\ntype Invoice {\n  number: String!\n  total: Money!\n  notes: [String!]\n}\n\n\"\"\"Decimal amount\"\"\"\nscalar Money\n"
        );
    }

    #[test]
    fn test_unresolved_named_ref_is_reported_missing() {
        let model = ModelDescriptor::declare("Node", [("parent", FieldSlot::of(ModelRef::named("Tree")).optional())]);
        let schema = model.derive_type_schema().unwrap();
        assert_eq!(schema.missing_types(), vec!["Tree".to_string()]);
    }

    #[test]
    fn test_sdl_enum_values_are_name_safe() {
        let stage = Arc::new(EnumDescriptor::new("Stage", ["open", "in-progress", "in_progress", "1st", "null"]).unwrap());
        let model = ModelDescriptor::declare("Job", [("stage", FieldSlot::of(stage))]);

        let sdl = model.derive_type_schema().unwrap().to_sdl();
        assert!(sdl.starts_with(
            "type Job {\n  stage: Stage!\n}\n\nenum Stage {\n  open\n  \"\"\"in-progress\"\"\"\n  in_progress\n  in_progress_\n  \"\"\"1st\"\"\"\n  _1st\n  \"\"\"null\"\"\"\n  null_\n}\n"
        ));
    }

    #[test]
    fn test_same_name_different_inline_shapes_conflict() {
        let cache = ScalarCache::new();
        let home = ModelDescriptor::declare("Addr", [("city", FieldSlot::of(cache.string()))]);
        let work = ModelDescriptor::declare("Addr", [("zip", FieldSlot::of(cache.string()))]);
        let person = ModelDescriptor::declare(
            "Person",
            [("home", FieldSlot::of(home.clone())), ("work", FieldSlot::of(work))],
        );

        let err = person.derive_type_schema().unwrap_err();
        assert!(matches!(err, SchemaError::TypeConflict { ref name, .. } if name == "Addr"));

        let twice = ModelDescriptor::declare(
            "Person",
            [("home", FieldSlot::of(home.clone())), ("work", FieldSlot::of(home))],
        );
        let schema = twice.derive_type_schema().unwrap();
        let addr: Vec<&str> = schema.object("Addr").unwrap().fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(addr, vec!["city"]);
    }
}
