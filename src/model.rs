//! Model Descriptors
//!
//! A model is a named, ordered mapping of field name -> [`FieldSlot`]. The
//! same model tree feeds three independent derivations:
//!
//! - [`ModelDescriptor::derive_validator`] -> [`ModelValidator`]
//! - [`ModelDescriptor::derive_type_schema`] -> [`TypeSchema`]
//! - [`ModelDescriptor::derive_json_schema`] -> JSON-Schema document
//!
//! Each derivation is one linear pass over the fields, and every field's
//! name, optionality and array-ness come from the single `FieldSlot`, so the
//! three outputs cannot disagree.
//!
//! Derivations are not memoized. Callers that need stable artifacts across
//! calls should cache them (a `ModelCatalog` does this for JSON-Schema).

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::field::{Descriptor, FieldSlot, ModelRef};
use crate::json_schema::{model_node, model_schema, JsonNode, JsonSchemaOptions};
use crate::type_schema::TypeSchema;
use crate::validator::{ModelValidator, ValidationOptions};

/// Named composite of field slots
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    name: String,
    description: Option<String>,
    fields: Vec<(String, FieldSlot)>,
    index: HashMap<String, usize>,
}

impl ModelDescriptor {
    /// Declare a model from an ordered field list.
    ///
    /// Field names form a mapping: a repeated name replaces the earlier slot
    /// and keeps the earlier position.
    pub fn declare<N, I>(name: impl Into<String>, fields: I) -> Arc<Self>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, FieldSlot)>,
    {
        Self::builder(name).fields(fields).build()
    }

    pub fn builder(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder {
            inner: ModelDescriptor {
                name: name.into(),
                description: None,
                fields: Vec::new(),
                index: HashMap::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldSlot)> {
        self.fields.iter().map(|(name, slot)| (name, slot))
    }

    pub fn field(&self, name: &str) -> Option<&FieldSlot> {
        self.index.get(name).map(|&i| &self.fields[i].1)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Names of non-optional fields, in declaration order
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, slot)| !slot.is_optional())
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Direct nested model references, in field order
    pub fn model_refs(&self) -> impl Iterator<Item = &ModelRef> {
        self.fields.iter().filter_map(|(_, slot)| match slot.descriptor() {
            Descriptor::Model(model_ref) => Some(model_ref),
            _ => None,
        })
    }

    // -------------------------------------------------------------------------
    // Derivations
    // -------------------------------------------------------------------------

    /// Validator for inline model trees (named references need a catalog)
    pub fn derive_validator(self: &Arc<Self>) -> ModelValidator {
        ModelValidator::new(Arc::clone(self))
    }

    /// Validator with explicit options
    pub fn derive_validator_with(self: &Arc<Self>, options: ValidationOptions) -> ModelValidator {
        ModelValidator::new(Arc::clone(self)).with_options(options)
    }

    /// Named composite type plus every type it reaches
    pub fn derive_type_schema(&self) -> Result<TypeSchema> {
        TypeSchema::for_model(self, None)
    }

    /// JSON-Schema document with default options
    pub fn derive_json_schema(&self) -> Value {
        self.derive_json_schema_with(&JsonSchemaOptions::default())
    }

    pub fn derive_json_schema_with(&self, options: &JsonSchemaOptions) -> Value {
        model_schema(self, options)
    }

    /// Unresolved JSON-Schema node (nested models stay lazy)
    pub fn json_schema_node(&self, options: &JsonSchemaOptions) -> JsonNode {
        model_node(self, options)
    }
}

/// Builder for models
#[derive(Debug)]
pub struct ModelBuilder {
    inner: ModelDescriptor,
}

impl ModelBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.inner.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, slot: FieldSlot) -> Self {
        let name = name.into();
        match self.inner.index.get(&name) {
            Some(&i) => self.inner.fields[i].1 = slot,
            None => {
                self.inner.index.insert(name.clone(), self.inner.fields.len());
                self.inner.fields.push((name, slot));
            }
        }
        self
    }

    pub fn fields<N, I>(self, fields: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, FieldSlot)>,
    {
        fields
            .into_iter()
            .fold(self, |builder, (name, slot)| builder.field(name, slot))
    }

    pub fn build(self) -> Arc<ModelDescriptor> {
        Arc::new(self.inner)
    }
}
