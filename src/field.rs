//! Field Composition
//!
//! A [`FieldSlot`] wraps a base descriptor with two independent modifiers:
//!
//! | Modifier   | Validator                  | Type schema          | JSON-Schema                     |
//! |------------|----------------------------|----------------------|---------------------------------|
//! | (none)     | base                       | `T!`                 | base                            |
//! | `array`    | sequence of base           | `[T!]!`              | `{"type":"array","items":base}` |
//! | `optional` | base, absence accepted     | `T`                  | excluded from `required`        |
//! | both       | sequence, absence accepted | `[T!]`               | array, excluded from `required` |
//!
//! Arrays are never sparse: optionality applies to the whole field, never to
//! individual elements. The opaque JSON scalar is the one base where `null`
//! is itself a value.
//!
//! A value of the wrong base kind is a `ShapeMismatch`; a value of the right
//! kind that breaks a constraint is a `DomainViolation`.

use serde_json::{json, Value};
use std::sync::Arc;

use crate::enumeration::EnumDescriptor;
use crate::json_schema::{model_node, JsonNode, JsonSchemaOptions};
use crate::model::ModelDescriptor;
use crate::scalar::{value_kind, ScalarDescriptor, ScalarKind};
use crate::type_schema::TypeRef;
use crate::validator::{validate_object, ValidationContext};
use crate::violation::{FieldPath, PathSegment, ViolationKind, Violations};

// =============================================================================
// Model References
// =============================================================================

/// How a field points at a nested model
#[derive(Debug, Clone)]
pub enum ModelRef {
    /// Embedded instance. Immutable `Arc`s cannot form cycles.
    Inline(Arc<ModelDescriptor>),
    /// Forward reference, looked up by name through a `ModelResolver`
    Named(String),
}

impl ModelRef {
    pub fn named(name: impl Into<String>) -> Self {
        ModelRef::Named(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            ModelRef::Inline(model) => model.name(),
            ModelRef::Named(name) => name,
        }
    }
}

// =============================================================================
// Descriptor
// =============================================================================

/// Base descriptor of a field
#[derive(Debug, Clone)]
pub enum Descriptor {
    Scalar(Arc<ScalarDescriptor>),
    Enum(Arc<EnumDescriptor>),
    Model(ModelRef),
}

impl Descriptor {
    /// Name of the type this descriptor stands for
    pub fn type_name(&self) -> &str {
        match self {
            Descriptor::Scalar(scalar) => scalar.name(),
            Descriptor::Enum(e) => e.name(),
            Descriptor::Model(model) => model.name(),
        }
    }

    /// JSON-Schema of one value of this descriptor
    pub fn json_schema(&self, options: &JsonSchemaOptions) -> JsonNode {
        match self {
            Descriptor::Scalar(scalar) => scalar.json_schema(),
            Descriptor::Enum(e) => e.json_schema(),
            Descriptor::Model(ModelRef::Inline(model)) => {
                let model = Arc::clone(model);
                let options = options.clone();
                JsonNode::lazy(move || model_node(&model, &options))
            }
            Descriptor::Model(ModelRef::Named(name)) => {
                JsonNode::Value(json!({ "$ref": options.ref_pointer(name) }))
            }
        }
    }

    /// True only for opaque scalars, where `null` is an ordinary value
    pub fn accepts_null(&self) -> bool {
        matches!(self, Descriptor::Scalar(scalar) if scalar.kind() == ScalarKind::Any)
    }

    /// Validate one present value
    pub(crate) fn validate(
        &self,
        value: &Value,
        path: &mut FieldPath,
        ctx: &ValidationContext<'_>,
        violations: &mut Violations,
    ) -> Option<Value> {
        match self {
            Descriptor::Scalar(scalar) => {
                if !scalar.kind().admits(value) {
                    violations.add(
                        path,
                        ViolationKind::ShapeMismatch,
                        format!("expected {}, found {}", scalar.kind(), value_kind(value)),
                    );
                    return None;
                }
                match scalar.validate(value) {
                    Ok(parsed) => Some(parsed),
                    Err(message) => {
                        violations.add(path, ViolationKind::DomainViolation, message);
                        None
                    }
                }
            }
            Descriptor::Enum(e) => {
                if !value.is_string() {
                    violations.add(
                        path,
                        ViolationKind::ShapeMismatch,
                        format!("expected {} value, found {}", e.name(), value_kind(value)),
                    );
                    return None;
                }
                match e.validate(value) {
                    Ok(parsed) => Some(parsed),
                    Err(message) => {
                        violations.add(path, ViolationKind::UnknownEnumValue, message);
                        None
                    }
                }
            }
            Descriptor::Model(model_ref) => {
                let model = match model_ref {
                    ModelRef::Inline(model) => Arc::clone(model),
                    ModelRef::Named(name) => match ctx.resolve(name) {
                        Some(model) => model,
                        None => {
                            violations.add(
                                path,
                                ViolationKind::DomainViolation,
                                format!("model '{}' is not registered", name),
                            );
                            return None;
                        }
                    },
                };
                validate_object(&model, value, path, ctx, violations)
            }
        }
    }
}

impl From<Arc<ScalarDescriptor>> for Descriptor {
    fn from(scalar: Arc<ScalarDescriptor>) -> Self {
        Descriptor::Scalar(scalar)
    }
}

impl From<Arc<EnumDescriptor>> for Descriptor {
    fn from(e: Arc<EnumDescriptor>) -> Self {
        Descriptor::Enum(e)
    }
}

impl From<EnumDescriptor> for Descriptor {
    fn from(e: EnumDescriptor) -> Self {
        Descriptor::Enum(Arc::new(e))
    }
}

impl From<Arc<ModelDescriptor>> for Descriptor {
    fn from(model: Arc<ModelDescriptor>) -> Self {
        Descriptor::Model(ModelRef::Inline(model))
    }
}

impl From<ModelRef> for Descriptor {
    fn from(model_ref: ModelRef) -> Self {
        Descriptor::Model(model_ref)
    }
}

// =============================================================================
// FieldSlot
// =============================================================================

/// A field's descriptor plus its optional/array modifiers
#[derive(Debug, Clone)]
pub struct FieldSlot {
    descriptor: Descriptor,
    optional: bool,
    array: bool,
}

impl FieldSlot {
    pub fn new(descriptor: impl Into<Descriptor>, optional: bool, array: bool) -> Self {
        Self {
            descriptor: descriptor.into(),
            optional,
            array,
        }
    }

    /// Required, single-valued slot
    pub fn of(descriptor: impl Into<Descriptor>) -> Self {
        Self::new(descriptor, false, false)
    }

    /// Mark the whole field as optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Make the field a homogeneous list of the base descriptor
    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_array(&self) -> bool {
        self.array
    }

    /// A bare `null` is a value of this slot, never a stand-in for absence
    pub fn accepts_null(&self) -> bool {
        !self.array && self.descriptor.accepts_null()
    }

    /// Type-schema reference: `T!`, `T`, `[T!]!` or `[T!]`
    pub fn type_ref(&self) -> TypeRef {
        let base = TypeRef::non_null(TypeRef::named(self.descriptor.type_name()));
        let shaped = if self.array { TypeRef::list(base) } else { base };
        if self.optional {
            shaped
        } else {
            TypeRef::non_null(shaped)
        }
    }

    /// JSON-Schema of the field value (optionality lives in the parent's `required`)
    pub fn json_schema(&self, options: &JsonSchemaOptions) -> JsonNode {
        let base = self.descriptor.json_schema(options);
        if self.array {
            JsonNode::object([
                ("type", JsonNode::Value(json!("array"))),
                ("items", base),
            ])
        } else {
            base
        }
    }

    /// Validate a present value against this slot
    pub(crate) fn validate(
        &self,
        value: &Value,
        path: &mut FieldPath,
        ctx: &ValidationContext<'_>,
        violations: &mut Violations,
    ) -> Option<Value> {
        if !self.array {
            return self.descriptor.validate(value, path, ctx, violations);
        }

        let Some(items) = value.as_array() else {
            violations.add(
                path,
                ViolationKind::ShapeMismatch,
                format!("expected array, found {}", value_kind(value)),
            );
            return None;
        };

        let mut parsed = Vec::with_capacity(items.len());
        let mut ok = true;
        for (index, item) in items.iter().enumerate() {
            path.push(PathSegment::Index(index));
            if item.is_null() && !self.descriptor.accepts_null() {
                violations.add(path, ViolationKind::ShapeMismatch, "array elements must not be null");
                ok = false;
            } else {
                match self.descriptor.validate(item, path, ctx, violations) {
                    Some(value) => parsed.push(value),
                    None => ok = false,
                }
            }
            path.pop();
        }

        ok.then_some(Value::Array(parsed))
    }
}
