//! Model Validators
//!
//! The validator derivation. Checks that every non-optional field is
//! present and that each present value satisfies its slot. Unknown extra
//! fields pass through untouched; strictness is a caller policy.
//!
//! Validation never stops at the first problem. All violations in the input
//! are collected in one pass and returned together.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::catalog::ModelResolver;
use crate::error::Result;
use crate::model::ModelDescriptor;
use crate::scalar::value_kind;
use crate::violation::{FieldPath, PathSegment, ViolationKind, Violations};

/// Validator behaviour switches
///
/// The defaults match the derived JSON-Schema exactly: optionality means
/// absence, so an explicit `null` is checked like any other value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOptions {
    /// Lenient mode: an explicit `null` for an optional field counts as absence.
    /// The JSON-Schema derivation still rejects such input.
    #[serde(default)]
    pub null_as_absent: bool,
}

/// Shared state for one validation pass
pub(crate) struct ValidationContext<'a> {
    resolver: Option<&'a dyn ModelResolver>,
    options: ValidationOptions,
}

impl<'a> ValidationContext<'a> {
    pub(crate) fn resolve(&self, name: &str) -> Option<Arc<ModelDescriptor>> {
        self.resolver.and_then(|r| r.resolve_model(name))
    }
}

/// Validator derived from a model
#[derive(Clone)]
pub struct ModelValidator {
    model: Arc<ModelDescriptor>,
    resolver: Option<Arc<dyn ModelResolver>>,
    options: ValidationOptions,
}

impl std::fmt::Debug for ModelValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelValidator")
            .field("model", &self.model.name())
            .field("has_resolver", &self.resolver.is_some())
            .field("options", &self.options)
            .finish()
    }
}

impl ModelValidator {
    pub fn new(model: Arc<ModelDescriptor>) -> Self {
        Self {
            model,
            resolver: None,
            options: ValidationOptions::default(),
        }
    }

    /// Resolve named model references through `resolver`
    pub fn with_resolver(mut self, resolver: Arc<dyn ModelResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn model(&self) -> &Arc<ModelDescriptor> {
        &self.model
    }

    /// Validate `value`, returning the parsed object or every violation found
    pub fn validate(&self, value: &Value) -> std::result::Result<Map<String, Value>, Violations> {
        let ctx = ValidationContext {
            resolver: self.resolver.as_deref(),
            options: self.options,
        };
        let mut violations = Violations::new();
        let mut path = FieldPath::new();

        let parsed = validate_object(&self.model, value, &mut path, &ctx, &mut violations);

        match parsed {
            Some(Value::Object(map)) if violations.is_empty() => Ok(map),
            _ => {
                tracing::debug!(
                    model = self.model.name(),
                    violations = violations.len(),
                    "validation failed"
                );
                Err(violations)
            }
        }
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.validate(value).is_ok()
    }

    /// Validate, then decode into a concrete type
    pub fn parse<T: DeserializeOwned>(&self, value: &Value) -> Result<T> {
        let map = self.validate(value)?;
        Ok(serde_json::from_value(Value::Object(map))?)
    }
}

/// Validate `value` as an instance of `model`. Returns `None` if anything failed.
pub(crate) fn validate_object(
    model: &ModelDescriptor,
    value: &Value,
    path: &mut FieldPath,
    ctx: &ValidationContext<'_>,
    violations: &mut Violations,
) -> Option<Value> {
    let Some(input) = value.as_object() else {
        violations.add(
            path,
            ViolationKind::ShapeMismatch,
            format!("expected {} object, found {}", model.name(), value_kind(value)),
        );
        return None;
    };

    let mut output = Map::with_capacity(input.len());
    let mut ok = true;

    for (name, slot) in model.fields() {
        path.push(PathSegment::Field(name.clone()));
        match input.get(name) {
            None => {
                if !slot.is_optional() {
                    violations.add(path, ViolationKind::MissingRequiredField, "required field is missing");
                    ok = false;
                }
            }
            Some(Value::Null) if ctx.options.null_as_absent && !slot.accepts_null() => {
                if slot.is_optional() {
                    output.insert(name.clone(), Value::Null);
                } else {
                    violations.add(path, ViolationKind::MissingRequiredField, "required field is null");
                    ok = false;
                }
            }
            Some(present) => match slot.validate(present, path, ctx, violations) {
                Some(parsed) => {
                    output.insert(name.clone(), parsed);
                }
                None => ok = false,
            },
        }
        path.pop();
    }

    for (key, extra) in input {
        if model.field(key).is_none() {
            output.insert(key.clone(), extra.clone());
        }
    }

    ok.then_some(Value::Object(output))
}
