//! Enum Descriptors
//!
//! A closed, ordered set of distinct string values. In the type schema an
//! enum is always a named type, never an inline union, so independently
//! built schemas that mention the same enum reconcile by name.

use serde_json::{json, Value};
use std::collections::HashSet;

use crate::error::{Result, SchemaError};
use crate::json_schema::JsonNode;

/// Closed string enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    name: String,
    description: Option<String>,
    values: Vec<String>,
}

impl EnumDescriptor {
    /// Declare an enum. Rejects an empty value list and repeated values.
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let values: Vec<String> = values.into_iter().map(Into::into).collect();

        if values.is_empty() {
            return Err(SchemaError::EmptyEnum { name });
        }

        let mut seen = HashSet::with_capacity(values.len());
        for value in &values {
            if !seen.insert(value.as_str()) {
                return Err(SchemaError::DuplicateEnumValue {
                    name,
                    value: value.clone(),
                });
            }
        }

        Ok(Self {
            name,
            description: None,
            values,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Values in declaration order
    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }

    /// Declaration index of `value`
    pub fn position(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }

    /// Accept a member of the set
    pub fn validate(&self, value: &Value) -> std::result::Result<Value, String> {
        match value.as_str() {
            Some(s) if self.contains(s) => Ok(value.clone()),
            Some(s) => Err(format!(
                "'{}' is not one of [{}]",
                s,
                self.values.join(", ")
            )),
            None => Err(format!(
                "expected one of [{}], found {}",
                self.values.join(", "),
                crate::scalar::value_kind(value)
            )),
        }
    }

    /// Enum members arrive as plain strings on every transport
    pub fn parse_external(&self, value: &Value) -> std::result::Result<Value, String> {
        self.validate(value)
    }

    pub fn serialize(&self, value: &Value) -> Value {
        value.clone()
    }

    pub fn describe(&self) -> String {
        format!("{} (enum: {})", self.name, self.values.join(" | "))
    }

    /// `{"type": "string", "enum": [...]}`
    pub fn json_schema(&self) -> JsonNode {
        JsonNode::Value(json!({ "type": "string", "enum": self.values }))
    }
}
