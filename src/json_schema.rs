//! JSON Schema Fragments and Resolution
//!
//! Descriptors publish their JSON-Schema as a [`JsonNode`] tree. A node may be
//! a plain value, an ordered array of nodes, an ordered object of nodes, or a
//! zero-argument producer that yields another node on demand. Producers let a
//! fragment point at something that is only defined later (forward references).
//!
//! [`resolve`] turns a node tree into a plain `serde_json::Value`, depth-first,
//! with no memoization. Producers are invoked every time they are reached, so a
//! producer that (directly or indirectly) yields itself never terminates.
//! Recursive models must use named references instead (see `ModelRef::Named`).

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::model::ModelDescriptor;

// =============================================================================
// JsonNode
// =============================================================================

type Producer = Arc<dyn Fn() -> JsonNode + Send + Sync>;

/// A possibly-lazy JSON-Schema fragment
#[derive(Clone)]
pub enum JsonNode {
    /// Plain JSON
    Value(Value),
    /// Deferred fragment, produced on resolution
    Lazy(Producer),
    /// Ordered sequence of nodes
    Array(Vec<JsonNode>),
    /// Ordered name -> node mapping
    Object(Vec<(String, JsonNode)>),
}

impl JsonNode {
    /// Wrap a producer
    pub fn lazy(producer: impl Fn() -> JsonNode + Send + Sync + 'static) -> Self {
        JsonNode::Lazy(Arc::new(producer))
    }

    /// Build an object node from key/node pairs
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, JsonNode)>,
    {
        JsonNode::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Resolve into plain JSON
    pub fn resolve(&self) -> Value {
        resolve(self)
    }

    /// True if no producer appears anywhere in the tree
    pub fn is_plain(&self) -> bool {
        match self {
            JsonNode::Value(_) => true,
            JsonNode::Lazy(_) => false,
            JsonNode::Array(items) => items.iter().all(JsonNode::is_plain),
            JsonNode::Object(entries) => entries.iter().all(|(_, v)| v.is_plain()),
        }
    }
}

impl From<Value> for JsonNode {
    fn from(value: Value) -> Self {
        JsonNode::Value(value)
    }
}

impl fmt::Debug for JsonNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonNode::Value(v) => write!(f, "Value({})", v),
            JsonNode::Lazy(_) => write!(f, "Lazy(..)"),
            JsonNode::Array(items) => f.debug_list().entries(items).finish(),
            JsonNode::Object(entries) => f
                .debug_map()
                .entries(entries.iter().map(|(k, v)| (k, v)))
                .finish(),
        }
    }
}

/// Resolve a node tree into plain JSON, depth-first
pub fn resolve(node: &JsonNode) -> Value {
    match node {
        JsonNode::Value(value) => value.clone(),
        JsonNode::Lazy(producer) => resolve(&producer()),
        JsonNode::Array(items) => Value::Array(items.iter().map(resolve).collect()),
        JsonNode::Object(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, value) in entries {
                map.insert(key.clone(), resolve(value));
            }
            Value::Object(map)
        }
    }
}

// =============================================================================
// Derivation Options
// =============================================================================

/// Settings for JSON-Schema derivation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchemaOptions {
    /// `$schema` dialect URI written on bundle roots
    #[serde(default = "default_dialect")]
    pub dialect: Option<String>,

    /// Key under which named models are bundled
    #[serde(default = "default_defs_key")]
    pub defs_key: String,

    /// Emit model descriptions
    #[serde(default = "default_true")]
    pub include_descriptions: bool,
}

fn default_dialect() -> Option<String> {
    Some("https://json-schema.org/draft/2020-12/schema".to_string())
}

fn default_defs_key() -> String {
    "$defs".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for JsonSchemaOptions {
    fn default() -> Self {
        Self {
            dialect: default_dialect(),
            defs_key: default_defs_key(),
            include_descriptions: true,
        }
    }
}

impl JsonSchemaOptions {
    /// `$ref` pointer for a named model
    pub fn ref_pointer(&self, name: &str) -> String {
        format!("#/{}/{}", self.defs_key, name)
    }
}

// =============================================================================
// Model Derivation
// =============================================================================

/// Build the (lazy) JSON-Schema node for a model.
///
/// One linear pass over the fields. Nested inline models are deferred behind
/// producers; named references become `$ref` pointers.
pub fn model_node(model: &ModelDescriptor, options: &JsonSchemaOptions) -> JsonNode {
    let mut properties = Vec::with_capacity(model.len());
    let mut required = Vec::new();

    for (name, slot) in model.fields() {
        properties.push((name.clone(), slot.json_schema(options)));
        if !slot.is_optional() {
            required.push(Value::String(name.clone()));
        }
    }

    let mut entries = vec![("type".to_string(), JsonNode::Value(json!("object")))];
    if options.include_descriptions {
        if let Some(description) = model.description() {
            entries.push(("description".to_string(), JsonNode::Value(json!(description))));
        }
    }
    entries.push(("properties".to_string(), JsonNode::Object(properties)));
    entries.push(("required".to_string(), JsonNode::Value(Value::Array(required))));

    JsonNode::Object(entries)
}

/// Derive a model's JSON-Schema as plain JSON
pub fn model_schema(model: &ModelDescriptor, options: &JsonSchemaOptions) -> Value {
    resolve(&model_node(model, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_resolve_lazy_properties() {
        let node = JsonNode::object([
            ("type", JsonNode::Value(json!("object"))),
            (
                "properties",
                JsonNode::lazy(|| JsonNode::Value(json!({ "x": { "type": "string" } }))),
            ),
        ]);

        assert!(!node.is_plain());
        assert_eq!(
            node.resolve(),
            json!({ "type": "object", "properties": { "x": { "type": "string" } } })
        );
    }

    #[test]
    fn test_resolve_nested_producers_and_arrays() {
        let node = JsonNode::Array(vec![
            JsonNode::Value(json!(1)),
            JsonNode::lazy(|| JsonNode::lazy(|| JsonNode::Array(vec![JsonNode::Value(json!("deep"))]))),
            JsonNode::object([("k", JsonNode::lazy(|| JsonNode::Value(Value::Null)))]),
        ]);

        assert_eq!(resolve(&node), json!([1, ["deep"], { "k": null }]));
    }

    #[test]
    fn test_resolve_is_not_memoized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let node = JsonNode::lazy(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            JsonNode::Value(json!({ "type": "integer" }))
        });

        resolve(&node);
        resolve(&node);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_resolve_preserves_key_order() {
        let node = JsonNode::object([
            ("zeta", JsonNode::Value(json!(1))),
            ("alpha", JsonNode::Value(json!(2))),
        ]);
        let keys: Vec<String> = resolve(&node)
            .as_object()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }
}
