//! Code Generation
//!
//! Mirrors a type schema as static Rust types so host code can hold
//! validated values in typed structs instead of raw JSON.
//!
//! Architecture:
//! - `TypeSchema`: every reachable scalar, enum and object, by name
//! - `CycleAnalysis`: strongly connected object groups, computed once
//! - `rust`: the emitter, which only reads the schema and the analysis

pub mod names;
pub mod rust;

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::catalog::ModelCatalog;
use crate::error::Result;
use crate::model::ModelDescriptor;
use crate::type_schema::{TypeDefinition, TypeSchema};

// =============================================================================
// Configuration
// =============================================================================

/// Rendering settings for generated code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodegenConfig {
    /// Derives on every generated struct and enum
    #[serde(default = "default_derives")]
    pub derives: Vec<String>,

    /// `#[serde(rename_all = ...)]` on generated types
    #[serde(default)]
    pub serde_rename_all: Option<String>,
}

fn default_derives() -> Vec<String> {
    ["Debug", "Clone", "PartialEq", "Serialize", "Deserialize"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            derives: default_derives(),
            serde_rename_all: None,
        }
    }
}

// =============================================================================
// Cycle Analysis
// =============================================================================

/// Which object fields close a reference cycle
#[derive(Debug, Clone, Default)]
pub struct CycleAnalysis {
    /// Objects on a cycle, each mapped to its group id
    groups: HashMap<String, usize>,
}

impl CycleAnalysis {
    pub fn compute(schema: &TypeSchema) -> Self {
        let mut graph: DiGraph<String, ()> = DiGraph::new();
        let mut indices: HashMap<String, NodeIndex> = HashMap::new();

        for definition in schema.types() {
            if let TypeDefinition::Object(object) = definition {
                indices.insert(object.name.clone(), graph.add_node(object.name.clone()));
            }
        }
        for definition in schema.types() {
            if let TypeDefinition::Object(object) = definition {
                let from = indices[&object.name];
                for field in &object.fields {
                    if let Some(&to) = indices.get(field.ty.base_name()) {
                        graph.add_edge(from, to, ());
                    }
                }
            }
        }

        let mut groups = HashMap::new();
        let cyclic = kosaraju_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]));
        for (group_id, scc) in cyclic.enumerate() {
            for idx in scc {
                if let Some(name) = graph.node_weight(idx) {
                    groups.insert(name.clone(), group_id);
                }
            }
        }

        Self { groups }
    }

    /// True if a reference from `from` to `to` stays inside one cycle group
    pub fn is_back_edge(&self, from: &str, to: &str) -> bool {
        match (self.groups.get(from), self.groups.get(to)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn cyclic_types(&self) -> BTreeSet<&str> {
        self.groups.keys().map(String::as_str).collect()
    }

    pub fn group_count(&self) -> usize {
        self.groups.values().collect::<BTreeSet<_>>().len()
    }
}

// =============================================================================
// Output
// =============================================================================

/// Generated source plus a summary of what it contains
#[derive(Debug, Clone)]
pub struct GeneratedOutput {
    pub code: String,
    /// Rust type names emitted, in output order
    pub types: Vec<String>,
    /// `(type, field)` pairs rendered as `Box<_>`
    pub boxed_fields: Vec<(String, String)>,
}

/// Generate Rust for every type in `schema`
pub fn generate_rust(schema: &TypeSchema, config: &CodegenConfig) -> GeneratedOutput {
    let cycles = CycleAnalysis::compute(schema);
    rust::emit_schema(schema, &cycles, config)
}

/// Generate Rust for a model tree built from inline references
pub fn generate_model(model: &ModelDescriptor, config: &CodegenConfig) -> Result<GeneratedOutput> {
    Ok(generate_rust(&model.derive_type_schema()?, config))
}

/// Generate Rust for every model registered in `catalog`
pub fn generate_catalog(catalog: &ModelCatalog, config: &CodegenConfig) -> Result<GeneratedOutput> {
    match catalog.combined_type_schema()? {
        Some(schema) => Ok(generate_rust(&schema, config)),
        None => Ok(rust::emit_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ScalarCache;
    use crate::field::{FieldSlot, ModelRef};

    #[test]
    fn test_cycle_analysis() {
        let cache = ScalarCache::new();
        let mut catalog = ModelCatalog::new();
        catalog
            .register(ModelDescriptor::declare(
                "Person",
                [
                    ("name", FieldSlot::of(cache.string())),
                    ("employer", FieldSlot::of(ModelRef::named("Company")).optional()),
                ],
            ))
            .register(ModelDescriptor::declare(
                "Company",
                [
                    ("staff", FieldSlot::of(ModelRef::named("Person")).array()),
                    ("address", FieldSlot::of(ModelRef::named("Address"))),
                ],
            ))
            .register(ModelDescriptor::declare("Address", [("city", FieldSlot::of(cache.string()))]));

        let schema = catalog.combined_type_schema().unwrap().unwrap();
        let cycles = CycleAnalysis::compute(&schema);

        assert_eq!(cycles.cyclic_types().into_iter().collect::<Vec<_>>(), vec!["Company", "Person"]);
        assert_eq!(cycles.group_count(), 1);
        assert!(cycles.is_back_edge("Person", "Company"));
        assert!(!cycles.is_back_edge("Company", "Address"));
    }
}
