//! Model Catalog
//!
//! Name -> model registry. Models that refer to each other by name (including
//! self-recursive ones) are declared with `ModelRef::Named` and resolved here.
//!
//! JSON-Schema bundles are memoized per root model: the first call builds the
//! document, later calls return the cached value. Registering a model clears
//! every memo, since any bundle may reach the replaced model.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, OnceLock};

use crate::error::{Result, SchemaError};
use crate::field::ModelRef;
use crate::json_schema::{model_schema, JsonSchemaOptions};
use crate::model::ModelDescriptor;
use crate::type_schema::TypeSchema;
use crate::validator::{ModelValidator, ValidationOptions};

/// Looks up models by name
pub trait ModelResolver: Send + Sync {
    fn resolve_model(&self, name: &str) -> Option<Arc<ModelDescriptor>>;
}

impl<S: std::hash::BuildHasher + Send + Sync> ModelResolver for HashMap<String, Arc<ModelDescriptor>, S> {
    fn resolve_model(&self, name: &str) -> Option<Arc<ModelDescriptor>> {
        self.get(name).cloned()
    }
}

#[derive(Debug)]
struct CatalogEntry {
    model: Arc<ModelDescriptor>,
    json_schema: OnceLock<Value>,
}

impl CatalogEntry {
    fn new(model: Arc<ModelDescriptor>) -> Self {
        Self {
            model,
            json_schema: OnceLock::new(),
        }
    }
}

/// A missing model reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingRef {
    pub model: String,
    pub field: String,
    pub target: String,
}

/// Registry of named models
#[derive(Debug, Default)]
pub struct ModelCatalog {
    entries: BTreeMap<String, CatalogEntry>,
    json_options: JsonSchemaOptions,
    validation: ValidationOptions,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json_options(mut self, options: JsonSchemaOptions) -> Self {
        self.json_options = options;
        self.invalidate();
        self
    }

    pub fn with_validation_options(mut self, options: ValidationOptions) -> Self {
        self.validation = options;
        self
    }

    pub fn json_options(&self) -> &JsonSchemaOptions {
        &self.json_options
    }

    /// Register `model` under its own name, replacing any previous entry
    pub fn register(&mut self, model: Arc<ModelDescriptor>) -> &mut Self {
        let name = model.name().to_string();
        self.invalidate();
        if self.entries.insert(name.clone(), CatalogEntry::new(model)).is_some() {
            tracing::warn!(model = %name, "model re-registered, previous definition replaced");
        } else {
            tracing::debug!(model = %name, "model registered");
        }
        self
    }

    fn invalidate(&mut self) {
        for entry in self.entries.values_mut() {
            entry.json_schema = OnceLock::new();
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ModelDescriptor>> {
        self.entries.get(name).map(|e| &e.model)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, name: &str) -> Result<&CatalogEntry> {
        self.entries
            .get(name)
            .ok_or_else(|| SchemaError::UnresolvedModel(name.to_string()))
    }

    // =========================================================================
    // Derivations
    // =========================================================================

    /// Self-contained JSON-Schema document for `name`.
    ///
    /// Every named model reachable from the root is bundled under the
    /// definitions key so `$ref` pointers resolve inside the document.
    pub fn json_schema(&self, name: &str) -> Result<Value> {
        let entry = self.entry(name)?;
        if let Some(cached) = entry.json_schema.get() {
            tracing::trace!(model = name, "json schema memo hit");
            return Ok(cached.clone());
        }

        let document = self.build_json_schema(&entry.model)?;
        Ok(entry.json_schema.get_or_init(|| document).clone())
    }

    fn build_json_schema(&self, root: &ModelDescriptor) -> Result<Value> {
        let mut defs = BTreeMap::new();
        self.collect_named(root, &mut defs)?;

        let mut document = Map::new();
        if let Some(dialect) = &self.json_options.dialect {
            document.insert("$schema".to_string(), Value::String(dialect.clone()));
        }
        if let Value::Object(body) = model_schema(root, &self.json_options) {
            document.extend(body);
        }

        if !defs.is_empty() {
            let bundled: Map<String, Value> = defs
                .into_iter()
                .map(|(name, model)| (name, model_schema(&model, &self.json_options)))
                .collect();
            document.insert(self.json_options.defs_key.clone(), Value::Object(bundled));
        }

        tracing::debug!(model = root.name(), "json schema built");
        Ok(Value::Object(document))
    }

    /// Gather every named model reachable from `model`
    fn collect_named(
        &self,
        model: &ModelDescriptor,
        defs: &mut BTreeMap<String, Arc<ModelDescriptor>>,
    ) -> Result<()> {
        for model_ref in model.model_refs() {
            match model_ref {
                ModelRef::Inline(nested) => self.collect_named(nested, defs)?,
                ModelRef::Named(name) => {
                    if defs.contains_key(name) {
                        continue;
                    }
                    let target = Arc::clone(&self.entry(name)?.model);
                    defs.insert(name.clone(), Arc::clone(&target));
                    self.collect_named(&target, defs)?;
                }
            }
        }
        Ok(())
    }

    /// Type schema for `name` with named references resolved through this catalog
    pub fn type_schema(&self, name: &str) -> Result<TypeSchema> {
        let entry = self.entry(name)?;
        TypeSchema::for_model(&entry.model, Some(self))
    }

    /// Stitch the type schemas of every registered model
    pub fn combined_type_schema(&self) -> Result<Option<TypeSchema>> {
        let mut combined: Option<TypeSchema> = None;
        for name in self.entries.keys() {
            let schema = self.type_schema(name)?;
            match combined.as_mut() {
                Some(existing) => existing.merge(&schema)?,
                None => combined = Some(schema),
            }
        }
        Ok(combined)
    }

    /// Validator for `name` that resolves named references through this catalog
    pub fn validator(self: &Arc<Self>, name: &str) -> Result<ModelValidator> {
        let model = Arc::clone(&self.entry(name)?.model);
        let resolver: Arc<dyn ModelResolver> = Arc::clone(self) as Arc<dyn ModelResolver>;
        Ok(ModelValidator::new(model)
            .with_resolver(resolver)
            .with_options(self.validation))
    }

    // =========================================================================
    // Reference Analysis
    // =========================================================================

    /// Named references whose target is not registered
    pub fn dangling_refs(&self) -> Vec<DanglingRef> {
        let mut dangling = Vec::new();
        for entry in self.entries.values() {
            self.collect_dangling(&entry.model, &mut dangling, &mut BTreeSet::new());
        }
        dangling
    }

    fn collect_dangling(
        &self,
        model: &ModelDescriptor,
        dangling: &mut Vec<DanglingRef>,
        seen_inline: &mut BTreeSet<String>,
    ) {
        for (field, slot) in model.fields() {
            if let crate::field::Descriptor::Model(model_ref) = slot.descriptor() {
                match model_ref {
                    ModelRef::Named(target) if !self.contains(target) => dangling.push(DanglingRef {
                        model: model.name().to_string(),
                        field: field.clone(),
                        target: target.clone(),
                    }),
                    ModelRef::Inline(nested) if seen_inline.insert(nested.name().to_string()) => {
                        self.collect_dangling(nested, dangling, seen_inline);
                    }
                    _ => {}
                }
            }
        }
    }

    /// Fail on the first dangling reference
    pub fn check_references(&self) -> Result<()> {
        match self.dangling_refs().into_iter().next() {
            Some(dangling) => {
                tracing::warn!(
                    model = %dangling.model,
                    field = %dangling.field,
                    target = %dangling.target,
                    "dangling model reference"
                );
                Err(SchemaError::UnresolvedModel(dangling.target))
            }
            None => Ok(()),
        }
    }

    /// Groups of registered models that reference each other in a cycle.
    ///
    /// Self-recursive models form a group of one.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut graph: DiGraph<String, ()> = DiGraph::with_capacity(self.len(), self.len() * 2);
        let mut indices: HashMap<&str, NodeIndex> = HashMap::with_capacity(self.len());

        for name in self.entries.keys() {
            indices.insert(name.as_str(), graph.add_node(name.clone()));
        }
        for (name, entry) in &self.entries {
            let from = indices[name.as_str()];
            let mut targets = BTreeSet::new();
            named_targets(&entry.model, &mut targets);
            for target in &targets {
                if let Some(&to) = indices.get(target.as_str()) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        let mut groups: Vec<Vec<String>> = kosaraju_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut names: Vec<String> = scc
                    .into_iter()
                    .filter_map(|idx| graph.node_weight(idx).cloned())
                    .collect();
                names.sort();
                names
            })
            .collect();
        groups.sort();
        groups
    }

    /// True if `name` sits on a reference cycle
    pub fn is_recursive(&self, name: &str) -> bool {
        self.cycles().iter().any(|group| group.iter().any(|n| n == name))
    }
}

/// Names of every named model `model` points at, looking through inline nesting
fn named_targets(model: &ModelDescriptor, targets: &mut BTreeSet<String>) {
    for model_ref in model.model_refs() {
        match model_ref {
            ModelRef::Inline(nested) => named_targets(nested, targets),
            ModelRef::Named(name) => {
                targets.insert(name.clone());
            }
        }
    }
}

impl ModelResolver for ModelCatalog {
    fn resolve_model(&self, name: &str) -> Option<Arc<ModelDescriptor>> {
        self.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ScalarCache;
    use crate::field::FieldSlot;
    use crate::violation::ViolationKind;
    use serde_json::json;

    fn tree_catalog(cache: &ScalarCache) -> ModelCatalog {
        let mut catalog = ModelCatalog::new();
        catalog.register(ModelDescriptor::declare(
            "TreeNode",
            [
                ("label", FieldSlot::of(cache.non_empty_string())),
                ("children", FieldSlot::of(ModelRef::named("TreeNode")).array().optional()),
            ],
        ));
        catalog
    }

    #[test]
    fn test_recursive_json_schema_bundle() {
        let cache = ScalarCache::new();
        let catalog = tree_catalog(&cache);

        let schema = catalog.json_schema("TreeNode").unwrap();
        assert_eq!(schema["$schema"], json!("https://json-schema.org/draft/2020-12/schema"));
        assert_eq!(
            schema["properties"]["children"]["items"],
            json!({ "$ref": "#/$defs/TreeNode" })
        );
        assert_eq!(schema["$defs"]["TreeNode"]["required"], json!(["label"]));
    }

    #[test]
    fn test_json_schema_is_memoized_until_register() {
        let cache = ScalarCache::new();
        let mut catalog = tree_catalog(&cache);

        let first = catalog.json_schema("TreeNode").unwrap();
        assert_eq!(catalog.json_schema("TreeNode").unwrap(), first);

        catalog.register(ModelDescriptor::declare("TreeNode", [("label", FieldSlot::of(cache.string()))]));
        let second = catalog.json_schema("TreeNode").unwrap();
        assert_ne!(first, second);
        assert!(second.get("$defs").is_none());
    }

    #[test]
    fn test_recursive_validation() {
        let cache = ScalarCache::new();
        let catalog = Arc::new(tree_catalog(&cache));
        let validator = catalog.validator("TreeNode").unwrap();

        assert!(validator
            .validate(&json!({ "label": "root", "children": [{ "label": "leaf" }] }))
            .is_ok());

        let violations = validator
            .validate(&json!({ "label": "root", "children": [{ "label": "" }, {}] }))
            .unwrap_err();
        assert_eq!(
            violations.at("children[0].label").next().unwrap().kind,
            ViolationKind::DomainViolation
        );
        assert_eq!(
            violations.at("children[1].label").next().unwrap().kind,
            ViolationKind::MissingRequiredField
        );
    }

    #[test]
    fn test_recursive_type_schema() {
        let cache = ScalarCache::new();
        let catalog = tree_catalog(&cache);

        let schema = catalog.type_schema("TreeNode").unwrap();
        let node = schema.object("TreeNode").unwrap();
        assert_eq!(node.field("children").unwrap().ty.to_string(), "[TreeNode!]");
        assert!(schema.missing_types().is_empty());
    }

    #[test]
    fn test_cycles_and_dangling_refs() {
        let cache = ScalarCache::new();
        let mut catalog = tree_catalog(&cache);
        catalog
            .register(ModelDescriptor::declare("A", [("b", FieldSlot::of(ModelRef::named("B")))]))
            .register(ModelDescriptor::declare("B", [("a", FieldSlot::of(ModelRef::named("A")).optional())]))
            .register(ModelDescriptor::declare("Leaf", [("v", FieldSlot::of(cache.int()))]));

        assert_eq!(
            catalog.cycles(),
            vec![vec!["A".to_string(), "B".to_string()], vec!["TreeNode".to_string()]]
        );
        assert!(!catalog.is_recursive("Leaf"));
        assert!(catalog.check_references().is_ok());

        catalog.register(ModelDescriptor::declare("Orphan", [("ghost", FieldSlot::of(ModelRef::named("Ghost")))]));
        assert_eq!(
            catalog.dangling_refs(),
            vec![DanglingRef {
                model: "Orphan".to_string(),
                field: "ghost".to_string(),
                target: "Ghost".to_string(),
            }]
        );
        assert!(matches!(catalog.check_references(), Err(SchemaError::UnresolvedModel(t)) if t == "Ghost"));
        assert!(matches!(catalog.json_schema("Orphan"), Err(SchemaError::UnresolvedModel(_))));
        assert!(matches!(catalog.type_schema("Orphan"), Err(SchemaError::UnresolvedModel(_))));
    }

    #[test]
    fn test_cycles_through_inline_nesting() {
        let cache = ScalarCache::new();
        let wrapper = ModelDescriptor::declare(
            "Wrapper",
            [("inner", FieldSlot::of(ModelRef::named("Outer")).optional())],
        );
        let mut catalog = ModelCatalog::new();
        catalog
            .register(ModelDescriptor::declare(
                "Outer",
                [
                    ("label", FieldSlot::of(cache.string())),
                    ("wrapped", FieldSlot::of(wrapper)),
                ],
            ))
            .register(ModelDescriptor::declare("Plain", [("v", FieldSlot::of(cache.int()))]))
            .register(ModelDescriptor::declare(
                "Holder",
                [("plain", FieldSlot::of(ModelDescriptor::declare("Plain", [("v", FieldSlot::of(cache.int()))])))],
            ));

        assert_eq!(catalog.cycles(), vec![vec!["Outer".to_string()]]);
        assert!(catalog.is_recursive("Outer"));
        assert!(!catalog.is_recursive("Holder"));
        assert!(!catalog.is_recursive("Plain"));
    }

    #[test]
    fn test_unregistered_model_in_validation() {
        let cache = ScalarCache::new();
        let mut catalog = ModelCatalog::new();
        catalog.register(ModelDescriptor::declare(
            "Holder",
            [
                ("id", FieldSlot::of(cache.id())),
                ("item", FieldSlot::of(ModelRef::named("Missing"))),
            ],
        ));
        let catalog = Arc::new(catalog);

        let violations = catalog
            .validator("Holder")
            .unwrap()
            .validate(&json!({ "id": "1", "item": {} }))
            .unwrap_err();
        assert_eq!(violations.at("item").next().unwrap().kind, ViolationKind::DomainViolation);
    }
}
