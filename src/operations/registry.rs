//! Operation registry: the name → descriptor map.
//!
//! The registry is filled once at start-up and then frozen behind an `Arc`.
//! All lookups after that are read-only, so concurrent runs share it freely.

use crate::core::operation::{Category, Operation, OperationMetadata};
use indexmap::IndexMap;
use std::sync::Arc;

/// Registry entry containing the shared descriptor and its metadata.
#[derive(Clone)]
pub struct RegistryEntry {
    /// The operation implementation.
    pub operation: Arc<dyn Operation>,
    /// Cached metadata (avoids rebuilding it on every lookup).
    pub metadata: OperationMetadata,
}

/// Registry for all available operations.
///
/// Keys are lower-case names; aliases map to the same entry as the
/// operation's primary name.
pub struct OperationRegistry {
    /// Operations indexed by name (aliases included).
    operations: IndexMap<String, RegistryEntry>,
    /// Primary names grouped by category.
    categories: IndexMap<Category, Vec<String>>,
}

impl OperationRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            operations: IndexMap::new(),
            categories: IndexMap::new(),
        }
    }

    /// Create a registry pre-populated with the builtin catalog.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::operations::builtin::register_all(&mut registry);
        registry
    }

    /// Register an operation under its name and aliases.
    ///
    /// A later registration of the same name replaces the earlier one.
    pub fn register<O>(&mut self, operation: O)
    where
        O: Operation + 'static,
    {
        self.register_shared(Arc::new(operation));
    }

    /// Register an already shared operation.
    pub fn register_shared(&mut self, operation: Arc<dyn Operation>) {
        let metadata = operation.metadata();
        let name = metadata.name.to_ascii_lowercase();
        let category = metadata.category;

        let entry = RegistryEntry {
            operation,
            metadata,
        };

        let keys = std::iter::once(name.clone())
            .chain(entry.metadata.aliases.iter().map(|a| a.to_ascii_lowercase()));
        let mut replaced = false;
        for key in keys {
            if self.operations.insert(key.clone(), entry.clone()).is_some() {
                log::warn!("[Registry] Operation '{}' registered twice, keeping the latest", key);
                replaced = true;
            }
        }

        let names = self.categories.entry(category).or_default();
        if !names.contains(&name) {
            names.push(name);
        }

        if replaced {
            self.prune_categories();
        }
    }

    /// Drop category names whose primary key no longer belongs to them.
    fn prune_categories(&mut self) {
        let operations = &self.operations;
        for (category, names) in self.categories.iter_mut() {
            names.retain(|name| {
                operations.get(name).is_some_and(|entry| {
                    entry.metadata.name.eq_ignore_ascii_case(name)
                        && entry.metadata.category == *category
                })
            });
        }
        self.categories.retain(|_, names| !names.is_empty());
    }

    /// Resolve a name (case-insensitive) to its descriptor.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Operation>> {
        self.get_entry(name).map(|e| e.operation.clone())
    }

    /// Get a registry entry.
    pub fn get_entry(&self, name: &str) -> Option<&RegistryEntry> {
        match self.operations.get(name) {
            Some(entry) => Some(entry),
            None => self.operations.get(&name.to_ascii_lowercase()),
        }
    }

    /// Get metadata for an operation.
    pub fn get_metadata(&self, name: &str) -> Option<&OperationMetadata> {
        self.get_entry(name).map(|e| &e.metadata)
    }

    /// Check if a name (or alias) is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.get_entry(name).is_some()
    }

    /// Canonical name for a registered name or alias.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.get_metadata(name).map(|m| m.name.as_str())
    }

    /// All registered keys, aliases included, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(|s| s.as_str())
    }

    /// Metadata of every distinct operation, in registration order.
    pub fn operations(&self) -> impl Iterator<Item = &OperationMetadata> {
        self.operations
            .iter()
            .filter(|(key, entry)| entry.metadata.name.eq_ignore_ascii_case(key))
            .map(|(_, entry)| &entry.metadata)
    }

    /// Get operation names by category.
    pub fn operations_by_category(&self, category: &Category) -> Vec<&str> {
        self.categories
            .get(category)
            .map(|names| names.iter().map(|s| s.as_str()).collect())
            .unwrap_or_default()
    }

    /// Search operations by name, alias or description.
    pub fn search(&self, query: &str) -> Vec<&str> {
        let query = query.to_lowercase();

        self.operations()
            .filter(|m| {
                m.name.to_lowercase().contains(&query)
                    || m.description.to_lowercase().contains(&query)
                    || m.aliases.iter().any(|a| a.to_lowercase().contains(&query))
            })
            .map(|m| m.name.as_str())
            .collect()
    }

    /// Number of distinct operations.
    pub fn len(&self) -> usize {
        self.operations().count()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Get operations grouped by category for help output.
    pub fn grouped_by_category(&self) -> IndexMap<Category, Vec<&OperationMetadata>> {
        let mut grouped: IndexMap<Category, Vec<&OperationMetadata>> = IndexMap::new();

        for category in Category::all() {
            for name in self.operations_by_category(category) {
                if let Some(metadata) = self.get_metadata(name) {
                    grouped.entry(*category).or_default().push(metadata);
                }
            }
        }

        for operations in grouped.values_mut() {
            operations.sort_by(|a, b| a.name.cmp(&b.name));
        }

        grouped
    }

    /// Freeze the registry for sharing between runs.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Builder for creating a customized registry.
pub struct RegistryBuilder {
    custom: Vec<Arc<dyn Operation>>,
    include_builtins: bool,
}

impl RegistryBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            custom: Vec::new(),
            include_builtins: true,
        }
    }

    /// Include or exclude builtin operations.
    pub fn with_builtins(mut self, include: bool) -> Self {
        self.include_builtins = include;
        self
    }

    /// Register a custom operation.
    pub fn register<O>(mut self, operation: O) -> Self
    where
        O: Operation + 'static,
    {
        self.custom.push(Arc::new(operation));
        self
    }

    /// Build the registry, frozen for sharing.
    ///
    /// Builtins are registered first so custom operations can replace them.
    pub fn build(self) -> Arc<OperationRegistry> {
        let mut registry = OperationRegistry::new();
        if self.include_builtins {
            crate::operations::builtin::register_all(&mut registry);
        }
        for operation in self.custom {
            registry.register_shared(operation);
        }
        registry.into_shared()
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::OperationContext;
    use crate::core::error::StepError;
    use crate::core::types::PipelineValue;

    struct Echo;

    impl Operation for Echo {
        fn metadata(&self) -> OperationMetadata {
            OperationMetadata::builder("echo")
                .alias("Repeat")
                .category(Category::Custom)
                .description("Returns the input unchanged")
                .build()
        }

        fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
            Ok(PipelineValue::Intermediate(ctx.input().to_vec()))
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = OperationRegistry::new();
        registry.register(Echo);

        assert!(registry.contains("echo"));
        assert!(registry.contains("ECHO"));
        assert!(registry.resolve("echo").is_some());
        assert!(registry.resolve("missing").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_alias_resolves_to_canonical_name() {
        let mut registry = OperationRegistry::new();
        registry.register(Echo);

        assert!(registry.contains("repeat"));
        assert_eq!(registry.canonical_name("repeat"), Some("echo"));
        assert_eq!(registry.names().count(), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_category_grouping_and_search() {
        let mut registry = OperationRegistry::new();
        registry.register(Echo);

        assert_eq!(registry.operations_by_category(&Category::Custom), vec!["echo"]);
        assert_eq!(registry.search("unchanged"), vec!["echo"]);
        assert!(registry.search("nonexistent").is_empty());
        assert_eq!(registry.grouped_by_category()[&Category::Custom].len(), 1);
    }

    struct Shout;

    impl Operation for Shout {
        fn metadata(&self) -> OperationMetadata {
            OperationMetadata::builder("shout")
                .alias("echo")
                .category(Category::Custom)
                .build()
        }

        fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
            Ok(PipelineValue::Intermediate(ctx.input().to_vec()))
        }
    }

    #[test]
    fn test_alias_taking_over_a_name_updates_categories() {
        let mut registry = OperationRegistry::new();
        registry.register(Echo);
        registry.register(Shout);

        assert_eq!(registry.canonical_name("echo"), Some("shout"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.operations_by_category(&Category::Custom), vec!["shout"]);

        let grouped = registry.grouped_by_category();
        let names: Vec<&str> = grouped[&Category::Custom].iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["shout"]);
    }

    #[test]
    fn test_builder_without_builtins() {
        let registry = RegistryBuilder::new().with_builtins(false).register(Echo).build();
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains("resize"));
    }

    #[test]
    fn test_builtins_registered() {
        let registry = OperationRegistry::with_builtins();
        for name in ["resize", "crop", "rotate", "blur", "grayscale", "greyscale", "format"] {
            assert!(registry.contains(name), "missing builtin {}", name);
        }
    }
}
