//! Operation trait and operation metadata.
//!
//! The Operation trait is the single capability every registered image
//! operation implements. Descriptors are created once at start-up, shared
//! between concurrent runs, and never mutated.

use crate::core::argument::ArgumentDefinition;
use crate::core::context::OperationContext;
use crate::core::error::StepError;
use crate::core::types::PipelineValue;
use serde::{Deserialize, Serialize};

/// Category for organizing operations in help output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Geometry changes (resize, crop, rotate)
    Transform,
    /// Colour adjustments (brightness, contrast, hue)
    Color,
    /// Blur and sharpen
    Filter,
    /// Encoding changes
    Format,
    /// Custom/user-defined
    Custom,
}

impl Category {
    /// Get the display name for this category.
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Transform => "Transform",
            Category::Color => "Color",
            Category::Filter => "Filter",
            Category::Format => "Format",
            Category::Custom => "Custom",
        }
    }

    /// Get all categories in display order.
    pub fn all() -> &'static [Category] {
        &[
            Category::Transform,
            Category::Color,
            Category::Filter,
            Category::Format,
            Category::Custom,
        ]
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Custom
    }
}

/// Metadata describing an operation.
///
/// The parser reads `name` and `arguments`; the rest feeds help output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationMetadata {
    /// Name typed in commands (e.g., "resize")
    pub name: String,
    /// Extra names that resolve to the same operation
    pub aliases: Vec<String>,
    /// Category for help output
    pub category: Category,
    /// One-line description
    pub description: String,
    /// Positional arguments, in order
    pub arguments: Vec<ArgumentDefinition>,
    /// Tags this operation reacts to
    pub tags: Vec<String>,
}

impl OperationMetadata {
    /// Create a new metadata builder.
    pub fn builder(name: impl Into<String>) -> OperationMetadataBuilder {
        OperationMetadataBuilder::new(name)
    }

    /// Usage line, e.g. `crop <x> <y> <width> <height>`.
    pub fn usage(&self) -> String {
        let mut usage = self.name.clone();
        for arg in &self.arguments {
            usage.push(' ');
            usage.push_str(&arg.usage());
        }
        usage
    }

    /// Number of arguments that must be present.
    pub fn required_arguments(&self) -> usize {
        self.arguments.iter().filter(|a| !a.optional).count()
    }
}

/// Builder for OperationMetadata.
pub struct OperationMetadataBuilder {
    name: String,
    aliases: Vec<String>,
    category: Category,
    description: String,
    arguments: Vec<ArgumentDefinition>,
    tags: Vec<String>,
}

impl OperationMetadataBuilder {
    /// Create a new builder with the operation name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            category: Category::Custom,
            description: String::new(),
            arguments: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Add an alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Set the category.
    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a positional argument.
    pub fn argument(mut self, argument: ArgumentDefinition) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Add honoured tags.
    pub fn tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags.extend(tags.into_iter().map(|t| t.into()));
        self
    }

    /// Build the metadata.
    pub fn build(self) -> OperationMetadata {
        OperationMetadata {
            name: self.name,
            aliases: self.aliases,
            category: self.category,
            description: self.description,
            arguments: self.arguments,
            tags: self.tags,
        }
    }
}

/// The core trait for image operations.
///
/// # Contract
///
/// `execute` receives the previous step's encoded bytes (or the fetched
/// attachment for the first step), the run's tags and the bound positional
/// arguments through an [`OperationContext`]. It returns either
/// `PipelineValue::Intermediate` or `PipelineValue::Terminal`; an operation
/// must not assume where in the chain it sits, so the executor decides what
/// to keep. Only the final step is required to return `Terminal`.
///
/// Failures worth showing to the requester are returned as
/// `StepError::Operation`; anything else as `StepError::Unexpected`.
///
/// # Thread Safety
///
/// `Send + Sync` because one descriptor serves many concurrent runs.
/// Implementations hold no mutable state.
pub trait Operation: Send + Sync {
    /// Get the metadata for this operation.
    fn metadata(&self) -> OperationMetadata;

    /// Run the operation once.
    fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builder() {
        let metadata = OperationMetadata::builder("crop")
            .category(Category::Transform)
            .description("Crop a region")
            .argument(ArgumentDefinition::integer("x"))
            .argument(ArgumentDefinition::integer("y"))
            .argument(ArgumentDefinition::integer("width").optional())
            .tags(["png"])
            .build();

        assert_eq!(metadata.name, "crop");
        assert_eq!(metadata.category, Category::Transform);
        assert_eq!(metadata.arguments.len(), 3);
        assert_eq!(metadata.required_arguments(), 2);
        assert_eq!(metadata.usage(), "crop <x> <y> [width]");
    }

    #[test]
    fn test_category_display() {
        assert_eq!(Category::Filter.display_name(), "Filter");
        assert_eq!(Category::all().len(), 5);
    }
}
