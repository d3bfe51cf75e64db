//! Core types and traits for Imager.
//!
//! This module contains the building blocks shared by parsing and execution:
//! - Value types (arguments, invocations, tags, pipeline values)
//! - Argument definitions and constraints
//! - The operation trait and its metadata
//! - Error types
//! - The per-step execution context

pub mod argument;
pub mod context;
pub mod error;
pub mod operation;
pub mod types;

// Re-export commonly used types
pub use argument::{ArgumentDefinition, Constraint};
pub use context::{DecodedImage, OperationContext};
pub use error::{FetchError, ImagerError, OperationError, PipelineError, StepError};
pub use operation::{Category, Operation, OperationMetadata};
pub use types::{
    Argument, ArgumentKind, ImageInfo, ImageSource, Invocation, OutputFormat, PipelineValue,
    RunId, TagSet,
};
