//! # Imager - Chat-driven Image Processing
//!
//! Imager turns free-form chat text such as
//! `resize 100 100 crop 10 10 50 50 #grayscale` into an ordered chain of
//! image operations and runs that chain against an attached image.
//!
//! ## Features
//!
//! - **Forgiving parser**: unknown words are ignored, malformed invocations are dropped
//! - **Sequential pipeline**: every step sees exactly the previous step's output
//! - **Structured failures**: operation errors are shown verbatim, internal ones only logged
//! - **Extensible**: add operations through the [`Operation`](core::Operation) trait
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use imager::prelude::*;
//!
//! let registry = OperationRegistry::with_builtins().into_shared();
//! let parser = CommandParser::new(registry.clone());
//! let executor = PipelineExecutor::new(registry);
//!
//! let parsed = parser.parse("resize 100 100 crop 10 10 50 50 #grayscale");
//! let output = executor.run(
//!     &parsed.invocations,
//!     &parsed.tags,
//!     &ImageSource::from_reference("cat.png"),
//! )?;
//! assert_eq!((output.info.width, output.info.height), (50, 50));
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: Value types, the operation trait, contexts and errors
//! - [`operations`]: Operation registry and builtin operations
//! - [`parser`]: Command text parsing
//! - [`pipeline`]: Sequential executor and progress reporting
//! - [`source`]: Fetching the initial image
//! - [`adapter`]: Chat-facing facade producing replies
//! - [`config`]: TOML configuration
//!
//! ## Creating Custom Operations
//!
//! ```rust,ignore
//! use imager::prelude::*;
//!
//! struct Mirror;
//!
//! impl Operation for Mirror {
//!     fn metadata(&self) -> OperationMetadata {
//!         OperationMetadata::builder("mirror")
//!             .description("Mirror horizontally")
//!             .category(Category::Custom)
//!             .build()
//!     }
//!
//!     fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
//!         let decoded = ctx.decode()?;
//!         ctx.finish(decoded.image.fliph(), decoded.format)
//!     }
//! }
//!
//! let registry = RegistryBuilder::new().register(Mirror).build();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod config;
pub mod core;
pub mod operations;
pub mod parser;
pub mod pipeline;
pub mod source;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use imager::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::types::{
        Argument, ArgumentKind, ImageInfo, ImageSource, Invocation, OutputFormat, PipelineValue,
        RunId, TagSet,
    };

    // Operation trait and metadata
    pub use crate::core::argument::{ArgumentDefinition, Constraint};
    pub use crate::core::context::{DecodedImage, OperationContext};
    pub use crate::core::operation::{Category, Operation, OperationMetadata};

    // Errors
    pub use crate::core::error::{
        ConfigError, FetchError, ImagerError, ImagerResult, OperationError, PipelineError,
        PipelineResult, StepError, GENERIC_FAILURE_MESSAGE,
    };

    // Registry
    pub use crate::operations::builtin::Builtin;
    pub use crate::operations::registry::{OperationRegistry, RegistryBuilder, RegistryEntry};

    // Parsing
    pub use crate::parser::{CommandParser, DroppedInvocation, ParsedCommand, ParserOptions};

    // Execution
    pub use crate::pipeline::executor::{
        ExecutionOptions, ExecutionStats, PipelineExecutor, PipelineOutput,
    };
    pub use crate::pipeline::progress::{ProgressCallback, ProgressTracker, ProgressUpdate};
    pub use crate::source::{DefaultFetcher, ImageFetcher};

    // Facade
    pub use crate::adapter::{CommandRequest, Imager, Reply};
    pub use crate::config::ImagerConfig;
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
