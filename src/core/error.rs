//! Error types for Imager.
//!
//! Uses thiserror for structured errors. Failures fall into two groups:
//! - `OperationError`: attributable to a named operation and safe to show to the requester
//! - everything else: internal, logged in full and reported only as a generic message

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message shown to the requester when a run fails for an internal reason.
pub const GENERIC_FAILURE_MESSAGE: &str = "Oops, something went wrong.";

/// A failure raised by an operation, meant for direct display.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{operation} {message}")]
pub struct OperationError {
    /// Name of the failing operation
    pub operation: String,
    /// Human-readable reason
    pub message: String,
}

impl OperationError {
    /// Create a new operation error.
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// How a single step of the chain failed.
#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<image::ImageError> for StepError {
    fn from(e: image::ImageError) -> Self {
        StepError::Unexpected(anyhow::Error::new(e))
    }
}

impl From<std::io::Error> for StepError {
    fn from(e: std::io::Error) -> Self {
        StepError::Unexpected(anyhow::Error::new(e))
    }
}

/// Errors returned by a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// An operation rejected with a displayable reason.
    #[error("Operation failed: {0}")]
    Operation(OperationError),

    /// Any other failure: fetch errors, codec faults, contract violations.
    #[error("Unexpected failure{}: {cause:#}", in_operation(.operation))]
    Unexpected {
        operation: Option<String>,
        cause: anyhow::Error,
    },

    /// The executor was given an empty chain.
    #[error("No operations to run")]
    NoOperations,
}

/// Errors while obtaining the initial image.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request for {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("Image exceeds the {limit} byte download limit")]
    TooLarge { limit: usize },

    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {error}")]
    Io { path: String, error: std::io::Error },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level error type for Imager.
#[derive(Error, Debug)]
pub enum ImagerError {
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ============================================================================
// Error Utilities
// ============================================================================

impl StepError {
    /// Wrap any displayable internal fault.
    pub fn unexpected(message: impl std::fmt::Display) -> Self {
        StepError::Unexpected(anyhow::anyhow!("{}", message))
    }
}

impl PipelineError {
    /// Build an unexpected failure attributed to an operation.
    pub fn unexpected_in(operation: impl Into<String>, cause: anyhow::Error) -> Self {
        PipelineError::Unexpected {
            operation: Some(operation.into()),
            cause,
        }
    }

    /// Whether this error carries detail meant for the requester.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, PipelineError::Operation(_))
    }

    /// The operation this error is attributed to, if any.
    pub fn operation(&self) -> Option<&str> {
        match self {
            PipelineError::Operation(e) => Some(&e.operation),
            PipelineError::Unexpected { operation, .. } => operation.as_deref(),
            PipelineError::NoOperations => None,
        }
    }

    /// Text safe to show to the requester.
    ///
    /// Internal detail never appears here.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Operation(e) => e.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

fn in_operation(operation: &Option<String>) -> String {
    operation
        .as_ref()
        .map(|o| format!(" in {}", o))
        .unwrap_or_default()
}

impl From<StepError> for PipelineError {
    fn from(e: StepError) -> Self {
        match e {
            StepError::Operation(op) => PipelineError::Operation(op),
            StepError::Unexpected(cause) => PipelineError::Unexpected {
                operation: None,
                cause,
            },
        }
    }
}

impl From<FetchError> for PipelineError {
    fn from(e: FetchError) -> Self {
        PipelineError::Unexpected {
            operation: None,
            cause: anyhow::Error::new(e),
        }
    }
}

/// Result type alias for Imager operations.
pub type ImagerResult<T> = Result<T, ImagerError>;

/// Result type alias for pipeline runs.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type alias for a single step.
pub type StepResult<T> = Result<T, StepError>;
