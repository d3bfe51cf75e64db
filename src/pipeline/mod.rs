//! Sequential execution of parsed invocation chains.

pub mod executor;
pub mod progress;

pub use executor::{ExecutionOptions, ExecutionStats, PipelineExecutor, PipelineOutput};
pub use progress::{ProgressCallback, ProgressTracker, ProgressUpdate};
