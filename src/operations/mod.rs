//! Operation registry and builtin operations.

pub mod builtin;
pub mod registry;

pub use builtin::Builtin;
pub use registry::{OperationRegistry, RegistryBuilder, RegistryEntry};
