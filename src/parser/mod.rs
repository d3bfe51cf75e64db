//! Command text parsing.
//!
//! Command text is tokenized into words and tags, then words are grouped
//! behind the operation names known to an [`OperationRegistry`](crate::operations::OperationRegistry).

pub mod command;
pub mod tokenizer;

pub use command::{CommandParser, DroppedInvocation, ParsedCommand, ParserOptions};
pub use tokenizer::{tokenize, Token, GROUP_DELIMITERS};
