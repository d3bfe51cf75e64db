//! Command parser implementation.
//!
//! Turns free command text into an ordered list of invocations plus a tag
//! set. Parsing never fails: unknown words are ignored and malformed
//! invocations are dropped individually, so the worst outcome is an empty
//! result.

use crate::core::operation::OperationMetadata;
use crate::core::types::{Argument, Invocation, TagSet};
use crate::operations::registry::OperationRegistry;
use crate::parser::tokenizer::{tokenize, Token};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Parser settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Prefix marking a token as a tag.
    pub tag_marker: char,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self { tag_marker: '#' }
    }
}

/// An invocation that named a known operation but could not be bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedInvocation {
    /// Canonical operation name
    pub operation: String,
    /// Why binding failed
    pub reason: String,
}

/// Output of one parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedCommand {
    /// Invocations in the order they appeared
    pub invocations: Vec<Invocation>,
    /// Tags, independent of position
    pub tags: TagSet,
    /// Known operations dropped for malformed arguments
    pub dropped: Vec<DroppedInvocation>,
}

impl ParsedCommand {
    /// True when there is nothing to execute.
    pub fn is_empty(&self) -> bool {
        self.invocations.is_empty()
    }
}

/// Parses command text against an operation registry.
///
/// # Grammar
///
/// - Tokens are separated by whitespace, `,`, `;` or `|`.
/// - `#name` anywhere is a tag.
/// - A word naming a registered operation (case-insensitive, aliases
///   included) starts a new group; following words are its arguments.
/// - Words before the first operation, and words beyond an operation's
///   declared arguments, are ignored.
///
/// # Malformed arguments
///
/// Required arguments that are missing, fail to parse as their declared kind
/// or break a constraint cause that one invocation to be dropped. A word that
/// does not parse as an *optional* argument ends binding instead and is
/// treated as ignored text.
#[derive(Clone)]
pub struct CommandParser {
    registry: Arc<OperationRegistry>,
    options: ParserOptions,
}

struct Group<'r, 't> {
    metadata: &'r OperationMetadata,
    words: Vec<&'t str>,
}

impl CommandParser {
    /// Create a parser with default options.
    pub fn new(registry: Arc<OperationRegistry>) -> Self {
        Self {
            registry,
            options: ParserOptions::default(),
        }
    }

    /// Set parser options.
    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    /// The registry names are resolved against.
    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    /// Parse command text.
    pub fn parse(&self, text: &str) -> ParsedCommand {
        let mut tags = TagSet::new();
        let mut groups: Vec<Group<'_, '_>> = Vec::new();

        for token in tokenize(text, self.options.tag_marker) {
            match token {
                Token::Tag(tag) => {
                    tags.insert(tag);
                }
                Token::Word(word) => match self.registry.get_metadata(word) {
                    Some(metadata) => groups.push(Group {
                        metadata,
                        words: Vec::new(),
                    }),
                    None => match groups.last_mut() {
                        Some(group) => group.words.push(word),
                        None => log::trace!("[Parser] Ignoring leading word '{}'", word),
                    },
                },
            }
        }

        let mut parsed = ParsedCommand {
            tags,
            ..ParsedCommand::default()
        };

        for group in groups {
            let name = group.metadata.name.clone();
            match bind_arguments(group.metadata, &group.words) {
                Ok(arguments) => parsed.invocations.push(Invocation::new(name, arguments)),
                Err(reason) => {
                    log::debug!("[Parser] Dropping '{}': {}", name, reason);
                    parsed.dropped.push(DroppedInvocation {
                        operation: name,
                        reason,
                    });
                }
            }
        }

        parsed
    }
}

/// Bind a group's words to the operation's declared arguments.
fn bind_arguments(metadata: &OperationMetadata, words: &[&str]) -> Result<Vec<Argument>, String> {
    let mut arguments = Vec::with_capacity(metadata.arguments.len());
    let mut words = words.iter();

    for definition in &metadata.arguments {
        let Some(word) = words.next() else {
            if definition.optional {
                break;
            }
            return Err(format!("missing argument {}", definition.usage()));
        };

        if definition.optional {
            match definition.parse(word) {
                Some(value) => {
                    definition.check(&value)?;
                    arguments.push(value);
                }
                None => break,
            }
        } else {
            arguments.push(definition.bind(word)?);
        }
    }

    Ok(arguments)
}
