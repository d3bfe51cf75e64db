//! Positional argument definitions and constraints.
//!
//! Each operation declares the arguments it accepts, in order. The parser
//! binds command tokens against these definitions and drops any invocation
//! whose tokens do not satisfy them.

use crate::core::types::{Argument, ArgumentKind};
use serde::{Deserialize, Serialize};

/// Definition of one positional argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgumentDefinition {
    /// Name used in help text
    pub name: String,
    /// Expected kind of the token
    pub kind: ArgumentKind,
    /// Whether the argument may be omitted
    pub optional: bool,
    /// Description for documentation
    pub description: String,
    /// Constraints the parsed value must satisfy
    pub constraints: Vec<Constraint>,
}

/// Constraints that can be applied to an argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum Constraint {
    /// Numeric value must be within range [min, max]
    Range { min: f64, max: f64 },
    /// Numeric value must be >= min
    MinValue(f64),
    /// Numeric value must be > 0
    Positive,
    /// Numeric value must be >= 0
    NonNegative,
    /// Text must be one of the listed options (case-insensitive)
    OneOf(Vec<String>),
    /// Text must not be empty
    NotEmpty,
}

impl ArgumentDefinition {
    /// Create a required argument.
    pub fn new(name: impl Into<String>, kind: ArgumentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: false,
            description: String::new(),
            constraints: Vec::new(),
        }
    }

    /// Shorthand for a required integer argument.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ArgumentKind::Integer)
    }

    /// Shorthand for a required float argument.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ArgumentKind::Float)
    }

    /// Shorthand for a required text argument.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ArgumentKind::Text)
    }

    /// Mark the argument as optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a constraint.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Add a range constraint.
    pub fn with_range(self, min: f64, max: f64) -> Self {
        self.with_constraint(Constraint::Range { min, max })
    }

    /// Parse a token as this argument's kind, without checking constraints.
    pub fn parse(&self, token: &str) -> Option<Argument> {
        self.kind.parse_token(token)
    }

    /// Check a parsed value against every constraint.
    pub fn check(&self, value: &Argument) -> Result<(), String> {
        for constraint in &self.constraints {
            constraint
                .check(value)
                .map_err(|e| format!("{} {}", self.name, e))?;
        }
        Ok(())
    }

    /// Parse a token as this argument and check its constraints.
    pub fn bind(&self, token: &str) -> Result<Argument, String> {
        let value = self
            .parse(token)
            .ok_or_else(|| format!("'{}' is not a valid {} for {}", token, self.kind, self.name))?;
        self.check(&value)?;
        Ok(value)
    }

    /// Render as `<name>` or `[name]` for help text.
    pub fn usage(&self) -> String {
        if self.optional {
            format!("[{}]", self.name)
        } else {
            format!("<{}>", self.name)
        }
    }
}

impl Constraint {
    /// Check an argument against this constraint.
    pub fn check(&self, value: &Argument) -> Result<(), String> {
        match self {
            Constraint::Range { min, max } => match value.numeric() {
                Some(v) if v < *min || v > *max => {
                    Err(format!("must be between {} and {}", min, max))
                }
                _ => Ok(()),
            },
            Constraint::MinValue(min) => match value.numeric() {
                Some(v) if v < *min => Err(format!("must be at least {}", min)),
                _ => Ok(()),
            },
            Constraint::Positive => match value.numeric() {
                Some(v) if v <= 0.0 => Err("must be positive".to_string()),
                _ => Ok(()),
            },
            Constraint::NonNegative => match value.numeric() {
                Some(v) if v < 0.0 => Err("must not be negative".to_string()),
                _ => Ok(()),
            },
            Constraint::OneOf(options) => match value.as_text() {
                Some(s) if !options.iter().any(|o| o.eq_ignore_ascii_case(s)) => {
                    Err(format!("must be one of: {}", options.join(", ")))
                }
                _ => Ok(()),
            },
            Constraint::NotEmpty => match value.as_text() {
                Some(s) if s.is_empty() => Err("must not be empty".to_string()),
                _ => Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_checks_kind_and_range() {
        let def = ArgumentDefinition::integer("width").with_range(1.0, 100.0);
        assert_eq!(def.bind("50"), Ok(Argument::Integer(50)));
        assert!(def.bind("0").is_err());
        assert!(def.bind("fifty").is_err());
    }

    #[test]
    fn test_one_of_is_case_insensitive() {
        let def = ArgumentDefinition::text("format")
            .with_constraint(Constraint::OneOf(vec!["png".to_string(), "jpeg".to_string()]));
        assert!(def.bind("PNG").is_ok());
        let err = def.bind("bmp").unwrap_err();
        assert!(err.contains("png, jpeg"));
    }

    #[test]
    fn test_usage() {
        assert_eq!(ArgumentDefinition::integer("x").usage(), "<x>");
        assert_eq!(ArgumentDefinition::float("sigma").optional().usage(), "[sigma]");
    }
}
