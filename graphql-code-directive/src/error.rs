//! Errors raised while wiring code resolvers into a schema and while
//! running a field's attached source text.

use std::fmt;
use std::time::Duration;

use apollo_compiler::validation::DiagnosticList;
use displaydoc::Display;
use serde_json_bytes::Value;
use thiserror::Error;

use crate::graphql;
use crate::json_ext::Object;

/// Build-time failures: a schema or field that triggers one of these is not
/// usable until the schema document is fixed.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// field '{coordinate}' has no '@{directive}' directive
    DirectiveNotFound {
        /// The field that was expected to carry the directive.
        coordinate: String,
        /// The directive name that was looked for.
        directive: String,
    },

    /// '@{directive}' on field '{coordinate}' is missing its 'source' argument
    MissingSource {
        coordinate: String,
        directive: String,
    },

    /// the 'source' argument of '@{directive}' on field '{coordinate}' must be a string
    InvalidSource {
        coordinate: String,
        directive: String,
    },

    /// GraphQL parser error: {0}
    Parse(ParseErrors),

    /// GraphQL validation error: {0}
    Validate(ValidationErrors),
}

/// Collection of schema parsing errors.
#[derive(Debug)]
pub struct ParseErrors {
    pub(crate) errors: DiagnosticList,
}

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut errors = self.errors.iter();
        for (i, error) in errors.by_ref().take(5).enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{error}")?;
        }
        let remaining = errors.count();
        if remaining > 0 {
            write!(f, "\n...and {remaining} other errors")?;
        }
        Ok(())
    }
}

/// Collection of schema validation errors.
#[derive(Debug)]
pub struct ValidationErrors {
    pub(crate) errors: DiagnosticList,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

/// Request-time failures, always local to the field being resolved: sibling
/// fields in the same resolution set continue normally.
///
/// Only the message text of a script failure crosses the isolation boundary;
/// script stack traces and error classes never do.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExecutionError {
    /// {message}
    Thrown {
        /// The display text of the value the script threw.
        message: String,
    },

    /// script evaluation failed: {message}
    Eval { message: String },

    /// script returned a value with no JSON representation: {message}
    UnrepresentableValue { message: String },

    /// script did not settle within the configured deadline of {deadline:?}
    DeadlineExceeded { deadline: Duration },

    /// script execution was interrupted before reporting an outcome
    Interrupted,

    /// no such field: {coordinate}
    UnknownField { coordinate: String },
}

impl ExecutionError {
    /// A machine-readable code for the `extensions` map of a GraphQL error.
    pub fn extension_code(&self) -> &'static str {
        match self {
            Self::Thrown { .. } => "SCRIPT_THROWN",
            Self::Eval { .. } => "SCRIPT_EVAL_FAILED",
            Self::UnrepresentableValue { .. } => "SCRIPT_UNREPRESENTABLE_VALUE",
            Self::DeadlineExceeded { .. } => "SCRIPT_DEADLINE_EXCEEDED",
            Self::Interrupted => "SCRIPT_INTERRUPTED",
            Self::UnknownField { .. } => "UNKNOWN_FIELD",
        }
    }

    /// Convert the execution error to a GraphQL error.
    pub fn to_graphql_error(&self, path: Option<String>) -> graphql::Error {
        let mut extensions = Object::default();
        extensions.insert("code", Value::String(self.extension_code().into()));
        graphql::Error {
            message: self.to_string(),
            path,
            extensions,
        }
    }
}
