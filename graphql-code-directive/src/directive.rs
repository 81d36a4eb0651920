//! Locating the code directive on a field definition and extracting the
//! source text attached to it.
//!
//! Extraction is pure and happens once, at schema build time; the extracted
//! [`FieldSource`] lives for the lifetime of the schema.

use std::fmt;
use std::sync::Arc;

use apollo_compiler::ast;

use crate::error::ConfigurationError;

/// The directive name reacted to when none is configured.
pub const DEFAULT_DIRECTIVE_NAME: &str = "code";

/// The name of the directive argument carrying the source text.
const SOURCE_ARGUMENT: &str = "source";

/// Renders the declaration of the code directive under the given name, for
/// inclusion alongside schema documents that use it.
pub fn type_defs(directive_name: &str) -> String {
    format!("directive @{directive_name}(source: String!) on FIELD_DEFINITION")
}

/// Identifies one field definition in a schema, displayed as `Type.field`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldCoordinate {
    pub type_name: String,
    pub field_name: String,
}

impl FieldCoordinate {
    pub fn new(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            field_name: field_name.into(),
        }
    }
}

impl fmt::Display for FieldCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.field_name)
    }
}

/// Source text attached to a single field definition.
///
/// Immutable after extraction.
#[derive(Clone, Debug)]
pub struct FieldSource {
    pub coordinate: FieldCoordinate,
    pub source_text: Arc<str>,
}

impl FieldSource {
    /// Extracts the source attached to `field`, failing if the directive is
    /// absent.
    pub fn extract(
        coordinate: &FieldCoordinate,
        field: &ast::FieldDefinition,
        directive_name: &str,
    ) -> Result<Self, ConfigurationError> {
        Self::find(coordinate, field, directive_name)?.ok_or_else(|| {
            ConfigurationError::DirectiveNotFound {
                coordinate: coordinate.to_string(),
                directive: directive_name.to_string(),
            }
        })
    }

    /// Looks for the directive on `field` and extracts its source when
    /// present. A present directive with a missing or non-string `source`
    /// argument is an error; an absent directive is not.
    pub fn find(
        coordinate: &FieldCoordinate,
        field: &ast::FieldDefinition,
        directive_name: &str,
    ) -> Result<Option<Self>, ConfigurationError> {
        let Some(directive) = field.directives.get(directive_name) else {
            return Ok(None);
        };
        let argument = directive
            .specified_argument_by_name(SOURCE_ARGUMENT)
            .ok_or_else(|| ConfigurationError::MissingSource {
                coordinate: coordinate.to_string(),
                directive: directive_name.to_string(),
            })?;
        let source_text = argument
            .as_str()
            .ok_or_else(|| ConfigurationError::InvalidSource {
                coordinate: coordinate.to_string(),
                directive: directive_name.to_string(),
            })?;
        Ok(Some(FieldSource {
            coordinate: coordinate.clone(),
            source_text: source_text.into(),
        }))
    }
}
