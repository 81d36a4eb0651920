//! Installing code resolvers onto a schema: an eager visitor pass and a
//! renameable, configurable schema transform.

use std::time::Duration;

use schemars::JsonSchema;
use serde::Deserialize;

use crate::directive;
use crate::directive::DEFAULT_DIRECTIVE_NAME;
use crate::directive::FieldSource;
use crate::error::ConfigurationError;
use crate::resolver::CodeOptions;
use crate::resolver::resolver_from_source;
use crate::schema::Schema;

/// Walks every object field once and installs a code resolver wherever the
/// directive is present. The schema is modified in place.
pub struct CodeDirectiveVisitor {
    directive_name: String,
    options: CodeOptions,
}

impl CodeDirectiveVisitor {
    pub fn new() -> Self {
        Self::with_name(DEFAULT_DIRECTIVE_NAME)
    }

    pub fn with_name(directive_name: impl Into<String>) -> Self {
        Self {
            directive_name: directive_name.into(),
            options: CodeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns how many resolvers were installed.
    pub fn visit(&self, schema: &mut Schema) -> Result<usize, ConfigurationError> {
        let mut sources = Vec::new();
        for (coordinate, field) in schema.object_fields() {
            if let Some(field_source) = FieldSource::find(&coordinate, field, &self.directive_name)?
            {
                sources.push(field_source);
            }
        }
        let installed = sources.len();
        for field_source in sources {
            tracing::debug!(
                coordinate = %field_source.coordinate,
                directive = %self.directive_name,
                "installing code resolver",
            );
            let coordinate = field_source.coordinate.clone();
            schema.set_resolver(
                coordinate,
                resolver_from_source(field_source, self.options.clone()),
            );
        }
        Ok(installed)
    }
}

impl Default for CodeDirectiveVisitor {
    fn default() -> Self {
        Self::new()
    }
}

/// A renameable code directive: its declaration string and a transform
/// installing resolvers for fields annotated with that name.
///
/// Instances with distinct names operate independently: a transform only
/// touches fields annotated with its own name, so several differently named
/// directives can coexist in one schema.
#[derive(Clone, Debug)]
pub struct CodeDirective {
    directive_name: String,
    options: CodeOptions,
}

#[buildstructor::buildstructor]
impl CodeDirective {
    /// `CodeDirective::builder().directive_name("ABC").deadline(..).build()`
    #[builder]
    pub fn new(directive_name: Option<String>, deadline: Option<Duration>) -> CodeDirective {
        CodeDirective {
            directive_name: directive_name
                .unwrap_or_else(|| DEFAULT_DIRECTIVE_NAME.to_string()),
            options: CodeOptions { deadline },
        }
    }
}

impl CodeDirective {
    pub fn directive_name(&self) -> &str {
        &self.directive_name
    }

    /// The declaration to include alongside schema documents using this
    /// directive.
    pub fn type_defs(&self) -> String {
        directive::type_defs(&self.directive_name)
    }

    /// Installs resolvers for every field annotated with this directive's
    /// name and returns the schema.
    pub fn transform(&self, mut schema: Schema) -> Result<Schema, ConfigurationError> {
        CodeDirectiveVisitor::with_name(self.directive_name.as_str())
            .with_options(self.options.clone())
            .visit(&mut schema)?;
        Ok(schema)
    }
}

impl Default for CodeDirective {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Deserializable configuration for one directive instance.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Conf {
    /// The directive name reacted to. Defaults to `code`.
    pub directive_name: Option<String>,

    /// Upper bound on how long a resolution waits for its script to settle,
    /// in human-readable form (`"30s"`, `"500ms"`). Unset means the wait is
    /// unbounded.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "Option<String>")]
    pub deadline: Option<Duration>,
}

impl From<Conf> for CodeDirective {
    fn from(conf: Conf) -> Self {
        CodeDirective::new(conf.directive_name, conf.deadline)
    }
}
