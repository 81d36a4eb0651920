//! GraphQL schema paired with the resolvers installed on its fields.

use std::collections::HashMap;
use std::sync::Arc;

use apollo_compiler::ast;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::validation::Valid;
use futures::future::join_all;

use crate::Context;
use crate::directive::FieldCoordinate;
use crate::error::ConfigurationError;
use crate::error::ExecutionError;
use crate::error::ParseErrors;
use crate::error::ValidationErrors;
use crate::graphql;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::resolver::BoxResolver;
use crate::resolver::ResolveInfo;
use crate::resolver::ResolverRequest;

/// A parsed, validated schema and the resolvers installed on its fields.
///
/// Freshly parsed schemas carry no resolvers; installation happens through
/// [`CodeDirectiveVisitor`](crate::CodeDirectiveVisitor) or
/// [`CodeDirective::transform`](crate::CodeDirective::transform), or
/// directly through [`set_resolver`](Schema::set_resolver).
pub struct Schema {
    raw_sdl: Arc<String>,
    definitions: Valid<apollo_compiler::Schema>,
    resolvers: HashMap<FieldCoordinate, BoxResolver>,
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("raw_sdl", &self.raw_sdl)
            .field("resolvers", &self.resolvers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Schema {
    /// Parses and validates a schema document.
    pub fn parse(raw_sdl: impl Into<String>) -> Result<Self, ConfigurationError> {
        let raw_sdl = raw_sdl.into();
        let mut parser = apollo_compiler::parser::Parser::new();
        let document = parser
            .parse_ast(&raw_sdl, "schema.graphql")
            .map_err(|invalid| {
                ConfigurationError::Parse(ParseErrors {
                    errors: invalid.errors,
                })
            })?;
        let definitions = document.to_schema_validate().map_err(|invalid| {
            ConfigurationError::Validate(ValidationErrors {
                errors: invalid.errors,
            })
        })?;
        Ok(Self {
            raw_sdl: Arc::new(raw_sdl),
            definitions,
            resolvers: HashMap::new(),
        })
    }

    pub fn raw_sdl(&self) -> &str {
        &self.raw_sdl
    }

    /// The validated type system underlying this schema.
    pub fn definitions(&self) -> &Valid<apollo_compiler::Schema> {
        &self.definitions
    }

    /// Every field definition on every object type, with its coordinate.
    pub(crate) fn object_fields(
        &self,
    ) -> impl Iterator<Item = (FieldCoordinate, &ast::FieldDefinition)> {
        self.definitions
            .types
            .iter()
            .filter_map(|(type_name, def)| match def {
                ExtendedType::Object(object) => Some((type_name, object)),
                _ => None,
            })
            .flat_map(|(type_name, object)| {
                object.fields.iter().map(move |(field_name, field)| {
                    (
                        FieldCoordinate::new(type_name.as_str(), field_name.as_str()),
                        &***field,
                    )
                })
            })
    }

    /// Installs `resolver` for `coordinate`, replacing any previous one.
    pub fn set_resolver(&mut self, coordinate: FieldCoordinate, resolver: BoxResolver) {
        self.resolvers.insert(coordinate, resolver);
    }

    /// Whether a resolver is installed for `coordinate`.
    pub fn has_resolver(&self, coordinate: &FieldCoordinate) -> bool {
        self.resolvers.contains_key(coordinate)
    }

    /// Resolves a single field.
    ///
    /// Fields without an installed resolver fall back to looking the field
    /// up on the root value, the host convention for plain fields.
    pub async fn resolve_field(
        &self,
        coordinate: &FieldCoordinate,
        root_value: Value,
        args: Object,
        context: Context,
    ) -> Result<Value, ExecutionError> {
        let path = coordinate.field_name.clone();
        self.resolve_with_path(coordinate, root_value, args, context, path)
            .await
    }

    async fn resolve_with_path(
        &self,
        coordinate: &FieldCoordinate,
        root_value: Value,
        args: Object,
        context: Context,
        path: String,
    ) -> Result<Value, ExecutionError> {
        let field = self
            .field_definition(coordinate)
            .ok_or_else(|| ExecutionError::UnknownField {
                coordinate: coordinate.to_string(),
            })?;
        match self.resolvers.get(coordinate) {
            Some(resolver) => {
                let info = ResolveInfo {
                    parent_type: coordinate.type_name.clone(),
                    field_name: coordinate.field_name.clone(),
                    return_type: field.ty.to_string(),
                    path,
                };
                resolver(ResolverRequest {
                    root_value,
                    args,
                    context,
                    info,
                })
                .await
            }
            None => Ok(default_resolve(&root_value, &coordinate.field_name)),
        }
    }

    /// Resolves a set of sibling fields concurrently.
    ///
    /// Failures are localized GraphQL-style: a failed field contributes
    /// `null` under its response key plus an error entry, and never aborts
    /// its siblings.
    pub async fn resolve_set(
        &self,
        type_name: &str,
        root_value: Value,
        context: Context,
        selections: Vec<FieldSelection>,
    ) -> graphql::Response {
        let outcomes = join_all(selections.into_iter().map(|selection| {
            let root_value = root_value.clone();
            let context = context.clone();
            async move {
                let key = selection.response_key().to_string();
                let coordinate = FieldCoordinate::new(type_name, selection.field.as_str());
                let outcome = self
                    .resolve_with_path(&coordinate, root_value, selection.args, context, key.clone())
                    .await;
                (key, outcome)
            }
        }))
        .await;

        let mut response = graphql::Response::default();
        for (key, outcome) in outcomes {
            match outcome {
                Ok(value) => {
                    response.data.insert(key, value);
                }
                Err(error) => {
                    response
                        .errors
                        .push(error.to_graphql_error(Some(key.clone())));
                    response.data.insert(key, Value::Null);
                }
            }
        }
        response
    }

    fn field_definition(&self, coordinate: &FieldCoordinate) -> Option<&ast::FieldDefinition> {
        let object = self.definitions.get_object(coordinate.type_name.as_str())?;
        object
            .fields
            .get(coordinate.field_name.as_str())
            .map(|field| &***field)
    }
}

/// The host convention for fields with no installed resolver: look the
/// field up on the root value.
fn default_resolve(root_value: &Value, field_name: &str) -> Value {
    match root_value {
        Value::Object(object) => object.get(field_name).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// One requested field in a resolution set.
#[derive(Clone, Debug, Default)]
pub struct FieldSelection {
    pub field: String,
    pub alias: Option<String>,
    pub args: Object,
}

impl FieldSelection {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            alias: None,
            args: Object::default(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_args(mut self, args: Object) -> Self {
        self.args = args;
        self
    }

    /// The key the resolved value is merged at.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.field)
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn syntax_errors_are_parse_errors() {
        let error = Schema::parse("type Query {").unwrap_err();
        assert!(matches!(error, ConfigurationError::Parse(_)));
        assert!(!error.to_string().is_empty());
    }

    #[test]
    fn unknown_types_are_validation_errors() {
        let error = Schema::parse("type Query { x: Missing }").unwrap_err();
        assert!(matches!(error, ConfigurationError::Validate(_)));
    }

    #[tokio::test]
    async fn unknown_fields_fail_resolution() {
        let schema = Schema::parse("type Query { x: Int }").unwrap();
        let error = schema
            .resolve_field(
                &FieldCoordinate::new("Query", "missing"),
                Value::Null,
                Object::default(),
                Context::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "no such field: Query.missing");
    }

    #[tokio::test]
    async fn plain_fields_resolve_from_the_root_value() {
        let schema = Schema::parse("type Query { x: Int }").unwrap();
        let value = schema
            .resolve_field(
                &FieldCoordinate::new("Query", "x"),
                json!({"x": 7}),
                Object::default(),
                Context::new(),
            )
            .await
            .unwrap();
        assert_eq!(value, json!(7));
        let absent = schema
            .resolve_field(
                &FieldCoordinate::new("Query", "x"),
                Value::Null,
                Object::default(),
                Context::new(),
            )
            .await
            .unwrap();
        assert_eq!(absent, Value::Null);
    }
}
