//! The resolver signature of the host framework, and the composition of
//! source extraction, isolated execution, and completion bridging into it.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::Serialize;
use tracing::Instrument;

use crate::Context;
use crate::directive::FieldSource;
use crate::error::ExecutionError;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::sandbox::Invocation;

/// Static facts about the field being resolved, surfaced to attached source
/// text as the `resolveInfo` binding (`resolveInfo.fieldName` and friends).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveInfo {
    /// Name of the type the field is defined on.
    pub parent_type: String,
    /// Name of the field being resolved.
    pub field_name: String,
    /// Rendered GraphQL type of the field.
    pub return_type: String,
    /// Response key the resolved value is merged at.
    pub path: String,
}

/// One resolver call's inputs, matching the host's standard
/// (root value, arguments, context, resolve info) signature.
#[derive(Clone, Debug)]
pub struct ResolverRequest {
    pub root_value: Value,
    pub args: Object,
    pub context: Context,
    pub info: ResolveInfo,
}

/// A field resolver as installed on a schema.
pub type BoxResolver =
    Arc<dyn Fn(ResolverRequest) -> BoxFuture<'static, Result<Value, ExecutionError>> + Send + Sync>;

/// Options applied to every invocation produced by one directive instance.
#[derive(Clone, Debug, Default)]
pub struct CodeOptions {
    /// Upper bound on how long a resolution waits for its script to settle.
    /// Unset means the wait is unbounded and a script that never settles
    /// leaves its field pending forever.
    pub deadline: Option<Duration>,
}

/// Builds the resolver closure for one field's attached source text.
///
/// The closure is built once at schema build time; every call drives a fresh
/// isolated invocation of the source and waits on its completion channel.
pub fn resolver_from_source(field_source: FieldSource, options: CodeOptions) -> BoxResolver {
    let source = field_source.source_text.clone();
    let coordinate = Arc::new(field_source.coordinate.to_string());
    Arc::new(move |request: ResolverRequest| {
        let invocation = Invocation::new(coordinate.clone(), source.clone(), request);
        let deadline = options.deadline;
        let span = tracing::debug_span!(
            "code_resolver",
            coordinate = %invocation.coordinate(),
            invocation = %invocation.id(),
        );
        Box::pin(
            async move { invocation.launch().settle(deadline).await }.instrument(span),
        )
    })
}
