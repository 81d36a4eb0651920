//! Per-invocation isolated execution of field source text.
//!
//! Every resolver call builds a fresh engine and scope holding only the
//! injected bindings, evaluates the attached source on the blocking pool,
//! and reports the outcome exactly once on a completion channel. The launch
//! is fire-and-forget: nothing retains the worker's join handle, and a
//! caller that stops waiting does not stop the script.

mod engine;

use std::sync::Arc;

use rhai::Dynamic;
use rhai::EvalAltResult;
use rhai::serde::from_dynamic;
use tokio::runtime::Handle;
use uuid::Uuid;

use self::engine::Deferred;
use crate::completion;
use crate::completion::CompletionReceiver;
use crate::error::ExecutionError;
use crate::json_ext::Value;
use crate::resolver::ResolverRequest;

/// One request-time run of a field's attached source text.
pub(crate) struct Invocation {
    id: Uuid,
    coordinate: Arc<String>,
    source: Arc<str>,
    request: ResolverRequest,
}

impl Invocation {
    pub(crate) fn new(coordinate: Arc<String>, source: Arc<str>, request: ResolverRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            coordinate,
            source,
            request,
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn coordinate(&self) -> &str {
        &self.coordinate
    }

    /// Launches the script without waiting for it and returns the receiving
    /// end of its completion channel.
    pub(crate) fn launch(self) -> CompletionReceiver {
        let (sender, receiver) = completion::channel();
        let handle = Handle::current();
        tokio::task::spawn_blocking(move || {
            sender.report(self.run(&handle));
        });
        receiver
    }

    /// Builds the one-invocation realm, evaluates the source text in it, and
    /// maps the result. Engine and scope are discarded on return.
    fn run(&self, handle: &Handle) -> Result<Value, ExecutionError> {
        tracing::trace!(
            invocation = %self.id,
            coordinate = %self.coordinate,
            "evaluating attached source",
        );
        let engine = engine::isolated_engine(&self.request.context, handle);
        let mut scope = engine::invocation_scope(&self.request)?;
        match engine.eval_with_scope::<Dynamic>(&mut scope, &self.source) {
            Ok(value) => settle_value(value, handle),
            Err(error) => Err(failure(error)),
        }
    }
}

/// Converts the script's returned value to JSON, first waiting out a
/// pending [`Deferred`] if one was returned.
fn settle_value(value: Dynamic, handle: &Handle) -> Result<Value, ExecutionError> {
    if value.is::<Deferred>() {
        let deferred = value.cast::<Deferred>();
        return deferred.wait(handle);
    }
    from_dynamic(&value).map_err(|error| ExecutionError::UnrepresentableValue {
        message: error.to_string(),
    })
}

/// Maps an evaluation error to the field-level failure. A value thrown by
/// the script surfaces as its display text alone; anything else keeps the
/// engine's message.
fn failure(error: Box<EvalAltResult>) -> ExecutionError {
    if let EvalAltResult::ErrorRuntime(thrown, _) = error.unwrap_inner() {
        return ExecutionError::Thrown {
            message: thrown.to_string(),
        };
    }
    ExecutionError::Eval {
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;
    use crate::Context;
    use crate::json_ext::Object;
    use crate::resolver::ResolveInfo;

    fn invocation(source: &str, args: Object, context: Context) -> Invocation {
        let request = ResolverRequest {
            root_value: Value::Null,
            args,
            context,
            info: ResolveInfo {
                parent_type: "Query".to_string(),
                field_name: "field".to_string(),
                return_type: "String".to_string(),
                path: "field".to_string(),
            },
        };
        Invocation::new(
            Arc::new("Query.field".to_string()),
            source.into(),
            request,
        )
    }

    fn args(value: Value) -> Object {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn evaluates_source_against_its_bindings() {
        let run = invocation("return args.x;", args(json!({"x": "hello"})), Context::new());
        let outcome = run.launch().settle(None).await;
        assert_eq!(outcome, Ok(json!("hello")));
    }

    #[tokio::test]
    async fn thrown_values_surface_their_text_alone() {
        let run = invocation(r#"throw "boom";"#, Object::default(), Context::new());
        let outcome = run.launch().settle(None).await;
        assert_eq!(
            outcome,
            Err(ExecutionError::Thrown {
                message: "boom".to_string()
            })
        );
    }

    #[tokio::test]
    async fn parse_failures_are_eval_errors() {
        let run = invocation("return args.x", Object::default(), Context::new());
        // A missing semicolon is fine; an unclosed block is not.
        let broken = invocation("if args.x {", Object::default(), Context::new());
        assert!(run.launch().settle(None).await.is_ok());
        let outcome = broken.launch().settle(None).await;
        assert!(matches!(outcome, Err(ExecutionError::Eval { .. })));
    }

    #[tokio::test]
    async fn resolve_info_is_visible_under_its_contract_name() {
        let run = invocation(
            "return resolveInfo.fieldName;",
            Object::default(),
            Context::new(),
        );
        let outcome = run.launch().settle(None).await;
        assert_eq!(outcome, Ok(json!("field")));
    }

    #[tokio::test]
    async fn context_entries_are_readable_and_writable() {
        let context = Context::new();
        context.insert("greeting", "hi".to_string()).unwrap();
        let run = invocation(
            r#"context["echoed"] = context["greeting"]; return context["echoed"];"#,
            Object::default(),
            context.clone(),
        );
        let outcome = run.launch().settle(None).await;
        assert_eq!(outcome, Ok(json!("hi")));
        assert_eq!(context.get("echoed").unwrap(), Some("hi".to_string()));
    }

    #[tokio::test]
    async fn missing_args_read_as_unit_and_resolve_to_null() {
        let run = invocation("return args.missing;", Object::default(), Context::new());
        let outcome = run.launch().settle(None).await;
        assert_eq!(outcome, Ok(Value::Null));
    }
}
