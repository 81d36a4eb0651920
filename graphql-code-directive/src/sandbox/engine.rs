//! Construction of the one-invocation realm: an engine holding exactly the
//! registered host surface, and a scope holding exactly the four contract
//! bindings (`rootValue`, `args`, `context`, `resolveInfo`).

use std::sync::Arc;
use std::sync::Mutex;

use futures::future::BoxFuture;
use rhai::Dynamic;
use rhai::Engine;
use rhai::EvalAltResult;
use rhai::Scope;
use rhai::plugin::*;
use rhai::serde::from_dynamic;
use rhai::serde::to_dynamic;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::context::BoxError;
use crate::context::CallMode;
use crate::context::Context;
use crate::context::HostBinding;
use crate::error::ExecutionError;
use crate::json_ext::Value;
use crate::resolver::ResolverRequest;

/// A pending value: the realm-visible handle to a host future that has been
/// scheduled but has not settled. Returning one from a script completes the
/// field with whatever the future settles to.
#[derive(Clone)]
pub(crate) struct Deferred {
    outcome: Arc<Mutex<Option<oneshot::Receiver<Result<Value, BoxError>>>>>,
}

impl Deferred {
    /// Schedules `future` on the runtime and hands back the pending handle.
    pub(super) fn spawn(handle: &Handle, future: BoxFuture<'static, Result<Value, BoxError>>) -> Self {
        let (sender, receiver) = oneshot::channel();
        handle.spawn(async move {
            // A settled value nobody waits for is dropped silently.
            let _ = sender.send(future.await);
        });
        Self {
            outcome: Arc::new(Mutex::new(Some(receiver))),
        }
    }

    /// Waits the pending value out. Consumes the pending state: waiting a
    /// second time reports an interrupted execution.
    pub(super) fn wait(&self, handle: &Handle) -> Result<Value, ExecutionError> {
        let receiver = self.outcome.lock().expect("poisoned mutex").take();
        match receiver {
            None => Err(ExecutionError::Interrupted),
            Some(receiver) => match handle.block_on(receiver) {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(error)) => Err(ExecutionError::Thrown {
                    message: error.to_string(),
                }),
                Err(_) => Err(ExecutionError::Interrupted),
            },
        }
    }
}

// We have to keep the modules that we export using `export_module` inline
// because error[E0658]: non-inline modules in proc macro input are unstable
#[export_module]
mod script_context {
    pub(crate) type Context = crate::Context;

    // Register a contains function for Context so that "in" works
    #[rhai_fn(name = "contains", pure)]
    pub(crate) fn context_contains(x: &mut Context, key: &str) -> bool {
        x.get(key).map_or(false, |v: Option<Dynamic>| v.is_some())
    }

    // Register a Context indexer so we can get/set context
    #[rhai_fn(index_get, pure, return_raw)]
    pub(crate) fn context_get(x: &mut Context, key: &str) -> Result<Dynamic, Box<EvalAltResult>> {
        x.get(key)
            .map(|v: Option<Dynamic>| v.unwrap_or(Dynamic::UNIT))
            .map_err(|e: BoxError| e.to_string().into())
    }

    #[rhai_fn(index_set, return_raw)]
    pub(crate) fn context_set(
        x: &mut Context,
        key: &str,
        value: Dynamic,
    ) -> Result<(), Box<EvalAltResult>> {
        x.insert(key, value)
            .map(|_v: Option<Dynamic>| ())
            .map_err(|e: BoxError| e.to_string().into())
    }
}

/// Builds the engine for one invocation.
///
/// Everything a script can reach beyond its scope bindings is registered
/// here; the engine lives for exactly one evaluation and is never shared.
pub(super) fn isolated_engine(context: &Context, handle: &Handle) -> Engine {
    let mut engine = Engine::new();

    let module = exported_module!(script_context);

    engine
        .set_max_expr_depths(0, 0)
        .on_print(|message| {
            tracing::info!(%message, "script print");
        })
        .register_global_module(module.into())
        .register_type_with_name::<Context>("Context")
        .register_type_with_name::<Deferred>("Deferred")
        .register_fn("log_trace", |message: Dynamic| {
            tracing::trace!(%message, "script log");
        })
        .register_fn("log_debug", |message: Dynamic| {
            tracing::debug!(%message, "script log");
        })
        .register_fn("log_info", |message: Dynamic| {
            tracing::info!(%message, "script log");
        })
        .register_fn("log_warn", |message: Dynamic| {
            tracing::warn!(%message, "script log");
        })
        .register_fn("log_error", |message: Dynamic| {
            tracing::error!(%message, "script log");
        });

    register_host_functions(&mut engine, context, handle);

    engine
}

/// Assembles the binding set for one invocation: exactly `rootValue`,
/// `args`, `context`, and `resolveInfo`, never anything from enclosing
/// program state.
pub(super) fn invocation_scope(request: &ResolverRequest) -> Result<Scope<'static>, ExecutionError> {
    let mut scope = Scope::new();
    scope.push_dynamic("rootValue", to_dynamic(&request.root_value).map_err(scope_error)?);
    scope.push_dynamic("args", to_dynamic(&request.args).map_err(scope_error)?);
    scope.push("context", request.context.clone());
    scope.push_dynamic("resolveInfo", to_dynamic(&request.info).map_err(scope_error)?);
    Ok(scope)
}

fn scope_error(error: Box<EvalAltResult>) -> ExecutionError {
    ExecutionError::Eval {
        message: error.to_string(),
    }
}

/// Surfaces the context's registered host functions as methods on the
/// `context` binding, callable with up to four arguments.
fn register_host_functions(engine: &mut Engine, context: &Context, handle: &Handle) {
    for (name, binding) in context.host_bindings() {
        {
            let binding = binding.clone();
            let handle = handle.clone();
            engine.register_fn(
                name.as_str(),
                move |_context: &mut Context| -> Result<Dynamic, Box<EvalAltResult>> {
                    call_host(&binding, &handle, Vec::new())
                },
            );
        }
        {
            let binding = binding.clone();
            let handle = handle.clone();
            engine.register_fn(
                name.as_str(),
                move |_context: &mut Context,
                      a: Dynamic|
                      -> Result<Dynamic, Box<EvalAltResult>> {
                    call_host(&binding, &handle, vec![a])
                },
            );
        }
        {
            let binding = binding.clone();
            let handle = handle.clone();
            engine.register_fn(
                name.as_str(),
                move |_context: &mut Context,
                      a: Dynamic,
                      b: Dynamic|
                      -> Result<Dynamic, Box<EvalAltResult>> {
                    call_host(&binding, &handle, vec![a, b])
                },
            );
        }
        {
            let binding = binding.clone();
            let handle = handle.clone();
            engine.register_fn(
                name.as_str(),
                move |_context: &mut Context,
                      a: Dynamic,
                      b: Dynamic,
                      c: Dynamic|
                      -> Result<Dynamic, Box<EvalAltResult>> {
                    call_host(&binding, &handle, vec![a, b, c])
                },
            );
        }
        {
            let binding = binding.clone();
            let handle = handle.clone();
            engine.register_fn(
                name.as_str(),
                move |_context: &mut Context,
                      a: Dynamic,
                      b: Dynamic,
                      c: Dynamic,
                      d: Dynamic|
                      -> Result<Dynamic, Box<EvalAltResult>> {
                    call_host(&binding, &handle, vec![a, b, c, d])
                },
            );
        }
    }
}

/// Dispatches one script call to its host function. Blocking mode suspends
/// the script worker until the future resolves; deferred mode yields a
/// pending [`Deferred`] at once.
fn call_host(
    binding: &HostBinding,
    handle: &Handle,
    args: Vec<Dynamic>,
) -> Result<Dynamic, Box<EvalAltResult>> {
    let mut values = Vec::with_capacity(args.len());
    for arg in &args {
        let value: Value = from_dynamic(arg)?;
        values.push(value);
    }
    let future = (binding.function)(values);
    match binding.mode {
        CallMode::Deferred => Ok(Dynamic::from(Deferred::spawn(handle, future))),
        CallMode::Blocking => {
            let value = handle.block_on(future).map_err(|e| e.to_string())?;
            to_dynamic(value)
        }
    }
}
