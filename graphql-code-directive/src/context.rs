//! Provide a [`Context`] for field resolution.
//!
//! Resolvers accept a [`Context`] when invoked and this contains a DashMap
//! which allows additional data to be passed back and forth along the
//! resolution of one request. The context also carries the host functions a
//! deployment exposes to attached source text; inside a script they appear
//! as methods on the `context` binding.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde::Serialize;

use crate::json_ext::Value;

/// Generic error passed back by fallible context operations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Holds [`Context`] entries.
pub(crate) type Entries = Arc<DashMap<String, Value>>;

/// A host function callable from attached source text.
///
/// Arguments arrive as the JSON values the script passed; the returned
/// future produces the value handed back to the script.
pub type HostFunction =
    Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync>;

/// How a registered host function behaves when a script calls it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CallMode {
    /// The script call suspends until the host future resolves.
    Blocking,
    /// The script call immediately yields a pending value handle; the host
    /// future runs on the async runtime in the meantime.
    Deferred,
}

#[derive(Clone)]
pub(crate) struct HostBinding {
    pub(crate) function: HostFunction,
    pub(crate) mode: CallMode,
}

/// Context for one request.
///
/// Cloning is cheap: clones share the same entries and host functions.
#[derive(Clone, Default)]
pub struct Context {
    entries: Entries,
    functions: Arc<DashMap<String, HostBinding>>,
}

impl Context {
    pub fn new() -> Self {
        Default::default()
    }

    /// Get a value from the context using the provided key.
    ///
    /// Semantics:
    ///  - If the operation fails, then the key is not removed.
    ///  - If the operation succeeds, the value is returned.
    pub fn get<K, V>(&self, key: K) -> Result<Option<V>, BoxError>
    where
        K: Into<String>,
        V: for<'de> serde::Deserialize<'de>,
    {
        self.entries
            .get(&key.into())
            .map(|v| serde_json_bytes::from_value(v.value().clone()))
            .transpose()
            .map_err(|e| e.into())
    }

    /// Insert a value into the context using the provided key and value.
    ///
    /// Semantics:
    ///  - If the operation fails, then the pair has not been inserted.
    ///  - If the operation succeeds, the pair has been inserted.
    pub fn insert<K, V>(&self, key: K, value: V) -> Result<Option<V>, BoxError>
    where
        K: Into<String>,
        V: for<'de> serde::Deserialize<'de> + Serialize,
    {
        match serde_json_bytes::to_value(value) {
            Ok(value) => self
                .entries
                .insert(key.into(), value)
                .map(serde_json_bytes::from_value)
                .transpose()
                .map_err(|e| e.into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Upsert a value into the context using the provided key and resolving
    /// function.
    ///
    /// The resolving function must yield a value to be used in the context.
    /// It is provided with the current value to use in evaluating how to
    /// resolve.
    pub fn upsert<K, V>(
        &self,
        key: K,
        upsert: impl Fn(V) -> V,
        default: impl Fn() -> V,
    ) -> Result<(), BoxError>
    where
        K: Into<String>,
        V: for<'de> serde::Deserialize<'de> + Serialize,
    {
        let key = key.into();
        self.entries
            .entry(key.clone())
            .or_try_insert_with(|| serde_json_bytes::to_value((default)()))?;
        let mut result = Ok(());
        self.entries
            .alter(&key, |_, v| match serde_json_bytes::from_value(v.clone()) {
                Ok(value) => match serde_json_bytes::to_value((upsert)(value)) {
                    Ok(value) => value,
                    Err(e) => {
                        result = Err(e);
                        v
                    }
                },
                Err(e) => {
                    result = Err(e);
                    v
                }
            });
        result.map_err(|e| e.into())
    }

    /// Expose `function` to attached source text as `context.<name>(...)`.
    ///
    /// The script call suspends until the host future resolves, then yields
    /// its value; a failed future surfaces as a thrown error inside the
    /// script.
    pub fn register_function<F>(&self, name: impl Into<String>, function: F)
    where
        F: Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync + 'static,
    {
        self.functions.insert(
            name.into(),
            HostBinding {
                function: Arc::new(function),
                mode: CallMode::Blocking,
            },
        );
    }

    /// Like [`register_function`](Context::register_function), but a script
    /// call yields a pending value handle at once while the host future runs
    /// on the async runtime. Returning the handle from the script completes
    /// the field with whatever the future settles to.
    pub fn register_deferred_function<F>(&self, name: impl Into<String>, function: F)
    where
        F: Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync + 'static,
    {
        self.functions.insert(
            name.into(),
            HostBinding {
                function: Arc::new(function),
                mode: CallMode::Deferred,
            },
        );
    }

    /// Snapshot of the registered host functions, taken when an invocation
    /// realm is built.
    pub(crate) fn host_bindings(&self) -> Vec<(String, HostBinding)> {
        self.functions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}
