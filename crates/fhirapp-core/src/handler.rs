//! Named async handlers for operations and subscriptions.

use std::{fmt, future::Future, sync::Arc};

use futures::future::BoxFuture;
use serde_json::Value as JsonValue;

/// Boxed future returned by a handler invocation.
pub type HandlerFuture = BoxFuture<'static, anyhow::Result<JsonValue>>;

type HandlerFn = dyn Fn(JsonValue) -> HandlerFuture + Send + Sync;

/// An async callable together with the module and function it was defined in.
///
/// The module and name feed operation identifiers (operations) and handler
/// paths (subscriptions), so they must be stable across releases. Cloning is
/// cheap; clones compare equal under [`Handler::same_as`].
#[derive(Clone)]
pub struct Handler {
    module: String,
    name: String,
    func: Arc<HandlerFn>,
}

impl Handler {
    /// Wraps an async function.
    ///
    /// Rust module paths (`crate::api`) are rendered with dots (`crate.api`).
    pub fn new<F, Fut>(module: &str, name: &str, func: F) -> Self
    where
        F: Fn(JsonValue) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<JsonValue>> + Send + 'static,
    {
        Self {
            module: module.replace("::", "."),
            name: name.to_string(),
            func: Arc::new(move |payload| -> HandlerFuture { Box::pin(func(payload)) }),
        }
    }

    /// A placeholder for operations declared without an in-process
    /// implementation. Invoking it always fails.
    pub fn unbound(module: &str, name: &str) -> Self {
        let qualified = format!("{}.{name}", module.replace("::", "."));
        Self::new(module, name, move |_payload| {
            let qualified = qualified.clone();
            async move { Err(anyhow::anyhow!("no implementation bound for {qualified}")) }
        })
    }

    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the handler with a request payload.
    pub fn call(&self, payload: JsonValue) -> HandlerFuture {
        (self.func)(payload)
    }

    /// Whether both values wrap the same underlying function.
    #[must_use]
    pub fn same_as(&self, other: &Handler) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("module", &self.module)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Wraps a function into a [`Handler`] named after it and the module the
/// macro is invoked from.
///
/// ```ignore
/// async fn get_widget(request: serde_json::Value) -> anyhow::Result<serde_json::Value> {
///     Ok(request)
/// }
///
/// let handler = fhirapp_core::handler!(get_widget);
/// assert_eq!(handler.name(), "get_widget");
/// ```
#[macro_export]
macro_rules! handler {
    ($func:ident) => {
        $crate::Handler::new(::core::module_path!(), ::core::stringify!($func), $func)
    };
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    async fn echo(payload: JsonValue) -> anyhow::Result<JsonValue> {
        Ok(json!({ "echo": payload }))
    }

    #[test]
    fn test_handler_macro_captures_module_and_name() {
        let handler = crate::handler!(echo);

        assert_eq!(handler.name(), "echo");
        assert_eq!(handler.module(), "fhirapp_core.handler.tests");
    }

    #[tokio::test]
    async fn test_call_runs_wrapped_function() {
        let handler = Handler::new("app", "echo", echo);

        let output = handler.call(json!(1)).await.unwrap();

        assert_eq!(output, json!({ "echo": 1 }));
    }

    #[tokio::test]
    async fn test_unbound_handler_fails_with_qualified_name() {
        let handler = Handler::unbound("billing::api", "invoice");

        let err = handler.call(json!({})).await.unwrap_err();

        assert_eq!(handler.module(), "billing.api");
        assert_eq!(err.to_string(), "no implementation bound for billing.api.invoice");
    }

    #[test]
    fn test_same_as_tracks_identity_not_name() {
        let a = Handler::new("app", "echo", echo);
        let b = Handler::new("app", "echo", echo);

        assert!(a.same_as(&a.clone()));
        assert!(!a.same_as(&b));
    }
}
