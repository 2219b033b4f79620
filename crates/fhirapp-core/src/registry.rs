//! Handler registry for operations and subscriptions.
//!
//! # Thread Safety
//!
//! Registration takes `&mut self` and is meant to happen during startup.
//! Once request dispatch begins, share the registry read-only (for example
//! inside an `Arc`); lookups take `&self` and never fail.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    handler::Handler,
    operation::{OperationDescriptor, OperationRoute},
};

/// Manifest entry for a subscription: the path the platform calls back on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionDescriptor {
    pub handler: String,
}

/// In-memory mapping from operation ids and subscription paths to handlers.
///
/// Duplicate registrations overwrite earlier ones without notice. This
/// applies both to operation ids (same method, module, function and path)
/// and to subscriptions (same entity type, or same handler name).
#[derive(Debug, Default)]
pub struct Registry {
    operations: BTreeMap<String, OperationDescriptor>,
    operation_handlers: HashMap<String, Handler>,
    subscriptions: BTreeMap<String, SubscriptionDescriptor>,
    subscription_handlers: HashMap<String, Handler>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for every method of `route`.
    ///
    /// Returns the generated operation ids in the order of the route's
    /// methods.
    pub fn register_operation(&mut self, route: &OperationRoute, handler: &Handler) -> Vec<String> {
        route
            .methods()
            .iter()
            .map(|&method| {
                let operation_id = route.operation_id(method, handler);
                self.operations
                    .insert(operation_id.clone(), route.descriptor(method));
                self.operation_handlers
                    .insert(operation_id.clone(), handler.clone());
                info!(operation_id = %operation_id, "Registered operation");
                operation_id
            })
            .collect()
    }

    /// Subscribes `handler` to changes of `entity_type`.
    ///
    /// The handler path is the handler's function name. Returns that path.
    pub fn register_subscription(&mut self, entity_type: &str, handler: &Handler) -> String {
        let path = handler.name().to_string();
        self.subscriptions.insert(
            entity_type.to_string(),
            SubscriptionDescriptor {
                handler: path.clone(),
            },
        );
        self.subscription_handlers
            .insert(path.clone(), handler.clone());
        info!(entity_type, handler = %path, "Registered subscription");
        path
    }

    /// Looks up an operation handler by generated id.
    #[must_use]
    pub fn operation_handler(&self, operation_id: &str) -> Option<&Handler> {
        self.operation_handlers.get(operation_id)
    }

    /// Looks up a subscription handler by handler path.
    #[must_use]
    pub fn subscription_handler(&self, path: &str) -> Option<&Handler> {
        self.subscription_handlers.get(path)
    }

    #[must_use]
    pub fn operations(&self) -> &BTreeMap<String, OperationDescriptor> {
        &self.operations
    }

    #[must_use]
    pub fn subscriptions(&self) -> &BTreeMap<String, SubscriptionDescriptor> {
        &self.subscriptions
    }
}
