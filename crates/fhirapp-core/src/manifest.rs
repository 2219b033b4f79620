//! The app manifest sent to the platform during registration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{
    config::AppSettings,
    operation::OperationDescriptor,
    registry::{Registry, SubscriptionDescriptor},
};

/// Resources bundled with the app: resource type, then resource id, then body.
pub type ResourceMap = BTreeMap<String, BTreeMap<String, JsonValue>>;

/// Custom entity definitions keyed by entity name.
pub type EntityMap = BTreeMap<String, JsonValue>;

pub const RESOURCE_TYPE: &str = "App";
pub const APP_TYPE: &str = "app";
pub const API_VERSION: u32 = 1;
pub const ENDPOINT_TYPE: &str = "http-rpc";

/// Where the platform delivers HTTP-RPC calls for this app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub secret: String,
}

/// App descriptor document.
///
/// Empty categories are left out of the serialized form entirely rather than
/// rendered as `{}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: String,
    pub resource_type: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub api_version: u32,
    pub endpoint: Endpoint,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: ResourceMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub entities: EntityMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subscriptions: BTreeMap<String, SubscriptionDescriptor>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub operations: BTreeMap<String, OperationDescriptor>,
}

impl Manifest {
    /// Assembles a manifest from the current registration state.
    pub(crate) fn assemble(
        settings: &AppSettings,
        resources: &ResourceMap,
        entities: &EntityMap,
        registry: &Registry,
    ) -> Self {
        Self {
            id: settings.app_id.clone(),
            resource_type: RESOURCE_TYPE.to_string(),
            kind: APP_TYPE.to_string(),
            api_version: API_VERSION,
            endpoint: Endpoint {
                url: settings.app_url.clone(),
                kind: ENDPOINT_TYPE.to_string(),
                secret: settings.app_secret.clone(),
            },
            resources: resources.clone(),
            entities: entities.clone(),
            subscriptions: registry.subscriptions().clone(),
            operations: registry.operations().clone(),
        }
    }

    /// Renders the manifest as JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if a map key cannot be rendered as a
    /// JSON object key.
    pub fn to_value(&self) -> Result<JsonValue, serde_json::Error> {
        serde_json::to_value(self)
    }
}
