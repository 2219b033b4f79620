//! Core types for building apps on a FHIR platform.
//!
//! A platform app declares, at startup, the resources, custom operations and
//! event subscriptions it provides. This crate collects those declarations,
//! renders them into the app manifest the platform reads during
//! registration, and seeds baseline resources once the platform connection
//! is up.
//!
//! # Key Components
//!
//! - **Registry**: [`Registry`] maps generated operation ids and subscription
//!   paths to [`Handler`]s
//! - **Manifest**: [`App::build_manifest`] assembles the [`Manifest`] from the
//!   current registration state
//! - **Access policy**: public operations are linked from a generated
//!   `AccessPolicy` resource
//! - **Seeding**: [`seed_resources`] creates missing baseline resources
//!   through a [`ResourceClient`]
//!
//! # Example
//!
//! ```ignore
//! use fhirapp_core::{App, AppSettings, Method, OperationRoute, handler};
//!
//! async fn get_widget(request: serde_json::Value) -> anyhow::Result<serde_json::Value> {
//!     Ok(request)
//! }
//!
//! let mut app = App::new(AppSettings::from_env()?);
//! app.register_operation(
//!     &OperationRoute::single(Method::Get, "/widgets/{id}"),
//!     true,
//!     handler!(get_widget),
//! )?;
//!
//! let manifest = serde_json::to_string(&app.build_manifest())?;
//! ```
//!
//! # Thread Safety
//!
//! Registration requires `&mut App` and is meant for startup. Once request
//! dispatch begins, wrap the app in `Arc` and only perform lookups.

mod access_policy;
mod app;
mod config;
mod handler;
mod manifest;
mod operation;
mod registry;
mod seed;

pub use access_policy::{
    ACCESS_POLICY, AccessPolicyError, check_public_access, endpoint_policy_id,
    ensure_public_access,
};
pub use app::{App, OnReady, RegistrationError};
pub use config::{
    AppSettings, ClientCredentials, ConfigError, ConfigFile, ConfigKind, ConnectionConfig,
    DeclaredOperation, DeclaredSubscription, PlatformConfig, ProjectConfig,
};
pub use handler::{Handler, HandlerFuture};
pub use manifest::{Endpoint, EntityMap, Manifest, ResourceMap};
pub use operation::{Method, OperationDescriptor, OperationRoute, PathSegment, RouteError};
pub use registry::{Registry, SubscriptionDescriptor};
pub use seed::{ResourceClient, ResourceError, SeedReport, SeedSet, seed_resources};

/// Re-exported for implementors of [`ResourceClient`].
pub use async_trait::async_trait;
