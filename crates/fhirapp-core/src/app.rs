//! The app facade: registration, manifest building and the connect sequence.

use std::{fmt, sync::Arc};

use serde_json::Value as JsonValue;
use tracing::{info, instrument};

use crate::{
    access_policy::{
        AccessPolicyError, check_public_access, endpoint_policy_id, ensure_public_access,
    },
    config::{AppSettings, ConfigError, ProjectConfig},
    handler::Handler,
    manifest::{EntityMap, Manifest, ResourceMap},
    operation::{OperationRoute, RouteError},
    registry::Registry,
    seed::{ResourceClient, ResourceError, SeedReport, SeedSet, seed_resources},
};

/// Callback run once the platform connection is up and seeding finished.
pub type OnReady = Box<dyn FnOnce() + Send + Sync>;

/// Errors raised by operation registration. Both are configuration errors
/// and are meant to abort startup.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RegistrationError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    AccessPolicy(#[from] AccessPolicyError),
}

/// A platform app under construction.
///
/// Build it at startup: register operations and subscriptions, then call
/// [`App::connect`] once the platform hands over its connection config.
/// After that, share it read-only with the request dispatcher.
///
/// ```ignore
/// let mut app = App::new(AppSettings::from_env()?)
///     .with_seeds(seeds)
///     .on_ready(|| tracing::info!("ready"));
///
/// app.register_operation(
///     &OperationRoute::single(Method::Get, "/widgets/{id}"),
///     true,
///     fhirapp_core::handler!(get_widget),
/// )?;
/// app.register_subscription("Patient", fhirapp_core::handler!(on_patient));
///
/// let manifest = app.build_manifest();
/// ```
pub struct App {
    settings: AppSettings,
    registry: Registry,
    resources: ResourceMap,
    entities: EntityMap,
    seeds: SeedSet,
    on_ready: Option<OnReady>,
    client: Option<Arc<dyn ResourceClient>>,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("app_id", &self.settings.app_id)
            .field("registry", &self.registry)
            .field("resources", &self.resources.len())
            .field("entities", &self.entities.len())
            .field("seeds", &self.seeds.len())
            .field("on_ready", &self.on_ready.is_some())
            .field("connected", &self.client.is_some())
            .finish()
    }
}

impl App {
    #[must_use]
    pub fn new(settings: AppSettings) -> Self {
        Self {
            settings,
            registry: Registry::new(),
            resources: ResourceMap::new(),
            entities: EntityMap::new(),
            seeds: SeedSet::new(),
            on_ready: None,
            client: None,
        }
    }

    /// Builds an app from a project file.
    ///
    /// Bundled resources, entities and seeds are taken over as declared.
    /// Declared operations and subscriptions are registered with unbound
    /// handlers, since their implementation lives in another process.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] when app settings are absent
    /// and [`ConfigError::Declaration`] for an invalid declaration.
    pub fn from_project(config: ProjectConfig) -> Result<Self, ConfigError> {
        let settings = config.settings()?;
        let mut app = App::new(settings)
            .with_resources(config.resources)
            .with_entities(config.entities)
            .with_seeds(config.seeds);

        for op in &config.operations {
            let handler = Handler::unbound(&op.module, &op.function);
            app.register_operation_json(&op.methods, &op.path, op.public, handler)
                .map_err(|e| ConfigError::Declaration {
                    target: format!("operation {}.{}", op.module, op.function),
                    message: e.to_string(),
                })?;
        }

        for sub in &config.subscriptions {
            app.register_subscription(&sub.entity, Handler::unbound(&sub.module, &sub.handler));
        }

        Ok(app)
    }

    #[must_use]
    pub fn with_resources(mut self, resources: ResourceMap) -> Self {
        self.resources = resources;
        self
    }

    #[must_use]
    pub fn with_entities(mut self, entities: EntityMap) -> Self {
        self.entities = entities;
        self
    }

    #[must_use]
    pub fn with_seeds(mut self, seeds: SeedSet) -> Self {
        self.seeds = seeds;
        self
    }

    /// Sets the hook run after the first successful [`App::connect`].
    #[must_use]
    pub fn on_ready(mut self, hook: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.on_ready = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Name of the generated policy granting access to public operations.
    #[must_use]
    pub fn endpoint_policy_id(&self) -> String {
        endpoint_policy_id(&self.settings.app_id)
    }

    /// Registers `handler` for every method of `route`.
    ///
    /// When `public` is set, each generated id is linked from the app's
    /// endpoint `AccessPolicy`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::AccessPolicy`] when a policy supplied
    /// through [`App::with_resources`] under the endpoint policy id cannot be
    /// extended. Nothing is registered in that case.
    pub fn register_operation(
        &mut self,
        route: &OperationRoute,
        public: bool,
        handler: Handler,
    ) -> Result<Vec<String>, RegistrationError> {
        let policy_id = self.endpoint_policy_id();
        if public {
            check_public_access(&self.resources, &policy_id)?;
        }

        let ids = self.registry.register_operation(route, &handler);
        if public {
            for id in &ids {
                ensure_public_access(&mut self.resources, &policy_id, id)?;
            }
        }
        Ok(ids)
    }

    /// Registers an operation from loosely typed `methods` and `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::Route`] if `path` or `methods` is not a
    /// list or holds an invalid element, and the errors of
    /// [`App::register_operation`].
    pub fn register_operation_json(
        &mut self,
        methods: &JsonValue,
        path: &JsonValue,
        public: bool,
        handler: Handler,
    ) -> Result<Vec<String>, RegistrationError> {
        let route = OperationRoute::from_json(methods, path)?;
        self.register_operation(&route, public, handler)
    }

    /// Subscribes `handler` to `entity_type`. Returns the handler path.
    pub fn register_subscription(&mut self, entity_type: &str, handler: Handler) -> String {
        self.registry.register_subscription(entity_type, &handler)
    }

    #[must_use]
    pub fn operation_handler(&self, operation_id: &str) -> Option<&Handler> {
        self.registry.operation_handler(operation_id)
    }

    #[must_use]
    pub fn subscription_handler(&self, path: &str) -> Option<&Handler> {
        self.registry.subscription_handler(path)
    }

    /// Assembles the manifest from the current registration state.
    ///
    /// Every call reads the registry and resource map afresh, so
    /// registrations made after an earlier call are reflected.
    #[must_use]
    pub fn build_manifest(&self) -> Manifest {
        Manifest::assemble(
            &self.settings,
            &self.resources,
            &self.entities,
            &self.registry,
        )
    }

    /// The resource client set by [`App::connect`].
    #[must_use]
    pub fn client(&self) -> Option<&Arc<dyn ResourceClient>> {
        self.client.as_ref()
    }

    /// Runs the connect sequence: keep `client`, seed baseline resources,
    /// then fire the on-ready hook.
    ///
    /// The hook fires at most once over the app's lifetime; it is skipped
    /// when seeding fails.
    ///
    /// # Errors
    ///
    /// Returns the first seeding error that is not a not-found signal.
    #[instrument(skip_all, fields(app_id = %self.settings.app_id))]
    pub async fn connect(
        &mut self,
        client: Arc<dyn ResourceClient>,
    ) -> Result<SeedReport, ResourceError> {
        self.client = Some(Arc::clone(&client));

        let report = seed_resources(client.as_ref(), &self.seeds).await?;
        info!(
            created = report.created.len(),
            existing = report.existing.len(),
            "Seeding finished"
        );

        if let Some(hook) = self.on_ready.take() {
            hook();
        }

        Ok(report)
    }
}
