//! One-shot seeding of baseline resources on platform connect.
//!
//! Each configured resource is fetched by type and id; when the platform
//! reports it missing it is created with the configured body. Resources that
//! already exist are never updated. The first failure other than "not found"
//! aborts the sequence and is returned as-is.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::{debug, instrument};

/// Baseline resources: resource type, then resource id, then body.
pub type SeedSet = BTreeMap<String, BTreeMap<String, JsonValue>>;

/// Errors reported by a [`ResourceClient`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ResourceError {
    /// The platform has no resource with this type and id.
    #[error("resource {resource_type}/{id} not found")]
    NotFound { resource_type: String, id: String },

    /// The platform answered with a non-success status.
    #[error("platform returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The resource body was rejected before any request was made.
    #[error("resource body for {resource_type}/{id} must be a JSON object")]
    InvalidBody { resource_type: String, id: String },

    /// The request could not be sent or its response could not be read.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ResourceError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResourceError::NotFound { .. })
    }
}

/// The two resource calls seeding depends on.
///
/// The FHIR transport itself lives outside this crate; see the
/// `fhirapp-client` crate for an HTTP implementation.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Fetches a resource, returning [`ResourceError::NotFound`] when absent.
    async fn get(&self, resource_type: &str, id: &str) -> Result<JsonValue, ResourceError>;

    /// Persists a resource of `resource_type` under `id` with `body`,
    /// returning the stored representation.
    async fn create(
        &self,
        resource_type: &str,
        id: &str,
        body: JsonValue,
    ) -> Result<JsonValue, ResourceError>;
}

/// Outcome of a seeding run, as `(resource_type, id)` pairs in visit order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: Vec<(String, String)>,
    pub existing: Vec<(String, String)>,
}

/// Creates every resource in `seeds` that the platform does not have yet.
///
/// Runs strictly sequentially: one fetch, and possibly one create, per
/// resource. There are no retries.
///
/// # Errors
///
/// Returns the first error from `client` that is not a not-found signal on
/// fetch, or any error on create, without wrapping it.
#[instrument(skip_all, fields(resource_types = seeds.len()))]
pub async fn seed_resources(
    client: &dyn ResourceClient,
    seeds: &SeedSet,
) -> Result<SeedReport, ResourceError> {
    let mut report = SeedReport::default();

    for (resource_type, resources) in seeds {
        for (id, body) in resources {
            match client.get(resource_type, id).await {
                Ok(_) => {
                    debug!(resource_type = %resource_type, id = %id, "Resource already exists");
                    report.existing.push((resource_type.clone(), id.clone()));
                }
                Err(err) if err.is_not_found() => {
                    client.create(resource_type, id, body.clone()).await?;
                    debug!(resource_type = %resource_type, id = %id, "Created resource");
                    report.created.push((resource_type.clone(), id.clone()));
                }
                Err(err) => return Err(err),
            }
        }
    }

    Ok(report)
}
