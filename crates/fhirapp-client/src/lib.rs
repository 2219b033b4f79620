//! HTTP implementation of [`ResourceClient`] for the platform's FHIR API.
//!
//! This is deliberately small: it reads and writes single resources by type
//! and id, which is all the connect sequence needs. Requests authenticate
//! with HTTP Basic using the app's client credentials.
//!
//! ```ignore
//! let client = FhirClient::from_config(&connection)?;
//! app.connect(Arc::new(client)).await?;
//! ```

use async_trait::async_trait;
use fhirapp_core::{ConnectionConfig, ResourceClient, ResourceError};
use reqwest::{Response, StatusCode, Url};
use serde_json::Value as JsonValue;
use tracing::instrument;

/// Errors raised while constructing a [`FhirClient`] or preparing a request.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ClientError {
    #[error("base-url must not be empty")]
    EmptyBaseUrl,

    #[error("client id must not be empty")]
    EmptyClientId,

    /// A base URL that cannot carry path segments.
    #[error("invalid base-url `{0}`")]
    InvalidBaseUrl(String),

    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Resource client over the platform's `/fhir` endpoint.
#[derive(Debug, Clone)]
pub struct FhirClient {
    http: reqwest::Client,
    base_url: Url,
    client_id: String,
    client_secret: String,
}

impl FhirClient {
    /// Creates a client for `{box.base-url}/fhir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is empty or not an absolute URL, if
    /// the client id is empty, or if the underlying HTTP client cannot be
    /// built.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, ClientError> {
        let base = normalize_base_url(&config.platform.base_url)?;
        if config.client.id.trim().is_empty() {
            return Err(ClientError::EmptyClientId);
        }

        let base_url = Url::parse(&format!("{base}/fhir"))
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ClientError::InvalidBaseUrl(base.clone()))?;

        Ok(Self {
            http: reqwest::Client::builder().build()?,
            base_url,
            client_id: config.client.id.clone(),
            client_secret: config.client.secret.clone(),
        })
    }

    /// Root of the FHIR API, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// `{base}/{resource_type}/{id}`, with both parts percent-encoded as
    /// single path segments.
    fn resource_url(&self, resource_type: &str, id: &str) -> Result<Url, ResourceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| transport(ClientError::InvalidBaseUrl(self.base_url.to_string())))?
            .pop_if_empty()
            .push(resource_type)
            .push(id);
        Ok(url)
    }
}

#[async_trait]
impl ResourceClient for FhirClient {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn get(&self, resource_type: &str, id: &str) -> Result<JsonValue, ResourceError> {
        let response = self
            .http
            .get(self.resource_url(resource_type, id)?)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ResourceError::NotFound {
                resource_type: resource_type.to_string(),
                id: id.to_string(),
            });
        }

        read_resource(response).await
    }

    #[instrument(skip(self, body), fields(base_url = %self.base_url))]
    async fn create(
        &self,
        resource_type: &str,
        id: &str,
        body: JsonValue,
    ) -> Result<JsonValue, ResourceError> {
        let JsonValue::Object(mut resource) = body else {
            return Err(ResourceError::InvalidBody {
                resource_type: resource_type.to_string(),
                id: id.to_string(),
            });
        };
        resource.insert("resourceType".to_string(), JsonValue::from(resource_type));
        resource.insert("id".to_string(), JsonValue::from(id));

        let response = self
            .http
            .put(self.resource_url(resource_type, id)?)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .json(&resource)
            .send()
            .await
            .map_err(transport)?;

        read_resource(response).await
    }
}

async fn read_resource(response: Response) -> Result<JsonValue, ResourceError> {
    let status = response.status();
    let text = response.text().await.map_err(transport)?;

    if !status.is_success() {
        return Err(ResourceError::Status {
            status: status.as_u16(),
            body: text,
        });
    }

    if text.trim().is_empty() {
        return Ok(JsonValue::Null);
    }
    serde_json::from_str(&text).map_err(transport)
}

fn transport(err: impl std::error::Error + Send + Sync + 'static) -> ResourceError {
    ResourceError::Transport(Box::new(err))
}

fn normalize_base_url(endpoint: &str) -> Result<String, ClientError> {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ClientError::EmptyBaseUrl);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use fhirapp_core::{ClientCredentials, PlatformConfig};
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path},
    };

    use super::*;

    // "app:pw" in base64
    const BASIC_AUTH: &str = "Basic YXBwOnB3";

    fn connection(base_url: &str) -> ConnectionConfig {
        ConnectionConfig {
            client: ClientCredentials {
                id: "app".to_string(),
                secret: "pw".to_string(),
            },
            platform: PlatformConfig {
                base_url: base_url.to_string(),
            },
        }
    }

    fn client_for(server: &MockServer) -> FhirClient {
        FhirClient::from_config(&connection(&server.uri())).unwrap()
    }

    // --- normalize_base_url tests ---

    #[test]
    fn test_normalize_base_url_trims_trailing_slash_and_whitespace() {
        assert_eq!(
            normalize_base_url("  http://box:8080/ ").unwrap(),
            "http://box:8080"
        );
    }

    #[test]
    fn test_from_config_appends_fhir_path() {
        let client = FhirClient::from_config(&connection("http://box/")).unwrap();

        assert_eq!(client.base_url(), "http://box/fhir");
    }

    #[test]
    fn test_from_config_rejects_empty_values() {
        assert!(matches!(
            FhirClient::from_config(&connection(" / ")),
            Err(ClientError::EmptyBaseUrl)
        ));

        let mut config = connection("http://box");
        config.client.id = " ".to_string();
        assert!(matches!(
            FhirClient::from_config(&config),
            Err(ClientError::EmptyClientId)
        ));
    }

    #[test]
    fn test_from_config_rejects_relative_base_url() {
        assert!(matches!(
            FhirClient::from_config(&connection("box:8080/api")),
            Err(ClientError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            FhirClient::from_config(&connection("not a url")),
            Err(ClientError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_resource_url_encodes_each_segment() {
        let client = FhirClient::from_config(&connection("http://box/")).unwrap();

        let url = client.resource_url("Patient", "a/b c").unwrap();

        assert_eq!(url.as_str(), "http://box/fhir/Patient/a%2Fb%20c");
    }

    // --- get ---

    #[tokio::test]
    async fn test_get_returns_resource_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fhir/Patient/p1"))
            .and(header("authorization", BASIC_AUTH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"resourceType": "Patient", "id": "p1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let resource = client_for(&server).get("Patient", "p1").await.unwrap();

        assert_eq!(resource["id"], "p1");
    }

    #[tokio::test]
    async fn test_get_maps_404_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fhir/Patient/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get("Patient", "missing")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_get_maps_other_failures_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let err = client_for(&server).get("Patient", "p1").await.unwrap_err();

        match err {
            ResourceError::Status { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "forbidden");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_get_sends_id_as_single_encoded_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fhir/Patient/a%2Fb"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "a/b"})))
            .expect(1)
            .mount(&server)
            .await;

        let resource = client_for(&server).get("Patient", "a/b").await.unwrap();

        assert_eq!(resource["id"], "a/b");
    }

    // --- create ---

    #[tokio::test]
    async fn test_create_puts_body_with_type_and_id() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/fhir/Organization/main"))
            .and(header("authorization", BASIC_AUTH))
            .and(body_json(json!({
                "resourceType": "Organization",
                "id": "main",
                "name": "Main clinic",
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "resourceType": "Organization",
                "id": "main",
                "name": "Main clinic",
                "meta": {"versionId": "1"},
            })))
            .expect(1)
            .mount(&server)
            .await;

        let stored = client_for(&server)
            .create("Organization", "main", json!({"name": "Main clinic"}))
            .await
            .unwrap();

        assert_eq!(stored["meta"]["versionId"], "1");
    }

    #[tokio::test]
    async fn test_create_accepts_empty_response_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let stored = client_for(&server)
            .create("Organization", "main", json!({}))
            .await
            .unwrap();

        assert_eq!(stored, JsonValue::Null);
    }

    #[tokio::test]
    async fn test_create_rejects_non_object_body_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create("Organization", "main", json!(["not", "an", "object"]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ResourceError::InvalidBody { ref resource_type, ref id }
                if resource_type == "Organization" && id == "main"
        ));
        assert!(err.to_string().contains("Organization/main"));
    }

    // --- seeding over HTTP ---

    #[tokio::test]
    async fn test_seed_resources_creates_only_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fhir/Organization/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "main"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fhir/Organization/lab"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/fhir/Organization/lab"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "lab"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/fhir/Organization/main"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let seeds = fhirapp_core::SeedSet::from([(
            "Organization".to_string(),
            [
                ("main".to_string(), json!({"name": "Main"})),
                ("lab".to_string(), json!({"name": "Lab"})),
            ]
            .into_iter()
            .collect(),
        )]);

        let report = fhirapp_core::seed_resources(&client_for(&server), &seeds)
            .await
            .unwrap();

        assert_eq!(
            report.created,
            vec![("Organization".to_string(), "lab".to_string())]
        );
        assert_eq!(
            report.existing,
            vec![("Organization".to_string(), "main".to_string())]
        );
    }
}
