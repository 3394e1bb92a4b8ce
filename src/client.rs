//! Forge API client.
//!
//! [`ForgeApi`] is the capability the entity adapters depend on; [`ForgeClient`]
//! implements it over HTTPS. Every call is a single attempt: there is no retry
//! or backoff, and the request timeout is the only deadline.

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::config::{parse_endpoint, ClientSettings, DEFAULT_ENDPOINT};
use crate::error::ProviderError;
use crate::models::{
    CreateServerRequest, Daemon, DaemonEnvelope, Database, DatabaseEnvelope, Deployment,
    DeploymentEnvelope, Server, ServerEnvelope, Site, SiteEnvelope,
};

const USER_AGENT: &str = concat!("forge-provider/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 8;

type Result<T> = std::result::Result<T, ProviderError>;

/// Operations the provider needs from the Forge API.
///
/// Implementations must report a missing entity as
/// [`ProviderError::NotFound`] and any other failure as
/// [`ProviderError::Remote`].
#[async_trait]
pub trait ForgeApi: Send + Sync {
    /// Fetch a server.
    async fn get_server(&self, id: i64) -> Result<Server>;

    /// Provision a new server.
    async fn create_server(&self, request: &CreateServerRequest) -> Result<Server>;

    /// Delete a server.
    ///
    /// A server that is already gone may be reported as success or as
    /// [`ProviderError::NotFound`]; callers treat both the same.
    async fn delete_server(&self, id: i64) -> Result<()>;

    /// Fetch a site on a server.
    async fn get_site(&self, server_id: i64, id: i64) -> Result<Site>;

    /// Fetch a database on a server.
    async fn get_database(&self, server_id: i64, id: i64) -> Result<Database>;

    /// Fetch a daemon on a server.
    async fn get_daemon(&self, server_id: i64, id: i64) -> Result<Daemon>;

    /// Fetch one deployment from a site's history.
    async fn get_deployment(&self, server_id: i64, site_id: i64, id: i64) -> Result<Deployment>;
}

/// Builder for [`ForgeClient`].
#[derive(Clone)]
pub struct ForgeClientBuilder {
    base_url: Url,
    token: Option<String>,
    timeout: Duration,
}

impl ForgeClientBuilder {
    /// Create a builder for the given API base URL.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            base_url: parse_endpoint(base_url.as_ref())?,
            token: None,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Create a builder from resolved provider settings.
    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self {
            base_url: settings.endpoint.clone(),
            token: Some(settings.token.clone()),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the bearer token sent with every request.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Override the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ForgeClient> {
        let token = self.token.ok_or_else(|| {
            ProviderError::MissingCredential("A Forge API token is required".to_string())
        })?;

        let http = ClientBuilder::new()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .pool_idle_timeout(DEFAULT_POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(DEFAULT_POOL_MAX_IDLE_PER_HOST)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| {
                ProviderError::Configuration(format!("Failed to build Forge HTTP client: {}", err))
            })?;

        Ok(ForgeClient {
            http,
            base_url: self.base_url,
            token,
        })
    }
}

impl std::fmt::Debug for ForgeClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForgeClientBuilder")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// HTTPS client for the Forge API.
#[derive(Clone)]
pub struct ForgeClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl ForgeClient {
    /// Create a client for the public Forge API.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        ForgeClientBuilder::new(DEFAULT_ENDPOINT)?
            .with_token(token)
            .build()
    }

    /// Create a client from resolved provider settings.
    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        ForgeClientBuilder::from_settings(settings).build()
    }

    /// Access the API base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn build_url(&self, path: &str) -> Result<Url> {
        let normalized = path.strip_prefix('/').unwrap_or(path);
        self.base_url.join(normalized).map_err(|err| {
            ProviderError::InvalidRequest(format!("Invalid Forge API path `{}`: {}", path, err))
        })
    }

    async fn get_json<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.send_json(Method::GET, path, Option::<&()>::None).await
    }

    async fn send_json<B, R>(&self, method: Method, path: &str, body: Option<&B>) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.send(method, path, body).await?;
        let status = response.status();
        response.json::<R>().await.map_err(|err| {
            ProviderError::remote(
                Some(status.as_u16()),
                format!("Failed to parse Forge API response for `{}`: {}", path, err),
            )
        })
    }

    async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.build_url(path)?;
        let mut request = self
            .http
            .request(method.clone(), url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json");

        if let Some(payload) = body {
            request = request.json(payload);
        }

        info!(%method, path, "Forge API request");

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        debug!(%status, path, body = %text, "Forge API error response");

        match status {
            StatusCode::NOT_FOUND => Err(ProviderError::NotFound(format!(
                "{} {}: {}",
                method, path, text
            ))),
            _ => Err(ProviderError::remote(Some(status.as_u16()), text)),
        }
    }
}

impl std::fmt::Debug for ForgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForgeClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ForgeApi for ForgeClient {
    async fn get_server(&self, id: i64) -> Result<Server> {
        let envelope: ServerEnvelope = self.get_json(&format!("servers/{}", id)).await?;
        Ok(envelope.server)
    }

    async fn create_server(&self, request: &CreateServerRequest) -> Result<Server> {
        let envelope: ServerEnvelope = self
            .send_json(Method::POST, "servers", Some(request))
            .await?;
        Ok(envelope.server)
    }

    async fn delete_server(&self, id: i64) -> Result<()> {
        match self
            .send(Method::DELETE, &format!("servers/{}", id), Option::<&()>::None)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => {
                debug!(id, "server already deleted");
                Ok(())
            },
            Err(err) => Err(err),
        }
    }

    async fn get_site(&self, server_id: i64, id: i64) -> Result<Site> {
        let envelope: SiteEnvelope = self
            .get_json(&format!("servers/{}/sites/{}", server_id, id))
            .await?;
        Ok(envelope.site)
    }

    async fn get_database(&self, server_id: i64, id: i64) -> Result<Database> {
        let envelope: DatabaseEnvelope = self
            .get_json(&format!("servers/{}/databases/{}", server_id, id))
            .await?;
        Ok(envelope.database)
    }

    async fn get_daemon(&self, server_id: i64, id: i64) -> Result<Daemon> {
        let envelope: DaemonEnvelope = self
            .get_json(&format!("servers/{}/daemons/{}", server_id, id))
            .await?;
        Ok(envelope.daemon)
    }

    async fn get_deployment(&self, server_id: i64, site_id: i64, id: i64) -> Result<Deployment> {
        let envelope: DeploymentEnvelope = self
            .get_json(&format!(
                "servers/{}/sites/{}/deployment-history/{}",
                server_id, site_id, id
            ))
            .await?;
        Ok(envelope.deployment)
    }
}
