//! The Forge provider.
//!
//! [`ForgeProvider`] resolves credentials at configure time, builds one API
//! client and hands it to an [`EntityAdapter`] per call. The client handle is
//! set once and is read-only afterwards.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::{ForgeApi, ForgeClient};
use crate::config::{process_env, ProviderConfig};
use crate::entity::{EntityAdapter, EntityDef, EntityKind};
use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities};
use crate::validation::validate;

type Result<T> = std::result::Result<T, ProviderError>;

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Kinds exposed as managed resources.
pub fn resource_kinds() -> Vec<EntityKind> {
    EntityKind::ALL
        .into_iter()
        .filter(|kind| kind.is_managed())
        .collect()
}

/// Kinds exposed as data sources.
pub fn data_source_kinds() -> Vec<EntityKind> {
    EntityKind::ALL.to_vec()
}

/// The Laravel Forge provider.
pub struct ForgeProvider {
    client: OnceLock<Arc<dyn ForgeApi>>,
    env: EnvLookup,
}

impl ForgeProvider {
    /// Create an unconfigured provider reading the process environment.
    pub fn new() -> Self {
        Self::with_env(process_env)
    }

    /// Create an unconfigured provider with a custom environment lookup.
    pub fn with_env<F>(env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            client: OnceLock::new(),
            env: Arc::new(env),
        }
    }

    /// Create a provider that is already configured with `client`.
    pub fn with_client(client: Arc<dyn ForgeApi>) -> Self {
        let provider = Self::new();
        let _ = provider.client.set(client);
        provider
    }

    /// Whether `configure` has completed.
    pub fn is_configured(&self) -> bool {
        self.client.get().is_some()
    }

    fn client(&self) -> Result<Arc<dyn ForgeApi>> {
        self.client.get().cloned().ok_or_else(|| {
            ProviderError::NotConfigured(
                "The provider must be configured before managing Forge entities".to_string(),
            )
        })
    }

    fn resource_def(resource_type: &str) -> Result<EntityDef> {
        EntityKind::from_type_name(resource_type)
            .and_then(EntityDef::resource)
            .ok_or_else(|| {
                ProviderError::UnknownResource(format!(
                    "Unknown resource type: {}",
                    resource_type
                ))
            })
    }

    fn data_source_def(data_source_type: &str) -> Result<EntityDef> {
        EntityKind::from_type_name(data_source_type)
            .map(EntityDef::data_source)
            .ok_or_else(|| {
                ProviderError::UnknownResource(format!(
                    "Unknown data source type: {}",
                    data_source_type
                ))
            })
    }

    fn resource_adapter(&self, resource_type: &str) -> Result<EntityAdapter> {
        let def = Self::resource_def(resource_type)?;
        Ok(EntityAdapter::new(def, self.client()?))
    }

    fn data_source_adapter(&self, data_source_type: &str) -> Result<EntityAdapter> {
        let def = Self::data_source_def(data_source_type)?;
        Ok(EntityAdapter::new(def, self.client()?))
    }
}

impl Default for ForgeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ForgeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForgeProvider")
            .field("configured", &self.is_configured())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ProviderService for ForgeProvider {
    fn schema(&self) -> ProviderSchema {
        let schema = ProviderSchema::new().with_provider_config(ProviderConfig::schema());
        let schema = resource_kinds()
            .into_iter()
            .filter_map(EntityDef::resource)
            .fold(schema, |schema, def| {
                schema.with_resource(def.kind().type_name(), def.schema())
            });
        data_source_kinds()
            .into_iter()
            .map(EntityDef::data_source)
            .fold(schema, |schema, def| {
                schema.with_data_source(def.kind().type_name(), def.schema())
            })
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            resources: resource_kinds()
                .into_iter()
                .map(|kind| kind.type_name().to_string())
                .collect(),
            data_sources: data_source_kinds()
                .into_iter()
                .map(|kind| kind.type_name().to_string())
                .collect(),
            capabilities: ServerCapabilities { plan_destroy: true },
        }
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>> {
        Ok(validate(&ProviderConfig::schema(), &config))
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>> {
        if self.is_configured() {
            return Err(ProviderError::Configuration(
                "The provider is already configured".to_string(),
            ));
        }

        let config = ProviderConfig::from_value(config)?;
        let settings = config.resolve(|key| (self.env)(key))?;
        let client = ForgeClient::from_settings(&settings)?;

        self.client.set(Arc::new(client)).map_err(|_| {
            ProviderError::Configuration("The provider is already configured".to_string())
        })?;
        info!(endpoint = %settings.endpoint, "Provider configured");
        Ok(vec![])
    }

    async fn stop(&self) -> Result<()> {
        info!("Provider stopping");
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>> {
        Ok(Self::resource_def(resource_type)?.validate(&config))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult> {
        Self::resource_def(resource_type)?.plan(prior_state.as_ref(), &proposed_state, &config)
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value> {
        let adapter = self.resource_adapter(resource_type)?;
        Ok(Value::Object(adapter.create(&planned_state).await?))
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value> {
        let adapter = self.resource_adapter(resource_type)?;
        match adapter.read_state(&current_state).await {
            Ok(record) => Ok(Value::Object(record)),
            Err(err) if err.is_not_found() => {
                warn!(
                    resource_type,
                    error = %err,
                    "Entity no longer exists, removing from state"
                );
                Ok(Value::Null)
            },
            Err(err) => Err(err),
        }
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value> {
        let adapter = self.resource_adapter(resource_type)?;
        Ok(Value::Object(
            adapter.update(&prior_state, &planned_state).await?,
        ))
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<()> {
        self.resource_adapter(resource_type)?
            .delete(&current_state)
            .await
    }

    async fn import_resource(&self, resource_type: &str, id: &str) -> Result<Vec<ImportedResource>> {
        let state = self.resource_adapter(resource_type)?.import(id)?;
        debug!(resource_type, id, "Parsed import identifier");
        Ok(vec![ImportedResource::new(
            resource_type,
            Value::Object(state),
        )])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>> {
        Ok(Self::data_source_def(data_source_type)?.validate(&config))
    }

    async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value> {
        let adapter = self.data_source_adapter(data_source_type)?;
        Ok(Value::Object(adapter.read_config(&config).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ENDPOINT_ENV_VAR, TOKEN_ENV_VAR};
    use crate::models::{Daemon, Database, Deployment};
    use crate::testing::{
        assert_error_contains, assert_has_errors, assert_no_errors, assert_plan_creates,
        assert_plan_replaces, ProviderTester, StubForgeApi, TestError,
    };
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn stubbed(stub: &Arc<StubForgeApi>) -> ProviderTester<ForgeProvider> {
        ProviderTester::new(ForgeProvider::with_client(stub.clone()))
    }

    fn env_of(token: Option<&'static str>, endpoint: String) -> impl Fn(&str) -> Option<String> {
        move |key: &str| match key {
            TOKEN_ENV_VAR => token.map(str::to_string),
            ENDPOINT_ENV_VAR => Some(endpoint.clone()),
            _ => None,
        }
    }

    async fn mock_server_expecting(token: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/servers/1"))
            .and(header("authorization", format!("Bearer {}", token).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "server": {"id": 1, "provider": "aws"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn test_registries() {
        assert_eq!(resource_kinds(), vec![EntityKind::Server]);
        assert_eq!(data_source_kinds().len(), 5);

        let tester = ProviderTester::new(ForgeProvider::new());
        assert_eq!(tester.resource_types(), vec!["forge_server"]);
        let data_sources = tester.data_source_types();
        for name in [
            "forge_server",
            "forge_site",
            "forge_database",
            "forge_daemon",
            "forge_deployment",
        ] {
            assert!(data_sources.contains(&name.to_string()), "{}", name);
        }
    }

    #[test]
    fn test_schema_publishes_every_kind() {
        let schema = ProviderTester::new(ForgeProvider::new()).schema();
        assert!(schema.provider.attribute("token").unwrap().flags.sensitive);
        assert!(schema.resources.contains_key("forge_server"));
        assert_eq!(schema.data_sources.len(), 5);
    }

    #[tokio::test]
    async fn test_config_token_wins_over_env() {
        let server = mock_server_expecting("A").await;
        let provider = ForgeProvider::with_env(env_of(Some("B"), server.uri()));
        let tester = ProviderTester::new(provider);

        tester.configure(json!({"token": "A"})).await.unwrap();
        let state = tester
            .read_data_source("forge_server", json!({"id": 1}))
            .await
            .unwrap();
        assert_eq!(state["platform"], "aws");
    }

    #[tokio::test]
    async fn test_empty_config_token_uses_env() {
        let server = mock_server_expecting("B").await;
        let provider = ForgeProvider::with_env(env_of(Some("B"), server.uri()));
        let tester = ProviderTester::new(provider);

        tester.configure(json!({"token": ""})).await.unwrap();
        tester
            .read_data_source("forge_server", json!({"id": 1}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_token_fails_configure() {
        let provider = ForgeProvider::with_env(env_of(Some(""), "http://localhost".to_string()));
        let tester = ProviderTester::new(provider);

        let err = tester.configure(json!({"token": ""})).await.unwrap_err();
        assert!(matches!(
            err,
            TestError::Provider(ProviderError::MissingCredential(_))
        ));
        assert!(!tester.provider().is_configured());
    }

    #[tokio::test]
    async fn test_configure_twice_is_rejected() {
        let provider = ForgeProvider::with_env(env_of(Some("B"), "http://localhost".to_string()));
        let tester = ProviderTester::new(provider);

        tester.configure(json!({})).await.unwrap();
        let err = tester.configure(json!({})).await.unwrap_err();
        assert!(matches!(
            err,
            TestError::Provider(ProviderError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_calls_before_configure_fail() {
        let tester = ProviderTester::new(ForgeProvider::with_env(|_: &str| None));

        let err = tester
            .read("forge_server", json!({"id": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));

        let err = tester
            .read_data_source("forge_site", json!({"server_id": 1, "id": 2}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_validate_provider_config() {
        let provider = ForgeProvider::new();
        let diagnostics = provider
            .validate_provider_config(json!({"token": 5}))
            .await
            .unwrap();
        assert_has_errors(&diagnostics);

        let diagnostics = provider
            .validate_provider_config(json!({"token": "abc"}))
            .await
            .unwrap();
        assert_no_errors(&diagnostics);
    }

    #[tokio::test]
    async fn test_validate_resource_config_rejects_unknown_platform() {
        let provider = ForgeProvider::new();
        let diagnostics = provider
            .validate_resource_config("forge_server", json!({"platform": "mainframe"}))
            .await
            .unwrap();
        assert_error_contains(&diagnostics, "Invalid value");

        let err = provider
            .validate_resource_config("forge_site", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_plan_create_and_replace() {
        let stub = Arc::new(StubForgeApi::new());
        let tester = stubbed(&stub);

        let plan = tester
            .plan_create("forge_server", json!({"platform": "ocean2"}))
            .await
            .unwrap();
        assert_plan_creates(&plan);

        let plan = tester
            .plan_update(
                "forge_server",
                json!({"id": 123, "platform": "ocean2"}),
                json!({"platform": "vultr2"}),
            )
            .await
            .unwrap();
        assert_plan_replaces(&plan);
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_type_makes_no_remote_call() {
        let stub = Arc::new(StubForgeApi::new());
        let tester = stubbed(&stub);

        let err = tester
            .plan_create("forge_server", json!({"platform": "ocean2", "type": "mainframe"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));

        let err = tester
            .create("forge_server", json!({"platform": "ocean3"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_read_missing_resource_removes_state() {
        let stub = Arc::new(StubForgeApi::new());
        let tester = stubbed(&stub);

        let state = tester
            .read("forge_server", json!({"id": 999, "platform": "aws"}))
            .await
            .unwrap();
        assert!(state.is_null());
    }

    #[tokio::test]
    async fn test_read_missing_data_source_is_error() {
        let stub = Arc::new(StubForgeApi::new());
        let tester = stubbed(&stub);

        let err = tester
            .read_data_source("forge_database", json!({"server_id": 1, "id": 2}))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_remote_failure_is_not_swallowed() {
        let stub = Arc::new(StubForgeApi::new().failing_with(500, "boom"));
        let tester = stubbed(&stub);

        let err = tester
            .read("forge_server", json!({"id": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Remote { status: Some(500), .. }));
    }

    #[tokio::test]
    async fn test_data_sources_read_scoped_entities() {
        let stub = Arc::new(
            StubForgeApi::new()
                .with_database(
                    3,
                    Database {
                        id: 4,
                        name: Some("forge".to_string()),
                        ..Default::default()
                    },
                )
                .with_daemon(
                    3,
                    Daemon {
                        id: 5,
                        command: Some("php artisan horizon".to_string()),
                        processes: Some(1),
                        ..Default::default()
                    },
                )
                .with_deployment(
                    3,
                    6,
                    Deployment {
                        id: 7,
                        deployment_type: Some(2),
                        status: Some("finished".to_string()),
                        ..Default::default()
                    },
                ),
        );
        let tester = stubbed(&stub);

        let database = tester
            .read_data_source("forge_database", json!({"server_id": 3, "id": 4}))
            .await
            .unwrap();
        assert_eq!(database["name"], "forge");

        let daemon = tester
            .read_data_source("forge_daemon", json!({"server_id": 3, "id": 5}))
            .await
            .unwrap();
        assert_eq!(daemon["command"], "php artisan horizon");
        assert_eq!(daemon["processes"], 1);

        let deployment = tester
            .read_data_source(
                "forge_deployment",
                json!({"server_id": 3, "site_id": 6, "id": 7}),
            )
            .await
            .unwrap();
        assert_eq!(deployment["type"], 2);
        assert_eq!(deployment["site_id"], 6);
    }

    #[tokio::test]
    async fn test_data_source_missing_scope_key_makes_no_call() {
        let stub = Arc::new(StubForgeApi::new());
        let tester = stubbed(&stub);

        let err = tester
            .read_data_source("forge_deployment", json!({"server_id": 3, "id": 7}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(err.message().contains("site_id"));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_update_is_unimplemented() {
        let stub = Arc::new(StubForgeApi::new());
        let tester = stubbed(&stub);

        let err = tester
            .update(
                "forge_server",
                json!({"id": 1, "platform": "aws"}),
                json!({"id": 1, "platform": "aws"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unimplemented(_)));
    }

    #[tokio::test]
    async fn test_import_resource() {
        let stub = Arc::new(StubForgeApi::new());
        let tester = stubbed(&stub);

        let imported = tester.import_resource("forge_server", "123").await.unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].state, json!({"id": 123}));

        let err = tester
            .import_resource("forge_server", "web-1")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_types_are_rejected() {
        let stub = Arc::new(StubForgeApi::new());
        let tester = stubbed(&stub);

        let err = tester.read("forge_site", json!({"id": 1})).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));

        let err = tester
            .read_data_source("forge_cronjob", json!({"id": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }
}
