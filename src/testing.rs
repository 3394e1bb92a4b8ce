//! Testing utilities for the Forge provider.
//!
//! [`ProviderTester`] drives a [`ProviderService`] without a gRPC server, and
//! [`StubForgeApi`] stands in for the Forge API with an in-memory store and a
//! call counter.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use forge_provider::provider::ForgeProvider;
//! use forge_provider::testing::{ProviderTester, StubForgeApi};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let stub = Arc::new(StubForgeApi::new());
//! let tester = ProviderTester::new(ForgeProvider::with_client(stub.clone()));
//!
//! let state = tester
//!     .lifecycle_create("forge_server", json!({"platform": "ocean2"}))
//!     .await
//!     .unwrap();
//!
//! assert_eq!(state["id"], 123);
//! assert_eq!(stub.calls(), 2);
//! # });
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::client::ForgeApi;
use crate::error::ProviderError;
use crate::models::{CreateServerRequest, Daemon, Database, Deployment, Server, Site};
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// A test harness for provider implementations.
///
/// Wraps a `ProviderService` and exposes its operations with plain Rust
/// types, without a gRPC server.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Get the list of data source type names.
    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate provider configuration.
    ///
    /// Returns `Ok(())` if validation passes (no error diagnostics).
    /// Returns `Err` with the diagnostics if there are errors.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider.
    ///
    /// Returns `Ok(())` if configuration succeeds.
    /// Returns `Err` with the diagnostics if there are errors.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Full plan operation with explicit config.
    pub async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, prior_state, proposed_state, config)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Validate a data source configuration.
    pub async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_data_source_config(data_source_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Read data from a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .read_data_source(data_source_type, config)
            .await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Run a full create lifecycle: plan → create → read.
    ///
    /// Returns the final state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        // Plan
        let plan_result = self.plan_create(resource_type, config).await?;

        // Create
        let created_state = self
            .create(resource_type, plan_result.planned_state)
            .await?;

        // Read to verify
        self.read(resource_type, created_state).await
    }

    /// Run a full delete lifecycle: plan → delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        // Plan (optional, but good practice)
        let _ = self
            .plan_delete(resource_type, current_state.clone())
            .await?;

        // Delete
        self.delete(resource_type, current_state).await
    }

    /// Run a replacement: plan against `prior_state`, then delete → create → read.
    ///
    /// Returns the plan and the state of the replacement.
    pub async fn lifecycle_replace(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<(PlanResult, Value), ProviderError> {
        let plan_result = self
            .plan_update(resource_type, prior_state.clone(), config)
            .await?;

        self.delete(resource_type, prior_state).await?;
        let created_state = self
            .create(resource_type, plan_result.planned_state.clone())
            .await?;
        let state = self.read(resource_type, created_state).await?;
        Ok((plan_result, state))
    }

    /// Run an import: import → read each imported state.
    pub async fn lifecycle_import(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<Value>, ProviderError> {
        let imported = self.import_resource(resource_type, id).await?;
        let mut states = Vec::with_capacity(imported.len());
        for resource in imported {
            states.push(self.read(&resource.resource_type, resource.state).await?);
        }
        Ok(states)
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

/// Check diagnostics and return an error if there are any errors.
fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan result indicates the resource will be created.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(
        !plan.requires_replace,
        "Expected plan to create, not replace"
    );
}

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan result indicates changes are needed.
///
/// # Panics
///
/// Panics if the plan has no changes.
pub fn assert_plan_has_changes(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes, but got no changes"
    );
}

/// Assert that a plan requires resource replacement.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// Assert that a plan does not require resource replacement.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        has_change,
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan does not have a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan has a change for the given path.
pub fn assert_plan_does_not_change_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        !has_change,
        "Expected plan to not change attribute '{}', but it was changed",
        path
    );
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain at least one error.
///
/// # Panics
///
/// Panics if there are no error diagnostics.
pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    let has_errors = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error));

    assert!(has_errors, "Expected at least one error, but got none");
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error) && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

// =========================================================================
// Stub API
// =========================================================================

/// Identifier handed to the first server created through a [`StubForgeApi`].
pub const STUB_FIRST_ID: i64 = 123;

#[derive(Debug, Default)]
struct StubStore {
    servers: BTreeMap<i64, Server>,
    sites: BTreeMap<(i64, i64), Site>,
    databases: BTreeMap<(i64, i64), Database>,
    daemons: BTreeMap<(i64, i64), Daemon>,
    deployments: BTreeMap<(i64, i64, i64), Deployment>,
}

/// In-memory [`ForgeApi`] that counts every call.
///
/// Unknown entities yield [`ProviderError::NotFound`], as a 404 from the API
/// would. Created servers get sequential ids starting at [`STUB_FIRST_ID`].
#[derive(Debug)]
pub struct StubForgeApi {
    store: Mutex<StubStore>,
    next_id: AtomicI64,
    calls: AtomicUsize,
    failure: Option<(u16, String)>,
}

impl Default for StubForgeApi {
    fn default() -> Self {
        Self::new()
    }
}

impl StubForgeApi {
    /// Create an empty stub.
    pub fn new() -> Self {
        Self {
            store: Mutex::new(StubStore::default()),
            next_id: AtomicI64::new(STUB_FIRST_ID),
            calls: AtomicUsize::new(0),
            failure: None,
        }
    }

    /// Seed a server.
    pub fn with_server(mut self, server: Server) -> Self {
        self.store_mut().servers.insert(server.id, server);
        self
    }

    /// Seed a site on `server_id`.
    pub fn with_site(mut self, server_id: i64, site: Site) -> Self {
        self.store_mut().sites.insert((server_id, site.id), site);
        self
    }

    /// Seed a database on `server_id`.
    pub fn with_database(mut self, server_id: i64, database: Database) -> Self {
        self.store_mut()
            .databases
            .insert((server_id, database.id), database);
        self
    }

    /// Seed a daemon on `server_id`.
    pub fn with_daemon(mut self, server_id: i64, daemon: Daemon) -> Self {
        self.store_mut().daemons.insert((server_id, daemon.id), daemon);
        self
    }

    /// Seed a deployment of site `site_id` on `server_id`.
    pub fn with_deployment(mut self, server_id: i64, site_id: i64, deployment: Deployment) -> Self {
        self.store_mut()
            .deployments
            .insert((server_id, site_id, deployment.id), deployment);
        self
    }

    /// Make every call fail with a remote error.
    pub fn failing_with(mut self, status: u16, message: impl Into<String>) -> Self {
        self.failure = Some((status, message.into()));
        self
    }

    /// Number of API calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// A stored server, if present.
    pub fn server(&self, id: i64) -> Option<Server> {
        self.lock().servers.get(&id).cloned()
    }

    fn store_mut(&mut self) -> &mut StubStore {
        self.store.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, StubStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Result<MutexGuard<'_, StubStore>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some((status, message)) => Err(ProviderError::remote(Some(*status), message.clone())),
            None => Ok(self.lock()),
        }
    }
}

fn missing(what: &str) -> ProviderError {
    ProviderError::NotFound(format!("{} not found", what))
}

#[async_trait]
impl ForgeApi for StubForgeApi {
    async fn get_server(&self, id: i64) -> Result<Server, ProviderError> {
        let store = self.begin()?;
        store
            .servers
            .get(&id)
            .cloned()
            .ok_or_else(|| missing(&format!("server {}", id)))
    }

    async fn create_server(&self, request: &CreateServerRequest) -> Result<Server, ProviderError> {
        let mut store = self.begin()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let server = Server {
            id,
            credential_id: request.credential_id,
            name: Some(
                request
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("server-{}", id)),
            ),
            server_type: Some(
                request
                    .server_type
                    .clone()
                    .unwrap_or_else(|| "app".to_string()),
            ),
            provider: Some(request.provider.clone()),
            size: request.size.clone(),
            region: request.region.clone(),
            php_version: Some(
                request
                    .php_version
                    .clone()
                    .unwrap_or_else(|| "php83".to_string()),
            ),
            ip_address: Some("192.0.2.10".to_string()),
            is_ready: Some(false),
            created_at: Some("2024-01-01 00:00:00".to_string()),
            ..Default::default()
        };
        store.servers.insert(id, server.clone());
        Ok(server)
    }

    async fn delete_server(&self, id: i64) -> Result<(), ProviderError> {
        let mut store = self.begin()?;
        store
            .servers
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| missing(&format!("server {}", id)))
    }

    async fn get_site(&self, server_id: i64, id: i64) -> Result<Site, ProviderError> {
        let store = self.begin()?;
        store
            .sites
            .get(&(server_id, id))
            .cloned()
            .ok_or_else(|| missing(&format!("site {}/{}", server_id, id)))
    }

    async fn get_database(&self, server_id: i64, id: i64) -> Result<Database, ProviderError> {
        let store = self.begin()?;
        store
            .databases
            .get(&(server_id, id))
            .cloned()
            .ok_or_else(|| missing(&format!("database {}/{}", server_id, id)))
    }

    async fn get_daemon(&self, server_id: i64, id: i64) -> Result<Daemon, ProviderError> {
        let store = self.begin()?;
        store
            .daemons
            .get(&(server_id, id))
            .cloned()
            .ok_or_else(|| missing(&format!("daemon {}/{}", server_id, id)))
    }

    async fn get_deployment(
        &self,
        server_id: i64,
        site_id: i64,
        id: i64,
    ) -> Result<Deployment, ProviderError> {
        let store = self.begin()?;
        store
            .deployments
            .get(&(server_id, site_id, id))
            .cloned()
            .ok_or_else(|| missing(&format!("deployment {}/{}/{}", server_id, site_id, id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ForgeProvider;
    use serde_json::json;
    use std::sync::Arc;

    fn tester(stub: &Arc<StubForgeApi>) -> ProviderTester<ForgeProvider> {
        ProviderTester::new(ForgeProvider::with_client(stub.clone()))
    }

    #[tokio::test]
    async fn test_tester_schema() {
        let stub = Arc::new(StubForgeApi::new());
        let tester = tester(&stub);
        assert!(tester.schema().resources.contains_key("forge_server"));
        assert!(tester
            .resource_types()
            .contains(&"forge_server".to_string()));
    }

    #[tokio::test]
    async fn test_tester_plan_create() {
        let stub = Arc::new(StubForgeApi::new());
        let plan = tester(&stub)
            .plan_create("forge_server", json!({"platform": "linode4"}))
            .await
            .unwrap();

        assert_plan_creates(&plan);
        assert_plan_changes_attribute(&plan, "platform");
        assert_plan_does_not_change_attribute(&plan, "id");
    }

    #[tokio::test]
    async fn test_tester_plan_update_no_changes() {
        let stub = Arc::new(StubForgeApi::new());
        let state = json!({"id": 123, "platform": "aws", "name": "web-1"});
        let plan = tester(&stub)
            .plan_update("forge_server", state.clone(), json!({"platform": "aws"}))
            .await
            .unwrap();

        assert_plan_no_changes(&plan);
        assert_plan_updates_in_place(&plan);
    }

    #[tokio::test]
    async fn test_tester_plan_delete() {
        let stub = Arc::new(StubForgeApi::new());
        let plan = tester(&stub)
            .plan_delete("forge_server", json!({"id": 123, "platform": "aws"}))
            .await
            .unwrap();

        assert_plan_has_changes(&plan);
        assert!(plan.planned_state.is_null());
    }

    #[tokio::test]
    async fn test_tester_plan_with_separate_config() {
        let stub = Arc::new(StubForgeApi::new());
        let tester = tester(&stub);

        // the host proposes prior computed values alongside the user's config
        let prior = json!({"id": 123, "platform": "aws", "type": "app"});
        let proposed = json!({"id": 123, "platform": "aws", "type": null});
        let plan = tester
            .plan("forge_server", Some(prior), proposed, json!({"platform": "aws"}))
            .await
            .unwrap();

        assert_plan_no_changes(&plan);
        assert_eq!(plan.planned_state["type"], "app");
        assert_eq!(plan.planned_state["id"], 123);

        tester.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_tester_lifecycle_create_and_delete() {
        let stub = Arc::new(StubForgeApi::new());
        let tester = tester(&stub);

        let state = tester
            .lifecycle_create("forge_server", json!({"platform": "hetzner", "name": "db-1"}))
            .await
            .unwrap();
        assert_eq!(state["id"], STUB_FIRST_ID);
        assert_eq!(state["name"], "db-1");
        assert_eq!(state["type"], "app");

        tester.lifecycle_delete("forge_server", state).await.unwrap();
        assert!(stub.server(STUB_FIRST_ID).is_none());
    }

    #[tokio::test]
    async fn test_tester_lifecycle_replace() {
        let stub = Arc::new(StubForgeApi::new());
        let tester = tester(&stub);

        let state = tester
            .lifecycle_create("forge_server", json!({"platform": "ocean2"}))
            .await
            .unwrap();
        let (plan, replaced) = tester
            .lifecycle_replace("forge_server", state, json!({"platform": "vultr2"}))
            .await
            .unwrap();

        assert_plan_replaces(&plan);
        assert_eq!(replaced["id"], STUB_FIRST_ID + 1);
        assert_eq!(replaced["platform"], "vultr2");
        assert!(stub.server(STUB_FIRST_ID).is_none());
    }

    #[tokio::test]
    async fn test_tester_lifecycle_import() {
        let stub = Arc::new(StubForgeApi::new().with_server(Server {
            id: 42,
            provider: Some("custom".to_string()),
            ..Default::default()
        }));
        let states = tester(&stub)
            .lifecycle_import("forge_server", "42")
            .await
            .unwrap();

        assert_eq!(states.len(), 1);
        assert_eq!(states[0]["platform"], "custom");
    }

    #[tokio::test]
    async fn test_tester_validation_errors() {
        let stub = Arc::new(StubForgeApi::new());
        let tester = tester(&stub);

        let err = tester
            .validate_resource_config("forge_server", json!({"platform": "mainframe"}))
            .await
            .unwrap_err();
        match err {
            TestError::Diagnostics(diagnostics) => {
                assert_error_contains(&diagnostics, "Invalid value");
            },
            other => panic!("unexpected error: {}", other),
        }

        tester
            .validate_data_source_config("forge_site", json!({"server_id": 1, "id": 2}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stub_counts_calls_and_fails_on_demand() {
        let stub = StubForgeApi::new().failing_with(502, "bad gateway");
        let err = stub.get_site(1, 2).await.unwrap_err();
        assert!(matches!(err, ProviderError::Remote { status: Some(502), .. }));
        assert_eq!(stub.calls(), 1);
    }

    #[test]
    fn test_assert_no_errors() {
        let diagnostics = vec![Diagnostic::warning("Just a warning")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    #[should_panic(expected = "Expected no errors")]
    fn test_assert_no_errors_fails() {
        let diagnostics = vec![Diagnostic::error("An error")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    fn test_assert_has_errors() {
        let diagnostics = vec![Diagnostic::error("An error")];
        assert_has_errors(&diagnostics);
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("First error").with_attribute("platform"),
            Diagnostic::error("Second error").with_detail("More info"),
        ]);

        let display = format!("{}", err);
        assert!(display.contains("First error"));
        assert!(display.contains("Second error"));
        assert!(display.contains("platform"));
        assert!(display.contains("More info"));
    }
}
