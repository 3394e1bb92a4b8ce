//! gRPC plumbing between the host runtime and a provider.
//!
//! [`ProviderService`] is the high-level trait the provider implements;
//! [`serve`] exposes it over gRPC and prints the handshake line.
//!
//! Payloads cross the wire as JSON bytes. An empty byte string stands for
//! null in both directions, so a read that returns null state tells the host
//! to drop the resource.
//!
//! # Signal Handling
//!
//! On SIGTERM or SIGINT the server stops accepting connections, waits up to
//! [`ServeOptions::shutdown_timeout`] for in-flight requests, then calls
//! [`ProviderService::stop`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tonic::transport::Server;
use tracing::{debug, error, info, instrument, warn};

use crate::error::ProviderError;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::types::{
    ImportedResource, PlanResult, ProviderMetadata, HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};

/// Operations a provider serves, expressed with plain Rust types.
///
/// Resource operations address one resource type by name. State and
/// configuration are JSON objects; `Value::Null` is the absent state.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use forge_provider::provider::ForgeProvider;
/// use forge_provider::server::ProviderService;
/// use forge_provider::testing::StubForgeApi;
///
/// let provider = ForgeProvider::with_client(Arc::new(StubForgeApi::new()));
/// let metadata = provider.metadata();
/// assert_eq!(metadata.resources, vec!["forge_server".to_string()]);
/// assert!(metadata.capabilities.plan_destroy);
/// ```
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Return the provider's schema including all resources and data sources.
    fn schema(&self) -> ProviderSchema;

    /// Return provider metadata for performance optimization.
    /// By default, this is derived from the schema.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        ProviderMetadata {
            resources: schema.resources.keys().cloned().collect(),
            data_sources: schema.data_sources.keys().cloned().collect(),
            capabilities: Default::default(),
        }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider configuration before configuring.
    /// Returns diagnostics (errors and warnings).
    async fn validate_provider_config(
        &self,
        config: serde_json::Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = config;
        Ok(vec![])
    }

    /// Configure the provider with credentials and settings.
    /// Returns diagnostics (errors and warnings).
    async fn configure(&self, config: serde_json::Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Stop the provider gracefully.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: serde_json::Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (resource_type, config);
        Ok(vec![])
    }

    /// Plan changes for a resource.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<serde_json::Value>,
        proposed_state: serde_json::Value,
        config: serde_json::Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a new resource.
    async fn create(
        &self,
        resource_type: &str,
        planned_state: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Read the current state of a resource.
    ///
    /// Returns `Value::Null` when the resource no longer exists remotely.
    async fn read(
        &self,
        resource_type: &str,
        current_state: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Update an existing resource.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: serde_json::Value,
        planned_state: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Delete a resource.
    async fn delete(
        &self,
        resource_type: &str,
        current_state: serde_json::Value,
    ) -> Result<(), ProviderError>;

    /// Import existing infrastructure into management.
    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::Unimplemented(format!(
            "Import not supported for resource type: {}",
            resource_type
        )))
    }

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Validate a data source's configuration.
    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: serde_json::Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (data_source_type, config);
        Ok(vec![])
    }

    /// Read data from an external source.
    async fn read_data_source(
        &self,
        data_source_type: &str,
        _config: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        Err(ProviderError::UnknownResource(format!(
            "Unknown data source type: {}",
            data_source_type
        )))
    }
}

/// Adapts a [`ProviderService`] to the generated gRPC trait.
struct ProviderGrpcService<P: ProviderService> {
    provider: Arc<P>,
}

impl<P: ProviderService> ProviderGrpcService<P> {
    fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    fn diagnostics_to_proto(
        &self,
        diagnostics: Vec<Diagnostic>,
    ) -> Vec<crate::generated::Diagnostic> {
        diagnostics
            .into_iter()
            .map(|d| crate::generated::Diagnostic {
                severity: match d.severity {
                    DiagnosticSeverity::Error => {
                        crate::generated::diagnostic::Severity::Error as i32
                    },
                    DiagnosticSeverity::Warning => {
                        crate::generated::diagnostic::Severity::Warning as i32
                    },
                },
                summary: d.summary,
                detail: d.detail.unwrap_or_default(),
                attribute: d.attribute.unwrap_or_default(),
            })
            .collect()
    }

    fn error_to_diagnostics(&self, err: ProviderError) -> Vec<crate::generated::Diagnostic> {
        let detail = match &err {
            ProviderError::Serialization(_) | ProviderError::Transport(_) => err.to_string(),
            ProviderError::Remote { .. } => err.to_string(),
            _ => err.message().to_string(),
        };
        vec![crate::generated::Diagnostic {
            severity: crate::generated::diagnostic::Severity::Error as i32,
            summary: err.summary().to_string(),
            detail,
            attribute: String::new(),
        }]
    }

    fn schema_to_proto(&self, schema: &crate::schema::Schema) -> crate::generated::Schema {
        crate::generated::Schema {
            version: schema.version as i64,
            block: Some(block_to_proto(&schema.block)),
        }
    }
}

fn block_to_proto(block: &crate::schema::Block) -> crate::generated::Block {
    crate::generated::Block {
        attributes: block
            .attributes
            .iter()
            .map(|(name, attr)| crate::generated::Attribute {
                name: name.clone(),
                r#type: serde_json::to_vec(&attr.attr_type).unwrap_or_default(),
                required: attr.flags.required,
                optional: attr.flags.optional,
                computed: attr.flags.computed,
                sensitive: attr.flags.sensitive,
                description: attr.description.clone().unwrap_or_default(),
                force_new: attr.force_new,
                allowed_values: attr.allowed_values.clone(),
            })
            .collect(),
        description: block.description.clone().unwrap_or_default(),
    }
}

/// Decode a JSON payload; empty bytes are null.
fn decode(bytes: &[u8]) -> Result<serde_json::Value, ProviderError> {
    if bytes.is_empty() {
        return Ok(serde_json::Value::Null);
    }
    Ok(serde_json::from_slice(bytes)?)
}

/// Encode a JSON payload; null becomes empty bytes.
fn encode(value: &serde_json::Value) -> Result<Vec<u8>, ProviderError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::to_vec(value)?)
}

#[tonic::async_trait]
impl<P: ProviderService> crate::generated::provider_server::Provider for ProviderGrpcService<P> {
    #[instrument(skip(self, _request), name = "grpc.get_metadata")]
    async fn get_metadata(
        &self,
        _request: tonic::Request<crate::generated::GetMetadataRequest>,
    ) -> Result<tonic::Response<crate::generated::GetMetadataResponse>, tonic::Status> {
        debug!("GetMetadata called");
        let metadata = self.provider.metadata();
        info!(
            resources = metadata.resources.len(),
            data_sources = metadata.data_sources.len(),
            "GetMetadata completed"
        );
        Ok(tonic::Response::new(
            crate::generated::GetMetadataResponse {
                server_capabilities: Some(crate::generated::ServerCapabilities {
                    plan_destroy: metadata.capabilities.plan_destroy,
                }),
                resources: metadata.resources,
                data_sources: metadata.data_sources,
                diagnostics: vec![],
            },
        ))
    }

    #[instrument(skip(self, _request), name = "grpc.get_schema")]
    async fn get_schema(
        &self,
        _request: tonic::Request<crate::generated::GetSchemaRequest>,
    ) -> Result<tonic::Response<crate::generated::GetSchemaResponse>, tonic::Status> {
        debug!("GetSchema called");
        let schema = self.provider.schema();
        info!(
            resources = schema.resources.len(),
            data_sources = schema.data_sources.len(),
            "GetSchema completed"
        );
        Ok(tonic::Response::new(crate::generated::GetSchemaResponse {
            provider: Some(self.schema_to_proto(&schema.provider)),
            resources: schema
                .resources
                .iter()
                .map(|(k, v)| (k.clone(), self.schema_to_proto(v)))
                .collect(),
            data_sources: schema
                .data_sources
                .iter()
                .map(|(k, v)| (k.clone(), self.schema_to_proto(v)))
                .collect(),
            diagnostics: vec![],
        }))
    }

    #[instrument(skip(self, request), name = "grpc.validate_provider_config")]
    async fn validate_provider_config(
        &self,
        request: tonic::Request<crate::generated::ValidateProviderConfigRequest>,
    ) -> Result<tonic::Response<crate::generated::ValidateProviderConfigResponse>, tonic::Status>
    {
        debug!("ValidateProviderConfig called");
        let req = request.into_inner();
        let outcome = async {
            let config = decode(&req.config)?;
            self.provider.validate_provider_config(config).await
        }
        .await;

        let diagnostics = match outcome {
            Ok(diagnostics) => {
                if diagnostics.iter().any(Diagnostic::is_error) {
                    warn!(
                        diagnostics = diagnostics.len(),
                        "ValidateProviderConfig completed with errors"
                    );
                } else {
                    info!("ValidateProviderConfig completed successfully");
                }
                self.diagnostics_to_proto(diagnostics)
            },
            Err(e) => {
                error!(error = %e, "ValidateProviderConfig failed");
                self.error_to_diagnostics(e)
            },
        };
        Ok(tonic::Response::new(
            crate::generated::ValidateProviderConfigResponse { diagnostics },
        ))
    }

    #[instrument(skip(self, request), name = "grpc.configure")]
    async fn configure(
        &self,
        request: tonic::Request<crate::generated::ConfigureRequest>,
    ) -> Result<tonic::Response<crate::generated::ConfigureResponse>, tonic::Status> {
        debug!("Configure called");
        let req = request.into_inner();
        let outcome = async {
            let config = decode(&req.config)?;
            self.provider.configure(config).await
        }
        .await;

        let diagnostics = match outcome {
            Ok(diagnostics) => {
                if diagnostics.iter().any(Diagnostic::is_error) {
                    warn!(
                        diagnostics = diagnostics.len(),
                        "Configure completed with errors"
                    );
                } else {
                    info!("Configure completed successfully");
                }
                self.diagnostics_to_proto(diagnostics)
            },
            Err(e) => {
                error!(error = %e, "Configure failed");
                self.error_to_diagnostics(e)
            },
        };
        Ok(tonic::Response::new(crate::generated::ConfigureResponse {
            diagnostics,
        }))
    }

    #[instrument(skip(self, _request), name = "grpc.stop")]
    async fn stop(
        &self,
        _request: tonic::Request<crate::generated::StopRequest>,
    ) -> Result<tonic::Response<crate::generated::StopResponse>, tonic::Status> {
        info!("Stop called");
        let error = match self.provider.stop().await {
            Ok(()) => {
                info!("Stop completed successfully");
                String::new()
            },
            Err(e) => {
                error!(error = %e, "Stop failed");
                e.to_string()
            },
        };
        Ok(tonic::Response::new(crate::generated::StopResponse {
            error,
        }))
    }

    #[instrument(skip(self, request), name = "grpc.validate_resource_config")]
    async fn validate_resource_config(
        &self,
        request: tonic::Request<crate::generated::ValidateResourceConfigRequest>,
    ) -> Result<tonic::Response<crate::generated::ValidateResourceConfigResponse>, tonic::Status>
    {
        let req = request.into_inner();
        debug!(resource_type = %req.resource_type, "ValidateResourceConfig called");
        let outcome = async {
            let config = decode(&req.config)?;
            self.provider
                .validate_resource_config(&req.resource_type, config)
                .await
        }
        .await;

        let diagnostics = match outcome {
            Ok(diagnostics) => {
                if diagnostics.iter().any(Diagnostic::is_error) {
                    warn!(resource_type = %req.resource_type, diagnostics = diagnostics.len(), "ValidateResourceConfig completed with errors");
                } else {
                    info!(resource_type = %req.resource_type, "ValidateResourceConfig completed successfully");
                }
                self.diagnostics_to_proto(diagnostics)
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, error = %e, "ValidateResourceConfig failed");
                self.error_to_diagnostics(e)
            },
        };
        Ok(tonic::Response::new(
            crate::generated::ValidateResourceConfigResponse { diagnostics },
        ))
    }

    #[instrument(skip(self, request), name = "grpc.plan")]
    async fn plan(
        &self,
        request: tonic::Request<crate::generated::PlanRequest>,
    ) -> Result<tonic::Response<crate::generated::PlanResponse>, tonic::Status> {
        let req = request.into_inner();
        let is_create = req.prior_state.is_empty();
        debug!(resource_type = %req.resource_type, is_create = is_create, "Plan called");

        let outcome = async {
            let prior_state = Some(decode(&req.prior_state)?).filter(|state| !state.is_null());
            let proposed_state = decode(&req.proposed_state)?;
            let config = decode(&req.config)?;
            let result = self
                .provider
                .plan(&req.resource_type, prior_state, proposed_state, config)
                .await?;
            let planned_state = encode(&result.planned_state)?;
            Ok::<_, ProviderError>((result, planned_state))
        }
        .await;

        match outcome {
            Ok((result, planned_state)) => {
                info!(
                    resource_type = %req.resource_type,
                    changes = result.changes.len(),
                    requires_replace = result.requires_replace,
                    "Plan completed"
                );
                Ok(tonic::Response::new(crate::generated::PlanResponse {
                    planned_state,
                    changes: result.changes.into_iter().map(Into::into).collect(),
                    requires_replace: result.requires_replace,
                    diagnostics: vec![],
                }))
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, error = %e, "Plan failed");
                Ok(tonic::Response::new(crate::generated::PlanResponse {
                    planned_state: vec![],
                    changes: vec![],
                    requires_replace: false,
                    diagnostics: self.error_to_diagnostics(e),
                }))
            },
        }
    }

    #[instrument(skip(self, request), name = "grpc.create")]
    async fn create(
        &self,
        request: tonic::Request<crate::generated::CreateRequest>,
    ) -> Result<tonic::Response<crate::generated::CreateResponse>, tonic::Status> {
        let req = request.into_inner();
        info!(resource_type = %req.resource_type, "Create called");
        let outcome = async {
            let planned_state = decode(&req.planned_state)?;
            let state = self
                .provider
                .create(&req.resource_type, planned_state)
                .await?;
            encode(&state)
        }
        .await;

        match outcome {
            Ok(state) => {
                info!(resource_type = %req.resource_type, "Create completed successfully");
                Ok(tonic::Response::new(crate::generated::CreateResponse {
                    state,
                    diagnostics: vec![],
                }))
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, error = %e, "Create failed");
                Ok(tonic::Response::new(crate::generated::CreateResponse {
                    state: vec![],
                    diagnostics: self.error_to_diagnostics(e),
                }))
            },
        }
    }

    #[instrument(skip(self, request), name = "grpc.read")]
    async fn read(
        &self,
        request: tonic::Request<crate::generated::ReadRequest>,
    ) -> Result<tonic::Response<crate::generated::ReadResponse>, tonic::Status> {
        let req = request.into_inner();
        debug!(resource_type = %req.resource_type, "Read called");
        let outcome = async {
            let current_state = decode(&req.current_state)?;
            let state = self.provider.read(&req.resource_type, current_state).await?;
            encode(&state)
        }
        .await;

        match outcome {
            Ok(state) => {
                debug!(
                    resource_type = %req.resource_type,
                    removed = state.is_empty(),
                    "Read completed successfully"
                );
                Ok(tonic::Response::new(crate::generated::ReadResponse {
                    state,
                    diagnostics: vec![],
                }))
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, error = %e, "Read failed");
                Ok(tonic::Response::new(crate::generated::ReadResponse {
                    state: vec![],
                    diagnostics: self.error_to_diagnostics(e),
                }))
            },
        }
    }

    #[instrument(skip(self, request), name = "grpc.update")]
    async fn update(
        &self,
        request: tonic::Request<crate::generated::UpdateRequest>,
    ) -> Result<tonic::Response<crate::generated::UpdateResponse>, tonic::Status> {
        let req = request.into_inner();
        info!(resource_type = %req.resource_type, "Update called");
        let outcome = async {
            let prior_state = decode(&req.prior_state)?;
            let planned_state = decode(&req.planned_state)?;
            let state = self
                .provider
                .update(&req.resource_type, prior_state, planned_state)
                .await?;
            encode(&state)
        }
        .await;

        match outcome {
            Ok(state) => {
                info!(resource_type = %req.resource_type, "Update completed successfully");
                Ok(tonic::Response::new(crate::generated::UpdateResponse {
                    state,
                    diagnostics: vec![],
                }))
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, error = %e, "Update failed");
                Ok(tonic::Response::new(crate::generated::UpdateResponse {
                    state: vec![],
                    diagnostics: self.error_to_diagnostics(e),
                }))
            },
        }
    }

    #[instrument(skip(self, request), name = "grpc.delete")]
    async fn delete(
        &self,
        request: tonic::Request<crate::generated::DeleteRequest>,
    ) -> Result<tonic::Response<crate::generated::DeleteResponse>, tonic::Status> {
        let req = request.into_inner();
        info!(resource_type = %req.resource_type, "Delete called");
        let outcome = async {
            let current_state = decode(&req.current_state)?;
            self.provider
                .delete(&req.resource_type, current_state)
                .await
        }
        .await;

        let diagnostics = match outcome {
            Ok(()) => {
                info!(resource_type = %req.resource_type, "Delete completed successfully");
                vec![]
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, error = %e, "Delete failed");
                self.error_to_diagnostics(e)
            },
        };
        Ok(tonic::Response::new(crate::generated::DeleteResponse {
            diagnostics,
        }))
    }

    #[instrument(skip(self, request), name = "grpc.import_resource_state")]
    async fn import_resource_state(
        &self,
        request: tonic::Request<crate::generated::ImportResourceStateRequest>,
    ) -> Result<tonic::Response<crate::generated::ImportResourceStateResponse>, tonic::Status> {
        let req = request.into_inner();
        info!(resource_type = %req.resource_type, id = %req.id, "ImportResourceState called");
        let outcome = async {
            let imported = self
                .provider
                .import_resource(&req.resource_type, &req.id)
                .await?;
            imported
                .into_iter()
                .map(|r| -> Result<_, ProviderError> {
                    Ok(crate::generated::ImportedResource {
                        state: encode(&r.state)?,
                        resource_type: r.resource_type,
                    })
                })
                .collect::<Result<Vec<_>, ProviderError>>()
        }
        .await;

        match outcome {
            Ok(imported) => {
                info!(
                    resource_type = %req.resource_type,
                    id = %req.id,
                    imported_count = imported.len(),
                    "ImportResourceState completed"
                );
                Ok(tonic::Response::new(
                    crate::generated::ImportResourceStateResponse {
                        imported,
                        diagnostics: vec![],
                    },
                ))
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, id = %req.id, error = %e, "ImportResourceState failed");
                Ok(tonic::Response::new(
                    crate::generated::ImportResourceStateResponse {
                        imported: vec![],
                        diagnostics: self.error_to_diagnostics(e),
                    },
                ))
            },
        }
    }

    #[instrument(skip(self, request), name = "grpc.validate_data_source_config")]
    async fn validate_data_source_config(
        &self,
        request: tonic::Request<crate::generated::ValidateDataSourceConfigRequest>,
    ) -> Result<tonic::Response<crate::generated::ValidateDataSourceConfigResponse>, tonic::Status>
    {
        let req = request.into_inner();
        debug!(data_source_type = %req.data_source_type, "ValidateDataSourceConfig called");
        let outcome = async {
            let config = decode(&req.config)?;
            self.provider
                .validate_data_source_config(&req.data_source_type, config)
                .await
        }
        .await;

        let diagnostics = match outcome {
            Ok(diagnostics) => {
                if diagnostics.iter().any(Diagnostic::is_error) {
                    warn!(data_source_type = %req.data_source_type, diagnostics = diagnostics.len(), "ValidateDataSourceConfig completed with errors");
                } else {
                    info!(data_source_type = %req.data_source_type, "ValidateDataSourceConfig completed successfully");
                }
                self.diagnostics_to_proto(diagnostics)
            },
            Err(e) => {
                error!(data_source_type = %req.data_source_type, error = %e, "ValidateDataSourceConfig failed");
                self.error_to_diagnostics(e)
            },
        };
        Ok(tonic::Response::new(
            crate::generated::ValidateDataSourceConfigResponse { diagnostics },
        ))
    }

    #[instrument(skip(self, request), name = "grpc.read_data_source")]
    async fn read_data_source(
        &self,
        request: tonic::Request<crate::generated::ReadDataSourceRequest>,
    ) -> Result<tonic::Response<crate::generated::ReadDataSourceResponse>, tonic::Status> {
        let req = request.into_inner();
        debug!(data_source_type = %req.data_source_type, "ReadDataSource called");
        let outcome = async {
            let config = decode(&req.config)?;
            let state = self
                .provider
                .read_data_source(&req.data_source_type, config)
                .await?;
            encode(&state)
        }
        .await;

        match outcome {
            Ok(state) => {
                info!(data_source_type = %req.data_source_type, "ReadDataSource completed successfully");
                Ok(tonic::Response::new(
                    crate::generated::ReadDataSourceResponse {
                        state,
                        diagnostics: vec![],
                    },
                ))
            },
            Err(e) => {
                error!(data_source_type = %req.data_source_type, error = %e, "ReadDataSource failed");
                Ok(tonic::Response::new(
                    crate::generated::ReadDataSourceResponse {
                        state: vec![],
                        diagnostics: self.error_to_diagnostics(e),
                    },
                ))
            },
        }
    }
}

/// Options for configuring the provider server.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Timeout for graceful shutdown. After receiving a shutdown signal,
    /// the server will wait this long for in-flight requests to complete.
    /// Default: 30 seconds.
    pub shutdown_timeout: Duration,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServeOptions {
    /// Create new serve options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT, CTRL+C on Windows).
///
/// If no handler can be installed the future never resolves and the host
/// terminates the process instead.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, initiating graceful shutdown");
                    }
                    _ = sigint.recv() => {
                        info!("Received SIGINT, initiating graceful shutdown");
                    }
                }
            },
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Failed to install signal handlers, falling back to CTRL+C");
                wait_for_ctrl_c().await;
            },
        }
    }

    #[cfg(not(unix))]
    {
        wait_for_ctrl_c().await;
    }
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received CTRL+C, initiating graceful shutdown"),
        Err(e) => {
            error!(error = %e, "Failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        },
    }
}

/// Serve a provider implementation as a gRPC server.
///
/// This function:
/// 1. Binds an available port on the loopback interface
/// 2. Starts the gRPC server
/// 3. Outputs the handshake string to stdout
/// 4. Handles shutdown signals (SIGTERM/SIGINT) gracefully
///
/// The handshake format is: `FORGE_PROVIDER|<version>|<address>`
///
/// For custom configuration, use [`serve_with_options`].
pub async fn serve<P: ProviderService>(provider: P) -> Result<(), Box<dyn std::error::Error>> {
    serve_with_options(provider, ServeOptions::default()).await
}

/// Serve a provider with custom options.
///
/// See [`serve`] for details.
pub async fn serve_with_options<P: ProviderService>(
    provider: P,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    serve_on_listener(provider, listener, wait_for_shutdown_signal(), options).await
}

/// Serve a provider on a specific address.
///
/// Unlike [`serve`], this binds the given address rather than picking a port.
pub async fn serve_on<P: ProviderService>(
    provider: P,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    serve_on_with_options(provider, addr, ServeOptions::default()).await
}

/// Serve a provider on a specific address with custom options.
pub async fn serve_on_with_options<P: ProviderService>(
    provider: P,
    addr: SocketAddr,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(addr).await?;
    serve_on_listener(provider, listener, wait_for_shutdown_signal(), options).await
}

/// Run the gRPC server on a bound listener until `shutdown` resolves.
///
/// Once `shutdown` fires, in-flight requests get `options.shutdown_timeout`
/// to finish before the provider is stopped regardless.
async fn serve_on_listener<P, S>(
    provider: P,
    listener: TcpListener,
    shutdown: S,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>>
where
    P: ProviderService,
    S: std::future::Future<Output = ()>,
{
    let addr = listener.local_addr()?;
    println!("{}|{}|{}", HANDSHAKE_PREFIX, PROTOCOL_VERSION, addr);

    info!(address = %addr, "Provider server starting");

    let provider = Arc::new(provider);
    let grpc_service = ProviderGrpcService::new(Arc::clone(&provider));
    let service = crate::generated::provider_server::ProviderServer::new(grpc_service);

    let (drain_tx, drain_rx) = oneshot::channel::<()>();
    let server_future = Server::builder()
        .add_service(service)
        .serve_with_incoming_shutdown(
            tokio_stream::wrappers::TcpListenerStream::new(listener),
            async {
                let _ = drain_rx.await;
            },
        );
    tokio::pin!(server_future);
    tokio::pin!(shutdown);

    tokio::select! {
        result = &mut server_future => {
            if let Err(e) = result {
                error!(error = %e, "Server error");
                return Err(e.into());
            }
            info!("Server stopped");
        }
        () = &mut shutdown => {
            let _ = drain_tx.send(());
            match tokio::time::timeout(options.shutdown_timeout, &mut server_future).await {
                Ok(Ok(())) => info!("Server shutdown complete"),
                Ok(Err(e)) => {
                    error!(error = %e, "Server error during shutdown");
                    return Err(e.into());
                },
                Err(_) => warn!(
                    timeout = ?options.shutdown_timeout,
                    "Shutdown timeout exceeded, forcing shutdown"
                ),
            }
        }
    }

    debug!("Calling provider stop()");
    if let Err(e) = provider.stop().await {
        warn!(error = %e, "Provider stop() returned error");
    }

    info!("Provider shutdown complete");
    Ok(())
}
