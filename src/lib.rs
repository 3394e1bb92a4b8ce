//! Laravel Forge provider
//!
//! An infrastructure-as-code provider that maps declarative state onto the
//! Laravel Forge REST API. The host runtime spawns the provider binary,
//! reads the handshake line from stdout and drives it over gRPC.
//!
//! # Overview
//!
//! - **Resource**: `forge_server` (create, read, delete, import; every
//!   configurable attribute forces replacement)
//! - **Data sources**: `forge_server`, `forge_site`, `forge_database`,
//!   `forge_daemon`, `forge_deployment`
//! - **Configuration**: an API token from the `token` attribute or the
//!   `FORGE_API_TOKEN` environment variable, and an optional endpoint
//!
//! # Quick Start
//!
//! ```no_run
//! use forge_provider::{init_logging, serve, ForgeProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!     serve(ForgeProvider::new()).await
//! }
//! ```
//!
//! # Handshake Protocol
//!
//! When the provider starts via [`serve`], it outputs a handshake string to stdout:
//!
//! ```text
//! FORGE_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `FORGE_PROVIDER|<protocol_version>|<address>`
//!
//! # Provider Protocol
//!
//! - **GetMetadata**: Returns provider capabilities and resource/data source names
//! - **GetSchema**: Returns full schema for provider config, resources, and data sources
//! - **ValidateProviderConfig**: Validates provider configuration
//! - **Configure**: Resolves credentials and builds the API client
//! - **Stop**: Gracefully shuts down the provider
//! - **ValidateResourceConfig**: Validates resource configuration
//! - **Plan**: Calculates required changes
//! - **Create/Read/Update/Delete**: CRUD operations for resources
//! - **ImportResourceState**: Imports existing infrastructure
//! - **ValidateDataSourceConfig**: Validates data source configuration
//! - **ReadDataSource**: Reads a single remote entity

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod entities;
pub mod entity;
pub mod error;
pub mod logging;
pub mod models;
pub mod provider;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

// Re-export main types at crate root
pub use client::{ForgeApi, ForgeClient, ForgeClientBuilder};
pub use config::{ClientSettings, ProviderConfig};
pub use entity::{Address, EntityAdapter, EntityDef, EntityKind, Record};
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::ForgeProvider;
pub use schema::ProviderSchema;
pub use server::{
    serve, serve_on, serve_on_with_options, serve_with_options, ProviderService, ServeOptions,
};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
pub use validation::{is_valid, validate, validate_result};
