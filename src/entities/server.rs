//! `forge_server`: a provisioned server.

use crate::entity::{Field, FieldType};

/// Infrastructure platforms a server can be provisioned on.
pub const PLATFORMS: &[&str] = &["ocean2", "linode4", "vultr2", "aws", "hetzner", "custom"];

/// Server roles.
pub const SERVER_TYPES: &[&str] = &[
    "app",
    "web",
    "loadbalancer",
    "cache",
    "database",
    "worker",
    "meilisearch",
];

pub(crate) const RESOURCE_DESCRIPTION: &str = "Provisions a Laravel Forge server.";

pub(crate) const DATA_SOURCE_DESCRIPTION: &str = "Reads an existing Laravel Forge server.";

/// Rows of the managed `forge_server` resource.
///
/// Forge offers no in-place update for these attributes, so every
/// configurable row forces replacement.
pub const RESOURCE_FIELDS: &[Field] = &[
    Field::computed("id", FieldType::Int64).describe("Server identifier."),
    Field::required("platform", FieldType::String)
        .wire("provider")
        .force_new()
        .one_of(PLATFORMS)
        .describe("Infrastructure platform to provision on."),
    Field::optional_computed("type", FieldType::String)
        .force_new()
        .one_of(SERVER_TYPES)
        .describe("Server role. Forge defaults to `app`."),
    Field::optional_computed("name", FieldType::String)
        .force_new()
        .describe("Server name. Forge generates one when omitted."),
    Field::optional("credential_id", FieldType::Int64)
        .force_new()
        .describe("Platform credential used to provision the server."),
    Field::optional("region", FieldType::String).force_new(),
    Field::optional("size", FieldType::String).force_new(),
    Field::optional_computed("php_version", FieldType::String)
        .force_new()
        .describe("PHP version to install, e.g. `php83`."),
    Field::computed("ip_address", FieldType::String),
    Field::computed("private_ip_address", FieldType::String),
    Field::computed("is_ready", FieldType::String)
        .describe("Whether provisioning has finished."),
    Field::computed("created_at", FieldType::String),
];

/// Rows of the read-only `forge_server` data source.
pub const DATA_SOURCE_FIELDS: &[Field] = &[
    Field::required("id", FieldType::Int64).describe("Server identifier."),
    Field::computed("credential_id", FieldType::Int64),
    Field::computed("name", FieldType::String),
    Field::computed("platform", FieldType::String)
        .wire("provider")
        .describe("Infrastructure platform."),
    Field::computed("type", FieldType::String),
    Field::computed("size", FieldType::String),
    Field::computed("region", FieldType::String),
    Field::computed("php_version", FieldType::String),
    Field::computed("php_cli_version", FieldType::String),
    Field::computed("opcache_status", FieldType::String),
    Field::computed("database_type", FieldType::String),
    Field::computed("ip_address", FieldType::String),
    Field::computed("private_ip_address", FieldType::String),
    Field::computed("blackfire_status", FieldType::String),
    Field::computed("papertrail_status", FieldType::String),
    Field::computed("revoked", FieldType::String),
    Field::computed("created_at", FieldType::String),
    Field::computed("is_ready", FieldType::String),
    Field::computed("network", FieldType::Int64List)
        .describe("Servers sharing a private network with this one."),
    Field::computed("tags", FieldType::StringList),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Usage;

    #[test]
    fn test_configurable_resource_fields_force_new() {
        for field in RESOURCE_FIELDS {
            if field.usage.is_configurable() {
                assert!(field.force_new, "{}", field.name);
            }
        }
    }

    #[test]
    fn test_platform_maps_to_provider() {
        let platform = RESOURCE_FIELDS
            .iter()
            .find(|field| field.name == "platform")
            .unwrap();
        assert_eq!(platform.wire_name(), "provider");
        assert_eq!(platform.usage, Usage::Required);
        assert!(platform.allowed.contains(&"hetzner"));
    }
}
