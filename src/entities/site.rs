//! `forge_site`: a site hosted on a server.

use crate::entity::{Field, FieldType};

pub(crate) const DESCRIPTION: &str = "Reads a site hosted on a Laravel Forge server.";

/// Rows of the `forge_site` data source.
pub const FIELDS: &[Field] = &[
    Field::required("server_id", FieldType::Int64).describe("Server hosting the site."),
    Field::required("id", FieldType::Int64).describe("Site identifier."),
    Field::computed("name", FieldType::String).describe("Primary domain."),
    Field::computed("aliases", FieldType::StringList),
    Field::computed("username", FieldType::String),
    Field::computed("directory", FieldType::String),
    Field::computed("wildcards", FieldType::String),
    Field::computed("status", FieldType::String),
    Field::computed("repository", FieldType::String),
    Field::computed("repository_provider", FieldType::String),
    Field::computed("repository_branch", FieldType::String),
    Field::computed("repository_status", FieldType::String),
    Field::computed("quick_deploy", FieldType::String)
        .describe("Whether pushing to the branch triggers a deployment."),
    Field::computed("project_type", FieldType::String),
    Field::computed("app", FieldType::String),
    Field::computed("app_status", FieldType::String),
    Field::computed("slack_channel", FieldType::String),
    Field::computed("telegram_chat_id", FieldType::String),
    Field::computed("telegram_chat_title", FieldType::String),
    Field::computed("deployment_url", FieldType::String),
    Field::computed("created_at", FieldType::String),
    Field::computed("tags", FieldType::StringList),
];
