//! `forge_deployment`: one entry of a site's deployment history.

use crate::entity::{Field, FieldType};

pub(crate) const DESCRIPTION: &str = "Reads a deployment from a Laravel Forge site's history.";

/// Rows of the `forge_deployment` data source.
pub const FIELDS: &[Field] = &[
    Field::required("server_id", FieldType::Int64),
    Field::required("site_id", FieldType::Int64),
    Field::required("id", FieldType::Int64).describe("Deployment identifier."),
    Field::computed("type", FieldType::Int64).describe("Numeric trigger type."),
    Field::computed("commit_hash", FieldType::String),
    Field::computed("commit_author", FieldType::String),
    Field::computed("commit_message", FieldType::String),
    Field::computed("started_at", FieldType::String),
    Field::computed("ended_at", FieldType::String),
    Field::computed("status", FieldType::String),
    Field::computed("displayable_type", FieldType::String),
];
