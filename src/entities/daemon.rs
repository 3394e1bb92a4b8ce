//! `forge_daemon`: a supervised background process.

use crate::entity::{Field, FieldType};

pub(crate) const DESCRIPTION: &str = "Reads a daemon running on a Laravel Forge server.";

/// Rows of the `forge_daemon` data source.
pub const FIELDS: &[Field] = &[
    Field::required("server_id", FieldType::Int64),
    Field::required("id", FieldType::Int64),
    Field::computed("command", FieldType::String),
    Field::computed("user", FieldType::String),
    Field::computed("directory", FieldType::String),
    Field::computed("processes", FieldType::Int64),
    Field::computed("startsecs", FieldType::Int64)
        .describe("Seconds a process must stay up to count as started."),
    Field::computed("stopwaitsecs", FieldType::Int64),
    Field::computed("stopsignal", FieldType::String),
    Field::computed("status", FieldType::String),
    Field::computed("created_at", FieldType::String),
];
