//! `forge_database`: a database on a server.

use crate::entity::{Field, FieldType};

pub(crate) const DESCRIPTION: &str = "Reads a database on a Laravel Forge server.";

/// Rows of the `forge_database` data source.
pub const FIELDS: &[Field] = &[
    Field::required("server_id", FieldType::Int64),
    Field::required("id", FieldType::Int64),
    Field::computed("name", FieldType::String),
    Field::computed("status", FieldType::String),
    Field::computed("created_at", FieldType::String),
];
