//! Field tables for every Forge entity kind.
//!
//! Each submodule declares the rows of one kind; the generic adapter in
//! [`crate::entity`] does the rest.

pub mod daemon;
pub mod database;
pub mod deployment;
pub mod server;
pub mod site;

use crate::entity::{EntityKind, Field, Role};

/// Field table of `kind` as a managed resource, if it is one.
pub fn resource_fields(kind: EntityKind) -> Option<&'static [Field]> {
    match kind {
        EntityKind::Server => Some(server::RESOURCE_FIELDS),
        EntityKind::Site | EntityKind::Database | EntityKind::Daemon | EntityKind::Deployment => {
            None
        },
    }
}

/// Field table of `kind` as a data source.
pub fn data_source_fields(kind: EntityKind) -> &'static [Field] {
    match kind {
        EntityKind::Server => server::DATA_SOURCE_FIELDS,
        EntityKind::Site => site::FIELDS,
        EntityKind::Database => database::FIELDS,
        EntityKind::Daemon => daemon::FIELDS,
        EntityKind::Deployment => deployment::FIELDS,
    }
}

/// Schema description of `kind` in `role`.
pub fn description(kind: EntityKind, role: Role) -> &'static str {
    match (kind, role) {
        (EntityKind::Server, Role::Resource) => server::RESOURCE_DESCRIPTION,
        (EntityKind::Server, Role::DataSource) => server::DATA_SOURCE_DESCRIPTION,
        (EntityKind::Site, _) => site::DESCRIPTION,
        (EntityKind::Database, _) => database::DESCRIPTION,
        (EntityKind::Daemon, _) => daemon::DESCRIPTION,
        (EntityKind::Deployment, _) => deployment::DESCRIPTION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Usage;

    #[test]
    fn test_every_table_has_identifying_keys() {
        for kind in EntityKind::ALL {
            let fields = data_source_fields(kind);
            for key in kind.scope_keys().iter().chain(std::iter::once(&"id")) {
                let field = fields
                    .iter()
                    .find(|field| field.name == *key)
                    .unwrap_or_else(|| panic!("{} lacks {}", kind, key));
                assert_eq!(field.usage, Usage::Required, "{}.{}", kind, key);
            }
        }
    }

    #[test]
    fn test_field_names_are_unique() {
        for kind in EntityKind::ALL {
            let mut names: Vec<_> = data_source_fields(kind).iter().map(|f| f.name).collect();
            let total = names.len();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), total, "{}", kind);
        }
    }

    #[test]
    fn test_data_source_attributes_are_read_only() {
        for kind in EntityKind::ALL {
            for field in data_source_fields(kind) {
                assert!(
                    matches!(field.usage, Usage::Required | Usage::Computed),
                    "{}.{}",
                    kind,
                    field.name
                );
            }
        }
    }

    #[test]
    fn test_only_server_is_managed() {
        assert!(resource_fields(EntityKind::Server).is_some());
        for kind in &EntityKind::ALL[1..] {
            assert!(resource_fields(*kind).is_none());
        }
    }
}
