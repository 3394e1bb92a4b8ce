//! Declarative entity tables and the generic adapter that drives them.
//!
//! Every Forge entity kind is described by a static table of [`Field`]s. The
//! table is the single source for the published schema, for plan-time
//! validation, for mapping API responses into state records and for building
//! request bodies. [`EntityAdapter`] pairs a table with an injected
//! [`ForgeApi`] handle and implements the read/create/update/delete/import
//! lifecycle on top of it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::client::ForgeApi;
use crate::entities;
use crate::error::ProviderError;
use crate::models::CreateServerRequest;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};
use crate::types::{AttributeChange, PlanResult};
use crate::validation;

/// A flat, ordered attribute map holding one entity's state.
///
/// `serde_json::Map` keeps keys sorted, so serializing the same record twice
/// yields identical bytes.
pub type Record = Map<String, Value>;

type Result<T> = std::result::Result<T, ProviderError>;

/// Value type of an entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// A string.
    String,
    /// A 64-bit integer.
    Int64,
    /// An ordered list of strings.
    StringList,
    /// An ordered list of 64-bit integers.
    Int64List,
}

impl FieldType {
    /// The schema type published for this field type.
    pub fn attribute_type(self) -> AttributeType {
        match self {
            Self::String => AttributeType::String,
            Self::Int64 => AttributeType::Int64,
            Self::StringList => AttributeType::list(AttributeType::String),
            Self::Int64List => AttributeType::list(AttributeType::Int64),
        }
    }

    fn element(self) -> Option<FieldType> {
        match self {
            Self::StringList => Some(Self::String),
            Self::Int64List => Some(Self::Int64),
            Self::String | Self::Int64 => None,
        }
    }
}

/// How a field may be supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    /// Must be supplied by the caller.
    Required,
    /// May be supplied by the caller.
    Optional,
    /// May be supplied; otherwise the remote service picks a value.
    OptionalComputed,
    /// Populated only from remote responses.
    Computed,
}

impl Usage {
    fn flags(self) -> AttributeFlags {
        match self {
            Self::Required => AttributeFlags::required(),
            Self::Optional => AttributeFlags::optional(),
            Self::OptionalComputed => AttributeFlags::optional_computed(),
            Self::Computed => AttributeFlags::computed(),
        }
    }

    /// Whether a caller may supply this field.
    pub fn is_configurable(self) -> bool {
        !matches!(self, Self::Computed)
    }
}

/// One row of an entity's field-mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Attribute name in state and configuration.
    pub name: &'static str,
    /// JSON field name in API payloads, when it differs from `name`.
    pub wire: Option<&'static str>,
    /// Value type.
    pub ty: FieldType,
    /// How the field may be supplied.
    pub usage: Usage,
    /// Whether a change to the field replaces the entity.
    pub force_new: bool,
    /// Closed set of accepted values; empty means unrestricted.
    pub allowed: &'static [&'static str],
    /// Human readable description.
    pub description: &'static str,
}

impl Field {
    /// Create a field row.
    pub const fn new(name: &'static str, ty: FieldType, usage: Usage) -> Self {
        Self {
            name,
            wire: None,
            ty,
            usage,
            force_new: false,
            allowed: &[],
            description: "",
        }
    }

    /// A required field.
    pub const fn required(name: &'static str, ty: FieldType) -> Self {
        Self::new(name, ty, Usage::Required)
    }

    /// An optional field.
    pub const fn optional(name: &'static str, ty: FieldType) -> Self {
        Self::new(name, ty, Usage::Optional)
    }

    /// An optional field the remote service fills in when omitted.
    pub const fn optional_computed(name: &'static str, ty: FieldType) -> Self {
        Self::new(name, ty, Usage::OptionalComputed)
    }

    /// A field populated only from remote responses.
    pub const fn computed(name: &'static str, ty: FieldType) -> Self {
        Self::new(name, ty, Usage::Computed)
    }

    /// Map the field to a differently named API field.
    pub const fn wire(self, wire: &'static str) -> Self {
        Self {
            wire: Some(wire),
            ..self
        }
    }

    /// Mark the field as forcing replacement when changed.
    pub const fn force_new(self) -> Self {
        Self {
            force_new: true,
            ..self
        }
    }

    /// Restrict the field to a fixed set of values.
    pub const fn one_of(self, allowed: &'static [&'static str]) -> Self {
        Self { allowed, ..self }
    }

    /// Attach a description.
    pub const fn describe(self, description: &'static str) -> Self {
        Self {
            description,
            ..self
        }
    }

    /// The JSON field name used by the API.
    pub fn wire_name(&self) -> &'static str {
        self.wire.unwrap_or(self.name)
    }

    /// The schema attribute published for this field.
    pub fn attribute(&self) -> Attribute {
        let mut attr = Attribute::new(self.ty.attribute_type(), self.usage.flags())
            .one_of(self.allowed.iter().copied());
        if self.force_new {
            attr = attr.with_force_new();
        }
        if !self.description.is_empty() {
            attr = attr.with_description(self.description);
        }
        attr
    }
}

/// The Forge entity kinds this provider knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// A provisioned server.
    Server,
    /// A site on a server.
    Site,
    /// A database on a server.
    Database,
    /// A daemon on a server.
    Daemon,
    /// A deployment in a site's history.
    Deployment,
}

impl EntityKind {
    /// Every kind, in declaration order.
    pub const ALL: [EntityKind; 5] = [
        Self::Server,
        Self::Site,
        Self::Database,
        Self::Daemon,
        Self::Deployment,
    ];

    /// The type name used in configuration, e.g. `forge_server`.
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Server => "forge_server",
            Self::Site => "forge_site",
            Self::Database => "forge_database",
            Self::Daemon => "forge_daemon",
            Self::Deployment => "forge_deployment",
        }
    }

    /// Look a kind up by its type name.
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_name() == name)
    }

    /// Parent keys needed to address an entity of this kind, outermost first.
    pub const fn scope_keys(self) -> &'static [&'static str] {
        match self {
            Self::Server => &[],
            Self::Site | Self::Database | Self::Daemon => &["server_id"],
            Self::Deployment => &["server_id", "site_id"],
        }
    }

    /// Whether the kind can be created and deleted.
    pub fn is_managed(self) -> bool {
        entities::resource_fields(self).is_some()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Whether an entity is exposed as a managed resource or a read-only data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Managed through the full lifecycle.
    Resource,
    /// Read only.
    DataSource,
}

/// The identifying keys of one remote entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    kind: EntityKind,
    scope: BTreeMap<&'static str, i64>,
    id: i64,
}

impl Address {
    /// Build an address from scope values given in [`EntityKind::scope_keys`] order.
    pub fn new(kind: EntityKind, scope: &[i64], id: i64) -> Result<Self> {
        let keys = kind.scope_keys();
        if keys.len() != scope.len() {
            return Err(ProviderError::InvalidRequest(format!(
                "{} needs {} scope key(s), got {}",
                kind,
                keys.len(),
                scope.len()
            )));
        }
        Ok(Self {
            kind,
            scope: keys.iter().copied().zip(scope.iter().copied()).collect(),
            id,
        })
    }

    /// Read the scope keys and `id` out of a state or configuration object.
    pub fn from_record(kind: EntityKind, record: &Value) -> Result<Self> {
        let id = key_value(record, "id")?;
        Self::from_scope(kind, record, id)
    }

    /// Read the scope keys out of `record` and pair them with `id`.
    pub fn from_scope(kind: EntityKind, record: &Value, id: i64) -> Result<Self> {
        let scope = kind
            .scope_keys()
            .iter()
            .map(|key| key_value(record, key).map(|value| (*key, value)))
            .collect::<Result<_>>()?;
        Ok(Self { kind, scope, id })
    }

    /// Parse an import identifier.
    ///
    /// The identifier lists the scope keys in order followed by the entity
    /// id, separated by `/`: `"123"` for a server, `"1/2"` for a site.
    pub fn parse_import(kind: EntityKind, raw: &str) -> Result<Self> {
        let keys = kind.scope_keys();
        let parts: Vec<&str> = raw.split('/').map(str::trim).collect();
        if parts.len() != keys.len() + 1 {
            let expected = keys
                .iter()
                .copied()
                .chain(std::iter::once("id"))
                .collect::<Vec<_>>()
                .join("/");
            return Err(ProviderError::Validation(format!(
                "Unexpected import identifier `{}` for {}: expected `{}`",
                raw, kind, expected
            )));
        }

        let mut numbers = Vec::with_capacity(parts.len());
        for part in parts {
            let number = part.parse::<i64>().map_err(|_| {
                ProviderError::Validation(format!(
                    "Unexpected import identifier `{}` for {}: `{}` is not an integer",
                    raw, kind, part
                ))
            })?;
            if number <= 0 {
                return Err(ProviderError::Validation(format!(
                    "Unexpected import identifier `{}` for {}: `{}` is not a positive integer",
                    raw, kind, part
                )));
            }
            numbers.push(number);
        }

        let id = numbers.pop().unwrap_or_default();
        Self::new(kind, &numbers, id)
    }

    /// The entity kind.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// The entity id.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// A scope key value.
    pub fn scope(&self, key: &str) -> Result<i64> {
        self.scope.get(key).copied().ok_or_else(|| {
            ProviderError::InvalidRequest(format!("{} has no scope key '{}'", self.kind, key))
        })
    }

    /// The value of an identifying attribute (`id` or a scope key).
    pub fn value_of(&self, name: &str) -> Option<i64> {
        if name == "id" {
            Some(self.id)
        } else {
            self.scope.get(name).copied()
        }
    }

    /// A record holding only the identifying attributes.
    pub fn to_record(&self) -> Record {
        let mut record: Record = self
            .scope
            .iter()
            .map(|(key, value)| (key.to_string(), Value::from(*value)))
            .collect();
        record.insert("id".to_string(), Value::from(self.id));
        record
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for key in self.kind.scope_keys() {
            if let Some(value) = self.scope.get(key) {
                write!(f, "{}/", value)?;
            }
        }
        write!(f, "{}", self.id)
    }
}

fn key_value(record: &Value, key: &str) -> Result<i64> {
    match record.get(key) {
        None | Some(Value::Null) => Err(ProviderError::Validation(format!(
            "Missing required attribute '{}'",
            key
        ))),
        Some(value) => as_int64(value).ok_or_else(|| {
            ProviderError::Validation(format!("Attribute '{}' must be an integer", key))
        }),
    }
}

fn as_int64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Coerce an API value into the representation used in state.
///
/// Strings pass through; booleans and numbers are rendered as strings for
/// string fields; numeric strings are parsed for integer fields; tag objects
/// collapse to their `name`. Anything that cannot be represented becomes null.
pub fn coerce(ty: FieldType, value: Option<&Value>) -> Value {
    let value = match value {
        None | Some(Value::Null) => return Value::Null,
        Some(value) => value,
    };

    match (ty, value) {
        (FieldType::String, Value::String(text)) => Value::String(text.clone()),
        (FieldType::String, Value::Bool(flag)) => Value::String(flag.to_string()),
        (FieldType::String, Value::Number(number)) => Value::String(number.to_string()),
        (FieldType::String, Value::Object(object)) => object
            .get("name")
            .and_then(Value::as_str)
            .map(|name| Value::String(name.to_string()))
            .unwrap_or(Value::Null),
        (FieldType::Int64, value) => as_int64(value).map(Value::from).unwrap_or(Value::Null),
        (list, Value::Array(items)) => match list.element() {
            Some(element) => Value::Array(
                items
                    .iter()
                    .map(|item| coerce(element, Some(item)))
                    .collect(),
            ),
            None => Value::Null,
        },
        _ => Value::Null,
    }
}

/// The field table of one entity kind in one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDef {
    kind: EntityKind,
    role: Role,
    fields: &'static [Field],
}

impl EntityDef {
    /// The resource table for `kind`, if the kind is managed.
    pub fn resource(kind: EntityKind) -> Option<Self> {
        entities::resource_fields(kind).map(|fields| Self {
            kind,
            role: Role::Resource,
            fields,
        })
    }

    /// The data source table for `kind`.
    pub fn data_source(kind: EntityKind) -> Self {
        Self {
            kind,
            role: Role::DataSource,
            fields: entities::data_source_fields(kind),
        }
    }

    /// The entity kind.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// The role the table describes.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The field rows.
    pub fn fields(&self) -> &'static [Field] {
        self.fields
    }

    /// Look a field up by attribute name.
    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// The published schema.
    pub fn schema(&self) -> Schema {
        self.fields.iter().fold(
            Schema::v0().with_description(entities::description(self.kind, self.role)),
            |schema, field| schema.with_attribute(field.name, field.attribute()),
        )
    }

    /// Validate caller configuration against the table.
    pub fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validation::validate(&self.schema(), config)
    }

    /// Validate, turning any error diagnostic into [`ProviderError::Validation`].
    pub fn check(&self, config: &Value) -> Result<()> {
        let errors: Vec<String> = self
            .validate(config)
            .into_iter()
            .filter(Diagnostic::is_error)
            .map(|diagnostic| match diagnostic.detail {
                Some(detail) => format!("{}: {}", diagnostic.summary, detail),
                None => diagnostic.summary,
            })
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::Validation(errors.join("; ")))
        }
    }

    /// Drop computed-only attributes from a state object, keeping what a
    /// caller could have written.
    pub fn configurable_view(&self, state: &Value) -> Value {
        let Some(object) = state.as_object() else {
            return state.clone();
        };
        let view: Record = object
            .iter()
            .filter(|(name, _)| {
                self.field(name)
                    .map_or(true, |field| field.usage.is_configurable())
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Value::Object(view)
    }

    /// Map an API payload into a state record.
    ///
    /// Identifying attributes come from `address`. Configurable attributes
    /// the API leaves empty keep their value from `known`.
    pub fn project(&self, address: &Address, remote: &Value, known: Option<&Record>) -> Record {
        self.fields
            .iter()
            .map(|field| {
                let mut value = match address.value_of(field.name) {
                    Some(key) => Value::from(key),
                    None => coerce(field.ty, remote.get(field.wire_name())),
                };
                if value.is_null() && field.usage.is_configurable() {
                    if let Some(previous) = known.and_then(|record| record.get(field.name)) {
                        value = previous.clone();
                    }
                }
                (field.name.to_string(), value)
            })
            .collect()
    }

    /// Build an API request body from configuration, using wire names.
    pub fn to_wire(&self, config: &Value) -> Value {
        let body: Record = self
            .fields
            .iter()
            .filter(|field| field.usage.is_configurable())
            .filter_map(|field| {
                let value = coerce(field.ty, config.get(field.name));
                (!value.is_null()).then(|| (field.wire_name().to_string(), value))
            })
            .collect();
        Value::Object(body)
    }

    /// Compute the planned state and attribute changes.
    ///
    /// A null `proposed` plans a destroy. Otherwise the configuration is
    /// validated first; computed attributes carry over from `prior`, and any
    /// change to a force-new attribute plans a replacement.
    pub fn plan(&self, prior: Option<&Value>, proposed: &Value, config: &Value) -> Result<PlanResult> {
        let prior = prior.and_then(Value::as_object);

        if proposed.is_null() {
            let changes = prior
                .map(|object| {
                    object
                        .iter()
                        .filter(|(_, value)| !value.is_null())
                        .map(|(name, value)| AttributeChange::removed(name.clone(), value.clone()))
                        .collect()
                })
                .unwrap_or_default();
            return Ok(PlanResult::with_changes(Value::Null, changes, false));
        }

        let to_check = if config.is_null() {
            self.configurable_view(proposed)
        } else {
            config.clone()
        };
        self.check(&to_check)?;

        let mut planned = Record::new();
        let mut inherited = Vec::new();
        for field in self.fields {
            let proposed_value = proposed.get(field.name).cloned().unwrap_or(Value::Null);
            let prior_value = prior
                .and_then(|object| object.get(field.name))
                .cloned()
                .unwrap_or(Value::Null);

            let value = match field.usage {
                Usage::Computed => {
                    inherited.push(field.name);
                    prior_value
                },
                Usage::OptionalComputed if proposed_value.is_null() => {
                    inherited.push(field.name);
                    prior_value
                },
                _ => proposed_value,
            };
            planned.insert(field.name.to_string(), value);
        }

        let Some(prior) = prior else {
            let changes = self
                .fields
                .iter()
                .filter(|field| field.usage.is_configurable())
                .filter_map(|field| {
                    planned
                        .get(field.name)
                        .filter(|value| !value.is_null())
                        .map(|value| AttributeChange::added(field.name, value.clone()))
                })
                .collect();
            return Ok(PlanResult::with_changes(Value::Object(planned), changes, false));
        };

        let mut changes = Vec::new();
        let mut requires_replace = false;
        for field in self.fields.iter().filter(|field| field.usage.is_configurable()) {
            let before = prior.get(field.name).cloned().unwrap_or(Value::Null);
            let after = planned.get(field.name).cloned().unwrap_or(Value::Null);
            if before == after {
                continue;
            }
            requires_replace |= field.force_new;
            changes.push(match (before.is_null(), after.is_null()) {
                (true, _) => AttributeChange::added(field.name, after),
                (_, true) => AttributeChange::removed(field.name, before),
                _ => AttributeChange::modified(field.name, before, after),
            });
        }

        if requires_replace {
            // the replacement is a new remote entity
            for name in inherited {
                planned.insert(name.to_string(), Value::Null);
            }
        }

        Ok(PlanResult::with_changes(
            Value::Object(planned),
            changes,
            requires_replace,
        ))
    }
}

/// Lifecycle operations for one entity kind, backed by an injected API handle.
#[derive(Clone)]
pub struct EntityAdapter {
    def: EntityDef,
    client: Arc<dyn ForgeApi>,
}

impl fmt::Debug for EntityAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityAdapter")
            .field("kind", &self.def.kind)
            .field("role", &self.def.role)
            .finish_non_exhaustive()
    }
}

impl EntityAdapter {
    /// Create an adapter for a table.
    pub fn new(def: EntityDef, client: Arc<dyn ForgeApi>) -> Self {
        Self { def, client }
    }

    /// Create a managed-resource adapter.
    pub fn resource(kind: EntityKind, client: Arc<dyn ForgeApi>) -> Result<Self> {
        let def = EntityDef::resource(kind).ok_or_else(|| {
            ProviderError::UnknownResource(format!("{} is not a managed resource", kind))
        })?;
        Ok(Self::new(def, client))
    }

    /// Create a data-source adapter.
    pub fn data_source(kind: EntityKind, client: Arc<dyn ForgeApi>) -> Self {
        Self::new(EntityDef::data_source(kind), client)
    }

    /// The field table.
    pub fn def(&self) -> &EntityDef {
        &self.def
    }

    /// Fetch an entity and map every attribute from the response.
    ///
    /// A missing entity is reported as [`ProviderError::NotFound`].
    #[instrument(skip_all, fields(kind = %self.def.kind, address = %address))]
    pub async fn read(&self, address: &Address) -> Result<Record> {
        self.refresh(address, None).await
    }

    /// Refresh a stored state object.
    pub async fn read_state(&self, current: &Value) -> Result<Record> {
        let address = Address::from_record(self.def.kind, current)?;
        self.refresh(&address, current.as_object()).await
    }

    /// Validate a data-source configuration and read the entity it names.
    pub async fn read_config(&self, config: &Value) -> Result<Record> {
        self.def.check(config)?;
        let address = Address::from_record(self.def.kind, config)?;
        self.read(&address).await
    }

    async fn refresh(&self, address: &Address, known: Option<&Record>) -> Result<Record> {
        let remote = self.fetch(address).await?;
        debug!(kind = %self.def.kind, address = %address, "fetched entity");
        Ok(self.def.project(address, &remote, known))
    }

    async fn fetch(&self, address: &Address) -> Result<Value> {
        let id = address.id();
        let value = match address.kind() {
            EntityKind::Server => serde_json::to_value(self.client.get_server(id).await?)?,
            EntityKind::Site => {
                let server_id = address.scope("server_id")?;
                serde_json::to_value(self.client.get_site(server_id, id).await?)?
            },
            EntityKind::Database => {
                let server_id = address.scope("server_id")?;
                serde_json::to_value(self.client.get_database(server_id, id).await?)?
            },
            EntityKind::Daemon => {
                let server_id = address.scope("server_id")?;
                serde_json::to_value(self.client.get_daemon(server_id, id).await?)?
            },
            EntityKind::Deployment => {
                let server_id = address.scope("server_id")?;
                let site_id = address.scope("site_id")?;
                serde_json::to_value(self.client.get_deployment(server_id, site_id, id).await?)?
            },
        };
        Ok(value)
    }

    /// Create the entity described by `config`.
    ///
    /// The configuration is validated before any remote call is issued.
    #[instrument(skip(self, config), fields(kind = %self.def.kind))]
    pub async fn create(&self, config: &Value) -> Result<Record> {
        let config = self.def.configurable_view(config);
        self.def.check(&config)?;

        let created = match self.def.kind {
            EntityKind::Server => {
                let request: CreateServerRequest =
                    serde_json::from_value(self.def.to_wire(&config))?;
                serde_json::to_value(self.client.create_server(&request).await?)?
            },
            other => {
                return Err(ProviderError::Unimplemented(format!(
                    "{} cannot be created",
                    other
                )))
            },
        };

        let id = created.get("id").and_then(as_int64).ok_or_else(|| {
            ProviderError::remote(None, format!("create {} response has no id", self.def.kind))
        })?;
        let address = Address::from_scope(self.def.kind, &config, id)?;
        info!(kind = %self.def.kind, address = %address, "entity created");

        Ok(self.def.project(&address, &created, config.as_object()))
    }

    /// In-place updates are not supported: every configurable attribute
    /// forces replacement, so a plan never routes here.
    pub async fn update(&self, prior: &Value, desired: &Value) -> Result<Record> {
        let _ = (prior, desired);
        Err(ProviderError::Unimplemented(format!(
            "{} does not support in-place updates",
            self.def.kind
        )))
    }

    /// Delete the entity a state object refers to.
    ///
    /// An entity that is already gone counts as deleted.
    #[instrument(skip(self, state), fields(kind = %self.def.kind))]
    pub async fn delete(&self, state: &Value) -> Result<()> {
        let address = Address::from_record(self.def.kind, state)?;
        let result = match self.def.kind {
            EntityKind::Server => self.client.delete_server(address.id()).await,
            other => Err(ProviderError::Unimplemented(format!(
                "{} cannot be deleted",
                other
            ))),
        };

        match result {
            Err(err) if err.is_not_found() => {
                debug!(address = %address, "entity already deleted");
                Ok(())
            },
            Err(err) => Err(err),
            Ok(()) => {
                info!(kind = %self.def.kind, address = %address, "entity deleted");
                Ok(())
            },
        }
    }

    /// Turn an import identifier into the identifying attributes of a state
    /// object. No remote call is made.
    pub fn import(&self, raw_id: &str) -> Result<Record> {
        Ok(Address::parse_import(self.def.kind, raw_id)?.to_record())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Server, Site};
    use crate::testing::StubForgeApi;
    use serde_json::json;

    fn server_adapter(stub: &Arc<StubForgeApi>) -> EntityAdapter {
        EntityAdapter::resource(EntityKind::Server, stub.clone()).unwrap()
    }

    #[test]
    fn test_coerce_strings() {
        assert_eq!(coerce(FieldType::String, Some(&json!("a"))), json!("a"));
        assert_eq!(coerce(FieldType::String, Some(&json!(true))), json!("true"));
        assert_eq!(coerce(FieldType::String, Some(&json!(42))), json!("42"));
        assert_eq!(
            coerce(FieldType::String, Some(&json!({"id": 1, "name": "prod"}))),
            json!("prod")
        );
        assert_eq!(coerce(FieldType::String, Some(&json!(null))), Value::Null);
        assert_eq!(coerce(FieldType::String, None), Value::Null);
    }

    #[test]
    fn test_coerce_integers_and_lists() {
        assert_eq!(coerce(FieldType::Int64, Some(&json!(7))), json!(7));
        assert_eq!(coerce(FieldType::Int64, Some(&json!("8"))), json!(8));
        assert_eq!(coerce(FieldType::Int64, Some(&json!(9.0))), json!(9));
        assert_eq!(coerce(FieldType::Int64, Some(&json!("x"))), Value::Null);
        assert_eq!(
            coerce(FieldType::Int64List, Some(&json!([1, "2"]))),
            json!([1, 2])
        );
        assert_eq!(
            coerce(
                FieldType::StringList,
                Some(&json!([{"id": 1, "name": "a"}, "b"]))
            ),
            json!(["a", "b"])
        );
        assert_eq!(coerce(FieldType::StringList, Some(&json!("a"))), Value::Null);
        assert_eq!(coerce(FieldType::StringList, None), Value::Null);
    }

    #[test]
    fn test_kind_registry() {
        assert_eq!(EntityKind::from_type_name("forge_site"), Some(EntityKind::Site));
        assert_eq!(EntityKind::from_type_name("forge_nope"), None);
        assert!(EntityKind::Server.is_managed());
        assert!(!EntityKind::Deployment.is_managed());
        assert_eq!(
            EntityKind::Deployment.scope_keys(),
            &["server_id", "site_id"]
        );
    }

    #[test]
    fn test_parse_import() {
        let address = Address::parse_import(EntityKind::Server, "123").unwrap();
        assert_eq!(address.id(), 123);
        assert_eq!(address.to_record(), json!({"id": 123}).as_object().cloned().unwrap());

        let address = Address::parse_import(EntityKind::Site, "1/2").unwrap();
        assert_eq!(address.scope("server_id").unwrap(), 1);
        assert_eq!(address.id(), 2);
        assert_eq!(address.to_string(), "1/2");

        let address = Address::parse_import(EntityKind::Deployment, "1/2/3").unwrap();
        assert_eq!(address.scope("site_id").unwrap(), 2);

        for bad in ["", "abc", "1/2", "1/x"] {
            let err = Address::parse_import(EntityKind::Server, bad).unwrap_err();
            assert!(matches!(err, ProviderError::Validation(_)), "{}", bad);
        }
        let err = Address::parse_import(EntityKind::Site, "5").unwrap_err();
        assert!(err.message().contains("server_id/id"));
    }

    #[test]
    fn test_parse_import_rejects_non_positive_ids() {
        for (kind, bad) in [
            (EntityKind::Server, "0"),
            (EntityKind::Server, "-5"),
            (EntityKind::Site, "0/0"),
            (EntityKind::Site, "1/-2"),
            (EntityKind::Deployment, "1/0/3"),
        ] {
            let err = Address::parse_import(kind, bad).unwrap_err();
            assert!(matches!(err, ProviderError::Validation(_)), "{}", bad);
            assert!(err.message().contains("is not a positive integer"), "{}", bad);
        }

        let address = Address::parse_import(EntityKind::Daemon, "1/2").unwrap();
        assert_eq!(address.scope("server_id").unwrap(), 1);
        assert_eq!(address.id(), 2);
    }

    #[test]
    fn test_address_from_record() {
        let address =
            Address::from_record(EntityKind::Daemon, &json!({"server_id": 4, "id": 5})).unwrap();
        assert_eq!(address.value_of("server_id"), Some(4));
        assert_eq!(address.value_of("id"), Some(5));
        assert_eq!(address.value_of("name"), None);

        let err = Address::from_record(EntityKind::Daemon, &json!({"id": 5})).unwrap_err();
        assert!(err.message().contains("server_id"));

        let err = Address::from_record(EntityKind::Server, &json!({"id": "abc"})).unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[test]
    fn test_schema_from_table() {
        let schema = EntityDef::resource(EntityKind::Server).unwrap().schema();
        let platform = schema.attribute("platform").unwrap();
        assert!(platform.flags.required);
        assert!(platform.force_new);
        assert!(platform.allowed_values.contains(&"ocean2".to_string()));
        assert!(schema.attribute("id").unwrap().flags.is_computed_only());

        let schema = EntityDef::data_source(EntityKind::Deployment).schema();
        assert!(schema.attribute("site_id").unwrap().flags.required);
        assert_eq!(
            schema.attribute("type").unwrap().attr_type,
            AttributeType::Int64
        );
    }

    #[test]
    fn test_to_wire_uses_wire_names() {
        let def = EntityDef::resource(EntityKind::Server).unwrap();
        let body = def.to_wire(&json!({
            "platform": "ocean2",
            "credential_id": 3.0,
            "name": null,
            "ip_address": "10.0.0.1"
        }));
        assert_eq!(body, json!({"provider": "ocean2", "credential_id": 3}));
    }

    #[test]
    fn test_project_keeps_known_configurable_values() {
        let def = EntityDef::resource(EntityKind::Server).unwrap();
        let address = Address::new(EntityKind::Server, &[], 9).unwrap();
        let known = json!({"platform": "aws", "region": "us-east-1", "ip_address": "old"});
        let record = def.project(
            &address,
            &json!({"id": 9, "provider": "aws", "ip_address": null, "is_ready": true}),
            known.as_object(),
        );

        assert_eq!(record["id"], 9);
        assert_eq!(record["platform"], "aws");
        assert_eq!(record["region"], "us-east-1");
        assert_eq!(record["ip_address"], Value::Null);
        assert_eq!(record["is_ready"], "true");
    }

    #[test]
    fn test_plan_create_leaves_computed_unknown() {
        let def = EntityDef::resource(EntityKind::Server).unwrap();
        let config = json!({"platform": "ocean2", "region": "ams3"});
        let plan = def.plan(None, &config, &config).unwrap();

        assert!(!plan.requires_replace);
        assert_eq!(plan.planned_state["platform"], "ocean2");
        assert_eq!(plan.planned_state["id"], Value::Null);
        let paths: Vec<_> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["platform", "region"]);
    }

    #[test]
    fn test_plan_update_copies_computed_from_prior() {
        let def = EntityDef::resource(EntityKind::Server).unwrap();
        let prior = json!({"id": 123, "platform": "ocean2", "name": "web-1", "ip_address": "1.2.3.4"});
        let config = json!({"platform": "ocean2"});
        let plan = def.plan(Some(&prior), &config, &config).unwrap();

        assert!(plan.changes.is_empty());
        assert!(!plan.requires_replace);
        assert_eq!(plan.planned_state["id"], 123);
        assert_eq!(plan.planned_state["name"], "web-1");
        assert_eq!(plan.planned_state["ip_address"], "1.2.3.4");
    }

    #[test]
    fn test_plan_force_new_change_replaces() {
        let def = EntityDef::resource(EntityKind::Server).unwrap();
        let prior = json!({"id": 123, "platform": "ocean2", "ip_address": "1.2.3.4"});
        let config = json!({"platform": "aws"});
        let plan = def.plan(Some(&prior), &config, &config).unwrap();

        assert!(plan.requires_replace);
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].before, Some(json!("ocean2")));
        assert_eq!(plan.planned_state["id"], Value::Null);
        assert_eq!(plan.planned_state["ip_address"], Value::Null);
    }

    #[test]
    fn test_plan_destroy_removes_every_set_attribute() {
        let def = EntityDef::resource(EntityKind::Server).unwrap();
        let prior = json!({"id": 123, "platform": "ocean2", "region": null});
        let plan = def.plan(Some(&prior), &Value::Null, &Value::Null).unwrap();

        assert_eq!(plan.planned_state, Value::Null);
        assert_eq!(plan.changes.len(), 2);
        assert!(plan.changes.iter().all(|c| c.after.is_none()));
    }

    #[test]
    fn test_plan_rejects_invalid_enum() {
        let def = EntityDef::resource(EntityKind::Server).unwrap();
        let config = json!({"platform": "mainframe"});
        let err = def.plan(None, &config, &config).unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(err.message().contains("platform"));
    }

    #[tokio::test]
    async fn test_create_then_read() {
        let stub = Arc::new(StubForgeApi::new());
        let adapter = server_adapter(&stub);

        let created = adapter
            .create(&json!({"platform": "ocean2", "type": "web", "id": null}))
            .await
            .unwrap();
        assert_eq!(created["id"], 123);
        assert_eq!(created["platform"], "ocean2");
        assert_eq!(created["type"], "web");

        let address = Address::new(EntityKind::Server, &[], 123).unwrap();
        let read = adapter.read(&address).await.unwrap();
        assert_eq!(read["platform"], "ocean2");
        assert_eq!(read["type"], "web");
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_create_validates_before_calling() {
        let stub = Arc::new(StubForgeApi::new());
        let adapter = server_adapter(&stub);

        let err = adapter
            .create(&json!({"platform": "ocean2", "type": "mainframe"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let stub = Arc::new(StubForgeApi::new());
        let adapter = EntityAdapter::data_source(EntityKind::Site, stub.clone());

        let err = adapter
            .read_config(&json!({"server_id": 123, "id": 123}))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_read_site_projects_fields() {
        let stub = Arc::new(StubForgeApi::new().with_site(
            5,
            Site {
                id: 6,
                name: Some("example.com".to_string()),
                aliases: vec!["www.example.com".to_string()],
                quick_deploy: Some(false),
                ..Default::default()
            },
        ));
        let adapter = EntityAdapter::data_source(EntityKind::Site, stub.clone());

        let record = adapter
            .read_config(&json!({"server_id": 5, "id": 6}))
            .await
            .unwrap();
        assert_eq!(record["server_id"], 5);
        assert_eq!(record["id"], 6);
        assert_eq!(record["name"], "example.com");
        assert_eq!(record["aliases"], json!(["www.example.com"]));
        assert_eq!(record["quick_deploy"], "false");
        assert_eq!(record["tags"], json!([]));
    }

    #[tokio::test]
    async fn test_read_is_idempotent() {
        let stub = Arc::new(StubForgeApi::new().with_server(Server {
            id: 77,
            provider: Some("hetzner".to_string()),
            network: vec![1, 2],
            ..Default::default()
        }));
        let adapter = EntityAdapter::data_source(EntityKind::Server, stub.clone());
        let address = Address::new(EntityKind::Server, &[], 77).unwrap();

        let first = serde_json::to_vec(&adapter.read(&address).await.unwrap()).unwrap();
        let second = serde_json::to_vec(&adapter.read(&address).await.unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_update_is_unsupported() {
        let stub = Arc::new(StubForgeApi::new());
        let adapter = server_adapter(&stub);
        let err = adapter
            .update(&json!({"id": 1}), &json!({"id": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unimplemented(_)));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_delete_missing_is_success() {
        let stub = Arc::new(StubForgeApi::new());
        let adapter = server_adapter(&stub);
        adapter.delete(&json!({"id": 404})).await.unwrap();
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_server() {
        let stub = Arc::new(StubForgeApi::new().with_server(Server {
            id: 10,
            ..Default::default()
        }));
        let adapter = server_adapter(&stub);
        adapter.delete(&json!({"id": 10})).await.unwrap();
        assert!(stub.server(10).is_none());
    }

    #[test]
    fn test_import_builds_identifying_state() {
        let stub = Arc::new(StubForgeApi::new());
        let adapter = server_adapter(&stub);
        let record = adapter.import("123").unwrap();
        assert_eq!(Value::Object(record), json!({"id": 123}));
        assert_eq!(stub.calls(), 0);
    }

    #[test]
    fn test_resource_adapter_requires_managed_kind() {
        let stub = Arc::new(StubForgeApi::new());
        let err = EntityAdapter::resource(EntityKind::Site, stub).unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }
}
