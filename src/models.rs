//! Wire models for the Forge API.
//!
//! Fields mirror the JSON the API returns. Everything except the identifier
//! is optional so that sparse or partially provisioned entities still decode,
//! and scalar fields accept the loose typing the API is known for: numbers
//! where strings are documented, numeric strings where integers are, and
//! `null` for lists.

use serde::{Deserialize, Serialize};

mod lenient {
    //! `deserialize_with` helpers mirroring the record coercion rules.

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::Tag;

    fn to_string(value: Value) -> Option<String> {
        match value {
            Value::String(text) => Some(text),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }

    fn to_int64(value: &Value) -> Option<i64> {
        match value {
            Value::Number(number) => number.as_i64().or_else(|| {
                number
                    .as_f64()
                    .filter(|float| float.fract() == 0.0)
                    .map(|float| float as i64)
            }),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    fn to_bool(value: &Value) -> Option<bool> {
        match value {
            Value::Bool(flag) => Some(*flag),
            Value::Number(number) => number.as_i64().map(|n| n != 0),
            Value::String(text) => match text.trim() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn elements<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Value>, D::Error> {
        Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<Value>::deserialize(deserializer)?.and_then(to_string))
    }

    pub fn int64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        Ok(Option::<Value>::deserialize(deserializer)?
            .as_ref()
            .and_then(to_int64))
    }

    pub fn boolean<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
        Ok(Option::<Value>::deserialize(deserializer)?
            .as_ref()
            .and_then(to_bool))
    }

    pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let value = Value::deserialize(deserializer)?;
        to_int64(&value).ok_or_else(|| D::Error::custom(format!("invalid identifier {}", value)))
    }

    // non-scalar elements are dropped
    pub fn int64_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<i64>, D::Error> {
        Ok(elements(deserializer)?.iter().filter_map(to_int64).collect())
    }

    pub fn string_list<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<String>, D::Error> {
        Ok(elements(deserializer)?
            .into_iter()
            .filter_map(to_string)
            .collect())
    }

    pub fn tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Tag>, D::Error> {
        Ok(elements(deserializer)?
            .into_iter()
            .filter_map(|value| match value {
                Value::Object(_) => serde_json::from_value(value).ok(),
                other => to_string(other).map(|name| Tag {
                    id: None,
                    name: Some(name),
                }),
            })
            .collect())
    }
}

/// A tag attached to a server or site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag identifier.
    #[serde(default, deserialize_with = "lenient::int64")]
    pub id: Option<i64>,
    /// Tag name.
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: Option<String>,
}

/// A provisioned server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Server {
    /// Server identifier.
    #[serde(deserialize_with = "lenient::id")]
    pub id: i64,
    /// Credential used to provision the server.
    #[serde(default, deserialize_with = "lenient::int64")]
    pub credential_id: Option<i64>,
    /// Server name.
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: Option<String>,
    /// Server role (`app`, `web`, ...).
    #[serde(default, rename = "type", deserialize_with = "lenient::string")]
    pub server_type: Option<String>,
    /// Infrastructure platform (`ocean2`, `aws`, ...).
    #[serde(default, deserialize_with = "lenient::string")]
    pub provider: Option<String>,
    /// Platform size slug.
    #[serde(default, deserialize_with = "lenient::string")]
    pub size: Option<String>,
    /// Platform region slug.
    #[serde(default, deserialize_with = "lenient::string")]
    pub region: Option<String>,
    /// Default PHP version.
    #[serde(default, deserialize_with = "lenient::string")]
    pub php_version: Option<String>,
    /// PHP version used on the command line.
    #[serde(default, deserialize_with = "lenient::string")]
    pub php_cli_version: Option<String>,
    /// OPcache state.
    #[serde(default, deserialize_with = "lenient::string")]
    pub opcache_status: Option<String>,
    /// Installed database engine.
    #[serde(default, deserialize_with = "lenient::string")]
    pub database_type: Option<String>,
    /// Public IP address.
    #[serde(default, deserialize_with = "lenient::string")]
    pub ip_address: Option<String>,
    /// Private network IP address.
    #[serde(default, deserialize_with = "lenient::string")]
    pub private_ip_address: Option<String>,
    /// Blackfire integration state.
    #[serde(default, deserialize_with = "lenient::string")]
    pub blackfire_status: Option<String>,
    /// Papertrail integration state.
    #[serde(default, deserialize_with = "lenient::string")]
    pub papertrail_status: Option<String>,
    /// Whether Forge's access to the server has been revoked.
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub revoked: Option<bool>,
    /// Creation timestamp.
    #[serde(default, deserialize_with = "lenient::string")]
    pub created_at: Option<String>,
    /// Whether provisioning has finished.
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub is_ready: Option<bool>,
    /// Servers on the same private network.
    #[serde(default, deserialize_with = "lenient::int64_list")]
    pub network: Vec<i64>,
    /// Tags.
    #[serde(default, deserialize_with = "lenient::tags")]
    pub tags: Vec<Tag>,
}

/// Body of `POST servers`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateServerRequest {
    /// Infrastructure platform.
    pub provider: String,
    /// Server role.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub server_type: Option<String>,
    /// Server name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Credential used to provision the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<i64>,
    /// Platform region slug.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Platform size slug.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// PHP version to install.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub php_version: Option<String>,
}

/// A site hosted on a server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Site identifier.
    #[serde(deserialize_with = "lenient::id")]
    pub id: i64,
    /// Owning server.
    #[serde(default, deserialize_with = "lenient::int64")]
    pub server_id: Option<i64>,
    /// Primary domain.
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: Option<String>,
    /// Additional domains.
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub aliases: Vec<String>,
    /// Isolated system user.
    #[serde(default, deserialize_with = "lenient::string")]
    pub username: Option<String>,
    /// Web directory.
    #[serde(default, deserialize_with = "lenient::string")]
    pub directory: Option<String>,
    /// Whether wildcard sub-domains are enabled.
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub wildcards: Option<bool>,
    /// Installation status.
    #[serde(default, deserialize_with = "lenient::string")]
    pub status: Option<String>,
    /// Repository slug.
    #[serde(default, deserialize_with = "lenient::string")]
    pub repository: Option<String>,
    /// Repository host.
    #[serde(default, deserialize_with = "lenient::string")]
    pub repository_provider: Option<String>,
    /// Deployed branch.
    #[serde(default, deserialize_with = "lenient::string")]
    pub repository_branch: Option<String>,
    /// Repository installation status.
    #[serde(default, deserialize_with = "lenient::string")]
    pub repository_status: Option<String>,
    /// Whether pushes trigger a deployment.
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub quick_deploy: Option<bool>,
    /// Project type (`php`, `html`, ...).
    #[serde(default, deserialize_with = "lenient::string")]
    pub project_type: Option<String>,
    /// Installed application.
    #[serde(default, deserialize_with = "lenient::string")]
    pub app: Option<String>,
    /// Installed application status.
    #[serde(default, deserialize_with = "lenient::string")]
    pub app_status: Option<String>,
    /// Slack notification channel.
    #[serde(default, deserialize_with = "lenient::string")]
    pub slack_channel: Option<String>,
    /// Telegram chat identifier.
    #[serde(default, deserialize_with = "lenient::string")]
    pub telegram_chat_id: Option<String>,
    /// Telegram chat title.
    #[serde(default, deserialize_with = "lenient::string")]
    pub telegram_chat_title: Option<String>,
    /// Deployment trigger URL.
    #[serde(default, deserialize_with = "lenient::string")]
    pub deployment_url: Option<String>,
    /// Creation timestamp.
    #[serde(default, deserialize_with = "lenient::string")]
    pub created_at: Option<String>,
    /// Tags.
    #[serde(default, deserialize_with = "lenient::tags")]
    pub tags: Vec<Tag>,
}

/// A database on a server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    /// Database identifier.
    #[serde(deserialize_with = "lenient::id")]
    pub id: i64,
    /// Database name.
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: Option<String>,
    /// Installation status.
    #[serde(default, deserialize_with = "lenient::string")]
    pub status: Option<String>,
    /// Creation timestamp.
    #[serde(default, deserialize_with = "lenient::string")]
    pub created_at: Option<String>,
}

/// A supervised background process on a server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Daemon {
    /// Daemon identifier.
    #[serde(deserialize_with = "lenient::id")]
    pub id: i64,
    /// Command line.
    #[serde(default, deserialize_with = "lenient::string")]
    pub command: Option<String>,
    /// System user the command runs as.
    #[serde(default, deserialize_with = "lenient::string")]
    pub user: Option<String>,
    /// Working directory.
    #[serde(default, deserialize_with = "lenient::string")]
    pub directory: Option<String>,
    /// Number of processes.
    #[serde(default, deserialize_with = "lenient::int64")]
    pub processes: Option<i64>,
    /// Seconds a process must stay up to count as started.
    #[serde(default, deserialize_with = "lenient::int64")]
    pub startsecs: Option<i64>,
    /// Seconds to wait after the stop signal.
    #[serde(default, deserialize_with = "lenient::int64")]
    pub stopwaitsecs: Option<i64>,
    /// Signal used to stop the process.
    #[serde(default, deserialize_with = "lenient::string")]
    pub stopsignal: Option<String>,
    /// Installation status.
    #[serde(default, deserialize_with = "lenient::string")]
    pub status: Option<String>,
    /// Creation timestamp.
    #[serde(default, deserialize_with = "lenient::string")]
    pub created_at: Option<String>,
}

/// One entry of a site's deployment history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Deployment identifier.
    #[serde(deserialize_with = "lenient::id")]
    pub id: i64,
    /// Owning server.
    #[serde(default, deserialize_with = "lenient::int64")]
    pub server_id: Option<i64>,
    /// Owning site.
    #[serde(default, deserialize_with = "lenient::int64")]
    pub site_id: Option<i64>,
    /// Numeric deployment trigger type.
    #[serde(default, rename = "type", deserialize_with = "lenient::int64")]
    pub deployment_type: Option<i64>,
    /// Deployed commit.
    #[serde(default, deserialize_with = "lenient::string")]
    pub commit_hash: Option<String>,
    /// Author of the deployed commit.
    #[serde(default, deserialize_with = "lenient::string")]
    pub commit_author: Option<String>,
    /// Message of the deployed commit.
    #[serde(default, deserialize_with = "lenient::string")]
    pub commit_message: Option<String>,
    /// Start timestamp.
    #[serde(default, deserialize_with = "lenient::string")]
    pub started_at: Option<String>,
    /// End timestamp.
    #[serde(default, deserialize_with = "lenient::string")]
    pub ended_at: Option<String>,
    /// Outcome (`finished`, `failed`, ...).
    #[serde(default, deserialize_with = "lenient::string")]
    pub status: Option<String>,
    /// Human readable trigger type.
    #[serde(default, deserialize_with = "lenient::string")]
    pub displayable_type: Option<String>,
}

// Single-key envelopes the API wraps every entity in.

#[derive(Debug, Deserialize)]
pub(crate) struct ServerEnvelope {
    pub server: Server,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SiteEnvelope {
    pub site: Site,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DatabaseEnvelope {
    pub database: Database,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DaemonEnvelope {
    pub daemon: Daemon,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeploymentEnvelope {
    pub deployment: Deployment,
}
