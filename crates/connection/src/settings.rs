use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use snowglue_core::env::{active_profile, profiled_env_opt};
use tracing::debug;

use crate::error::ConnectionError;
use crate::key::load_private_key;
use crate::params::{pick, AuthMethod, ConnectionParams, SessionKey, SessionOverrides};

/// Default settings file read by [`ConnectionSettings::from_yaml`] callers.
pub const DEFAULT_SETTINGS_FILE: &str = "snowflake_config.yaml";

pub const DEFAULT_ROLE: &str = "DATASCIENTIST";
pub const DEFAULT_WAREHOUSE: &str = "DS_WH_XS";

/// Query-tag `source` used when no database is configured.
const DEFAULT_TAG_SOURCE: &str = "DATASCIENCE";

/// Top-level YAML key holding the connection fields.
const SETTINGS_SECTION: &str = "snowflake";

// ── ConnectionSettings ────────────────────────────────────────

/// Snowflake connection configuration.
///
/// Supports password, key-pair and external authenticator methods. Built
/// from YAML with environment overrides via [`ConnectionSettings::from_yaml`].
#[derive(Clone, PartialEq)]
pub struct ConnectionSettings {
    pub account: String,
    pub user: String,
    pub password: Option<String>,
    pub private_key_path: Option<PathBuf>,
    pub private_key_pem: Option<String>,
    pub authenticator: Option<String>,
    pub role: String,
    pub warehouse: String,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub query_tag: Option<serde_json::Map<String, serde_json::Value>>,
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |set: bool| if set { Some("***") } else { None };
        f.debug_struct("ConnectionSettings")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("password", &redact(self.password.is_some()))
            .field("private_key_path", &self.private_key_path)
            .field("private_key_pem", &redact(self.private_key_pem.is_some()))
            .field("authenticator", &self.authenticator)
            .field("role", &self.role)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("query_tag", &self.query_tag)
            .finish()
    }
}

impl ConnectionSettings {
    /// Settings with default role and warehouse and no credential.
    pub fn new(account: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            user: user.into(),
            password: None,
            private_key_path: None,
            private_key_pem: None,
            authenticator: None,
            role: DEFAULT_ROLE.to_string(),
            warehouse: DEFAULT_WAREHOUSE.to_string(),
            database: None,
            schema: None,
            query_tag: None,
        }
    }

    /// Build settings from a YAML file, with environment variables overriding
    /// file values. A missing file is not an error; missing `account` or
    /// `user` after merging is.
    ///
    /// Reads `SNOWGLUE_PROFILE` to determine the env profile prefix.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, ConnectionError> {
        Self::from_yaml_profiled(path, &active_profile())
    }

    /// Same as [`from_yaml`](Self::from_yaml) for an explicit profile.
    /// For each variable `{PROFILE}_SNOWFLAKE_*` is tried before `SNOWFLAKE_*`.
    pub fn from_yaml_profiled(path: impl AsRef<Path>, profile: &str) -> Result<Self, ConnectionError> {
        let mut file = SettingsFile::read(path.as_ref())?;
        file.apply_env(profile);
        file.into_settings()
    }

    /// Resolve parameters for one session.
    ///
    /// Credential priority is authenticator, then private key, then password.
    pub fn get_connection_params(&self, overrides: &SessionOverrides) -> Result<ConnectionParams, ConnectionError> {
        let key = self.session_key(overrides);

        let auth = if let Some(name) = &self.authenticator {
            AuthMethod::Authenticator(name.clone())
        } else if self.private_key_pem.is_some() || self.private_key_path.is_some() {
            AuthMethod::PrivateKey(load_private_key(
                self.private_key_pem.as_deref(),
                self.private_key_path.as_deref(),
            )?)
        } else if let Some(password) = &self.password {
            AuthMethod::Password(password.clone())
        } else {
            return Err(ConnectionError::Authentication(
                "No authentication method provided. Please provide either \
                 authenticator, private_key, or password."
                    .into(),
            ));
        };

        Ok(ConnectionParams {
            account: self.account.clone(),
            user: self.user.clone(),
            role: key.role,
            warehouse: key.warehouse,
            database: key.database,
            schema: pick(overrides.schema.as_deref(), self.schema.as_deref()).map(str::to_string),
            auth,
        })
    }

    /// The (role, warehouse, database) a request with `overrides` resolves to.
    pub fn session_key(&self, overrides: &SessionOverrides) -> SessionKey {
        SessionKey {
            role: pick(overrides.role.as_deref(), Some(self.role.as_str()))
                .unwrap_or(DEFAULT_ROLE)
                .to_string(),
            warehouse: pick(overrides.warehouse.as_deref(), Some(self.warehouse.as_str()))
                .unwrap_or(DEFAULT_WAREHOUSE)
                .to_string(),
            database: pick(overrides.database.as_deref(), self.database.as_deref()).map(str::to_string),
        }
    }

    /// Query tag applied when neither the request nor the settings carry one.
    pub fn default_query_tag(&self) -> serde_json::Value {
        serde_json::json!({
            "origin": "snowpark_session",
            "name": self.user,
            "version": { "major": 1, "minor": 0 },
            "attributes": {
                "source": self.database.as_deref().unwrap_or(DEFAULT_TAG_SOURCE),
                "warehouse": self.warehouse,
                "role": self.role,
            }
        })
    }

    /// Configured query tag, falling back to [`default_query_tag`](Self::default_query_tag).
    pub fn query_tag(&self) -> serde_json::Value {
        match &self.query_tag {
            Some(tag) => serde_json::Value::Object(tag.clone()),
            None => self.default_query_tag(),
        }
    }

    /// Name of the credential [`get_connection_params`](Self::get_connection_params)
    /// would pick, without loading any key material.
    pub fn auth_kind(&self) -> Option<&'static str> {
        if self.authenticator.is_some() {
            Some("authenticator")
        } else if self.private_key_pem.is_some() || self.private_key_path.is_some() {
            Some("private_key")
        } else if self.password.is_some() {
            Some("password")
        } else {
            None
        }
    }

    /// Return a redacted view safe for logs and CLI output (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "account": self.account,
            "user": self.user,
            "role": self.role,
            "warehouse": self.warehouse,
            "database": self.database,
            "schema": self.schema,
            "auth": self.auth_kind(),
            "private_key_path": self.private_key_path,
            "query_tag": self.query_tag(),
        })
    }
}

// ── SettingsFile ──────────────────────────────────────────────

/// The `snowflake:` section as written, before defaults and validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    account: Option<String>,
    user: Option<String>,
    password: Option<String>,
    private_key_path: Option<String>,
    private_key_pem: Option<String>,
    authenticator: Option<String>,
    role: Option<String>,
    warehouse: Option<String>,
    database: Option<String>,
    schema: Option<String>,
    query_tag: Option<serde_json::Map<String, serde_json::Value>>,
}

impl SettingsFile {
    fn read(path: &Path) -> Result<Self, ConnectionError> {
        if !path.is_file() {
            debug!(path = %path.display(), "Settings file not found, using environment only");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ConnectionError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        let document: serde_yaml::Value = serde_yaml::from_str(&content).map_err(|e| {
            ConnectionError::Configuration(format!("failed to parse {}: {}", path.display(), e))
        })?;

        let section = match document {
            serde_yaml::Value::Null => return Ok(Self::default()),
            serde_yaml::Value::Mapping(mut root) => root.remove(SETTINGS_SECTION),
            _ => {
                return Err(ConnectionError::Configuration(format!(
                    "{}: expected a mapping at the top level",
                    path.display()
                )))
            }
        };

        match section {
            None | Some(serde_yaml::Value::Null) => Ok(Self::default()),
            Some(section) => serde_yaml::from_value(section).map_err(|e| {
                ConnectionError::Configuration(format!(
                    "invalid `{}` section in {}: {}",
                    SETTINGS_SECTION,
                    path.display(),
                    e
                ))
            }),
        }
    }

    /// Overwrite fields from the environment. Empty variables are ignored.
    fn apply_env(&mut self, profile: &str) {
        let overrides = [
            ("SNOWFLAKE_ACCOUNT", &mut self.account),
            ("SNOWFLAKE_USER", &mut self.user),
            ("SNOWFLAKE_PASSWORD", &mut self.password),
            ("SNOWFLAKE_ROLE", &mut self.role),
            ("SNOWFLAKE_WAREHOUSE", &mut self.warehouse),
            ("SNOWFLAKE_DATABASE", &mut self.database),
            ("SNOWFLAKE_SCHEMA", &mut self.schema),
            ("SNOWFLAKE_PRIVATE_KEY_PATH", &mut self.private_key_path),
            ("SNOWFLAKE_PRIVATE_KEY_PEM", &mut self.private_key_pem),
            ("SNOWFLAKE_AUTHENTICATOR", &mut self.authenticator),
        ];

        for (var, field) in overrides {
            if let Some(value) = profiled_env_opt(profile, var) {
                debug!(var, profile, "Environment override");
                *field = Some(value);
            }
        }
    }

    fn into_settings(self) -> Result<ConnectionSettings, ConnectionError> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        let required = |v: Option<String>, name: &str| {
            non_empty(v).ok_or_else(|| {
                ConnectionError::Configuration(format!("missing required field `{}`", name))
            })
        };

        Ok(ConnectionSettings {
            account: required(self.account, "account")?,
            user: required(self.user, "user")?,
            password: non_empty(self.password),
            private_key_path: non_empty(self.private_key_path).map(PathBuf::from),
            private_key_pem: non_empty(self.private_key_pem),
            authenticator: non_empty(self.authenticator),
            role: non_empty(self.role).unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            warehouse: non_empty(self.warehouse).unwrap_or_else(|| DEFAULT_WAREHOUSE.to_string()),
            database: non_empty(self.database),
            schema: non_empty(self.schema),
            query_tag: self.query_tag,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────
