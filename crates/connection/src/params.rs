use std::fmt;

use serde::Serialize;

/// Per-call overrides applied on top of the stored settings.
///
/// Empty strings are treated the same as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOverrides {
    pub role: Option<String>,
    pub warehouse: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
}

impl SessionOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.warehouse = Some(warehouse.into());
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

/// Pick a non-empty override, else the stored value.
pub(crate) fn pick<'a>(over: Option<&'a str>, stored: Option<&'a str>) -> Option<&'a str> {
    over.filter(|s| !s.is_empty())
        .or(stored.filter(|s| !s.is_empty()))
}

/// Cache key for sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SessionKey {
    pub role: String,
    pub warehouse: String,
    pub database: Option<String>,
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.role,
            self.warehouse,
            self.database.as_deref().unwrap_or("-")
        )
    }
}

/// The credential handed to the SDK. Exactly one is chosen.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// External authenticator name (e.g. `externalbrowser`).
    Authenticator(String),
    /// Unencrypted PKCS#8 DER.
    PrivateKey(Vec<u8>),
    Password(String),
}

impl AuthMethod {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthMethod::Authenticator(_) => "authenticator",
            AuthMethod::PrivateKey(_) => "private_key",
            AuthMethod::Password(_) => "password",
        }
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::Authenticator(name) => f.debug_tuple("Authenticator").field(name).finish(),
            AuthMethod::PrivateKey(der) => write!(f, "PrivateKey(<{} bytes>)", der.len()),
            AuthMethod::Password(_) => f.write_str("Password(***)"),
        }
    }
}

/// Fully resolved parameters for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub account: String,
    pub user: String,
    pub role: String,
    pub warehouse: String,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub auth: AuthMethod,
}

impl ConnectionParams {
    pub fn session_key(&self) -> SessionKey {
        SessionKey {
            role: self.role.clone(),
            warehouse: self.warehouse.clone(),
            database: self.database.clone(),
        }
    }

    /// View safe to print or return from an API (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        let mut summary = serde_json::json!({
            "account": self.account,
            "user": self.user,
            "role": self.role,
            "warehouse": self.warehouse,
            "database": self.database,
            "schema": self.schema,
            "auth": self.auth.kind(),
        });
        if let AuthMethod::Authenticator(name) = &self.auth {
            summary["authenticator"] = serde_json::Value::String(name.clone());
        }
        summary
    }
}
