//! [`SessionFactory`] backed by `snowflake-connector-rs`.
//!
//! Enabled with the `snowflake` cargo feature. Resolved [`ConnectionParams`]
//! map onto a `SnowflakeClient`; session statements go over the REST API as
//! plain SQL.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pkcs8::LineEnding;
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rsa::RsaPrivateKey;
use snowflake_connector_rs::{SnowflakeAuthMethod, SnowflakeClient, SnowflakeClientConfig};
use tracing::{debug, info};

use crate::error::SdkError;
use crate::params::{AuthMethod, ConnectionParams};
use crate::session::{query_tag_statement, use_schema_statement, Session, SessionFactory};

const KEY_PASSPHRASE_LEN: usize = 32;

/// Opens sessions against a Snowflake account.
#[derive(Debug, Default)]
pub struct SnowflakeSessionFactory {
    opened: AtomicUsize,
}

impl SnowflakeSessionFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionFactory for SnowflakeSessionFactory {
    type Session = SnowflakeSession;

    async fn create(&self, params: &ConnectionParams) -> Result<SnowflakeSession, SdkError> {
        let client = SnowflakeClient::new(&params.user, auth_method(&params.auth)?, client_config(params))
            .map_err(|e| SdkError::new(e.to_string()))?;
        let inner = client
            .create_session()
            .await
            .map_err(|e| SdkError::new(e.to_string()))?;

        let n = self.opened.fetch_add(1, Ordering::Relaxed) + 1;
        let id = format!("{}/{}#{}", params.account, params.role, n);
        info!(session = %id, user = %params.user, auth = params.auth.kind(), "Opened Snowflake session");
        Ok(SnowflakeSession { id, inner })
    }
}

/// A live Snowflake REST session.
pub struct SnowflakeSession {
    id: String,
    inner: snowflake_connector_rs::SnowflakeSession,
}

impl SnowflakeSession {
    async fn execute(&self, sql: String) -> Result<(), SdkError> {
        debug!(session = %self.id, sql = %sql, "Executing statement");
        self.inner
            .query(sql.as_str())
            .await
            .map(|_| ())
            .map_err(|e| SdkError::new(e.to_string()))
    }
}

#[async_trait]
impl Session for SnowflakeSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn set_query_tag(&self, tag: &serde_json::Value) -> Result<(), SdkError> {
        self.execute(query_tag_statement(tag)).await
    }

    async fn use_schema(&self, schema: &str) -> Result<(), SdkError> {
        self.execute(use_schema_statement(schema)).await
    }

    // The REST session token expires server-side; there is no logout call.
    async fn close(&self) -> Result<(), SdkError> {
        debug!(session = %self.id, "Released Snowflake session");
        Ok(())
    }
}

fn client_config(params: &ConnectionParams) -> SnowflakeClientConfig {
    SnowflakeClientConfig {
        account: params.account.clone(),
        warehouse: Some(params.warehouse.clone()),
        database: params.database.clone(),
        schema: params.schema.clone(),
        role: Some(params.role.clone()),
        timeout: None,
    }
}

fn auth_method(auth: &AuthMethod) -> Result<SnowflakeAuthMethod, SdkError> {
    match auth {
        AuthMethod::Password(password) => Ok(SnowflakeAuthMethod::Password(password.clone())),
        AuthMethod::PrivateKey(der) => key_pair(der),
        AuthMethod::Authenticator(name) => Err(SdkError::new(format!(
            "authenticator `{}` is not supported by the Snowflake REST client",
            name
        ))),
    }
}

/// The connector only takes encrypted PKCS#8 PEM, so the key is re-wrapped
/// under a one-off random passphrase.
fn key_pair(der: &[u8]) -> Result<SnowflakeAuthMethod, SdkError> {
    let key = RsaPrivateKey::from_pkcs8_der(der).map_err(|e| SdkError::new(e.to_string()))?;

    let mut password = vec![0u8; KEY_PASSPHRASE_LEN];
    OsRng.fill_bytes(&mut password);
    let encrypted_pem = key
        .to_pkcs8_encrypted_pem(&mut OsRng, &password, LineEnding::LF)
        .map_err(|e| SdkError::new(e.to_string()))?;

    Ok(SnowflakeAuthMethod::KeyPair {
        encrypted_pem: encrypted_pem.to_string(),
        password,
    })
}
