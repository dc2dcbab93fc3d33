//! The seam to the warehouse SDK.
//!
//! The SDK binding implements [`SessionFactory`] to open authenticated
//! sessions from resolved [`ConnectionParams`]; the returned handles
//! implement [`Session`].

use async_trait::async_trait;

use crate::error::SdkError;
use crate::params::ConnectionParams;

/// A live, authenticated warehouse session.
#[async_trait]
pub trait Session: Send + Sync {
    /// Identifier used in log lines.
    fn id(&self) -> &str;

    /// Attach a query tag to all subsequent queries on this session.
    async fn set_query_tag(&self, tag: &serde_json::Value) -> Result<(), SdkError>;

    /// Switch the current schema.
    async fn use_schema(&self, schema: &str) -> Result<(), SdkError>;

    async fn close(&self) -> Result<(), SdkError>;
}

/// Opens new sessions through the SDK.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Session: Session + 'static;

    async fn create(&self, params: &ConnectionParams) -> Result<Self::Session, SdkError>;
}

/// `ALTER SESSION` statement attaching `tag` as the session's query tag.
///
/// The tag is rendered as compact JSON inside a single-quoted literal.
pub fn query_tag_statement(tag: &serde_json::Value) -> String {
    let text = match tag {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    format!("ALTER SESSION SET QUERY_TAG = '{}'", escape_literal(&text))
}

/// `USE SCHEMA` statement for `schema`.
///
/// Plain identifiers are upper-cased before quoting. Names already in double
/// quotes pass through unchanged.
pub fn use_schema_statement(schema: &str) -> String {
    format!("USE SCHEMA {}", quote_identifier(schema))
}

fn quote_identifier(name: &str) -> String {
    let already_quoted = name.len() >= 2 && name.starts_with('"') && name.ends_with('"');
    if already_quoted {
        return name.to_string();
    }
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if plain {
        format!("\"{}\"", name.to_ascii_uppercase())
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

fn escape_literal(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}
