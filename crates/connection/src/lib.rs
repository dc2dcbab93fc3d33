//! Snowflake connection configuration and session management.
//!
//! [`ConnectionSettings`] is read from the `snowflake:` section of a YAML
//! file with environment overrides. A [`ConnectionManager`] resolves
//! per-call overrides into [`ConnectionParams`], creates sessions through a
//! [`SessionFactory`] and caches them by (role, warehouse, database).
//! With the `snowflake` feature, `SnowflakeSessionFactory` binds the factory
//! to `snowflake-connector-rs`.

pub mod cache;
pub mod error;
pub mod key;
pub mod manager;
pub mod params;
pub mod session;
pub mod settings;
#[cfg(feature = "snowflake")]
pub mod snowflake;

pub use cache::{CachedSession, SessionCache};
pub use error::{ConnectionError, SdkError};
pub use manager::{ConnectionManager, SessionRequest};
pub use params::{AuthMethod, ConnectionParams, SessionKey, SessionOverrides};
pub use session::{query_tag_statement, use_schema_statement, Session, SessionFactory};
pub use settings::ConnectionSettings;
#[cfg(feature = "snowflake")]
pub use snowflake::{SnowflakeSession, SnowflakeSessionFactory};
