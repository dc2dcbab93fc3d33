use thiserror::Error;

/// Errors raised while configuring or opening connections.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Settings are incomplete or the settings file could not be parsed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No usable credential, a key that failed to load, or a session the
    /// SDK refused to create.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The SDK rejected an operation on an existing session.
    #[error("Session error: {0}")]
    Session(String),
}

/// An error reported by the warehouse SDK binding (stringified).
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SdkError(pub String);

impl SdkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
