//! Detection of the warehouse sandbox runtime.
//!
//! Inside the sandbox, staged imports live under an import directory and the
//! working directory is not the package checkout. Callers receive an
//! [`EnvironmentDetector`] instead of probing the process themselves so tests
//! can substitute a [`FixedEnvironment`].

use std::path::PathBuf;

use crate::env::env_opt;

/// Env var the sandbox runtime sets to its staged import directory.
pub const IMPORT_DIRECTORY_VAR: &str = "SNOWFLAKE_IMPORT_DIRECTORY";

pub trait EnvironmentDetector: Send + Sync {
    /// Directory holding staged imports, when running inside the sandbox.
    fn import_directory(&self) -> Option<PathBuf>;

    fn is_sandbox(&self) -> bool {
        self.import_directory().is_some()
    }
}

/// Reads [`IMPORT_DIRECTORY_VAR`] from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl EnvironmentDetector for ProcessEnvironment {
    fn import_directory(&self) -> Option<PathBuf> {
        env_opt(IMPORT_DIRECTORY_VAR).map(PathBuf::from)
    }
}

/// A detector with a fixed answer.
#[derive(Debug, Clone, Default)]
pub struct FixedEnvironment {
    import_directory: Option<PathBuf>,
}

impl FixedEnvironment {
    pub fn local() -> Self {
        Self::default()
    }

    pub fn sandbox(import_directory: impl Into<PathBuf>) -> Self {
        Self {
            import_directory: Some(import_directory.into()),
        }
    }
}

impl EnvironmentDetector for FixedEnvironment {
    fn import_directory(&self) -> Option<PathBuf> {
        self.import_directory.clone()
    }
}
