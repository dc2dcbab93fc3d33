pub mod config;
pub mod env;
pub mod environment;

pub use config::{load_config, ConfigLocator, LoadedConfig, DEFAULT_CONFIG_FILE, DEFAULT_PACKAGE, PROJECT_MARKERS};
pub use environment::{EnvironmentDetector, FixedEnvironment, ProcessEnvironment};
