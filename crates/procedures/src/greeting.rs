use snowglue_connection::Session;
use snowglue_core::{ConfigLocator, LoadedConfig};
use tracing::{debug, info};

/// Config key whose string value is appended to greetings.
pub const ADDED_WORD_KEY: &str = "added_word";

/// Fixed greeting used by the default function.
pub fn print_hello(name: &str) -> String {
    format!("Hello {}!", name)
}

/// `Hello, <name>!`, followed by `added` when it is non-empty.
pub fn format_greeting(name: &str, added: Option<&str>) -> String {
    match added.map(str::trim).filter(|s| !s.is_empty()) {
        Some(added) => format!("Hello, {}! {}", name, added),
        None => format!("Hello, {}!", name),
    }
}

/// Greeting procedures bound to one config location.
#[derive(Debug, Clone, Default)]
pub struct Greeter {
    locator: ConfigLocator,
}

impl Greeter {
    pub fn new(locator: ConfigLocator) -> Self {
        Self { locator }
    }

    pub fn locator(&self) -> &ConfigLocator {
        &self.locator
    }

    fn config(&self) -> LoadedConfig {
        self.locator.load()
    }

    /// Procedure entry point. The session is optional and only used for
    /// attribution in logs.
    pub fn hello_procedure(&self, session: Option<&dyn Session>, name: &str) -> String {
        if let Some(session) = session {
            info!(session = session.id(), person = name, "hello_procedure called");
        }
        let config = self.config();
        format_greeting(name, config.get_str(ADDED_WORD_KEY))
    }

    /// Function entry point.
    pub fn hello_function(&self, name: &str) -> String {
        let config = self.config();
        debug!(person = name, keys = config.len(), "hello_function called");
        format_greeting(name, config.get_str(ADDED_WORD_KEY))
    }
}

/// [`Greeter::hello_procedure`] with the process cwd and environment.
pub fn hello_procedure(session: Option<&dyn Session>, name: &str) -> String {
    Greeter::default().hello_procedure(session, name)
}

/// [`Greeter::hello_function`] with the process cwd and environment.
pub fn hello_function(name: &str) -> String {
    Greeter::default().hello_function(name)
}
