mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use snowglue_connection::ConnectionSettings;
use snowglue_core::{ConfigLocator, EnvironmentDetector, ProcessEnvironment};
use snowglue_procedures::Greeter;
use tracing::debug;

use crate::cli::{CliArgs, Command, ConnectionArgs};

#[tokio::main]
async fn main() -> Result<()> {
    snowglue_core::env::load_dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let mut locator = ConfigLocator::new(&args.package);
    if let Some(root) = &args.search_root {
        locator = locator.with_search_root(root);
    }
    debug!(?locator, "Config locator ready");

    match args.command {
        Command::Hello { name } => {
            println!("{}", Greeter::new(locator).hello_procedure(None, &name));
        }
        Command::Function { name } => {
            println!("{}", Greeter::new(locator).hello_function(&name));
        }
        Command::Config => {
            let found = locator.find_config_file();
            let config = found
                .as_deref()
                .map(snowglue_core::load_config)
                .unwrap_or_default();
            let config = serde_json::to_value(&config).context("config is not representable as JSON")?;
            print_json(&serde_json::json!({
                "sandbox": locator.is_sandbox(),
                "expected_path": locator.config_path(),
                "found": found,
                "config": config,
            }))?;
        }
        Command::Params { connection } => {
            let loaded = load_settings(&connection)?;
            let params = loaded
                .get_connection_params(&connection.overrides())
                .context("failed to resolve connection parameters")?;

            print_json(&serde_json::json!({
                "settings": loaded.redacted_summary(),
                "params": params.redacted_summary(),
            }))?;
        }
        #[cfg(feature = "snowflake")]
        Command::Session { connection, query_tag } => {
            open_session(&connection, query_tag.as_deref()).await?;
        }
        Command::Environment => {
            let env = ProcessEnvironment;
            print_json(&serde_json::json!({
                "sandbox": env.is_sandbox(),
                "import_directory": env.import_directory(),
            }))?;
        }
    }

    Ok(())
}

fn load_settings(args: &ConnectionArgs) -> Result<ConnectionSettings> {
    match &args.profile {
        Some(p) => ConnectionSettings::from_yaml_profiled(&args.settings, &p.to_uppercase()),
        None => ConnectionSettings::from_yaml(&args.settings),
    }
    .with_context(|| format!("failed to load settings from {}", args.settings.display()))
}

#[cfg(feature = "snowflake")]
async fn open_session(args: &ConnectionArgs, query_tag: Option<&str>) -> Result<()> {
    use snowglue_connection::{ConnectionManager, Session, SessionRequest, SnowflakeSessionFactory};

    let mut manager = ConnectionManager::new(load_settings(args)?, SnowflakeSessionFactory::new());
    let mut request = SessionRequest::new().with_overrides(args.overrides());
    if let Some(tag) = query_tag {
        let tag = serde_json::from_str(tag).context("--query-tag is not valid JSON")?;
        request = request.query_tag(tag);
    }

    let session = manager
        .get_session(&request)
        .await
        .context("failed to open session")?;
    let cached = serde_json::to_value(manager.cached_sessions()).context("failed to render sessions")?;
    print_json(&serde_json::json!({
        "session": session.id(),
        "cached": cached,
    }))?;

    manager.close_all_sessions().await;
    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to render JSON")?;
    println!("{}", out);
    Ok(())
}
