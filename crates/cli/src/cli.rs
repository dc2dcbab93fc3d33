use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use snowglue_connection::settings::DEFAULT_SETTINGS_FILE;
use snowglue_connection::SessionOverrides;
use snowglue_core::DEFAULT_PACKAGE;

/// Snowflake connection settings and greeting procedures.
///
/// Runs the warehouse-side callables locally and inspects how settings
/// resolve from YAML and the environment.
#[derive(Parser, Debug)]
#[command(name = "snowglue", version, about = "Snowflake connection settings and greeting procedures")]
pub struct CliArgs {
    /// Directory to start the config file search from (default: cwd)
    #[arg(long, global = true, env = "SNOWGLUE_SEARCH_ROOT")]
    pub search_root: Option<PathBuf>,

    /// Package directory holding files/config.yaml
    #[arg(long, global = true, default_value = DEFAULT_PACKAGE)]
    pub package: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the greeting procedure
    Hello {
        /// Name to greet
        name: String,
    },

    /// Run the greeting function
    Function {
        /// Name to greet
        name: String,
    },

    /// Show the located config file and its contents
    Config,

    /// Resolve connection parameters from the settings file and environment
    Params {
        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// Open a session, apply the query tag and schema, then close it
    #[cfg(feature = "snowflake")]
    Session {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Query tag as a JSON object (default: settings tag)
        #[arg(long)]
        query_tag: Option<String>,
    },

    /// Report whether the process runs inside the warehouse sandbox
    Environment,
}

/// Settings source and per-call overrides shared by connection commands.
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Settings YAML with a `snowflake:` section
    #[arg(long, env = "SNOWGLUE_SETTINGS", default_value = DEFAULT_SETTINGS_FILE)]
    pub settings: PathBuf,

    /// Env profile prefix (overrides SNOWGLUE_PROFILE)
    #[arg(long)]
    pub profile: Option<String>,

    #[arg(long)]
    pub role: Option<String>,

    #[arg(long)]
    pub warehouse: Option<String>,

    #[arg(long)]
    pub database: Option<String>,

    #[arg(long)]
    pub schema: Option<String>,
}

impl ConnectionArgs {
    pub fn overrides(&self) -> SessionOverrides {
        SessionOverrides {
            role: self.role.clone(),
            warehouse: self.warehouse.clone(),
            database: self.database.clone(),
            schema: self.schema.clone(),
        }
    }
}
