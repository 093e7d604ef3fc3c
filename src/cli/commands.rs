//! CLI commands and argument parsing
//!
//! This module defines the command-line interface structure using clap.
//! Global flags feed the flag layer of the configuration; only flags that
//! were actually passed are bound.

use crate::client::{Connector, Session, SessionManager};
use crate::config::{load_config_with_search_paths, ConfigValue, ResolvedConfig};
use crate::error::Result;
use crate::utils::format::{format_key_value_pairs, format_table};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tabled::Tabled;

/// Get the full version string with build information
fn get_version() -> &'static str {
    env!("VERSION_WITH_GIT")
}

#[derive(Parser, Debug)]
#[command(name = "immuclient")]
#[command(about = "CLI client for immudb - the lightweight, high-speed immutable database")]
#[command(version = get_version(), author)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection flags shared by every command
#[derive(Args, Debug, Default, Clone)]
pub struct GlobalArgs {
    /// immudb REST API port (the web server port, 8080 on a stock install)
    #[arg(short = 'p', long = "immudb-port", global = true, value_name = "PORT")]
    pub immudb_port: Option<i64>,

    /// immudb host address
    #[arg(short = 'a', long = "immudb-address", global = true, value_name = "HOST")]
    pub immudb_address: Option<String>,

    /// Config file (default path is ./configs or $HOME; default filename is immuclient.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<String>,

    /// Authentication token file (default path is $HOME or binary location; default filename is token)
    #[arg(long, global = true, value_name = "FILE")]
    pub tokenfile: Option<String>,

    /// Enable mutual TLS
    #[arg(
        short = 'm',
        long,
        global = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub mtls: Option<bool>,

    /// Used to verify the hostname on the returned certificates
    #[arg(long, global = true)]
    pub servername: Option<String>,

    /// Certificate file path
    #[arg(long, global = true, value_name = "FILE")]
    pub certificate: Option<String>,

    /// Private key path
    #[arg(long, global = true, value_name = "FILE")]
    pub pkey: Option<String>,

    /// Client certificate list, aka certificate authority
    #[arg(long, global = true, value_name = "FILE")]
    pub clientcas: Option<String>,

    /// Return only values for get operations
    #[arg(
        long = "value-only",
        global = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub value_only: Option<bool>,
}

impl GlobalArgs {
    /// Flags that were explicitly passed, keyed by configuration key
    pub fn bindings(&self) -> Vec<(&'static str, ConfigValue)> {
        let mut bindings = Vec::new();

        if let Some(port) = self.immudb_port {
            bindings.push(("immudb-port", ConfigValue::Int(port)));
        }
        let strings = [
            ("immudb-address", &self.immudb_address),
            ("config", &self.config),
            ("tokenfile", &self.tokenfile),
            ("servername", &self.servername),
            ("certificate", &self.certificate),
            ("pkey", &self.pkey),
            ("clientcas", &self.clientcas),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                bindings.push((key, ConfigValue::Str(value.clone())));
            }
        }
        if let Some(mtls) = self.mtls {
            bindings.push(("mtls", ConfigValue::Bool(mtls)));
        }
        if let Some(value_only) = self.value_only {
            bindings.push(("value-only", ConfigValue::Bool(value_only)));
        }

        bindings
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to immudb and report server health
    Status,
    /// Inspect the resolved configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Show version information
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show every setting with its value and source
    Show,
    /// Show the configuration file in use
    Path,
}

impl Cli {
    /// Resolve configuration and run the selected command.
    ///
    /// Setup errors surface here before any connection is attempted.
    pub async fn run(
        self,
        env: Vec<(String, String)>,
        search_paths: &[PathBuf],
        connector: Arc<dyn Connector>,
    ) -> Result<()> {
        let config = load_config_with_search_paths(self.global.bindings(), env, search_paths).await?;
        self.execute(config, connector).await
    }

    pub async fn execute(self, config: ResolvedConfig, connector: Arc<dyn Connector>) -> Result<()> {
        match self.command {
            Commands::Status => execute_status(config, connector).await,
            Commands::Config { command } => execute_config_command(command, &config),
            Commands::Version => execute_version_command(),
        }
    }
}

async fn execute_status(config: ResolvedConfig, connector: Arc<dyn Connector>) -> Result<()> {
    let mut manager = SessionManager::new(config, connector);
    let session = manager.connect().await?;

    let outcome = print_status(&session).await;
    let closed = manager.disconnect(session).await;
    outcome.and(closed)
}

async fn print_status(session: &Session) -> Result<()> {
    let connection = session.connection()?;
    let health = connection.health().await?;

    if session.value_only() {
        println!("{}", health.status);
        return Ok(());
    }

    let version = if health.version.is_empty() {
        "<unknown>".to_string()
    } else {
        health.version
    };
    println!(
        "{}",
        format_key_value_pairs(&[
            ("Endpoint", connection.endpoint()),
            ("Healthy", health.status.to_string()),
            ("Version", version),
            ("Mutual TLS", session.options().mtls.to_string()),
            ("Authenticated", session.auth().to_string()),
        ])
    );
    Ok(())
}

fn execute_config_command(command: ConfigCommands, config: &ResolvedConfig) -> Result<()> {
    match command {
        ConfigCommands::Show => execute_config_show(config),
        ConfigCommands::Path => execute_config_path(config),
    }
}

#[derive(Tabled)]
struct ConfigItem {
    #[tabled(rename = "Setting")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Source")]
    source: String,
}

fn config_items(config: &ResolvedConfig) -> Vec<ConfigItem> {
    config
        .entries()
        .map(|(key, value, source)| {
            let value = value.to_string();
            ConfigItem {
                key: key.to_string(),
                value: if value.is_empty() {
                    "<not set>".to_string()
                } else {
                    value
                },
                source: source.to_string(),
            }
        })
        .collect()
}

fn execute_config_show(config: &ResolvedConfig) -> Result<()> {
    println!("{}", format_table(&config_items(config)));
    Ok(())
}

fn execute_config_path(config: &ResolvedConfig) -> Result<()> {
    match config.config_file() {
        Some(path) => println!("{}", path.display()),
        None => println!("No configuration file found"),
    }
    Ok(())
}

fn execute_version_command() -> Result<()> {
    println!("immuclient {}", get_version());
    Ok(())
}
