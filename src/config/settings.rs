//! Configuration loading
//!
//! This module discovers the optional config file and feeds flags,
//! environment and file values into a [`ConfigResolver`].

use super::keys::ConfigValue;
use super::resolver::{ConfigResolver, ResolvedConfig};
use crate::error::{ImmuclientError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "immuclient.toml";

/// Locations searched when no config file is named explicitly, in order
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("configs").join(CONFIG_FILE_NAME)];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(CONFIG_FILE_NAME));
    }
    paths
}

/// Pick the config file to load.
///
/// An explicitly named file must exist; the search paths are optional.
pub fn find_config_file(explicit: Option<PathBuf>, search_paths: &[PathBuf]) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(ImmuclientError::config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return Ok(Some(path));
    }

    Ok(search_paths.iter().find(|path| path.is_file()).cloned())
}

pub async fn read_config_table(path: &Path) -> Result<toml::Table> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        ImmuclientError::config(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let table = toml::from_str::<toml::Table>(&contents)?;
    Ok(table)
}

/// Load configuration from multiple sources with priority order:
/// 1. Command-line flags
/// 2. Environment variables
/// 3. Configuration file
/// 4. Default values
///
/// The first existing file among `search_paths` is used unless a config
/// path was given explicitly.
pub async fn load_config_with_search_paths<F, E>(
    flags: F,
    env: E,
    search_paths: &[PathBuf],
) -> Result<ResolvedConfig>
where
    F: IntoIterator<Item = (&'static str, ConfigValue)>,
    E: IntoIterator<Item = (String, String)>,
{
    let mut resolver = ConfigResolver::with_defaults()?;

    for (name, value) in flags {
        resolver.bind_flag(name, value)?;
    }

    resolver.apply_env(env)?;

    match find_config_file(resolver.explicit_config_path(), search_paths)? {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            let table = read_config_table(&path).await?;
            resolver.apply_file(&path, &table)?;
        }
        None => debug!("No configuration file found, using flags, environment and defaults"),
    }

    Ok(resolver.resolve())
}
