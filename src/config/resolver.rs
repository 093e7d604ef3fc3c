//! Layered configuration store
//!
//! Values are looked up with the precedence explicit flag > environment >
//! config file > built-in default. The mutable [`ConfigResolver`] only
//! exists during startup; [`ConfigResolver::resolve`] freezes it into a
//! [`ResolvedConfig`] that is passed by reference to everything else.

use super::keys::{ConfigKey, ConfigValue, ValueKind};
use crate::error::{ImmuclientError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Layer that supplied a resolved value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Default,
    File,
    Env,
    Flag,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Default => f.write_str("default"),
            ConfigSource::File => f.write_str("file"),
            ConfigSource::Env => f.write_str("env"),
            ConfigSource::Flag => f.write_str("flag"),
        }
    }
}

#[derive(Debug, Default)]
pub struct ConfigResolver {
    defaults: BTreeMap<ConfigKey, ConfigValue>,
    file: BTreeMap<ConfigKey, ConfigValue>,
    env: BTreeMap<ConfigKey, ConfigValue>,
    flags: BTreeMap<ConfigKey, ConfigValue>,
    file_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create an empty resolver with no registered keys
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver with every recognized key registered at its default
    pub fn with_defaults() -> Result<Self> {
        let mut resolver = Self::new();
        for key in ConfigKey::ALL {
            resolver.register(key, key.default_value())?;
        }
        Ok(resolver)
    }

    pub fn register(&mut self, key: ConfigKey, default: ConfigValue) -> Result<()> {
        if self.defaults.contains_key(&key) {
            return Err(ImmuclientError::duplicate_key(key.as_str()));
        }
        self.defaults.insert(key, default);
        Ok(())
    }

    fn registered(&self, name: &str) -> Result<(ConfigKey, ValueKind)> {
        let key: ConfigKey = name.parse()?;
        self.defaults
            .get(&key)
            .map(|default| (key, default.kind()))
            .ok_or_else(|| ImmuclientError::unregistered_key(name))
    }

    /// Bind an explicitly passed command-line flag to its key.
    ///
    /// Fails when the key is unknown, the value has the wrong kind, or the
    /// same flag is bound twice.
    pub fn bind_flag(&mut self, name: &str, value: ConfigValue) -> Result<()> {
        let (key, kind) = self.registered(name)?;
        if value.kind() != kind {
            return Err(ImmuclientError::invalid_value(
                name,
                format!("expected {kind}, found {}", value.kind()),
            ));
        }
        if self.flags.contains_key(&key) {
            return Err(ImmuclientError::duplicate_flag(name));
        }
        debug!("Bound flag --{} = {}", name, value);
        self.flags.insert(key, value);
        Ok(())
    }

    /// Apply `IMMUCLIENT_*` variables; everything else is ignored
    pub fn apply_env<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let by_var: BTreeMap<String, (ConfigKey, ValueKind)> = self
            .defaults
            .iter()
            .map(|(key, default)| (key.env_var(), (*key, default.kind())))
            .collect();

        for (name, raw) in vars {
            if let Some((key, kind)) = by_var.get(&name) {
                let value = ConfigValue::parse_as(*kind, &name, &raw)?;
                debug!("Environment sets {} from {}", key, name);
                self.env.insert(*key, value);
            }
        }
        Ok(())
    }

    /// Apply the top-level entries of a parsed config file
    pub fn apply_file(&mut self, path: &Path, table: &toml::Table) -> Result<()> {
        for (name, value) in table {
            match self.registered(name) {
                Ok((key, kind)) => {
                    let value = ConfigValue::from_toml(kind, name, value)?;
                    self.file.insert(key, value);
                }
                Err(_) => debug!("Ignoring unknown key '{}' in {}", name, path.display()),
            }
        }
        self.file_path = Some(path.to_path_buf());
        Ok(())
    }

    /// Config file named by a flag or the environment, if any.
    ///
    /// The file layer cannot name itself, so only the upper layers count.
    pub fn explicit_config_path(&self) -> Option<PathBuf> {
        [&self.flags, &self.env]
            .into_iter()
            .find_map(|layer| match layer.get(&ConfigKey::Config) {
                Some(ConfigValue::Str(path)) if !path.is_empty() => Some(PathBuf::from(path)),
                _ => None,
            })
    }

    /// Freeze every registered key to its highest-precedence value
    pub fn resolve(self) -> ResolvedConfig {
        let mut entries = BTreeMap::new();
        for (key, default) in &self.defaults {
            let resolved = [
                (&self.flags, ConfigSource::Flag),
                (&self.env, ConfigSource::Env),
                (&self.file, ConfigSource::File),
            ]
            .into_iter()
            .find_map(|(layer, source)| layer.get(key).map(|value| (value.clone(), source)))
            .unwrap_or_else(|| (default.clone(), ConfigSource::Default));

            entries.insert(*key, resolved);
        }

        ResolvedConfig {
            entries,
            file_path: self.file_path,
        }
    }
}

/// Immutable, fully resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    entries: BTreeMap<ConfigKey, (ConfigValue, ConfigSource)>,
    file_path: Option<PathBuf>,
}

impl ResolvedConfig {
    fn lookup(&self, key: ConfigKey) -> Result<&ConfigValue> {
        self.entries
            .get(&key)
            .map(|(value, _)| value)
            .ok_or_else(|| ImmuclientError::unregistered_key(key.as_str()))
    }

    fn mismatch(key: ConfigKey, expected: ValueKind, found: &ConfigValue) -> ImmuclientError {
        ImmuclientError::invalid_value(
            key.as_str(),
            format!("requested as {expected}, registered as {}", found.kind()),
        )
    }

    pub fn get_int(&self, key: ConfigKey) -> Result<i64> {
        match self.lookup(key)? {
            ConfigValue::Int(i) => Ok(*i),
            other => Err(Self::mismatch(key, ValueKind::Int, other)),
        }
    }

    pub fn get_string(&self, key: ConfigKey) -> Result<String> {
        match self.lookup(key)? {
            ConfigValue::Str(s) => Ok(s.clone()),
            other => Err(Self::mismatch(key, ValueKind::Str, other)),
        }
    }

    pub fn get_bool(&self, key: ConfigKey) -> Result<bool> {
        match self.lookup(key)? {
            ConfigValue::Bool(b) => Ok(*b),
            other => Err(Self::mismatch(key, ValueKind::Bool, other)),
        }
    }

    pub fn source(&self, key: ConfigKey) -> Option<ConfigSource> {
        self.entries.get(&key).map(|(_, source)| *source)
    }

    /// All entries in key order
    pub fn entries(&self) -> impl Iterator<Item = (ConfigKey, &ConfigValue, ConfigSource)> {
        self.entries
            .iter()
            .map(|(key, (value, source))| (*key, value, *source))
    }

    /// Config file that contributed the file layer, if one was loaded
    pub fn config_file(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }
}
