//! Recognized configuration keys and their built-in defaults

use crate::error::{ImmuclientError, Result};
use std::fmt;
use std::str::FromStr;

/// Port of immudb's web server, which also serves the REST API
pub const DEFAULT_IMMUDB_PORT: i64 = 8080;
pub const DEFAULT_IMMUDB_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_TOKEN_FILE_NAME: &str = "token";

/// Environment variable prefix for the env layer (`IMMUCLIENT_IMMUDB_PORT`, ...)
pub const ENV_PREFIX: &str = "IMMUCLIENT_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigKey {
    ImmudbPort,
    ImmudbAddress,
    Config,
    TokenFile,
    Mtls,
    ServerName,
    Certificate,
    Pkey,
    ClientCas,
    ValueOnly,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 10] = [
        ConfigKey::ImmudbPort,
        ConfigKey::ImmudbAddress,
        ConfigKey::Config,
        ConfigKey::TokenFile,
        ConfigKey::Mtls,
        ConfigKey::ServerName,
        ConfigKey::Certificate,
        ConfigKey::Pkey,
        ConfigKey::ClientCas,
        ConfigKey::ValueOnly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::ImmudbPort => "immudb-port",
            ConfigKey::ImmudbAddress => "immudb-address",
            ConfigKey::Config => "config",
            ConfigKey::TokenFile => "tokenfile",
            ConfigKey::Mtls => "mtls",
            ConfigKey::ServerName => "servername",
            ConfigKey::Certificate => "certificate",
            ConfigKey::Pkey => "pkey",
            ConfigKey::ClientCas => "clientcas",
            ConfigKey::ValueOnly => "value-only",
        }
    }

    /// Built-in default, registered before any other layer is applied
    pub fn default_value(&self) -> ConfigValue {
        match self {
            ConfigKey::ImmudbPort => ConfigValue::Int(DEFAULT_IMMUDB_PORT),
            ConfigKey::ImmudbAddress => ConfigValue::Str(DEFAULT_IMMUDB_ADDRESS.to_string()),
            ConfigKey::TokenFile => ConfigValue::Str(DEFAULT_TOKEN_FILE_NAME.to_string()),
            ConfigKey::Mtls | ConfigKey::ValueOnly => ConfigValue::Bool(false),
            ConfigKey::Config
            | ConfigKey::ServerName
            | ConfigKey::Certificate
            | ConfigKey::Pkey
            | ConfigKey::ClientCas => ConfigValue::Str(String::new()),
        }
    }

    pub fn env_var(&self) -> String {
        format!(
            "{}{}",
            ENV_PREFIX,
            self.as_str().to_uppercase().replace('-', "_")
        )
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = ImmuclientError;

    fn from_str(s: &str) -> Result<Self> {
        ConfigKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| ImmuclientError::unregistered_key(s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Str,
    Bool,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Int => f.write_str("integer"),
            ValueKind::Str => f.write_str("string"),
            ValueKind::Bool => f.write_str("boolean"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Int(i64),
    Str(String),
    Bool(bool),
}

impl ConfigValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            ConfigValue::Int(_) => ValueKind::Int,
            ConfigValue::Str(_) => ValueKind::Str,
            ConfigValue::Bool(_) => ValueKind::Bool,
        }
    }

    /// Parse a raw string (env var) as the given kind
    pub fn parse_as(kind: ValueKind, key: &str, raw: &str) -> Result<Self> {
        match kind {
            ValueKind::Int => raw
                .trim()
                .parse::<i64>()
                .map(ConfigValue::Int)
                .map_err(|e| ImmuclientError::invalid_value(key, format!("'{raw}': {e}"))),
            ValueKind::Bool => match raw.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(ConfigValue::Bool(true)),
                "false" | "0" | "no" | "off" | "" => Ok(ConfigValue::Bool(false)),
                _ => Err(ImmuclientError::invalid_value(
                    key,
                    format!("'{raw}' is not a boolean"),
                )),
            },
            ValueKind::Str => Ok(ConfigValue::Str(raw.to_string())),
        }
    }

    /// Convert a TOML value, rejecting anything that is not of `kind`
    pub fn from_toml(kind: ValueKind, key: &str, value: &toml::Value) -> Result<Self> {
        match (kind, value) {
            (ValueKind::Int, toml::Value::Integer(i)) => Ok(ConfigValue::Int(*i)),
            (ValueKind::Str, toml::Value::String(s)) => Ok(ConfigValue::Str(s.clone())),
            (ValueKind::Bool, toml::Value::Boolean(b)) => Ok(ConfigValue::Bool(*b)),
            (kind, other) => Err(ImmuclientError::invalid_value(
                key,
                format!("expected {kind}, found {}", other.type_str()),
            )),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Int(i) => write!(f, "{i}"),
            ConfigValue::Str(s) => f.write_str(s),
            ConfigValue::Bool(b) => write!(f, "{b}"),
        }
    }
}
