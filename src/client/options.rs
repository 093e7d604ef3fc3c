//! Connection options
//!
//! [`OptionsBuilder`] is a pure function of the resolved configuration: it
//! reads values, never touches the filesystem, and leaves `auth` unset.

use crate::config::{ConfigKey, ResolvedConfig};
use crate::error::{ImmuclientError, Result};
use std::path::PathBuf;

/// Mutual TLS material, present only when mutual TLS is enabled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MtlsOptions {
    /// Hostname expected on the server certificate
    pub servername: String,
    pub certificate: PathBuf,
    pub private_key: PathBuf,
    /// CA bundle used to verify the server
    pub client_cas: PathBuf,
}

/// How to reach the immudb service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub port: u16,
    pub address: String,
    pub token_file_name: String,
    pub mtls: bool,
    /// True only when a non-empty token file was found at connect time
    pub auth: bool,
    pub mtls_options: Option<MtlsOptions>,
}

impl Options {
    /// Copy of these options with the authentication mode decided
    pub fn with_auth(self, auth: bool) -> Self {
        Self { auth, ..self }
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

pub struct OptionsBuilder<'a> {
    config: &'a ResolvedConfig,
}

impl<'a> OptionsBuilder<'a> {
    pub fn new(config: &'a ResolvedConfig) -> Self {
        Self { config }
    }

    pub fn build(&self) -> Result<Options> {
        let raw_port = self.config.get_int(ConfigKey::ImmudbPort)?;
        let port = u16::try_from(raw_port)
            .ok()
            .filter(|port| *port != 0)
            .ok_or_else(|| {
                ImmuclientError::invalid_value(
                    ConfigKey::ImmudbPort.as_str(),
                    format!("{raw_port} is not a valid port"),
                )
            })?;

        let mtls = self.config.get_bool(ConfigKey::Mtls)?;
        let mtls_options = if mtls {
            Some(self.build_mtls()?)
        } else {
            None
        };

        Ok(Options {
            port,
            address: self.config.get_string(ConfigKey::ImmudbAddress)?,
            token_file_name: self.config.get_string(ConfigKey::TokenFile)?,
            mtls,
            auth: false,
            mtls_options,
        })
    }

    // No cross-field validation: partially filled material is passed through.
    fn build_mtls(&self) -> Result<MtlsOptions> {
        Ok(MtlsOptions {
            servername: self.config.get_string(ConfigKey::ServerName)?,
            certificate: PathBuf::from(self.config.get_string(ConfigKey::Certificate)?),
            private_key: PathBuf::from(self.config.get_string(ConfigKey::Pkey)?),
            client_cas: PathBuf::from(self.config.get_string(ConfigKey::ClientCas)?),
        })
    }
}
