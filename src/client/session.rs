//! Session lifecycle
//!
//! [`SessionManager`] opens exactly one [`Session`] per process. The session
//! owns the connection; dropping a session that was never disconnected
//! still releases it, so error, panic and interrupt paths do not leak.

use super::options::{Options, OptionsBuilder};
use super::transport::{Connection, Connector};
use crate::auth::{read_token, resolve_token_path};
use crate::config::{ConfigKey, ResolvedConfig};
use crate::error::{ImmuclientError, Result};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Connecting,
    Connected,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Uninitialized => f.write_str("uninitialized"),
            SessionState::Connecting => f.write_str("connecting"),
            SessionState::Connected => f.write_str("connected"),
            SessionState::Closed => f.write_str("closed"),
        }
    }
}

/// An open session against immudb
pub struct Session {
    connection: Option<Box<dyn Connection>>,
    options: Options,
    value_only: bool,
}

impl Session {
    /// Whether a stored token put this session in authenticated mode
    pub fn auth(&self) -> bool {
        self.options.auth
    }

    /// Print only values, not metadata, for read operations
    pub fn value_only(&self) -> bool {
        self.value_only
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn connection(&self) -> Result<&dyn Connection> {
        self.connection
            .as_deref()
            .ok_or_else(|| ImmuclientError::session_state(SessionState::Connected, SessionState::Closed))
    }

    async fn close(&mut self) -> Result<()> {
        match self.connection.take() {
            Some(mut connection) => connection.close().await,
            None => Err(ImmuclientError::disconnect("session has no open connection")),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.options.endpoint())
            .field("open", &self.connection.is_some())
            .field("auth", &self.options.auth)
            .field("value_only", &self.value_only)
            .finish()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            warn!(
                "Session to {} dropped without disconnect, releasing connection",
                connection.endpoint()
            );
        }
    }
}

pub struct SessionManager {
    config: ResolvedConfig,
    connector: Arc<dyn Connector>,
    token_path: Option<PathBuf>,
    state: SessionState,
}

impl SessionManager {
    pub fn new(config: ResolvedConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            token_path: None,
            state: SessionState::Uninitialized,
        }
    }

    /// Read the token from `path` instead of resolving the configured name
    pub fn with_token_path(mut self, path: PathBuf) -> Self {
        self.token_path = Some(path);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Open the session.
    ///
    /// A missing, unreadable or empty token file only downgrades the session
    /// to unauthenticated mode. Transport failures are returned as-is and
    /// leave the manager closed; there is no retry.
    pub async fn connect(&mut self) -> Result<Session> {
        if self.state != SessionState::Uninitialized {
            return Err(ImmuclientError::session_state(
                SessionState::Uninitialized,
                self.state,
            ));
        }
        self.state = SessionState::Connecting;

        match self.open().await {
            Ok(session) => {
                self.state = SessionState::Connected;
                info!(
                    "Connected to {} (auth: {})",
                    session.options.endpoint(),
                    session.auth()
                );
                Ok(session)
            }
            Err(e) => {
                self.state = SessionState::Closed;
                Err(e)
            }
        }
    }

    async fn open(&self) -> Result<Session> {
        let options = OptionsBuilder::new(&self.config).build()?;

        let token_path = self
            .token_path
            .clone()
            .unwrap_or_else(|| resolve_token_path(&options.token_file_name));
        let token = read_token(&token_path).await;
        let options = options.with_auth(token.is_some());
        debug!("Authenticated mode: {}", options.auth);

        let connection = self.connector.connect(&options, token).await?;
        let value_only = self.config.get_bool(ConfigKey::ValueOnly)?;

        Ok(Session {
            connection: Some(connection),
            options,
            value_only,
        })
    }

    /// Close the session's connection; the manager cannot reconnect afterwards
    pub async fn disconnect(&mut self, mut session: Session) -> Result<()> {
        if self.state != SessionState::Connected {
            return Err(ImmuclientError::session_state(
                SessionState::Connected,
                self.state,
            ));
        }
        self.state = SessionState::Closed;

        session.close().await?;
        debug!("Disconnected from {}", session.options.endpoint());
        Ok(())
    }
}
