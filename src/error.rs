use thiserror::Error;

/// Main error type for immuclient operations
#[derive(Debug, Error)]
pub enum ImmuclientError {
    #[error("Configuration key '{key}' is registered twice")]
    DuplicateKey { key: String },

    #[error("Configuration key '{key}' is not registered")]
    UnregisteredKey { key: String },

    #[error("Flag '--{key}' is bound more than once")]
    DuplicateFlag { key: String },

    #[error("Invalid value for '{key}': {details}")]
    InvalidValue { key: String, details: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Configuration file error: {0}")]
    ConfigFileError(#[from] toml::de::Error),

    #[error("Connection to immudb at {endpoint} failed: {details}")]
    ConnectionError { endpoint: String, details: String },

    #[error("Connection to immudb at {endpoint} timed out: {details}")]
    ConnectionTimeout { endpoint: String, details: String },

    #[error("Connection to immudb at {endpoint} was refused")]
    ConnectionRefused { endpoint: String },

    #[error("TLS error while connecting to {endpoint}: {details}")]
    TlsError { endpoint: String, details: String },

    #[error("Malformed response from immudb at {endpoint}: {details}")]
    MalformedResponse { endpoint: String, details: String },

    #[error("Failed to disconnect from immudb: {0}")]
    DisconnectError(String),

    #[error("Session is {actual}, expected {expected}")]
    SessionState { expected: String, actual: String },

    #[error("Interrupted")]
    Interrupted,
}

/// Error classes a top-level handler maps to exit statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Flag/key binding or option assembly failed before any network activity
    Setup,
    /// Handshake or transport failure while opening the session
    Connection,
    /// The connection could not be released
    Disconnect,
    Interrupted,
    Other,
}

impl ImmuclientError {
    pub fn duplicate_key<S: Into<String>>(key: S) -> Self {
        Self::DuplicateKey { key: key.into() }
    }

    pub fn unregistered_key<S: Into<String>>(key: S) -> Self {
        Self::UnregisteredKey { key: key.into() }
    }

    pub fn duplicate_flag<S: Into<String>>(key: S) -> Self {
        Self::DuplicateFlag { key: key.into() }
    }

    pub fn invalid_value<K: Into<String>, D: Into<String>>(key: K, details: D) -> Self {
        Self::InvalidValue {
            key: key.into(),
            details: details.into(),
        }
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn connection<E: Into<String>, D: Into<String>>(endpoint: E, details: D) -> Self {
        Self::ConnectionError {
            endpoint: endpoint.into(),
            details: details.into(),
        }
    }

    pub fn connection_timeout<E: Into<String>, D: Into<String>>(endpoint: E, details: D) -> Self {
        Self::ConnectionTimeout {
            endpoint: endpoint.into(),
            details: details.into(),
        }
    }

    pub fn connection_refused<E: Into<String>>(endpoint: E) -> Self {
        Self::ConnectionRefused {
            endpoint: endpoint.into(),
        }
    }

    pub fn tls<E: Into<String>, D: Into<String>>(endpoint: E, details: D) -> Self {
        Self::TlsError {
            endpoint: endpoint.into(),
            details: details.into(),
        }
    }

    pub fn malformed_response<E: Into<String>, D: Into<String>>(endpoint: E, details: D) -> Self {
        Self::MalformedResponse {
            endpoint: endpoint.into(),
            details: details.into(),
        }
    }

    pub fn disconnect<S: Into<String>>(msg: S) -> Self {
        Self::DisconnectError(msg.into())
    }

    pub fn session_state<E: ToString, A: ToString>(expected: E, actual: A) -> Self {
        Self::SessionState {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateKey { .. }
            | Self::UnregisteredKey { .. }
            | Self::DuplicateFlag { .. }
            | Self::InvalidValue { .. }
            | Self::ConfigError(_)
            | Self::ConfigFileError(_) => ErrorKind::Setup,
            Self::ConnectionError { .. }
            | Self::ConnectionTimeout { .. }
            | Self::ConnectionRefused { .. }
            | Self::TlsError { .. }
            | Self::MalformedResponse { .. } => ErrorKind::Connection,
            Self::DisconnectError(_) => ErrorKind::Disconnect,
            Self::Interrupted => ErrorKind::Interrupted,
            Self::SessionState { .. } => ErrorKind::Other,
        }
    }

    /// Process exit status for this error; success is always 0.
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::Setup => 2,
            ErrorKind::Connection => 3,
            ErrorKind::Disconnect => 4,
            ErrorKind::Interrupted => 130,
            ErrorKind::Other => 1,
        }
    }
}

/// Result type alias for immuclient operations
pub type Result<T> = std::result::Result<T, ImmuclientError>;
