//! immudb client bootstrap
//!
//! Builds connection options from resolved configuration and manages the
//! single session a process invocation works with.

pub mod options;
pub mod session;
pub mod transport;

pub use options::{MtlsOptions, Options, OptionsBuilder};
pub use session::{Session, SessionManager, SessionState};
pub use transport::{Connection, Connector, HttpConnection, HttpConnector, ServerHealth};
