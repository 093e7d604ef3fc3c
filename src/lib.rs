//! immuclient - command-line client for immudb
//!
//! Resolves configuration, assembles connection options (including mutual
//! TLS material), detects whether a stored token enables authenticated mode,
//! and manages the single session a process invocation works with.

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod utils;

// Re-export commonly used types
pub use error::{ErrorKind, ImmuclientError, Result};
