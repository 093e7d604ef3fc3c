//! Configuration management module
//!
//! This module resolves configuration from command-line flags, environment
//! variables, an optional configuration file, and built-in defaults into a
//! single immutable value.

pub mod keys;
pub mod resolver;
pub mod settings;

pub use keys::*;
pub use resolver::*;
pub use settings::*;
