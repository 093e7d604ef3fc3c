//! Utility functions module
//!
//! This module contains network helpers and table formatting used by the
//! command-line front end.

pub mod format;
pub mod network;

pub use format::*;
pub use network::*;
