//! Authentication module
//!
//! This module locates and reads the token file left behind by a previous
//! login, which decides whether a session starts in authenticated mode.

pub mod token;

pub use token::*;
