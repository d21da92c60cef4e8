//! Terminal client for Kith.
//!
//! A thin shell over [`kith_app::Session`]: reads commands from stdin, writes
//! the rendered chat view to stdout whenever it changes. All messaging logic
//! lives in the library crates.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod commands;
pub mod runtime;

pub use commands::Command;
pub use runtime::{CliError, Runtime};
