//! Foundation types for conch.
//!
//! Shared by every conch crate: the error taxonomy raised by the catalog,
//! loader, registrar and command table, and the TOML-backed shell
//! configuration consumed by discovery and completion.

pub mod config;
pub mod error;

pub use config::{CompletionConfig, CoreConfig, ModulesConfig, ShellConfig};
pub use error::{Result, ShellError};
