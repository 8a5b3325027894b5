//! Error types for conch.

use std::io;

/// Errors produced by the conch command core.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("module '{0}' is already in the catalog")]
    DuplicateModule(String),

    #[error("alias '{alias}' is already claimed by '{owner}'")]
    DuplicateAlias { alias: String, owner: String },

    #[error("unknown module: {0}")]
    ModuleNotFound(String),

    #[error("failed to construct module '{module}': {reason}")]
    ModuleConstruction { module: String, reason: String },

    #[error("failed to register module '{module}': {source}")]
    ModuleRegistration {
        module: String,
        #[source]
        source: Box<ShellError>,
    },

    #[error("module '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("command '{command}' already exists in module '{module}'")]
    DuplicateCommand { module: String, command: String },

    #[error("unknown command: {0}")]
    CommandNotFound(String),

    #[error("command error: {0}")]
    Command(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("discovery error: {0}")]
    Discovery(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl ShellError {
    /// Wrap a Phase A/B failure for `module`.
    pub fn registration(module: impl Into<String>, cause: ShellError) -> Self {
        Self::ModuleRegistration {
            module: module.into(),
            source: Box::new(cause),
        }
    }

    /// The innermost cause, looking through registration wrappers.
    pub fn root_cause(&self) -> &ShellError {
        match self {
            Self::ModuleRegistration { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ShellError>;
