//! Modules shipped with the `conch` binary.

mod database;
mod root;
mod ssh;

use std::cell::OnceCell;
use std::collections::HashMap;
use std::rc::Rc;

use conch_lifecycle::{FactoryTable, ModuleFactory, ModuleRecipe};
use conch_registry::{ParamSpec, SessionHandle};
use conch_types::error::{Result, ShellError};

pub use self::database::DatabaseModule;
pub use self::root::CoreModule;
pub use self::ssh::SshModule;

/// Module names offered when no modules directory is configured.
pub const BUILTIN_MODULES: &[&str] = &["core", "database", "ssh"];

/// Factories for every built-in module, keyed the way the default name
/// mappings expect.
pub fn factories() -> FactoryTable {
    let mut table = FactoryTable::new();
    table.register(
        "Core",
        ModuleFactory::new(ModuleRecipe::new(|| Ok(CoreModule::new())))
            .describe("Shell basics and session variables"),
    );
    table.register(
        "SSH",
        ModuleFactory::new(ModuleRecipe::new(|| Ok(SshModule::new())))
            .describe("Remote shell sessions")
            .commands(&["connect", "disconnect", "env", "status"]),
    );
    table.register(
        "Database",
        ModuleFactory::new(ModuleRecipe::new(|| Ok(DatabaseModule::new())))
            .alias("db")
            .describe("SQL database access")
            .commands(&["connect", "disconnect", "query", "status"]),
    );
    table
}

/// Session handle filled in during initialization, read by handlers.
#[derive(Clone, Default)]
pub(crate) struct SessionSlot(Rc<OnceCell<SessionHandle>>);

impl SessionSlot {
    pub(crate) fn fill(&self, session: &SessionHandle) {
        let _ = self.0.set(session.clone());
    }

    pub(crate) fn get(&self) -> Result<SessionHandle> {
        self.0
            .get()
            .cloned()
            .ok_or_else(|| ShellError::Command("module not initialized".into()))
    }
}

/// Handler arguments split into positionals and declared flag values.
#[derive(Debug, Default)]
pub(crate) struct Args {
    pub positional: Vec<String>,
    flags: HashMap<String, String>,
}

impl Args {
    /// Parse `--long value`, `--long=value` and `-s value` for `params`.
    pub(crate) fn parse(args: &[String], params: &[ParamSpec]) -> Result<Self> {
        let mut parsed = Self::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let (name, inline) = if let Some(long) = arg.strip_prefix("--") {
                match long.split_once('=') {
                    Some((name, value)) => (name.to_string(), Some(value.to_string())),
                    None => (long.to_string(), None),
                }
            } else if let Some(short) = arg.strip_prefix('-')
                && let Some(c) = single_char(short)
            {
                let param = params
                    .iter()
                    .find(|p| p.short == Some(c))
                    .ok_or_else(|| ShellError::Command(format!("unknown flag: {arg}")))?;
                (param.long.clone(), None)
            } else {
                parsed.positional.push(arg.clone());
                continue;
            };

            if !params.iter().any(|p| p.long == name) {
                return Err(ShellError::Command(format!("unknown flag: --{name}")));
            }
            let value = match inline {
                Some(v) => v,
                None => iter
                    .next()
                    .cloned()
                    .ok_or_else(|| ShellError::Command(format!("--{name} needs a value")))?,
            };
            parsed.flags.insert(name, value);
        }
        Ok(parsed)
    }

    pub(crate) fn flag(&self, long: &str) -> Option<&str> {
        self.flags.get(long).map(String::as_str)
    }

    /// A numeric flag, or `default` when absent.
    pub(crate) fn number(&self, long: &str, default: u16) -> Result<u16> {
        match self.flag(long) {
            Some(v) => v
                .parse()
                .map_err(|_| ShellError::Command(format!("--{long}: '{v}' is not a port number"))),
            None => Ok(default),
        }
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}
