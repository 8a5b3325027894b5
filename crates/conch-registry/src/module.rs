//! The module contract.

use std::rc::Rc;

use conch_types::error::Result;

use crate::registrar::CommandDeclarer;
use crate::session::SessionHandle;

/// Output produced by a command handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    /// Plain text lines.
    Text(String),
    /// Tabular data (header row + data rows).
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Command produced no visible output.
    None,
    /// Signal to the REPL loop to leave.
    Exit,
}

/// A command handler: receives the raw argument tokens that follow the
/// command path. Any structured validation is the handler's own business.
pub type Handler = Rc<dyn Fn(&[String]) -> Result<CommandOutput>>;

/// A loadable unit of commands.
///
/// The lifecycle only ever talks to modules through this trait, so modules
/// can live in any crate. Methods take `&self`; modules that keep state use
/// interior mutability or the injected session.
pub trait Module {
    /// Canonical module name. Must match the name it was cataloged under.
    fn name(&self) -> &str;

    /// One-line description for `help` and completion metadata.
    fn description(&self) -> &str {
        ""
    }

    /// Module version shown by `modules`.
    fn version(&self) -> &str {
        "1.0.0"
    }

    /// Phase A: add this module's commands through `commands`.
    fn declare_commands(&self, commands: &mut CommandDeclarer<'_>) -> Result<()>;

    /// Phase B: set up state. Runs after every command has been declared.
    fn initialize(&self, _session: &SessionHandle) -> Result<()> {
        Ok(())
    }

    /// Release resources before the process exits.
    fn shutdown(&self) {}
}
