//! Command table and module registration.
//!
//! The command table is the single source of truth for execution, help and
//! completion. Modules implement the `Module` trait and populate the table
//! through a `CommandDeclarer` handed to them by the `Registrar`, which
//! rolls back every declared command if the module fails to come up.

mod alias;
mod module;
mod registrar;
mod session;
mod table;

/// Alias -> canonical name index with loud duplicate rejection.
pub use alias::AliasIndex;
/// The fixed module contract and the handler/output types it deals in.
pub use module::{CommandOutput, Handler, Module};
/// Two-phase module activation with rollback.
pub use registrar::{CommandDeclarer, Registrar};
/// Shared session state injected during initialization.
pub use session::{SessionHandle, SessionState};
/// Command specs, entries and the registry itself.
pub use table::{CommandEntry, CommandSpec, CommandTable, ParamSpec, ResolvedCommand};
