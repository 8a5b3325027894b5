//! In-crate fixtures for completion and dispatch tests.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use conch_lifecycle::{
    FactoryTable, LifecycleOptions, MappedNameResolver, ModuleFactory, ModuleLifecycle,
    ModuleRecipe, StaticSource,
};
use conch_registry::{CommandDeclarer, CommandOutput, CommandSpec, Module, ParamSpec, SessionHandle};
use conch_types::error::{Result, ShellError};

pub(crate) struct Core;

impl Module for Core {
    fn name(&self) -> &str {
        "core"
    }

    fn description(&self) -> &str {
        "Shell basics"
    }

    fn declare_commands(&self, commands: &mut CommandDeclarer<'_>) -> Result<()> {
        commands.add(
            CommandSpec::new("exit", |_| Ok(CommandOutput::Exit))
                .alias("quit")
                .describe("Leave the shell"),
        )?;
        commands.add(
            CommandSpec::new("echo", |args| Ok(CommandOutput::Text(args.join(" "))))
                .describe("Print arguments"),
        )
    }
}

pub(crate) struct Ssh;

impl Module for Ssh {
    fn name(&self) -> &str {
        "ssh"
    }

    fn declare_commands(&self, commands: &mut CommandDeclarer<'_>) -> Result<()> {
        commands.add(
            CommandSpec::new("connect", |args| Ok(CommandOutput::Text(format!("ssh to {}", args.join(" ")))))
                .describe("Open a session")
                .param(ParamSpec::long("port").short('p').describe("Remote port"))
                .param(ParamSpec::long("user").short('u').describe("Login name")),
        )?;
        commands.add(CommandSpec::new("env", |_| Ok(CommandOutput::Text("TERM=xterm".into()))))
    }
}

pub(crate) struct Database {
    fail_init: bool,
}

impl Module for Database {
    fn name(&self) -> &str {
        "database"
    }

    fn declare_commands(&self, commands: &mut CommandDeclarer<'_>) -> Result<()> {
        commands.add(
            CommandSpec::new("connect", |_| Ok(CommandOutput::Text("connected".into())))
                .describe("Connect to the database")
                .param(ParamSpec::long("host").short('H').describe("Server host")),
        )?;
        commands.add(
            CommandSpec::new("query", |args| Ok(CommandOutput::Text(args.join(" "))))
                .alias("q")
                .describe("Run SQL"),
        )
    }

    fn initialize(&self, _: &SessionHandle) -> Result<()> {
        if self.fail_init {
            return Err(ShellError::Command("driver missing".into()));
        }
        Ok(())
    }
}

/// An unstarted lifecycle over `core`, `ssh` and `database` (alias `db`).
/// Setting the returned flag makes `database` fail initialization.
pub(crate) fn lifecycle() -> (ModuleLifecycle, Rc<Cell<bool>>) {
    let broken = Rc::new(Cell::new(false));
    let flag = Rc::clone(&broken);

    let mut factories = FactoryTable::new();
    factories.register("Core", ModuleFactory::new(ModuleRecipe::new(|| Ok(Core))));
    factories.register("SSH", ModuleFactory::new(ModuleRecipe::new(|| Ok(Ssh))).describe("Remote shells"));
    factories.register(
        "Database",
        ModuleFactory::new(ModuleRecipe::new(move || {
            Ok(Database {
                fail_init: flag.get(),
            })
        }))
        .alias("db")
        .describe("SQL access")
        .commands(&["connect", "query", "disconnect"]),
    );

    let mut mappings = HashMap::new();
    mappings.insert("ssh".to_string(), "SSH".to_string());
    let lifecycle = ModuleLifecycle::new(
        LifecycleOptions::default(),
        Box::new(StaticSource::new(["core", "ssh", "database"])),
        Box::new(MappedNameResolver::new(mappings)),
        factories,
    );
    (lifecycle, broken)
}
