use conch_registry::{CommandDeclarer, CommandOutput, CommandSpec, Module, SessionHandle};
use conch_types::error::{Result, ShellError};

use super::SessionSlot;

/// Always-on module: leaving the shell and session variables.
#[derive(Default)]
pub struct CoreModule {
    session: SessionSlot,
}

impl CoreModule {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Module for CoreModule {
    fn name(&self) -> &str {
        "core"
    }

    fn description(&self) -> &str {
        "Shell basics and session variables"
    }

    fn declare_commands(&self, commands: &mut CommandDeclarer<'_>) -> Result<()> {
        commands.add(
            CommandSpec::new("exit", |_| Ok(CommandOutput::Exit))
                .alias("quit")
                .alias("q")
                .describe("Leave the shell"),
        )?;
        commands.add(
            CommandSpec::new("echo", |args| Ok(CommandOutput::Text(args.join(" "))))
                .usage("echo [text...]")
                .describe("Print the arguments"),
        )?;

        let session = self.session.clone();
        commands.add(
            CommandSpec::new("set", move |args| {
                let [name, value @ ..] = args else {
                    return Err(ShellError::Command("usage: set <name> <value>".into()));
                };
                let value = value.join(" ");
                session.get()?.with_mut(|s| s.set_variable(name, &value));
                Ok(CommandOutput::None)
            })
            .usage("set <name> <value>")
            .describe("Set a session variable"),
        )?;

        let session = self.session.clone();
        commands.add(
            CommandSpec::new("unset", move |args| {
                let [name] = args else {
                    return Err(ShellError::Command("usage: unset <name>".into()));
                };
                match session.get()?.with_mut(|s| s.unset_variable(name)) {
                    Some(_) => Ok(CommandOutput::None),
                    None => Err(ShellError::Command(format!("no such variable: {name}"))),
                }
            })
            .usage("unset <name>")
            .describe("Remove a session variable"),
        )?;

        let session = self.session.clone();
        commands.add(
            CommandSpec::new("vars", move |_| {
                let rows = session.get()?.with(|s| {
                    s.variables()
                        .into_iter()
                        .map(|(k, v)| vec![k.to_string(), v.to_string()])
                        .collect::<Vec<_>>()
                });
                if rows.is_empty() {
                    return Ok(CommandOutput::Text("No session variables".into()));
                }
                Ok(CommandOutput::Table {
                    headers: vec!["name".into(), "value".into()],
                    rows,
                })
            })
            .describe("List session variables"),
        )
    }

    fn initialize(&self, session: &SessionHandle) -> Result<()> {
        self.session.fill(session);
        Ok(())
    }
}
