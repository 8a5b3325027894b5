//! Simulated remote shell sessions.
//!
//! Connection state lives in the session under the `ssh` key, so it
//! survives for the whole process and is visible to `core vars` through the
//! `SSH_HOST` variable.

use conch_registry::{CommandDeclarer, CommandOutput, CommandSpec, Module, ParamSpec, SessionHandle};
use conch_types::error::{Result, ShellError};

use super::{Args, SessionSlot};

const DEFAULT_PORT: u16 = 22;

#[derive(Debug, Default)]
struct SshState {
    host: Option<String>,
    port: u16,
    user: String,
}

#[derive(Default)]
pub struct SshModule {
    session: SessionSlot,
}

impl SshModule {
    pub fn new() -> Self {
        Self::default()
    }
}

fn connect_params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::long("port").short('p').describe("Remote port (default 22)"),
        ParamSpec::long("user").short('u').describe("Login name"),
    ]
}

fn with_state<R>(session: &SessionHandle, f: impl FnOnce(&mut SshState) -> R) -> Result<R> {
    session
        .with_module::<SshState, _>("ssh", f)
        .ok_or_else(|| ShellError::Command("ssh state missing".into()))
}

impl Module for SshModule {
    fn name(&self) -> &str {
        "ssh"
    }

    fn description(&self) -> &str {
        "Remote shell sessions"
    }

    fn declare_commands(&self, commands: &mut CommandDeclarer<'_>) -> Result<()> {
        let session = self.session.clone();
        let params = connect_params();
        let mut spec = CommandSpec::new("connect", move |args| {
            let args = Args::parse(args, &params)?;
            let [host] = args.positional.as_slice() else {
                return Err(ShellError::Command("usage: ssh connect <host> [--port N] [--user NAME]".into()));
            };
            let port = args.number("port", DEFAULT_PORT)?;
            let handle = session.get()?;
            let user = match args.flag("user") {
                Some(user) => user.to_string(),
                None => handle.with(|s| s.variable("USER").unwrap_or("root").to_string()),
            };
            with_state(&handle, |st| {
                st.host = Some(host.clone());
                st.port = port;
                st.user = user.clone();
            })?;
            handle.with_mut(|s| s.set_variable("SSH_HOST", host));
            Ok(CommandOutput::Text(format!("Connected to {user}@{host}:{port}")))
        })
        .usage("ssh connect <host> [--port N] [--user NAME]")
        .describe("Open a session to a host");
        for param in connect_params() {
            spec = spec.param(param);
        }
        commands.add(spec)?;

        let session = self.session.clone();
        commands.add(
            CommandSpec::new("disconnect", move |_| {
                let handle = session.get()?;
                let host = with_state(&handle, |st| st.host.take())?;
                handle.with_mut(|s| s.unset_variable("SSH_HOST"));
                Ok(match host {
                    Some(host) => CommandOutput::Text(format!("Disconnected from {host}")),
                    None => CommandOutput::Text("Not connected".into()),
                })
            })
            .describe("Close the current session"),
        )?;

        let session = self.session.clone();
        commands.add(
            CommandSpec::new("status", move |_| {
                let handle = session.get()?;
                let line = with_state(&handle, |st| match &st.host {
                    Some(host) => format!("Connected to {}@{host}:{}", st.user, st.port),
                    None => "Not connected".to_string(),
                })?;
                Ok(CommandOutput::Text(line))
            })
            .describe("Show the session state"),
        )?;

        let session = self.session.clone();
        commands.add(
            CommandSpec::new("env", move |_| {
                let handle = session.get()?;
                let rows = with_state(&handle, |st| {
                    let Some(host) = &st.host else {
                        return Vec::new();
                    };
                    vec![
                        vec!["SSH_HOST".to_string(), host.clone()],
                        vec!["SSH_PORT".to_string(), st.port.to_string()],
                        vec!["SSH_USER".to_string(), st.user.clone()],
                    ]
                })?;
                if rows.is_empty() {
                    return Err(ShellError::Command("not connected".into()));
                }
                Ok(CommandOutput::Table {
                    headers: vec!["name".into(), "value".into()],
                    rows,
                })
            })
            .describe("Show the remote environment"),
        )
    }

    fn initialize(&self, session: &SessionHandle) -> Result<()> {
        session.with_mut(|s| s.insert_module_state("ssh", SshState::default()));
        self.session.fill(session);
        Ok(())
    }

    fn shutdown(&self) {
        if let Ok(handle) = self.session.get()
            && let Ok(Some(host)) = with_state(&handle, |st| st.host.take())
        {
            log::info!("Closing ssh session to {host}");
        }
    }
}
