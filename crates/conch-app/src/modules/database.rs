//! Simulated SQL database client.

use std::cell::RefCell;
use std::rc::Rc;

use conch_registry::{CommandDeclarer, CommandOutput, CommandSpec, Module, ParamSpec, SessionHandle};
use conch_types::error::{Result, ShellError};

use super::Args;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5432;

#[derive(Debug, Clone)]
struct Connection {
    host: String,
    port: u16,
    name: String,
}

#[derive(Debug, Default)]
struct DbState {
    connection: Option<Connection>,
    queries: u64,
    default_host: String,
}

/// Keeps its connection in module-owned state rather than the session.
#[derive(Default)]
pub struct DatabaseModule {
    state: Rc<RefCell<DbState>>,
}

impl DatabaseModule {
    pub fn new() -> Self {
        Self::default()
    }
}

fn connect_params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::long("host").short('H').describe("Server host"),
        ParamSpec::long("port").short('p').describe("Server port"),
        ParamSpec::long("name").short('n').describe("Database name"),
    ]
}

impl Module for DatabaseModule {
    fn name(&self) -> &str {
        "database"
    }

    fn description(&self) -> &str {
        "SQL database access"
    }

    fn declare_commands(&self, commands: &mut CommandDeclarer<'_>) -> Result<()> {
        let state = Rc::clone(&self.state);
        let params = connect_params();
        let mut spec = CommandSpec::new("connect", move |args| {
            let args = Args::parse(args, &params)?;
            let mut st = state.borrow_mut();
            let conn = Connection {
                host: args.flag("host").unwrap_or(&st.default_host).to_string(),
                port: args.number("port", DEFAULT_PORT)?,
                name: args.flag("name").unwrap_or("postgres").to_string(),
            };
            let text = format!("Connected to {}@{}:{}", conn.name, conn.host, conn.port);
            st.connection = Some(conn);
            Ok(CommandOutput::Text(text))
        })
        .usage("database connect [--host H] [--port N] [--name DB]")
        .describe("Connect to a database server");
        for param in connect_params() {
            spec = spec.param(param);
        }
        commands.add(spec)?;

        let state = Rc::clone(&self.state);
        commands.add(
            CommandSpec::new("query", move |args| {
                if args.is_empty() {
                    return Err(ShellError::Command("usage: database query <sql>".into()));
                }
                let mut st = state.borrow_mut();
                let Some(conn) = st.connection.clone() else {
                    return Err(ShellError::Command("not connected; run `db connect` first".into()));
                };
                st.queries += 1;
                Ok(CommandOutput::Table {
                    headers: vec!["database".into(), "statement".into()],
                    rows: vec![vec![conn.name, args.join(" ")]],
                })
            })
            .alias("sql")
            .usage("database query <sql>")
            .describe("Run a SQL statement"),
        )?;

        let state = Rc::clone(&self.state);
        commands.add(
            CommandSpec::new("disconnect", move |_| {
                Ok(match state.borrow_mut().connection.take() {
                    Some(conn) => CommandOutput::Text(format!("Disconnected from {}", conn.host)),
                    None => CommandOutput::Text("Not connected".into()),
                })
            })
            .describe("Close the connection"),
        )?;

        let state = Rc::clone(&self.state);
        commands.add(
            CommandSpec::new("status", move |_| {
                let st = state.borrow();
                let line = match &st.connection {
                    Some(c) => format!(
                        "Connected to {}@{}:{} ({} queries)",
                        c.name, c.host, c.port, st.queries
                    ),
                    None => "Not connected".to_string(),
                };
                Ok(CommandOutput::Text(line))
            })
            .describe("Show the connection state"),
        )
    }

    fn initialize(&self, session: &SessionHandle) -> Result<()> {
        let host = session.with(|s| s.variable("DB_HOST").unwrap_or(DEFAULT_HOST).to_string());
        log::debug!("database: default host {host}");
        self.state.borrow_mut().default_host = host;
        Ok(())
    }

    fn shutdown(&self) {
        if let Some(conn) = self.state.borrow_mut().connection.take() {
            log::info!("Closing database connection to {}", conn.host);
        }
    }
}
