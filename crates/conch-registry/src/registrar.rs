//! Two-phase module activation.
//!
//! Phase A runs the module's declaration hook against the command table,
//! recording each command it adds. Phase B runs the initialization hook
//! with the session handle. If either phase fails, every command recorded
//! in Phase A is removed again and the failure is wrapped in
//! `ModuleRegistration`. A module is only listed as registered once both
//! phases succeed.

use std::rc::Rc;

use conch_types::error::{Result, ShellError};

use crate::module::Module;
use crate::session::SessionHandle;
use crate::table::{CommandSpec, CommandTable};

/// Handle given to a module's declaration hook.
///
/// Scoped to one module: every command lands under that module's name and
/// is remembered so the registrar can undo it.
pub struct CommandDeclarer<'a> {
    table: &'a mut CommandTable,
    module: String,
    added: Vec<String>,
    error: Option<ShellError>,
}

impl<'a> CommandDeclarer<'a> {
    fn new(table: &'a mut CommandTable, module: &str) -> Self {
        Self {
            table,
            module: module.to_string(),
            added: Vec::new(),
            error: None,
        }
    }

    /// Declare a command. Fails with `DuplicateCommand` on a name or
    /// alias collision.
    ///
    /// A failed declaration fails the whole registration even if the module
    /// ignores the returned error.
    pub fn add(&mut self, spec: CommandSpec) -> Result<()> {
        let name = spec.name().to_string();
        match self.table.add_command(&self.module, spec) {
            Ok(()) => {
                self.added.push(name);
                Ok(())
            },
            Err(e) => {
                if self.error.is_none() {
                    let command = match &e {
                        ShellError::DuplicateCommand { command, .. } => command.clone(),
                        _ => name,
                    };
                    self.error = Some(ShellError::DuplicateCommand {
                        module: self.module.clone(),
                        command,
                    });
                }
                Err(e)
            },
        }
    }

    /// Name of the module being declared.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Commands declared so far.
    pub fn declared(&self) -> &[String] {
        &self.added
    }
}

/// Owns the command table and performs module registration against it.
pub struct Registrar {
    table: CommandTable,
    session: SessionHandle,
}

impl Registrar {
    /// Create a registrar over `table`, injecting `session` in Phase B.
    pub fn new(table: CommandTable, session: SessionHandle) -> Self {
        Self { table, session }
    }

    /// Activate `instance`: declare its commands, then initialize it.
    pub fn register(&mut self, instance: Rc<dyn Module>) -> Result<()> {
        let name = instance.name().to_string();
        if self.table.has_module(&name) {
            return Err(ShellError::AlreadyRegistered(name));
        }

        // Phase A.
        let mut declarer = CommandDeclarer::new(&mut self.table, &name);
        let declared = instance.declare_commands(&mut declarer);
        let added = std::mem::take(&mut declarer.added);
        let swallowed = declarer.error.take();
        let phase_a = match (declared, swallowed) {
            (Err(e), _) | (Ok(()), Some(e)) => Err(e),
            (Ok(()), None) => Ok(()),
        };

        // Phase B only runs on a clean Phase A.
        let outcome = phase_a.and_then(|()| instance.initialize(&self.session));

        if let Err(cause) = outcome {
            for command in &added {
                self.table.remove_command(&name, command);
            }
            log::warn!(
                "Registration of '{name}' failed, rolled back {} command(s): {cause}",
                added.len()
            );
            return Err(ShellError::registration(name, cause));
        }

        log::debug!("Registered '{name}' with {} command(s)", added.len());
        self.table.insert_module(instance);
        Ok(())
    }

    /// Whether a module called `name` is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.table.has_module(name)
    }

    /// The registered instance called `name`.
    pub fn get_module(&self, name: &str) -> Option<Rc<dyn Module>> {
        self.table.module(name)
    }

    /// Read-only access to the command table.
    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    /// The session injected into modules.
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Call `shutdown` on every registered module, newest first.
    pub fn shutdown_all(&self) {
        for module in self.table.list_modules().iter().rev() {
            log::debug!("Shutting down '{}'", module.name());
            module.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::alias::AliasIndex;
    use crate::module::CommandOutput;

    /// Configurable test module.
    struct TestModule {
        name: &'static str,
        commands: Vec<(&'static str, Option<&'static str>)>,
        swallow_errors: bool,
        fail_init: bool,
        init_calls: Cell<u32>,
        shutdowns: Rc<RefCell<Vec<String>>>,
    }

    impl TestModule {
        fn new(name: &'static str, commands: &[&'static str]) -> Self {
            Self {
                name,
                commands: commands.iter().map(|c| (*c, None)).collect(),
                swallow_errors: false,
                fail_init: false,
                init_calls: Cell::new(0),
                shutdowns: Rc::default(),
            }
        }
    }

    impl Module for TestModule {
        fn name(&self) -> &str {
            self.name
        }

        fn declare_commands(&self, commands: &mut CommandDeclarer<'_>) -> Result<()> {
            for (name, alias) in &self.commands {
                let mut spec = CommandSpec::new(name, |_| Ok(CommandOutput::None));
                if let Some(alias) = alias {
                    spec = spec.alias(alias);
                }
                let result = commands.add(spec);
                if !self.swallow_errors {
                    result?;
                }
            }
            Ok(())
        }

        fn initialize(&self, session: &SessionHandle) -> Result<()> {
            self.init_calls.set(self.init_calls.get() + 1);
            if self.fail_init {
                return Err(ShellError::Command("backing store unavailable".into()));
            }
            session.with_mut(|s| s.set_variable("initialized", self.name));
            Ok(())
        }

        fn shutdown(&self) {
            self.shutdowns.borrow_mut().push(self.name.to_string());
        }
    }

    fn registrar() -> Registrar {
        Registrar::new(CommandTable::new("core"), SessionHandle::new())
    }

    #[test]
    fn register_adds_commands_and_initializes() {
        let mut reg = registrar();
        let module = Rc::new(TestModule::new("database", &["connect", "query"]));
        reg.register(Rc::clone(&module) as Rc<dyn Module>).unwrap();
        assert!(reg.is_registered("database"));
        assert_eq!(reg.table().list_commands("database"), vec!["connect", "query"]);
        assert_eq!(module.init_calls.get(), 1);
        assert_eq!(
            reg.session().with(|s| s.variable("initialized").map(String::from)),
            Some("database".to_string())
        );
        assert!(reg.get_module("database").is_some());
    }

    #[test]
    fn phase_b_failure_rolls_back_commands() {
        let mut reg = registrar();
        let mut module = TestModule::new("database", &["connect", "query"]);
        module.fail_init = true;
        let err = reg.register(Rc::new(module)).unwrap_err();
        assert!(matches!(err, ShellError::ModuleRegistration { ref module, .. } if module == "database"));
        assert!(matches!(err.root_cause(), ShellError::Command(_)));
        assert_eq!(reg.table().command_count("database"), 0);
        assert!(!reg.is_registered("database"));
        assert!(reg.table().resolve("database connect", &AliasIndex::new()).is_none());
    }

    #[test]
    fn duplicate_command_rolls_back_everything() {
        let mut reg = registrar();
        let module = TestModule::new("ssh", &["env", "env"]);
        let err = reg.register(Rc::new(module)).unwrap_err();
        assert!(matches!(err.root_cause(), ShellError::DuplicateCommand { .. }));
        assert_eq!(reg.table().command_count("ssh"), 0);
        assert!(!reg.is_registered("ssh"));
    }

    #[test]
    fn swallowed_declaration_error_still_fails() {
        let mut reg = registrar();
        let mut module = TestModule::new("ssh", &["connect", "connect", "tail"]);
        module.swallow_errors = true;
        let err = reg.register(Rc::new(module)).unwrap_err();
        assert!(matches!(err.root_cause(), ShellError::DuplicateCommand { .. }));
        assert_eq!(reg.table().total_commands(), 0);
    }

    #[test]
    fn swallowed_alias_collision_names_the_alias() {
        let mut reg = registrar();
        let mut module = TestModule::new("ssh", &[]);
        module.commands = vec![("connect", Some("c")), ("cat", Some("c"))];
        module.swallow_errors = true;
        let err = reg.register(Rc::new(module)).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            ShellError::DuplicateCommand { module, command } if module == "ssh" && command == "c"
        ));
        assert_eq!(reg.table().total_commands(), 0);
    }

    #[test]
    fn phase_b_not_run_after_phase_a_failure() {
        let mut reg = registrar();
        let module = Rc::new(TestModule::new("ssh", &["env", "env"]));
        assert!(reg.register(Rc::clone(&module) as Rc<dyn Module>).is_err());
        assert_eq!(module.init_calls.get(), 0);
    }

    #[test]
    fn alias_collision_rolls_back() {
        let mut reg = registrar();
        let mut module = TestModule::new("ssh", &[]);
        module.commands = vec![("connect", Some("c")), ("config", Some("c"))];
        assert!(reg.register(Rc::new(module)).is_err());
        assert!(reg.table().entry("ssh", "c").is_none());
        assert!(reg.table().command_aliases("ssh").is_empty());
    }

    #[test]
    fn already_registered_rejected() {
        let mut reg = registrar();
        reg.register(Rc::new(TestModule::new("ssh", &["connect"]))).unwrap();
        let err = reg
            .register(Rc::new(TestModule::new("ssh", &["tail"])))
            .unwrap_err();
        assert!(matches!(err, ShellError::AlreadyRegistered(ref n) if n == "ssh"));
        assert_eq!(reg.table().list_commands("ssh"), vec!["connect"]);
    }

    #[test]
    fn failed_module_can_be_retried() {
        let mut reg = registrar();
        let mut broken = TestModule::new("database", &["connect"]);
        broken.fail_init = true;
        assert!(reg.register(Rc::new(broken)).is_err());
        reg.register(Rc::new(TestModule::new("database", &["connect"])))
            .unwrap();
        assert_eq!(reg.table().command_count("database"), 1);
    }

    #[test]
    fn failure_leaves_other_modules_untouched() {
        let mut reg = registrar();
        reg.register(Rc::new(TestModule::new("ssh", &["connect"]))).unwrap();
        let mut broken = TestModule::new("database", &["connect"]);
        broken.fail_init = true;
        assert!(reg.register(Rc::new(broken)).is_err());
        assert_eq!(reg.table().list_commands("ssh"), vec!["connect"]);
    }

    #[test]
    fn shutdown_runs_newest_first() {
        let mut reg = registrar();
        let log = Rc::new(RefCell::new(Vec::new()));
        for name in ["core", "ssh", "database"] {
            let mut m = TestModule::new(name, &[]);
            m.shutdowns = Rc::clone(&log);
            reg.register(Rc::new(m)).unwrap();
        }
        reg.shutdown_all();
        assert_eq!(*log.borrow(), vec!["database", "ssh", "core"]);
    }
}
