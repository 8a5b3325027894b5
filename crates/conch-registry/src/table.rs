//! Command table: `module -> {command -> handler}` plus live module instances.

use std::collections::HashMap;
use std::rc::Rc;

use conch_types::error::{Result, ShellError};

use crate::alias::AliasIndex;
use crate::module::{CommandOutput, Handler, Module};

/// A declared command parameter (flag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    /// Long name without the leading `--`.
    pub long: String,
    /// Optional one-letter short form.
    pub short: Option<char>,
    pub description: String,
}

impl ParamSpec {
    /// A `--long` flag with no short form.
    pub fn long(name: &str) -> Self {
        Self {
            long: name.to_string(),
            short: None,
            description: String::new(),
        }
    }

    /// Add a `-s` short form.
    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    /// Attach a description.
    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Flag spellings offered to completion: `--long` then `-s`.
    pub fn flags(&self) -> Vec<String> {
        let mut flags = vec![format!("--{}", self.long)];
        if let Some(c) = self.short {
            flags.push(format!("-{c}"));
        }
        flags
    }
}

/// What a module hands to the declarer for one command.
pub struct CommandSpec {
    name: String,
    aliases: Vec<String>,
    description: String,
    usage: String,
    params: Vec<ParamSpec>,
    handler: Handler,
}

impl CommandSpec {
    /// A command called `name` run by `handler`.
    pub fn new<F>(name: &str, handler: F) -> Self
    where
        F: Fn(&[String]) -> Result<CommandOutput> + 'static,
    {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            description: String::new(),
            usage: String::new(),
            params: Vec::new(),
            handler: Rc::new(handler),
        }
    }

    /// Add an alternate spelling.
    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    /// One-line description.
    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Usage string (e.g. `connect <host> [--port N]`).
    pub fn usage(mut self, usage: &str) -> Self {
        self.usage = usage.to_string();
        self
    }

    /// Declare a parameter flag.
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One invocable unit, owned by the command table.
#[derive(Clone)]
pub struct CommandEntry {
    pub module: String,
    pub name: String,
    pub aliases: Vec<String>,
    pub description: String,
    pub usage: String,
    pub params: Vec<ParamSpec>,
    pub handler: Handler,
}

impl std::fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEntry")
            .field("module", &self.module)
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .finish_non_exhaustive()
    }
}

/// Result of a successful `resolve`.
#[derive(Clone)]
pub struct ResolvedCommand {
    pub module: String,
    pub command: String,
    pub handler: Handler,
    /// How many leading tokens the command path used up.
    pub consumed: usize,
}

impl std::fmt::Debug for ResolvedCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCommand")
            .field("module", &self.module)
            .field("command", &self.command)
            .field("consumed", &self.consumed)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct ModuleCommands {
    entries: HashMap<String, CommandEntry>,
    aliases: AliasIndex,
}

impl ModuleCommands {
    fn lookup(&self, token: &str) -> Option<&CommandEntry> {
        self.entries
            .get(token)
            .or_else(|| self.entries.get(self.aliases.resolve(token)?))
    }

    fn is_taken(&self, token: &str) -> bool {
        self.entries.contains_key(token) || self.aliases.contains(token)
    }
}

/// Canonical command registry consumed by execution, help and completion.
///
/// Commands of the root module (usually `core`) also resolve by bare name.
pub struct CommandTable {
    root_module: String,
    commands: HashMap<String, ModuleCommands>,
    modules: HashMap<String, Rc<dyn Module>>,
    load_order: Vec<String>,
}

impl CommandTable {
    /// Create an empty table whose bare-name commands come from `root_module`.
    pub fn new(root_module: &str) -> Self {
        Self {
            root_module: root_module.to_string(),
            commands: HashMap::new(),
            modules: HashMap::new(),
            load_order: Vec::new(),
        }
    }

    /// Name of the module whose commands resolve without a prefix.
    pub fn root_module(&self) -> &str {
        &self.root_module
    }

    // -- Commands --

    /// Add a command under `module`.
    ///
    /// Fails with `DuplicateCommand` if the name or any alias is already
    /// taken in that module (or repeated within the spec); nothing is
    /// inserted in that case.
    pub fn add_command(&mut self, module: &str, spec: CommandSpec) -> Result<()> {
        let duplicate = |command: &str| ShellError::DuplicateCommand {
            module: module.to_string(),
            command: command.to_string(),
        };

        let existing = self.commands.get(module);
        let taken = |token: &str| existing.is_some_and(|m| m.is_taken(token));
        if taken(&spec.name) {
            return Err(duplicate(&spec.name));
        }
        for (i, alias) in spec.aliases.iter().enumerate() {
            if taken(alias) || *alias == spec.name || spec.aliases[..i].contains(alias) {
                return Err(duplicate(alias));
            }
        }

        let slot = self.commands.entry(module.to_string()).or_default();
        for alias in &spec.aliases {
            slot.aliases.insert(alias, &spec.name)?;
        }
        slot.entries.insert(
            spec.name.clone(),
            CommandEntry {
                module: module.to_string(),
                name: spec.name,
                aliases: spec.aliases,
                description: spec.description,
                usage: spec.usage,
                params: spec.params,
                handler: spec.handler,
            },
        );
        Ok(())
    }

    /// Remove a command and its aliases. Used by registration rollback.
    pub fn remove_command(&mut self, module: &str, command: &str) -> Option<CommandEntry> {
        let slot = self.commands.get_mut(module)?;
        let entry = slot.entries.remove(command)?;
        slot.aliases.remove_canonical(command);
        if slot.entries.is_empty() {
            self.commands.remove(module);
        }
        Some(entry)
    }

    /// Look up a command by name or alias within `module`.
    pub fn entry(&self, module: &str, command: &str) -> Option<&CommandEntry> {
        self.commands.get(module)?.lookup(command)
    }

    /// Resolve a whitespace-separated command path.
    pub fn resolve(&self, path: &str, module_aliases: &AliasIndex) -> Option<ResolvedCommand> {
        let tokens: Vec<&str> = path.split_whitespace().collect();
        self.resolve_tokens(&tokens, module_aliases)
    }

    /// Resolve already-tokenized input.
    ///
    /// `<module> <command>` is tried first, expanding a module alias through
    /// `module_aliases` and then a command alias within the module. Failing
    /// that, the first token is tried as a root-module command.
    pub fn resolve_tokens<S: AsRef<str>>(
        &self,
        tokens: &[S],
        module_aliases: &AliasIndex,
    ) -> Option<ResolvedCommand> {
        let first = tokens.first()?.as_ref();
        let module = module_aliases.resolve(first).unwrap_or(first);

        if let Some(second) = tokens.get(1)
            && let Some(entry) = self.entry(module, second.as_ref())
        {
            return Some(resolved(entry, 2));
        }

        self.entry(&self.root_module, first).map(|entry| resolved(entry, 1))
    }

    /// Command names of `module`, sorted.
    pub fn list_commands(&self, module: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .commands
            .get(module)
            .map(|m| m.entries.keys().map(String::as_str).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    /// Entries of `module`, sorted by name.
    pub fn entries(&self, module: &str) -> Vec<&CommandEntry> {
        let mut entries: Vec<&CommandEntry> = self
            .commands
            .get(module)
            .map(|m| m.entries.values().collect())
            .unwrap_or_default();
        entries.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Command aliases of `module` as `(alias, command)` pairs, sorted.
    pub fn command_aliases(&self, module: &str) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .commands
            .get(module)
            .map(|m| m.aliases.iter().collect())
            .unwrap_or_default();
        pairs.sort_unstable();
        pairs
    }

    /// Number of commands registered under `module`.
    pub fn command_count(&self, module: &str) -> usize {
        self.commands.get(module).map_or(0, |m| m.entries.len())
    }

    /// Total number of commands across all modules.
    pub fn total_commands(&self) -> usize {
        self.commands.values().map(|m| m.entries.len()).sum()
    }

    // -- Module instances --

    /// Whether a live instance is registered under `name`.
    pub fn has_module(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// The live instance registered under `name`.
    pub fn module(&self, name: &str) -> Option<Rc<dyn Module>> {
        self.modules.get(name).map(Rc::clone)
    }

    /// Live instances in registration order.
    pub fn list_modules(&self) -> Vec<Rc<dyn Module>> {
        self.load_order
            .iter()
            .filter_map(|name| self.modules.get(name))
            .map(Rc::clone)
            .collect()
    }

    /// Names of live modules in registration order.
    pub fn module_names(&self) -> &[String] {
        &self.load_order
    }

    pub(crate) fn insert_module(&mut self, instance: Rc<dyn Module>) {
        let name = instance.name().to_string();
        self.load_order.push(name.clone());
        self.modules.insert(name, instance);
    }
}

fn resolved(entry: &CommandEntry, consumed: usize) -> ResolvedCommand {
    ResolvedCommand {
        module: entry.module.clone(),
        command: entry.name.clone(),
        handler: Rc::clone(&entry.handler),
        consumed,
    }
}
