//! Dispatch: one input line in, one `CommandOutput` out.

use conch_lifecycle::{ModuleLifecycle, StartupReport};
use conch_registry::{CommandOutput, ResolvedCommand};
use conch_types::error::{Result, ShellError};

use crate::completion::{Completer, Completion, Suggestion};
use crate::tokenize::tokenize;

/// Commands handled by the shell itself, ahead of any module.
pub const BUILTINS: &[(&str, &str)] = &[
    ("help", "Show commands; `help <module>` for one module"),
    ("modules", "List modules and whether they are loaded"),
    ("which", "Show which module a command path resolves to"),
    ("complete", "Show completions for a partial line"),
];

/// The interactive shell core: lifecycle plus completer.
pub struct Shell {
    lifecycle: ModuleLifecycle,
    completer: Completer,
}

impl Shell {
    pub fn new(mut lifecycle: ModuleLifecycle, mut completer: Completer) -> Self {
        for (name, description) in BUILTINS {
            completer.add_builtin(name, description);
        }
        lifecycle.on_loaded(completer.cache().invalidation_hook());
        Self {
            lifecycle,
            completer,
        }
    }

    /// Run discovery, the root module and preloads.
    pub fn start(&mut self) -> StartupReport {
        self.lifecycle.start()
    }

    pub fn lifecycle(&self) -> &ModuleLifecycle {
        &self.lifecycle
    }

    pub fn lifecycle_mut(&mut self) -> &mut ModuleLifecycle {
        &mut self.lifecycle
    }

    /// Suggestions for `line` with the cursor at byte offset `cursor`.
    pub fn complete(&self, line: &str, cursor: usize) -> Completion {
        self.completer.complete(&self.lifecycle, line, cursor)
    }

    /// Execute one line of input.
    ///
    /// A command whose module is cataloged but not loaded triggers the load
    /// first. Failures come back as errors; the shell stays usable.
    pub fn execute(&mut self, line: &str) -> Result<CommandOutput> {
        if let Some(partial) = strip_word(line.trim_start(), "complete") {
            return Ok(self.complete_builtin(partial));
        }

        let tokens = tokenize(line)?;
        let Some(first) = tokens.first() else {
            return Ok(CommandOutput::None);
        };
        match first.as_str() {
            "help" => self.help(tokens.get(1).map(String::as_str)),
            "modules" => Ok(self.modules()),
            "which" => self.which(&tokens[1..]),
            _ => self.dispatch(&tokens),
        }
    }

    /// Shut down loaded modules.
    pub fn shutdown(&mut self) {
        self.lifecycle.shutdown();
    }

    fn dispatch(&mut self, tokens: &[String]) -> Result<CommandOutput> {
        if let Some(hit) = self.lifecycle.resolve_tokens(tokens) {
            return run(&hit, tokens);
        }

        let first = &tokens[0];
        let Some(module) = self.lifecycle.resolve_module_name(first) else {
            return Err(ShellError::CommandNotFound(first.clone()));
        };
        if !self.lifecycle.is_loaded(&module) {
            self.lifecycle.ensure_loaded(&module)?;
            if let Some(hit) = self.lifecycle.resolve_tokens(tokens) {
                return run(&hit, tokens);
            }
        }

        match tokens.get(1) {
            None => Ok(self.command_listing(&module)),
            Some(command) => Err(ShellError::CommandNotFound(format!("{module} {command}"))),
        }
    }

    fn command_listing(&self, module: &str) -> CommandOutput {
        let entries = self.lifecycle.table().entries(module);
        if entries.is_empty() {
            return CommandOutput::Text(format!("Module '{module}' has no commands"));
        }
        CommandOutput::Table {
            headers: vec!["command".into(), "description".into()],
            rows: entries
                .into_iter()
                .map(|e| vec![e.name.clone(), e.description.clone()])
                .collect(),
        }
    }

    fn help(&mut self, topic: Option<&str>) -> Result<CommandOutput> {
        let Some(topic) = topic else {
            return Ok(self.help_overview());
        };

        if let Some(module) = self.lifecycle.resolve_module_name(topic) {
            self.lifecycle.ensure_loaded(&module)?;
            let rows = self
                .lifecycle
                .table()
                .entries(&module)
                .into_iter()
                .map(|e| {
                    let flags: Vec<String> = e.params.iter().flat_map(|p| p.flags()).collect();
                    vec![
                        e.name.clone(),
                        e.aliases.join(", "),
                        e.usage.clone(),
                        flags.join(" "),
                        e.description.clone(),
                    ]
                })
                .collect();
            return Ok(CommandOutput::Table {
                headers: ["command", "aliases", "usage", "flags", "description"]
                    .map(String::from)
                    .to_vec(),
                rows,
            });
        }

        let root = self.lifecycle.root_module();
        if let Some(entry) = self.lifecycle.table().entry(root, topic) {
            let mut text = format!("{}: {}", entry.name, entry.description);
            if !entry.usage.is_empty() {
                text.push_str(&format!("\nusage: {}", entry.usage));
            }
            for param in &entry.params {
                text.push_str(&format!("\n  {}  {}", param.flags().join(", "), param.description));
            }
            return Ok(CommandOutput::Text(text));
        }

        if let Some((name, description)) = BUILTINS.iter().find(|(name, _)| *name == topic) {
            return Ok(CommandOutput::Text(format!("{name}: {description}")));
        }
        Err(ShellError::CommandNotFound(topic.to_string()))
    }

    fn help_overview(&self) -> CommandOutput {
        let mut rows: Vec<Vec<String>> = BUILTINS
            .iter()
            .map(|(name, description)| vec![name.to_string(), "builtin".into(), description.to_string()])
            .collect();
        let table = self.lifecycle.table();
        for entry in table.entries(self.lifecycle.root_module()) {
            rows.push(vec![entry.name.clone(), "command".into(), entry.description.clone()]);
        }
        for descriptor in self.lifecycle.catalog().descriptors() {
            if descriptor.name() == self.lifecycle.root_module() {
                continue;
            }
            rows.push(vec![
                descriptor.name().to_string(),
                "module".into(),
                descriptor.description().to_string(),
            ]);
        }
        CommandOutput::Table {
            headers: vec!["name".into(), "kind".into(), "description".into()],
            rows,
        }
    }

    fn modules(&self) -> CommandOutput {
        let rows = self
            .lifecycle
            .catalog()
            .descriptors()
            .map(|d| {
                let (state, version, description) = match d.instance() {
                    Some(m) => {
                        let description = if m.description().is_empty() {
                            d.description().to_string()
                        } else {
                            m.description().to_string()
                        };
                        ("loaded", m.version().to_string(), description)
                    },
                    None => ("lazy", "-".to_string(), d.description().to_string()),
                };
                vec![
                    d.name().to_string(),
                    d.aliases().join(", "),
                    state.to_string(),
                    version,
                    description,
                ]
            })
            .collect();
        CommandOutput::Table {
            headers: ["module", "aliases", "state", "version", "description"]
                .map(String::from)
                .to_vec(),
            rows,
        }
    }

    fn which(&self, path: &[String]) -> Result<CommandOutput> {
        let Some(first) = path.first() else {
            return Err(ShellError::Command("usage: which <command path>".into()));
        };
        if let Some(hit) = self.lifecycle.resolve_tokens(path) {
            return Ok(CommandOutput::Text(format!(
                "{} {} (module '{}')",
                hit.module, hit.command, hit.module
            )));
        }
        match self.lifecycle.resolve_module_name(first) {
            Some(module) if !self.lifecycle.is_loaded(&module) => Ok(CommandOutput::Text(format!(
                "{} belongs to module '{module}' (not loaded)",
                path.join(" ")
            ))),
            _ => Err(ShellError::CommandNotFound(path.join(" "))),
        }
    }

    fn complete_builtin(&self, partial: &str) -> CommandOutput {
        let suggestions = if partial.trim().is_empty() {
            self.completer.top_level(&self.lifecycle)
        } else {
            self.complete(partial, partial.len()).suggestions
        };
        render_suggestions(suggestions)
    }
}

fn run(hit: &ResolvedCommand, tokens: &[String]) -> Result<CommandOutput> {
    log::debug!("Dispatching {} {}", hit.module, hit.command);
    (hit.handler)(&tokens[hit.consumed..])
}

/// `Some(rest)` if `line` starts with the whole word `word`.
fn strip_word<'a>(line: &'a str, word: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(word)?;
    let mut chars = rest.chars();
    match chars.next() {
        None => Some(""),
        Some(c) if c.is_whitespace() => Some(chars.as_str()),
        Some(_) => None,
    }
}

fn render_suggestions(suggestions: Vec<Suggestion>) -> CommandOutput {
    if suggestions.is_empty() {
        return CommandOutput::Text("No suggestions".into());
    }
    CommandOutput::Table {
        headers: vec!["suggestion".into(), "description".into()],
        rows: suggestions.into_iter().map(|s| vec![s.value, s.meta]).collect(),
    }
}
