//! The lifecycle facade.
//!
//! `ModuleLifecycle` owns the catalog, the registrar (and through it the
//! command table), the loader and the discovery service. The dispatch loop
//! and the completer talk only to this type.

use std::collections::HashSet;
use std::rc::Rc;

use conch_registry::{CommandTable, Module, Registrar, ResolvedCommand, SessionHandle};
use conch_types::config::ShellConfig;
use conch_types::error::{Result, ShellError};

use crate::catalog::{CatalogView, ModuleCatalog};
use crate::discovery::{DiscoveryReport, DiscoveryService, FactoryTable, ModuleSource, NameResolver};
use crate::loader::{Loader, PostLoadHook};

/// Startup knobs taken from configuration.
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Always-on module: loaded eagerly, its commands resolve by bare name.
    pub root_module: String,
    /// Names kept out of discovery, in addition to the root module.
    pub exclude: HashSet<String>,
    /// Modules loaded right after discovery.
    pub preload: Vec<String>,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            root_module: "core".to_string(),
            exclude: HashSet::new(),
            preload: Vec::new(),
        }
    }
}

impl LifecycleOptions {
    pub fn from_config(config: &ShellConfig) -> Self {
        Self {
            root_module: config.core.root_module.clone(),
            exclude: config.core.exclude.iter().cloned().collect(),
            preload: config.core.preload_modules.clone(),
        }
    }
}

/// What happened during `start`.
#[derive(Debug, Default)]
pub struct StartupReport {
    pub discovery: DiscoveryReport,
    /// Set when the root module could not be brought up.
    pub root_error: Option<ShellError>,
    pub preload_failures: Vec<(String, ShellError)>,
}

impl StartupReport {
    pub fn is_clean(&self) -> bool {
        self.discovery.is_clean() && self.root_error.is_none() && self.preload_failures.is_empty()
    }
}

/// Discovery, loading and registration behind one interface.
pub struct ModuleLifecycle {
    options: LifecycleOptions,
    catalog: ModuleCatalog,
    registrar: Registrar,
    loader: Loader,
    discovery: DiscoveryService,
    resolver: Box<dyn NameResolver>,
    factories: FactoryTable,
    started: bool,
    shut_down: bool,
}

impl ModuleLifecycle {
    pub fn new(
        options: LifecycleOptions,
        source: Box<dyn ModuleSource>,
        resolver: Box<dyn NameResolver>,
        factories: FactoryTable,
    ) -> Self {
        let table = CommandTable::new(&options.root_module);
        Self {
            options,
            catalog: ModuleCatalog::new(),
            registrar: Registrar::new(table, SessionHandle::new()),
            loader: Loader::new(),
            discovery: DiscoveryService::new(source),
            resolver,
            factories,
            started: false,
            shut_down: false,
        }
    }

    /// Discover modules, bring up the root module and run preloads.
    ///
    /// Nothing here is fatal: every failure is logged and reported. A second
    /// call does nothing.
    pub fn start(&mut self) -> StartupReport {
        let mut report = StartupReport::default();
        if self.started {
            log::debug!("Lifecycle already started");
            return report;
        }
        self.started = true;

        let root = self.options.root_module.clone();
        let mut exclude = self.options.exclude.clone();
        exclude.insert(root.clone());
        report.discovery = self.discovery.populate(
            &mut self.catalog,
            self.resolver.as_ref(),
            &self.factories,
            &exclude,
        );

        if let Err(e) = self.start_root(&root) {
            log::error!("Root module '{root}' unavailable: {e}");
            report.root_error = Some(e);
        }

        for name in self.options.preload.clone() {
            if let Err(e) = self.ensure_loaded(&name) {
                log::warn!("Preload of '{name}' failed: {e}");
                report.preload_failures.push((name, e));
            }
        }
        report
    }

    fn start_root(&mut self, root: &str) -> Result<()> {
        let key = self.resolver.factory_key(root);
        let factory = self
            .factories
            .get(&key)
            .ok_or_else(|| ShellError::Discovery(format!("no factory '{key}' for module '{root}'")))?;
        self.catalog.add_descriptor(factory.descriptor(root, None))?;
        self.ensure_loaded(root)
    }

    /// Load a module by canonical name or alias.
    pub fn load(&mut self, name: &str) -> Result<Rc<dyn Module>> {
        let canonical = self.resolve_module_name(name).unwrap_or_else(|| name.to_string());
        self.loader
            .load(&mut self.catalog, &mut self.registrar, &canonical)
    }

    /// `load`, discarding the instance.
    pub fn ensure_loaded(&mut self, name: &str) -> Result<()> {
        self.load(name).map(|_| ())
    }

    /// Whether the module named (or aliased) `name` is loaded.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.catalog
            .canonical(name)
            .is_some_and(|c| self.catalog.is_loaded(c))
    }

    /// Canonical catalog name for a module name or alias.
    pub fn resolve_module_name(&self, token: &str) -> Option<String> {
        self.catalog.canonical(token).map(str::to_string)
    }

    /// Resolve a command path against loaded modules only.
    pub fn resolve(&self, path: &str) -> Option<ResolvedCommand> {
        self.registrar.table().resolve(path, self.catalog.aliases())
    }

    pub fn resolve_tokens<S: AsRef<str>>(&self, tokens: &[S]) -> Option<ResolvedCommand> {
        self.registrar.table().resolve_tokens(tokens, self.catalog.aliases())
    }

    pub fn catalog(&self) -> CatalogView<'_> {
        self.catalog.snapshot()
    }

    pub fn table(&self) -> &CommandTable {
        self.registrar.table()
    }

    pub fn session(&self) -> &SessionHandle {
        self.registrar.session()
    }

    pub fn root_module(&self) -> &str {
        &self.options.root_module
    }

    /// Register a callback run after each successful load.
    pub fn on_loaded(&mut self, hook: PostLoadHook) {
        self.loader.on_loaded(hook);
    }

    /// Shut down every loaded module, newest first. Runs once.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.registrar.shutdown_all();
        log::info!("Shut down {} module(s)", self.table().module_names().len());
    }
}
