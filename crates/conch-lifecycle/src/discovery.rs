//! Module discovery.
//!
//! A `ModuleSource` enumerates candidate module names (a fixed table, a
//! plugin directory, ...). The `DiscoveryService` turns each candidate into a
//! catalog descriptor by asking a `NameResolver` for the factory key and
//! looking the key up in a `FactoryTable`. Nothing is constructed here.
//!
//! One bad candidate never aborts the scan: its failure is logged, collected
//! in the `DiscoveryReport`, and the scan moves on.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use conch_types::error::ShellError;

use crate::catalog::{ModuleCatalog, ModuleDescriptor, ModuleRecipe};

/// File inside a module directory describing that module.
pub const MANIFEST_FILE: &str = "module.toml";

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Optional per-module manifest (`module.toml`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModuleManifest {
    pub aliases: Vec<String>,
    pub description: Option<String>,
    /// Command names offered by completion before the module loads.
    pub commands: Vec<String>,
    pub enabled: bool,
}

impl Default for ModuleManifest {
    fn default() -> Self {
        Self {
            aliases: Vec::new(),
            description: None,
            commands: Vec::new(),
            enabled: true,
        }
    }
}

/// One discovered module candidate.
#[derive(Debug, Clone)]
pub struct ModuleCandidate {
    pub name: String,
    pub manifest: Option<ModuleManifest>,
    /// Why this candidate cannot be cataloged, if it cannot.
    pub defect: Option<String>,
}

impl ModuleCandidate {
    /// A bare candidate with no manifest.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            manifest: None,
            defect: None,
        }
    }
}

/// Enumerates installable modules.
pub trait ModuleSource {
    /// List candidates, sorted by name.
    fn discover(&self) -> Vec<ModuleCandidate>;
}

/// A fixed list of module names.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    names: Vec<String>,
}

impl StaticSource {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        Self { names }
    }
}

impl ModuleSource for StaticSource {
    fn discover(&self) -> Vec<ModuleCandidate> {
        self.names.iter().map(|n| ModuleCandidate::named(n)).collect()
    }
}

/// Subdirectories of a modules directory.
///
/// Directories whose names begin with `_` or `.` are ignored. A directory may
/// carry a `module.toml`; one that fails to parse marks the candidate
/// defective.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_candidate(dir: &Path, name: String) -> ModuleCandidate {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return ModuleCandidate {
                name,
                manifest: None,
                defect: None,
            };
        }
        let parsed = std::fs::read_to_string(&manifest_path)
            .map_err(ShellError::from)
            .and_then(|text| toml::from_str::<ModuleManifest>(&text).map_err(ShellError::from));
        match parsed {
            Ok(manifest) => ModuleCandidate {
                name,
                manifest: Some(manifest),
                defect: None,
            },
            Err(e) => ModuleCandidate {
                name,
                manifest: None,
                defect: Some(format!("{}: {e}", manifest_path.display())),
            },
        }
    }
}

impl ModuleSource for DirectorySource {
    fn discover(&self) -> Vec<ModuleCandidate> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Cannot scan modules dir {}: {e}", self.root.display());
                return Vec::new();
            },
        };

        let mut candidates: Vec<ModuleCandidate> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                if name.starts_with('_') || name.starts_with('.') {
                    return None;
                }
                Some(Self::read_candidate(&entry.path(), name))
            })
            .collect();
        candidates.sort_by(|a, b| a.name.cmp(&b.name));
        candidates
    }
}

// ---------------------------------------------------------------------------
// Naming strategies
// ---------------------------------------------------------------------------

/// Maps a module name to the key its factory is registered under.
pub trait NameResolver {
    fn factory_key(&self, module: &str) -> String;
}

/// Capitalizes the first letter: `database` -> `Database`, `ssh` -> `Ssh`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNameResolver;

impl NameResolver for DefaultNameResolver {
    fn factory_key(&self, module: &str) -> String {
        let mut chars = module.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Explicit overrides (`ssh` -> `SSH`) with the default rule as fallback.
#[derive(Debug, Clone, Default)]
pub struct MappedNameResolver {
    mappings: HashMap<String, String>,
}

impl MappedNameResolver {
    pub fn new(mappings: HashMap<String, String>) -> Self {
        Self { mappings }
    }
}

impl NameResolver for MappedNameResolver {
    fn factory_key(&self, module: &str) -> String {
        match self.mappings.get(module) {
            Some(key) => key.clone(),
            None => DefaultNameResolver.factory_key(module),
        }
    }
}

// ---------------------------------------------------------------------------
// Factories
// ---------------------------------------------------------------------------

/// A registered module type: its recipe plus static metadata.
#[derive(Debug, Clone)]
pub struct ModuleFactory {
    recipe: ModuleRecipe,
    aliases: Vec<String>,
    description: String,
    command_hints: Vec<String>,
}

impl ModuleFactory {
    pub fn new(recipe: ModuleRecipe) -> Self {
        Self {
            recipe,
            aliases: Vec::new(),
            description: String::new(),
            command_hints: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn commands(mut self, hints: &[&str]) -> Self {
        self.command_hints.extend(hints.iter().map(|h| h.to_string()));
        self
    }

    /// Build the catalog descriptor for `name`, folding in `manifest`.
    pub(crate) fn descriptor(&self, name: &str, manifest: Option<&ModuleManifest>) -> ModuleDescriptor {
        let mut aliases = self.aliases.clone();
        let mut hints = self.command_hints.clone();
        let mut description = self.description.as_str();
        if let Some(manifest) = manifest {
            merge_unique(&mut aliases, &manifest.aliases);
            merge_unique(&mut hints, &manifest.commands);
            if let Some(d) = &manifest.description {
                description = d.as_str();
            }
        }
        ModuleDescriptor::new(name, self.recipe.clone())
            .with_aliases(aliases)
            .with_description(description)
            .with_command_hints(hints)
    }
}

fn merge_unique(into: &mut Vec<String>, extra: &[String]) {
    for item in extra {
        if !into.contains(item) {
            into.push(item.clone());
        }
    }
}

/// Registry of constructible module types, keyed by factory key.
#[derive(Debug, Clone, Default)]
pub struct FactoryTable {
    factories: HashMap<String, ModuleFactory>,
}

impl FactoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `key`, replacing any previous one.
    pub fn register(&mut self, key: &str, factory: ModuleFactory) {
        if self.factories.insert(key.to_string(), factory).is_some() {
            log::warn!("Factory '{key}' registered twice; keeping the latest");
        }
    }

    pub fn get(&self, key: &str) -> Option<&ModuleFactory> {
        self.factories.get(key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// A candidate that could not be cataloged.
#[derive(Debug)]
pub struct DiscoveryFailure {
    pub module: String,
    pub error: ShellError,
}

/// Outcome of one discovery pass.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Cataloged, in discovery order.
    pub registered: Vec<String>,
    /// Skipped because of the exclude set.
    pub excluded: Vec<String>,
    /// Skipped because their manifest says `enabled = false`.
    pub disabled: Vec<String>,
    pub failures: Vec<DiscoveryFailure>,
}

impl DiscoveryReport {
    /// No candidate failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Populates the catalog from a source, once per session.
pub struct DiscoveryService {
    source: Box<dyn ModuleSource>,
    populated: bool,
}

impl DiscoveryService {
    pub fn new(source: Box<dyn ModuleSource>) -> Self {
        Self {
            source,
            populated: false,
        }
    }

    /// Enumerate candidate names without touching any catalog.
    pub fn discover(&self) -> Vec<String> {
        self.source.discover().into_iter().map(|c| c.name).collect()
    }

    /// Whether `populate` has already run.
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    /// Catalog every discovered candidate not in `exclude`.
    ///
    /// Runs once; later calls return an empty report.
    pub fn populate(
        &mut self,
        catalog: &mut ModuleCatalog,
        resolver: &dyn NameResolver,
        factories: &FactoryTable,
        exclude: &HashSet<String>,
    ) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        if self.populated {
            log::debug!("Discovery already ran this session; skipping");
            return report;
        }
        self.populated = true;

        for candidate in self.source.discover() {
            let name = candidate.name;
            if exclude.contains(&name) {
                report.excluded.push(name);
                continue;
            }
            if let Some(defect) = candidate.defect {
                fail(&mut report, name, ShellError::Discovery(defect));
                continue;
            }
            if candidate.manifest.as_ref().is_some_and(|m| !m.enabled) {
                log::info!("Module '{name}' disabled by its manifest");
                report.disabled.push(name);
                continue;
            }

            let key = resolver.factory_key(&name);
            let Some(factory) = factories.get(&key) else {
                let err = ShellError::Discovery(format!("no factory '{key}' for module '{name}'"));
                fail(&mut report, name, err);
                continue;
            };

            let descriptor = factory.descriptor(&name, candidate.manifest.as_ref());
            match catalog.add_descriptor(descriptor) {
                Ok(()) => report.registered.push(name),
                Err(e) => fail(&mut report, name, e),
            }
        }

        log::info!(
            "Discovered {} module(s), {} failed",
            report.registered.len(),
            report.failures.len()
        );
        report
    }
}

fn fail(report: &mut DiscoveryReport, module: String, error: ShellError) {
    log::warn!("Skipping module '{module}': {error}");
    report.failures.push(DiscoveryFailure { module, error });
}
