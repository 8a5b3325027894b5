//! Module catalog: every known module, its recipe, aliases and load state.

use std::collections::HashMap;
use std::rc::Rc;

use conch_registry::{AliasIndex, Module};
use conch_types::error::{Result, ShellError};

type BuildFn = dyn Fn() -> Result<Rc<dyn Module>>;

/// Opaque construction recipe. Never invoked before load time.
#[derive(Clone)]
pub struct ModuleRecipe(Rc<BuildFn>);

impl ModuleRecipe {
    /// Wrap a constructor for a concrete module type.
    pub fn new<M, F>(build: F) -> Self
    where
        M: Module + 'static,
        F: Fn() -> Result<M> + 'static,
    {
        Self(Rc::new(move || Ok(Rc::new(build()?) as Rc<dyn Module>)))
    }

    /// Run the recipe.
    pub fn build(&self) -> Result<Rc<dyn Module>> {
        (self.0)()
    }
}

impl std::fmt::Debug for ModuleRecipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ModuleRecipe(..)")
    }
}

/// Identity of a loadable module.
pub struct ModuleDescriptor {
    name: String,
    aliases: Vec<String>,
    description: String,
    command_hints: Vec<String>,
    recipe: ModuleRecipe,
    instance: Option<Rc<dyn Module>>,
}

impl ModuleDescriptor {
    pub fn new(name: &str, recipe: ModuleRecipe) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            description: String::new(),
            command_hints: Vec::new(),
            recipe,
            instance: None,
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Command names the module is expected to declare, offered by
    /// completion before the module is loaded.
    pub fn with_command_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command_hints.extend(hints.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn command_hints(&self) -> &[String] {
        &self.command_hints
    }

    pub fn recipe(&self) -> &ModuleRecipe {
        &self.recipe
    }

    /// The live instance, once loaded.
    pub fn instance(&self) -> Option<Rc<dyn Module>> {
        self.instance.as_ref().map(Rc::clone)
    }

    pub fn is_loaded(&self) -> bool {
        self.instance.is_some()
    }
}

impl std::fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}

/// Bookkeeping for "what modules exist, what are they called, are they loaded".
#[derive(Default)]
pub struct ModuleCatalog {
    descriptors: HashMap<String, ModuleDescriptor>,
    order: Vec<String>,
    aliases: AliasIndex,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor.
    ///
    /// Fails with `DuplicateModule` if the name is taken, and with
    /// `DuplicateAlias` if the name is someone's alias or any alias collides
    /// with an existing alias or canonical name (including its own). The
    /// catalog is left untouched on failure.
    pub fn add_descriptor(&mut self, descriptor: ModuleDescriptor) -> Result<()> {
        let owned = descriptor.name.clone();
        let name = owned.as_str();
        if self.descriptors.contains_key(name) {
            return Err(ShellError::DuplicateModule(name.to_string()));
        }
        if let Some(owner) = self.aliases.resolve(name) {
            return Err(duplicate_alias(name, owner));
        }
        for (i, alias) in descriptor.aliases.iter().enumerate() {
            if alias == name || descriptor.aliases[..i].contains(alias) {
                return Err(duplicate_alias(alias, name));
            }
            if self.descriptors.contains_key(alias) {
                return Err(duplicate_alias(alias, alias));
            }
            if let Some(owner) = self.aliases.resolve(alias) {
                return Err(duplicate_alias(alias, owner));
            }
        }

        for alias in &descriptor.aliases {
            self.aliases.insert(alias, name)?;
        }
        log::debug!(
            "Cataloged '{name}' (aliases: {})",
            descriptor.aliases.join(", ")
        );
        self.order.push(name.to_string());
        self.descriptors.insert(name.to_string(), descriptor);
        Ok(())
    }

    /// Record `instance` as the live module for `name`.
    ///
    /// Returns `false` (and keeps the first instance) if it was already
    /// loaded.
    pub fn mark_loaded(&mut self, name: &str, instance: Rc<dyn Module>) -> Result<bool> {
        let descriptor = self
            .descriptors
            .get_mut(name)
            .ok_or_else(|| ShellError::ModuleNotFound(name.to_string()))?;
        if descriptor.instance.is_some() {
            return Ok(false);
        }
        descriptor.instance = Some(instance);
        Ok(true)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.descriptors.get(name).is_some_and(ModuleDescriptor::is_loaded)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    /// Canonical name for a module alias.
    pub fn resolve_alias(&self, alias: &str) -> Option<&str> {
        self.aliases.resolve(alias)
    }

    /// Canonical name for `token`, accepting either a name or an alias.
    pub fn canonical<'a>(&'a self, token: &'a str) -> Option<&'a str> {
        if self.descriptors.contains_key(token) {
            return Some(token);
        }
        self.aliases.resolve(token)
    }

    pub fn get(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.descriptors.get(name)
    }

    /// The live instance for `name`, if loaded.
    pub fn instance(&self, name: &str) -> Option<Rc<dyn Module>> {
        self.descriptors.get(name)?.instance()
    }

    /// The module alias index.
    pub fn aliases(&self) -> &AliasIndex {
        &self.aliases
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Read-only view for completion and listings.
    pub fn snapshot(&self) -> CatalogView<'_> {
        CatalogView { catalog: self }
    }
}

fn duplicate_alias(alias: &str, owner: &str) -> ShellError {
    ShellError::DuplicateAlias {
        alias: alias.to_string(),
        owner: owner.to_string(),
    }
}

/// Borrowed, read-only view of the catalog.
#[derive(Clone, Copy)]
pub struct CatalogView<'a> {
    catalog: &'a ModuleCatalog,
}

impl<'a> CatalogView<'a> {
    /// Descriptors in the order they were cataloged.
    pub fn descriptors(&self) -> impl Iterator<Item = &'a ModuleDescriptor> + 'a {
        let catalog = self.catalog;
        catalog
            .order
            .iter()
            .filter_map(move |name| catalog.descriptors.get(name))
    }

    /// Canonical names in catalog order.
    pub fn names(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.descriptors().map(ModuleDescriptor::name)
    }

    /// Names of modules not yet loaded.
    pub fn pending(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.descriptors()
            .filter(|d| !d.is_loaded())
            .map(ModuleDescriptor::name)
    }

    /// All `(alias, canonical)` pairs, unordered.
    pub fn aliases(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.catalog.aliases.iter()
    }

    pub fn get(&self, name: &str) -> Option<&'a ModuleDescriptor> {
        self.catalog.descriptors.get(name)
    }

    pub fn canonical(&self, token: &'a str) -> Option<&'a str> {
        self.catalog.canonical(token)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.catalog.is_loaded(name)
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use conch_registry::CommandDeclarer;

    use super::*;

    struct Dummy(&'static str);

    impl Module for Dummy {
        fn name(&self) -> &str {
            self.0
        }
        fn declare_commands(&self, _: &mut CommandDeclarer<'_>) -> Result<()> {
            Ok(())
        }
    }

    fn recipe(name: &'static str) -> ModuleRecipe {
        ModuleRecipe::new(move || Ok(Dummy(name)))
    }

    fn desc(name: &'static str, aliases: &[&str]) -> ModuleDescriptor {
        ModuleDescriptor::new(name, recipe(name)).with_aliases(aliases.iter().copied())
    }

    #[test]
    fn add_and_resolve() {
        let mut cat = ModuleCatalog::new();
        cat.add_descriptor(desc("database", &["db"])).unwrap();
        assert!(cat.contains("database"));
        assert_eq!(cat.resolve_alias("db"), Some("database"));
        assert_eq!(cat.canonical("db"), Some("database"));
        assert_eq!(cat.canonical("database"), Some("database"));
        assert_eq!(cat.canonical("ssh"), None);
        assert!(!cat.is_loaded("database"));
    }

    #[test]
    fn duplicate_module_rejected() {
        let mut cat = ModuleCatalog::new();
        cat.add_descriptor(desc("ssh", &[])).unwrap();
        let err = cat.add_descriptor(desc("ssh", &["s"])).unwrap_err();
        assert!(matches!(err, ShellError::DuplicateModule(_)));
        assert_eq!(cat.resolve_alias("s"), None);
    }

    #[test]
    fn alias_colliding_with_alias_rejected() {
        let mut cat = ModuleCatalog::new();
        cat.add_descriptor(desc("database", &["db"])).unwrap();
        let err = cat.add_descriptor(desc("dynamo", &["dy", "db"])).unwrap_err();
        assert!(matches!(err, ShellError::DuplicateAlias { ref owner, .. } if owner == "database"));
        assert!(!cat.contains("dynamo"));
        assert_eq!(cat.resolve_alias("dy"), None);
    }

    #[test]
    fn alias_colliding_with_canonical_name_rejected() {
        let mut cat = ModuleCatalog::new();
        cat.add_descriptor(desc("ssh", &[])).unwrap();
        assert!(matches!(
            cat.add_descriptor(desc("secure", &["ssh"])),
            Err(ShellError::DuplicateAlias { .. })
        ));
    }

    #[test]
    fn name_colliding_with_existing_alias_rejected() {
        let mut cat = ModuleCatalog::new();
        cat.add_descriptor(desc("database", &["db"])).unwrap();
        assert!(matches!(
            cat.add_descriptor(desc("db", &[])),
            Err(ShellError::DuplicateAlias { .. })
        ));
    }

    #[test]
    fn own_name_is_reserved() {
        let mut cat = ModuleCatalog::new();
        assert!(cat.add_descriptor(desc("ssh", &["ssh"])).is_err());
        assert!(cat.add_descriptor(desc("ssh", &["s", "s"])).is_err());
        assert!(cat.is_empty());
    }

    #[test]
    fn mark_loaded_is_idempotent() {
        let mut cat = ModuleCatalog::new();
        cat.add_descriptor(desc("ssh", &[])).unwrap();
        let first: Rc<dyn Module> = Rc::new(Dummy("ssh"));
        assert!(cat.mark_loaded("ssh", Rc::clone(&first)).unwrap());
        assert!(!cat.mark_loaded("ssh", Rc::new(Dummy("ssh"))).unwrap());
        assert!(cat.is_loaded("ssh"));
        assert!(Rc::ptr_eq(&cat.instance("ssh").unwrap(), &first));
    }

    #[test]
    fn mark_loaded_unknown_is_not_found() {
        let mut cat = ModuleCatalog::new();
        let err = cat.mark_loaded("nope", Rc::new(Dummy("nope"))).unwrap_err();
        assert!(matches!(err, ShellError::ModuleNotFound(_)));
    }

    #[test]
    fn recipe_is_not_invoked_by_cataloging() {
        use std::cell::Cell;
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let recipe = ModuleRecipe::new(move || {
            counter.set(counter.get() + 1);
            Ok(Dummy("ssh"))
        });
        let mut cat = ModuleCatalog::new();
        cat.add_descriptor(ModuleDescriptor::new("ssh", recipe)).unwrap();
        assert_eq!(calls.get(), 0);
        cat.get("ssh").unwrap().recipe().build().unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn snapshot_reports_order_and_pending() {
        let mut cat = ModuleCatalog::new();
        cat.add_descriptor(desc("ssh", &[])).unwrap();
        cat.add_descriptor(desc("database", &["db"])).unwrap();
        cat.mark_loaded("ssh", Rc::new(Dummy("ssh"))).unwrap();
        let view = cat.snapshot();
        assert_eq!(view.names().collect::<Vec<_>>(), vec!["ssh", "database"]);
        assert_eq!(view.pending().collect::<Vec<_>>(), vec!["database"]);
        assert_eq!(view.aliases().collect::<Vec<_>>(), vec![("db", "database")]);
        assert_eq!(view.len(), 2);
        assert!(view.is_loaded("ssh"));
    }

    #[test]
    fn descriptor_metadata() {
        let d = ModuleDescriptor::new("database", recipe("database"))
            .with_description("SQL access")
            .with_command_hints(["connect", "query"]);
        assert_eq!(d.description(), "SQL access");
        assert_eq!(d.command_hints(), ["connect", "query"]);
        assert!(format!("{d:?}").contains("database"));
    }

    mod properties {
        use std::collections::HashSet;

        use proptest::prelude::*;

        use super::*;

        fn leak(s: String) -> &'static str {
            Box::leak(s.into_boxed_str())
        }

        proptest! {
            #[test]
            fn failed_adds_never_mutate_and_aliases_stay_unique(
                entries in proptest::collection::vec(
                    ("[a-e]{1,2}", proptest::collection::vec("[a-e]{1,2}", 0..3)),
                    1..24,
                ),
            ) {
                let mut cat = ModuleCatalog::new();
                for (name, aliases) in entries {
                    let before_len = cat.len();
                    let before_aliases = cat.aliases().len();
                    let d = ModuleDescriptor::new(&name, recipe(leak(name.clone())))
                        .with_aliases(aliases);
                    if cat.add_descriptor(d).is_err() {
                        prop_assert_eq!(cat.len(), before_len);
                        prop_assert_eq!(cat.aliases().len(), before_aliases);
                    }
                }

                let names: HashSet<&str> = cat.snapshot().names().collect();
                for (alias, canonical) in cat.snapshot().aliases() {
                    prop_assert!(!names.contains(alias), "alias {} shadows a module name", alias);
                    prop_assert!(names.contains(canonical));
                }
            }
        }
    }
}
