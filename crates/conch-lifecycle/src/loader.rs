//! On-demand module activation.

use std::rc::Rc;

use conch_registry::{Module, Registrar};
use conch_types::error::{Result, ShellError};

use crate::catalog::ModuleCatalog;

/// Callback run after a module finishes loading.
pub type PostLoadHook = Box<dyn FnMut(&str, &Rc<dyn Module>)>;

/// Turns catalog entries into registered, live modules.
#[derive(Default)]
pub struct Loader {
    post_load: Vec<PostLoadHook>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` after every successful load, in registration order.
    pub fn on_loaded(&mut self, hook: PostLoadHook) {
        self.post_load.push(hook);
    }

    /// Load `name` (a canonical module name) if it is not loaded yet.
    ///
    /// Builds the module from its recipe, registers it and marks it loaded.
    /// Nothing is recorded when any step fails, so the load can be retried.
    pub fn load(
        &mut self,
        catalog: &mut ModuleCatalog,
        registrar: &mut Registrar,
        name: &str,
    ) -> Result<Rc<dyn Module>> {
        if let Some(instance) = catalog.instance(name) {
            return Ok(instance);
        }
        let recipe = catalog
            .get(name)
            .map(|d| d.recipe().clone())
            .ok_or_else(|| ShellError::ModuleNotFound(name.to_string()))?;

        let instance = recipe.build().map_err(|e| ShellError::ModuleConstruction {
            module: name.to_string(),
            reason: e.to_string(),
        })?;
        if instance.name() != name {
            return Err(ShellError::ModuleConstruction {
                module: name.to_string(),
                reason: format!("recipe built a module named '{}'", instance.name()),
            });
        }

        registrar.register(Rc::clone(&instance))?;
        catalog.mark_loaded(name, Rc::clone(&instance))?;

        for hook in &mut self.post_load {
            hook(name, &instance);
        }
        log::info!(
            "Loaded module '{name}' ({} command(s))",
            registrar.table().command_count(name)
        );
        Ok(instance)
    }

    /// `load`, discarding the instance.
    pub fn ensure_loaded(
        &mut self,
        catalog: &mut ModuleCatalog,
        registrar: &mut Registrar,
        name: &str,
    ) -> Result<()> {
        self.load(catalog, registrar, name).map(|_| ())
    }
}
