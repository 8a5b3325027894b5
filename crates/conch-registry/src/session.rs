//! Shared session state.
//!
//! One `SessionState` lives for the whole process. Modules receive a
//! cloneable `SessionHandle` during initialization and keep it for their
//! handlers. Everything runs on the REPL thread, so the handle is an
//! `Rc<RefCell<_>>`.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Session-wide variables plus typed per-module state.
#[derive(Default)]
pub struct SessionState {
    variables: HashMap<String, String>,
    modules: HashMap<String, Box<dyn Any>>,
}

impl SessionState {
    /// Set a session variable.
    pub fn set_variable(&mut self, name: &str, value: &str) {
        self.variables.insert(name.to_string(), value.to_string());
    }

    /// Get a session variable.
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Remove a session variable, returning its old value.
    pub fn unset_variable(&mut self, name: &str) -> Option<String> {
        self.variables.remove(name)
    }

    /// All variables sorted by name.
    pub fn variables(&self) -> Vec<(&str, &str)> {
        let mut vars: Vec<(&str, &str)> = self
            .variables
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        vars.sort_unstable();
        vars
    }

    /// Install (or replace) the typed state owned by `module`.
    pub fn insert_module_state<T: Any>(&mut self, module: &str, state: T) {
        self.modules.insert(module.to_string(), Box::new(state));
    }

    /// Borrow the typed state of `module`, if present and of type `T`.
    pub fn module_state<T: Any>(&self, module: &str) -> Option<&T> {
        self.modules.get(module)?.downcast_ref()
    }

    /// Mutably borrow the typed state of `module`.
    pub fn module_state_mut<T: Any>(&mut self, module: &str) -> Option<&mut T> {
        self.modules.get_mut(module)?.downcast_mut()
    }

    /// Whether `module` has installed any state.
    pub fn has_module_state(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }
}

/// Cloneable handle to the process-wide session.
#[derive(Clone, Default)]
pub struct SessionHandle(Rc<RefCell<SessionState>>);

impl SessionHandle {
    /// Create a handle to a fresh session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with shared access to the session.
    pub fn with<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&self.0.borrow())
    }

    /// Run `f` with exclusive access to the session.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    /// Run `f` against the typed state of `module`, if installed.
    pub fn with_module<T: Any, R>(&self, module: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.0.borrow_mut().module_state_mut::<T>(module).map(f)
    }
}
