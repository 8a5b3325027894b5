//! Lazy module lifecycle.
//!
//! Discovery fills the catalog with construction recipes at startup without
//! building anything. The loader turns a catalog entry into a live module on
//! first use, wiring it through the registrar. `ModuleLifecycle` composes the
//! pieces behind one interface for the dispatch loop and the completer.

pub mod catalog;
pub mod discovery;
pub mod lifecycle;
pub mod loader;

pub use catalog::{CatalogView, ModuleCatalog, ModuleDescriptor, ModuleRecipe};
pub use discovery::{
    DefaultNameResolver, DirectorySource, DiscoveryFailure, DiscoveryReport, DiscoveryService,
    FactoryTable, MappedNameResolver, ModuleCandidate, ModuleFactory, ModuleManifest,
    ModuleSource, NameResolver, StaticSource,
};
pub use lifecycle::{LifecycleOptions, ModuleLifecycle, StartupReport};
pub use loader::{Loader, PostLoadHook};
