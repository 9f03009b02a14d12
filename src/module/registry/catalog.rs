//! Module catalog
//!
//! Explicit, statically enumerable registry of the modules this host knows
//! about: name -> (descriptor, factory). Built once at startup.

use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::module::traits::{Module, ModuleDescriptor, ModuleError};

/// Builds a module instance from its descriptor
pub type ModuleFactory = Arc<dyn Fn(&ModuleDescriptor) -> Box<dyn Module> + Send + Sync>;

/// One catalog entry
#[derive(Clone)]
pub struct CatalogEntry {
    pub descriptor: ModuleDescriptor,
    pub factory: ModuleFactory,
}

impl CatalogEntry {
    pub fn instantiate(&self) -> Box<dyn Module> {
        (self.factory)(&self.descriptor)
    }
}

impl fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// Ordered module catalog; enumeration order is registration order
#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
    entries: Vec<CatalogEntry>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module; names must be unique
    pub fn register<F>(&mut self, descriptor: ModuleDescriptor, factory: F) -> Result<(), ModuleError>
    where
        F: Fn(&ModuleDescriptor) -> Box<dyn Module> + Send + Sync + 'static,
    {
        if self.contains(&descriptor.name) {
            return Err(ModuleError::DuplicateModule(descriptor.name));
        }
        debug!("Registered module {} at {}", descriptor.name, descriptor.base_path);
        self.entries.push(CatalogEntry {
            descriptor,
            factory: Arc::new(factory),
        });
        Ok(())
    }

    /// Builder-style registration
    pub fn with<F>(mut self, descriptor: ModuleDescriptor, factory: F) -> Result<Self, ModuleError>
    where
        F: Fn(&ModuleDescriptor) -> Box<dyn Module> + Send + Sync + 'static,
    {
        self.register(descriptor, factory)?;
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.descriptor.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.descriptor.name == name)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    pub fn names(&self) -> Vec<String> {
        self.descriptors().map(|d| d.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
