//! Host-facing collector contract and module registry.
//!
//! The host owns a [`ModuleRegistry`], registers factory functions at
//! startup and creates one independent [`Module`] per configured job. There
//! is no process-global registration.

use std::collections::BTreeMap;
use std::fmt;

use crate::charts::ChartSet;
use crate::rates::EmittedMetrics;

/// Lifecycle the host drives for every collector instance.
///
/// Calls for one instance are serialized by the host; distinct instances
/// share nothing and may run on different threads.
pub trait Module: Send {
    /// Prepares the instance. `false` means it is permanently disabled.
    fn init(&mut self) -> bool;

    /// True iff a collection produces at least one metric.
    fn check(&mut self) -> bool;

    /// Runs one poll cycle. An empty mapping means no usable data.
    fn collect(&mut self) -> EmittedMetrics;

    /// Currently declared charts.
    fn charts(&self) -> &ChartSet;

    /// Releases held resources. Safe to call more than once.
    fn cleanup(&mut self);
}

/// Factory building a module from its job configuration.
pub type Creator = fn(&serde_json::Value) -> Result<Box<dyn Module>, RegistryError>;

/// Error type for module registration and creation.
#[derive(Debug)]
pub enum RegistryError {
    /// No creator registered under this name.
    UnknownModule(String),
    /// A creator is already registered under this name.
    Duplicate(String),
    /// The job configuration does not bind to the module's config type.
    InvalidConfig(String, String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::UnknownModule(name) => write!(f, "unknown module '{}'", name),
            RegistryError::Duplicate(name) => write!(f, "module '{}' already registered", name),
            RegistryError::InvalidConfig(name, msg) => {
                write!(f, "invalid '{}' configuration: {}", name, msg)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Name → factory table owned by the host.
#[derive(Default)]
pub struct ModuleRegistry {
    creators: BTreeMap<&'static str, Creator>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, creator: Creator) -> Result<(), RegistryError> {
        if self.creators.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.creators.insert(name, creator);
        Ok(())
    }

    /// Builds a fresh, uninitialized module instance.
    pub fn create(
        &self,
        name: &str,
        config: &serde_json::Value,
    ) -> Result<Box<dyn Module>, RegistryError> {
        let creator = self
            .creators
            .get(name)
            .ok_or_else(|| RegistryError::UnknownModule(name.to_string()))?;
        creator(config)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.creators.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.creators.keys().copied()
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.creators.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Registers every module shipped with this crate.
pub fn register_builtin(registry: &mut ModuleRegistry) -> Result<(), RegistryError> {
    registry.register(crate::collector::unbound::MODULE_NAME, crate::collector::unbound::create)
}
