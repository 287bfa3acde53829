//! Name → factory lookup, so strategies can be built from config and grids.

use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use super::params::{ParamError, StrategyParams};
use super::Strategy;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("unknown strategy '{name}' (registered: {})", .known.join(", "))]
    UnknownStrategy { name: String, known: Vec<String> },

    #[error(transparent)]
    Params(#[from] ParamError),
}

/// Builds fresh strategy instances from parameter sets.
///
/// Each call returns an independent instance, so grid points never share
/// mutable state.
pub trait StrategyFactory: Send + Sync {
    fn name(&self) -> &str;

    fn build(&self, params: &StrategyParams) -> Result<Box<dyn Strategy>, ParamError>;
}

#[derive(Clone, Default)]
pub struct StrategyRegistry {
    factories: BTreeMap<String, Arc<dyn StrategyFactory>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the bundled strategies.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register(super::SmaCrossoverFactory);
        reg.register(super::ScriptedFactory);
        reg
    }

    /// Add a factory under its own name, returning any factory it replaced.
    pub fn register(
        &mut self,
        factory: impl StrategyFactory + 'static,
    ) -> Option<Arc<dyn StrategyFactory>> {
        self.factories
            .insert(factory.name().to_string(), Arc::new(factory))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn StrategyFactory>> {
        self.factories.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn build(
        &self,
        name: &str,
        params: &StrategyParams,
    ) -> Result<Box<dyn Strategy>, RegistryError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RegistryError::UnknownStrategy {
                name: name.to_string(),
                known: self.names().map(str::to_string).collect(),
            })?;
        Ok(factory.build(params)?)
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
