//! Name → constructor registry for broker adapters.

use crate::brokers::{BrokerAdapter, FyersAdapter, ZerodhaAdapter};
use crate::config::Config;
use crate::error::{AppError, Result};
use std::collections::HashMap;
use tracing::debug;

/// Constructor for one adapter variant. The trait bound is the capability
/// check: anything registered here satisfies the full `BrokerAdapter` contract
/// at compile time.
pub type BrokerCtor = fn(&Config) -> Box<dyn BrokerAdapter>;

/// Maps lowercased broker names to adapter constructors.
#[derive(Default)]
pub struct BrokerRegistry {
    adapters: HashMap<String, BrokerCtor>,
}

impl BrokerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in brokers registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("zerodha", ZerodhaAdapter::boxed);
        registry.register("fyers", FyersAdapter::boxed);
        registry
    }

    /// Register a constructor under `name`. Re-registering an existing name
    /// overwrites the previous constructor.
    pub fn register(&mut self, name: &str, ctor: BrokerCtor) {
        let key = name.to_lowercase();
        if self.adapters.insert(key.clone(), ctor).is_some() {
            debug!(broker = %key, "overwriting registered broker adapter");
        }
    }

    /// Instantiate the adapter registered under `name`.
    pub fn create(&self, name: &str, config: &Config) -> Result<Box<dyn BrokerAdapter>> {
        let key = name.to_lowercase();
        match self.adapters.get(&key) {
            Some(ctor) => Ok(ctor(config)),
            None => Err(AppError::Validation(format!(
                "unsupported broker: {key}. Supported brokers: {}",
                self.list().join(", ")
            ))),
        }
    }

    /// Supported broker names, sorted for stable output.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_supported(&self, name: &str) -> bool {
        self.adapters.contains_key(&name.to_lowercase())
    }
}
