//! Process-wide registry of circuit breakers.
//!
//! One breaker exists per downstream dependency, shared by every
//! [`ServiceClient`](crate::inference::ServiceClient) that talks to it. The
//! [`BreakerRegistry::global`] instance lives for the whole process and is
//! never persisted; tests and operators clear it with
//! [`BreakerRegistry::reset`] or [`BreakerRegistry::reset_all`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

use crate::inference::types::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats};

static GLOBAL: Lazy<BreakerRegistry> = Lazy::new(BreakerRegistry::new);

/// A registry mapping dependency names to their shared circuit breaker.
pub struct BreakerRegistry {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    /// Creates a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            breakers: RwLock::new(HashMap::new()),
        }
    }

    /// The registry shared by the whole process
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Returns the breaker for `dependency`, creating it on first use.
    ///
    /// The configuration of the first registration wins; later callers get
    /// the existing breaker unchanged.
    pub fn get_or_create(
        &self,
        dependency: &str,
        config: CircuitBreakerConfig,
    ) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.read().get(dependency) {
            return Arc::clone(existing);
        }

        let mut breakers = self.breakers.write();
        Arc::clone(breakers.entry(dependency.to_string()).or_insert_with(|| {
            debug!(dependency, ?config, "Registering circuit breaker");
            Arc::new(CircuitBreaker::new(dependency, config))
        }))
    }

    /// Gets a breaker by dependency name
    pub fn get(&self, dependency: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.read().get(dependency).cloned()
    }

    /// Lists all registered dependency names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshot of every breaker, keyed by dependency name
    pub fn snapshot(&self) -> BTreeMap<String, CircuitBreakerStats> {
        self.breakers
            .read()
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.get_state()))
            .collect()
    }

    /// Forces the named breaker closed. Returns `false` if it is unknown.
    pub fn reset(&self, dependency: &str) -> bool {
        match self.get(dependency) {
            Some(breaker) => {
                breaker.reset();
                true
            }
            None => false,
        }
    }

    /// Forces every registered breaker closed
    pub fn reset_all(&self) {
        for breaker in self.breakers.read().values() {
            breaker.reset();
        }
    }

    /// Returns the number of registered breakers
    pub fn len(&self) -> usize {
        self.breakers.read().len()
    }

    /// Returns true if no breakers are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
