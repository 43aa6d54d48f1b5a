//! Sink type registry
//!
//! Maps a sink type name ("mode") to a factory producing a fresh, uninitialized
//! sink. Registration happens during process start-up; a duplicate mode is a
//! programming error and panics.

use crate::sinks::console::ConsoleSink;
use crate::sinks::json::JsonFormatSink;
use crate::sinks::traits::Sink;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Mode of the built-in console sink
pub const CONSOLE: &str = "console";

/// Mode of the built-in JSON sink
pub const JSON_FORMAT: &str = "jsonFormat";

/// Constructor of a fresh sink instance.
pub type Factory = Arc<dyn Fn() -> Box<dyn Sink> + Send + Sync>;

/// Mode to factory mapping.
#[derive(Clone, Default)]
pub struct Registry {
    factories: HashMap<String, Factory>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("modes", &self.modes())
            .finish()
    }
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the `console` and `jsonFormat` sinks.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(CONSOLE, ConsoleSink::boxed);
        registry.register(JSON_FORMAT, JsonFormatSink::boxed);
        registry
    }

    /// Add a factory under `mode`.
    ///
    /// # Panics
    ///
    /// If `mode` is empty or already registered.
    pub fn register<F>(&mut self, mode: &str, factory: F)
    where
        F: Fn() -> Box<dyn Sink> + Send + Sync + 'static,
    {
        if mode.is_empty() {
            panic!("xlog: register called with an empty mode");
        }
        if self.factories.contains_key(mode) {
            panic!("xlog: register duplicated mode '{}'", mode);
        }
        self.factories.insert(mode.to_string(), Arc::new(factory));
        tracing::debug!("registered sink mode '{}'", mode);
    }

    /// Build a fresh sink for `mode`, if registered.
    pub fn create(&self, mode: &str) -> Option<Box<dyn Sink>> {
        self.factories.get(mode).map(|factory| factory())
    }

    pub fn contains(&self, mode: &str) -> bool {
        self.factories.contains_key(mode)
    }

    /// Registered modes, sorted.
    pub fn modes(&self) -> Vec<String> {
        let mut modes: Vec<String> = self.factories.keys().cloned().collect();
        modes.sort();
        modes
    }
}

/// Shared handle to a registry.
pub type SharedRegistry = Arc<RwLock<Registry>>;

static GLOBAL_REGISTRY: Lazy<SharedRegistry> =
    Lazy::new(|| Arc::new(RwLock::new(Registry::with_builtin())));

/// The process-wide registry, pre-populated with the built-in sinks.
pub fn global_registry() -> SharedRegistry {
    GLOBAL_REGISTRY.clone()
}

/// Register a sink type in the process-wide registry.
///
/// # Panics
///
/// If `mode` is empty or already registered.
pub fn register<F>(mode: &str, factory: F)
where
    F: Fn() -> Box<dyn Sink> + Send + Sync + 'static,
{
    GLOBAL_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(mode, factory);
}
