//! # Adapter Registry
//!
//! Thread-safe lookup from provider name to its [`ProviderAdapter`]. The
//! engine resolves the bound provider's adapter at every submit, poll, and
//! finalize step, so registration changes take effect between step
//! invocations without restarting anything.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{info, warn};

use super::ProviderAdapter;

/// Errors raised by adapter lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No adapter is registered under the provider name.
    #[error("no adapter registered for provider '{provider}'")]
    AdapterNotFound { provider: String },
}

/// Thread-safe registry of provider adapters keyed by provider name.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: Arc<RwLock<HashMap<String, Arc<dyn ProviderAdapter>>>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own provider name, replacing any
    /// previous registration.
    pub fn register(&self, adapter: Arc<dyn ProviderAdapter>) {
        let provider = adapter.name().to_string();
        let mut adapters = self.adapters.write();
        if adapters.contains_key(&provider) {
            warn!(provider = %provider, "Adapter already registered, replacing");
        } else {
            info!(provider = %provider, kind = ?adapter.backend_kind(), "Registering provider adapter");
        }
        adapters.insert(provider, adapter);
    }

    /// Resolve the adapter for a provider.
    pub fn resolve(&self, provider: &str) -> Result<Arc<dyn ProviderAdapter>, RegistryError> {
        self.adapters
            .read()
            .get(provider)
            .cloned()
            .ok_or_else(|| RegistryError::AdapterNotFound {
                provider: provider.to_string(),
            })
    }

    /// Check if a provider has an adapter registered
    pub fn contains(&self, provider: &str) -> bool {
        self.adapters.read().contains_key(provider)
    }

    /// Registered provider names, sorted for stable output.
    pub fn providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered adapters.
    pub fn len(&self) -> usize {
        self.adapters.read().len()
    }

    /// Whether no adapter is registered.
    pub fn is_empty(&self) -> bool {
        self.adapters.read().is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}
