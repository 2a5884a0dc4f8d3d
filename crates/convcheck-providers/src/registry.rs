//! Provider registry.
//!
//! Creating a provider is cheap but not free, so the registry keeps one
//! provider per `(device, precision)` pair and hands out shared handles.

use crate::provider::ExecutionProvider;
use crate::{create_provider, Result};
use anyhow::anyhow;
use convcheck_core::{DeviceKind, Precision};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

type ProviderKey = (DeviceKind, Precision);

/// Thread-safe cache of execution providers.
pub struct ProviderRegistry {
    providers: DashMap<ProviderKey, Arc<dyn ExecutionProvider>>,
}

/// Snapshot of what a registry holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStatistics {
    /// Number of cached providers.
    pub total_providers: usize,
    /// Number of cached CPU providers.
    pub cpu_providers: usize,
    /// Number of cached GPU providers.
    pub gpu_providers: usize,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: DashMap::new(),
        }
    }

    /// Register a provider under its own device and precision.
    pub fn register_provider(&self, provider: Arc<dyn ExecutionProvider>) -> Result<()> {
        let key = (provider.device(), provider.precision());
        if self.providers.contains_key(&key) {
            return Err(anyhow!(
                "Provider for {} {} is already registered",
                key.0,
                key.1
            ));
        }
        self.providers.insert(key, provider);
        info!(device = %key.0, precision = %key.1, "registered provider");
        Ok(())
    }

    /// Remove the provider for `device` and `precision`.
    pub fn unregister_provider(&self, device: DeviceKind, precision: Precision) -> Result<()> {
        self.providers
            .remove(&(device, precision))
            .map(|_| ())
            .ok_or_else(|| anyhow!("No provider registered for {} {}", device, precision))
    }

    /// Get a cached provider.
    pub fn get_provider(
        &self,
        device: DeviceKind,
        precision: Precision,
    ) -> Option<Arc<dyn ExecutionProvider>> {
        self.providers
            .get(&(device, precision))
            .map(|entry| entry.value().clone())
    }

    /// Get the cached provider, creating it on first use.
    ///
    /// Creation failures are not cached; the next call retries.
    pub fn get_or_create(
        &self,
        device: DeviceKind,
        precision: Precision,
    ) -> Result<Arc<dyn ExecutionProvider>> {
        if let Some(provider) = self.get_provider(device, precision) {
            return Ok(provider);
        }

        let created = create_provider(device, precision)?;
        debug!(device = %device, precision = %precision, "provider created on demand");
        // Another thread may have won the race; keep whichever landed first.
        let provider = self
            .providers
            .entry((device, precision))
            .or_insert(created)
            .value()
            .clone();
        Ok(provider)
    }

    /// Drop every cached provider.
    pub fn clear(&self) {
        self.providers.clear();
    }

    /// Get registry statistics.
    pub fn get_statistics(&self) -> RegistryStatistics {
        let count = |device: DeviceKind| {
            self.providers
                .iter()
                .filter(|entry| entry.key().0 == device)
                .count()
        };
        RegistryStatistics {
            total_providers: self.providers.len(),
            cpu_providers: count(DeviceKind::Cpu),
            gpu_providers: count(DeviceKind::Gpu),
        }
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<ProviderKey> = self.providers.iter().map(|entry| *entry.key()).collect();
        f.debug_struct("ProviderRegistry")
            .field("providers", &keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_caches() {
        let registry = ProviderRegistry::new();
        let first = registry.get_or_create(DeviceKind::Cpu, Precision::FP32).unwrap();
        let second = registry.get_or_create(DeviceKind::Cpu, Precision::FP32).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let half = registry.get_or_create(DeviceKind::Cpu, Precision::FP16).unwrap();
        assert_eq!(half.precision(), Precision::FP16);
        assert_eq!(registry.get_statistics().cpu_providers, 2);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = ProviderRegistry::new();
        let provider = create_provider(DeviceKind::Cpu, Precision::FP32).unwrap();
        registry.register_provider(provider.clone()).unwrap();
        assert!(registry.register_provider(provider).is_err());

        registry
            .unregister_provider(DeviceKind::Cpu, Precision::FP32)
            .unwrap();
        assert!(registry
            .get_provider(DeviceKind::Cpu, Precision::FP32)
            .is_none());
    }
}
