//! Provider registry for managing multiple package providers.
//!
//! Each session owns its own registry; there is no process-wide table.

use std::cmp::Ordering;
use std::collections::HashMap;

use log::{debug, warn};

use super::{Operations, ProviderDescriptor, ProviderId};
use crate::error::{Error, Result};
use crate::wildcard;

/// Registry of provider descriptors keyed by [`ProviderId`].
///
/// The registry allows:
/// - Registering providers once per id (first registration wins)
/// - Resolving providers by wildcard name and required operations
/// - Resolving exactly one provider for single-target operations
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, ProviderDescriptor>,
}

/// Ascending priority, then full name, then id.
pub(crate) fn precedence(a: &ProviderDescriptor, b: &ProviderDescriptor) -> Ordering {
    a.priority()
        .cmp(&b.priority())
        .then_with(|| a.full_name().to_lowercase().cmp(&b.full_name().to_lowercase()))
        .then_with(|| a.full_name().cmp(b.full_name()))
        .then_with(|| a.id().cmp(b.id()))
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider.
    ///
    /// Returns `Ok(false)` without touching the table if the id is already
    /// registered. Otherwise the provider is instantiated once to run its
    /// initialization hook, whose returned descriptor is the one stored. The
    /// hook may not change the id.
    #[tracing::instrument(skip(self, descriptor), fields(id = %descriptor.id()))]
    pub fn register(&mut self, descriptor: ProviderDescriptor) -> Result<bool> {
        if self.providers.contains_key(descriptor.id()) {
            debug!(
                "Provider id {} is already registered, ignoring {}",
                descriptor.id(),
                descriptor.full_name()
            );
            return Ok(false);
        }

        let id = descriptor.id().clone();
        let full_name = descriptor.full_name().to_string();
        let provider = descriptor.instantiate();
        let descriptor = provider
            .initialize(descriptor)
            .map_err(|e| Error::ProviderInitialization {
                provider: full_name.clone(),
                message: format!("{:#}", e),
            })?;
        if descriptor.id() != &id {
            return Err(Error::ProviderInitialization {
                provider: full_name,
                message: format!("initialization changed the provider id from {} to {}", id, descriptor.id()),
            });
        }

        debug!(
            "Registered provider {} ({}) supporting {}",
            descriptor.full_name(),
            id,
            descriptor.operations()
        );
        self.providers.insert(id, descriptor);
        Ok(true)
    }

    /// Unregister a provider, running its cleanup hook first.
    ///
    /// Returns `false` if the id was not registered. A failing cleanup hook is
    /// logged and the entry is removed regardless.
    #[tracing::instrument(skip(self))]
    pub fn unregister(&mut self, id: &ProviderId) -> bool {
        let Some(descriptor) = self.providers.get(id) else {
            debug!("Provider id {} is not registered", id);
            return false;
        };

        if let Err(e) = descriptor.instantiate().dispose() {
            warn!("Provider {} failed to clean up: {:#}", descriptor.full_name(), e);
        }
        debug!("Unregistered provider {} ({})", descriptor.full_name(), id);
        self.providers.remove(id);
        true
    }

    pub fn get(&self, id: &ProviderId) -> Option<&ProviderDescriptor> {
        self.providers.get(id)
    }

    pub fn contains(&self, id: &ProviderId) -> bool {
        self.providers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// All descriptors in resolution order.
    pub fn descriptors(&self) -> Vec<&ProviderDescriptor> {
        let mut all: Vec<_> = self.providers.values().collect();
        all.sort_by(|a, b| precedence(a, b));
        all
    }

    /// Resolve every provider whose name matches `pattern` and that supports
    /// all of `operations` (an empty set matches every provider).
    ///
    /// The pattern is a case-insensitive `*`/`?` wildcard matched against both
    /// the short name and the `module\name` full name. Results are ordered by
    /// ascending priority, then full name.
    pub fn resolve(&self, pattern: &str, operations: Operations) -> Result<Vec<ProviderDescriptor>> {
        let compiled =
            wildcard::compile(pattern).map_err(|_| Error::InvalidProviderName(pattern.to_string()))?;

        let mut matches: Vec<&ProviderDescriptor> = self
            .providers
            .values()
            .filter(|d| d.operations().contains(operations))
            .filter(|d| d.matches_name(&compiled))
            .collect();
        matches.sort_by(|a, b| precedence(a, b));

        debug!(
            "Resolved {} provider(s) for '{}' supporting {}",
            matches.len(),
            pattern,
            operations
        );
        Ok(matches.into_iter().cloned().collect())
    }

    /// Resolve exactly one provider by name.
    ///
    /// Wildcards are rejected. Fails with `ProviderNotSupported` when nothing
    /// matches and `AmbiguousProvider` when several providers do.
    pub fn resolve_exact(&self, name: &str, operations: Operations) -> Result<ProviderDescriptor> {
        if name.trim().is_empty() || wildcard::has_wildcard(name) {
            return Err(Error::InvalidProviderName(name.to_string()));
        }

        let mut matches = self.resolve(name, operations)?;
        match matches.len() {
            0 => Err(Error::ProviderNotSupported {
                name: name.to_string(),
                operations: operations.to_string(),
            }),
            1 => Ok(matches.remove(0)),
            _ => Err(Error::AmbiguousProvider {
                name: name.to_string(),
                candidates: matches.iter().map(|d| d.full_name().to_string()).collect(),
            }),
        }
    }
}
