//! Memoization of untrusted-source confirmations.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::provider::ProviderId;

/// Answer to an untrusted-source prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptChoice {
    Yes,
    YesToAll,
    No,
    NoToAll,
}

/// A "to all" answer that holds for the rest of a request's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustDecision {
    YesToAll,
    NoToAll,
}

/// Sources approved per provider for the lifetime of a session.
///
/// Source names compare case-insensitively.
#[derive(Debug, Default)]
pub struct TrustStore {
    approved: HashMap<ProviderId, HashSet<String>>,
}

impl TrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_trusted(&self, provider: &ProviderId, source: &str) -> bool {
        self.approved
            .get(provider)
            .is_some_and(|sources| sources.contains(&source.to_lowercase()))
    }

    pub fn trust(&mut self, provider: &ProviderId, source: &str) {
        self.approved
            .entry(provider.clone())
            .or_default()
            .insert(source.to_lowercase());
    }

    /// Approved sources for one provider, sorted.
    pub fn sources(&self, provider: &ProviderId) -> Vec<String> {
        let mut sources: Vec<String> = self
            .approved
            .get(provider)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        sources.sort();
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_is_per_provider() {
        let mut store = TrustStore::new();
        let a = ProviderId::new("a");
        let b = ProviderId::new("b");
        store.trust(&a, "Gallery");

        assert!(store.is_trusted(&a, "gallery"));
        assert!(!store.is_trusted(&b, "gallery"));
        assert_eq!(store.sources(&a), vec!["gallery".to_string()]);
        assert!(store.sources(&b).is_empty());
    }
}
