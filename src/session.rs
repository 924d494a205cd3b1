//! Command-level facade over one provider registry.
//!
//! A [`Session`] owns its registry, host, trust store and cancel token. Each
//! operation creates one request and reuses it for every requested name and
//! every resolved provider.

use std::path::Path;
use std::sync::{Arc, Mutex};

use log::debug;

use crate::config::Config;
use crate::dispatch::{DispatchReport, dispatch_all, dispatch_first};
use crate::error::{Error, Result};
use crate::host::Host;
use crate::provider::{Operation, Operations, ProviderDescriptor, ProviderId, ProviderManifest, ProviderRegistry};
use crate::request::{CancelToken, PackageRequest, RequestCore, SourceAction, SourceRequest, TrustStore};
use crate::version::PackageVersionRange;
use crate::wildcard;

/// Parameters of a package operation.
#[derive(Debug, Clone)]
pub struct PackageQuery {
    names: Vec<String>,
    provider: Option<String>,
    version: Option<PackageVersionRange>,
    source: Option<String>,
    include_prerelease: bool,
    trust: bool,
    pass_thru: bool,
}

impl PackageQuery {
    /// An empty name list means "every package".
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            provider: None,
            version: None,
            source: None,
            include_prerelease: false,
            trust: false,
            pass_thru: true,
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_version(mut self, version: PackageVersionRange) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_prerelease(mut self, include: bool) -> Self {
        self.include_prerelease = include;
        self
    }

    pub fn with_trust(mut self, trust: bool) -> Self {
        self.trust = trust;
        self
    }

    /// Dispatch without forwarding results to the host.
    pub fn without_pass_thru(mut self) -> Self {
        self.pass_thru = false;
        self
    }
}

/// Parameters of a source operation.
#[derive(Debug, Clone)]
pub struct SourceQuery {
    name: String,
    provider: Option<String>,
    location: Option<String>,
    trusted: bool,
    pass_thru: bool,
}

impl SourceQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: None,
            location: None,
            trusted: false,
            pass_thru: true,
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_trusted(mut self, trusted: bool) -> Self {
        self.trusted = trusted;
        self
    }

    pub fn without_pass_thru(mut self) -> Self {
        self.pass_thru = false;
        self
    }
}

pub struct Session {
    registry: ProviderRegistry,
    host: Arc<dyn Host>,
    trust_store: Arc<Mutex<TrustStore>>,
    cancel: CancelToken,
    config: Config,
}

impl Session {
    pub fn new(host: Arc<dyn Host>, config: Config) -> Self {
        Self {
            registry: ProviderRegistry::new(),
            host,
            trust_store: Arc::new(Mutex::new(TrustStore::new())),
            cancel: CancelToken::new(),
            config,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token that stops any dispatch running in this session.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn trust_store(&self) -> Arc<Mutex<TrustStore>> {
        Arc::clone(&self.trust_store)
    }

    /// Register a provider and seed its pre-approved sources from the config.
    pub fn register(&mut self, descriptor: ProviderDescriptor) -> Result<bool> {
        let id = descriptor.id().clone();
        if !self.registry.register(descriptor)? {
            return Ok(false);
        }
        if let Some(descriptor) = self.registry.get(&id) {
            let configured = self
                .config
                .trusted_sources
                .iter()
                .filter(|(key, _)| {
                    key.eq_ignore_ascii_case(descriptor.full_name()) || key.eq_ignore_ascii_case(descriptor.name())
                })
                .flat_map(|(_, sources)| sources);
            let mut store = self.trust_store.lock().unwrap_or_else(|e| e.into_inner());
            for source in configured {
                debug!("Source '{}' pre-approved for {}", source, descriptor.full_name());
                store.trust(&id, source);
            }
        }
        Ok(true)
    }

    pub fn unregister(&mut self, id: &ProviderId) -> bool {
        self.registry.unregister(id)
    }

    /// Register a manifest provider for each path. Returns how many were new.
    pub fn load_manifests<I, P>(&mut self, paths: I) -> anyhow::Result<usize>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut registered = 0;
        for path in paths {
            let manifest = ProviderManifest::load(path.as_ref())?;
            if self.register(manifest.into_descriptor()?)? {
                registered += 1;
            }
        }
        Ok(registered)
    }

    /// Providers matching `pattern` that support all of `operations`.
    pub fn providers(&self, pattern: &str, operations: Operations) -> Result<Vec<ProviderDescriptor>> {
        self.registry.resolve(pattern, operations)
    }

    pub fn parse_range(&self, text: &str) -> Result<PackageVersionRange> {
        self.config.parse_range(text)
    }

    pub fn find_packages(&self, query: &PackageQuery) -> Result<DispatchReport> {
        self.run_packages(query, Operation::Find, false)
    }

    pub fn get_packages(&self, query: &PackageQuery) -> Result<DispatchReport> {
        self.run_packages(query, Operation::Get, false)
    }

    pub fn install_package(&self, query: &PackageQuery) -> Result<DispatchReport> {
        self.run_packages(query, Operation::Install, true)
    }

    pub fn uninstall_package(&self, query: &PackageQuery) -> Result<DispatchReport> {
        self.run_packages(query, Operation::Uninstall, true)
    }

    pub fn update_package(&self, query: &PackageQuery) -> Result<DispatchReport> {
        self.run_packages(query, Operation::Update, true)
    }

    pub fn publish_package(&self, query: &PackageQuery) -> Result<DispatchReport> {
        self.run_packages(query, Operation::Publish, true)
    }

    pub fn save_package(&self, query: &PackageQuery) -> Result<DispatchReport> {
        self.run_packages(query, Operation::Save, true)
    }

    pub fn optimize(&self, query: &PackageQuery) -> Result<DispatchReport> {
        self.run_packages(query, Operation::Optimize, false)
    }

    pub fn get_sources(&self, query: &SourceQuery) -> Result<DispatchReport> {
        self.run_sources(query, Operation::GetSource, SourceAction::default(), false)
    }

    pub fn register_source(&self, query: &SourceQuery) -> Result<DispatchReport> {
        self.run_sources(query, Operation::SetSource, SourceAction::Register, true)
    }

    pub fn set_source(&self, query: &SourceQuery) -> Result<DispatchReport> {
        self.run_sources(query, Operation::SetSource, SourceAction::Set, true)
    }

    pub fn unregister_source(&self, query: &SourceQuery) -> Result<DispatchReport> {
        self.run_sources(query, Operation::SetSource, SourceAction::Unregister, true)
    }

    /// Resolve the providers for one operation.
    ///
    /// First-success operations with a concrete provider name need exactly one
    /// match. Any other concrete name must match at least one provider.
    fn resolve(&self, provider: Option<&str>, operation: Operation, first: bool) -> Result<Vec<ProviderDescriptor>> {
        let operations = Operations::from(operation);
        match provider.map(str::trim).filter(|p| !p.is_empty()) {
            None => self.registry.resolve("*", operations),
            Some(pattern) if wildcard::has_wildcard(pattern) => self.registry.resolve(pattern, operations),
            Some(name) if first => Ok(vec![self.registry.resolve_exact(name, operations)?]),
            Some(name) => {
                let found = self.registry.resolve(name, operations)?;
                if found.is_empty() {
                    return Err(Error::ProviderNotSupported {
                        name: name.to_string(),
                        operations: operations.to_string(),
                    });
                }
                Ok(found)
            }
        }
    }

    fn core(&self, pass_thru: bool, trust: bool) -> RequestCore {
        RequestCore::new(Arc::clone(&self.host), Arc::clone(&self.trust_store), self.cancel.clone())
            .with_pass_thru(pass_thru)
            .with_trust(trust)
    }

    #[tracing::instrument(skip(self, query))]
    fn run_packages(&self, query: &PackageQuery, operation: Operation, first: bool) -> Result<DispatchReport> {
        let mut providers = self.resolve(query.provider.as_deref(), operation, first)?;
        if operation == Operation::Find {
            providers.retain(|d| d.supports_name_selection());
        }

        let mut request = PackageRequest::new(self.core(query.pass_thru, query.trust));
        request.set_source(query.source.clone());
        request.set_include_prerelease(query.include_prerelease || self.config.include_prerelease);

        let names: Vec<&str> = if query.names.is_empty() {
            vec![""]
        } else {
            query.names.iter().map(String::as_str).collect()
        };

        let mut report = DispatchReport::default();
        for name in names {
            request.set_target(name, query.version.clone());
            let cycle = if first {
                dispatch_first(&mut request, &providers, operation)?
            } else {
                dispatch_all(&mut request, &providers, operation)?
            };
            report.merge(cycle);
        }
        Ok(report)
    }

    #[tracing::instrument(skip(self, query))]
    fn run_sources(
        &self,
        query: &SourceQuery,
        operation: Operation,
        action: SourceAction,
        first: bool,
    ) -> Result<DispatchReport> {
        let providers = self.resolve(query.provider.as_deref(), operation, first)?;

        let mut request = SourceRequest::new(self.core(query.pass_thru, false));
        request.set_target(&query.name);
        request.set_location(query.location.clone());
        request.set_trusted_source(query.trusted);
        request.set_action(action);

        if first {
            dispatch_first(&mut request, &providers, operation)
        } else {
            dispatch_all(&mut request, &providers, operation)
        }
    }
}
