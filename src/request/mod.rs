//! Requests: the mutable context shared by every provider invoked for one
//! logical operation.
//!
//! One request is created per command invocation and reused for every name
//! and every resolved provider. Providers read the target from it, filter
//! their own packages with the `is_match*` predicates and report results
//! with `write_package`/`write_source`.

mod cancel;
mod trust;

use std::sync::{Arc, Mutex, MutexGuard};

use glob::Pattern;
use log::{debug, warn};
use serde::Serialize;

use crate::error::Error;
use crate::host::Host;
use crate::provider::{Operation, PackageProvider, ProviderDescriptor, ProviderFailure, ProviderResult};
use crate::version::{PackageVersion, PackageVersionRange};
use crate::wildcard;

pub use cancel::CancelToken;
pub use trust::{PromptChoice, TrustDecision, TrustStore};

/// A package reported by a provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: PackageVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Full name of the reporting provider, filled in by the request.
    pub provider: String,
}

impl PackageInfo {
    pub fn new(name: impl Into<String>, version: PackageVersion) -> Self {
        Self {
            name: name.into(),
            version,
            source: None,
            summary: None,
            provider: String::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// A package source reported by a provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceInfo {
    pub name: String,
    pub location: String,
    pub trusted: bool,
    pub registered: bool,
    pub provider: String,
}

/// Anything a provider can emit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    Package(PackageInfo),
    Source(SourceInfo),
}

/// Case-insensitive name or wildcard pattern. Empty matches everything.
#[derive(Debug, Clone, Default)]
struct NameFilter {
    text: String,
    pattern: Option<Pattern>,
}

impl NameFilter {
    fn new(text: &str) -> Self {
        let text = text.trim().to_string();
        let pattern = if wildcard::has_wildcard(&text) {
            wildcard::compile(&text).ok()
        } else {
            None
        };
        Self { text, pattern }
    }

    fn matches(&self, candidate: &str) -> bool {
        if self.text.is_empty() {
            return true;
        }
        match &self.pattern {
            Some(pattern) => wildcard::matches(pattern, candidate),
            None => self.text.eq_ignore_ascii_case(candidate),
        }
    }
}

/// State shared by package and source requests.
pub struct RequestCore {
    host: Arc<dyn Host>,
    trust_store: Arc<Mutex<TrustStore>>,
    cancel: CancelToken,
    provider: Option<ProviderDescriptor>,
    has_write_object: bool,
    pass_thru: bool,
    trust: bool,
    decision: Option<TrustDecision>,
}

impl RequestCore {
    pub fn new(host: Arc<dyn Host>, trust_store: Arc<Mutex<TrustStore>>, cancel: CancelToken) -> Self {
        Self {
            host,
            trust_store,
            cancel,
            provider: None,
            has_write_object: false,
            pass_thru: true,
            trust: false,
            decision: None,
        }
    }

    /// Whether results are forwarded to the host.
    pub fn with_pass_thru(mut self, pass_thru: bool) -> Self {
        self.pass_thru = pass_thru;
        self
    }

    /// Skip untrusted-source prompts entirely.
    pub fn with_trust(mut self, trust: bool) -> Self {
        self.trust = trust;
        self
    }

    pub(crate) fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    pub(crate) fn set_provider(&mut self, provider: Option<ProviderDescriptor>) {
        self.provider = provider;
    }

    pub(crate) fn reset_write_object(&mut self) {
        self.has_write_object = false;
    }

    fn trust_store(&self) -> MutexGuard<'_, TrustStore> {
        self.trust_store.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&mut self, mut record: Record) {
        self.has_write_object = true;
        if let Some(provider) = &self.provider {
            let slot = match &mut record {
                Record::Package(p) => &mut p.provider,
                Record::Source(s) => &mut s.provider,
            };
            if slot.is_empty() {
                *slot = provider.full_name().to_string();
            }
        }
        if self.pass_thru {
            self.host.write_record(&record);
        }
    }

    fn prompt_untrusted_source(&mut self, source: &str) -> bool {
        if self.trust {
            return true;
        }
        let provider_id = self.provider.as_ref().map(|p| p.id().clone());

        match self.decision {
            Some(TrustDecision::NoToAll) => {
                debug!("Declining untrusted source '{}' (no to all)", source);
                return false;
            }
            Some(TrustDecision::YesToAll) => {
                debug!("Accepting untrusted source '{}' (yes to all)", source);
                if let Some(id) = &provider_id {
                    self.trust_store().trust(id, source);
                }
                return true;
            }
            None => {}
        }

        if let Some(id) = &provider_id
            && self.trust_store().is_trusted(id, source)
        {
            debug!("Source '{}' already approved for provider {}", source, id);
            return true;
        }

        let provider_name = self
            .provider
            .as_ref()
            .map(|p| p.full_name().to_string())
            .unwrap_or_default();
        let choice = match self.host.prompt_untrusted_source(&provider_name, source) {
            Ok(choice) => choice,
            Err(e) => {
                warn!("Prompt for source '{}' failed: {:#}", source, e);
                return false;
            }
        };

        match choice {
            PromptChoice::Yes => true,
            PromptChoice::No => false,
            PromptChoice::YesToAll => {
                self.decision = Some(TrustDecision::YesToAll);
                if let Some(id) = &provider_id {
                    self.trust_store().trust(id, source);
                }
                true
            }
            PromptChoice::NoToAll => {
                self.decision = Some(TrustDecision::NoToAll);
                false
            }
        }
    }
}

/// Behavior common to package and source requests.
///
/// Providers use the provided methods; dispatch uses `invoke`, `target` and
/// `not_found`.
pub trait Request {
    fn core(&self) -> &RequestCore;

    fn core_mut(&mut self) -> &mut RequestCore;

    /// The package or source name being processed, used in diagnostics.
    fn target(&self) -> &str;

    /// Call the provider method implementing `operation`.
    fn invoke(&mut self, provider: &dyn PackageProvider, operation: Operation) -> ProviderResult;

    /// Diagnostic raised when no provider produced output.
    fn not_found(&self) -> Error;

    /// The provider currently being invoked.
    fn provider(&self) -> Option<&ProviderDescriptor> {
        self.core().provider.as_ref()
    }

    fn is_canceled(&self) -> bool {
        self.core().cancel.is_cancelled()
    }

    fn has_write_object(&self) -> bool {
        self.core().has_write_object
    }

    fn pass_thru(&self) -> bool {
        self.core().pass_thru
    }

    fn warning(&self, message: &str) {
        self.core().host.warning(message);
    }

    fn verbose(&self, message: &str) {
        self.core().host.verbose(message);
    }

    /// Emit a result. Always marks the request as having produced output,
    /// but only forwards the record to the host when pass-through is on.
    fn write_record(&mut self, record: Record) {
        self.core_mut().write(record);
    }

    /// Ask whether a source that is not marked trusted may be used.
    ///
    /// Answers are memoized: "yes to all" approves every later source for the
    /// rest of the request and remembers each one for the current provider;
    /// "no to all" declines every later source without prompting.
    fn prompt_untrusted_source(&mut self, source: &str) -> bool {
        self.core_mut().prompt_untrusted_source(source)
    }
}

/// Request for package operations (find, get, install, ...).
pub struct PackageRequest {
    core: RequestCore,
    name: NameFilter,
    version: Option<PackageVersionRange>,
    source: Option<String>,
    include_prerelease: bool,
}

impl PackageRequest {
    pub fn new(core: RequestCore) -> Self {
        Self {
            core,
            name: NameFilter::default(),
            version: None,
            source: None,
            include_prerelease: false,
        }
    }

    /// Point the request at the next name/version combination.
    pub fn set_target(&mut self, name: &str, version: Option<PackageVersionRange>) {
        self.name = NameFilter::new(name);
        self.version = version;
    }

    pub fn set_source(&mut self, source: Option<String>) {
        self.source = source;
    }

    pub fn set_include_prerelease(&mut self, include: bool) {
        self.include_prerelease = include;
    }

    pub fn name(&self) -> &str {
        &self.name.text
    }

    pub fn version(&self) -> Option<&PackageVersionRange> {
        self.version.as_ref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn include_prerelease(&self) -> bool {
        self.include_prerelease
    }

    pub fn is_match_name(&self, candidate: &str) -> bool {
        self.name.matches(candidate)
    }

    /// Range check plus prerelease filtering. Prereleases pass without the
    /// prerelease flag only when an exact version was requested.
    pub fn is_match_version(&self, version: &PackageVersion) -> bool {
        let exact = self.version.as_ref().is_some_and(|r| r.is_exact());
        if version.is_prerelease() && !self.include_prerelease && !exact {
            return false;
        }
        self.version.as_ref().is_none_or(|r| r.satisfies(version))
    }

    pub fn is_match_source(&self, source: Option<&str>) -> bool {
        match &self.source {
            None => true,
            Some(wanted) => source.is_some_and(|s| s.eq_ignore_ascii_case(wanted)),
        }
    }

    pub fn is_match(&self, name: &str, version: &PackageVersion) -> bool {
        self.is_match_name(name) && self.is_match_version(version)
    }

    pub fn write_package(&mut self, info: PackageInfo) {
        self.write_record(Record::Package(info));
    }
}

impl Request for PackageRequest {
    fn core(&self) -> &RequestCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut RequestCore {
        &mut self.core
    }

    fn target(&self) -> &str {
        &self.name.text
    }

    fn invoke(&mut self, provider: &dyn PackageProvider, operation: Operation) -> ProviderResult {
        match operation {
            Operation::Find => provider.find_package(self),
            Operation::Get => provider.get_package(self),
            Operation::Install => provider.install_package(self),
            Operation::Uninstall => provider.uninstall_package(self),
            Operation::Update => provider.update_package(self),
            Operation::Publish => provider.publish_package(self),
            Operation::Save => provider.save_package(self),
            Operation::Optimize => provider.optimize(self),
            Operation::GetSource | Operation::SetSource => Err(ProviderFailure::Failed(anyhow::anyhow!(
                "'{}' is not a package operation",
                operation
            ))),
        }
    }

    fn not_found(&self) -> Error {
        Error::PackageNotFound(self.name.text.clone())
    }
}

/// What a `SetSource` invocation should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceAction {
    #[default]
    Register,
    Set,
    Unregister,
}

/// Request for package source operations.
pub struct SourceRequest {
    core: RequestCore,
    name: NameFilter,
    location: Option<String>,
    trusted_source: bool,
    action: SourceAction,
}

impl SourceRequest {
    pub fn new(core: RequestCore) -> Self {
        Self {
            core,
            name: NameFilter::default(),
            location: None,
            trusted_source: false,
            action: SourceAction::default(),
        }
    }

    pub fn set_target(&mut self, name: &str) {
        self.name = NameFilter::new(name);
    }

    pub fn set_location(&mut self, location: Option<String>) {
        self.location = location;
    }

    pub fn set_trusted_source(&mut self, trusted: bool) {
        self.trusted_source = trusted;
    }

    pub fn set_action(&mut self, action: SourceAction) {
        self.action = action;
    }

    pub fn name(&self) -> &str {
        &self.name.text
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn trusted_source(&self) -> bool {
        self.trusted_source
    }

    pub fn action(&self) -> SourceAction {
        self.action
    }

    pub fn is_match_name(&self, candidate: &str) -> bool {
        self.name.matches(candidate)
    }

    pub fn write_source(&mut self, info: SourceInfo) {
        self.write_record(Record::Source(info));
    }
}

impl Request for SourceRequest {
    fn core(&self) -> &RequestCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut RequestCore {
        &mut self.core
    }

    fn target(&self) -> &str {
        &self.name.text
    }

    fn invoke(&mut self, provider: &dyn PackageProvider, operation: Operation) -> ProviderResult {
        match (operation, self.action) {
            (Operation::GetSource, _) => provider.get_source(self),
            (Operation::SetSource, SourceAction::Register) => provider.register_source(self),
            (Operation::SetSource, SourceAction::Set) => provider.set_source(self),
            (Operation::SetSource, SourceAction::Unregister) => provider.unregister_source(self),
            _ => Err(ProviderFailure::Failed(anyhow::anyhow!(
                "'{}' is not a source operation",
                operation
            ))),
        }
    }

    fn not_found(&self) -> Error {
        Error::SourceNotFound(self.name.text.clone())
    }
}
