//! Provider abstraction for package operations.
//!
//! A provider is a pluggable implementation of one or more package
//! operations for one package ecosystem. Providers declare their
//! capabilities explicitly as an [`Operations`] set when they are
//! registered, and communicate results only by calling back into the
//! request they are handed.

mod descriptor;
mod manifest;
mod registry;

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::request::{PackageRequest, SourceRequest};

pub use descriptor::{ProviderDescriptor, ProviderFactory, ProviderId};
pub use manifest::{ManifestPackage, ManifestProvider, ManifestSource, ProviderManifest};
pub use registry::ProviderRegistry;
pub(crate) use registry::precedence;

/// One verb a provider may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Find,
    Get,
    Install,
    Uninstall,
    Update,
    Publish,
    Save,
    GetSource,
    /// Register, set and unregister package sources.
    SetSource,
    Optimize,
}

impl Operation {
    pub const ALL: [Operation; 10] = [
        Operation::Find,
        Operation::Get,
        Operation::Install,
        Operation::Uninstall,
        Operation::Update,
        Operation::Publish,
        Operation::Save,
        Operation::GetSource,
        Operation::SetSource,
        Operation::Optimize,
    ];

    const fn bit(self) -> u32 {
        1 << self as u32
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Find => "find",
            Operation::Get => "get",
            Operation::Install => "install",
            Operation::Uninstall => "uninstall",
            Operation::Update => "update",
            Operation::Publish => "publish",
            Operation::Save => "save",
            Operation::GetSource => "get-source",
            Operation::SetSource => "set-source",
            Operation::Optimize => "optimize",
        };
        f.write_str(name)
    }
}

impl FromStr for Operation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow::anyhow!("Unknown operation: {}", s))
    }
}

/// A capability bitmask over [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Operations(u32);

impl Operations {
    pub const NONE: Operations = Operations(0);

    pub fn all() -> Self {
        Operation::ALL.into_iter().collect()
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn has(self, op: Operation) -> bool {
        self.0 & op.bit() != 0
    }

    /// True when every bit of `required` is set. The empty set is contained in everything.
    pub fn contains(self, required: Operations) -> bool {
        self.0 & required.0 == required.0
    }

    pub fn iter(self) -> impl Iterator<Item = Operation> {
        Operation::ALL.into_iter().filter(move |op| self.has(*op))
    }
}

impl From<Operation> for Operations {
    fn from(op: Operation) -> Self {
        Operations(op.bit())
    }
}

impl FromIterator<Operation> for Operations {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        iter.into_iter().fold(Operations::NONE, |acc, op| acc | op)
    }
}

impl BitOr for Operations {
    type Output = Operations;

    fn bitor(self, rhs: Operations) -> Operations {
        Operations(self.0 | rhs.0)
    }
}

impl BitOr<Operation> for Operations {
    type Output = Operations;

    fn bitor(self, rhs: Operation) -> Operations {
        Operations(self.0 | rhs.bit())
    }
}

impl BitOr for Operation {
    type Output = Operations;

    fn bitor(self, rhs: Operation) -> Operations {
        Operations(self.bit() | rhs.bit())
    }
}

impl BitOrAssign<Operation> for Operations {
    fn bitor_assign(&mut self, rhs: Operation) {
        self.0 |= rhs.bit();
    }
}

impl fmt::Display for Operations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<String> = self.iter().map(|op| op.to_string()).collect();
        f.write_str(&names.join(", "))
    }
}

/// Why a provider operation did not complete.
#[derive(Debug)]
pub enum ProviderFailure {
    /// The caller asked to stop. Always propagated by dispatch.
    Cancelled,
    /// Any other failure. Reported as a diagnostic and dispatch continues.
    Failed(anyhow::Error),
}

impl From<anyhow::Error> for ProviderFailure {
    fn from(e: anyhow::Error) -> Self {
        ProviderFailure::Failed(e)
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderFailure::Cancelled => write!(f, "cancelled"),
            ProviderFailure::Failed(e) => write!(f, "{:#}", e),
        }
    }
}

pub type ProviderResult = Result<(), ProviderFailure>;

fn unsupported(op: Operation) -> ProviderResult {
    Err(ProviderFailure::Failed(anyhow::anyhow!(
        "operation '{}' is not implemented by this provider",
        op
    )))
}

/// Trait for package providers.
///
/// Each operation method receives the shared request and reports results
/// through it. Only the methods for operations declared in the provider's
/// [`Operations`] set are ever called; the defaults report a failure.
///
/// Report failures through [`ProviderFailure`]. Panics are not caught by
/// dispatch and unwind through the remaining providers of the cycle.
pub trait PackageProvider: Send + Sync {
    /// One-time hook run at registration. May return a richer descriptor.
    fn initialize(&self, descriptor: ProviderDescriptor) -> anyhow::Result<ProviderDescriptor> {
        Ok(descriptor)
    }

    /// One-time hook run at unregistration.
    fn dispose(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn find_package(&self, _request: &mut PackageRequest) -> ProviderResult {
        unsupported(Operation::Find)
    }

    fn get_package(&self, _request: &mut PackageRequest) -> ProviderResult {
        unsupported(Operation::Get)
    }

    fn install_package(&self, _request: &mut PackageRequest) -> ProviderResult {
        unsupported(Operation::Install)
    }

    fn uninstall_package(&self, _request: &mut PackageRequest) -> ProviderResult {
        unsupported(Operation::Uninstall)
    }

    fn update_package(&self, _request: &mut PackageRequest) -> ProviderResult {
        unsupported(Operation::Update)
    }

    fn publish_package(&self, _request: &mut PackageRequest) -> ProviderResult {
        unsupported(Operation::Publish)
    }

    fn save_package(&self, _request: &mut PackageRequest) -> ProviderResult {
        unsupported(Operation::Save)
    }

    fn optimize(&self, _request: &mut PackageRequest) -> ProviderResult {
        unsupported(Operation::Optimize)
    }

    fn get_source(&self, _request: &mut SourceRequest) -> ProviderResult {
        unsupported(Operation::GetSource)
    }

    fn register_source(&self, _request: &mut SourceRequest) -> ProviderResult {
        unsupported(Operation::SetSource)
    }

    fn set_source(&self, _request: &mut SourceRequest) -> ProviderResult {
        unsupported(Operation::SetSource)
    }

    fn unregister_source(&self, _request: &mut SourceRequest) -> ProviderResult {
        unsupported(Operation::SetSource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operations_contains() {
        let ops = Operation::Find | Operation::Install;
        assert!(ops.contains(Operation::Find.into()));
        assert!(ops.contains(Operation::Find | Operation::Install));
        assert!(!ops.contains(Operation::Find | Operation::Save));
        assert!(ops.contains(Operations::NONE));
        assert!(Operations::NONE.contains(Operations::NONE));
    }

    #[test]
    fn test_operations_iter_and_display() {
        let mut ops = Operations::NONE;
        assert_eq!(ops.to_string(), "none");
        ops |= Operation::GetSource;
        ops |= Operation::Find;
        assert_eq!(ops.iter().collect::<Vec<_>>(), vec![Operation::Find, Operation::GetSource]);
        assert_eq!(ops.to_string(), "find, get-source");
        assert_eq!(Operations::all().iter().count(), Operation::ALL.len());
    }

    #[test]
    fn test_operation_parse() {
        assert_eq!("find".parse::<Operation>().unwrap(), Operation::Find);
        assert_eq!("Get-Source".parse::<Operation>().unwrap(), Operation::GetSource);
        assert!("download".parse::<Operation>().is_err());
    }

    #[test]
    fn test_provider_failure_from_anyhow() {
        let failure: ProviderFailure = anyhow::anyhow!("boom").into();
        assert!(matches!(failure, ProviderFailure::Failed(_)));
        assert_eq!(failure.to_string(), "boom");
    }
}
