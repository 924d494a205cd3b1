//! A provider backed by a JSON manifest of packages and sources.
//!
//! ```json
//! {
//!   "name": "demo",
//!   "module": "Local",
//!   "priority": 50,
//!   "packages": [{ "name": "zlib", "version": "1.3", "source": "main" }],
//!   "sources": [{ "name": "main", "location": "https://example.com", "trusted": true }]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use super::{Operation, PackageProvider, ProviderDescriptor, ProviderFailure, ProviderResult};
use crate::request::{PackageInfo, PackageRequest, Request, SourceInfo, SourceRequest};
use crate::version::PackageVersion;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProviderManifest {
    /// Registration id; derived from the full name when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub packages: Vec<ManifestPackage>,
    #[serde(default)]
    pub sources: Vec<ManifestSource>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ManifestPackage {
    pub name: String,
    pub version: PackageVersion,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    /// Reported by `get` as already installed.
    #[serde(default)]
    pub installed: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ManifestSource {
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub trusted: bool,
}

impl ProviderManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid manifest {}", path.display()))
    }

    /// Build a descriptor whose factory hands out providers sharing this manifest.
    pub fn into_descriptor(self) -> crate::error::Result<ProviderDescriptor> {
        let id = self.id.clone().unwrap_or_else(|| match &self.module {
            Some(module) => format!("manifest:{}\\{}", module, self.name),
            None => format!("manifest:{}", self.name),
        });
        let name = self.name.clone();
        let module = self.module.clone();
        let priority = self.priority;
        let manifest = Arc::new(self);

        let operations = Operation::Find | Operation::Get | Operation::Install | Operation::GetSource;
        let mut descriptor = ProviderDescriptor::new(id.as_str(), &name, operations, move || {
            ManifestProvider::new(Arc::clone(&manifest))
        })?;
        if let Some(module) = module {
            descriptor = descriptor.with_module(&module)?;
        }
        if let Some(priority) = priority {
            descriptor = descriptor.with_priority(priority);
        }
        Ok(descriptor)
    }
}

pub struct ManifestProvider {
    manifest: Arc<ProviderManifest>,
}

impl ManifestProvider {
    pub fn new(manifest: Arc<ProviderManifest>) -> Self {
        Self { manifest }
    }

    fn matching(&self, request: &PackageRequest, installed_only: bool) -> Vec<&ManifestPackage> {
        self.manifest
            .packages
            .iter()
            .filter(|p| !installed_only || p.installed)
            .filter(|p| request.is_match(&p.name, &p.version))
            .filter(|p| request.is_match_source(p.source.as_deref()))
            .collect()
    }

    fn is_trusted_source(&self, name: &str) -> bool {
        self.manifest
            .sources
            .iter()
            .any(|s| s.trusted && s.name.eq_ignore_ascii_case(name))
    }

    fn report(&self, request: &mut PackageRequest, installed_only: bool) -> ProviderResult {
        let packages = self.matching(request, installed_only);
        debug!("Manifest {} matched {} package(s)", self.manifest.name, packages.len());
        for package in packages {
            if request.is_canceled() {
                return Err(ProviderFailure::Cancelled);
            }
            request.write_package(package_info(package));
        }
        Ok(())
    }
}

fn package_info(package: &ManifestPackage) -> PackageInfo {
    let mut info = PackageInfo::new(&package.name, package.version.clone());
    info.source = package.source.clone();
    info.summary = package.summary.clone();
    info
}

impl PackageProvider for ManifestProvider {
    fn find_package(&self, request: &mut PackageRequest) -> ProviderResult {
        self.report(request, false)
    }

    fn get_package(&self, request: &mut PackageRequest) -> ProviderResult {
        self.report(request, true)
    }

    /// Install the highest matching version of each matching name, asking
    /// before using a source that is not trusted.
    fn install_package(&self, request: &mut PackageRequest) -> ProviderResult {
        let mut best: BTreeMap<String, &ManifestPackage> = BTreeMap::new();
        for package in self.matching(request, false) {
            let slot = best.entry(package.name.to_lowercase()).or_insert(package);
            if package.version.compare(&slot.version).is_gt() {
                *slot = package;
            }
        }

        for package in best.into_values() {
            if request.is_canceled() {
                return Err(ProviderFailure::Cancelled);
            }
            let source = package.source.as_deref().unwrap_or(&self.manifest.name);
            if !self.is_trusted_source(source) && !request.prompt_untrusted_source(source) {
                request.warning(&format!(
                    "Skipped {} {}: source '{}' is not trusted",
                    package.name, package.version, source
                ));
                continue;
            }
            request.verbose(&format!("Installing {} {} from {}", package.name, package.version, source));
            request.write_package(package_info(package));
        }
        Ok(())
    }

    fn get_source(&self, request: &mut SourceRequest) -> ProviderResult {
        let sources: Vec<&ManifestSource> = self
            .manifest
            .sources
            .iter()
            .filter(|s| request.is_match_name(&s.name))
            .collect();
        for source in sources {
            request.write_source(SourceInfo {
                name: source.name.clone(),
                location: source.location.clone(),
                trusted: source.trusted,
                registered: true,
                provider: String::new(),
            });
        }
        Ok(())
    }
}
