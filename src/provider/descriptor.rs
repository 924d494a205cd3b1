//! Provider descriptors: registration metadata for one provider implementation.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Operations, PackageProvider};
use crate::error::{Error, Result};
use crate::wildcard;

/// Default priority for providers that do not declare one. Lower wins.
pub const DEFAULT_PRIORITY: i32 = 100;

/// Characters that may not appear in provider or module names.
const RESERVED_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|', '[', ']'];

/// Creates a fresh provider instance for every invocation.
pub type ProviderFactory = Arc<dyn Fn() -> Box<dyn PackageProvider> + Send + Sync>;

/// Opaque, stable identifier of a provider registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Metadata for one registered provider.
///
/// The full name (`module\name`, or just `name`) and the operation set are
/// computed when the descriptor is built and never change afterwards.
#[derive(Clone)]
pub struct ProviderDescriptor {
    id: ProviderId,
    name: String,
    module: Option<String>,
    full_name: String,
    operations: Operations,
    priority: i32,
    file_extensions: Vec<String>,
    uri_schemes: Vec<String>,
    supports_name_selection: bool,
    factory: ProviderFactory,
}

impl ProviderDescriptor {
    pub fn new<F, P>(
        id: impl Into<ProviderId>,
        name: &str,
        operations: Operations,
        factory: F,
    ) -> Result<Self>
    where
        F: Fn() -> P + Send + Sync + 'static,
        P: PackageProvider + 'static,
    {
        validate_name(name)?;
        Ok(Self {
            id: id.into(),
            name: name.to_string(),
            module: None,
            full_name: name.to_string(),
            operations,
            priority: DEFAULT_PRIORITY,
            file_extensions: Vec::new(),
            uri_schemes: Vec::new(),
            supports_name_selection: true,
            factory: Arc::new(move || Box::new(factory()) as Box<dyn PackageProvider>),
        })
    }

    /// Set the owning module; the full name becomes `module\name`.
    pub fn with_module(mut self, module: &str) -> Result<Self> {
        validate_name(module)?;
        self.full_name = format!("{}\\{}", module, self.name);
        self.module = Some(module.to_string());
        Ok(self)
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_operations(mut self, operations: Operations) -> Self {
        self.operations = operations;
        self
    }

    pub fn with_file_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_uri_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uri_schemes = schemes.into_iter().map(Into::into).collect();
        self
    }

    /// Mark a file/URI-only provider that does not select packages by name.
    pub fn without_name_selection(mut self) -> Self {
        self.supports_name_selection = false;
        self
    }

    pub fn id(&self) -> &ProviderId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn operations(&self) -> Operations {
        self.operations
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn file_extensions(&self) -> &[String] {
        &self.file_extensions
    }

    pub fn uri_schemes(&self) -> &[String] {
        &self.uri_schemes
    }

    pub fn supports_name_selection(&self) -> bool {
        self.supports_name_selection
    }

    pub fn supports_file_extension(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.');
        self.file_extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }

    pub fn supports_uri_scheme(&self, scheme: &str) -> bool {
        self.uri_schemes.iter().any(|s| s.eq_ignore_ascii_case(scheme))
    }

    /// Create a new provider instance.
    pub fn instantiate(&self) -> Box<dyn PackageProvider> {
        (self.factory)()
    }

    /// Case-insensitive wildcard match against the short or full name.
    pub(crate) fn matches_name(&self, pattern: &glob::Pattern) -> bool {
        wildcard::matches(pattern, &self.name) || wildcard::matches(pattern, &self.full_name)
    }
}

impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("id", &self.id)
            .field("full_name", &self.full_name)
            .field("operations", &self.operations)
            .field("priority", &self.priority)
            .field("file_extensions", &self.file_extensions)
            .field("uri_schemes", &self.uri_schemes)
            .field("supports_name_selection", &self.supports_name_selection)
            .finish_non_exhaustive()
    }
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = name.trim().is_empty()
        || name.trim() != name
        || name.chars().any(|c| RESERVED_CHARS.contains(&c) || c.is_control());
    if invalid {
        return Err(Error::InvalidProviderName(name.to_string()));
    }
    Ok(())
}
