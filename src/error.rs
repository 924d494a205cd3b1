//! Error types for pkgprov.

use thiserror::Error;

/// The error type for version parsing, provider resolution and dispatch.
///
/// Parsing and resolution errors are returned directly to the caller.
/// Provider failures and not-found conditions are collected as diagnostics
/// in a [`DispatchReport`](crate::dispatch::DispatchReport) instead; the only
/// error dispatch itself returns is [`Error::Cancelled`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed version: '{0}'")]
    MalformedVersion(String),

    #[error("Malformed version range '{input}': {reason}")]
    MalformedRange { input: String, reason: String },

    #[error("Inverted version range: minimum {min} is greater than maximum {max}")]
    InvertedRange { min: String, max: String },

    #[error("Version '{version}' cannot be converted: {reason}")]
    UnsupportedConversion { version: String, reason: String },

    #[error("Invalid provider name: '{0}'")]
    InvalidProviderName(String),

    #[error("Provider name '{name}' is ambiguous, it matches: {}", candidates.join(", "))]
    AmbiguousProvider {
        name: String,
        candidates: Vec<String>,
    },

    #[error("No provider named '{name}' supports {operations}")]
    ProviderNotSupported { name: String, operations: String },

    #[error("Provider '{provider}' failed to initialize: {message}")]
    ProviderInitialization { provider: String, message: String },

    #[error("Provider '{provider}' failed for '{name}': {message}")]
    ProviderOperationFailed {
        provider: String,
        name: String,
        message: String,
    },

    #[error("No match was found for package '{0}'")]
    PackageNotFound(String),

    #[error("Unable to find package source '{0}'")]
    SourceNotFound(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn malformed_range(input: &str, reason: impl Into<String>) -> Self {
        Error::MalformedRange {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported_conversion(version: &str, reason: impl Into<String>) -> Self {
        Error::UnsupportedConversion {
            version: version.to_string(),
            reason: reason.into(),
        }
    }

    /// True for conditions reported when no provider produced output.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::PackageNotFound(_) | Error::SourceNotFound(_))
    }
}

/// A type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
