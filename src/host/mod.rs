//! Host abstraction: where requests send results, diagnostics and prompts.
//!
//! The command layer supplies a [`Host`]; providers never talk to it directly
//! but go through the request they are given.

mod console;

use crate::error::Error;
use crate::request::{PromptChoice, Record};

pub use console::ConsoleHost;

#[cfg_attr(test, mockall::automock)]
pub trait Host: Send + Sync {
    /// Receive one result object.
    fn write_record(&self, record: &Record);

    /// Receive a non-fatal diagnostic.
    fn report_error(&self, error: &Error);

    fn warning(&self, message: &str);

    fn verbose(&self, message: &str);

    /// Ask whether to use a source that is not marked trusted.
    fn prompt_untrusted_source(&self, provider: &str, source: &str) -> anyhow::Result<PromptChoice>;
}
