//! Fan-out of one operation across resolved providers.
//!
//! Providers run strictly one after another. Provider failures are turned into
//! diagnostics and dispatch moves on; cancellation stops dispatch at once and is
//! the only error returned to the caller.

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::provider::{Operation, ProviderDescriptor, ProviderFailure, precedence};
use crate::request::Request;
use crate::wildcard;

/// Result of invoking one provider.
#[derive(Debug)]
pub enum InvocationOutcome {
    Ok,
    ProviderError(Error),
    Cancelled,
}

/// What happened during one dispatch cycle.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Full names of the providers invoked, in order.
    pub invoked: Vec<String>,
    /// Non-fatal diagnostics: provider failures and not-found results.
    pub diagnostics: Vec<Error>,
    /// Whether any provider wrote a result.
    pub produced_output: bool,
    /// Provider that ended a first-success dispatch.
    pub completed_by: Option<String>,
}

impl DispatchReport {
    /// Fold another cycle's report into this one.
    pub fn merge(&mut self, other: DispatchReport) {
        self.invoked.extend(other.invoked);
        self.diagnostics.extend(other.diagnostics);
        self.produced_output |= other.produced_output;
        if self.completed_by.is_none() {
            self.completed_by = other.completed_by;
        }
    }

    pub fn is_success(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Instantiate `descriptor`, make it the request's active provider and run
/// `operation` on it.
pub fn invoke<R: Request>(
    request: &mut R,
    descriptor: &ProviderDescriptor,
    operation: Operation,
) -> InvocationOutcome {
    if request.is_canceled() {
        return InvocationOutcome::Cancelled;
    }

    debug!(
        "Invoking {} on provider {} for '{}'",
        operation,
        descriptor.full_name(),
        request.target()
    );
    request.core_mut().set_provider(Some(descriptor.clone()));
    let provider = descriptor.instantiate();
    let result = request.invoke(provider.as_ref(), operation);
    request.core_mut().set_provider(None);

    match result {
        Ok(()) if request.is_canceled() => InvocationOutcome::Cancelled,
        Ok(()) => InvocationOutcome::Ok,
        Err(ProviderFailure::Cancelled) => InvocationOutcome::Cancelled,
        Err(ProviderFailure::Failed(e)) => InvocationOutcome::ProviderError(Error::ProviderOperationFailed {
            provider: descriptor.full_name().to_string(),
            name: request.target().to_string(),
            message: format!("{:#}", e),
        }),
    }
}

/// Invoke every provider. A concrete, non-wildcard target that nobody
/// reported is a not-found diagnostic.
#[tracing::instrument(skip(request, providers), fields(target = %request.target()))]
pub fn dispatch_all<R: Request>(
    request: &mut R,
    providers: &[ProviderDescriptor],
    operation: Operation,
) -> Result<DispatchReport> {
    let mut report = DispatchReport::default();
    request.core_mut().reset_write_object();

    for descriptor in ordered(providers) {
        report.invoked.push(descriptor.full_name().to_string());
        let outcome = invoke(request, descriptor, operation);
        handle_outcome(request, &mut report, outcome)?;
    }

    report.produced_output = request.has_write_object();
    let target = request.target();
    if !report.produced_output && !target.is_empty() && !wildcard::has_wildcard(target) {
        report_diagnostic(request, &mut report, request.not_found());
    }
    Ok(report)
}

/// Invoke providers in order until one reports output.
#[tracing::instrument(skip(request, providers), fields(target = %request.target()))]
pub fn dispatch_first<R: Request>(
    request: &mut R,
    providers: &[ProviderDescriptor],
    operation: Operation,
) -> Result<DispatchReport> {
    let mut report = DispatchReport::default();
    request.core_mut().reset_write_object();

    for descriptor in ordered(providers) {
        report.invoked.push(descriptor.full_name().to_string());
        let outcome = invoke(request, descriptor, operation);
        handle_outcome(request, &mut report, outcome)?;
        if request.has_write_object() {
            debug!("{} completed by {}", operation, descriptor.full_name());
            report.completed_by = Some(descriptor.full_name().to_string());
            break;
        }
    }

    report.produced_output = request.has_write_object();
    if !report.produced_output {
        report_diagnostic(request, &mut report, request.not_found());
    }
    Ok(report)
}

fn ordered(providers: &[ProviderDescriptor]) -> Vec<&ProviderDescriptor> {
    let mut ordered: Vec<&ProviderDescriptor> = providers.iter().collect();
    ordered.sort_by(|a, b| precedence(a, b));
    ordered
}

fn handle_outcome<R: Request>(
    request: &R,
    report: &mut DispatchReport,
    outcome: InvocationOutcome,
) -> Result<()> {
    match outcome {
        InvocationOutcome::Ok => Ok(()),
        InvocationOutcome::ProviderError(e) => {
            warn!("{}", e);
            report_diagnostic(request, report, e);
            Ok(())
        }
        InvocationOutcome::Cancelled => {
            info!("Dispatch for '{}' cancelled", request.target());
            Err(Error::Cancelled)
        }
    }
}

fn report_diagnostic<R: Request>(request: &R, report: &mut DispatchReport, error: Error) {
    request.core().host().report_error(&error);
    report.diagnostics.push(error);
}
