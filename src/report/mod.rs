use crate::exception::{KindTag, RaisedException};

/// Host-side default reporting, run after the report event for every
/// exception the pipeline sees.
pub trait Reporter: Send + Sync + 'static {
    fn report(&self, exception: &RaisedException);
}

/// Logs exceptions through `tracing`.
///
/// Report-exempt categories are logged at debug level, everything else as an
/// error with its cause chain.
#[derive(Clone, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, exception: &RaisedException) {
        let kind = exception.kind().name();
        if KindTag::REPORT_EXEMPT.contains(&exception.kind().tag()) {
            tracing::debug!(kind, "Handled exception: {}", exception);
            return;
        }

        match exception.cause() {
            Some(cause) => {
                tracing::error!(kind, cause = %cause, "Unhandled exception: {}", exception)
            }
            None => tracing::error!(kind, "Unhandled exception: {}", exception),
        }
    }
}
