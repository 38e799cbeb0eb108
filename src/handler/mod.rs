//! The exception pipeline.
//!
//! [`ExceptionHandler`] is the last line of defence for a request: it reports
//! the exception, classifies it, picks a display, and always comes back with
//! a response.

use crate::common::{Rendered, RenderedResponse, ResponseBody};
use crate::config::ConfigService;
use crate::display::plain::fallback_text;
use crate::display::{DebugDisplay, ExceptionDisplay};
use crate::error::DisplayError;
use crate::exception::{
    Classification, Classified, ExceptionFilter, ExceptionKind, KindTag, RaisedException,
    classify,
};
use crate::messaging::{EventBus, ReportEvent};
use crate::negotiate::RequestContext;
use crate::report::Reporter;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

mod builder;

pub use builder::ExceptionHandlerBuilder;

/// Turns uncaught exceptions into responses.
///
/// # Example
/// ```
/// use exception_display::config::ConfigService;
/// use exception_display::exception::RaisedException;
/// use exception_display::handler::ExceptionHandler;
/// use exception_display::negotiate::RequestContext;
///
/// let handler = ExceptionHandler::builder().config(ConfigService::new()).build();
/// let request = RequestContext::new().with_accept("application/json");
///
/// let response = handler.handle_exception(RaisedException::generic("boom"), &request);
/// assert_eq!(response.status().as_u16(), 500);
/// ```
pub struct ExceptionHandler {
    config: ConfigService,
    events: EventBus,
    reporter: Arc<dyn Reporter>,
    plain: Arc<dyn ExceptionDisplay>,
    debug: Option<DebugDisplay>,
    dont_report: HashSet<KindTag>,
}

impl ExceptionHandler {
    pub fn builder() -> ExceptionHandlerBuilder {
        ExceptionHandlerBuilder::new()
    }

    pub fn config(&self) -> &ConfigService {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Report and render `exception`.
    pub fn handle_exception(
        &self,
        exception: impl Into<Arc<RaisedException>>,
        request: &RequestContext,
    ) -> RenderedResponse {
        let exception = exception.into();
        self.report(&exception);
        self.render(exception, request)
    }

    pub fn should_report(&self, exception: &RaisedException) -> bool {
        !self.dont_report.contains(&exception.kind().tag())
    }

    /// Emit a [`ReportEvent`] for reportable exceptions, then hand every
    /// exception to the host reporter.
    pub fn report(&self, exception: &Arc<RaisedException>) {
        if self.should_report(exception) {
            self.events.publish(ReportEvent::new(Arc::clone(exception)));
        }

        if catch_unwind(AssertUnwindSafe(|| self.reporter.report(exception))).is_err() {
            tracing::error!("Exception reporter panicked");
        }
    }

    /// Build the response for `exception`.
    pub fn render(
        &self,
        exception: Arc<RaisedException>,
        request: &RequestContext,
    ) -> RenderedResponse {
        if let ExceptionKind::Unauthenticated = exception.kind() {
            return self.unauthenticated(request);
        }

        let classified = match classify(exception) {
            Classification::Prebuilt(response) => {
                tracing::debug!(
                    status = response.status().as_u16(),
                    "Exception carries its own response"
                );
                return response;
            }
            Classification::Classified(classified) => classified,
        };

        tracing::debug!(
            status = classified.status.as_u16(),
            kind = classified.exception.kind().name(),
            "Exception classified"
        );

        self.content(&classified, request)
            .into_rendered_response(classified.status, &classified.headers)
    }

    fn content(&self, classified: &Classified, request: &RequestContext) -> Rendered {
        // Read on every call: the host may toggle debug between requests.
        if self.config.debug() {
            match &self.debug {
                Some(debug) => match guarded(debug, classified, request) {
                    Ok(rendered) => return rendered,
                    Err(e) => tracing::warn!(
                        error = %e,
                        "Diagnostic rendering failed, falling back to plain display"
                    ),
                },
                None => tracing::warn!(
                    error = %DisplayError::DiagnosticsUnavailable,
                    "Debug mode is on, using plain display"
                ),
            }
        }

        match guarded(self.plain.as_ref(), classified, request) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::error!(error = %e, "Plain display failed, sending bare error text");
                Rendered::Response(last_resort(classified))
            }
        }
    }

    fn unauthenticated(&self, request: &RequestContext) -> RenderedResponse {
        if request.expects_json() {
            return RenderedResponse::json(
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Unauthenticated." }),
            );
        }
        RenderedResponse::redirect(&self.config.login_path())
    }
}

impl ExceptionFilter for ExceptionHandler {
    fn catch(&self, exception: RaisedException, request: &RequestContext) -> Response {
        self.handle_exception(exception, request).into_response()
    }
}

/// Run a display, turning a panic into an error.
fn guarded(
    display: &dyn ExceptionDisplay,
    classified: &Classified,
    request: &RequestContext,
) -> crate::Result<Rendered> {
    catch_unwind(AssertUnwindSafe(|| display.display(classified, request)))
        .unwrap_or_else(|_| Err(DisplayError::diagnostics("display panicked")))
}

fn last_resort(classified: &Classified) -> RenderedResponse {
    let name = classified
        .status
        .canonical_reason()
        .unwrap_or("Internal Server Error");
    let text = fallback_text(
        classified.status.as_u16(),
        name,
        classified.exception.message(),
    );
    RenderedResponse::new(classified.status, ResponseBody::Text(text))
}
