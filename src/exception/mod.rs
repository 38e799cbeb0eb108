use crate::common::RenderedResponse;
use crate::negotiate::RequestContext;
use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::error::Error;
use std::sync::Arc;
#[cfg(feature = "diagnostics")]
use std::sync::atomic::{AtomicBool, Ordering};
use strum_macros::{EnumDiscriminants, IntoStaticStr};
use thiserror::Error;

pub mod classify;
pub mod layer;

pub use classify::{Classification, Classified, Normalized, classify};
pub use layer::{ExceptionLayer, ExceptionMiddleware};

/// Type-erased error used for wrapped causes.
pub type BoxError = Box<dyn Error + Send + Sync>;

#[cfg(feature = "diagnostics")]
pub type Trace = backtrace::Backtrace;

#[cfg(feature = "diagnostics")]
static CAPTURE_TRACES: AtomicBool = AtomicBool::new(true);

/// Turn backtrace capture on or off for exceptions raised from now on.
///
/// Capture is on by default. It walks the stack once per
/// [`RaisedException`], including expected ones such as 404s; symbols are
/// only resolved when a diagnostics page is rendered. Hosts that never run
/// in debug mode can switch it off.
#[cfg(feature = "diagnostics")]
pub fn set_trace_capture(enabled: bool) {
    CAPTURE_TRACES.store(enabled, Ordering::Relaxed);
}

#[cfg(feature = "diagnostics")]
pub fn trace_capture_enabled() -> bool {
    CAPTURE_TRACES.load(Ordering::Relaxed)
}

/// Category of a raised exception.
///
/// The category decides the status code, whether the exception is reported,
/// and which rendering tier applies.
#[derive(Debug, Clone, IntoStaticStr, EnumDiscriminants)]
#[strum_discriminants(name(KindTag))]
#[strum_discriminants(derive(Hash))]
pub enum ExceptionKind {
    /// A model or resource lookup came back empty.
    NotFound,
    /// The caller is authenticated but not allowed.
    AuthorizationDenied,
    /// The caller is not authenticated at all.
    Unauthenticated,
    /// Input validation failed, optionally with a response to send as-is.
    ValidationFailed { response: Option<RenderedResponse> },
    /// An error that carries its own HTTP status and headers.
    Http { status: StatusCode, headers: HeaderMap },
    /// An error that carries the complete response to send.
    HttpResponse(RenderedResponse),
    /// Anything else.
    Generic,
}

impl ExceptionKind {
    pub fn tag(&self) -> KindTag {
        KindTag::from(self)
    }

    pub fn name(&self) -> &'static str {
        self.into()
    }
}

impl KindTag {
    /// Categories that describe expected outcomes rather than faults.
    pub const REPORT_EXEMPT: [KindTag; 6] = [
        KindTag::NotFound,
        KindTag::AuthorizationDenied,
        KindTag::Unauthenticated,
        KindTag::ValidationFailed,
        KindTag::Http,
        KindTag::HttpResponse,
    ];
}

/// An exception raised while handling a request.
///
/// Handlers return it as their error type; the [`ExceptionLayer`] picks it up
/// and runs it through the display pipeline.
///
/// # Example
/// ```
/// use exception_display::exception::RaisedException;
///
/// async fn show_user(id: u64) -> Result<String, RaisedException> {
///     Err(RaisedException::not_found(format!("No user {id}")))
/// }
/// ```
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RaisedException {
    kind: ExceptionKind,
    message: String,
    source: Option<BoxError>,
    #[cfg(feature = "diagnostics")]
    trace: Option<Trace>,
}

impl RaisedException {
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            #[cfg(feature = "diagnostics")]
            trace: trace_capture_enabled().then(Trace::new_unresolved),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::NotFound, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::AuthorizationDenied, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::Unauthenticated, message)
    }

    pub fn validation(message: impl Into<String>, response: Option<RenderedResponse>) -> Self {
        Self::new(ExceptionKind::ValidationFailed { response }, message)
    }

    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        Self::http_with_headers(status, HeaderMap::new(), message)
    }

    pub fn http_with_headers(
        status: StatusCode,
        headers: HeaderMap,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ExceptionKind::Http { status, headers }, message)
    }

    /// An exception that already knows the exact response to send.
    pub fn with_response(response: RenderedResponse) -> Self {
        let message = response
            .status()
            .canonical_reason()
            .unwrap_or_default()
            .to_string();
        Self::new(ExceptionKind::HttpResponse(response), message)
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::Generic, message)
    }

    /// Attach the underlying cause.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Recover a `RaisedException` from a boxed error, or wrap the error as a
    /// generic one.
    pub fn from_boxed(error: BoxError) -> Self {
        match error.downcast::<RaisedException>() {
            Ok(raised) => *raised,
            Err(error) => Self::generic(error.to_string()).with_source(error),
        }
    }

    pub fn kind(&self) -> &ExceptionKind {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The wrapped cause, if any.
    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    #[cfg(feature = "diagnostics")]
    pub(crate) fn trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }
}

impl From<anyhow::Error> for RaisedException {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<RaisedException>() {
            Ok(raised) => raised,
            Err(error) => {
                let message = error.to_string();
                Self::generic(message).with_source(error)
            }
        }
    }
}

#[cfg(feature = "sea-orm-db")]
impl From<sea_orm::DbErr> for RaisedException {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::RecordNotFound(message) => Self::not_found(message),
            other => Self::generic(format!("Database error: {}", other)).with_source(other),
        }
    }
}

/// Response extension carrying an exception returned by a handler.
///
/// Inserted by `RaisedException`'s `IntoResponse` and consumed by
/// [`ExceptionMiddleware`].
#[derive(Clone)]
pub struct PendingException(pub Arc<RaisedException>);

impl IntoResponse for RaisedException {
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response
            .extensions_mut()
            .insert(PendingException(Arc::new(self)));
        response
    }
}

/// The ExceptionFilter trait
///
/// Filters turn an uncaught exception into the response sent to the client.
/// They must always return a valid response.
pub trait ExceptionFilter: Send + Sync + 'static {
    /// Catch an exception and return a response
    fn catch(&self, exception: RaisedException, request: &RequestContext) -> Response;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("connection reset")]
    struct ConnectionReset;

    #[test]
    fn test_report_exempt_set() {
        assert!(KindTag::REPORT_EXEMPT.contains(&ExceptionKind::NotFound.tag()));
        assert!(KindTag::REPORT_EXEMPT.contains(&KindTag::ValidationFailed));
        assert!(!KindTag::REPORT_EXEMPT.contains(&KindTag::Generic));
    }

    #[test]
    fn test_kind_name() {
        assert_eq!(ExceptionKind::NotFound.name(), "NotFound");
        assert_eq!(ExceptionKind::Generic.name(), "Generic");
    }

    #[test]
    fn test_from_boxed_keeps_raised_exception() {
        let boxed: BoxError = Box::new(RaisedException::forbidden("nope"));
        let raised = RaisedException::from_boxed(boxed);
        assert_eq!(raised.kind().tag(), KindTag::AuthorizationDenied);
        assert_eq!(raised.message(), "nope");
    }

    #[test]
    fn test_from_boxed_wraps_foreign_error() {
        let raised = RaisedException::from_boxed(Box::new(ConnectionReset));
        assert_eq!(raised.kind().tag(), KindTag::Generic);
        assert_eq!(raised.message(), "connection reset");
        assert!(raised.cause().is_some());
        assert!(raised.source().is_some());
    }

    #[test]
    fn test_from_anyhow() {
        let raised = RaisedException::from(anyhow::anyhow!("disk full"));
        assert_eq!(raised.kind().tag(), KindTag::Generic);
        assert_eq!(raised.to_string(), "disk full");

        let raised = RaisedException::from(anyhow::Error::new(RaisedException::not_found("x")));
        assert_eq!(raised.kind().tag(), KindTag::NotFound);
    }

    #[cfg(feature = "diagnostics")]
    #[test]
    fn test_trace_capture_switch() {
        set_trace_capture(false);
        let quiet = RaisedException::not_found("no trace");
        set_trace_capture(true);
        let traced = RaisedException::generic("traced");

        assert!(quiet.trace().is_none());
        assert!(traced.trace().is_some());
    }

    #[test]
    fn test_into_response_stashes_exception() {
        let response = RaisedException::not_found("gone").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let pending = response.extensions().get::<PendingException>().unwrap();
        assert_eq!(pending.0.message(), "gone");
    }
}
