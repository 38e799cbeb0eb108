use super::{BoxError, PendingException, RaisedException};
use crate::handler::ExceptionHandler;
use crate::negotiate::RequestContext;
use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service, ServiceExt};

/// Tower Layer routing uncaught exceptions through an [`ExceptionHandler`].
///
/// Catches both handler errors returned as [`RaisedException`] responses and
/// errors coming out of the wrapped service itself.
///
/// # Example
/// ```
/// use axum::{Router, routing::get};
/// use exception_display::config::ConfigService;
/// use exception_display::exception::{ExceptionLayer, RaisedException};
/// use exception_display::handler::ExceptionHandler;
///
/// async fn missing() -> Result<String, RaisedException> {
///     Err(RaisedException::not_found("No such page"))
/// }
///
/// let handler = ExceptionHandler::builder().config(ConfigService::new()).build();
/// let app: Router = Router::new()
///     .route("/missing", get(missing))
///     .layer(ExceptionLayer::new(handler));
/// ```
#[derive(Clone)]
pub struct ExceptionLayer {
    handler: Arc<ExceptionHandler>,
}

impl ExceptionLayer {
    pub fn new(handler: ExceptionHandler) -> Self {
        Self::shared(Arc::new(handler))
    }

    pub fn shared(handler: Arc<ExceptionHandler>) -> Self {
        Self { handler }
    }
}

impl<S> Layer<S> for ExceptionLayer {
    type Service = ExceptionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ExceptionMiddleware {
            inner,
            handler: self.handler.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ExceptionMiddleware<S> {
    inner: S,
    handler: Arc<ExceptionHandler>,
}

impl<S> Service<Request<Body>> for ExceptionMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError> + Send,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Readiness is driven inside `call` so inner failures are rendered too.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.handler.clone();
        let inner = self.inner.clone();
        let request = RequestContext::from_request(&req);

        Box::pin(async move {
            match inner.oneshot(req).await {
                Ok(mut response) => {
                    match response.extensions_mut().remove::<PendingException>() {
                        Some(PendingException(exception)) => {
                            Ok(handler.handle_exception(exception, &request).into_response())
                        }
                        None => Ok(response),
                    }
                }
                Err(e) => {
                    let exception = RaisedException::from_boxed(e.into());
                    Ok(handler.handle_exception(exception, &request).into_response())
                }
            }
        })
    }
}
