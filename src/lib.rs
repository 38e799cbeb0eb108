//! # exception-display
//!
//! Turns exceptions that escape an axum handler into HTTP responses.
//!
//! The pipeline reports the exception, classifies it into a status code,
//! negotiates JSON, XML or HTML from the request, and renders it either
//! plainly (catalog messages and templates) or, in debug mode, through a
//! diagnostics library with stack frames and source snippets.
//!
//! ## Features
//!
//! - **Classification**: not-found, authorization, validation and HTTP
//!   exceptions map to their status codes; everything else is a 500
//! - **Negotiation**: `Accept`-driven JSON detection, with a legacy AJAX mode
//! - **Plain display**: per-status templates, a default template, and an
//!   inline page that always works
//! - **Debug display**: pretty HTML, JSON or XML diagnostics (`diagnostics`
//!   feature)
//! - **Report events**: reportable exceptions are published on an [`EventBus`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use exception_display::prelude::*;
//!
//! async fn show_order() -> std::result::Result<String, RaisedException> {
//!     Err(RaisedException::not_found("No order 42"))
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let events = EventBus::new();
//!     let mut reports = events.subscribe::<ReportEvent>();
//!     tokio::spawn(async move {
//!         while let Some(event) = reports.recv().await {
//!             println!("{} at {}", event.exception, event.occurred_at);
//!         }
//!     });
//!
//!     let handler = ExceptionHandler::builder()
//!         .config(ConfigService::from_env())
//!         .events(events)
//!         .build();
//!
//!     let app: Router = Router::new()
//!         .route("/orders/42", get(show_order))
//!         .layer(ExceptionLayer::new(handler));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

pub mod catalog;
pub mod common;
pub mod config;
#[cfg(feature = "diagnostics")]
pub mod diagnostics;
pub mod display;
pub mod error;
pub mod exception;
pub mod handler;
pub mod messaging;
pub mod negotiate;
pub mod report;
pub mod view;

// Re-export core types
pub use error::{DisplayError, Result};
pub use exception::{ExceptionKind, ExceptionLayer, RaisedException};
pub use handler::{ExceptionHandler, ExceptionHandlerBuilder};
pub use messaging::{EventBus, ReportEvent};

// Re-export commonly used types from dependencies
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use exception_display::prelude::*;
/// ```
pub mod prelude {
    pub use crate::catalog::{InMemoryCatalog, MessageCatalog, StatusMessage};
    pub use crate::common::{Rendered, RenderedResponse, ResponseBody};
    pub use crate::config::ConfigService;
    pub use crate::display::{
        DataTable, DebugDisplay, DiagnosticsLibrary, ExceptionDisplay, ExceptionInfo,
        HandlerKind, PlainDisplay, RunConfig,
    };
    pub use crate::error::{DisplayError, Result};
    pub use crate::exception::{
        ExceptionFilter, ExceptionKind, ExceptionLayer, KindTag, RaisedException,
    };
    pub use crate::handler::{ExceptionHandler, ExceptionHandlerBuilder};
    pub use crate::messaging::{EventBus, ReportEvent};
    pub use crate::negotiate::{NegotiationStrategy, Representation, RequestContext};
    pub use crate::report::{Reporter, TracingReporter};
    pub use crate::view::TemplateEngine;
    pub use axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    pub use std::sync::Arc;
}
