//! Turning a classified exception into a response body.
//!
//! [`PlainDisplay`] is the safe, production rendering. [`DebugDisplay`]
//! hands the exception to a diagnostics library and is only used while debug
//! mode is on.

use crate::common::Rendered;
use crate::error::Result;
use crate::exception::Classified;
use crate::negotiate::RequestContext;
use serde::Serialize;

pub mod debug;
pub mod plain;

pub use debug::{DataTable, DebugDisplay, DiagnosticsLibrary, HandlerKind, RunConfig};
pub use plain::PlainDisplay;

/// What gets shown about an exception, and the context handed to templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionInfo {
    /// Status code the name and message belong to.
    pub code: u16,
    pub name: String,
    pub message: String,
    /// The exception's own message.
    pub description: String,
}

/// A rendering strategy for classified exceptions.
pub trait ExceptionDisplay: Send + Sync {
    fn display(&self, exception: &Classified, request: &RequestContext) -> Result<Rendered>;
}
