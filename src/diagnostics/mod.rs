//! Built-in diagnostics library.
//!
//! Produces verbose error output for debug mode: the exception's category
//! and message, its cause chain, resolved stack frames with source snippets,
//! and any data tables the caller adds (request details, for instance).
//!
//! ## Feature Requirement
//!
//! This module is only available with the `diagnostics` feature (on by
//! default). Without it, debug mode falls back to the plain display.
//!
//! ## Usage
//!
//! ```rust
//! use exception_display::diagnostics::Diagnostics;
//! use exception_display::display::{DiagnosticsLibrary, HandlerKind, RunConfig};
//! use exception_display::exception::RaisedException;
//!
//! let page = Diagnostics::default()
//!     .handle(RunConfig::returning(HandlerKind::PrettyPage), &RaisedException::generic("boom"))
//!     .unwrap();
//! assert!(page.contains("Stack trace"));
//! ```

use crate::display::{DataTable, DiagnosticsLibrary, HandlerKind, RunConfig};
use crate::error::Result;
use crate::exception::RaisedException;
use std::error::Error;
use std::io::Write;

pub mod frames;
pub mod handlers;

pub use frames::{Frame, Snippet};
pub use handlers::{Handler, JsonResponseHandler, PrettyPageHandler, XmlResponseHandler};

/// Everything a handler formats.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub kind: &'static str,
    pub message: String,
    /// Messages of the wrapped causes, outermost first.
    pub causes: Vec<String>,
    pub frames: Vec<Frame>,
    pub tables: Vec<DataTable>,
}

/// The diagnostics library entry point.
#[derive(Debug, Clone, Copy)]
pub struct Diagnostics {
    pub max_frames: usize,
    /// Source lines shown on either side of a frame's line.
    pub snippet_radius: u32,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            max_frames: 64,
            snippet_radius: 5,
        }
    }
}

impl Diagnostics {
    pub fn inspect(&self, exception: &RaisedException, tables: Vec<DataTable>) -> Inspection {
        let mut causes = Vec::new();
        let mut source = exception.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Inspection {
            kind: exception.kind().name(),
            message: exception.message().to_string(),
            causes,
            frames: exception
                .trace()
                .map(|trace| frames::collect_frames(trace, self.max_frames, self.snippet_radius))
                .unwrap_or_default(),
            tables,
        }
    }
}

impl DiagnosticsLibrary for Diagnostics {
    fn handle(&self, config: RunConfig, exception: &RaisedException) -> Result<String> {
        Run::new(*self, config).handle_exception(exception)
    }
}

/// One handling pass with a single registered handler.
pub struct Run {
    library: Diagnostics,
    allow_quit: bool,
    write_to_output: bool,
    handler: Box<dyn Handler>,
    tables: Vec<DataTable>,
}

impl Run {
    pub fn new(library: Diagnostics, config: RunConfig) -> Self {
        let handler: Box<dyn Handler> = match config.handler {
            HandlerKind::PrettyPage => Box::new(PrettyPageHandler),
            HandlerKind::Json { include_trace } => Box::new(JsonResponseHandler { include_trace }),
            HandlerKind::Xml => Box::new(XmlResponseHandler),
        };
        Self {
            library,
            allow_quit: config.allow_quit,
            write_to_output: config.write_to_output,
            handler,
            tables: config.tables,
        }
    }

    /// Format `exception` and return the output.
    ///
    /// With `write_to_output` the output also goes to stdout; with
    /// `allow_quit` the process exits with status 1 afterwards.
    pub fn handle_exception(self, exception: &RaisedException) -> Result<String> {
        let inspection = self.library.inspect(exception, self.tables);
        let output = self.handler.handle(&inspection)?;

        if self.write_to_output {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = stdout.write_all(output.as_bytes()).and_then(|_| stdout.flush()) {
                tracing::warn!(error = %e, "Failed to write diagnostics output");
            }
        }
        if self.allow_quit {
            std::process::exit(1);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("socket closed")]
    struct SocketClosed;

    #[test]
    fn test_inspect_collects_causes() {
        let exception = RaisedException::generic("request failed").with_source(SocketClosed);
        let inspection = Diagnostics::default().inspect(&exception, Vec::new());
        assert_eq!(inspection.kind, "Generic");
        assert_eq!(inspection.message, "request failed");
        assert_eq!(inspection.causes, vec!["socket closed".to_string()]);
    }

    #[test]
    fn test_run_returns_html_page() {
        let exception = RaisedException::not_found("no such order");
        let config = RunConfig::returning(HandlerKind::PrettyPage).with_table(DataTable {
            label: "Request".to_string(),
            rows: vec![("URI".to_string(), "/orders/9".to_string())],
        });

        let page = Diagnostics::default().handle(config, &exception).unwrap();
        assert!(page.contains("<h1 class=\"exception\">NotFound</h1>"));
        assert!(page.contains("no such order"));
        assert!(page.contains("Stack trace"));
        assert!(page.contains("/orders/9"));
    }

    #[test]
    fn test_run_returns_json() {
        let exception = RaisedException::generic("boom");
        let output = Diagnostics::default()
            .handle(
                RunConfig::returning(HandlerKind::Json {
                    include_trace: true,
                }),
                &exception,
            )
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["error"]["message"], "boom");
        assert!(value["error"]["trace"].is_array());
    }
}
