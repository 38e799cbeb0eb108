use super::ExceptionDisplay;
use crate::common::{Rendered, RenderedResponse};
use crate::config::ConfigService;
use crate::error::Result;
use crate::exception::{Classified, RaisedException};
use crate::negotiate::{Representation, RequestContext, negotiate};
use axum::http::{HeaderValue, header::CONTENT_TYPE};
use std::sync::Arc;

/// Sub-handler a diagnostics run formats the exception with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Full HTML page with frames, source snippets and request tables.
    PrettyPage,
    Json { include_trace: bool },
    Xml,
}

/// A labelled set of key/value rows shown alongside the trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTable {
    pub label: String,
    pub rows: Vec<(String, String)>,
}

/// Settings for a single diagnostics run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Let the library terminate the process once it has handled the error.
    pub allow_quit: bool,
    /// Let the library write its output directly to stdout.
    pub write_to_output: bool,
    pub handler: HandlerKind,
    pub tables: Vec<DataTable>,
}

impl RunConfig {
    /// A run that only returns its output: no quitting, no writing.
    pub fn returning(handler: HandlerKind) -> Self {
        Self {
            allow_quit: false,
            write_to_output: false,
            handler,
            tables: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: DataTable) -> Self {
        self.tables.push(table);
        self
    }
}

/// A library producing verbose, trace-bearing error output.
pub trait DiagnosticsLibrary: Send + Sync {
    fn handle(&self, config: RunConfig, exception: &RaisedException) -> Result<String>;
}

/// Debug display: delegates formatting to a [`DiagnosticsLibrary`] and only
/// picks the sub-handler and content type.
#[derive(Clone)]
pub struct DebugDisplay {
    config: ConfigService,
    diagnostics: Arc<dyn DiagnosticsLibrary>,
}

impl DebugDisplay {
    pub fn new(config: ConfigService, diagnostics: Arc<dyn DiagnosticsLibrary>) -> Self {
        Self {
            config,
            diagnostics,
        }
    }

    fn request_table(request: &RequestContext) -> DataTable {
        let mut rows = vec![
            ("Method".to_string(), request.method().to_string()),
            ("URI".to_string(), request.uri().to_string()),
        ];
        rows.extend(request.headers().iter().map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        }));
        DataTable {
            label: "Request".to_string(),
            rows,
        }
    }
}

impl ExceptionDisplay for DebugDisplay {
    fn display(&self, exception: &Classified, request: &RequestContext) -> Result<Rendered> {
        let representation = negotiate(request, self.config.negotiation());
        let handler = match representation {
            Representation::Json => HandlerKind::Json {
                include_trace: true,
            },
            Representation::Xml => HandlerKind::Xml,
            Representation::Html => HandlerKind::PrettyPage,
        };

        let run = RunConfig::returning(handler).with_table(Self::request_table(request));
        let content = self.diagnostics.handle(run, &exception.exception)?;

        let response = match representation {
            Representation::Json => RenderedResponse::text(exception.status, content)
                .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json")),
            Representation::Xml => RenderedResponse::text(exception.status, content)
                .with_header(CONTENT_TYPE, HeaderValue::from_static("application/xml")),
            Representation::Html => RenderedResponse::html(exception.status, content),
        };
        Ok(Rendered::Response(response))
    }
}
