use super::ExceptionHandler;
use crate::catalog::{InMemoryCatalog, MessageCatalog};
use crate::config::ConfigService;
use crate::display::{DebugDisplay, DiagnosticsLibrary, ExceptionDisplay, PlainDisplay};
use crate::exception::KindTag;
use crate::messaging::EventBus;
use crate::report::{Reporter, TracingReporter};
use crate::view::{NoTemplates, TemplateEngine};
use std::collections::HashSet;
use std::sync::Arc;

/// Builder for an [`ExceptionHandler`]
///
/// Every collaborator has a default: environment config, the English
/// catalog, no templates, a fresh event bus, `tracing` reporting and (with
/// the `diagnostics` feature) the built-in diagnostics library.
///
/// # Example
/// ```
/// use exception_display::config::ConfigService;
/// use exception_display::handler::ExceptionHandler;
/// use exception_display::messaging::EventBus;
///
/// let events = EventBus::new();
/// let handler = ExceptionHandler::builder()
///     .config(ConfigService::new())
///     .events(events.clone())
///     .build();
/// ```
pub struct ExceptionHandlerBuilder {
    config: Option<ConfigService>,
    events: EventBus,
    catalog: Arc<dyn MessageCatalog>,
    templates: Arc<dyn TemplateEngine>,
    reporter: Arc<dyn Reporter>,
    plain: Option<Arc<dyn ExceptionDisplay>>,
    diagnostics: Option<Arc<dyn DiagnosticsLibrary>>,
    dont_report: HashSet<KindTag>,
}

impl ExceptionHandlerBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            events: EventBus::new(),
            catalog: Arc::new(InMemoryCatalog::default()),
            templates: Arc::new(NoTemplates),
            reporter: Arc::new(TracingReporter),
            plain: None,
            diagnostics: default_diagnostics(),
            dont_report: KindTag::REPORT_EXEMPT.into_iter().collect(),
        }
    }

    pub fn config(mut self, config: ConfigService) -> Self {
        self.config = Some(config);
        self
    }

    pub fn events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn MessageCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn templates(mut self, templates: Arc<dyn TemplateEngine>) -> Self {
        self.templates = templates;
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replace the production display.
    pub fn plain_display(mut self, display: Arc<dyn ExceptionDisplay>) -> Self {
        self.plain = Some(display);
        self
    }

    pub fn diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsLibrary>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Run without a diagnostics library; debug mode then renders plainly.
    pub fn without_diagnostics(mut self) -> Self {
        self.diagnostics = None;
        self
    }

    /// Stop reporting a category.
    pub fn dont_report(mut self, tag: KindTag) -> Self {
        self.dont_report.insert(tag);
        self
    }

    /// Report a category that is exempt by default.
    pub fn report(mut self, tag: KindTag) -> Self {
        self.dont_report.remove(&tag);
        self
    }

    pub fn build(self) -> ExceptionHandler {
        let config = self.config.unwrap_or_else(ConfigService::from_env);
        let plain = self.plain.unwrap_or_else(|| {
            Arc::new(PlainDisplay::new(
                config.clone(),
                self.catalog.clone(),
                self.templates.clone(),
            ))
        });
        let debug = self
            .diagnostics
            .map(|diagnostics| DebugDisplay::new(config.clone(), diagnostics));

        ExceptionHandler {
            config,
            events: self.events,
            reporter: self.reporter,
            plain,
            debug,
            dont_report: self.dont_report,
        }
    }
}

impl Default for ExceptionHandlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "diagnostics")]
fn default_diagnostics() -> Option<Arc<dyn DiagnosticsLibrary>> {
    Some(Arc::new(crate::diagnostics::Diagnostics::default()))
}

#[cfg(not(feature = "diagnostics"))]
fn default_diagnostics() -> Option<Arc<dyn DiagnosticsLibrary>> {
    None
}
