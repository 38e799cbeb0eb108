//! Template lookup used by the plain display.

use crate::display::ExceptionInfo;
use crate::error::{DisplayError, Result};

/// Name of the status-specific template for `code`, e.g. `errors/404`.
pub fn status_template(code: u16) -> String {
    format!("errors/{code}")
}

/// The host's template system, seen through two calls.
pub trait TemplateEngine: Send + Sync {
    fn exists(&self, name: &str) -> bool;

    fn render(&self, name: &str, context: &ExceptionInfo) -> Result<String>;
}

/// A template engine with no templates; the plain display always ends up on
/// its inline page.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTemplates;

impl TemplateEngine for NoTemplates {
    fn exists(&self, _name: &str) -> bool {
        false
    }

    fn render(&self, name: &str, _context: &ExceptionInfo) -> Result<String> {
        Err(DisplayError::TemplateMissing {
            name: name.to_string(),
        })
    }
}
