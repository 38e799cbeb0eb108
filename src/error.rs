use thiserror::Error;

pub type Result<T> = std::result::Result<T, DisplayError>;

/// Failures inside the display layer itself.
///
/// None of these ever reach the client: the pipeline logs them and drops to
/// the next, safer rendering tier.
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("Template not found: {name}")]
    TemplateMissing { name: String },

    #[error("Failed to render template {name}: {message}")]
    TemplateRender { name: String, message: String },

    #[error("Diagnostics library is not available")]
    DiagnosticsUnavailable,

    #[error("Diagnostics rendering failed: {0}")]
    Diagnostics(String),

    #[error("Failed to serialize error payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Message catalog error: {message}")]
    Catalog { message: String },
}

impl DisplayError {
    pub fn template_render(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TemplateRender {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn diagnostics(message: impl Into<String>) -> Self {
        Self::Diagnostics(message.into())
    }

    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }
}
