use axum::{
    body::Body,
    http::{
        HeaderMap, HeaderName, HeaderValue, StatusCode,
        header::{CONTENT_TYPE, LOCATION},
    },
    response::{IntoResponse, Response},
};
use serde_json::Value;

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Convert a raw status code into a [`StatusCode`] inside `100..=599`.
///
/// Anything outside that range (or unparseable) becomes 500.
pub fn status_from_code(code: u16) -> StatusCode {
    match code {
        100..=599 => StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Body of a rendered error response.
///
/// A body is either markup/text or a JSON structure, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Html(String),
    Json(Value),
    Text(String),
    Empty,
}

impl ResponseBody {
    /// Content type implied by the body when no explicit header is set.
    pub fn default_content_type(&self) -> Option<&'static str> {
        match self {
            ResponseBody::Html(_) => Some(HTML_CONTENT_TYPE),
            ResponseBody::Json(_) => Some(JSON_CONTENT_TYPE),
            ResponseBody::Text(_) => Some(TEXT_CONTENT_TYPE),
            ResponseBody::Empty => None,
        }
    }

    /// Serialized body as sent over the wire.
    pub fn to_text(&self) -> String {
        match self {
            ResponseBody::Html(html) => html.clone(),
            ResponseBody::Json(value) => value.to_string(),
            ResponseBody::Text(text) => text.clone(),
            ResponseBody::Empty => String::new(),
        }
    }
}

/// A fully assembled error response.
///
/// Header keys are unique; inserting an existing key replaces its value.
#[derive(Debug, Clone)]
pub struct RenderedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
}

impl RenderedResponse {
    pub fn new(status: StatusCode, body: ResponseBody) -> Self {
        Self {
            status: status_from_code(status.as_u16()),
            headers: HeaderMap::new(),
            body,
        }
    }

    pub fn html(status: StatusCode, html: impl Into<String>) -> Self {
        Self::new(status, ResponseBody::Html(html.into()))
    }

    pub fn json(status: StatusCode, value: Value) -> Self {
        Self::new(status, ResponseBody::Json(value))
    }

    pub fn text(status: StatusCode, text: impl Into<String>) -> Self {
        Self::new(status, ResponseBody::Text(text.into()))
    }

    /// A `302 Found` pointing at `location`.
    pub fn redirect(location: &str) -> Self {
        let mut response = Self::new(StatusCode::FOUND, ResponseBody::Empty);
        if let Ok(value) = HeaderValue::from_str(location) {
            response.headers.insert(LOCATION, value);
        }
        response
    }

    /// Set a header, replacing any previous value for the same key.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Merge `headers` in; later keys replace earlier ones.
    pub fn with_headers(mut self, headers: &HeaderMap) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Explicit `Content-Type` header if present, otherwise the body's default.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .or_else(|| self.body.default_content_type())
    }
}

impl IntoResponse for RenderedResponse {
    fn into_response(self) -> Response {
        let content_type = self.content_type().map(str::to_owned);
        let mut response = Response::new(Body::from(self.body.to_text()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;

        if let Some(content_type) = content_type
            && let Ok(value) = HeaderValue::from_str(&content_type)
        {
            response.headers_mut().insert(CONTENT_TYPE, value);
        }
        response
    }
}

/// What a display hands back to the pipeline.
///
/// A display either builds the whole response itself, or returns bare
/// content that the pipeline wraps with the classified status and headers.
#[derive(Debug, Clone)]
pub enum Rendered {
    Response(RenderedResponse),
    Content(ResponseBody),
}

impl Rendered {
    /// Finish the response: full responses pass through unchanged, bare
    /// content is wrapped in a minimal envelope.
    pub fn into_rendered_response(self, status: StatusCode, headers: &HeaderMap) -> RenderedResponse {
        match self {
            Rendered::Response(response) => response,
            Rendered::Content(body) => RenderedResponse::new(status, body).with_headers(headers),
        }
    }
}
