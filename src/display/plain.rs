use super::{ExceptionDisplay, ExceptionInfo};
use crate::catalog::{MessageCatalog, StatusMessage};
use crate::common::{Rendered, RenderedResponse};
use crate::config::ConfigService;
use crate::error::Result;
use crate::exception::{Classified, RaisedException};
use crate::negotiate::RequestContext;
use crate::view::{TemplateEngine, status_template};
use axum::http::StatusCode;
use quick_xml::escape::escape;
use serde_json::json;
use std::sync::Arc;

/// Production display: catalog messages, custom templates, and an inline
/// page as the last tier.
///
/// Tiers, first match wins:
/// 1. JSON payload carrying the exception's message when the request
///    wants JSON.
/// 2. `errors/<code>` template, for HTTP and not-found exceptions.
/// 3. The configured default error template (`view.error`).
/// 4. A minimal inline HTML page.
#[derive(Clone)]
pub struct PlainDisplay {
    config: ConfigService,
    catalog: Arc<dyn MessageCatalog>,
    templates: Arc<dyn TemplateEngine>,
}

impl PlainDisplay {
    pub fn new(
        config: ConfigService,
        catalog: Arc<dyn MessageCatalog>,
        templates: Arc<dyn TemplateEngine>,
    ) -> Self {
        Self {
            config,
            catalog,
            templates,
        }
    }

    /// Collect what to show for `status`.
    ///
    /// A code missing from the catalog is shown as 500. The returned `code`
    /// reflects that; the HTTP status of the response does not change.
    pub fn info(&self, status: StatusCode, exception: &RaisedException) -> ExceptionInfo {
        let locale = self.config.locale();

        let mut code = status.as_u16();
        if !self.catalog.has(&locale, code) {
            code = 500;
        }

        let StatusMessage { name, message } = self
            .catalog
            .get(&locale, code)
            .unwrap_or_else(|| builtin_message(code));

        ExceptionInfo {
            code,
            name,
            message,
            description: exception.message().to_string(),
        }
    }

    fn render_template(&self, name: &str, info: &ExceptionInfo) -> Option<String> {
        if !self.templates.exists(name) {
            return None;
        }
        match self.templates.render(name, info) {
            Ok(html) => Some(html),
            Err(e) => {
                tracing::warn!(template = name, error = %e, "Error template failed to render");
                None
            }
        }
    }
}

impl ExceptionDisplay for PlainDisplay {
    fn display(&self, exception: &Classified, request: &RequestContext) -> Result<Rendered> {
        let info = self.info(exception.status, &exception.exception);

        if self.config.negotiation().wants_json(request) {
            let payload = json!({
                "error": {
                    "type": "Exception",
                    "message": info.description,
                }
            });
            return Ok(Rendered::Response(
                RenderedResponse::json(exception.status, payload).with_headers(&exception.headers),
            ));
        }

        let status = if exception.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            exception.status
        };
        let page = |html: String| -> Result<Rendered> {
            Ok(Rendered::Response(
                RenderedResponse::html(status, html).with_headers(&exception.headers),
            ))
        };

        if exception.is_http()
            && let Some(html) = self.render_template(&status_template(status.as_u16()), &info)
        {
            return page(html);
        }

        if let Some(html) = self.render_template(&self.config.error_view(), &info) {
            return page(html);
        }

        page(fallback_page(status.as_u16(), &info.name, &info.message))
    }
}

fn builtin_message(code: u16) -> StatusMessage {
    let name = StatusCode::from_u16(code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("Internal Server Error");
    StatusMessage::new(name, "Something went wrong.")
}

/// Minimal HTML page used when no template applies.
pub fn fallback_page(code: u16, name: &str, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
    <head>
        <meta charset="utf-8">
        <meta name="robots" content="noindex,nofollow">
        <title>{code} {name}</title>
    </head>
    <body>
        <h1>{code} {name}</h1>
        <p>{message}</p>
    </body>
</html>
"#,
        name = escape(name),
        message = escape(message),
    )
}

/// One-line text used when no display could produce anything.
pub fn fallback_text(code: u16, name: &str, message: &str) -> String {
    format!("{code} {name}: {message}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::common::ResponseBody;
    use crate::error::DisplayError;
    use axum::http::header::RETRY_AFTER;
    use axum::http::{HeaderMap, HeaderValue};
    use crate::exception::{Classification, classify};
    use crate::view::NoTemplates;
    use std::collections::HashMap;

    struct FakeTemplates {
        templates: HashMap<&'static str, Option<&'static str>>,
    }

    impl FakeTemplates {
        fn with(entries: &[(&'static str, Option<&'static str>)]) -> Self {
            Self {
                templates: entries.iter().copied().collect(),
            }
        }
    }

    impl TemplateEngine for FakeTemplates {
        fn exists(&self, name: &str) -> bool {
            self.templates.contains_key(name)
        }

        fn render(&self, name: &str, context: &ExceptionInfo) -> Result<String> {
            match self.templates.get(name) {
                Some(Some(body)) => Ok(format!("{body}:{}:{}", context.code, context.name)),
                Some(None) => Err(DisplayError::template_render(name, "broken")),
                None => Err(DisplayError::TemplateMissing {
                    name: name.to_string(),
                }),
            }
        }
    }

    fn plain(templates: impl TemplateEngine + 'static) -> PlainDisplay {
        PlainDisplay::new(
            ConfigService::new(),
            Arc::new(InMemoryCatalog::default()),
            Arc::new(templates),
        )
    }

    fn classified(exception: RaisedException) -> Classified {
        match classify(Arc::new(exception)) {
            Classification::Classified(classified) => classified,
            Classification::Prebuilt(_) => panic!("expected a classified exception"),
        }
    }

    fn response(rendered: Rendered) -> RenderedResponse {
        match rendered {
            Rendered::Response(response) => response,
            Rendered::Content(_) => panic!("expected a full response"),
        }
    }

    fn html() -> RequestContext {
        RequestContext::new().with_accept("text/html")
    }

    #[test]
    fn test_info_matches_catalog() {
        let display = plain(NoTemplates);
        let catalog = InMemoryCatalog::default();
        let exception = RaisedException::generic("boom");
        for code in [400u16, 403, 404, 422, 500, 503] {
            let info = display.info(StatusCode::from_u16(code).unwrap(), &exception);
            let entry = catalog.get("en", code).unwrap();
            assert_eq!(info.code, code);
            assert_eq!(info.name, entry.name);
            assert_eq!(info.message, entry.message);
            assert_eq!(info.description, "boom");
        }
    }

    #[test]
    fn test_info_coerces_unknown_code() {
        let display = plain(NoTemplates);
        let info = display.info(StatusCode::IM_A_TEAPOT, &RaisedException::generic("tea"));
        assert_eq!(info.code, 500);
        assert_eq!(info.name, "Internal Server Error");
    }

    #[test]
    fn test_info_survives_empty_catalog() {
        let display = PlainDisplay::new(
            ConfigService::new(),
            Arc::new(InMemoryCatalog::empty("en")),
            Arc::new(NoTemplates),
        );
        let info = display.info(StatusCode::NOT_FOUND, &RaisedException::not_found("x"));
        assert_eq!(info.code, 500);
        assert_eq!(info.name, "Internal Server Error");
    }

    #[test]
    fn test_json_payload() {
        let display = plain(NoTemplates);
        let request = RequestContext::new().with_accept("application/json");
        let rendered = display
            .display(&classified(RaisedException::generic("db down")), &request)
            .unwrap();

        let response = response(rendered);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.body(),
            &ResponseBody::Json(json!({
                "error": {
                    "type": "Exception",
                    "message": "db down",
                }
            }))
        );
    }

    #[test]
    fn test_json_payload_with_empty_message() {
        let display = plain(NoTemplates);
        let request = RequestContext::new().with_accept("application/json");
        let response = response(
            display
                .display(&classified(RaisedException::generic("")), &request)
                .unwrap(),
        );
        assert_eq!(
            response.body(),
            &ResponseBody::Json(json!({"error": {"type": "Exception", "message": ""}}))
        );
    }

    #[test]
    fn test_http_headers_kept_on_every_tier() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("120"));
        let exception = classified(RaisedException::http_with_headers(
            StatusCode::SERVICE_UNAVAILABLE,
            headers,
            "maintenance",
        ));
        let json_request = RequestContext::new().with_accept("application/json");

        let inline = response(plain(NoTemplates).display(&exception, &html()).unwrap());
        let json = response(plain(NoTemplates).display(&exception, &json_request).unwrap());
        let templated = response(
            plain(FakeTemplates::with(&[("errors/503", Some("down"))]))
                .display(&exception, &html())
                .unwrap(),
        );

        for response in [inline, json, templated] {
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(response.headers().get(RETRY_AFTER).unwrap(), "120");
        }
    }

    #[test]
    fn test_json_keeps_outer_status_for_unknown_code() {
        let display = plain(NoTemplates);
        let request = RequestContext::new().with_accept("application/json");
        let exception = classified(RaisedException::http(StatusCode::IM_A_TEAPOT, "tea"));
        let Rendered::Response(response) = display.display(&exception, &request).unwrap() else {
            panic!("expected a full response");
        };
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }

    #[test]
    fn test_not_found_inline_page() {
        let display = plain(NoTemplates);
        let rendered = display
            .display(&classified(RaisedException::not_found("no user 7")), &html())
            .unwrap();

        let Rendered::Response(response) = rendered else {
            panic!("expected a full response");
        };
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let ResponseBody::Html(body) = response.body() else {
            panic!("expected html");
        };
        assert!(body.contains("404 Not Found"));
        assert!(body.contains("Sorry, the page you are looking for could not be found."));
        assert!(body.contains(r#"<meta name="robots" content="noindex,nofollow">"#));
    }

    #[test]
    fn test_not_found_forced_to_404() {
        let mut exception = classified(RaisedException::not_found("gone"));
        exception.status = StatusCode::INTERNAL_SERVER_ERROR;

        let inline = plain(NoTemplates);
        let status_page = plain(FakeTemplates::with(&[("errors/404", Some("missing"))]));
        let default_page = plain(FakeTemplates::with(&[("errors/error", Some("default"))]));

        for display in [inline, status_page, default_page] {
            let response = response(display.display(&exception, &html()).unwrap());
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn test_status_template_for_http_exceptions() {
        let display = plain(FakeTemplates::with(&[("errors/403", Some("denied"))]));
        let rendered = display
            .display(&classified(RaisedException::forbidden("no")), &html())
            .unwrap();
        let response = response(rendered);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.body(), &ResponseBody::Html("denied:403:Forbidden".to_string()));
    }

    #[test]
    fn test_status_template_skipped_for_generic() {
        let display = plain(FakeTemplates::with(&[("errors/500", Some("five"))]));
        let rendered = display
            .display(&classified(RaisedException::generic("boom")), &html())
            .unwrap();
        assert!(!response(rendered).body().to_text().starts_with("five"));
    }

    #[test]
    fn test_default_template() {
        let display = plain(FakeTemplates::with(&[("errors/error", Some("default"))]));
        let rendered = display
            .display(&classified(RaisedException::generic("boom")), &html())
            .unwrap();
        assert_eq!(
            response(rendered).body(),
            &ResponseBody::Html("default:500:Internal Server Error".to_string())
        );
    }

    #[test]
    fn test_broken_template_degrades() {
        let display = plain(FakeTemplates::with(&[
            ("errors/404", None),
            ("errors/error", None),
        ]));
        let rendered = display
            .display(&classified(RaisedException::not_found("x")), &html())
            .unwrap();
        let Rendered::Response(response) = rendered else {
            panic!("expected the inline page");
        };
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_fallback_page_escapes() {
        let page = fallback_page(500, "<b>", "a & b");
        assert!(page.contains("&lt;b&gt;"));
        assert!(page.contains("a &amp; b"));
    }

    #[test]
    fn test_fallback_text() {
        assert_eq!(fallback_text(404, "Not Found", "gone"), "404 Not Found: gone");
    }
}
