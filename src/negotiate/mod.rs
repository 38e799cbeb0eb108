//! Response negotiation.
//!
//! Decides whether an error goes out as JSON, XML or HTML, based on the
//! inbound request's headers.

use axum::http::{
    HeaderMap, Method, Request, Uri,
    header::{ACCEPT, CONTENT_TYPE},
    request::Parts,
};
use strum_macros::{Display, EnumString};

/// Representation chosen for an error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Representation {
    Json,
    Xml,
    Html,
}

/// Which request signal decides that the caller wants JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum NegotiationStrategy {
    /// The first acceptable media type in `Accept` is a JSON type.
    #[default]
    Accept,
    /// Legacy: the request carries `X-Requested-With: XMLHttpRequest`.
    ///
    /// Kept for hosts whose clients never send a JSON `Accept` header.
    Ajax,
}

impl NegotiationStrategy {
    pub fn wants_json(self, request: &RequestContext) -> bool {
        match self {
            NegotiationStrategy::Accept => request.wants_json(),
            NegotiationStrategy::Ajax => request.is_ajax(),
        }
    }
}

/// Pick a representation: JSON, then XML, then HTML.
pub fn negotiate(request: &RequestContext, strategy: NegotiationStrategy) -> Representation {
    if strategy.wants_json(request) {
        Representation::Json
    } else if request.wants_xml() {
        Representation::Xml
    } else {
        Representation::Html
    }
}

/// Read-only view of the inbound request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(parts: &Parts) -> Self {
        Self::from_head(&parts.method, &parts.uri, &parts.headers)
    }

    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self::from_head(request.method(), request.uri(), request.headers())
    }

    pub fn from_head(method: &Method, uri: &Uri, headers: &HeaderMap) -> Self {
        Self {
            method: method.clone(),
            uri: uri.clone(),
            headers: headers.clone(),
        }
    }

    /// Set a header, mostly useful in tests.
    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = value.parse() {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_accept(self, accept: &str) -> Self {
        self.with_header("accept", accept)
    }

    pub fn with_content_type(self, content_type: &str) -> Self {
        self.with_header("content-type", content_type)
    }

    pub fn with_ajax(self) -> Self {
        self.with_header("x-requested-with", "XMLHttpRequest")
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn header(&self, name: impl axum::http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Media types from `Accept`, best quality first. Types with `q=0` are
    /// left out.
    pub fn acceptable_content_types(&self) -> Vec<String> {
        let Some(accept) = self.header(ACCEPT) else {
            return Vec::new();
        };

        let mut types: Vec<(String, f32)> = accept
            .split(',')
            .filter_map(|item| {
                let mut params = item.split(';');
                let media_type = params.next()?.trim().to_ascii_lowercase();
                if media_type.is_empty() {
                    return None;
                }
                let quality = params
                    .filter_map(|param| param.trim().strip_prefix("q="))
                    .find_map(|q| q.trim().parse::<f32>().ok())
                    .unwrap_or(1.0);
                // q=0 marks a type as not acceptable.
                (quality > 0.0).then_some((media_type, quality))
            })
            .collect();

        // Stable sort keeps header order among equal qualities.
        types.sort_by(|a, b| b.1.total_cmp(&a.1));
        types.into_iter().map(|(media_type, _)| media_type).collect()
    }

    /// True when the preferred acceptable type is JSON.
    ///
    /// A wildcard such as `*/*` never counts as asking for JSON.
    pub fn wants_json(&self) -> bool {
        self.acceptable_content_types()
            .first()
            .is_some_and(|media_type| is_json_type(media_type))
    }

    /// True when the request body is declared as XML.
    pub fn wants_xml(&self) -> bool {
        self.header(CONTENT_TYPE).is_some_and(|content_type| {
            let content_type = content_type.to_ascii_lowercase();
            content_type.contains("/xml") || content_type.contains("+xml")
        })
    }

    pub fn is_ajax(&self) -> bool {
        self.header("x-requested-with")
            .is_some_and(|value| value.eq_ignore_ascii_case("XMLHttpRequest"))
    }

    pub fn is_pjax(&self) -> bool {
        self.headers.contains_key("x-pjax")
    }

    /// Either an AJAX call (that is not PJAX) or an explicit JSON `Accept`.
    pub fn expects_json(&self) -> bool {
        (self.is_ajax() && !self.is_pjax()) || self.wants_json()
    }
}

fn is_json_type(media_type: &str) -> bool {
    media_type.contains("/json") || media_type.contains("+json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wants_json_from_accept() {
        assert!(RequestContext::new().with_accept("application/json").wants_json());
        assert!(
            RequestContext::new()
                .with_accept("application/problem+json, text/html;q=0.5")
                .wants_json()
        );
        assert!(!RequestContext::new().with_accept("text/html").wants_json());
        assert!(!RequestContext::new().wants_json());
    }

    #[test]
    fn test_wildcard_is_not_json() {
        assert!(!RequestContext::new().with_accept("*/*").wants_json());
        assert!(
            !RequestContext::new()
                .with_accept("*/*, application/json;q=0.1")
                .wants_json()
        );
    }

    #[test]
    fn test_quality_ordering() {
        let request = RequestContext::new().with_accept("text/html;q=0.4, application/json");
        assert_eq!(
            request.acceptable_content_types(),
            vec!["application/json".to_string(), "text/html".to_string()]
        );
        assert!(request.wants_json());
    }

    #[test]
    fn test_zero_quality_is_not_acceptable() {
        let request = RequestContext::new().with_accept("application/json;q=0, text/html");
        assert_eq!(request.acceptable_content_types(), vec!["text/html".to_string()]);
        assert!(!request.wants_json());
        assert!(!RequestContext::new().with_accept("application/json; q=0.0").wants_json());
    }

    #[test]
    fn test_wants_xml_from_content_type() {
        assert!(RequestContext::new().with_content_type("application/xml").wants_xml());
        assert!(RequestContext::new().with_content_type("application/soap+xml").wants_xml());
        assert!(!RequestContext::new().with_content_type("text/plain").wants_xml());
    }

    #[test]
    fn test_precedence_json_over_xml_over_html() {
        let both = RequestContext::new()
            .with_accept("application/json")
            .with_content_type("text/xml");
        assert_eq!(negotiate(&both, NegotiationStrategy::Accept), Representation::Json);

        let xml = RequestContext::new().with_content_type("text/xml");
        assert_eq!(negotiate(&xml, NegotiationStrategy::Accept), Representation::Xml);

        assert_eq!(
            negotiate(&RequestContext::new(), NegotiationStrategy::Accept),
            Representation::Html
        );
    }

    #[test]
    fn test_ajax_strategy() {
        let ajax = RequestContext::new().with_ajax();
        assert!(NegotiationStrategy::Ajax.wants_json(&ajax));
        assert!(!NegotiationStrategy::Accept.wants_json(&ajax));

        let accept = RequestContext::new().with_accept("application/json");
        assert!(!NegotiationStrategy::Ajax.wants_json(&accept));
    }

    #[test]
    fn test_expects_json() {
        assert!(RequestContext::new().with_ajax().expects_json());
        assert!(
            !RequestContext::new()
                .with_ajax()
                .with_header("x-pjax", "true")
                .expects_json()
        );
        assert!(RequestContext::new().with_accept("application/json").expects_json());
    }

    #[test]
    fn test_strategy_parses_from_config() {
        assert_eq!("ajax".parse::<NegotiationStrategy>().unwrap(), NegotiationStrategy::Ajax);
        assert_eq!("ACCEPT".parse::<NegotiationStrategy>().unwrap(), NegotiationStrategy::Accept);
        assert!("bogus".parse::<NegotiationStrategy>().is_err());
    }
}
