//! Maps a raised exception onto HTTP semantics.

use super::{ExceptionKind, RaisedException};
use crate::common::{RenderedResponse, status_from_code};
use axum::http::{HeaderMap, StatusCode};
use std::sync::Arc;

/// How the exception reads after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalized {
    /// Resource-not-found; always shown as 404 by the plain display.
    NotFound,
    /// Carries HTTP semantics (explicit status, authorization, validation).
    Http,
    /// Flattened from an unclassified error.
    Generic,
}

/// An exception with its HTTP status and headers decided.
#[derive(Debug, Clone)]
pub struct Classified {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub exception: Arc<RaisedException>,
    pub normalized: Normalized,
}

impl Classified {
    pub fn is_not_found(&self) -> bool {
        self.normalized == Normalized::NotFound
    }

    /// True for anything that is not a flattened generic error.
    pub fn is_http(&self) -> bool {
        self.normalized != Normalized::Generic
    }
}

#[derive(Debug, Clone)]
pub enum Classification {
    /// The exception carried its own response; send it unchanged.
    Prebuilt(RenderedResponse),
    Classified(Classified),
}

/// Decide status and headers for `exception`.
pub fn classify(exception: Arc<RaisedException>) -> Classification {
    let (status, headers, normalized) = match exception.kind() {
        ExceptionKind::HttpResponse(response) => {
            return Classification::Prebuilt(response.clone());
        }
        ExceptionKind::ValidationFailed {
            response: Some(response),
        } => {
            return Classification::Prebuilt(response.clone());
        }
        ExceptionKind::ValidationFailed { response: None } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            HeaderMap::new(),
            Normalized::Http,
        ),
        ExceptionKind::NotFound => (StatusCode::NOT_FOUND, HeaderMap::new(), Normalized::NotFound),
        ExceptionKind::AuthorizationDenied => {
            (StatusCode::FORBIDDEN, HeaderMap::new(), Normalized::Http)
        }
        ExceptionKind::Unauthenticated => {
            (StatusCode::UNAUTHORIZED, HeaderMap::new(), Normalized::Http)
        }
        ExceptionKind::Http { status, headers } => (
            status_from_code(status.as_u16()),
            headers.clone(),
            Normalized::Http,
        ),
        ExceptionKind::Generic => (
            StatusCode::INTERNAL_SERVER_ERROR,
            HeaderMap::new(),
            Normalized::Generic,
        ),
    };

    Classification::Classified(Classified {
        status,
        headers,
        exception,
        normalized,
    })
}
