//! Status code messages.
//!
//! Maps an HTTP status code to a human-readable name and message per locale.

use crate::error::{DisplayError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Namespace locale resources are registered under.
pub const CATALOG_NAMESPACE: &str = "exception-display";

pub const DEFAULT_LOCALE: &str = "en";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub name: String,
    pub message: String,
}

impl StatusMessage {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Lookup of status messages by locale and code.
pub trait MessageCatalog: Send + Sync {
    fn has(&self, locale: &str, code: u16) -> bool;

    fn get(&self, locale: &str, code: u16) -> Option<StatusMessage>;
}

/// Catalog held in memory, seeded with English messages.
///
/// Lookups for a locale that lacks a code fall back to the fallback locale.
///
/// # Example
/// ```
/// use exception_display::catalog::{InMemoryCatalog, MessageCatalog};
///
/// let mut catalog = InMemoryCatalog::default();
/// catalog
///     .load_json("de", r#"{"404": {"name": "Nicht gefunden", "message": "Die Seite existiert nicht."}}"#)
///     .unwrap();
///
/// assert_eq!(catalog.get("de", 404).unwrap().name, "Nicht gefunden");
/// assert_eq!(catalog.get("de", 500).unwrap().name, "Internal Server Error");
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryCatalog {
    locales: HashMap<String, HashMap<u16, StatusMessage>>,
    fallback_locale: String,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        let mut catalog = Self::empty(DEFAULT_LOCALE);
        catalog.extend(DEFAULT_LOCALE, english_messages());
        catalog
    }
}

impl InMemoryCatalog {
    /// A catalog without any messages.
    pub fn empty(fallback_locale: impl Into<String>) -> Self {
        Self {
            locales: HashMap::new(),
            fallback_locale: fallback_locale.into(),
        }
    }

    pub fn insert(&mut self, locale: &str, code: u16, message: StatusMessage) -> &mut Self {
        self.locales
            .entry(locale.to_string())
            .or_default()
            .insert(code, message);
        self
    }

    pub fn extend(
        &mut self,
        locale: &str,
        messages: impl IntoIterator<Item = (u16, StatusMessage)>,
    ) -> &mut Self {
        self.locales
            .entry(locale.to_string())
            .or_default()
            .extend(messages);
        self
    }

    /// Register a locale resource file of the form
    /// `{"404": {"name": "...", "message": "..."}}`.
    pub fn load_json(&mut self, locale: &str, json: &str) -> Result<&mut Self> {
        let raw: HashMap<String, StatusMessage> = serde_json::from_str(json)?;
        let mut messages = Vec::with_capacity(raw.len());
        for (code, message) in raw {
            let code = code
                .trim()
                .parse::<u16>()
                .map_err(|_| DisplayError::catalog(format!("invalid status code key '{code}'")))?;
            messages.push((code, message));
        }
        Ok(self.extend(locale, messages))
    }

    fn lookup(&self, locale: &str, code: u16) -> Option<&StatusMessage> {
        self.locales
            .get(locale)
            .and_then(|messages| messages.get(&code))
            .or_else(|| {
                self.locales
                    .get(&self.fallback_locale)
                    .and_then(|messages| messages.get(&code))
            })
    }
}

impl MessageCatalog for InMemoryCatalog {
    fn has(&self, locale: &str, code: u16) -> bool {
        self.lookup(locale, code).is_some()
    }

    fn get(&self, locale: &str, code: u16) -> Option<StatusMessage> {
        self.lookup(locale, code).cloned()
    }
}

fn english_messages() -> Vec<(u16, StatusMessage)> {
    [
        (400, "Bad Request", "The request could not be understood by the server."),
        (401, "Unauthorized", "You need to sign in to access this page."),
        (403, "Forbidden", "You are not allowed to access this page."),
        (404, "Not Found", "Sorry, the page you are looking for could not be found."),
        (405, "Method Not Allowed", "The request method is not supported for this page."),
        (408, "Request Timeout", "The server timed out waiting for the request."),
        (409, "Conflict", "The request conflicts with the current state of the resource."),
        (410, "Gone", "The page you are looking for is no longer available."),
        (413, "Payload Too Large", "The request is larger than the server is willing to process."),
        (419, "Page Expired", "The page has expired due to inactivity. Please refresh and try again."),
        (422, "Unprocessable Entity", "The submitted data could not be processed."),
        (429, "Too Many Requests", "Too many requests. Please slow down and try again later."),
        (500, "Internal Server Error", "Whoops, looks like something went wrong."),
        (501, "Not Implemented", "The server does not support this functionality."),
        (502, "Bad Gateway", "The server received an invalid response from an upstream server."),
        (503, "Service Unavailable", "Be right back. The service is temporarily unavailable."),
        (504, "Gateway Timeout", "The upstream server did not respond in time."),
    ]
    .into_iter()
    .map(|(code, name, message)| (code, StatusMessage::new(name, message)))
    .collect()
}
