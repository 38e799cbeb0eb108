use crate::catalog::DEFAULT_LOCALE;
use crate::negotiate::NegotiationStrategy;
use dashmap::DashMap;
use std::env;
use std::sync::Arc;

pub const DEBUG: &str = "app.debug";
pub const LOCALE: &str = "app.locale";
pub const ERROR_VIEW: &str = "view.error";
pub const NEGOTIATION: &str = "errors.negotiation";
pub const LOGIN_PATH: &str = "auth.login_path";

pub const DEFAULT_ERROR_VIEW: &str = "errors/error";
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Environment variables read by [`ConfigService::from_env`].
const ENV_KEYS: [(&str, &str); 5] = [
    ("APP_DEBUG", DEBUG),
    ("APP_LOCALE", LOCALE),
    ("ERROR_VIEW", ERROR_VIEW),
    ("ERROR_NEGOTIATION", NEGOTIATION),
    ("AUTH_LOGIN_PATH", LOGIN_PATH),
];

/// Configuration service
///
/// Clones share the same store, so the host can flip a value (say
/// `app.debug`) and every handler sees it on its next invocation.
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the known keys from the process environment.
    pub fn from_env() -> Self {
        let service = Self::default();
        for (var, key) in ENV_KEYS {
            if let Ok(value) = env::var(var) {
                service.set(key, &value);
            }
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// `true`, `1`, `yes` and `on` are truthy; anything else, or a missing
    /// key, is `false`.
    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            )
        })
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    pub fn debug(&self) -> bool {
        self.get_bool(DEBUG)
    }

    pub fn locale(&self) -> String {
        self.get_or(LOCALE, DEFAULT_LOCALE)
    }

    pub fn error_view(&self) -> String {
        self.get_or(ERROR_VIEW, DEFAULT_ERROR_VIEW)
    }

    /// Unknown values fall back to header negotiation.
    pub fn negotiation(&self) -> NegotiationStrategy {
        self.get(NEGOTIATION)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or_default()
    }

    pub fn login_path(&self) -> String {
        self.get_or(LOGIN_PATH, DEFAULT_LOGIN_PATH)
    }
}
