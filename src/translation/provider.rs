use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{error, info, warn};

/// Timeout for a single translate request.
pub const TRANSLATE_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for availability probes.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Timeout for fetching the supported-language list.
pub const LANGUAGES_TIMEOUT: Duration = Duration::from_secs(10);

/// A machine-translation backend.
///
/// `translate` never fails: every problem is logged and the input text is
/// returned unchanged, so a sync run can always continue.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Registry name, e.g. `"libretranslate"`.
    fn name(&self) -> &str;

    async fn translate(&self, text: &str, from: &str, to: &str) -> String;

    /// Whether the backend is configured and reachable right now.
    async fn is_available(&self) -> bool;

    /// Language codes the backend accepts, cached after the first call.
    async fn supported_languages(&self) -> Vec<String>;

    async fn supports_language_pair(&self, from: &str, to: &str) -> bool {
        let languages = self.supported_languages().await;
        languages.iter().any(|l| l == from) && languages.iter().any(|l| l == to)
    }

    /// Drop the cached language list so the next call fetches it again.
    fn invalidate_cache(&self) {}
}

/// Why a translate call fell back to the original text.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("service not available")]
    Unavailable,

    #[error("language pair {from} -> {to} not supported")]
    UnsupportedPair { from: String, to: String },

    #[error("{class} (HTTP {status}): {message}")]
    Http {
        status: StatusCode,
        class: StatusClass,
        message: String,
    },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response structure: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        ProviderError::Http {
            status,
            class: StatusClass::from(status),
            message: message.into(),
        }
    }

    /// Expected, recoverable conditions are logged as warnings.
    fn is_expected(&self) -> bool {
        match self {
            ProviderError::Unavailable | ProviderError::UnsupportedPair { .. } => true,
            ProviderError::Http { class, .. } => {
                matches!(class, StatusClass::BadRequest | StatusClass::RateLimited)
            }
            ProviderError::Network(_) | ProviderError::InvalidResponse(_) => false,
        }
    }
}

/// Coarse classification of a failed HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    BadRequest,
    Unauthorized,
    Forbidden,
    RateLimited,
    ServerError,
    Other,
}

impl From<StatusCode> for StatusClass {
    fn from(status: StatusCode) -> Self {
        match status.as_u16() {
            400 => StatusClass::BadRequest,
            401 => StatusClass::Unauthorized,
            403 => StatusClass::Forbidden,
            429 => StatusClass::RateLimited,
            500..=599 => StatusClass::ServerError,
            _ => StatusClass::Other,
        }
    }
}

impl std::fmt::Display for StatusClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StatusClass::BadRequest => "bad request",
            StatusClass::Unauthorized => "invalid credentials",
            StatusClass::Forbidden => "access denied or quota exceeded",
            StatusClass::RateLimited => "rate limit exceeded",
            StatusClass::ServerError => "server error",
            StatusClass::Other => "API error",
        };
        f.write_str(label)
    }
}

/// Turn the outcome of a translate attempt into the text to use.
pub(crate) fn resolve_translation(
    provider: &str,
    endpoint: &str,
    text: &str,
    from: &str,
    to: &str,
    outcome: Result<String, ProviderError>,
) -> String {
    match outcome {
        Ok(translated) => {
            info!(
                "{}: translated '{}' to '{}' ({} -> {})",
                provider, text, translated, from, to
            );
            translated
        }
        Err(e) if e.is_expected() => {
            warn!(
                "{}: {} ({} -> {}, {}). Returning original text.",
                provider, e, from, to, endpoint
            );
            text.to_string()
        }
        Err(e) => {
            error!(
                "{}: {} ({} -> {}, {}). Returning original text.",
                provider, e, from, to, endpoint
            );
            text.to_string()
        }
    }
}

/// Read an error response body, preferring a JSON `error.message` field.
pub(crate) async fn error_message(response: reqwest::Response) -> String {
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<failed to read body: {}>", e));

    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|json| {
            json.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or(body)
}

/// Cached supported-language list of one provider instance.
#[derive(Debug, Default)]
pub(crate) struct LanguageCache {
    languages: RwLock<Option<Vec<String>>>,
}

impl LanguageCache {
    pub fn get(&self) -> Option<Vec<String>> {
        self.languages
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set(&self, languages: Vec<String>) {
        *self
            .languages
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(languages);
    }

    pub fn clear(&self) {
        *self
            .languages
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

pub(crate) fn to_owned_list(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|code| code.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_class_mapping() {
        assert_eq!(StatusClass::from(StatusCode::BAD_REQUEST), StatusClass::BadRequest);
        assert_eq!(StatusClass::from(StatusCode::UNAUTHORIZED), StatusClass::Unauthorized);
        assert_eq!(StatusClass::from(StatusCode::FORBIDDEN), StatusClass::Forbidden);
        assert_eq!(StatusClass::from(StatusCode::TOO_MANY_REQUESTS), StatusClass::RateLimited);
        assert_eq!(StatusClass::from(StatusCode::BAD_GATEWAY), StatusClass::ServerError);
        assert_eq!(StatusClass::from(StatusCode::NOT_FOUND), StatusClass::Other);
    }

    #[test]
    fn test_http_error_message_includes_class_and_status() {
        let err = ProviderError::http(StatusCode::TOO_MANY_REQUESTS, "slow down");
        let msg = err.to_string();
        assert!(msg.contains("rate limit exceeded"));
        assert!(msg.contains("429"));
        assert!(msg.contains("slow down"));
    }

    #[test]
    fn test_resolve_translation_falls_back_to_original() {
        let result = resolve_translation(
            "test",
            "http://localhost",
            "Hello",
            "en",
            "es",
            Err(ProviderError::Unavailable),
        );
        assert_eq!(result, "Hello");

        let result = resolve_translation(
            "test",
            "http://localhost",
            "Hello",
            "en",
            "es",
            Ok("Hola".to_string()),
        );
        assert_eq!(result, "Hola");
    }

    #[test]
    fn test_language_cache_invalidation() {
        let cache = LanguageCache::default();
        assert!(cache.get().is_none());

        cache.set(vec!["en".to_string()]);
        assert_eq!(cache.get(), Some(vec!["en".to_string()]));

        cache.clear();
        assert!(cache.get().is_none());
    }
}
