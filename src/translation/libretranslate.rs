use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::provider::{
    error_message, resolve_translation, to_owned_list, LanguageCache, ProviderError,
    TranslationProvider, LANGUAGES_TIMEOUT, PROBE_TIMEOUT, TRANSLATE_TIMEOUT,
};

pub const NAME: &str = "libretranslate";

/// Instances probed, in order, when no URL is configured.
pub const KNOWN_INSTANCES: &[&str] = &[
    "http://localhost:5000",
    "https://libretranslate.com",
    "https://translate.argosopentech.com",
];

const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(3);

const FALLBACK_LANGUAGES: &[&str] = &[
    "en", "es", "fr", "de", "it", "pt", "ru", "ja", "ko", "zh", "ar", "hi", "tr", "pl", "nl",
    "sv", "da", "no", "fi", "el",
];

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LanguageEntry {
    code: String,
}

/// Self-hosted or hosted LibreTranslate instance.
pub struct LibreTranslateProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    languages: LanguageCache,
}

impl LibreTranslateProvider {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
            languages: LanguageCache::default(),
        }
    }

    /// Build a provider, probing [`KNOWN_INSTANCES`] when `base_url` is unset.
    pub async fn connect(
        client: reqwest::Client,
        base_url: Option<&str>,
        api_key: Option<String>,
    ) -> Self {
        let url = match base_url {
            Some(url) => url.to_string(),
            None => discover(&client, KNOWN_INSTANCES).await,
        };
        Self::new(client, &url, api_key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn try_translate(&self, text: &str, from: &str, to: &str) -> Result<String, ProviderError> {
        if !self.is_available().await {
            return Err(ProviderError::Unavailable);
        }
        if !self.supports_language_pair(from, to).await {
            return Err(ProviderError::UnsupportedPair {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let request = TranslateRequest {
            q: text,
            source: from,
            target: to,
            api_key: self.api_key.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/translate", self.base_url))
            .timeout(TRANSLATE_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::http(status, error_message(response).await));
        }

        let body: TranslateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        body.translated_text
            .ok_or_else(|| ProviderError::InvalidResponse("missing translatedText".to_string()))
    }

    async fn fetch_languages(&self) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/languages", self.base_url))
            .timeout(LANGUAGES_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::http(status, error_message(response).await));
        }

        let entries: Vec<LanguageEntry> = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(entries.into_iter().map(|entry| entry.code).collect())
    }
}

#[async_trait]
impl TranslationProvider for LibreTranslateProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn translate(&self, text: &str, from: &str, to: &str) -> String {
        debug!(
            "LibreTranslate: translating '{}' from {} to {} using {}",
            text, from, to, self.base_url
        );
        let outcome = self.try_translate(text, from, to).await;
        resolve_translation("LibreTranslate", &self.base_url, text, from, to, outcome)
    }

    async fn is_available(&self) -> bool {
        probe(&self.client, &self.base_url, PROBE_TIMEOUT).await
    }

    async fn supported_languages(&self) -> Vec<String> {
        if let Some(cached) = self.languages.get() {
            return cached;
        }

        let languages = match self.fetch_languages().await {
            Ok(languages) => languages,
            Err(e) => {
                warn!("LibreTranslate: failed to load languages ({}), using fallback list", e);
                to_owned_list(FALLBACK_LANGUAGES)
            }
        };
        self.languages.set(languages.clone());
        languages
    }

    fn invalidate_cache(&self) {
        self.languages.clear();
    }
}

async fn probe(client: &reqwest::Client, base_url: &str, timeout: Duration) -> bool {
    client
        .get(format!("{}/languages", base_url))
        .timeout(timeout)
        .send()
        .await
        .map(|response| response.status().is_success())
        .unwrap_or(false)
}

/// First candidate whose `/languages` endpoint answers, else the first candidate.
pub async fn discover(client: &reqwest::Client, candidates: &[&str]) -> String {
    for url in candidates {
        if probe(client, url, DISCOVERY_TIMEOUT).await {
            info!("LibreTranslate: auto-detected working service at {}", url);
            return url.to_string();
        }
    }

    let fallback = candidates.first().copied().unwrap_or(KNOWN_INSTANCES[0]);
    warn!("LibreTranslate: no working service found, defaulting to {}", fallback);
    fallback.to_string()
}
