use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::provider::{
    error_message, resolve_translation, to_owned_list, LanguageCache, ProviderError,
    TranslationProvider, LANGUAGES_TIMEOUT, PROBE_TIMEOUT, TRANSLATE_TIMEOUT,
};
use crate::config::MicrosoftSettings;

pub const NAME: &str = "microsoft";

const API_VERSION: &str = "3.0";

const FALLBACK_LANGUAGES: &[&str] = &[
    "en", "es", "fr", "de", "it", "pt", "ru", "ja", "ko", "zh-hans", "zh-hant", "ar", "hi", "tr",
    "pl", "nl", "sv", "da", "no", "fi", "el", "he", "th", "vi", "uk", "cs", "sk", "ro", "bg",
    "hr", "sl", "et", "lv", "lt", "hu", "mt", "ga", "cy", "eu", "ca", "gl", "is", "mk", "sq",
    "az", "be", "bn", "bs", "fa", "fil", "fj", "gu", "ht", "id", "kk", "km", "kn", "ky", "lo",
    "mg", "ml", "mr", "ms", "my", "ne", "or", "ps", "pa", "sm", "si", "so", "sw", "ta", "te",
    "to", "ty", "ur", "uz", "zu",
];

#[derive(Debug, Serialize)]
struct TextItem<'a> {
    #[serde(rename = "Text")]
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateItem {
    translations: Vec<TranslatedText>,
}

#[derive(Debug, Deserialize)]
struct TranslatedText {
    text: String,
}

#[derive(Debug, Deserialize)]
struct LanguagesResponse {
    #[serde(default)]
    translation: BTreeMap<String, serde_json::Value>,
}

/// Azure Cognitive Services Translator (API v3).
pub struct MicrosoftTranslatorProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    region: String,
    endpoint: String,
    languages: LanguageCache,
}

impl MicrosoftTranslatorProvider {
    pub fn new(client: reqwest::Client, settings: &MicrosoftSettings) -> Self {
        Self {
            client,
            api_key: settings.api_key.clone().filter(|key| !key.is_empty()),
            region: settings.region.clone(),
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            languages: LanguageCache::default(),
        }
    }

    fn languages_request(&self, api_key: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}/languages", self.endpoint))
            .query(&[("api-version", API_VERSION), ("scope", "translation")])
            .header("Ocp-Apim-Subscription-Key", api_key)
            .header("Ocp-Apim-Subscription-Region", &self.region)
    }

    async fn try_translate(&self, text: &str, from: &str, to: &str) -> Result<String, ProviderError> {
        if !self.is_available().await {
            return Err(ProviderError::Unavailable);
        }
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ProviderError::Unavailable);
        };
        if !self.supports_language_pair(from, to).await {
            return Err(ProviderError::UnsupportedPair {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let response = self
            .client
            .post(format!("{}/translate", self.endpoint))
            .query(&[("api-version", API_VERSION), ("from", from), ("to", to)])
            .header("Ocp-Apim-Subscription-Key", api_key)
            .header("Ocp-Apim-Subscription-Region", &self.region)
            .timeout(TRANSLATE_TIMEOUT)
            .json(&[TextItem { text }])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::http(status, error_message(response).await));
        }

        let items: Vec<TranslateItem> = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        items
            .into_iter()
            .next()
            .and_then(|item| item.translations.into_iter().next())
            .map(|translated| translated.text)
            .ok_or_else(|| ProviderError::InvalidResponse("no translations returned".to_string()))
    }

    async fn fetch_languages(&self) -> Result<Vec<String>, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::Unavailable)?;
        let response = self
            .languages_request(api_key)
            .timeout(LANGUAGES_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::http(status, error_message(response).await));
        }

        let body: LanguagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(body.translation.into_keys().collect())
    }
}

#[async_trait]
impl TranslationProvider for MicrosoftTranslatorProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn translate(&self, text: &str, from: &str, to: &str) -> String {
        debug!("Microsoft Translator: translating '{}' from {} to {}", text, from, to);
        let outcome = self.try_translate(text, from, to).await;
        resolve_translation("Microsoft Translator", &self.endpoint, text, from, to, outcome)
    }

    async fn is_available(&self) -> bool {
        let Some(api_key) = self.api_key.as_deref() else {
            return false;
        };

        self.languages_request(api_key)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    async fn supported_languages(&self) -> Vec<String> {
        if let Some(cached) = self.languages.get() {
            return cached;
        }

        let languages = match self.fetch_languages().await {
            Ok(languages) => languages,
            Err(e) => {
                warn!("Microsoft Translator: failed to load languages ({}), using fallback list", e);
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
