use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::provider::{
    error_message, resolve_translation, to_owned_list, LanguageCache, ProviderError,
    TranslationProvider, LANGUAGES_TIMEOUT, PROBE_TIMEOUT, TRANSLATE_TIMEOUT,
};
use crate::config::GoogleSettings;

pub const NAME: &str = "google";

const FALLBACK_LANGUAGES: &[&str] = &[
    "en", "es", "fr", "de", "it", "pt", "ru", "ja", "ko", "zh", "zh-cn", "zh-tw", "ar", "hi",
    "tr", "pl", "nl", "sv", "da", "no", "fi", "el", "he", "th", "vi", "uk", "cs", "sk", "ro",
    "bg", "hr", "sl", "et", "lv", "lt", "hu", "mt", "ga", "cy", "eu", "ca", "gl", "is", "mk",
    "sq", "az", "be", "bn", "bs", "fa", "fil", "fj", "gu", "ht", "id", "kk", "km", "kn", "ky",
    "lo", "mg", "ml", "mr", "ms", "my", "ne", "or", "ps", "pa", "sm", "si", "so", "sw", "ta",
    "te", "to", "ty", "ur", "uz", "zu", "af", "am", "co", "eo", "fy", "gd", "haw", "hmn", "ig",
    "jw", "ku", "la", "lb", "mi", "mn", "ny", "sd", "sn", "st", "su", "tg", "tl", "xh", "yi",
    "yo",
];

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TranslationsData {
    #[serde(default)]
    translations: Vec<TranslatedText>,
}

#[derive(Debug, Deserialize)]
struct TranslatedText {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

#[derive(Debug, Deserialize)]
struct LanguagesData {
    #[serde(default)]
    languages: Vec<LanguageEntry>,
}

#[derive(Debug, Deserialize)]
struct LanguageEntry {
    language: String,
}

/// Google Cloud Translation (Basic, v2) authenticated with an API key.
pub struct GoogleTranslateProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
    languages: LanguageCache,
}

impl GoogleTranslateProvider {
    pub fn new(client: reqwest::Client, settings: &GoogleSettings) -> Self {
        Self {
            client,
            api_key: settings.api_key.clone().filter(|key| !key.is_empty()),
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            languages: LanguageCache::default(),
        }
    }

    fn languages_request(&self, api_key: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}/language/translate/v2/languages", self.endpoint))
            .query(&[("key", api_key)])
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

        let request = TranslateRequest {
            q: text,
            source: from,
            target: to,
            format: "text",
        };

        let response = self
            .client
            .post(format!("{}/language/translate/v2", self.endpoint))
            .query(&[("key", api_key)])
            .timeout(TRANSLATE_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::http(status, error_message(response).await));
        }

        let body: Envelope<TranslationsData> = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        body.data
            .and_then(|data| data.translations.into_iter().next())
            .map(|translated| decode_html_entities(&translated.translated_text))
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

        let body: Envelope<LanguagesData> = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(body
            .data
            .map(|data| data.languages.into_iter().map(|l| l.language).collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl TranslationProvider for GoogleTranslateProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn translate(&self, text: &str, from: &str, to: &str) -> String {
        debug!(
            "Google Translate: translating '{}' from {} to {} using {}",
            text, from, to, self.endpoint
        );
        let outcome = self.try_translate(text, from, to).await;
        resolve_translation("Google Translate", &self.endpoint, text, from, to, outcome)
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
                warn!("Google Translate: failed to load languages ({}), using fallback list", e);
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

/// Decode the HTML entities Google leaves in translated text.
///
/// Handles the named entities that occur in practice plus decimal and
/// hexadecimal numeric references. Unknown entities are kept verbatim.
pub fn decode_html_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];

        let decoded = candidate
            .find(';')
            .filter(|end| *end <= 10)
            .and_then(|end| decode_entity(&candidate[1..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &candidate[end + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    if let Some(number) = entity.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }

    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}
