use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use super::google::{self, GoogleTranslateProvider};
use super::libretranslate::{self, LibreTranslateProvider};
use super::microsoft::{self, MicrosoftTranslatorProvider};
use super::provider::TranslationProvider;
use crate::config::AutoTranslateConfig;
use crate::error::{EditorError, Result};

/// Result of translating one text into several languages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchTranslation {
    /// Target language -> translated text
    pub translations: BTreeMap<String, String>,
    /// Target language -> reason it was skipped
    pub errors: BTreeMap<String, String>,
}

/// Snapshot of one registered provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    pub name: String,
    pub available: bool,
    pub supported_languages_count: usize,
    pub is_default: bool,
}

/// Registry of translation providers with default-provider selection.
pub struct TranslationManager {
    enabled: bool,
    default_name: String,
    providers: IndexMap<String, Arc<dyn TranslationProvider>>,
    resolved_default: Mutex<Option<String>>,
}

impl TranslationManager {
    /// Empty registry; providers are added with [`register_provider`](Self::register_provider).
    pub fn new(config: &AutoTranslateConfig) -> Self {
        Self {
            enabled: config.enabled,
            default_name: config.provider.clone(),
            providers: IndexMap::new(),
            resolved_default: Mutex::new(None),
        }
    }

    /// Registry with every provider that has settings in `config`.
    ///
    /// A LibreTranslate provider without a URL probes the well-known
    /// public instances first. With auto-translation disabled nothing is
    /// registered and no network calls are made.
    pub async fn from_config(config: &AutoTranslateConfig, client: reqwest::Client) -> Self {
        let mut manager = Self::new(config);
        if !config.enabled {
            debug!("Auto-translation disabled, no providers registered");
            return manager;
        }

        if let Some(settings) = &config.libretranslate {
            let provider = LibreTranslateProvider::connect(
                client.clone(),
                settings.url.as_deref(),
                settings.api_key.clone(),
            )
            .await;
            manager.register_provider(libretranslate::NAME, Arc::new(provider));
        }

        if let Some(settings) = &config.microsoft {
            let provider = MicrosoftTranslatorProvider::new(client.clone(), settings);
            manager.register_provider(microsoft::NAME, Arc::new(provider));
        }

        if let Some(settings) = &config.google {
            let provider = GoogleTranslateProvider::new(client, settings);
            manager.register_provider(google::NAME, Arc::new(provider));
        }

        info!(
            "Registered translation providers: {:?}",
            manager.providers.keys().collect::<Vec<_>>()
        );
        manager
    }

    fn resolved(&self) -> MutexGuard<'_, Option<String>> {
        self.resolved_default
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add or replace a provider. Clears the cached default.
    pub fn register_provider(&mut self, name: impl Into<String>, provider: Arc<dyn TranslationProvider>) {
        self.providers.insert(name.into(), provider);
        self.refresh_default_provider();
    }

    pub fn provider(&self, name: &str) -> Option<Arc<dyn TranslationProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    /// The configured provider if available, else the first available one.
    ///
    /// The choice is remembered until [`refresh_default_provider`](Self::refresh_default_provider).
    pub async fn default_provider(&self) -> Option<Arc<dyn TranslationProvider>> {
        let cached = self.resolved().clone();
        if let Some(name) = cached {
            if let Some(provider) = self.provider(&name) {
                return Some(provider);
            }
        }

        let configured = self
            .providers
            .get_key_value(self.default_name.as_str())
            .map(|(name, provider)| (name.clone(), provider.clone()));
        if let Some((name, provider)) = configured {
            if provider.is_available().await {
                debug!("Using configured translation provider {}", name);
                *self.resolved() = Some(name);
                return Some(provider);
            }
            warn!("Configured translation provider {} is not available", name);
        }

        for (name, provider) in &self.providers {
            if provider.is_available().await {
                info!("Falling back to translation provider {}", name);
                *self.resolved() = Some(name.clone());
                return Some(provider.clone());
            }
        }

        None
    }

    pub fn refresh_default_provider(&self) {
        *self.resolved() = None;
    }

    /// Translate with the default provider.
    pub async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String> {
        let provider = self
            .default_provider()
            .await
            .ok_or(EditorError::NoProviderAvailable)?;
        Ok(provider.translate(text, from, to).await)
    }

    /// Translate with a named provider, which must be registered and available.
    pub async fn translate_with(&self, name: &str, text: &str, from: &str, to: &str) -> Result<String> {
        let provider = self
            .provider(name)
            .ok_or_else(|| EditorError::ProviderNotFound(name.to_string()))?;
        if !provider.is_available().await {
            return Err(EditorError::ProviderUnavailable(name.to_string()));
        }
        Ok(provider.translate(text, from, to).await)
    }

    /// Translate `text` into every target independently.
    ///
    /// Targets the default provider cannot handle are reported in `errors`.
    pub async fn translate_to_multiple(
        &self,
        text: &str,
        from: &str,
        targets: &[String],
    ) -> Result<BatchTranslation> {
        let provider = self
            .default_provider()
            .await
            .ok_or(EditorError::NoProviderAvailable)?;

        let mut batch = BatchTranslation::default();
        for to in targets {
            if provider.supports_language_pair(from, to).await {
                let translated = provider.translate(text, from, to).await;
                batch.translations.insert(to.clone(), translated);
            } else {
                batch
                    .errors
                    .insert(to.clone(), format!("Language pair {} -> {} not supported", from, to));
            }
        }
        Ok(batch)
    }

    /// Feature flag is on and some provider can serve requests.
    pub async fn is_auto_translation_enabled(&self) -> bool {
        self.enabled && self.default_provider().await.is_some()
    }

    pub async fn supported_languages(&self) -> Vec<String> {
        match self.default_provider().await {
            Some(provider) => provider.supported_languages().await,
            None => Vec::new(),
        }
    }

    pub async fn supports_language_pair(&self, from: &str, to: &str) -> bool {
        match self.default_provider().await {
            Some(provider) => provider.supports_language_pair(from, to).await,
            None => false,
        }
    }

    pub async fn providers_status(&self) -> Vec<ProviderStatus> {
        let mut statuses = Vec::with_capacity(self.providers.len());
        for (name, provider) in &self.providers {
            statuses.push(ProviderStatus {
                name: provider.name().to_string(),
                available: provider.is_available().await,
                supported_languages_count: provider.supported_languages().await.len(),
                is_default: *name == self.default_name,
            });
        }
        statuses
    }

    /// Names of the providers that are available right now.
    pub async fn available_providers(&self) -> Vec<String> {
        let mut available = Vec::new();
        for (name, provider) in &self.providers {
            if provider.is_available().await {
                available.push(name.clone());
            }
        }
        available
    }
}
