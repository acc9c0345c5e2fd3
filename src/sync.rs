//! Cross-language key synchronization.
//!
//! After a key is added to or removed from one language, the same change is
//! applied to every sibling language of the same file. Additions never
//! overwrite a value a sibling already has; removals only touch siblings that
//! hold the key.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::keypath;
use crate::languages::LanguageManager;
use crate::store::FileStore;
use crate::translation::TranslationManager;

/// Which file tree a change belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Core,
    Vendor(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOperation {
    Add,
    Remove,
}

pub struct SyncEngine {
    store: Arc<FileStore>,
    languages: Arc<LanguageManager>,
    translator: Option<Arc<TranslationManager>>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<FileStore>,
        languages: Arc<LanguageManager>,
        translator: Option<Arc<TranslationManager>>,
    ) -> Self {
        Self {
            store,
            languages,
            translator,
        }
    }

    /// Apply `operation` on `key` to every language except `source_language`.
    ///
    /// Returns the languages whose file was written. Languages that fail to
    /// read or write are skipped.
    pub async fn propagate_key_change(
        &self,
        scope: &Scope,
        source_language: &str,
        filename: &str,
        key: &str,
        value: &str,
        operation: KeyOperation,
    ) -> Vec<String> {
        let targets: Vec<String> = self
            .languages_for(scope)
            .into_iter()
            .filter(|language| language != source_language)
            .collect();
        if targets.is_empty() {
            return Vec::new();
        }

        let translations = match operation {
            KeyOperation::Add => self.auto_translate(scope, value, source_language, &targets).await,
            KeyOperation::Remove => BTreeMap::new(),
        };

        let mut synced = Vec::new();
        for language in &targets {
            let value = translations.get(language).map(String::as_str).unwrap_or(value);
            let written = match scope {
                Scope::Core => self.apply_core(language, filename, key, value, operation),
                Scope::Vendor(package) => {
                    self.apply_vendor(package, language, filename, key, value, operation)
                }
            };
            if written {
                synced.push(language.clone());
            }
        }

        info!(
            "Synced {:?} of '{}' in {} to {} language(s): {:?}",
            operation,
            key,
            filename,
            synced.len(),
            synced
        );
        synced
    }

    fn languages_for(&self, scope: &Scope) -> Vec<String> {
        match scope {
            Scope::Core => self.languages.list_languages(),
            Scope::Vendor(package) => self.languages.vendor_language_codes(package),
        }
    }

    async fn auto_translate(
        &self,
        scope: &Scope,
        text: &str,
        from: &str,
        targets: &[String],
    ) -> BTreeMap<String, String> {
        let Some(translator) = &self.translator else {
            return BTreeMap::new();
        };
        if !translator.is_auto_translation_enabled().await {
            return BTreeMap::new();
        }

        let label = match scope {
            Scope::Core => "Auto-translation",
            Scope::Vendor(_) => "Vendor auto-translation",
        };

        match translator.translate_to_multiple(text, from, targets).await {
            Ok(batch) => {
                for (language, reason) in &batch.errors {
                    warn!("{} failed for {}: {}", label, language, reason);
                }
                batch.translations
            }
            Err(e) => {
                warn!("{} service failed: {}", label, e);
                BTreeMap::new()
            }
        }
    }

    fn apply_core(
        &self,
        language: &str,
        filename: &str,
        key: &str,
        value: &str,
        operation: KeyOperation,
    ) -> bool {
        let mut translations = match self.store.try_read(language, filename) {
            Ok(translations) => translations,
            Err(e) => {
                warn!("Skipping {} for sync: {}", language, e);
                return false;
            }
        };

        match operation {
            KeyOperation::Add => {
                if keypath::occupied_flat(&translations, key) {
                    debug!("{} already has '{}', leaving it untouched", language, key);
                    return false;
                }
                translations.insert(key.to_string(), value.to_string());
            }
            KeyOperation::Remove => {
                if translations.shift_remove(key).is_none() {
                    return false;
                }
            }
        }

        self.store.write(language, filename, &translations)
    }

    fn apply_vendor(
        &self,
        package: &str,
        language: &str,
        filename: &str,
        key: &str,
        value: &str,
        operation: KeyOperation,
    ) -> bool {
        let mut tree = match self.store.read_vendor(package, language, filename) {
            Ok(tree) => tree,
            Err(e) => {
                debug!("Skipping {} for vendor sync: {}", language, e);
                return false;
            }
        };

        match operation {
            KeyOperation::Add => {
                if keypath::occupied(&tree, key) {
                    debug!("{} already has '{}', leaving it untouched", language, key);
                    return false;
                }
                keypath::set(&mut tree, key, value);
            }
            KeyOperation::Remove => {
                if !keypath::has_leaf(&tree, key) {
                    return false;
                }
                keypath::forget_and_prune(&mut tree, key);
            }
        }

        self.store.write_vendor(package, language, filename, &tree)
    }
}
