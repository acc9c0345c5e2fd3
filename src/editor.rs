//! Entry point for callers that edit translations.
//!
//! [`TranslationEditor`] wires the store, language discovery and sync
//! together. An [`EditSession`] is one user's private buffer over a single
//! file; it is never shared between users.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{EditorError, Result};
use crate::keypath::{self, FlatMap, TranslationEntry};
use crate::languages::{LanguageManager, LanguageSummary, VendorLanguageEntry, VendorPackage};
use crate::storage::{FsStorage, Storage};
use crate::store::FileStore;
use crate::sync::{KeyOperation, Scope, SyncEngine};
use crate::translation::TranslationManager;

/// Outcome of adding or removing a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChange {
    /// Whether the edited file was written.
    pub saved: bool,
    /// Sibling languages updated by sync.
    pub synced: Vec<String>,
}

pub struct TranslationEditor {
    config: Config,
    languages: Arc<LanguageManager>,
    store: Arc<FileStore>,
    sync: SyncEngine,
    translator: Option<Arc<TranslationManager>>,
}

impl TranslationEditor {
    pub fn new(
        config: Config,
        storage: Arc<dyn Storage>,
        translator: Option<Arc<TranslationManager>>,
    ) -> Self {
        let languages = Arc::new(LanguageManager::new(storage.clone(), &config));
        let store = Arc::new(FileStore::new(
            storage,
            languages.paths().clone(),
            config.create_backup,
        ));
        let sync = SyncEngine::new(store.clone(), languages.clone(), translator.clone());

        Self {
            config,
            languages,
            store,
            sync,
            translator,
        }
    }

    /// Editor over the real filesystem with providers built from `config`.
    pub async fn from_config(config: Config) -> Self {
        let translator =
            TranslationManager::from_config(&config.auto_translate, reqwest::Client::new()).await;
        Self::new(config, Arc::new(FsStorage), Some(Arc::new(translator)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn translator(&self) -> Option<&Arc<TranslationManager>> {
        self.translator.as_ref()
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn check_language_path(&self) -> Result<()> {
        self.languages.check_root()
    }

    // ==================== Core files ====================

    pub fn list_languages(&self) -> Vec<String> {
        self.languages.list_languages()
    }

    pub fn language_summaries(&self) -> Vec<LanguageSummary> {
        self.languages.summaries()
    }

    pub fn list_files(&self, language: &str) -> Vec<String> {
        self.languages.list_files(language)
    }

    pub fn read_file(&self, language: &str, filename: &str) -> FlatMap {
        self.store.read(language, filename)
    }

    pub fn save_file(&self, language: &str, filename: &str, translations: &FlatMap) -> bool {
        self.store.write(language, filename, translations)
    }

    /// Add a key to one language file and sync it to the others.
    ///
    /// The new key is placed first in the file.
    pub async fn add_key(
        &self,
        language: &str,
        filename: &str,
        key: &str,
        value: &str,
    ) -> Result<KeyChange> {
        let (key, value) = validate_new_entry(key, value)?;
        let current = self.store.try_read(language, filename)?;
        if keypath::occupied_flat(&current, key) {
            return Err(EditorError::DuplicateKey(key.to_string()));
        }

        let updated = prepend(&current, key, value);
        Ok(self
            .persist(&Scope::Core, language, filename, &updated, key, value, KeyOperation::Add)
            .await)
    }

    /// Remove a key from one language file and from every sibling that has it.
    pub async fn remove_key(&self, language: &str, filename: &str, key: &str) -> Result<KeyChange> {
        let key = key.trim();
        let mut current = self.store.try_read(language, filename)?;
        if current.shift_remove(key).is_none() {
            return Err(EditorError::KeyNotFound(key.to_string()));
        }

        Ok(self
            .persist(&Scope::Core, language, filename, &current, key, "", KeyOperation::Remove)
            .await)
    }

    // ==================== Vendor files ====================

    pub fn vendor_packages(&self) -> Vec<VendorPackage> {
        self.languages.vendor_packages()
    }

    pub fn vendor_languages(&self, package: &str) -> Vec<VendorLanguageEntry> {
        self.languages.vendor_languages(package)
    }

    pub fn vendor_files(&self, package: &str, language: &str) -> Vec<String> {
        self.languages.vendor_files(package, language)
    }

    pub fn read_vendor_file(&self, package: &str, language: &str, filename: &str) -> Result<FlatMap> {
        self.store
            .read_vendor(package, language, filename)
            .map(|tree| keypath::flatten(&tree))
    }

    pub fn save_vendor_file(
        &self,
        package: &str,
        language: &str,
        filename: &str,
        translations: &FlatMap,
    ) -> bool {
        self.store
            .write_vendor(package, language, filename, &keypath::expand(translations))
    }

    pub async fn add_vendor_key(
        &self,
        package: &str,
        language: &str,
        filename: &str,
        key: &str,
        value: &str,
    ) -> Result<KeyChange> {
        let (key, value) = validate_new_entry(key, value)?;
        let current = self.read_vendor_file(package, language, filename)?;
        if keypath::occupied_flat(&current, key) {
            return Err(EditorError::DuplicateKey(key.to_string()));
        }

        let updated = prepend(&current, key, value);
        let scope = Scope::Vendor(package.to_string());
        Ok(self
            .persist(&scope, language, filename, &updated, key, value, KeyOperation::Add)
            .await)
    }

    pub async fn remove_vendor_key(
        &self,
        package: &str,
        language: &str,
        filename: &str,
        key: &str,
    ) -> Result<KeyChange> {
        let key = key.trim();
        let mut current = self.read_vendor_file(package, language, filename)?;
        if current.shift_remove(key).is_none() {
            return Err(EditorError::KeyNotFound(key.to_string()));
        }

        let scope = Scope::Vendor(package.to_string());
        Ok(self
            .persist(&scope, language, filename, &current, key, "", KeyOperation::Remove)
            .await)
    }

    // ==================== Sessions ====================

    /// Fails when the file exists but cannot be decoded.
    pub fn open_session(&self, language: &str, filename: &str) -> Result<EditSession> {
        let translations = self.store.try_read(language, filename)?;
        Ok(EditSession::new(Scope::Core, language, filename, &translations))
    }

    pub fn open_vendor_session(
        &self,
        package: &str,
        language: &str,
        filename: &str,
    ) -> Result<EditSession> {
        let translations = self.read_vendor_file(package, language, filename)?;
        Ok(EditSession::new(
            Scope::Vendor(package.to_string()),
            language,
            filename,
            &translations,
        ))
    }

    /// Write the whole session buffer back to its file.
    pub fn save_session(&self, session: &EditSession) -> bool {
        self.write_scoped(
            session.scope(),
            session.language(),
            session.filename(),
            &session.to_flat_map(),
        )
    }

    /// Add a key to the session; with auto-save on, also persist and sync it.
    pub async fn commit_add(
        &self,
        session: &mut EditSession,
        key: &str,
        value: &str,
    ) -> Result<(EntryId, Option<KeyChange>)> {
        let id = session.add_key(key, value)?;
        if !self.config.auto_save {
            return Ok((id, None));
        }

        let (key, value) = (key.trim(), value.trim());
        let change = self
            .persist(
                session.scope(),
                session.language(),
                session.filename(),
                &session.to_flat_map(),
                key,
                value,
                KeyOperation::Add,
            )
            .await;
        Ok((id, Some(change)))
    }

    /// Remove an entry from the session; with auto-save on, also persist and sync it.
    pub async fn commit_remove(
        &self,
        session: &mut EditSession,
        id: EntryId,
    ) -> Result<Option<KeyChange>> {
        let removed = session
            .remove(id)
            .ok_or_else(|| EditorError::KeyNotFound(id.to_string()))?;
        if !self.config.auto_save {
            return Ok(None);
        }

        let change = self
            .persist(
                session.scope(),
                session.language(),
                session.filename(),
                &session.to_flat_map(),
                &removed.key,
                "",
                KeyOperation::Remove,
            )
            .await;
        Ok(Some(change))
    }

    fn write_scoped(&self, scope: &Scope, language: &str, filename: &str, translations: &FlatMap) -> bool {
        match scope {
            Scope::Core => self.save_file(language, filename, translations),
            Scope::Vendor(package) => self.save_vendor_file(package, language, filename, translations),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn persist(
        &self,
        scope: &Scope,
        language: &str,
        filename: &str,
        translations: &FlatMap,
        key: &str,
        value: &str,
        operation: KeyOperation,
    ) -> KeyChange {
        let saved = self.write_scoped(scope, language, filename, translations);
        if !saved {
            return KeyChange {
                saved,
                synced: Vec::new(),
            };
        }

        let synced = self
            .sync
            .propagate_key_change(scope, language, filename, key, value, operation)
            .await;
        info!(
            "{:?} '{}' in {}/{}; synced to {:?}",
            operation, key, language, filename, synced
        );
        KeyChange { saved, synced }
    }
}

fn validate_new_entry<'a>(key: &'a str, value: &'a str) -> Result<(&'a str, &'a str)> {
    let (key, value) = (key.trim(), value.trim());
    if key.is_empty() || value.is_empty() {
        return Err(EditorError::EmptyKey);
    }
    Ok((key, value))
}

fn prepend(current: &FlatMap, key: &str, value: &str) -> FlatMap {
    let mut updated = FlatMap::with_capacity(current.len() + 1);
    updated.insert(key.to_string(), value.to_string());
    updated.extend(current.iter().map(|(k, v)| (k.clone(), v.clone())));
    updated
}

/// Opaque identifier of an entry inside an [`EditSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(Uuid);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    pub id: EntryId,
    pub key: String,
    pub value: String,
}

/// One user's editing buffer over a single translation file.
#[derive(Debug, Clone)]
pub struct EditSession {
    scope: Scope,
    language: String,
    filename: String,
    entries: Vec<SessionEntry>,
}

impl EditSession {
    pub fn new(scope: Scope, language: &str, filename: &str, translations: &FlatMap) -> Self {
        let entries = translations
            .iter()
            .map(|(key, value)| SessionEntry {
                id: EntryId(Uuid::new_v4()),
                key: key.clone(),
                value: value.clone(),
            })
            .collect();

        Self {
            scope,
            language: language.to_string(),
            filename: filename.to_string(),
            entries,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn entries(&self) -> &[SessionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: EntryId) -> Option<&SessionEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Insert a new entry at the top of the buffer.
    pub fn add_key(&mut self, key: &str, value: &str) -> Result<EntryId> {
        let (key, value) = validate_new_entry(key, value)?;
        if self.entries.iter().any(|entry| entry.key == key) {
            return Err(EditorError::DuplicateKey(key.to_string()));
        }

        let id = EntryId(Uuid::new_v4());
        self.entries.insert(
            0,
            SessionEntry {
                id,
                key: key.to_string(),
                value: value.to_string(),
            },
        );
        Ok(id)
    }

    pub fn remove(&mut self, id: EntryId) -> Option<TranslationEntry> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        let entry = self.entries.remove(index);
        Some(TranslationEntry::new(entry.key, entry.value))
    }

    pub fn update_value(&mut self, id: EntryId, value: &str) -> bool {
        match self.entries.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.value = value.to_string();
                true
            }
            None => false,
        }
    }

    /// Entries whose key or value contains `search`, ignoring case.
    pub fn filter(&self, search: &str) -> Vec<&SessionEntry> {
        let needle = search.to_lowercase();
        self.entries
            .iter()
            .filter(|entry| {
                needle.is_empty()
                    || entry.key.to_lowercase().contains(&needle)
                    || entry.value.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// One page of entries; `page` starts at 1.
    pub fn page(&self, page: usize, per_page: usize) -> &[SessionEntry] {
        if per_page == 0 {
            return &[];
        }
        let start = page.saturating_sub(1).saturating_mul(per_page);
        if start >= self.entries.len() {
            return &[];
        }
        let end = (start + per_page).min(self.entries.len());
        &self.entries[start..end]
    }

    pub fn to_flat_map(&self) -> FlatMap {
        self.entries
            .iter()
            .map(|entry| (entry.key.clone(), entry.value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::JSON_FILE;
    use crate::storage::MemoryStorage;
    use pretty_assertions::assert_eq;

    fn editor_with(storage: Arc<MemoryStorage>, config: Config) -> TranslationEditor {
        TranslationEditor::new(config, storage, None)
    }

    fn sample() -> Arc<MemoryStorage> {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert_file(
            "lang/en/auth.php",
            "<?php return ['failed' => 'Failed', 'password' => 'Bad password'];",
        );
        storage.insert_file("lang/es/auth.php", "<?php return ['failed' => 'Falló'];");
        storage.insert_file("lang/en.json", r#"{"Hello": "Hello"}"#);
        storage
    }

    fn no_backup() -> Config {
        Config {
            create_backup: false,
            ..Config::with_language_path("lang")
        }
    }

    // ==================== Core Editing Tests ====================

    #[tokio::test]
    async fn test_add_key_inserts_first_and_syncs() {
        let storage = sample();
        let editor = editor_with(storage.clone(), no_backup());

        let change = editor.add_key("en", "auth", "throttle", "Too many").await.unwrap();
        assert!(change.saved);
        assert_eq!(change.synced, vec!["es"]);

        let en = editor.read_file("en", "auth");
        assert_eq!(en.keys().next().unwrap(), "throttle");
        assert_eq!(editor.read_file("es", "auth")["throttle"], "Too many");
    }

    #[tokio::test]
    async fn test_add_key_rejects_duplicates_and_empty() {
        let editor = editor_with(sample(), no_backup());

        assert!(matches!(
            editor.add_key("en", "auth", "failed", "x").await,
            Err(EditorError::DuplicateKey(key)) if key == "failed"
        ));
        assert!(matches!(
            editor.add_key("en", "auth", "  ", "x").await,
            Err(EditorError::EmptyKey)
        ));
        assert!(matches!(
            editor.add_key("en", "auth", "new", "").await,
            Err(EditorError::EmptyKey)
        ));
    }

    #[tokio::test]
    async fn test_remove_key() {
        let storage = sample();
        let editor = editor_with(storage.clone(), no_backup());

        let change = editor.remove_key("en", "auth", "failed").await.unwrap();
        assert_eq!(change.synced, vec!["es"]);
        assert!(!editor.read_file("es", "auth").contains_key("failed"));

        assert!(matches!(
            editor.remove_key("en", "auth", "failed").await,
            Err(EditorError::KeyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_edits_refuse_unparseable_file() {
        let storage = sample();
        let source = "<?php return ['failed' => 'Failed', 'eol' => 'End' . PHP_EOL];";
        storage.insert_file("lang/en/auth.php", source);
        let editor = editor_with(storage.clone(), no_backup());

        assert!(matches!(
            editor.add_key("en", "auth", "throttle", "Too many").await,
            Err(EditorError::Parse { .. })
        ));
        assert!(matches!(
            editor.remove_key("en", "auth", "failed").await,
            Err(EditorError::Parse { .. })
        ));
        assert!(editor.open_session("en", "auth").is_err());
        assert_eq!(storage.file("lang/en/auth.php").unwrap(), source);
    }

    #[tokio::test]
    async fn test_remove_key_trims_like_add() {
        let editor = editor_with(sample(), no_backup());

        editor.add_key("en", "auth", " spaced ", "Value").await.unwrap();
        let change = editor.remove_key("en", "auth", " spaced ").await.unwrap();
        assert!(change.saved);
        assert!(!editor.read_file("en", "auth").contains_key("spaced"));
    }

    #[test]
    fn test_list_files() {
        let editor = editor_with(sample(), no_backup());
        assert_eq!(editor.list_languages(), vec!["en", "es"]);
        assert_eq!(editor.list_files("en"), vec!["auth", JSON_FILE]);
    }

    // ==================== Vendor Editing Tests ====================

    #[tokio::test]
    async fn test_vendor_add_and_remove() {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert_file("lang/vendor/pkg/en/ui.php", "<?php return ['ok' => 'OK'];");
        storage.insert_file("lang/vendor/pkg/fr/ui.php", "<?php return ['ok' => 'OK'];");
        let config = Config {
            read_vendor: true,
            ..no_backup()
        };
        let editor = editor_with(storage.clone(), config);

        assert_eq!(editor.vendor_packages()[0].name, "pkg");

        let change = editor
            .add_vendor_key("pkg", "en", "ui", "menu<~>close", "Close")
            .await
            .unwrap();
        assert_eq!(change.synced, vec!["fr"]);
        assert_eq!(
            editor.read_vendor_file("pkg", "fr", "ui").unwrap()["menu<~>close"],
            "Close"
        );

        let change = editor
            .remove_vendor_key("pkg", "en", "ui", "menu<~>close")
            .await
            .unwrap();
        assert_eq!(change.synced, vec!["fr"]);
        assert!(matches!(
            editor.read_vendor_file("pkg", "de", "ui"),
            Err(EditorError::FileNotFound(_))
        ));
    }

    // ==================== Session Tests ====================

    fn session() -> EditSession {
        let map: FlatMap = [("a", "Apple"), ("b", "Banana"), ("c", "Cherry")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EditSession::new(Scope::Core, "en", "fruit", &map)
    }

    #[test]
    fn test_session_add_update_remove() {
        let mut session = session();

        let id = session.add_key("d", "Date").unwrap();
        assert_eq!(session.entries()[0].key, "d");
        assert!(matches!(session.add_key("a", "x"), Err(EditorError::DuplicateKey(_))));

        assert!(session.update_value(id, "Dragonfruit"));
        assert_eq!(session.get(id).unwrap().value, "Dragonfruit");

        let removed = session.remove(id).unwrap();
        assert_eq!(removed, TranslationEntry::new("d", "Dragonfruit"));
        assert!(session.remove(id).is_none());
        assert_eq!(session.len(), 3);
    }

    #[test]
    fn test_session_filter_and_page() {
        let session = session();

        let found: Vec<&str> = session.filter("AN").iter().map(|e| e.key.as_str()).collect();
        assert_eq!(found, vec!["b"]);
        assert_eq!(session.filter("").len(), 3);

        assert_eq!(session.page(1, 2).len(), 2);
        assert_eq!(session.page(2, 2)[0].key, "c");
        assert!(session.page(3, 2).is_empty());
        assert!(session.page(1, 0).is_empty());
    }

    #[test]
    fn test_session_ids_are_unique() {
        let session = session();
        let ids: std::collections::HashSet<EntryId> = session.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn test_commit_respects_auto_save() {
        let storage = sample();
        let manual = editor_with(
            storage.clone(),
            Config {
                auto_save: false,
                ..no_backup()
            },
        );

        let mut session = manual.open_session("en", "auth").unwrap();
        let (_, change) = manual.commit_add(&mut session, "draft", "Draft").await.unwrap();
        assert!(change.is_none());
        assert!(!manual.read_file("en", "auth").contains_key("draft"));
        assert!(manual.save_session(&session));
        assert!(manual.read_file("en", "auth").contains_key("draft"));

        let auto = editor_with(storage, no_backup());
        let mut session = auto.open_session("en", "auth").unwrap();
        let (id, change) = auto.commit_add(&mut session, "live", "Live").await.unwrap();
        assert_eq!(change.unwrap().synced, vec!["es"]);

        let change = auto.commit_remove(&mut session, id).await.unwrap().unwrap();
        assert!(change.saved);
        assert!(!auto.read_file("es", "auth").contains_key("live"));
    }
}
