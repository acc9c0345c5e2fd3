//! Reading and writing translation files.
//!
//! Core files degrade: a missing or malformed file reads as an empty map and
//! a failed write returns `false`. Vendor files surface errors instead, since
//! they are edited one package at a time and a silent empty read would wipe
//! the file on the next save.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{EditorError, Result};
use crate::keypath::{self, FlatMap, Node, Tree};
use crate::paths::{self, LanguagePaths};
use crate::php::{self, PhpError};
use crate::storage::Storage;

const JSON_INDENT: &[u8] = b"    ";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

pub struct FileStore {
    storage: Arc<dyn Storage>,
    paths: LanguagePaths,
    create_backup: bool,
}

impl FileStore {
    pub fn new(storage: Arc<dyn Storage>, paths: LanguagePaths, create_backup: bool) -> Self {
        Self {
            storage,
            paths,
            create_backup,
        }
    }

    pub fn paths(&self) -> &LanguagePaths {
        &self.paths
    }

    /// Read one core file as a flat map.
    ///
    /// `filename` is a PHP file name (with or without `.php`) or
    /// [`paths::JSON_FILE`]. Missing and malformed files read as empty.
    pub fn read(&self, language: &str, filename: &str) -> FlatMap {
        match self.try_read(language, filename) {
            Ok(translations) => translations,
            Err(e) => {
                warn!("Ignoring malformed translation file: {}", e);
                FlatMap::new()
            }
        }
    }

    /// Read one core file for editing.
    ///
    /// A missing file is empty. A file that exists but cannot be read or
    /// decoded is an error, so callers never write over it.
    pub fn try_read(&self, language: &str, filename: &str) -> Result<FlatMap> {
        let path = self.paths.file(language, filename);
        if !self.storage.exists(&path) {
            debug!("Translation file {} does not exist, reading as empty", path.display());
            return Ok(FlatMap::new());
        }

        let source = self
            .storage
            .read_to_string(&path)
            .map_err(|e| EditorError::io(&path, e))?;

        let tree = if paths::is_json_filename(filename) {
            decode_json(&path, &source)?
        } else {
            decode_php(&path, &source)?
        };

        let problems = keypath::validate_structure(&tree);
        if !problems.is_empty() {
            warn!("Structural problems in {}: {:?}", path.display(), problems);
        }
        Ok(keypath::flatten(&tree))
    }

    /// Write one core file from a flat map.
    ///
    /// Returns `false` when the file could not be written.
    pub fn write(&self, language: &str, filename: &str, translations: &FlatMap) -> bool {
        let path = self.paths.file(language, filename);
        let tree = keypath::expand(translations);

        let survived = keypath::flatten(&tree);
        let lost: Vec<&String> = translations
            .keys()
            .filter(|key| !survived.contains_key(*key))
            .collect();
        if !lost.is_empty() {
            warn!(
                "Keys in {} collide with nested groups and were dropped: {:?}",
                path.display(),
                lost
            );
        }

        let contents = if paths::is_json_filename(filename) {
            match encode_json(&tree) {
                Ok(contents) => contents,
                Err(e) => {
                    error!("Failed to encode {}: {}", path.display(), e);
                    return false;
                }
            }
        } else {
            php::render(&tree)
        };

        if self.create_backup {
            self.backup(&path, language, filename);
        }

        // The language directory must already exist
        match self.put(&path, &contents, false) {
            Ok(()) => {
                info!("Saved {} keys to {}", translations.len(), path.display());
                true
            }
            Err(e) => {
                error!("Failed to write translation file: {}", e);
                false
            }
        }
    }

    /// Read a vendor package file as a nested tree.
    pub fn read_vendor(&self, package: &str, language: &str, filename: &str) -> Result<Tree> {
        let path = self.paths.vendor_file(package, language, filename);
        if !self.storage.exists(&path) {
            return Err(EditorError::FileNotFound(path));
        }

        let source = self
            .storage
            .read_to_string(&path)
            .map_err(|e| EditorError::io(&path, e))?;
        decode_php(&path, &source)
    }

    pub fn write_vendor(&self, package: &str, language: &str, filename: &str, tree: &Tree) -> bool {
        let path = self.paths.vendor_file(package, language, filename);
        match self.put(&path, &php::render(tree), true) {
            Ok(()) => {
                info!("Saved vendor file {}", path.display());
                true
            }
            Err(e) => {
                error!("Failed to write vendor translation file: {}", e);
                false
            }
        }
    }

    /// Delete backups last modified more than `days_to_keep` days ago.
    ///
    /// Returns how many files were removed.
    pub fn prune_backups(&self, days_to_keep: u64) -> usize {
        let dir = self.paths.backup_dir();
        let Ok(files) = self.storage.list_files(dir) else {
            return 0;
        };

        let cutoff = SystemTime::now()
            .checked_sub(Duration::from_secs(days_to_keep.saturating_mul(24 * 60 * 60)))
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut removed = 0;
        for file in files {
            let expired = self
                .storage
                .modified(&file)
                .map(|modified| modified < cutoff)
                .unwrap_or(false);
            if !expired {
                continue;
            }
            match self.storage.remove_file(&file) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to delete backup {}: {}", file.display(), e),
            }
        }

        info!("Pruned {} backups older than {} days", removed, days_to_keep);
        removed
    }

    fn put(&self, path: &Path, contents: &str, create_parents: bool) -> Result<()> {
        if let Some(parent) = path.parent().filter(|_| create_parents) {
            if !self.storage.is_dir(parent) {
                self.storage
                    .create_dir_all(parent)
                    .map_err(|e| EditorError::io(parent, e))?;
            }
        }
        self.storage
            .write(path, contents)
            .map_err(|e| EditorError::io(path, e))
    }

    fn backup(&self, path: &Path, language: &str, filename: &str) {
        if !self.storage.exists(path) {
            return;
        }

        let timestamp = chrono::Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let target = self.paths.backup_file(language, filename, &timestamp);

        let result = self
            .storage
            .create_dir_all(self.paths.backup_dir())
            .and_then(|_| self.storage.copy(path, &target));
        match result {
            Ok(()) => debug!("Backed up {} to {}", path.display(), target.display()),
            Err(e) => warn!("Failed to back up {}: {}", path.display(), e),
        }
    }
}

fn decode_php(path: &Path, source: &str) -> Result<Tree> {
    php::parse(source).map_err(|e| match e {
        PhpError::NotAnArray => EditorError::NotAnArray(path.to_path_buf()),
        PhpError::InvalidValue { key, found } => EditorError::InvalidValue {
            key,
            found: found.to_string(),
        },
        syntax @ PhpError::Syntax { .. } => EditorError::Parse {
            path: path.to_path_buf(),
            message: syntax.to_string(),
        },
    })
}

fn decode_json(path: &Path, source: &str) -> Result<Tree> {
    if source.trim().is_empty() {
        return Ok(Tree::new());
    }

    let value: Value = serde_json::from_str(source).map_err(|e| EditorError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    match value {
        Value::Object(_) | Value::Array(_) => json_to_tree(&value, ""),
        _ => Err(EditorError::NotAnArray(path.to_path_buf())),
    }
}

fn json_to_tree(value: &Value, prefix: &str) -> Result<Tree> {
    let entries: Vec<(String, &Value)> = match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    };

    let mut tree = Tree::new();
    for (key, child) in entries {
        let path = keypath::join(prefix, &key);
        let node = match child {
            Value::String(text) => Node::Leaf(text.clone()),
            Value::Object(_) | Value::Array(_) => Node::Branch(json_to_tree(child, &path)?),
            other => {
                return Err(EditorError::InvalidValue {
                    key: path,
                    found: json_type_name(other).to_string(),
                })
            }
        };
        tree.insert(key, node);
    }
    Ok(tree)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Pretty JSON with 4-space indentation, literal Unicode and a trailing newline.
fn encode_json(tree: &Tree) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(JSON_INDENT));
    tree.serialize(&mut serializer)?;

    let mut out = String::from_utf8_lossy(&buf).into_owned();
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::JSON_FILE;
    use crate::storage::{FsStorage, MemoryStorage};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn flat(pairs: &[(&str, &str)]) -> FlatMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn memory_store(backup: bool) -> (Arc<MemoryStorage>, FileStore) {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert_dir("lang");
        let store = FileStore::new(
            storage.clone(),
            LanguagePaths::new("lang", "backups"),
            backup,
        );
        (storage, store)
    }

    // ==================== Read Tests ====================

    #[test]
    fn test_read_missing_file_is_empty() {
        let (_, store) = memory_store(false);
        assert!(store.read("es", "auth").is_empty());
        assert!(store.read("es", JSON_FILE).is_empty());
    }

    #[test]
    fn test_read_php_flattens() {
        let (storage, store) = memory_store(false);
        storage.insert_file(
            "lang/en/auth.php",
            "<?php\n\nreturn [\n    'failed' => 'Nope',\n    'throttle' => ['short' => 'Slow down'],\n];\n",
        );

        assert_eq!(
            store.read("en", "auth.php"),
            flat(&[("failed", "Nope"), ("throttle<~>short", "Slow down")])
        );
    }

    #[test]
    fn test_read_json_keeps_order() {
        let (storage, store) = memory_store(false);
        storage.insert_file("lang/es.json", r#"{"Zebra": "Cebra", "Apple": "Manzana"}"#);

        let map = store.read("es", JSON_FILE);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["Zebra", "Apple"]);
    }

    #[test]
    fn test_read_malformed_files_are_empty() {
        let (storage, store) = memory_store(false);
        storage.insert_file("lang/es.json", "{not json");
        storage.insert_file("lang/es/auth.php", "<?php return 'nope';");
        storage.insert_file("lang/es/extra.php", "<?php return ['count' => 3];");

        assert!(store.read("es", JSON_FILE).is_empty());
        assert!(store.read("es", "auth").is_empty());
        assert!(store.read("es", "extra").is_empty());
    }

    #[test]
    fn test_try_read_separates_missing_from_malformed() {
        let (storage, store) = memory_store(false);
        storage.insert_file("lang/es.json", "{not json");
        storage.insert_file("lang/es/auth.php", "<?php return ['eol' => 'End' . PHP_EOL];");

        assert!(store.try_read("fr", "auth").unwrap().is_empty());
        assert!(matches!(
            store.try_read("es", JSON_FILE),
            Err(EditorError::Parse { .. })
        ));
        assert!(matches!(
            store.try_read("es", "auth"),
            Err(EditorError::Parse { .. })
        ));
    }

    #[test]
    fn test_decode_json_rejects_non_string_leaves() {
        let err = decode_json(Path::new("es.json"), r#"{"a": {"b": 1}}"#).unwrap_err();
        match err {
            EditorError::InvalidValue { key, found } => {
                assert_eq!(key, "a<~>b");
                assert_eq!(found, "number");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        assert!(matches!(
            decode_json(Path::new("es.json"), "\"text\""),
            Err(EditorError::NotAnArray(_))
        ));
    }

    // ==================== Write Tests ====================

    #[test]
    fn test_write_json_format() {
        let (storage, store) = memory_store(false);
        let map = flat(&[("Welcome", "Bienvenido"), ("menu<~>home", "Inicio ñ")]);

        assert!(store.write("es", JSON_FILE, &map));
        assert_eq!(
            storage.file("lang/es.json").unwrap(),
            "{\n    \"Welcome\": \"Bienvenido\",\n    \"menu\": {\n        \"home\": \"Inicio ñ\"\n    }\n}\n"
        );
    }

    #[test]
    fn test_write_php_needs_language_dir() {
        let (storage, store) = memory_store(false);
        let map = flat(&[("failed", "It's wrong")]);

        assert!(!store.write("de", "auth", &map));
        assert!(!storage.exists(Path::new("lang/de")));

        storage.insert_dir("lang/de");
        assert!(store.write("de", "auth", &map));
        assert_eq!(
            storage.file("lang/de/auth.php").unwrap(),
            "<?php\n\nreturn [\n    'failed' => 'It\\'s wrong',\n];\n"
        );
    }

    #[test]
    fn test_write_failure_returns_false() {
        let (storage, store) = memory_store(false);
        storage.insert_dir("lang/es");
        storage.set_read_only(true);

        assert!(!store.write("es", "auth", &flat(&[("a", "b")])));
    }

    #[test]
    fn test_write_then_read_matches() {
        let (storage, store) = memory_store(false);
        storage.insert_dir("lang/es");
        let map = flat(&[
            ("auth<~>failed", "Failed"),
            ("auth<~>throttle", "Slow"),
            ("title", "Título"),
        ]);

        assert!(store.write("es", "messages", &map));
        assert_eq!(store.read("es", "messages"), map);
    }

    // ==================== Backup Tests ====================

    #[test]
    fn test_write_backs_up_existing_file() {
        let (storage, store) = memory_store(true);
        storage.insert_file("lang/es.json", "{\"old\": \"value\"}");

        assert!(store.write("es", JSON_FILE, &flat(&[("new", "value")])));

        let backups = storage.list_files(Path::new("backups")).unwrap();
        assert_eq!(backups.len(), 1);
        let name = backups[0].file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("es_"));
        assert!(name.ends_with(".json"));
        assert_eq!(storage.file(&backups[0]).unwrap(), "{\"old\": \"value\"}");
    }

    #[test]
    fn test_no_backup_for_new_file() {
        let (storage, store) = memory_store(true);
        assert!(store.write("es", JSON_FILE, &flat(&[("new", "value")])));
        assert!(!storage.exists(Path::new("backups")));
    }

    #[test]
    fn test_prune_backups_removes_only_old_files() {
        let (storage, store) = memory_store(true);
        storage.insert_file("backups/es_old.json", "{}");
        storage.insert_file("backups/es_new.json", "{}");
        storage.set_modified(
            "backups/es_old.json",
            SystemTime::now() - Duration::from_secs(40 * 24 * 60 * 60),
        );

        assert_eq!(store.prune_backups(30), 1);
        assert!(storage.file("backups/es_old.json").is_none());
        assert!(storage.file("backups/es_new.json").is_some());
    }

    #[test]
    fn test_prune_backups_missing_dir() {
        let (_, store) = memory_store(true);
        assert_eq!(store.prune_backups(30), 0);
    }

    // ==================== Vendor Tests ====================

    #[test]
    fn test_read_vendor_errors() {
        let (storage, store) = memory_store(false);
        assert!(matches!(
            store.read_vendor("filament", "es", "actions"),
            Err(EditorError::FileNotFound(_))
        ));

        storage.insert_file("lang/vendor/filament/es/actions.php", "<?php return null;");
        assert!(matches!(
            store.read_vendor("filament", "es", "actions"),
            Err(EditorError::NotAnArray(_))
        ));

        storage.insert_file("lang/vendor/filament/es/forms.php", "<?php return [");
        assert!(matches!(
            store.read_vendor("filament", "es", "forms.php"),
            Err(EditorError::Parse { .. })
        ));
    }

    #[test]
    fn test_vendor_round_trip() {
        let (_, store) = memory_store(false);
        let mut tree = Tree::new();
        keypath::set(&mut tree, "modal<~>heading", "Eliminar");

        assert!(store.write_vendor("filament", "es", "actions", &tree));
        assert_eq!(store.read_vendor("filament", "es", "actions").unwrap(), tree);
    }

    // ==================== Filesystem Tests ====================

    #[test]
    fn test_fs_store_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let store = FileStore::new(
            Arc::new(FsStorage),
            LanguagePaths::new(temp.path().join("lang"), temp.path().join("backups")),
            true,
        );
        std::fs::create_dir(temp.path().join("lang")).unwrap();
        let map = flat(&[("Hello", "Hola"), ("nested<~>key", "valor")]);

        assert!(store.write("es", JSON_FILE, &map));
        assert!(store.write("es", JSON_FILE, &map));
        assert_eq!(store.read("es", JSON_FILE), map);
        assert_eq!(std::fs::read_dir(temp.path().join("backups")).unwrap().count(), 1);
    }

    proptest! {
        #[test]
        fn prop_json_write_read_round_trip(
            entries in proptest::collection::vec(
                (proptest::collection::vec("[ -~]{1,8}", 1..4), "[ -~]{0,16}"),
                0..12,
            )
        ) {
            let (_, store) = memory_store(false);
            let mut map = FlatMap::new();
            for (segments, value) in entries {
                let key = segments.join(keypath::SEPARATOR);
                let splits_back = key
                    .split(keypath::SEPARATOR)
                    .eq(segments.iter().map(String::as_str));
                // Leaf/group collisions cannot be represented in a nested file
                if splits_back && !keypath::occupied_flat(&map, &key) {
                    map.insert(key, value);
                }
            }

            prop_assert!(store.write("es", JSON_FILE, &map));
            prop_assert_eq!(store.read("es", JSON_FILE), map);
        }
    }
}
