//! Language discovery.
//!
//! The set of languages is never stored: every call lists the language root
//! again, so files added or removed on disk show up immediately.

use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{EditorError, Result};
use crate::paths::{self, LanguagePaths, JSON_FILE, VENDOR_DIR};
use crate::storage::Storage;

/// Overview of one core language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSummary {
    pub code: String,
    pub name: String,
    pub php_files_count: usize,
    pub has_json: bool,
}

/// A language directory inside a vendor package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorLanguageEntry {
    pub code: String,
    pub name: String,
    pub package: String,
    pub php_files_count: usize,
}

/// A package under `<root>/vendor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorPackage {
    pub name: String,
    pub languages: Vec<VendorLanguageEntry>,
}

pub struct LanguageManager {
    storage: Arc<dyn Storage>,
    paths: LanguagePaths,
    support_json: bool,
    excluded_files: Vec<String>,
    read_vendor: bool,
    vendor_packages: Vec<String>,
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

impl LanguageManager {
    pub fn new(storage: Arc<dyn Storage>, config: &Config) -> Self {
        Self {
            storage,
            paths: LanguagePaths::new(&config.language_path, &config.backup_path),
            support_json: config.support_json,
            excluded_files: config.excluded_files.clone(),
            read_vendor: config.read_vendor,
            vendor_packages: config.vendor_packages.clone(),
        }
    }

    pub fn paths(&self) -> &LanguagePaths {
        &self.paths
    }

    /// Fails when the language root is missing.
    pub fn check_root(&self) -> Result<()> {
        if self.storage.is_dir(self.paths.root()) {
            Ok(())
        } else {
            Err(EditorError::InvalidLanguagePath(self.paths.root().to_path_buf()))
        }
    }

    /// Every core language: valid-code directories plus `<code>.json` files.
    ///
    /// Sorted, de-duplicated, and never includes `vendor`.
    pub fn list_languages(&self) -> Vec<String> {
        let root = self.paths.root();
        let mut languages: Vec<String> = self
            .storage
            .list_dirs(root)
            .unwrap_or_default()
            .iter()
            .filter_map(|dir| file_name(dir))
            .filter(|name| *name != VENDOR_DIR && paths::is_valid_language_code(name))
            .map(str::to_string)
            .collect();

        if self.support_json {
            let json_languages = self
                .storage
                .list_files(root)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|file| {
                    file_name(&file)
                        .and_then(|name| name.strip_suffix(".json"))
                        .filter(|code| paths::is_valid_language_code(code))
                        .map(str::to_string)
                });
            languages.extend(json_languages);
        }

        languages.sort();
        languages.dedup();
        languages
    }

    /// PHP files of a core language (full filenames), minus excluded ones.
    pub fn php_files(&self, language: &str) -> Vec<String> {
        php_files_in(self.storage.as_ref(), &self.paths.language_dir(language))
            .into_iter()
            .filter(|name| !self.excluded_files.contains(name))
            .collect()
    }

    pub fn has_json_file(&self, language: &str) -> bool {
        self.support_json && self.storage.exists(&self.paths.json_file(language))
    }

    /// Editable file names: PHP stems, then [`JSON_FILE`] when present.
    pub fn list_files(&self, language: &str) -> Vec<String> {
        let mut files: Vec<String> = self
            .php_files(language)
            .iter()
            .map(|name| name.trim_end_matches(".php").to_string())
            .collect();
        if self.has_json_file(language) {
            files.push(JSON_FILE.to_string());
        }
        files
    }

    pub fn summaries(&self) -> Vec<LanguageSummary> {
        self.list_languages()
            .into_iter()
            .map(|code| LanguageSummary {
                name: language_name(&code),
                php_files_count: self.php_files(&code).len(),
                has_json: self.has_json_file(&code),
                code,
            })
            .collect()
    }

    /// Vendor packages, empty unless vendor reading is enabled.
    ///
    /// When a package allow-list is configured only those packages are returned.
    pub fn vendor_packages(&self) -> Vec<VendorPackage> {
        if !self.read_vendor {
            return Vec::new();
        }

        self.storage
            .list_dirs(&self.paths.vendor_dir())
            .unwrap_or_default()
            .iter()
            .filter_map(|dir| file_name(dir))
            .filter(|name| {
                self.vendor_packages.is_empty() || self.vendor_packages.iter().any(|p| p == name)
            })
            .map(|name| VendorPackage {
                name: name.to_string(),
                languages: self.vendor_languages(name),
            })
            .collect()
    }

    /// Language directories of a vendor package. Any subdirectory counts.
    pub fn vendor_languages(&self, package: &str) -> Vec<VendorLanguageEntry> {
        self.vendor_language_codes(package)
            .into_iter()
            .map(|code| VendorLanguageEntry {
                name: language_name(&code),
                package: package.to_string(),
                php_files_count: self.vendor_files(package, &code).len(),
                code,
            })
            .collect()
    }

    pub fn vendor_language_codes(&self, package: &str) -> Vec<String> {
        self.storage
            .list_dirs(&self.paths.vendor_package_dir(package))
            .unwrap_or_default()
            .iter()
            .filter_map(|dir| file_name(dir))
            .map(str::to_string)
            .collect()
    }

    /// PHP file stems of a vendor package language.
    pub fn vendor_files(&self, package: &str, language: &str) -> Vec<String> {
        php_files_in(
            self.storage.as_ref(),
            &self.paths.vendor_language_dir(package, language),
        )
        .iter()
        .map(|name| name.trim_end_matches(".php").to_string())
        .collect()
    }
}

fn php_files_in(storage: &dyn Storage, dir: &Path) -> Vec<String> {
    storage
        .list_files(dir)
        .unwrap_or_default()
        .iter()
        .filter_map(|file| file_name(file))
        .filter(|name| name.ends_with(".php"))
        .map(str::to_string)
        .collect()
}

/// Display name of a language code, in the language itself.
///
/// Unknown codes fall back to the code with its first letter capitalized.
pub fn language_name(code: &str) -> String {
    let name = match code {
        "en" => "English",
        "es" => "Español",
        "fr" => "Français",
        "de" => "Deutsch",
        "it" => "Italiano",
        "pt" => "Português",
        "ru" => "Русский",
        "ja" => "日本語",
        "ko" => "한국어",
        "zh" => "中文",
        "ar" => "العربية",
        "hi" => "हिन्दी",
        "nl" => "Nederlands",
        "sv" => "Svenska",
        "da" => "Dansk",
        "no" => "Norsk",
        "fi" => "Suomi",
        "pl" => "Polski",
        "cs" => "Čeština",
        "sk" => "Slovenčina",
        "hu" => "Magyar",
        "tr" => "Türkçe",
        "th" => "ไทย",
        "vi" => "Tiếng Việt",
        "id" => "Bahasa Indonesia",
        "ms" => "Bahasa Melayu",
        "tl" => "Filipino",
        "he" => "עברית",
        "el" => "Ελληνικά",
        "bg" => "Български",
        "ro" => "Română",
        "hr" => "Hrvatski",
        "sr" => "Српски",
        "sl" => "Slovenščina",
        "et" => "Eesti",
        "lv" => "Latviešu",
        "lt" => "Lietuvių",
        "uk" => "Українська",
        "be" => "Беларуская",
        "ka" => "ქართული",
        "hy" => "Հայերեն",
        "az" => "Azərbaycan",
        "kk" => "Қазақша",
        "ky" => "Кыргызча",
        "uz" => "O'zbek",
        "mn" => "Монгол",
        "my" => "မြန်မာ",
        "km" => "ខ្មែរ",
        "lo" => "ລາວ",
        "si" => "සිංහල",
        "ta" => "தமிழ்",
        "te" => "తెలుగు",
        "ml" => "മലയാളം",
        "kn" => "ಕನ್ನಡ",
        "bn" => "বাংলা",
        "gu" => "ગુજરાતી",
        "pa" => "ਪੰਜਾਬੀ",
        "or" => "ଓଡ଼ିଆ",
        "as" => "অসমীয়া",
        "ne" => "नेपाली",
        "ur" => "اردو",
        "fa" => "فارسی",
        "ps" => "پښتو",
        "ku" => "Kurdî",
        "sw" => "Kiswahili",
        "am" => "አማርኛ",
        "zu" => "isiZulu",
        "af" => "Afrikaans",
        "sq" => "Shqip",
        "eu" => "Euskera",
        "ca" => "Català",
        "gl" => "Galego",
        "cy" => "Cymraeg",
        "ga" => "Gaeilge",
        "gd" => "Gàidhlig",
        "is" => "Íslenska",
        "fo" => "Føroyskt",
        "mt" => "Malti",
        "mk" => "Македонски",
        "me" => "Crnogorski",
        "bs" => "Bosanski",
        "lb" => "Lëtzebuergesch",

        // Regional variants
        "en-US" => "English (US)",
        "en-GB" => "English (UK)",
        "en-CA" => "English (Canada)",
        "en-AU" => "English (Australia)",
        "es-ES" => "Español (España)",
        "es-MX" => "Español (México)",
        "es-AR" => "Español (Argentina)",
        "es-CO" => "Español (Colombia)",
        "pt-BR" => "Português (Brasil)",
        "pt-PT" => "Português (Portugal)",
        "fr-FR" => "Français (France)",
        "fr-CA" => "Français (Canada)",
        "de-DE" => "Deutsch (Deutschland)",
        "de-AT" => "Deutsch (Österreich)",
        "de-CH" => "Deutsch (Schweiz)",
        "it-IT" => "Italiano (Italia)",
        "zh-CN" => "中文 (简体)",
        "zh-TW" => "中文 (繁體)",
        "zh-HK" => "中文 (香港)",
        "ar-SA" => "العربية (السعودية)",
        "ar-EG" => "العربية (مصر)",
        "ar-AE" => "العربية (الإمارات)",
        _ => return capitalize(code),
    };
    name.to_string()
}

fn capitalize(code: &str) -> String {
    let mut chars = code.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn manager_with(storage: MemoryStorage, config: Config) -> LanguageManager {
        LanguageManager::new(Arc::new(storage), &config)
    }

    fn sample_storage() -> MemoryStorage {
        let storage = MemoryStorage::new();
        storage.insert_file("lang/en/auth.php", "<?php return [];");
        storage.insert_file("lang/en/validation.php", "<?php return [];");
        storage.insert_file("lang/en/notes.txt", "");
        storage.insert_file("lang/es/auth.php", "<?php return [];");
        storage.insert_file("lang/en.json", "{}");
        storage.insert_file("lang/fr.json", "{}");
        storage.insert_file("lang/composer.json", "{}");
        storage.insert_dir("lang/pt-BR");
        storage.insert_dir("lang/backup");
        storage.insert_file("lang/vendor/filament/en/actions.php", "<?php return [];");
        storage.insert_file("lang/vendor/filament/en/forms.php", "<?php return [];");
        storage.insert_file("lang/vendor/filament/es/actions.php", "<?php return [];");
        storage.insert_file("lang/vendor/other/de/x.php", "<?php return [];");
        storage
    }

    // ==================== Language Listing Tests ====================

    #[test]
    fn test_list_languages_merges_dirs_and_json() {
        let manager = manager_with(sample_storage(), Config::default());
        assert_eq!(manager.list_languages(), vec!["en", "es", "fr", "pt-BR"]);
    }

    #[test]
    fn test_list_languages_without_json_support() {
        let config = Config {
            support_json: false,
            ..Config::default()
        };
        let manager = manager_with(sample_storage(), config);
        assert_eq!(manager.list_languages(), vec!["en", "es", "pt-BR"]);
    }

    #[test]
    fn test_list_languages_missing_root_is_empty() {
        let manager = manager_with(MemoryStorage::new(), Config::default());
        assert!(manager.list_languages().is_empty());
        assert!(matches!(
            manager.check_root(),
            Err(EditorError::InvalidLanguagePath(_))
        ));
    }

    // ==================== File Listing Tests ====================

    #[test]
    fn test_list_files_appends_json_marker() {
        let manager = manager_with(sample_storage(), Config::default());
        assert_eq!(manager.list_files("en"), vec!["auth", "validation", JSON_FILE]);
        assert_eq!(manager.list_files("es"), vec!["auth"]);
    }

    #[test]
    fn test_list_files_honors_exclusions() {
        let config = Config {
            excluded_files: vec!["validation.php".to_string()],
            ..Config::default()
        };
        let manager = manager_with(sample_storage(), config);
        assert_eq!(manager.php_files("en"), vec!["auth.php"]);
    }

    #[test]
    fn test_summaries() {
        let manager = manager_with(sample_storage(), Config::default());
        let en = manager
            .summaries()
            .into_iter()
            .find(|s| s.code == "en")
            .unwrap();
        assert_eq!(en.name, "English");
        assert_eq!(en.php_files_count, 2);
        assert!(en.has_json);
    }

    // ==================== Vendor Tests ====================

    #[test]
    fn test_vendor_packages_disabled_by_default() {
        let manager = manager_with(sample_storage(), Config::default());
        assert!(manager.vendor_packages().is_empty());
    }

    #[test]
    fn test_vendor_packages_with_allow_list() {
        let config = Config {
            read_vendor: true,
            vendor_packages: vec!["filament".to_string()],
            ..Config::default()
        };
        let manager = manager_with(sample_storage(), config);
        let packages = manager.vendor_packages();

        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name, "filament");
        assert_eq!(
            packages[0].languages[0],
            VendorLanguageEntry {
                code: "en".to_string(),
                name: "English".to_string(),
                package: "filament".to_string(),
                php_files_count: 2,
            }
        );
    }

    #[test]
    fn test_vendor_files_are_stems() {
        let manager = manager_with(sample_storage(), Config::default());
        assert_eq!(manager.vendor_files("filament", "en"), vec!["actions", "forms"]);
        assert_eq!(manager.vendor_language_codes("filament"), vec!["en", "es"]);
    }

    // ==================== Language Name Tests ====================

    #[test]
    fn test_language_name_known_and_fallback() {
        assert_eq!(language_name("es"), "Español");
        assert_eq!(language_name("pt-BR"), "Português (Brasil)");
        assert_eq!(language_name("xx"), "Xx");
    }
}
