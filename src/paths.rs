//! Path layout of a language root.
//!
//! ```text
//! <root>/<code>/<file>.php
//! <root>/<code>.json
//! <root>/vendor/<package>/<code>/<file>.php
//! ```

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

/// Pseudo filename addressing a language's JSON file.
pub const JSON_FILE: &str = "__json";

/// Directory under the language root holding vendor packages.
pub const VENDOR_DIR: &str = "vendor";

static LANGUAGE_CODE: OnceLock<Regex> = OnceLock::new();
static UNSAFE_FILENAME_CHARS: OnceLock<Regex> = OnceLock::new();

/// Whether `code` looks like an ISO language code (`en`, `fil`, `pt-BR`).
pub fn is_valid_language_code(code: &str) -> bool {
    LANGUAGE_CODE
        .get_or_init(|| Regex::new(r"^[a-z]{2,3}(-[A-Z]{2})?$").expect("valid regex"))
        .is_match(code)
}

/// Strip path separators, `..`, NUL and anything outside `[A-Za-z0-9._-]`.
pub fn sanitize_filename(filename: &str) -> String {
    let stripped = filename
        .replace(['/', '\\', '\0'], "")
        .replace("..", "");
    UNSAFE_FILENAME_CHARS
        .get_or_init(|| Regex::new(r"[^a-zA-Z0-9\-_.]").expect("valid regex"))
        .replace_all(&stripped, "")
        .into_owned()
}

/// Whether `filename` addresses the language's JSON file.
pub fn is_json_filename(filename: &str) -> bool {
    filename == JSON_FILE || filename.ends_with(".json")
}

fn php_stem(filename: &str) -> String {
    let sanitized = sanitize_filename(filename);
    match sanitized.strip_suffix(".php") {
        Some(stem) => stem.to_string(),
        None => sanitized,
    }
}

/// Resolves every file location under one language root.
#[derive(Debug, Clone)]
pub struct LanguagePaths {
    root: PathBuf,
    backup_dir: PathBuf,
}

impl LanguagePaths {
    pub fn new(root: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            backup_dir: backup_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn language_dir(&self, language: &str) -> PathBuf {
        self.root.join(language)
    }

    pub fn php_file(&self, language: &str, filename: &str) -> PathBuf {
        self.language_dir(language)
            .join(format!("{}.php", php_stem(filename)))
    }

    pub fn json_file(&self, language: &str) -> PathBuf {
        self.root.join(format!("{}.json", language))
    }

    /// Path of `filename` for `language`, choosing the format from the name.
    pub fn file(&self, language: &str, filename: &str) -> PathBuf {
        if is_json_filename(filename) {
            self.json_file(language)
        } else {
            self.php_file(language, filename)
        }
    }

    pub fn vendor_dir(&self) -> PathBuf {
        self.root.join(VENDOR_DIR)
    }

    pub fn vendor_package_dir(&self, package: &str) -> PathBuf {
        self.vendor_dir().join(package)
    }

    pub fn vendor_language_dir(&self, package: &str, language: &str) -> PathBuf {
        self.vendor_package_dir(package).join(language)
    }

    pub fn vendor_file(&self, package: &str, language: &str, filename: &str) -> PathBuf {
        self.vendor_language_dir(package, language)
            .join(format!("{}.php", php_stem(filename)))
    }

    /// Backup location for a file about to be overwritten, stamped with `timestamp`.
    pub fn backup_file(&self, language: &str, filename: &str, timestamp: &str) -> PathBuf {
        if is_json_filename(filename) {
            self.backup_dir
                .join(format!("{}_{}.json", language, timestamp))
        } else {
            self.backup_dir
                .join(format!("{}_{}_{}.php", language, php_stem(filename), timestamp))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> LanguagePaths {
        LanguagePaths::new("/app/lang", "/app/storage/backups")
    }

    // ==================== Language Code Tests ====================

    #[test]
    fn test_valid_language_codes() {
        assert!(is_valid_language_code("en"));
        assert!(is_valid_language_code("fil"));
        assert!(is_valid_language_code("pt-BR"));
    }

    #[test]
    fn test_invalid_language_codes() {
        assert!(!is_valid_language_code("vendor"));
        assert!(!is_valid_language_code("EN"));
        assert!(!is_valid_language_code("pt_BR"));
        assert!(!is_valid_language_code("pt-br"));
        assert!(!is_valid_language_code(""));
    }

    // ==================== Filename Tests ====================

    #[test]
    fn test_sanitize_filename_blocks_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_filename("auth.php"), "auth.php");
        assert_eq!(sanitize_filename("my file!.php"), "myfile.php");
    }

    #[test]
    fn test_json_filename_detection() {
        assert!(is_json_filename(JSON_FILE));
        assert!(is_json_filename("es.json"));
        assert!(!is_json_filename("auth"));
    }

    // ==================== Path Resolution Tests ====================

    #[test]
    fn test_php_file_strips_extension() {
        let paths = paths();
        assert_eq!(
            paths.php_file("es", "auth.php"),
            PathBuf::from("/app/lang/es/auth.php")
        );
        assert_eq!(paths.php_file("es", "auth"), paths.php_file("es", "auth.php"));
    }

    #[test]
    fn test_file_routes_by_format() {
        let paths = paths();
        assert_eq!(paths.file("fr", JSON_FILE), PathBuf::from("/app/lang/fr.json"));
        assert_eq!(paths.file("fr", "fr.json"), PathBuf::from("/app/lang/fr.json"));
        assert_eq!(
            paths.file("fr", "validation"),
            PathBuf::from("/app/lang/fr/validation.php")
        );
    }

    #[test]
    fn test_vendor_file_path() {
        assert_eq!(
            paths().vendor_file("filament", "de", "actions.php"),
            PathBuf::from("/app/lang/vendor/filament/de/actions.php")
        );
    }

    #[test]
    fn test_backup_file_names() {
        let paths = paths();
        assert_eq!(
            paths.backup_file("es", "auth", "2025-06-04_22-07-00"),
            PathBuf::from("/app/storage/backups/es_auth_2025-06-04_22-07-00.php")
        );
        assert_eq!(
            paths.backup_file("es", JSON_FILE, "2025-06-04_22-07-00"),
            PathBuf::from("/app/storage/backups/es_2025-06-04_22-07-00.json")
        );
    }
}
