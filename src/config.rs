use std::path::PathBuf;

use anyhow::Result;

#[derive(Debug, Clone)]
pub struct Config {
    // Layout
    pub language_path: PathBuf,
    /// Accepted for config compatibility; file formats are fixed to PHP and JSON
    pub supported_extensions: Vec<String>,
    pub support_json: bool,
    pub excluded_files: Vec<String>,

    // Vendor packages
    pub read_vendor: bool,
    pub vendor_packages: Vec<String>,

    // Backups
    pub create_backup: bool,
    pub backup_path: PathBuf,

    // Editing
    /// Language used by the CLI when none is given
    pub default_language: String,
    pub auto_save: bool,

    // Machine translation
    pub auto_translate: AutoTranslateConfig,
}

#[derive(Debug, Clone, Default)]
pub struct AutoTranslateConfig {
    pub enabled: bool,
    /// Name of the preferred provider ("libretranslate", "microsoft", "google")
    pub provider: String,
    pub libretranslate: Option<LibreTranslateSettings>,
    pub microsoft: Option<MicrosoftSettings>,
    pub google: Option<GoogleSettings>,
}

#[derive(Debug, Clone, Default)]
pub struct LibreTranslateSettings {
    /// Base URL; discovered by probing well-known instances when unset
    pub url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MicrosoftSettings {
    pub api_key: Option<String>,
    pub region: String,
    pub endpoint: String,
}

#[derive(Debug, Clone)]
pub struct GoogleSettings {
    pub api_key: Option<String>,
    pub endpoint: String,
}

pub const DEFAULT_MICROSOFT_ENDPOINT: &str = "https://api.cognitive.microsofttranslator.com";
pub const DEFAULT_GOOGLE_ENDPOINT: &str = "https://translation.googleapis.com";

impl Default for MicrosoftSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            region: "global".to_string(),
            endpoint: DEFAULT_MICROSOFT_ENDPOINT.to_string(),
        }
    }
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_GOOGLE_ENDPOINT.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language_path: PathBuf::from("lang"),
            supported_extensions: vec!["php".to_string(), "json".to_string()],
            support_json: true,
            excluded_files: Vec::new(),
            read_vendor: false,
            vendor_packages: Vec::new(),
            create_backup: true,
            backup_path: PathBuf::from("storage/translation-backups"),
            default_language: "en".to_string(),
            auto_save: true,
            auto_translate: AutoTranslateConfig {
                provider: "libretranslate".to_string(),
                ..AutoTranslateConfig::default()
            },
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_bool(name: &str, default: bool) -> bool {
    env_string(name)
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}

fn env_list(name: &str) -> Option<Vec<String>> {
    env_string(name).map(|v| {
        v.split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Default configuration rooted at `language_path`.
    pub fn with_language_path(language_path: impl Into<PathBuf>) -> Self {
        Self {
            language_path: language_path.into(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            // Layout
            language_path: env_string("TRANSLATION_EDITOR_LANG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.language_path),
            supported_extensions: env_list("TRANSLATION_EDITOR_EXTENSIONS")
                .unwrap_or(defaults.supported_extensions),
            support_json: env_bool("TRANSLATION_EDITOR_SUPPORT_JSON", defaults.support_json),
            excluded_files: env_list("TRANSLATION_EDITOR_EXCLUDED_FILES").unwrap_or_default(),

            // Vendor packages
            read_vendor: env_bool("TRANSLATION_EDITOR_VENDOR", defaults.read_vendor),
            vendor_packages: env_list("TRANSLATION_EDITOR_VENDOR_PACKAGES").unwrap_or_default(),

            // Backups
            create_backup: env_bool("TRANSLATION_EDITOR_BACKUP", defaults.create_backup),
            backup_path: env_string("TRANSLATION_EDITOR_BACKUP_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.backup_path),

            // Editing
            default_language: env_string("APP_LOCALE").unwrap_or(defaults.default_language),
            auto_save: env_bool("TRANSLATION_EDITOR_AUTO_SAVE", defaults.auto_save),

            // Machine translation
            auto_translate: AutoTranslateConfig::from_env(),
        })
    }
}

impl AutoTranslateConfig {
    pub fn from_env() -> Self {
        let provider =
            env_string("AUTO_TRANSLATE_PROVIDER").unwrap_or_else(|| "libretranslate".to_string());

        let libretranslate_url = env_string("LIBRETRANSLATE_URL");
        let libretranslate_key = env_string("LIBRETRANSLATE_API_KEY");
        let libretranslate = if libretranslate_url.is_some()
            || libretranslate_key.is_some()
            || provider == "libretranslate"
        {
            Some(LibreTranslateSettings {
                url: libretranslate_url,
                api_key: libretranslate_key,
            })
        } else {
            None
        };

        let microsoft = env_string("MICROSOFT_TRANSLATOR_KEY").map(|key| MicrosoftSettings {
            api_key: Some(key),
            region: env_string("MICROSOFT_TRANSLATOR_REGION").unwrap_or_else(|| "global".to_string()),
            endpoint: env_string("MICROSOFT_TRANSLATOR_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_MICROSOFT_ENDPOINT.to_string()),
        });

        let google = env_string("GOOGLE_TRANSLATE_API_KEY").map(|key| GoogleSettings {
            api_key: Some(key),
            endpoint: env_string("GOOGLE_TRANSLATE_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_GOOGLE_ENDPOINT.to_string()),
        });

        Self {
            enabled: env_bool("AUTO_TRANSLATE_ENABLED", false),
            provider,
            libretranslate,
            microsoft,
            google,
        }
    }
}
