use std::path::PathBuf;

/// Errors raised by the translation editor core.
///
/// Most core paths degrade instead of failing (missing files read as empty,
/// provider failures fall back to the original text). These variants cover
/// the call paths that do surface errors: vendor file reads, key validation
/// on the edited language, and provider selection.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("Translation file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Invalid translation file format, file must return an array: {}", .0.display())]
    NotAnArray(PathBuf),

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Value for key '{key}' must be a string, found {found}")]
    InvalidValue { key: String, found: String },

    #[error("Invalid language path: '{}' does not exist or is not readable", .0.display())]
    InvalidLanguagePath(PathBuf),

    #[error("Key and value must not be empty")]
    EmptyKey,

    #[error("This key already exists: '{0}'")]
    DuplicateKey(String),

    #[error("Key not found: '{0}'")]
    KeyNotFound(String),

    #[error("No translation provider available")]
    NoProviderAvailable,

    #[error("Translation provider '{0}' not found")]
    ProviderNotFound(String),

    #[error("Translation provider '{0}' is not available")]
    ProviderUnavailable(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, EditorError>;

impl EditorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EditorError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_an_array_mentions_path() {
        let err = EditorError::NotAnArray(PathBuf::from("lang/vendor/pkg/en/auth.php"));
        let msg = err.to_string();
        assert!(msg.contains("must return an array"));
        assert!(msg.contains("auth.php"));
    }

    #[test]
    fn test_duplicate_key_message() {
        let err = EditorError::DuplicateKey("auth<~>failed".to_string());
        assert_eq!(err.to_string(), "This key already exists: 'auth<~>failed'");
    }

    #[test]
    fn test_io_error_keeps_source() {
        use std::error::Error;

        let err = EditorError::io(
            "lang/en.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.source().is_some());
        assert!(err.to_string().contains("lang/en.json"));
    }
}
