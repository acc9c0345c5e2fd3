//! Machine translation providers and the registry that picks between them.

pub mod google;
pub mod libretranslate;
pub mod microsoft;
pub mod provider;
pub mod registry;

pub use google::GoogleTranslateProvider;
pub use libretranslate::LibreTranslateProvider;
pub use microsoft::MicrosoftTranslatorProvider;
pub use provider::{ProviderError, StatusClass, TranslationProvider};
pub use registry::{BatchTranslation, ProviderStatus, TranslationManager};
