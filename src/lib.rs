//! Translation file editor core.
//!
//! Reads and writes PHP-array and JSON localization files, keeps keys in
//! sync across languages, and can fill in new values through a machine
//! translation provider.

pub mod config;
pub mod editor;
pub mod error;
pub mod keypath;
pub mod languages;
pub mod paths;
pub mod php;
pub mod storage;
pub mod store;
pub mod sync;
pub mod translation;

pub use editor::{EditSession, EntryId, KeyChange, TranslationEditor};
pub use error::{EditorError, Result};
