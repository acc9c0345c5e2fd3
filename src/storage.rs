//! Filesystem abstraction.
//!
//! The language root is the only database this crate has: languages,
//! files and vendor packages are all discovered by listing directories.
//! Everything goes through [`Storage`] so tests can run against
//! [`MemoryStorage`] instead of a real disk.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

pub trait Storage: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Immediate subdirectories of `path`, sorted.
    fn list_dirs(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Regular files directly inside `path`, sorted.
    fn list_files(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    fn modified(&self, path: &Path) -> io::Result<SystemTime>;
}

/// [`Storage`] backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl FsStorage {
    fn list(path: &Path, want_dirs: bool) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if (want_dirs && file_type.is_dir()) || (!want_dirs && file_type.is_file()) {
                entries.push(entry.path());
            }
        }
        entries.sort();
        Ok(entries)
    }
}

impl Storage for FsStorage {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_dirs(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        Self::list(path, true)
    }

    fn list_files(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        Self::list(path, false)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::copy(from, to).map(|_| ())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, (String, SystemTime)>,
    dirs: BTreeSet<PathBuf>,
    read_only: bool,
}

/// In-memory [`Storage`] double.
///
/// Mirrors the filesystem rules the store relies on: writes need an
/// existing parent directory, and a read-only switch makes every write fail.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} not found", path.display()),
    )
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock leaves plain data behind; keep using it.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a file, creating its parent directories.
    pub fn insert_file(&self, path: impl AsRef<Path>, contents: impl Into<String>) {
        let path = path.as_ref();
        let mut state = self.state();
        if let Some(parent) = path.parent() {
            add_ancestors(&mut state.dirs, parent);
        }
        state
            .files
            .insert(path.to_path_buf(), (contents.into(), SystemTime::now()));
    }

    pub fn insert_dir(&self, path: impl AsRef<Path>) {
        add_ancestors(&mut self.state().dirs, path.as_ref());
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<String> {
        self.state()
            .files
            .get(path.as_ref())
            .map(|(contents, _)| contents.clone())
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.state().read_only = read_only;
    }

    pub fn set_modified(&self, path: impl AsRef<Path>, time: SystemTime) {
        if let Some(entry) = self.state().files.get_mut(path.as_ref()) {
            entry.1 = time;
        }
    }
}

fn add_ancestors(dirs: &mut BTreeSet<PathBuf>, path: &Path) {
    for ancestor in path.ancestors() {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        dirs.insert(ancestor.to_path_buf());
    }
}

fn children<'a, I>(paths: I, parent: &Path) -> Vec<PathBuf>
where
    I: Iterator<Item = &'a PathBuf>,
{
    paths
        .filter(|path| path.parent() == Some(parent))
        .cloned()
        .collect()
}

impl Storage for MemoryStorage {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.file(path).ok_or_else(|| not_found(path))
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let mut state = self.state();
        if state.read_only {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is read-only", path.display()),
            ));
        }
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !state.dirs.contains(parent) => {
                Err(not_found(parent))
            }
            _ => {
                state
                    .files
                    .insert(path.to_path_buf(), (contents.to_string(), SystemTime::now()));
                Ok(())
            }
        }
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.state();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.state().dirs.contains(path)
    }

    fn list_dirs(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let state = self.state();
        if !state.dirs.contains(path) {
            return Err(not_found(path));
        }
        Ok(children(state.dirs.iter(), path))
    }

    fn list_files(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let state = self.state();
        if !state.dirs.contains(path) {
            return Err(not_found(path));
        }
        Ok(children(state.files.keys(), path))
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state();
        if state.read_only {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is read-only", path.display()),
            ));
        }
        add_ancestors(&mut state.dirs, path);
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        let contents = self.read_to_string(from)?;
        self.write(to, &contents)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.state()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        self.state()
            .files
            .get(path)
            .map(|(_, modified)| *modified)
            .ok_or_else(|| not_found(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_write_requires_parent_dir() {
        let storage = MemoryStorage::new();
        let path = Path::new("lang/en/messages.php");

        assert!(storage.write(path, "x").is_err());
        storage.create_dir_all(Path::new("lang/en")).unwrap();
        storage.write(path, "x").unwrap();
        assert_eq!(storage.file(path).as_deref(), Some("x"));
    }

    #[test]
    fn test_memory_listing_is_immediate_children_only() {
        let storage = MemoryStorage::new();
        storage.insert_file("lang/en/messages.php", "");
        storage.insert_file("lang/en.json", "{}");
        storage.insert_file("lang/vendor/pkg/es/auth.php", "");

        let dirs = storage.list_dirs(Path::new("lang")).unwrap();
        assert_eq!(dirs, vec![PathBuf::from("lang/en"), PathBuf::from("lang/vendor")]);

        let files = storage.list_files(Path::new("lang")).unwrap();
        assert_eq!(files, vec![PathBuf::from("lang/en.json")]);
    }

    #[test]
    fn test_memory_read_only_rejects_writes() {
        let storage = MemoryStorage::new();
        storage.insert_dir("lang");
        storage.set_read_only(true);

        let err = storage.write(Path::new("lang/en.json"), "{}").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_fs_storage_lists_sorted() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("fr")).unwrap();
        fs::create_dir(temp.path().join("de")).unwrap();
        fs::write(temp.path().join("en.json"), "{}").unwrap();

        let storage = FsStorage;
        let dirs = storage.list_dirs(temp.path()).unwrap();
        assert_eq!(dirs, vec![temp.path().join("de"), temp.path().join("fr")]);
        assert_eq!(
            storage.list_files(temp.path()).unwrap(),
            vec![temp.path().join("en.json")]
        );
    }
}
