//! Filesystem capability used for initial scans.
//!
//! The synchronizer lists the files inside a directory, and resolves a
//! watch root to the form the watcher will report paths in.
//! [`OsFileSystem`] answers from the real filesystem;
//! [`MemoryFileSystem`](crate::memory::MemoryFileSystem) answers from memory
//! for tests and embedders.

use std::fs;
use std::io;

use crate::path::NormalizedPath;

/// Directory enumeration and root resolution.
pub trait FileSystem: Send + Sync {
    /// List the files inside `dir`.
    ///
    /// Non-recursive listings return direct children only; recursive listings
    /// return every file below `dir`. Directories are never returned. A
    /// missing `dir` is reported as [`io::ErrorKind::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if `dir` cannot be read.
    fn list_files(&self, dir: &NormalizedPath, recursive: bool) -> io::Result<Vec<NormalizedPath>>;

    /// The form of `path` the paired watcher reports events under.
    ///
    /// Called once per subscription, before the scan and the scope are
    /// built. The default returns `path` unchanged.
    fn resolve(&self, path: &NormalizedPath) -> NormalizedPath {
        path.clone()
    }
}

/// The real filesystem.
///
/// Listings are sorted by file name within each directory, and files come
/// before the contents of subdirectories, so scans are reproducible.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl OsFileSystem {
    fn collect(dir: &NormalizedPath, recursive: bool, out: &mut Vec<NormalizedPath>) -> io::Result<()> {
        let mut files = Vec::new();
        let mut subdirs = Vec::new();

        for entry in fs::read_dir(dir.as_path())? {
            let entry = entry?;
            let path = dir.join(entry.file_name());
            // Follow symlinks so a linked file counts as a file.
            match fs::metadata(entry.path()) {
                Ok(meta) if meta.is_file() => files.push(path),
                Ok(meta) if meta.is_dir() && recursive => subdirs.push(path),
                Ok(_) => {}
                // Dangling link or entry removed mid-scan.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        files.sort();
        subdirs.sort();
        out.extend(files);
        for sub in subdirs {
            Self::collect(&sub, true, out)?;
        }
        Ok(())
    }
}

impl FileSystem for OsFileSystem {
    fn list_files(&self, dir: &NormalizedPath, recursive: bool) -> io::Result<Vec<NormalizedPath>> {
        let mut out = Vec::new();
        Self::collect(dir, recursive, &mut out)?;
        Ok(out)
    }

    /// OS watchers report absolute paths with symlinks resolved, so the root
    /// is made absolute and its longest existing prefix canonicalized. A root
    /// that does not exist yet keeps its missing tail as written.
    fn resolve(&self, path: &NormalizedPath) -> NormalizedPath {
        let Ok(absolute) = std::path::absolute(path.as_path()) else {
            return path.clone();
        };
        let absolute = NormalizedPath::new(absolute);

        let mut missing = Vec::new();
        let mut current = absolute.clone();
        loop {
            if let Ok(canonical) = dunce::canonicalize(current.as_path()) {
                return missing
                    .iter()
                    .rev()
                    .fold(NormalizedPath::new(canonical), |dir, name: &String| dir.join(name));
            }
            let (Some(parent), Some(name)) = (current.parent(), current.file_name()) else {
                return absolute;
            };
            missing.push(name.to_string());
            current = parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_lists_direct_files_sorted() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "").unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.txt"), "").unwrap();

        let root = NormalizedPath::new(dir.path());
        let files = OsFileSystem.list_files(&root, false).unwrap();
        assert_eq!(files, vec![root.join("a.txt"), root.join("b.txt")]);

        let all = OsFileSystem.list_files(&root, true).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2], root.join("sub/c.txt"));
    }

    #[test]
    fn test_missing_dir_is_not_found() {
        let dir = tempdir().unwrap();
        let missing = NormalizedPath::new(dir.path().join("nope"));
        let err = OsFileSystem.list_files(&missing, false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_resolve_canonicalizes_existing_root() {
        let dir = tempdir().unwrap();
        let canonical = NormalizedPath::new(dunce::canonicalize(dir.path()).unwrap());

        let dotted = NormalizedPath::new(dir.path().join("."));
        assert_eq!(OsFileSystem.resolve(&dotted), canonical);
        assert_eq!(OsFileSystem.resolve(&NormalizedPath::new(dir.path())), canonical);
    }

    #[test]
    fn test_resolve_keeps_missing_tail() {
        let dir = tempdir().unwrap();
        let canonical = NormalizedPath::new(dunce::canonicalize(dir.path()).unwrap());

        let missing = NormalizedPath::new(dir.path().join("not/yet"));
        assert_eq!(OsFileSystem.resolve(&missing), canonical.join("not").join("yet"));
    }

    #[test]
    fn test_resolve_makes_relative_absolute() {
        let resolved = OsFileSystem.resolve(&NormalizedPath::new("livewatch-missing-dir"));
        assert!(resolved.as_path().is_absolute());
        assert_eq!(resolved.file_name(), Some("livewatch-missing-dir"));
    }
}
