//! Path normalization for watch keys.
//!
//! Watch roots, scan results and watcher-reported paths all flow through
//! [`NormalizedPath`] before they are compared or stored, so that a caller
//! using `\` separators and a watcher reporting `/` separators agree on the
//! same key.
//!
//! Normalization rules:
//!
//! - `\` and `/` are both treated as separators and rendered as `/`
//! - repeated separators collapse, `.` components are dropped
//! - trailing separators are removed (except for a bare root such as `/` or `C:/`)
//! - `..` is kept as-is; symlinks are never resolved
//! - on Windows, equality and hashing ignore ASCII case

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// A path with canonical separators, usable as a collection key.
#[derive(Clone)]
pub struct NormalizedPath {
    /// Separator-normalized path, original casing.
    display: String,
    /// Comparison key (case-folded on case-insensitive platforms).
    key: String,
}

impl NormalizedPath {
    /// Normalize a path.
    ///
    /// # Example
    ///
    /// ```
    /// use livewatch::NormalizedPath;
    ///
    /// let a = NormalizedPath::new("data\\inbox\\");
    /// let b = NormalizedPath::new("data//inbox/.");
    /// assert_eq!(a, b);
    /// assert_eq!(a.as_str(), "data/inbox");
    /// ```
    pub fn new(path: impl AsRef<Path>) -> Self {
        let raw = path.as_ref().to_string_lossy();
        Self::from_normalized(normalize(&raw))
    }

    fn from_normalized(display: String) -> Self {
        let key = if cfg!(windows) {
            display.to_ascii_lowercase()
        } else {
            display.clone()
        };
        Self { display, key }
    }

    /// The normalized path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// The normalized path as a [`Path`].
    #[must_use]
    pub fn as_path(&self) -> &Path {
        Path::new(&self.display)
    }

    /// Convert into an owned [`PathBuf`].
    #[must_use]
    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(&self.display)
    }

    /// Returns `true` for a bare root such as `/`, `//` or `C:/`.
    #[must_use]
    pub fn is_root(&self) -> bool {
        let prefix = prefix_len(&self.display);
        prefix > 0 && prefix == self.display.len()
    }

    /// The containing directory.
    ///
    /// A single relative component has `.` as its parent; a root and `.`
    /// itself have none.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let prefix = prefix_len(&self.display);
        if self.display.len() == prefix || self.display == "." {
            return None;
        }

        let tail = &self.display[prefix..];
        let parent = match tail.rfind('/') {
            Some(idx) => &self.display[..prefix + idx],
            None if prefix > 0 => &self.display[..prefix],
            None => ".",
        };
        Some(Self::from_normalized(parent.to_string()))
    }

    /// The last component, if the path is not a root.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        let prefix = prefix_len(&self.display);
        let tail = &self.display[prefix..];
        if tail.is_empty() || tail == "." {
            return None;
        }
        Some(tail.rsplit('/').next().unwrap_or(tail))
    }

    /// Append a path below this one.
    #[must_use]
    pub fn join(&self, child: impl AsRef<Path>) -> Self {
        let child = child.as_ref().to_string_lossy();
        if self.display == "." {
            return Self::new(child.as_ref());
        }
        Self::from_normalized(normalize(&format!("{}/{child}", self.display)))
    }

    /// Returns `true` if `self` lives directly inside `dir`.
    #[must_use]
    pub fn is_child_of(&self, dir: &Self) -> bool {
        self.parent().is_some_and(|p| p == *dir)
    }

    /// Returns `true` if `self` lives anywhere below `dir` (not `dir` itself).
    #[must_use]
    pub fn is_descendant_of(&self, dir: &Self) -> bool {
        if dir.key == "." {
            return prefix_len(&self.key) == 0 && self.key != ".";
        }
        match self.key.strip_prefix(dir.key.as_str()) {
            Some(rest) if dir.key.ends_with('/') => !rest.is_empty(),
            Some(rest) => rest.len() > 1 && rest.starts_with('/'),
            None => false,
        }
    }
}

/// Length of the root prefix: `//`, `/`, `C:/`, `C:` or nothing.
fn prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    if s.starts_with("//") {
        2
    } else if s.starts_with('/') {
        1
    } else if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        if bytes.get(2) == Some(&b'/') { 3 } else { 2 }
    } else {
        0
    }
}

fn normalize(raw: &str) -> String {
    let unified: Cow<'_, str> = if raw.contains('\\') {
        Cow::Owned(raw.replace('\\', "/"))
    } else {
        Cow::Borrowed(raw)
    };

    let prefix = prefix_len(&unified);
    let (head, rest) = unified.split_at(prefix);

    let mut out = String::with_capacity(unified.len());
    out.push_str(head);
    let mut first = true;
    for component in rest.split('/').filter(|c| !c.is_empty() && *c != ".") {
        if !first {
            out.push('/');
        }
        out.push_str(component);
        first = false;
    }

    if out.is_empty() {
        out.push('.');
    }
    out
}

impl PartialEq for NormalizedPath {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for NormalizedPath {}

impl Hash for NormalizedPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for NormalizedPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NormalizedPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl Debug for NormalizedPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.display, f)
    }
}

impl Display for NormalizedPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl From<&str> for NormalizedPath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NormalizedPath {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(value: &Path) -> Self {
        Self::new(value)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(value: PathBuf) -> Self {
        Self::new(value)
    }
}

impl From<&PathBuf> for NormalizedPath {
    fn from(value: &PathBuf) -> Self {
        Self::new(value)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for NormalizedPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for NormalizedPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separators_unify() {
        assert_eq!(NormalizedPath::new("a\\b\\c").as_str(), "a/b/c");
        assert_eq!(NormalizedPath::new("a//b///c/").as_str(), "a/b/c");
        assert_eq!(NormalizedPath::new("./a/./b").as_str(), "a/b");
        assert_eq!(NormalizedPath::new("/srv\\data/").as_str(), "/srv/data");
    }

    #[test]
    fn test_roots() {
        assert_eq!(NormalizedPath::new("/").as_str(), "/");
        assert_eq!(NormalizedPath::new("C:\\").as_str(), "C:/");
        assert_eq!(NormalizedPath::new("").as_str(), ".");
        assert!(NormalizedPath::new("/").is_root());
        assert!(NormalizedPath::new("C:/").is_root());
        assert!(!NormalizedPath::new("C:/x").is_root());
    }

    #[test]
    fn test_parent() {
        let p = NormalizedPath::new("/srv/data/file.txt");
        assert_eq!(p.parent(), Some(NormalizedPath::new("/srv/data")));
        assert_eq!(NormalizedPath::new("/srv").parent(), Some(NormalizedPath::new("/")));
        assert_eq!(NormalizedPath::new("/").parent(), None);
        assert_eq!(NormalizedPath::new("file.txt").parent(), Some(NormalizedPath::new(".")));
        assert_eq!(NormalizedPath::new(".").parent(), None);
        assert_eq!(NormalizedPath::new("C:\\x").parent(), Some(NormalizedPath::new("C:/")));
    }

    #[test]
    fn test_file_name_and_join() {
        let dir = NormalizedPath::new("/srv/data");
        let file = dir.join("inbox\\a.txt");
        assert_eq!(file.as_str(), "/srv/data/inbox/a.txt");
        assert_eq!(file.file_name(), Some("a.txt"));
        assert_eq!(NormalizedPath::new("/").file_name(), None);
        assert_eq!(NormalizedPath::new(".").join("a").as_str(), "a");
    }

    #[test]
    fn test_child_and_descendant() {
        let dir = NormalizedPath::new("/srv/data");
        let direct = NormalizedPath::new("/srv/data/a");
        let nested = NormalizedPath::new("/srv/data/sub/a");
        let sibling = NormalizedPath::new("/srv/database");

        assert!(direct.is_child_of(&dir));
        assert!(!nested.is_child_of(&dir));
        assert!(nested.is_descendant_of(&dir));
        assert!(!sibling.is_descendant_of(&dir));
        assert!(!dir.is_descendant_of(&dir));
        assert!(direct.is_descendant_of(&NormalizedPath::new("/")));
        assert!(NormalizedPath::new("a/b").is_descendant_of(&NormalizedPath::new(".")));
    }

    #[test]
    fn test_equality_uses_normalized_form() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(NormalizedPath::new("dir/file"));
        assert!(set.contains(&NormalizedPath::new("dir\\file")));
        assert!(set.contains(&NormalizedPath::new("dir//file/")));
    }

    #[cfg(windows)]
    #[test]
    fn test_case_insensitive_on_windows() {
        assert_eq!(NormalizedPath::new("C:\\Data"), NormalizedPath::new("c:/data"));
    }
}
