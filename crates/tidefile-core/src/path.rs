//! Byte-exact, comparable filesystem paths.
//!
//! A [`Path`] is a sequence of [`Name`] segments plus an absoluteness flag.
//! Construction never fails and never touches the filesystem: redundant
//! separators are collapsed, but `.` and `..` segments are kept verbatim
//! until [`Path::normalize`] is called.

use std::fmt;

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::PathError;

const SEPARATOR: u8 = b'/';

/// A single path segment. Never empty and never contains `/`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Box<[u8]>);

impl Name {
    /// Create a name from raw bytes.
    ///
    /// Fails if the bytes are empty or contain `/` or a NUL byte.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, PathError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(PathError::InvalidName {
                name: String::new(),
                reason: "empty name",
            });
        }
        if bytes.contains(&SEPARATOR) {
            return Err(PathError::InvalidName {
                name: String::from_utf8_lossy(&bytes).into_owned(),
                reason: "path separator is not allowed",
            });
        }
        if bytes.contains(&0) {
            return Err(PathError::InvalidName {
                name: String::from_utf8_lossy(&bytes).into_owned(),
                reason: "NUL byte is not allowed",
            });
        }
        Ok(Self(bytes.into_boxed_slice()))
    }

    /// Segment bytes produced by the path splitter, already free of `/`.
    fn from_segment(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }

    /// The raw bytes of this name.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether this name starts with a dot.
    pub fn is_hidden(&self) -> bool {
        self.0.first() == Some(&b'.')
    }

    fn extension_separator_or(&self, default: usize) -> usize {
        match self.0.iter().rposition(|&b| b == b'.') {
            Some(i) if i > 0 && i != self.0.len() - 1 => i,
            _ => default,
        }
    }

    /// The name without its extension.
    ///
    /// ```text
    ///  base.ext  ->  base
    ///  base      ->  base
    ///  base.     ->  base.
    /// .base.ext  -> .base
    /// .base      -> .base
    /// ```
    pub fn base(&self) -> &[u8] {
        &self.0[..self.extension_separator_or(self.0.len())]
    }

    /// The extension without the leading dot, empty if there is none.
    pub fn extension(&self) -> &[u8] {
        let start = self.extension_separator_or(self.0.len() - 1) + 1;
        &self.0[start..]
    }

    /// The extension including its leading dot, empty if there is none.
    pub fn dot_extension(&self) -> &[u8] {
        if self.extension().is_empty() {
            &[]
        } else {
            &self.0[self.extension_separator_or(self.0.len())..]
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl AsRef<[u8]> for Name {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// An immutable filesystem location.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    absolute: bool,
    names: Vec<Name>,
}

impl Path {
    /// Parse a path from raw bytes. Never fails.
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Self {
        let bytes = bytes.as_ref();
        let names = bytes
            .split(|&b| b == SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .map(Name::from_segment)
            .collect();
        Self {
            absolute: bytes.first() == Some(&SEPARATOR),
            names,
        }
    }

    /// The filesystem root, `/`.
    pub fn root() -> Self {
        Self {
            absolute: true,
            names: Vec::new(),
        }
    }

    /// Serialize back to the byte form accepted by [`Path::from_bytes`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if self.absolute {
            out.push(SEPARATOR);
        }
        for (i, name) in self.names.iter().enumerate() {
            if i > 0 {
                out.push(SEPARATOR);
            }
            out.extend_from_slice(name.as_bytes());
        }
        out
    }

    /// Convert to a standard library path for use with `std::fs`.
    #[cfg(unix)]
    pub fn to_path_buf(&self) -> std::path::PathBuf {
        use std::os::unix::ffi::OsStringExt;
        std::ffi::OsString::from_vec(self.to_bytes()).into()
    }

    #[cfg(not(unix))]
    pub fn to_path_buf(&self) -> std::path::PathBuf {
        self.to_string().into()
    }

    /// Whether this path starts at the filesystem root.
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// All segments of this path: `"/a/b/c" -> [a, b, c]`.
    pub fn names(&self) -> &[Name] {
        &self.names
    }

    /// The last segment, if any.
    pub fn name(&self) -> Option<&Name> {
        self.names.last()
    }

    /// The parent path, if any.
    ///
    /// ```text
    /// "/a/b" -> "/a"
    /// "/a"   -> "/"
    /// "/"    -> None
    /// "a"    -> None
    /// ""     -> None
    /// ```
    pub fn parent(&self) -> Option<Path> {
        if self.names.is_empty() || (!self.absolute && self.names.len() == 1) {
            return None;
        }
        Some(Self {
            absolute: self.absolute,
            names: self.names[..self.names.len() - 1].to_vec(),
        })
    }

    /// Append `name` to this path. The argument is parsed like any relative
    /// path, so `"b"`, `"b/"` and `"/b"` all append the single segment `b`.
    pub fn child(&self, name: impl AsRef<[u8]>) -> Path {
        self.join(&Path::from_bytes(name))
    }

    /// Append all segments of `other`, ignoring its absoluteness.
    pub fn join(&self, other: &Path) -> Path {
        let mut names = self.names.clone();
        names.extend(other.names.iter().cloned());
        Self {
            absolute: self.absolute,
            names,
        }
    }

    /// Whether the last segment starts with a dot.
    pub fn is_hidden(&self) -> bool {
        self.name().is_some_and(Name::is_hidden)
    }

    /// True if `prefix` is this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.absolute == prefix.absolute && self.names.starts_with(&prefix.names)
    }

    /// This path and all of its ancestors, root first.
    pub fn hierarchy(&self) -> Vec<Path> {
        let mut hierarchy = Vec::with_capacity(self.names.len() + 1);
        let mut current = Some(self.clone());
        while let Some(path) = current {
            current = path.parent();
            hierarchy.push(path);
        }
        hierarchy.reverse();
        hierarchy
    }

    /// Lexically resolve `.` and `..` segments.
    ///
    /// `..` at the root of an absolute path is dropped; leading `..` of a
    /// relative path is kept.
    pub fn normalize(&self) -> Path {
        let mut names: Vec<Name> = Vec::with_capacity(self.names.len());
        for name in &self.names {
            match name.as_bytes() {
                b"." => {}
                b".." => match names.last() {
                    Some(last) if last.as_bytes() != b".." => {
                        names.pop();
                    }
                    _ if self.absolute => {}
                    _ => names.push(name.clone()),
                },
                _ => names.push(name.clone()),
            }
        }
        Self {
            absolute: self.absolute,
            names,
        }
    }

    /// Replace the leading `old_prefix` of this path with `new_prefix`.
    ///
    /// All three paths are normalized first. Fails with
    /// [`PathError::IllegalRebase`] unless this path is rooted under
    /// `old_prefix`.
    ///
    /// ```text
    /// "/a/b".rebase("/a", "/hello") -> "/hello/b"
    /// ```
    pub fn rebase(&self, old_prefix: &Path, new_prefix: &Path) -> Result<Path, PathError> {
        let this = self.normalize();
        let old_prefix = old_prefix.normalize();
        if !this.starts_with(&old_prefix) {
            return Err(PathError::IllegalRebase {
                path: self.clone(),
                prefix: old_prefix,
            });
        }
        let new_prefix = new_prefix.normalize();
        let mut names = new_prefix.names;
        names.extend_from_slice(&this.names[old_prefix.names.len()..]);
        Ok(Self {
            absolute: new_prefix.absolute,
            names,
        })
    }

    /// Resolve a relative path against the current working directory.
    pub fn to_absolute(&self) -> std::io::Result<Path> {
        if self.absolute {
            return Ok(self.clone());
        }
        let cwd = Path::from(std::env::current_dir()?.as_path());
        Ok(cwd.join(self))
    }
}

impl Default for Path {
    /// The empty relative path.
    fn default() -> Self {
        Self {
            absolute: false,
            names: Vec::new(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({:?})", self.to_string())
    }
}

impl From<&str> for Path {
    fn from(path: &str) -> Self {
        Self::from_bytes(path.as_bytes())
    }
}

impl From<String> for Path {
    fn from(path: String) -> Self {
        Self::from_bytes(path.as_bytes())
    }
}

impl From<&[u8]> for Path {
    fn from(path: &[u8]) -> Self {
        Self::from_bytes(path)
    }
}

#[cfg(unix)]
impl From<&std::path::Path> for Path {
    fn from(path: &std::path::Path) -> Self {
        use std::os::unix::ffi::OsStrExt;
        Self::from_bytes(path.as_os_str().as_bytes())
    }
}

#[cfg(not(unix))]
impl From<&std::path::Path> for Path {
    fn from(path: &std::path::Path) -> Self {
        Self::from_bytes(path.to_string_lossy().as_bytes())
    }
}

impl From<std::path::PathBuf> for Path {
    fn from(path: std::path::PathBuf) -> Self {
        Self::from(path.as_path())
    }
}

impl From<&Name> for Path {
    fn from(name: &Name) -> Self {
        Self {
            absolute: false,
            names: vec![name.clone()],
        }
    }
}

/// Paths serialize as a string when they are valid UTF-8 and as raw bytes
/// otherwise; both forms deserialize.
impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let bytes = self.to_bytes();
        match std::str::from_utf8(&bytes) {
            Ok(s) => serializer.serialize_str(s),
            Err(_) => serializer.serialize_bytes(&bytes),
        }
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PathVisitor;

        impl<'de> Visitor<'de> for PathVisitor {
            type Value = Path;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a path as a string or a byte sequence")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Path, E> {
                Ok(Path::from(v))
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Path, E> {
                Ok(Path::from_bytes(v))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Path, A::Error> {
                let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(b) = seq.next_element::<u8>()? {
                    bytes.push(b);
                }
                Ok(Path::from_bytes(bytes))
            }
        }

        deserializer.deserialize_any(PathVisitor)
    }
}
