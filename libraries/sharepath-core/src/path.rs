//! Library-relative paths and leaf-name validation.

use crate::error::{LibraryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters SharePoint refuses in file and folder names.
const FORBIDDEN_CHARS: &[char] = &['"', '*', ':', '<', '>', '?', '|'];

/// A normalized path relative to the Library Root.
///
/// Segments are never empty and never `.` or `..`. The empty path is the
/// Library Root itself. Identity is the full segment list, so two handles
/// with the same leaf name in different folders never compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LibraryPath {
    segments: Vec<String>,
}

impl LibraryPath {
    /// The Library Root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Normalize and validate a caller-supplied path.
    ///
    /// Surrounding whitespace is trimmed, `\` becomes `/`, leading and
    /// trailing separators are dropped and repeated separators collapse.
    /// `.`/`..` segments, drive letters, URLs, UNC prefixes and characters
    /// SharePoint forbids are rejected before anything touches the network.
    pub fn parse(raw: &str) -> Result<Self> {
        let unified = raw.trim().replace('\\', "/");

        if unified.starts_with("//") || unified.contains("://") {
            return Err(LibraryError::invalid_path(raw, "absolute paths are not allowed"));
        }

        let mut segments = Vec::new();
        for (index, segment) in unified.split('/').filter(|s| !s.is_empty()).enumerate() {
            if index == 0 && is_drive_prefix(segment) {
                return Err(LibraryError::invalid_path(raw, "absolute paths are not allowed"));
            }
            check_segment(segment).map_err(|reason| LibraryError::invalid_path(raw, reason))?;
            segments.push(segment.to_string());
        }

        Ok(Self { segments })
    }

    /// Build a path from segments that were already validated.
    pub(crate) fn from_segments(segments: Vec<String>) -> Self {
        Self { segments }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Leaf name, `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Parent folder, `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    /// The first `len` segments.
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }

    /// Append a leaf name that has passed [`validate_name`].
    pub fn join(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    /// Whether `self` lies strictly below `other`.
    pub fn is_descendant_of(&self, other: &Self) -> bool {
        self.segments.len() > other.segments.len()
            && self.segments.starts_with(&other.segments)
    }
}

impl fmt::Display for LibraryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl TryFrom<String> for LibraryPath {
    type Error = LibraryError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<LibraryPath> for String {
    fn from(value: LibraryPath) -> Self {
        value.to_string()
    }
}

impl std::str::FromStr for LibraryPath {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Validate a leaf name used for rename or as a local download name.
///
/// The name must not contain path separators; it is never trimmed or
/// otherwise corrected.
pub fn validate_name(name: &str) -> Result<&str> {
    if name.contains('/') || name.contains('\\') {
        return Err(LibraryError::invalid_name(name, "must not contain path separators"));
    }
    check_segment(name).map_err(|reason| LibraryError::invalid_name(name, reason))?;
    if name.trim() != name {
        return Err(LibraryError::invalid_name(
            name,
            "must not start or end with whitespace",
        ));
    }
    Ok(name)
}

fn check_segment(segment: &str) -> std::result::Result<(), String> {
    if segment.trim().is_empty() {
        return Err("empty segment".to_string());
    }
    if segment == "." || segment == ".." {
        return Err(format!("'{}' segments are not allowed", segment));
    }
    if let Some(c) = segment.chars().find(|c| FORBIDDEN_CHARS.contains(c) || c.is_control()) {
        return Err(format!("forbidden character {:?}", c));
    }
    Ok(())
}

fn is_drive_prefix(segment: &str) -> bool {
    let mut chars = segment.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(letter), Some(':'), None) if letter.is_ascii_alphabetic()
    )
}
