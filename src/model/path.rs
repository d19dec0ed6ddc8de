//! Owned tree paths

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// An ordered list of labels locating a node, from the root down
///
/// The empty path is the root. Segments are matched exactly and
/// case-sensitively. Tree operations accept any `&[impl AsRef<str>]`;
/// `Path` is the owned form used as a registry key.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<String>);

impl Path {
    /// The root path
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn new<S: AsRef<str>>(segments: &[S]) -> Self {
        Path(segments.iter().map(|s| s.as_ref().to_string()).collect())
    }

    /// Split a dotted string (`"streams.publishes"`) into a path.
    /// Empty segments are dropped, so `""` is the root.
    pub fn parse_dotted(s: &str) -> Self {
        Path(
            s.split('.')
                .filter(|seg| !seg.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// A new path with `segment` appended
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Path(segments)
    }

    /// Whether `prefix` is an ancestor of (or equal to) this path
    pub fn starts_with<S: AsRef<str>>(&self, prefix: &[S]) -> bool {
        prefix.len() <= self.0.len()
            && prefix
                .iter()
                .zip(self.0.iter())
                .all(|(p, s)| p.as_ref() == s)
    }
}

impl Deref for Path {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for Path {
    fn from(segments: Vec<String>) -> Self {
        Path(segments)
    }
}

impl From<&[&str]> for Path {
    fn from(segments: &[&str]) -> Self {
        Path::new(segments)
    }
}

impl<const N: usize> From<[&str; N]> for Path {
    fn from(segments: [&str; N]) -> Self {
        Path::new(&segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        write!(f, "{}", self.0.join("."))
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({:?})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotted() {
        let path = Path::parse_dotted("streams.publishes.topic1");
        assert_eq!(path.segments(), &["streams", "publishes", "topic1"]);
        assert!(Path::parse_dotted("").is_root());
        assert_eq!(Path::parse_dotted("a..b").len(), 2);
    }

    #[test]
    fn test_starts_with() {
        let path = Path::from(["a", "b", "c"]);
        assert!(path.starts_with(&["a", "b"]));
        assert!(path.starts_with::<&str>(&[]));
        assert!(!path.starts_with(&["a", "c"]));
        assert!(!path.starts_with(&["a", "b", "c", "d"]));
    }

    #[test]
    fn test_display() {
        assert_eq!(Path::from(["collector", "listenPort"]).to_string(), "collector.listenPort");
        assert_eq!(Path::root().to_string(), "<root>");
    }
}
