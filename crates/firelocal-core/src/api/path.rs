//! Database node paths.

use std::fmt;
use std::str::FromStr;

use super::ApiError;

/// Characters the Realtime Database rejects in keys.
const FORBIDDEN_KEY_CHARS: [char; 5] = ['.', '$', '#', '[', ']'];

/// Maximum key length in bytes accepted by the database.
const MAX_KEY_BYTES: usize = 768;

/// A validated, slash-separated path to a database node.
///
/// Empty segments are dropped, so `"/tasks//a/"` and `"tasks/a"` name the
/// same node. The empty path is the database root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath {
    segments: Vec<String>,
}

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let mut path = Self::root();
        for segment in raw.split('/').filter(|s| !s.is_empty()) {
            path = path.child(segment)?;
        }
        Ok(path)
    }

    /// Path of a direct child of this node.
    pub fn child(&self, key: &str) -> Result<Self, ApiError> {
        validate_key(key)?;
        let mut segments = self.segments.clone();
        segments.push(key.to_string());
        Ok(Self { segments })
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, parents) = self.segments.split_last()?;
        Some(Self {
            segments: parents.to_vec(),
        })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Key of the node this path names, `None` for the root.
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }
}

fn validate_key(key: &str) -> Result<(), ApiError> {
    let invalid = |reason| ApiError::InvalidPath {
        path: key.to_string(),
        reason,
    };
    if key.is_empty() {
        return Err(invalid("empty key"));
    }
    if key.contains('/') {
        return Err(invalid("key contains '/'"));
    }
    if key.len() > MAX_KEY_BYTES {
        return Err(invalid("key longer than 768 bytes"));
    }
    if key.chars().any(|c| FORBIDDEN_KEY_CHARS.contains(&c)) {
        return Err(invalid("key contains one of . $ # [ ]"));
    }
    if key.chars().any(|c| c.is_ascii_control()) {
        return Err(invalid("key contains a control character"));
    }
    Ok(())
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

impl FromStr for NodePath {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
