//! Hierarchy node paths.

use derive_more::Display;
use thiserror::Error;

use crate::storage::{StoreKey, StorePrefix};

/// The path of a node (group or dataset) within a container.
///
/// A node path always starts with `/`, the container root. A non-root path
/// cannot end with `/` and cannot contain empty names.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub struct NodePath(String);

/// An invalid node path.
#[derive(Debug, Error)]
#[error("invalid node path {_0}")]
pub struct NodePathError(String);

impl NodePath {
    /// Create a new node path from `path`.
    ///
    /// # Errors
    /// Returns [`NodePathError`] if `path` is not valid according to
    /// [`NodePath::validate`].
    pub fn new(path: &str) -> Result<Self, NodePathError> {
        if Self::validate(path) {
            Ok(Self(path.to_string()))
        } else {
            Err(NodePathError(path.to_string()))
        }
    }

    /// The root node.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Returns true if this is the root node.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Extracts a string slice of the node path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name of the node, empty for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// The path of the parent node, or [`None`] for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rsplit_once('/') {
            Some(("", _)) => Some(Self::root()),
            Some((parent, _)) => Some(Self(parent.to_string())),
            None => None,
        }
    }

    /// The path of the child node `name`.
    ///
    /// # Errors
    /// Returns [`NodePathError`] if `name` is empty or contains `/`.
    pub fn child(&self, name: &str) -> Result<Self, NodePathError> {
        if name.is_empty() || name.contains('/') {
            return Err(NodePathError(name.to_string()));
        }
        if self.is_root() {
            Self::new(&format!("/{name}"))
        } else {
            Self::new(&format!("{}/{name}", self.0))
        }
    }

    /// The store prefix of the node, under which all of its keys live.
    #[must_use]
    #[allow(clippy::missing_panics_doc)]
    pub fn prefix(&self) -> StorePrefix {
        if self.is_root() {
            StorePrefix::root()
        } else {
            StorePrefix::new(format!("{}/", &self.0[1..])).expect("valid node paths map to valid prefixes")
        }
    }

    /// The store key of the file `tail` within the node, e.g. a metadata
    /// file name or a chunk key.
    #[must_use]
    #[allow(clippy::missing_panics_doc)]
    pub fn key(&self, tail: &str) -> StoreKey {
        StoreKey::new(format!("{}{tail}", self.prefix().as_str()))
            .expect("valid node paths and tails map to valid keys")
    }

    /// Validates a node path. A path always starts with `/`, a non-root path
    /// does not end with `/`, and names are non-empty.
    #[must_use]
    pub fn validate(path: &str) -> bool {
        path.eq("/") || (path.starts_with('/') && !path.ends_with('/') && !path.contains("//"))
    }
}

impl TryFrom<&str> for NodePath {
    type Error = NodePathError;

    fn try_from(path: &str) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_path_validation() {
        assert!(NodePath::new("/").is_ok());
        assert!(NodePath::new("/a/b").is_ok());
        assert!(NodePath::new("a/b").is_err());
        assert!(NodePath::new("/a/b/").is_err());
        assert!(NodePath::new("/a//b").is_err());
        assert!(NodePath::new("").is_err());
    }

    #[test]
    fn node_path_navigation() {
        let path = NodePath::new("/volumes/raw").unwrap();
        assert_eq!(path.name(), "raw");
        assert_eq!(path.parent(), Some(NodePath::new("/volumes").unwrap()));
        assert_eq!(NodePath::new("/volumes").unwrap().parent(), Some(NodePath::root()));
        assert_eq!(NodePath::root().parent(), None);
        assert_eq!(
            NodePath::root().child("volumes").unwrap(),
            NodePath::new("/volumes").unwrap()
        );
        assert!(NodePath::root().child("a/b").is_err());
    }

    #[test]
    fn node_path_keys() {
        let path = NodePath::new("/volumes/raw").unwrap();
        assert_eq!(path.prefix().as_str(), "volumes/raw/");
        assert_eq!(path.key(".zarray").as_str(), "volumes/raw/.zarray");
        assert_eq!(path.key("1.2.3").as_str(), "volumes/raw/1.2.3");
        assert_eq!(NodePath::root().key("attributes.json").as_str(), "attributes.json");
    }
}
