use derive_more::Display;
use thiserror::Error;

use crate::NodeName;

/// A store-relative location of a node or artifact.
///
/// A node path is a non-empty sequence of `/`-separated segments.
/// Segments must not be empty, `.` or `..`, so a node path has no leading or trailing `/`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display("{_0}")]
pub struct NodePath(String);

/// An invalid node path.
#[derive(Clone, Debug, Error)]
#[error("invalid node path {0}")]
pub struct NodePathError(String);

impl NodePath {
    /// Create a new node path from `path`.
    ///
    /// # Errors
    /// Returns [`NodePathError`] if `path` is not valid according to [`NodePath::validate`].
    pub fn new(path: impl Into<String>) -> Result<Self, NodePathError> {
        let path = path.into();
        if Self::validate(&path) {
            Ok(Self(path))
        } else {
            Err(NodePathError(path))
        }
    }

    /// Extracts a string slice of the underlying path [String].
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Validates a node path.
    #[must_use]
    pub fn validate(path: &str) -> bool {
        !path.is_empty()
            && !path.contains('\\')
            && path
                .split('/')
                .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
    }

    /// Returns the final segment of the path.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Returns the parent of the path, or [`None`] for a single segment path.
    #[must_use]
    pub fn parent(&self) -> Option<NodePath> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| NodePath(parent.to_string()))
    }

    /// Returns the segments of the path.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Returns true if `self` is `prefix` or lies beneath it.
    #[must_use]
    pub fn starts_with(&self, prefix: &NodePath) -> bool {
        self.0
            .strip_prefix(prefix.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

impl AsRef<str> for NodePath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for NodePath {
    type Error = NodePathError;

    fn try_from(path: &str) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

impl TryFrom<String> for NodePath {
    type Error = NodePathError;

    fn try_from(path: String) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

impl From<NodeName> for NodePath {
    fn from(name: NodeName) -> Self {
        Self(name.as_str().to_string())
    }
}

/// Resolve the location of `name` beneath `parent`, with an optional file `extension`.
///
/// This is a literal concatenation of `parent`, `/`, `name` and, if present, `.` and `extension`.
/// Nothing is checked for existence and no normalisation is performed.
/// `name` is a [`NodeName`], so it always forms exactly one path segment.
#[must_use]
pub fn resolve(parent: &NodePath, name: &NodeName, extension: Option<&str>) -> NodePath {
    let mut path = String::with_capacity(
        parent.as_str().len() + name.as_str().len() + extension.map_or(0, |ext| ext.len() + 1) + 1,
    );
    path.push_str(parent.as_str());
    path.push('/');
    path.push_str(name.as_str());
    if let Some(extension) = extension {
        path.push('.');
        path.push_str(extension);
    }
    NodePath(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_path() {
        assert!(NodePath::new("a").is_ok());
        assert!(NodePath::new("a/b/c.data").is_ok());
        assert!(NodePath::new("").is_err());
        assert!(NodePath::new("/a").is_err());
        assert!(NodePath::new("a/").is_err());
        assert!(NodePath::new("a//b").is_err());
        assert!(NodePath::new("a/../b").is_err());
        assert!(NodePath::new("./a").is_err());
        assert!(NodePath::new("a\\b").is_err());
    }

    #[test]
    fn node_path_parts() {
        let path = NodePath::new("root/group/dset").unwrap();
        assert_eq!(path.file_name(), "dset");
        assert_eq!(path.parent(), Some(NodePath::new("root/group").unwrap()));
        assert_eq!(NodePath::new("root").unwrap().parent(), None);
        assert_eq!(path.segments().collect::<Vec<_>>(), ["root", "group", "dset"]);
        assert!(path.starts_with(&NodePath::new("root").unwrap()));
        assert!(path.starts_with(&path));
        assert!(!NodePath::new("rootx/a").unwrap().starts_with(&NodePath::new("root").unwrap()));
    }

    #[test]
    fn resolve_paths() {
        let parent = NodePath::new("file.h5tut/group").unwrap();
        let name = NodeName::new("dset").unwrap();
        assert_eq!(resolve(&parent, &name, None).as_str(), "file.h5tut/group/dset");
        assert_eq!(
            resolve(&parent, &name, Some("dataspace")).as_str(),
            "file.h5tut/group/dset.dataspace"
        );
        // a resolved path is always a valid node path
        assert!(NodePath::validate(resolve(&parent, &name, Some("data")).as_str()));
    }
}
