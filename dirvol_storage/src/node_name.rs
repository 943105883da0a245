use derive_more::Display;
use thiserror::Error;

/// The name of a node in a `dirvol` hierarchy.
///
/// A node name is exactly one path segment. It must not be empty, must not be `.` or `..`, and must not contain a path separator (`/` or `\`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display("{_0}")]
pub struct NodeName(String);

/// An invalid node name.
#[derive(Clone, Debug, Error)]
#[error("invalid node name {0}")]
pub struct NodeNameError(String);

impl NodeName {
    /// Create a new node name from `name`.
    ///
    /// # Errors
    /// Returns [`NodeNameError`] if `name` is not valid according to [`NodeName::validate`].
    pub fn new(name: impl Into<String>) -> Result<Self, NodeNameError> {
        let name = name.into();
        if Self::validate(&name) {
            Ok(Self(name))
        } else {
            Err(NodeNameError(name))
        }
    }

    /// Extracts a string slice of the underlying name [String].
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Validates a node name.
    #[must_use]
    pub fn validate(name: &str) -> bool {
        !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
    }
}

impl AsRef<str> for NodeName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for NodeName {
    type Error = NodeNameError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}

impl TryFrom<String> for NodeName {
    type Error = NodeNameError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_name() {
        assert!(NodeName::new("a").is_ok());
        assert!(NodeName::new("level_1_group_1").is_ok());
        assert!(NodeName::new("file_ops.h5tut").is_ok());
        assert!(NodeName::new(".hidden").is_ok());
        assert!(NodeName::new("").is_err());
        assert!(NodeName::new(".").is_err());
        assert!(NodeName::new("..").is_err());
        assert!(NodeName::new("a/b").is_err());
        assert!(NodeName::new("a\\b").is_err());
        assert_eq!(NodeName::new("dset").unwrap().to_string(), "dset");
    }
}
