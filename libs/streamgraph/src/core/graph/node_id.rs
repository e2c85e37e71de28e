// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

use crate::core::{Result, StreamError};

/// Unique, caller-chosen identifier of a graph node.
///
/// Must be non-empty and free of whitespace and control characters, since it
/// also names the node's worker threads and appears in every log line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Validate and wrap an id.
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(StreamError::InvalidNodeId("node id cannot be empty".into()));
        }
        if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(StreamError::InvalidNodeId(format!(
                "'{}' contains whitespace or control characters",
                id.escape_debug()
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for NodeId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for NodeId {
    type Error = StreamError;

    fn try_from(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NodeId {
    type Error = StreamError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<NodeId> for &str {
    fn eq(&self, other: &NodeId) -> bool {
        *self == other.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ids() {
        assert!(NodeId::parse("numeric_provider").is_ok());
        assert!(NodeId::parse("proc-1.a").is_ok());
        assert_eq!(NodeId::parse("w1").unwrap(), "w1");
    }

    #[test]
    fn test_invalid_ids() {
        assert!(matches!(
            NodeId::parse(""),
            Err(StreamError::InvalidNodeId(_))
        ));
        assert!(NodeId::parse("has space").is_err());
        assert!(NodeId::parse("tab\there").is_err());
    }

    #[test]
    fn test_hash_lookup_by_str() {
        let mut map = std::collections::HashMap::new();
        map.insert(NodeId::parse("a").unwrap(), 1);
        assert_eq!(map.get("a"), Some(&1));
    }
}
