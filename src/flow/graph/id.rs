// SPDX-License-Identifier: MIT

//! Hierarchical node identifiers
//!
//! A [`NodeId`] is a path of node numbers starting at the root workflow
//! (`0`). Nodes of the root graph are `0:1`, `0:2`, ...; nodes of a sub-graph
//! owned by `0:5` are `0:5:1`, `0:5:2`, ...

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Stable, hierarchical node identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Vec<u32>);

impl NodeId {
    /// The id of the root workflow
    pub fn root() -> Self {
        Self(vec![0])
    }

    /// Create the id of a direct child of this node
    pub fn child(&self, index: u32) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    /// The id of the graph that owns this node, `None` for the root
    pub fn parent(&self) -> Option<NodeId> {
        if self.0.len() <= 1 {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// The local node number within its owning graph
    pub fn index(&self) -> u32 {
        // never empty: every constructor starts from the root segment
        self.0[self.0.len() - 1]
    }

    /// Check if `self` is `other` or lies somewhere below it
    pub fn is_within(&self, other: &NodeId) -> bool {
        self.0.starts_with(&other.0)
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// The path below the root, as used for page keys
    pub fn suffix(&self) -> NodeIdSuffix {
        NodeIdSuffix(self.0[1..].to_vec())
    }

    /// Resolve a suffix against the root id of this session
    pub fn with_suffix(&self, suffix: &NodeIdSuffix) -> NodeId {
        let mut path = self.0.clone();
        path.extend_from_slice(&suffix.0);
        Self(path)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_path(f, &self.0)
    }
}

/// Error returned when a textual id cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid node id '{0}'")]
pub struct ParseNodeIdError(pub String);

impl FromStr for NodeId {
    type Err = ParseNodeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = parse_path(s)?;
        if path.is_empty() {
            return Err(ParseNodeIdError(s.to_string()));
        }
        Ok(Self(path))
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Node path relative to the root workflow (`5:2` for `0:5:2`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeIdSuffix(Vec<u32>);

impl NodeIdSuffix {
    pub fn child(&self, index: u32) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodeIdSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_path(f, &self.0)
    }
}

impl FromStr for NodeIdSuffix {
    type Err = ParseNodeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_path(s).map(Self)
    }
}

fn write_path(f: &mut fmt::Formatter<'_>, path: &[u32]) -> fmt::Result {
    for (i, segment) in path.iter().enumerate() {
        if i > 0 {
            f.write_str(":")?;
        }
        write!(f, "{}", segment)?;
    }
    Ok(())
}

fn parse_path(s: &str) -> Result<Vec<u32>, ParseNodeIdError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    trimmed
        .split(':')
        .map(|part| {
            part.trim()
                .parse::<u32>()
                .map_err(|_| ParseNodeIdError(s.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let id = NodeId::root().child(5).child(2);
        assert_eq!(id.to_string(), "0:5:2");
        assert_eq!("0:5:2".parse::<NodeId>().unwrap(), id);
        assert!("0:x".parse::<NodeId>().is_err());
        assert!("".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_parent_and_index() {
        let id = NodeId::root().child(5).child(2);
        assert_eq!(id.index(), 2);
        assert_eq!(id.parent(), Some(NodeId::root().child(5)));
        assert_eq!(NodeId::root().parent(), None);
    }

    #[test]
    fn test_is_within() {
        let meta = NodeId::root().child(5);
        assert!(meta.child(1).is_within(&meta));
        assert!(meta.is_within(&NodeId::root()));
        assert!(!NodeId::root().child(6).is_within(&meta));
    }

    #[test]
    fn test_suffix_round_trip() {
        let id = NodeId::root().child(5).child(2);
        let suffix = id.suffix();
        assert_eq!(suffix.to_string(), "5:2");
        assert_eq!(NodeId::root().with_suffix(&suffix), id);
        assert!(NodeId::root().suffix().is_empty());
    }

    #[test]
    fn test_ordering_is_numeric_per_segment() {
        let mut ids = vec![
            NodeId::root().child(14),
            NodeId::root().child(2),
            NodeId::root().child(1),
        ];
        ids.sort();
        let printed: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        assert_eq!(printed, vec!["0:1", "0:2", "0:14"]);
    }

    #[test]
    fn test_serde_as_string() {
        let id = NodeId::root().child(3);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"0:3\"");
        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
