//! Core data model: node identifiers, relation edges, fetched records and
//! assembled nodes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a work item, stable across queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Get the raw integer value
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// A directed parent -> child relation. `source == None` marks a root edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    /// Parent work item, if any
    pub source: Option<NodeId>,
    /// Child work item
    pub target: NodeId,
}

impl Edge {
    /// Create a root edge (no parent)
    pub fn root(target: impl Into<NodeId>) -> Self {
        Self {
            source: None,
            target: target.into(),
        }
    }

    /// Create a parent -> child edge
    pub fn child(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: Some(source.into()),
            target: target.into(),
        }
    }

    /// Whether this edge has no parent
    pub fn is_root(&self) -> bool {
        self.source.is_none()
    }
}

/// Category of a work item
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkItemType {
    /// Top level item
    Epic,
    /// Child of an epic
    Feature,
    /// User story, leaf of the hierarchy
    Story,
    /// Any other backend type, kept verbatim
    Other(String),
}

impl WorkItemType {
    /// Backend display name of the type
    pub fn as_str(&self) -> &str {
        match self {
            WorkItemType::Epic => "Epic",
            WorkItemType::Feature => "Feature",
            WorkItemType::Story => "User Story",
            WorkItemType::Other(name) => name,
        }
    }
}

impl From<&str> for WorkItemType {
    fn from(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("epic") {
            WorkItemType::Epic
        } else if trimmed.eq_ignore_ascii_case("feature") {
            WorkItemType::Feature
        } else if trimmed.eq_ignore_ascii_case("user story") || trimmed.eq_ignore_ascii_case("story") {
            WorkItemType::Story
        } else {
            WorkItemType::Other(value.to_string())
        }
    }
}

impl From<String> for WorkItemType {
    fn from(value: String) -> Self {
        WorkItemType::from(value.as_str())
    }
}

impl From<WorkItemType> for String {
    fn from(value: WorkItemType) -> Self {
        match value {
            WorkItemType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl WorkItemType {
    /// Re-parse through the display name so `Other` never holds a known type
    pub fn normalized(self) -> Self {
        match self {
            WorkItemType::Other(name) => WorkItemType::from(name),
            known => known,
        }
    }
}

impl Default for WorkItemType {
    fn default() -> Self {
        WorkItemType::Other(String::new())
    }
}

impl fmt::Display for WorkItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split a backend tag string on `;` and `,`, dropping blanks
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split([';', ','])
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// A work item as returned by the record fetcher
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRecord {
    pub id: NodeId,
    pub title: String,
    pub description: Option<String>,
    pub work_item_type: WorkItemType,
    pub acceptance_criteria: Option<String>,
    /// Unparsed tag string, e.g. "ui; backend"
    pub tags: Option<String>,
}

impl RawRecord {
    /// Minimal record with just an id, title and type
    pub fn new(id: impl Into<NodeId>, title: impl Into<String>, work_item_type: WorkItemType) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            work_item_type,
            ..Default::default()
        }
    }
}

/// An assembled node of the work-item forest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub title: String,
    pub description: Option<String>,
    pub acceptance_criteria: Option<String>,
    #[serde(rename = "type")]
    pub work_item_type: WorkItemType,
    #[serde(default)]
    pub tags: Vec<String>,
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub children: Vec<NodeId>,
}

impl Node {
    /// Build a childless node from a fetched record
    pub fn from_record(record: RawRecord, parent: Option<NodeId>) -> Self {
        let tags = record.tags.as_deref().map(parse_tags).unwrap_or_default();
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            acceptance_criteria: record.acceptance_criteria,
            work_item_type: record.work_item_type.normalized(),
            tags,
            parent,
            children: Vec::new(),
        }
    }

    /// Whether this node has no parent
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}. {} [{}]", self.work_item_type, self.id, self.title, self.tags.join("; "))
    }
}
