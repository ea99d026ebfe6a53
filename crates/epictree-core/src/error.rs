use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::types::NodeId;

/// Failure of a backend call. Always fatal to the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The backend answered with a non-success status
    #[error("Backend request failed with status {status}: {reason}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Reason phrase or error body reported by the backend
        reason: String,
    },

    /// Connection-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The call did not finish in time
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The response body could not be decoded
    #[error("Failed to decode backend response: {0}")]
    Decode(String),

    /// The relation query returned no edge list
    #[error("Malformed edge list: {0}")]
    MalformedEdgeList(String),

    /// A chunk exceeded the per-request id limit
    #[error("Chunk of {len} ids exceeds the backend limit of {max}")]
    ChunkTooLarge {
        /// Ids in the rejected chunk
        len: usize,
        /// Largest accepted chunk
        max: usize,
    },
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Invalid assembler settings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Batch limit must be positive, got {0}")]
    InvalidBatchLimit(usize),

    #[error("Concurrent fetch limit must be positive, got {0}")]
    InvalidConcurrency(usize),
}

/// Fatal assembly failure. Nothing may be persisted after one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssembleError {
    #[error("Failed to fetch records for level {level}, chunk {chunk}: {source}")]
    Fetch {
        /// Zero-based traversal depth
        level: usize,
        /// Zero-based chunk index within the level
        chunk: usize,
        #[source]
        source: FetchError,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl AssembleError {
    /// The underlying fetch failure, if any
    pub fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            AssembleError::Fetch { source, .. } => Some(source),
            AssembleError::Config(_) => None,
        }
    }
}

/// Recoverable problem found during assembly. The offending edge is skipped
/// and traversal continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyWarning {
    /// The fetcher returned no record for an edge target
    UnresolvedReference {
        id: NodeId,
        parent: Option<NodeId>,
    },

    /// The same id is the target of more than one edge
    DuplicateTarget {
        id: NodeId,
        kept_parent: Option<NodeId>,
        ignored_parent: Option<NodeId>,
    },

    /// An edge leads back to one of its own ancestors
    Cycle {
        id: NodeId,
        parent: NodeId,
    },
}

impl AssemblyWarning {
    /// Id of the work item the warning is about
    pub fn id(&self) -> NodeId {
        match self {
            AssemblyWarning::UnresolvedReference { id, .. }
            | AssemblyWarning::DuplicateTarget { id, .. }
            | AssemblyWarning::Cycle { id, .. } => *id,
        }
    }
}

struct ParentFormat(Option<NodeId>);

impl fmt::Display for ParentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, "{}", id),
            None => f.write_str("<root>"),
        }
    }
}

impl fmt::Display for AssemblyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssemblyWarning::UnresolvedReference { id, parent } => write!(
                f,
                "Unable to fetch details for work item {} (parent {})",
                id,
                ParentFormat(*parent)
            ),
            AssemblyWarning::DuplicateTarget { id, kept_parent, ignored_parent } => write!(
                f,
                "Work item {} has more than one parent: kept {}, ignored {}",
                id,
                ParentFormat(*kept_parent),
                ParentFormat(*ignored_parent)
            ),
            AssemblyWarning::Cycle { id, parent } => write!(
                f,
                "Relation {} -> {} closes a cycle, edge ignored",
                parent, id
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let error = FetchError::Status { status: 401, reason: "Unauthorized".into() };
        assert_eq!(format!("{}", error), "Backend request failed with status 401: Unauthorized");
    }

    #[test]
    fn test_assemble_error_keeps_reason() {
        let error = AssembleError::Fetch {
            level: 1,
            chunk: 0,
            source: FetchError::Status { status: 503, reason: "Service Unavailable".into() },
        };

        assert!(error.to_string().contains("Service Unavailable"));
        assert!(matches!(error.fetch_error(), Some(FetchError::Status { status: 503, .. })));
    }

    #[test]
    fn test_warning_display() {
        let unresolved = AssemblyWarning::UnresolvedReference { id: NodeId(4), parent: None };
        assert_eq!(unresolved.to_string(), "Unable to fetch details for work item 4 (parent <root>)");

        let cycle = AssemblyWarning::Cycle { id: NodeId(1), parent: NodeId(3) };
        assert_eq!(cycle.id(), NodeId(1));
        assert_eq!(cycle.to_string(), "Relation 3 -> 1 closes a cycle, edge ignored");
    }
}
