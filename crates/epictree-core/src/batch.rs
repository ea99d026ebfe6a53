//! Splitting id lists into request-sized chunks.
//!
//! The record lookup endpoint caps how many ids one request may carry, so
//! every level of the traversal is fetched as a sequence of chunks.

use std::num::NonZeroUsize;
use std::slice::Chunks;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::NodeId;

/// Default maximum number of ids per lookup request
pub const DEFAULT_BATCH_LIMIT: usize = 200;

/// Maximum number of ids per chunk, always positive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct BatchLimit(NonZeroUsize);

impl BatchLimit {
    /// Create a limit, rejecting zero
    pub fn new(limit: usize) -> Result<Self, ConfigError> {
        NonZeroUsize::new(limit)
            .map(Self)
            .ok_or(ConfigError::InvalidBatchLimit(limit))
    }

    /// The limit as a plain number
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for BatchLimit {
    fn default() -> Self {
        Self(NonZeroUsize::new(DEFAULT_BATCH_LIMIT).unwrap_or(NonZeroUsize::MIN))
    }
}

impl TryFrom<usize> for BatchLimit {
    type Error = ConfigError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BatchLimit> for usize {
    fn from(value: BatchLimit) -> Self {
        value.get()
    }
}

/// Plans lookup requests for a sequence of ids
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchPlanner {
    limit: BatchLimit,
}

impl BatchPlanner {
    /// Create a planner with the given limit
    pub fn new(limit: BatchLimit) -> Self {
        Self { limit }
    }

    /// The configured limit
    pub fn limit(&self) -> BatchLimit {
        self.limit
    }

    /// Split `ids` into ordered chunks of at most `limit` ids.
    ///
    /// Concatenating the chunks yields `ids` unchanged. An empty input
    /// yields no chunks at all.
    pub fn split<'a>(&self, ids: &'a [NodeId]) -> Chunks<'a, NodeId> {
        split(ids, self.limit)
    }

    /// Number of chunks `split` produces for `len` ids
    pub fn chunk_count(&self, len: usize) -> usize {
        len.div_ceil(self.limit.get())
    }
}

/// Split `ids` into ordered chunks of at most `limit` ids
pub fn split(ids: &[NodeId], limit: BatchLimit) -> Chunks<'_, NodeId> {
    ids.chunks(limit.get())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(values: &[u32]) -> Vec<NodeId> {
        values.iter().copied().map(NodeId).collect()
    }

    fn limit(value: usize) -> BatchLimit {
        BatchLimit::new(value).unwrap()
    }

    #[test]
    fn test_split_uneven() {
        let input = ids(&[10, 20, 30]);
        let chunks: Vec<Vec<NodeId>> = split(&input, limit(2)).map(<[NodeId]>::to_vec).collect();

        assert_eq!(chunks, vec![ids(&[10, 20]), ids(&[30])]);
    }

    #[test]
    fn test_split_empty_yields_no_chunks() {
        let planner = BatchPlanner::default();
        assert_eq!(planner.split(&[]).count(), 0);
        assert_eq!(planner.chunk_count(0), 0);
    }

    #[test]
    fn test_split_boundary_limits() {
        let input: Vec<NodeId> = (1..=7).map(NodeId).collect();
        let n = input.len();

        for value in [1, n, n + 1] {
            let planner = BatchPlanner::new(limit(value));
            let chunks: Vec<&[NodeId]> = planner.split(&input).collect();

            assert_eq!(chunks.len(), n.div_ceil(value), "limit {}", value);
            assert_eq!(chunks.len(), planner.chunk_count(n));
            assert!(chunks.iter().all(|chunk| chunk.len() <= value));

            let joined: Vec<NodeId> = chunks.concat();
            assert_eq!(joined, input, "limit {}", value);
        }
    }

    #[test]
    fn test_split_keeps_duplicates_and_order() {
        let input = ids(&[5, 3, 5, 1, 3]);
        let joined: Vec<NodeId> = split(&input, limit(2)).flatten().copied().collect();
        assert_eq!(joined, input);
    }

    #[test]
    fn test_zero_limit_rejected() {
        assert!(matches!(BatchLimit::new(0), Err(ConfigError::InvalidBatchLimit(0))));
        assert_eq!(BatchLimit::default().get(), DEFAULT_BATCH_LIMIT);
    }

    #[test]
    fn test_limit_deserialization() {
        let parsed: BatchLimit = serde_json::from_str("50").unwrap();
        assert_eq!(parsed.get(), 50);
        assert!(serde_json::from_str::<BatchLimit>("0").is_err());
    }
}
