//! In-memory fetchers and edge sources for tests.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{FetchError, FetchResult};
use crate::fetcher::{EdgeSource, RecordFetcher};
use crate::types::{Edge, NodeId, RawRecord, WorkItemType};

/// Record fetcher backed by a fixed map of records.
///
/// Every call is recorded so tests can assert on chunking. Records are
/// returned in reverse request order to make sure callers join by id.
#[derive(Default)]
pub struct StaticRecordFetcher {
    records: HashMap<NodeId, RawRecord>,
    calls: Mutex<Vec<Vec<NodeId>>>,
    fail_on_call: Option<(usize, FetchError)>,
    max_chunk: Option<usize>,
}

impl fmt::Debug for StaticRecordFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticRecordFetcher")
            .field("record_count", &self.records.len())
            .field("call_count", &self.calls.lock().len())
            .finish()
    }
}

impl StaticRecordFetcher {
    /// Creates an empty fetcher that resolves nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fetcher serving the given records.
    pub fn with_records(records: impl IntoIterator<Item = RawRecord>) -> Self {
        let mut fetcher = Self::new();
        for record in records {
            fetcher.insert(record);
        }
        fetcher
    }

    /// Creates a fetcher whose records are titled by their id.
    pub fn titled_by_id(ids: impl IntoIterator<Item = u32>) -> Self {
        Self::with_records(
            ids.into_iter()
                .map(|id| RawRecord::new(id, id.to_string(), WorkItemType::Story)),
        )
    }

    /// Adds or replaces a record.
    pub fn insert(&mut self, record: RawRecord) {
        self.records.insert(record.id, record);
    }

    /// Removes a record so lookups for it come back empty.
    pub fn remove(&mut self, id: impl Into<NodeId>) -> Option<RawRecord> {
        self.records.remove(&id.into())
    }

    /// Makes the zero-based `call` fail with `error`.
    pub fn fail_on_call(mut self, call: usize, error: FetchError) -> Self {
        self.fail_on_call = Some((call, error));
        self
    }

    /// Rejects chunks larger than `max` the way the backend would.
    pub fn with_max_chunk(mut self, max: usize) -> Self {
        self.max_chunk = Some(max);
        self
    }

    /// Id lists of every call so far, in call order.
    pub fn calls(&self) -> Vec<Vec<NodeId>> {
        self.calls.lock().clone()
    }

    /// Number of calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl RecordFetcher for StaticRecordFetcher {
    async fn fetch(&self, ids: &[NodeId]) -> FetchResult<Vec<RawRecord>> {
        let call = {
            let mut calls = self.calls.lock();
            calls.push(ids.to_vec());
            calls.len() - 1
        };

        if let Some(max) = self.max_chunk {
            if ids.len() > max {
                return Err(FetchError::ChunkTooLarge { len: ids.len(), max });
            }
        }

        if let Some((failing_call, error)) = &self.fail_on_call {
            if *failing_call == call {
                return Err(error.clone());
            }
        }

        Ok(ids
            .iter()
            .rev()
            .filter_map(|id| self.records.get(id).cloned())
            .collect())
    }
}

/// Edge source returning a fixed edge list, or a fixed error.
#[derive(Debug)]
pub struct StaticEdgeSource {
    result: FetchResult<Vec<Edge>>,
    calls: Mutex<usize>,
}

impl StaticEdgeSource {
    /// Creates a source returning `edges`.
    pub fn new(edges: Vec<Edge>) -> Self {
        Self {
            result: Ok(edges),
            calls: Mutex::new(0),
        }
    }

    /// Creates a source that always fails with `error`.
    pub fn failing(error: FetchError) -> Self {
        Self {
            result: Err(error),
            calls: Mutex::new(0),
        }
    }

    /// Number of queries so far.
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl EdgeSource for StaticEdgeSource {
    async fn fetch_edges(&self) -> FetchResult<Vec<Edge>> {
        *self.calls.lock() += 1;
        self.result.clone()
    }
}
