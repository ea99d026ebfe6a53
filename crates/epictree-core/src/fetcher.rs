//! Backend capabilities the assembler depends on.
//!
//! Concrete implementations live outside this crate (the HTTP client in
//! `epictree-azdo`, in-memory fakes under the `testing` feature).

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::FetchResult;
use crate::types::{Edge, NodeId, RawRecord};

/// Resolves full records for a chunk of ids.
///
/// The returned records may come back in any order and may omit ids the
/// backend could not resolve; callers join by id. Any error is fatal to the
/// run.
#[async_trait]
pub trait RecordFetcher: Send + Sync {
    /// Fetch the records for `ids`. `ids` never exceeds the configured batch limit.
    async fn fetch(&self, ids: &[NodeId]) -> FetchResult<Vec<RawRecord>>;
}

/// Provides the flat relation edge list of the stored hierarchy query
#[async_trait]
pub trait EdgeSource: Send + Sync {
    /// Run the relation query once and return every edge in backend order
    async fn fetch_edges(&self) -> FetchResult<Vec<Edge>>;
}

#[async_trait]
impl<T: RecordFetcher + ?Sized> RecordFetcher for &T {
    async fn fetch(&self, ids: &[NodeId]) -> FetchResult<Vec<RawRecord>> {
        (**self).fetch(ids).await
    }
}

#[async_trait]
impl<T: RecordFetcher + ?Sized> RecordFetcher for Arc<T> {
    async fn fetch(&self, ids: &[NodeId]) -> FetchResult<Vec<RawRecord>> {
        (**self).fetch(ids).await
    }
}

#[async_trait]
impl<T: EdgeSource + ?Sized> EdgeSource for &T {
    async fn fetch_edges(&self) -> FetchResult<Vec<Edge>> {
        (**self).fetch_edges().await
    }
}

#[async_trait]
impl<T: EdgeSource + ?Sized> EdgeSource for Arc<T> {
    async fn fetch_edges(&self) -> FetchResult<Vec<Edge>> {
        (**self).fetch_edges().await
    }
}
