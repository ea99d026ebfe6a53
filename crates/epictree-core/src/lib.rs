//!
//! epictree core - work-item hierarchy assembly
//!
//! The backend answers a hierarchy query with a flat list of parent -> child
//! relation edges. This crate turns that list back into an ordered forest of
//! work items:
//!
//! * [`RelationIndex`] groups the edges by source once per run
//! * [`BatchPlanner`] splits id lists into request-sized chunks
//! * [`HierarchyAssembler`] walks the relations level by level, resolving
//!   records through a [`RecordFetcher`] and emitting a pre-ordered [`Forest`]
//!
//! ```
//! use epictree_core::{assemble, BatchLimit, Edge, NodeId};
//! use epictree_core::testing::StaticRecordFetcher;
//!
//! # tokio_test::block_on(async {
//! let edges = vec![Edge::root(1), Edge::child(1, 2), Edge::child(1, 3), Edge::child(2, 4)];
//! let fetcher = StaticRecordFetcher::titled_by_id([1, 2, 3, 4]);
//!
//! let assembly = assemble(&edges, &fetcher, BatchLimit::default()).await.unwrap();
//! assert_eq!(assembly.forest.ids(), vec![NodeId(1), NodeId(2), NodeId(4), NodeId(3)]);
//! # });
//! ```

#![forbid(unsafe_code)]

/// Level-by-level forest assembly
pub mod assembler;

/// Id chunking under a per-request limit
pub mod batch;

/// Error and warning types
pub mod error;

/// Backend capability traits
pub mod fetcher;

/// The assembled forest
pub mod forest;

/// Source-keyed relation index
pub mod relations;

/// Core data model
pub mod types;

/// In-memory fakes for tests
#[cfg(feature = "testing")]
pub mod testing;

pub use assembler::{assemble, AssemblerConfig, Assembly, AssemblyStats, HierarchyAssembler};
pub use batch::{split, BatchLimit, BatchPlanner, DEFAULT_BATCH_LIMIT};
pub use error::{AssembleError, AssemblyWarning, ConfigError, FetchError, FetchResult};
pub use fetcher::{EdgeSource, RecordFetcher};
pub use forest::{Forest, ForestError};
pub use relations::RelationIndex;
pub use types::{parse_tags, Edge, Node, NodeId, RawRecord, WorkItemType};
