//! Level-by-level reconstruction of the work-item forest.
//!
//! The backend only exposes flat relation edges. The assembler walks them
//! breadth-first starting at the root edges: every level's targets are
//! fetched in request-sized chunks, turned into nodes, and the children of
//! the freshly created nodes form the next level. The finished forest is
//! emitted in pre-order so that each item's subtree directly follows it.

use std::collections::HashMap;
use std::time::Duration;

use futures::{stream, StreamExt, TryStreamExt};
use tracing::{debug, error, info, warn};

use crate::batch::{BatchLimit, BatchPlanner};
use crate::error::{AssembleError, AssemblyWarning, ConfigError, FetchError};
use crate::fetcher::RecordFetcher;
use crate::forest::Forest;
use crate::relations::RelationIndex;
use crate::types::{Edge, Node, NodeId, RawRecord};

/// Default number of chunk requests in flight per level
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;

/// Default per-call fetch timeout
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Tuning knobs of the assembler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblerConfig {
    /// Maximum ids per fetch call
    pub batch_limit: BatchLimit,
    /// Chunk requests of one level allowed in flight at once
    pub max_concurrent_fetches: usize,
    /// Upper bound for a single fetch call; `None` waits forever
    pub fetch_timeout: Option<Duration>,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            batch_limit: BatchLimit::default(),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            fetch_timeout: Some(DEFAULT_FETCH_TIMEOUT),
        }
    }
}

impl AssemblerConfig {
    /// Config with a custom batch limit and defaults otherwise
    pub fn with_batch_limit(batch_limit: BatchLimit) -> Self {
        Self {
            batch_limit,
            ..Self::default()
        }
    }

    /// Reject settings the assembler cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_fetches == 0 {
            return Err(ConfigError::InvalidConcurrency(self.max_concurrent_fetches));
        }
        Ok(())
    }
}

/// Counters collected during one assembly run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    /// Traversal levels that issued fetches
    pub levels: usize,
    /// Fetch calls issued
    pub fetch_calls: usize,
    /// Ids sent to the fetcher, duplicates included
    pub records_requested: usize,
    /// Records the fetcher returned
    pub records_received: usize,
    /// Edges never reached from a root
    pub unreachable_edges: usize,
}

/// Outcome of a successful assembly
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    /// Assembled nodes in pre-order
    pub forest: Forest,
    /// Recoverable problems, in the order they were found
    pub warnings: Vec<AssemblyWarning>,
    pub stats: AssemblyStats,
}

/// Builds the work-item forest from relation edges using a record fetcher
#[derive(Debug, Clone)]
pub struct HierarchyAssembler<F> {
    fetcher: F,
    config: AssemblerConfig,
}

/// Mutable state of one traversal
#[derive(Default)]
struct Traversal {
    arena: Vec<Node>,
    slots: HashMap<NodeId, usize>,
    roots: Vec<usize>,
    warnings: Vec<AssemblyWarning>,
    edges_seen: usize,
}

impl Traversal {
    fn warn(&mut self, warning: AssemblyWarning) {
        warn!(id = %warning.id(), "{}", warning);
        self.warnings.push(warning);
    }

    /// Whether `ancestor` is `id` itself or lies on its parent chain
    fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == ancestor {
                return true;
            }
            current = self
                .slots
                .get(&node_id)
                .and_then(|&slot| self.arena[slot].parent);
        }
        false
    }

    /// Warning for an edge whose target already exists in the forest
    fn revisit(&self, edge: &Edge, slot: usize) -> AssemblyWarning {
        match edge.source {
            Some(source) if self.is_ancestor_or_self(edge.target, source) => AssemblyWarning::Cycle {
                id: edge.target,
                parent: source,
            },
            _ => AssemblyWarning::DuplicateTarget {
                id: edge.target,
                kept_parent: self.arena[slot].parent,
                ignored_parent: edge.source,
            },
        }
    }

    /// Add a node and link it to its parent, returning its slot
    fn insert(&mut self, node: Node) -> usize {
        let slot = self.arena.len();
        let id = node.id;
        let parent = node.parent;
        self.arena.push(node);
        self.slots.insert(id, slot);

        match parent {
            None => self.roots.push(slot),
            Some(parent) => {
                if let Some(&parent_slot) = self.slots.get(&parent) {
                    self.arena[parent_slot].children.push(id);
                }
            }
        }
        slot
    }

    /// Emit the arena in pre-order
    fn into_forest(self) -> Forest {
        let Traversal { arena, slots, roots, .. } = self;

        let mut order = Vec::with_capacity(arena.len());
        let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
        while let Some(slot) = stack.pop() {
            order.push(slot);
            stack.extend(
                arena[slot]
                    .children
                    .iter()
                    .rev()
                    .filter_map(|child| slots.get(child).copied()),
            );
        }

        let mut arena: Vec<Option<Node>> = arena.into_iter().map(Some).collect();
        let nodes = order
            .into_iter()
            .filter_map(|slot| arena[slot].take())
            .collect();
        Forest::from_nodes(nodes)
    }
}

impl<F: RecordFetcher> HierarchyAssembler<F> {
    /// Create an assembler with the default configuration
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            config: AssemblerConfig::default(),
        }
    }

    /// Create an assembler with a custom configuration
    pub fn with_config(fetcher: F, config: AssemblerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { fetcher, config })
    }

    /// The active configuration
    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// The wrapped fetcher
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Assemble the forest described by `edges`
    pub async fn assemble(&self, edges: &[Edge]) -> Result<Assembly, AssembleError> {
        let index = RelationIndex::new(edges);
        debug!(
            edges = index.edge_count(),
            roots = index.roots().len(),
            sources = index.source_count(),
            "Indexed work-item relations"
        );
        self.assemble_indexed(&index).await
    }

    /// Assemble the forest from a prebuilt relation index
    pub async fn assemble_indexed(&self, index: &RelationIndex) -> Result<Assembly, AssembleError> {
        self.config.validate()?;

        let mut state = Traversal::default();
        let mut stats = AssemblyStats::default();
        let mut frontier: Vec<Edge> = index.roots().to_vec();
        let mut level = 0;

        while !frontier.is_empty() {
            state.edges_seen += frontier.len();

            // Never re-enter a node materialized on an earlier level
            let mut pending = Vec::with_capacity(frontier.len());
            for edge in frontier {
                match state.slots.get(&edge.target).copied() {
                    Some(slot) => {
                        let warning = state.revisit(&edge, slot);
                        state.warn(warning);
                    }
                    None => pending.push(edge),
                }
            }
            if pending.is_empty() {
                break;
            }

            let targets: Vec<NodeId> = pending.iter().map(|edge| edge.target).collect();
            let mut records = self.fetch_level(level, &targets, &mut stats).await?;

            let mut created = Vec::with_capacity(pending.len());
            for edge in &pending {
                if let Some(&slot) = state.slots.get(&edge.target) {
                    let warning = AssemblyWarning::DuplicateTarget {
                        id: edge.target,
                        kept_parent: state.arena[slot].parent,
                        ignored_parent: edge.source,
                    };
                    state.warn(warning);
                    continue;
                }

                let Some(record) = records.remove(&edge.target) else {
                    state.warn(AssemblyWarning::UnresolvedReference {
                        id: edge.target,
                        parent: edge.source,
                    });
                    continue;
                };

                let node = Node::from_record(record, edge.source);
                debug!(level, "{}", node);
                created.push(state.insert(node));
            }

            info!(level, assembled = created.len(), requested = targets.len(), "Assembled level");

            frontier = created
                .iter()
                .flat_map(|&slot| index.children_of(state.arena[slot].id).iter().copied())
                .collect();
            level += 1;
        }

        stats.levels = level;
        stats.unreachable_edges = index.edge_count().saturating_sub(state.edges_seen);
        if stats.unreachable_edges > 0 {
            debug!(count = stats.unreachable_edges, "Relations not reachable from any root were ignored");
        }

        let warnings = std::mem::take(&mut state.warnings);
        let forest = state.into_forest();
        info!(
            nodes = forest.len(),
            warnings = warnings.len(),
            levels = stats.levels,
            fetch_calls = stats.fetch_calls,
            "Work-item hierarchy assembled"
        );

        Ok(Assembly { forest, warnings, stats })
    }

    /// Fetch every target of one level, keyed by id
    async fn fetch_level(
        &self,
        level: usize,
        targets: &[NodeId],
        stats: &mut AssemblyStats,
    ) -> Result<HashMap<NodeId, RawRecord>, AssembleError> {
        let planner = BatchPlanner::new(self.config.batch_limit);
        let chunk_count = planner.chunk_count(targets.len());
        debug!(level, targets = targets.len(), chunks = chunk_count, "Fetching work items");

        let responses: Vec<Vec<RawRecord>> = stream::iter(planner.split(targets).enumerate())
            .map(|(chunk, ids)| self.fetch_chunk(level, chunk, ids))
            .buffered(self.config.max_concurrent_fetches)
            .try_collect()
            .await?;

        stats.fetch_calls += chunk_count;
        stats.records_requested += targets.len();

        let mut records = HashMap::with_capacity(targets.len());
        for record in responses.into_iter().flatten() {
            stats.records_received += 1;
            records.insert(record.id, record);
        }
        Ok(records)
    }

    async fn fetch_chunk(&self, level: usize, chunk: usize, ids: &[NodeId]) -> Result<Vec<RawRecord>, AssembleError> {
        let call = self.fetcher.fetch(ids);
        let result = match self.config.fetch_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(limit)),
            },
            None => call.await,
        };

        result.map_err(|source| {
            error!(level, chunk, ids = ids.len(), "Fetching work items failed: {}", source);
            AssembleError::Fetch { level, chunk, source }
        })
    }
}

/// Assemble `edges` with `fetcher`, splitting lookups by `limit`
pub async fn assemble<F>(edges: &[Edge], fetcher: &F, limit: BatchLimit) -> Result<Assembly, AssembleError>
where
    F: RecordFetcher + ?Sized,
{
    HierarchyAssembler::with_config(fetcher, AssemblerConfig::with_batch_limit(limit))?
        .assemble(edges)
        .await
}
