//! epictree
//!
//! Queries the backend for epic -> feature -> story relations, assembles the
//! work-item forest and saves it as a JSON snapshot. A saved snapshot can be
//! reused instead of querying the backend again.

pub mod config;
pub mod error;
pub mod logging;

use epictree_azdo::AzdoClient;
use epictree_core::{
    AssemblerConfig, AssemblyStats, AssemblyWarning, EdgeSource, Forest, HierarchyAssembler,
    RecordFetcher,
};
use epictree_snapshot::{FileSnapshotStore, SnapshotHandle, SnapshotStore};
use tracing::{info, warn};

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use logging::{init_logging, LogFormat, LoggingConfig};

/// Where the forest of a run came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForestOrigin {
    /// Reused from an existing snapshot
    Snapshot,
    /// Assembled from the backend
    Backend,
}

/// Outcome of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub forest: Forest,
    pub origin: ForestOrigin,
    pub warnings: Vec<AssemblyWarning>,
    /// Assembly counters; `None` when the forest came from a snapshot
    pub stats: Option<AssemblyStats>,
    /// Handle of the snapshot written by this run
    pub saved: Option<SnapshotHandle>,
}

/// Load the snapshot under `handle` if there is one.
///
/// A missing snapshot is not an error: the caller falls back to fetching.
pub async fn load_prior(store: &dyn SnapshotStore, handle: &SnapshotHandle) -> AppResult<Option<Forest>> {
    if !store.exists(handle).await? {
        warn!("{} not found, fetching", handle);
        return Ok(None);
    }

    let forest = store.load(handle).await?;
    info!(snapshot = %handle, nodes = forest.len(), "Reusing existing snapshot");
    Ok(Some(forest))
}

/// Run against the configured backend and snapshot file.
///
/// With a `prior` forest the backend is never contacted and nothing is saved.
pub async fn run(config: &AppConfig, prior: Option<Forest>) -> AppResult<RunReport> {
    if let Some(forest) = prior {
        return Ok(reuse(forest));
    }

    config.validate_backend()?;
    let store = FileSnapshotStore::new(&config.snapshot_path);
    let client = AzdoClient::new(config.azdo.clone())?;
    info!(base_url = %client.base_url(), project = %config.azdo.project, "Querying work items");

    run_with(&client, &client, &store, config.assembler_config(), None).await
}

/// Run with explicit backend capabilities and snapshot store.
///
/// The snapshot is only written after the whole forest was assembled.
pub async fn run_with<E, F>(
    edges: &E,
    fetcher: &F,
    store: &dyn SnapshotStore,
    assembler_config: AssemblerConfig,
    prior: Option<Forest>,
) -> AppResult<RunReport>
where
    E: EdgeSource + ?Sized,
    F: RecordFetcher + ?Sized,
{
    if let Some(forest) = prior {
        return Ok(reuse(forest));
    }

    let relations = edges.fetch_edges().await.map_err(AppError::Relations)?;
    info!(relations = relations.len(), "Fetched work-item relations");

    let assembly = HierarchyAssembler::with_config(fetcher, assembler_config)
        .map_err(|e| AppError::Config(e.to_string()))?
        .assemble(&relations)
        .await?;
    log_forest(&assembly.forest);

    let saved = store.save(&assembly.forest).await?;

    Ok(RunReport {
        forest: assembly.forest,
        origin: ForestOrigin::Backend,
        warnings: assembly.warnings,
        stats: Some(assembly.stats),
        saved: Some(saved),
    })
}

fn reuse(forest: Forest) -> RunReport {
    log_forest(&forest);
    RunReport {
        forest,
        origin: ForestOrigin::Snapshot,
        warnings: Vec::new(),
        stats: None,
        saved: None,
    }
}

/// One line per item, in forest order
fn log_forest(forest: &Forest) {
    for node in forest {
        info!("{}", node);
    }
}
