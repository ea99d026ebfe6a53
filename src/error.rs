//! Error types of the epictree application

use epictree_azdo::AzdoError;
use epictree_core::{AssembleError, FetchError};
use epictree_snapshot::SnapshotError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend client could not be set up
    #[error("Backend client error: {0}")]
    Client(#[from] AzdoError),

    /// The relation query failed
    #[error("Failed to query work-item relations: {0}")]
    Relations(#[source] FetchError),

    /// Assembly aborted on a failed fetch
    #[error(transparent)]
    Assemble(#[from] AssembleError),

    /// Snapshot could not be read or written
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Result type for application operations
pub type AppResult<T> = Result<T, AppError>;

/// Render an error with its causes, skipping causes whose text the message
/// already ends with
pub fn render_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !rendered.ends_with(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}
