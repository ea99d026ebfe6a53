//! Azure DevOps backend for epictree
//!
//! [`AzdoClient`] implements both backend capabilities of the assembler:
//! the relation query ([`epictree_core::EdgeSource`]) and batched work-item
//! lookups ([`epictree_core::RecordFetcher`]).

pub mod client;
pub mod config;
pub mod error;

pub use client::AzdoClient;
pub use config::{AzdoConfig, DEFAULT_API_VERSION, DEFAULT_TIMEOUT_SECS, DEFAULT_WORK_ITEMS_QUERY};
pub use error::AzdoError;
