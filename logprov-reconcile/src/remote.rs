//! Collaborators that talk to the remote log platform.
//!
//! The HTTP transport, authentication and per-resource field mapping live
//! behind these traits. The reconciliation core only ever reads through
//! [`Fetcher`] and [`Lister`]; writes go through [`Writer`] before polling
//! starts.

use anyhow::Result;
use async_trait::async_trait;

use crate::error::FetchError;
use crate::state::{DesiredState, ObservedState, Page};

/// Single-object read.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<ObservedState, FetchError>;
}

/// Paginated listing. Pages are numbered from 1; page size is the
/// implementation's concern.
#[async_trait]
pub trait Lister: Send + Sync {
    async fn list(&self, page: u32) -> Result<Page>;
}

/// Writes that precede convergence polling.
#[async_trait]
pub trait Writer: Send + Sync {
    /// Create or update the resource, returning its id.
    async fn apply(&self, id: Option<&str>, desired: &DesiredState) -> Result<String>;

    /// Delete the resource.
    async fn delete(&self, id: &str) -> Result<()>;
}
