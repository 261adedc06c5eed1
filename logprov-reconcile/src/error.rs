//! Error types for the reconciliation core.

use thiserror::Error;

use crate::state::ObservedState;

/// Errors returned by a single-object read.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The remote platform has no such object (yet, or any more).
    #[error("resource not found")]
    NotFound,

    /// Temporary failure: throttling, timeouts, 5xx responses.
    #[error("transient: {0}")]
    Transient(#[source] anyhow::Error),

    /// Anything that will not go away by retrying: bad request, permission denied.
    #[error("fatal: {0}")]
    Fatal(#[source] anyhow::Error),
}

impl FetchError {
    /// Default retry classification used by the poller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::NotFound | FetchError::Transient(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound)
    }
}

/// Malformed search expressions, rejected before any search runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("search expression name is required")]
    EmptyName,

    #[error("search expression operator is required")]
    EmptyOperator,

    #[error("search expression {0} contains a NUL byte")]
    ContainsNul(&'static str),
}

/// Errors that abort a search.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Strict criteria without expressions would match everything.
    #[error("search criteria must contain at least one expression")]
    EmptyCriteria,

    #[error("listing page {page} failed: {source}")]
    List {
        page: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("search gave up after {0} pages")]
    PageLimit(u32),
}

/// Caller-facing taxonomy for a whole reconcile step.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The write itself failed, polling never started.
    #[error("write failed: {0}")]
    Apply(#[source] anyhow::Error),

    /// The resource never became visible after the write.
    #[error("resource {id} not visible after {attempts} attempts")]
    TransientNotFound { id: String, attempts: u32 },

    /// The write succeeded but the remote state could not be confirmed.
    #[error("write succeeded but state did not converge after {attempts} attempts")]
    RetryBudgetExhausted {
        attempts: u32,
        last_observed: Option<Box<ObservedState>>,
    },

    #[error("reading resource {id} failed: {source}")]
    Fatal {
        id: String,
        #[source]
        source: FetchError,
    },

    #[error("no resource matches the search criteria")]
    NoMatch,

    #[error("{0} resources match the search criteria, narrow the criteria or supply an id")]
    Ambiguous(usize),

    #[error(transparent)]
    Search(#[from] MatchError),
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T, E = ReconcileError> = std::result::Result<T, E>;
