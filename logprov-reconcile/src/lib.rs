//! logprov-reconcile: reconciliation core for the logprov infrastructure provider.
//!
//! The remote log platform does not guarantee read-after-write visibility and
//! offers no unique lookup for some resource kinds. This crate provides:
//! - [`compare`]: tolerant state equivalence and canonical search keys
//! - [`Matcher`]: find the single object matching a set of search expressions
//! - [`Poller`]: re-read a resource after a write until it converges
//! - [`ResourceReconciler`]: write-then-confirm flows built from the above
//!
//! HTTP transport, authentication and per-resource field mapping stay with
//! the caller, behind the traits in [`remote`].

pub mod compare;
pub mod config;
pub mod criteria;
pub mod error;
pub mod matcher;
pub mod poller;
pub mod reconciler;
pub mod remote;
pub mod state;

pub use compare::{canonical_key, equivalent, multiset_equivalent, CanonicalKey};
pub use config::ReconcileConfig;
pub use criteria::{CriteriaMode, ExpressionLayout, SearchCriteria, SearchExpression};
pub use error::{ConfigError, ExpressionError, FetchError, MatchError, ReconcileError};
pub use matcher::{MatchOutcome, Matcher, ScanMode, SearchConfig};
pub use poller::{predicates, Backoff, BackoffStrategy, ConvergenceOutcome, PollPolicy, Poller};
pub use reconciler::{Reconciler, ResourceReconciler};
pub use remote::{Fetcher, Lister, Writer};
pub use state::{AttrValue, AttributeMap, DesiredState, Observation, ObservedState, Page};
