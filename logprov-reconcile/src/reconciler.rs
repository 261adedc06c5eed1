//! Write-then-confirm flows composed from the poller and the matcher.
//!
//! Each write goes through [`Writer`]; only a successful write starts
//! polling. The per-resource CRUD layer wraps one [`ResourceReconciler`]
//! around its API client.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::ReconcileConfig;
use crate::criteria::SearchCriteria;
use crate::error::{ReconcileError, Result};
use crate::matcher::Matcher;
use crate::poller::{predicates, ConvergenceOutcome, Poller};
use crate::remote::{Fetcher, Lister, Writer};
use crate::state::{AttributeMap, DesiredState, Observation, ObservedState};

/// Drive one resource towards its desired state.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Create (`id == None`) or update the resource and wait until the
    /// remote side reflects it.
    async fn reconcile(&self, id: Option<&str>, desired: &DesiredState) -> Result<ObservedState>;

    /// Delete the resource and wait until it is gone.
    async fn finalize(&self, id: &str) -> Result<()>;
}

/// Reconciler for one resource kind backed by a remote client.
pub struct ResourceReconciler<C> {
    kind: String,
    client: C,
    poller: Poller,
    matcher: Matcher,
}

impl<C> ResourceReconciler<C> {
    pub fn new(kind: impl Into<String>, client: C, config: &ReconcileConfig) -> Self {
        Self {
            kind: kind.into(),
            client,
            poller: Poller::new(config.poll.clone()),
            matcher: Matcher::new(config.search.clone()),
        }
    }

    /// Swap in a poller with a custom retry classifier.
    pub fn with_poller(mut self, poller: Poller) -> Self {
        self.poller = poller;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: Fetcher + Writer> ResourceReconciler<C> {
    pub async fn create(&self, desired: &DesiredState) -> Result<ObservedState> {
        let id = self
            .client
            .apply(None, desired)
            .await
            .map_err(ReconcileError::Apply)?;
        info!("Created {} {}", self.kind, id);
        self.confirm(&id, desired, predicates::equivalent_to_desired)
            .await
    }

    /// Update and wait for full equivalence.
    pub async fn update(&self, id: &str, desired: &DesiredState) -> Result<ObservedState> {
        self.update_with(id, desired, predicates::equivalent_to_desired)
            .await
    }

    /// Update and wait for a narrower acceptance predicate.
    pub async fn update_with<P>(
        &self,
        id: &str,
        desired: &DesiredState,
        is_acceptable: P,
    ) -> Result<ObservedState>
    where
        P: Fn(&DesiredState, &Observation) -> bool + Send + Sync,
    {
        let applied_id = self
            .client
            .apply(Some(id), desired)
            .await
            .map_err(ReconcileError::Apply)?;
        info!("Updated {} {}", self.kind, applied_id);
        self.confirm(&applied_id, desired, is_acceptable).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client
            .delete(id)
            .await
            .map_err(ReconcileError::Apply)?;
        info!("Deleted {} {}, waiting for it to disappear", self.kind, id);

        let outcome = self
            .poller
            .poll_until_converged(&AttributeMap::new(), &self.client, id, predicates::absent)
            .await;
        self.report(id, &outcome);
        outcome.into_result(id).map(|_| ())
    }

    async fn confirm<P>(
        &self,
        id: &str,
        desired: &DesiredState,
        is_acceptable: P,
    ) -> Result<ObservedState>
    where
        P: Fn(&DesiredState, &Observation) -> bool + Send + Sync,
    {
        let outcome = self
            .poller
            .poll_until_converged(desired, &self.client, id, is_acceptable)
            .await;
        self.report(id, &outcome);

        let attempts = outcome.attempts();
        outcome
            .into_result(id)?
            .into_state()
            .ok_or_else(|| ReconcileError::TransientNotFound {
                id: id.to_string(),
                attempts,
            })
    }

    fn report(&self, id: &str, outcome: &ConvergenceOutcome) {
        if let ConvergenceOutcome::NotYetConverged { attempts, .. } = outcome {
            warn!(
                "{} {} written but not confirmed after {} attempts",
                self.kind, id, attempts
            );
        }
    }
}

impl<C: Lister> ResourceReconciler<C> {
    /// Resolve criteria to exactly one remote object.
    pub async fn lookup(&self, criteria: &SearchCriteria) -> Result<ObservedState> {
        let outcome = self.matcher.find_match(criteria, &self.client).await?;
        outcome.into_result()
    }
}

#[async_trait]
impl<C: Fetcher + Writer> Reconciler for ResourceReconciler<C> {
    async fn reconcile(&self, id: Option<&str>, desired: &DesiredState) -> Result<ObservedState> {
        match id {
            Some(id) => self.update(id, desired).await,
            None => self.create(desired).await,
        }
    }

    async fn finalize(&self, id: &str) -> Result<()> {
        self.delete(id).await
    }
}
