//! Locate a single remote object from search criteria when no id is known.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::compare::canonical_key_set;
use crate::criteria::{CriteriaMode, ExpressionLayout, SearchCriteria};
use crate::error::{MatchError, ReconcileError};
use crate::remote::Lister;
use crate::state::ObservedState;

/// What to do once a candidate matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Stop paging at the first match. Page order decides if several match.
    #[default]
    FirstMatch,
    /// Read every page and report `Ambiguous` when more than one object matches.
    Exhaustive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Upper bound on `list` calls per search.
    pub max_pages: u32,
    pub scan: ScanMode,
    pub layout: ExpressionLayout,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_pages: 100,
            scan: ScanMode::FirstMatch,
            layout: ExpressionLayout::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Unique(ObservedState),
    NoMatch,
    Ambiguous(usize),
}

impl MatchOutcome {
    /// `NoMatch` and `Ambiguous` become distinct, actionable errors.
    pub fn into_result(self) -> Result<ObservedState, ReconcileError> {
        match self {
            MatchOutcome::Unique(state) => Ok(state),
            MatchOutcome::NoMatch => Err(ReconcileError::NoMatch),
            MatchOutcome::Ambiguous(count) => Err(ReconcileError::Ambiguous(count)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Matcher {
    config: SearchConfig,
}

impl Matcher {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// A candidate matches when it carries exactly as many expression entries
    /// as the criteria and its canonical key set equals the criteria's.
    /// Duplicate and unreadable entries still count towards the total.
    pub fn is_match(&self, criteria: &SearchCriteria, candidate: &ObservedState) -> bool {
        if self.config.layout.entry_count(candidate) != criteria.expressions().len() {
            return false;
        }
        let wanted = canonical_key_set(criteria.expressions());
        let have = canonical_key_set(&self.config.layout.extract(candidate));
        have == wanted
    }

    /// Page through `lister` looking for the one object satisfying `criteria`.
    ///
    /// Strict criteria without expressions are refused before listing. Loose
    /// criteria without expressions trust the API-side filter and only count
    /// the results of page 1, or of every page under [`ScanMode::Exhaustive`].
    /// A `list` failure aborts the search.
    pub async fn find_match<L>(
        &self,
        criteria: &SearchCriteria,
        lister: &L,
    ) -> Result<MatchOutcome, MatchError>
    where
        L: Lister + ?Sized,
    {
        if criteria.is_empty() && criteria.mode() == CriteriaMode::Strict {
            return Err(MatchError::EmptyCriteria);
        }

        let count_only = criteria.is_empty();
        let mut found: Option<ObservedState> = None;
        let mut count = 0usize;
        let mut page_no = 1u32;

        loop {
            if page_no > self.config.max_pages {
                warn!("Search stopped after {} pages", self.config.max_pages);
                return Err(MatchError::PageLimit(self.config.max_pages));
            }

            let page = lister
                .list(page_no)
                .await
                .map_err(|source| MatchError::List {
                    page: page_no,
                    source,
                })?;
            debug!(
                "Search page {}: {} candidates (more: {})",
                page_no,
                page.items.len(),
                page.has_more
            );

            for candidate in page.items {
                if !count_only && !self.is_match(criteria, &candidate) {
                    continue;
                }
                count += 1;
                if !count_only && self.config.scan == ScanMode::FirstMatch {
                    info!("Search matched {} on page {}", candidate.id, page_no);
                    return Ok(MatchOutcome::Unique(candidate));
                }
                if found.is_none() {
                    found = Some(candidate);
                }
            }

            if count_only && count > 1 {
                warn!("Search ambiguous: {} results without further criteria", count);
                return Ok(MatchOutcome::Ambiguous(count));
            }

            if !page.has_more || (count_only && self.config.scan == ScanMode::FirstMatch) {
                break;
            }
            page_no += 1;
        }

        match (count, found) {
            (1, Some(state)) => {
                info!("Search matched {}", state.id);
                Ok(MatchOutcome::Unique(state))
            }
            (0, _) => {
                debug!("Search found no match after {} pages", page_no);
                Ok(MatchOutcome::NoMatch)
            }
            (n, _) => {
                warn!("Search ambiguous: {} matching resources", n);
                Ok(MatchOutcome::Ambiguous(n))
            }
        }
    }
}
