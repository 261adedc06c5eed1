//! Stock acceptance predicates for the poller.

use crate::compare::{equivalent, value_equivalent};
use crate::state::{DesiredState, Observation};

/// Create/update: the resource exists and fully matches the desired state.
pub fn equivalent_to_desired(desired: &DesiredState, observation: &Observation) -> bool {
    observation
        .state()
        .is_some_and(|state| equivalent(desired, &state.attributes))
}

/// Delete: the resource is gone.
pub fn absent(_desired: &DesiredState, observation: &Observation) -> bool {
    observation.is_absent()
}

/// The resource exists and only the named attributes have to match, e.g.
/// an `active` flag toggled by a separate endpoint.
pub fn attributes_match(
    keys: Vec<String>,
) -> impl Fn(&DesiredState, &Observation) -> bool + Send + Sync {
    move |desired, observation| {
        observation.state().is_some_and(|state| {
            keys.iter()
                .all(|key| value_equivalent(desired.get(key), state.attributes.get(key)))
        })
    }
}

pub fn attribute_matches(
    key: impl Into<String>,
) -> impl Fn(&DesiredState, &Observation) -> bool + Send + Sync {
    attributes_match(vec![key.into()])
}
