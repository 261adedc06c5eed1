//! State comparison used by both the poller and the matcher.
//!
//! Equality here is semantic: the wire format drops empty collections and
//! null optionals, and returns unordered collections in arbitrary order, so a
//! plain `==` would report drift that is not really there.

pub mod canonical;
pub mod diff;

pub use canonical::{canonical_key, canonical_key_set, CanonicalKey};
pub use diff::{multiset_difference, multiset_equivalent, MultisetDiff};

use crate::state::{AttrValue, AttributeMap};

/// Whether `desired` and `observed` describe the same resource state.
///
/// Tolerated drift:
/// - an absent attribute equals an empty list, set or object
/// - an absent attribute equals `Null`
/// - sets compare as sets
/// - lists compare element by element, in order
pub fn equivalent(desired: &AttributeMap, observed: &AttributeMap) -> bool {
    desired
        .keys()
        .chain(observed.keys().filter(|k| desired.get(k).is_none()))
        .all(|key| value_equivalent(desired.get(key), observed.get(key)))
}

/// Compare one attribute, either side possibly absent.
pub fn value_equivalent(a: Option<&AttrValue>, b: Option<&AttrValue>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(v), None) | (None, Some(v)) => v.is_empty_like(),
        (Some(a), Some(b)) => values_equal(a, b),
    }
}

fn values_equal(a: &AttrValue, b: &AttrValue) -> bool {
    if a.is_empty_like() && b.is_empty_like() {
        return true;
    }

    match (a, b) {
        (AttrValue::Bool(x), AttrValue::Bool(y)) => x == y,
        (AttrValue::Int(x), AttrValue::Int(y)) => x == y,
        // NaN must equal itself or equivalence stops being reflexive
        (AttrValue::Float(x), AttrValue::Float(y)) => x == y || (x.is_nan() && y.is_nan()),
        (AttrValue::Str(x), AttrValue::Str(y)) => x == y,
        (AttrValue::List(xs), AttrValue::List(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (AttrValue::Set(xs), AttrValue::Set(ys)) => {
            set_contains_all(xs, ys) && set_contains_all(ys, xs)
        }
        (AttrValue::Object(x), AttrValue::Object(y)) => equivalent(x, y),
        _ => false,
    }
}

fn set_contains_all(haystack: &[AttrValue], needles: &[AttrValue]) -> bool {
    needles
        .iter()
        .all(|needle| haystack.iter().any(|candidate| values_equal(candidate, needle)))
}
