//! Canonical keys for order-independent expression comparison.

use std::collections::HashSet;
use std::fmt;

use crate::criteria::SearchExpression;

/// Separator between the normalized fields. Expressions containing it are
/// rejected by [`SearchExpression::validate`].
const SEPARATOR: char = '\0';

/// Normalized encoding of a [`SearchExpression`], for equality tests only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // NUL is unprintable; show the fields the way they were compared.
        write!(f, "{}", self.0.replace(SEPARATOR, " "))
    }
}

/// Lower-case name, upper-case operator, trimmed value.
pub fn canonical_key(expr: &SearchExpression) -> CanonicalKey {
    let name = expr.name.trim().to_lowercase();
    let operator = expr.operator.trim().to_uppercase();
    let value = expr.value.trim();

    let mut key = String::with_capacity(name.len() + operator.len() + value.len() + 2);
    key.push_str(&name);
    key.push(SEPARATOR);
    key.push_str(&operator);
    key.push(SEPARATOR);
    key.push_str(value);
    CanonicalKey(key)
}

pub fn canonical_key_set(exprs: &[SearchExpression]) -> HashSet<CanonicalKey> {
    exprs.iter().map(canonical_key).collect()
}
