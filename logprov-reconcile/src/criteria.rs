//! Search criteria used to locate a resource without knowing its id.

use serde::{Deserialize, Serialize};

use crate::error::ExpressionError;
use crate::state::{AttrValue, ObservedState};

/// A single `{name, operator, value}` condition, e.g. a label/value/condition triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchExpression {
    pub name: String,
    pub operator: String,
    pub value: String,
}

impl SearchExpression {
    /// Build a validated expression.
    pub fn new(
        name: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, ExpressionError> {
        let expr = Self {
            name: name.into(),
            operator: operator.into(),
            value: value.into(),
        };
        expr.validate()?;
        Ok(expr)
    }

    /// Reject expressions that cannot produce an unambiguous canonical key.
    pub fn validate(&self) -> Result<(), ExpressionError> {
        if self.name.trim().is_empty() {
            return Err(ExpressionError::EmptyName);
        }
        if self.operator.trim().is_empty() {
            return Err(ExpressionError::EmptyOperator);
        }
        for (field, text) in [
            ("name", &self.name),
            ("operator", &self.operator),
            ("value", &self.value),
        ] {
            if text.contains('\0') {
                return Err(ExpressionError::ContainsNul(field));
            }
        }
        Ok(())
    }
}

/// How much narrowing the remote API already did before the matcher runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriteriaMode {
    /// Expressions are the only narrowing; at least one is required.
    #[default]
    Strict,
    /// Identifying fields were sent as an API-side filter; expressions are optional.
    Loose,
}

/// All expressions must hold for a remote object to match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    expressions: Vec<SearchExpression>,
    mode: CriteriaMode,
}

impl SearchCriteria {
    pub fn strict(expressions: Vec<SearchExpression>) -> Result<Self, ExpressionError> {
        Self::build(expressions, CriteriaMode::Strict)
    }

    pub fn loose(expressions: Vec<SearchExpression>) -> Result<Self, ExpressionError> {
        Self::build(expressions, CriteriaMode::Loose)
    }

    fn build(
        expressions: Vec<SearchExpression>,
        mode: CriteriaMode,
    ) -> Result<Self, ExpressionError> {
        for expr in &expressions {
            expr.validate()?;
        }
        Ok(Self { expressions, mode })
    }

    pub fn expressions(&self) -> &[SearchExpression] {
        &self.expressions
    }

    pub fn mode(&self) -> CriteriaMode {
        self.mode
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }
}

/// Where a listed object keeps its own expressions.
///
/// The object's `attribute` holds a list or set of nested objects, each with
/// `name_field`, `operator_field` and `value_field` entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionLayout {
    pub attribute: String,
    pub name_field: String,
    pub operator_field: String,
    pub value_field: String,
}

impl Default for ExpressionLayout {
    fn default() -> Self {
        Self {
            attribute: "expressions".to_string(),
            name_field: "name".to_string(),
            operator_field: "operator".to_string(),
            value_field: "value".to_string(),
        }
    }
}

impl ExpressionLayout {
    fn entries<'a>(&self, state: &'a ObservedState) -> &'a [AttrValue] {
        match state.attributes.get(&self.attribute) {
            Some(AttrValue::List(items)) | Some(AttrValue::Set(items)) => items,
            _ => &[],
        }
    }

    /// Number of entries the object carries, duplicates and unreadable
    /// entries included.
    pub fn entry_count(&self, state: &ObservedState) -> usize {
        self.entries(state).len()
    }

    /// Extract the object's expressions. Entries missing a name or operator
    /// are skipped; a missing value reads as the empty string.
    pub fn extract(&self, state: &ObservedState) -> Vec<SearchExpression> {
        self.entries(state)
            .iter()
            .filter_map(|entry| {
                let AttrValue::Object(fields) = entry else {
                    return None;
                };
                let name = fields.get(&self.name_field)?.to_text()?;
                let operator = fields.get(&self.operator_field)?.to_text()?;
                let value = fields
                    .get(&self.value_field)
                    .and_then(AttrValue::to_text)
                    .unwrap_or_default();
                Some(SearchExpression {
                    name,
                    operator,
                    value,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AttributeMap;

    fn entry(name: &str, op: &str, value: &str) -> AttrValue {
        AttrValue::Object(
            AttributeMap::new()
                .with("name", name)
                .with("operator", op)
                .with("value", value),
        )
    }

    #[test]
    fn test_validate() {
        assert!(SearchExpression::new("host", "EQ", "web-1").is_ok());
        assert_eq!(
            SearchExpression::new("  ", "EQ", "x").unwrap_err(),
            ExpressionError::EmptyName
        );
        assert_eq!(
            SearchExpression::new("host", "", "x").unwrap_err(),
            ExpressionError::EmptyOperator
        );
        assert_eq!(
            SearchExpression::new("host", "EQ", "a\0b").unwrap_err(),
            ExpressionError::ContainsNul("value")
        );
    }

    #[test]
    fn test_empty_value_is_allowed() {
        assert!(SearchExpression::new("host", "EXISTS", "").is_ok());
    }

    #[test]
    fn test_criteria_rejects_bad_expression() {
        let bad = SearchExpression {
            name: String::new(),
            operator: "EQ".to_string(),
            value: "1".to_string(),
        };
        assert!(SearchCriteria::strict(vec![bad]).is_err());
        assert!(SearchCriteria::loose(vec![]).unwrap().is_empty());
    }

    #[test]
    fn test_extract_expressions() {
        let state = ObservedState::new(
            "42",
            AttributeMap::new().with(
                "expressions",
                AttrValue::Set(vec![
                    entry("env", "EQ", "prod"),
                    AttrValue::Object(AttributeMap::new().with("operator", "EQ")),
                    AttrValue::Str("junk".to_string()),
                    AttrValue::Object(
                        AttributeMap::new()
                            .with("name", "port")
                            .with("operator", "GT")
                            .with("value", AttrValue::Int(8000)),
                    ),
                ]),
            ),
        );

        let layout = ExpressionLayout::default();
        let exprs = layout.extract(&state);
        assert_eq!(exprs.len(), 2);
        assert_eq!(layout.entry_count(&state), 4);
        assert_eq!(exprs[0].name, "env");
        assert_eq!(exprs[1].value, "8000");
    }

    #[test]
    fn test_extract_missing_attribute() {
        let state = ObservedState::new("1", AttributeMap::new());
        assert!(ExpressionLayout::default().extract(&state).is_empty());
        assert_eq!(ExpressionLayout::default().entry_count(&state), 0);
    }
}
