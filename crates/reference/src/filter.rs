use crate::error::{ReferenceError, Result};
use crate::value::{as_number, get_path, render};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    /// Bare `key`: present and not null.
    Exists,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl FilterOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exists => "",
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }
}

// Two-character operators first so `>=` is not read as `>`.
const OPERATORS: [(&str, FilterOp); 6] = [
    (">=", FilterOp::Ge),
    ("<=", FilterOp::Le),
    ("!=", FilterOp::Ne),
    ("=", FilterOp::Eq),
    (">", FilterOp::Gt),
    ("<", FilterOp::Lt),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterClause {
    /// Property name; dots address nested objects.
    pub key: String,
    pub op: FilterOp,
    /// Right-hand literal, `None` for [`FilterOp::Exists`].
    pub value: Option<String>,
}

impl FilterClause {
    fn parse(raw: &str) -> Result<Self> {
        let (key, op, value) = match find_operator(raw) {
            Some((at, token, op)) => (
                raw[..at].trim(),
                op,
                Some(raw[at + token.len()..].trim().to_string()),
            ),
            None => (raw.trim(), FilterOp::Exists, None),
        };
        if key.is_empty() {
            return Err(ReferenceError::InvalidFilter {
                filter: raw.to_string(),
                reason: "missing property name".into(),
            });
        }
        Ok(Self {
            key: key.to_string(),
            op,
            value,
        })
    }

    pub fn matches(&self, item: &Value) -> bool {
        let actual = get_path(item, &self.key).filter(|v| !v.is_null());
        let literal = self.value.as_deref().unwrap_or_default();

        match self.op {
            FilterOp::Exists => actual.is_some(),
            FilterOp::Eq if literal.eq_ignore_ascii_case("true") => {
                actual.is_some_and(|v| v.as_bool() != Some(false))
            }
            FilterOp::Eq if literal.eq_ignore_ascii_case("false") => {
                actual.is_some_and(|v| v.as_bool() == Some(false))
            }
            FilterOp::Eq => actual.is_some_and(|v| equals(v, literal)),
            FilterOp::Ne => actual.is_some_and(|v| !equals(v, literal)),
            FilterOp::Gt | FilterOp::Ge | FilterOp::Lt | FilterOp::Le => {
                let (Some(lhs), Ok(rhs)) = (actual.and_then(as_number), literal.parse::<f64>())
                else {
                    return false;
                };
                match self.op {
                    FilterOp::Gt => lhs > rhs,
                    FilterOp::Ge => lhs >= rhs,
                    FilterOp::Lt => lhs < rhs,
                    _ => lhs <= rhs,
                }
            }
        }
    }
}

impl fmt::Display for FilterClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.key, self.op.as_str())?;
        if let Some(value) = &self.value {
            f.write_str(value)?;
        }
        Ok(())
    }
}

fn find_operator(raw: &str) -> Option<(usize, &'static str, FilterOp)> {
    raw.char_indices().find_map(|(at, _)| {
        let rest = &raw[at..];
        OPERATORS
            .iter()
            .find(|(token, _)| rest.starts_with(token))
            .map(|(token, op)| (at, *token, *op))
    })
}

fn equals(actual: &Value, literal: &str) -> bool {
    if let (Some(lhs), Ok(rhs)) = (actual.as_f64(), literal.parse::<f64>()) {
        return lhs == rhs;
    }
    render(actual) == literal
}

/// Conjunction of filter clauses from a reference's `[...]` body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterExpr {
    clauses: Vec<FilterClause>,
}

impl FilterExpr {
    /// Clauses are separated by `&` or `,`; blank clauses are skipped.
    pub fn parse(body: &str) -> Result<Self> {
        let clauses = body
            .split(['&', ','])
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(FilterClause::parse)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { clauses })
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, item: &Value) -> bool {
        self.clauses.iter().all(|clause| clause.matches(item))
    }

    pub fn apply(&self, items: Vec<Value>) -> Vec<Value> {
        items.into_iter().filter(|item| self.matches(item)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn passes(body: &str, item: &Value) -> bool {
        FilterExpr::parse(body).unwrap().matches(item)
    }

    #[test]
    fn parses_clauses_with_either_separator() {
        let expr = FilterExpr::parse(" tier>=2 & magic , name!=Rope ,, ").unwrap();
        let rendered: Vec<String> = expr.clauses().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["tier>=2", "magic", "name!=Rope"]);
        assert_eq!(expr.clauses()[0].op, FilterOp::Ge);
        assert_eq!(expr.clauses()[1].op, FilterOp::Exists);
        assert!(FilterExpr::parse("").unwrap().is_empty());
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(
            FilterExpr::parse("=5"),
            Err(ReferenceError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn bare_key_requires_non_null_value() {
        assert!(passes("tag", &json!({"tag": "x"})));
        assert!(passes("tag", &json!({"tag": false})));
        assert!(!passes("tag", &json!({"tag": null})));
        assert!(!passes("tag", &json!({})));
    }

    #[test]
    fn true_literal_accepts_any_non_false_value() {
        assert!(passes("magic=true", &json!({"magic": true})));
        assert!(passes("magic=TRUE", &json!({"magic": {"school": "fire"}})));
        assert!(passes("magic=true", &json!({"magic": "yes"})));
        assert!(!passes("magic=true", &json!({"magic": false})));
        assert!(!passes("magic=true", &json!({"magic": null})));
        assert!(!passes("magic=true", &json!({})));
    }

    #[test]
    fn false_literal_needs_boolean_false() {
        assert!(passes("cursed=false", &json!({"cursed": false})));
        assert!(!passes("cursed=false", &json!({"cursed": "false"})));
        assert!(!passes("cursed=false", &json!({"cursed": 0})));
        assert!(!passes("cursed=false", &json!({})));
    }

    #[test]
    fn equality_is_case_sensitive_and_numeric_aware() {
        assert!(passes("tag=x", &json!({"tag": "x"})));
        assert!(!passes("tag=X", &json!({"tag": "x"})));
        assert!(passes("rarityWeight=10", &json!({"rarityWeight": 10})));
        assert!(passes("rarityWeight=10", &json!({"rarityWeight": 10.0})));
        assert!(passes("rarityWeight=10.0", &json!({"rarityWeight": 10})));
        assert!(!passes("rarityWeight=10", &json!({"rarityWeight": 11})));
    }

    #[test]
    fn inequality_and_comparisons() {
        let item = json!({"name": "Rope", "stats": {"power": 7}, "cost": "12"});
        assert!(passes("name!=Lantern", &item));
        assert!(!passes("name!=Rope", &item));
        assert!(!passes("missing!=Rope", &item));
        assert!(passes("stats.power>5", &item));
        assert!(passes("stats.power>=7&stats.power<=7", &item));
        assert!(!passes("stats.power<7", &item));
        assert!(passes("cost<20", &item));
        assert!(!passes("name>1", &item));
        assert!(!passes("stats.power>high", &item));
    }

    #[test]
    fn apply_keeps_matching_items_in_order() {
        let items = vec![
            json!({"name": "A", "tag": "x"}),
            json!({"name": "B", "tag": "y"}),
            json!({"name": "C", "tag": "x"}),
        ];
        let kept = FilterExpr::parse("tag=x").unwrap().apply(items);
        assert_eq!(kept, vec![json!({"name": "A", "tag": "x"}), json!({"name": "C", "tag": "x"})]);
    }
}
