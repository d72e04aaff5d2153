//! Boolean filter expressions over dataset fields.
//!
//! Filters combine cumulatively with `&` (and), `|` (or) and `!` (not):
//!
//! ```
//! use genobase::filter::Filter;
//!
//! let f = Filter::term("price", "Free") | Filter::term("style", "Mexican");
//! ```
//!
//! Each term is a `(field, value)` pair. Field names carry an optional
//! action suffix:
//!
//! - `<field>=<value>` matches the exact value
//! - `<field>__in=[..]` matches any of the listed values
//! - `<field>__range=[a, b]` matches anything from `a` to `b` inclusive
//! - `<field>__between=[a, b]` matches anything strictly between `a` and `b`
//! - `<field>__gt`, `__gte`, `__lt`, `__lte` for numeric comparisons
//!
//! String terms are not analyzed and are always exact matches.

use crate::{Error, Result};
use serde_json::Value;

/// Boolean connective joining a list of sub-clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub fn key(self) -> &'static str {
        match self {
            Connective::And => "and",
            Connective::Or => "or",
        }
    }
}

/// A single node in a filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterClause {
    /// `(field_with_suffix, value)` leaf, serialized as a 2-element array.
    Term(String, Value),
    /// `{"and": [..]}` or `{"or": [..]}` wrapper.
    Connective(Connective, Vec<FilterClause>),
    /// `{"not": <node>}` wrapper.
    Not(Box<FilterClause>),
}

impl FilterClause {
    fn to_wire(&self) -> Value {
        match self {
            FilterClause::Term(field, value) => {
                Value::Array(vec![Value::String(field.clone()), value.clone()])
            }
            FilterClause::Connective(conn, children) => {
                let lowered: Vec<Value> = children.iter().map(FilterClause::to_wire).collect();
                serde_json::json!({ conn.key(): lowered })
            }
            FilterClause::Not(child) => serde_json::json!({ "not": child.to_wire() }),
        }
    }

    fn simplified(self) -> FilterClause {
        match self {
            FilterClause::Not(inner) => match inner.simplified() {
                FilterClause::Not(unwrapped) => *unwrapped,
                other => FilterClause::Not(Box::new(other)),
            },
            FilterClause::Connective(conn, children) => FilterClause::Connective(
                conn,
                children.into_iter().map(FilterClause::simplified).collect(),
            ),
            term => term,
        }
    }
}

/// A composable filter expression.
///
/// An empty filter is the identity element for combination: combining it
/// with any other filter yields that filter unchanged. Combining two
/// filters whose top node is the same connective flattens into a single
/// wrapper rather than nesting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<FilterClause>,
}

impl Filter {
    /// An empty filter matching everything.
    pub fn new() -> Self {
        Filter::default()
    }

    /// A single-term filter.
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter {
            clauses: vec![FilterClause::Term(field.into(), value.into())],
        }
    }

    /// Builds a filter from `(field, value)` pairs.
    ///
    /// More than one pair is wrapped in a single implicit `and` node; a
    /// single pair is stored bare. Serialization depends on this asymmetry.
    pub fn from_terms<I, K, V>(terms: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let clauses: Vec<FilterClause> = terms
            .into_iter()
            .map(|(field, value)| FilterClause::Term(field.into(), value.into()))
            .collect();

        match clauses.len() {
            0 | 1 => Filter { clauses },
            _ => Filter {
                clauses: vec![FilterClause::Connective(Connective::And, clauses)],
            },
        }
    }

    /// Parses a raw JSON-encoded filter into the tree.
    ///
    /// Accepted shapes: a single node, a list of nodes (more than one is
    /// wrapped in an implicit `and`), or a bare `[field, value]` 2-tuple.
    pub fn from_raw(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| Error::MalformedFilter(format!("invalid JSON: {e}")))?;

        let clauses = match &value {
            Value::Array(items) => {
                if let Some(term) = parse_bare_term(&value) {
                    vec![term]
                } else {
                    let nodes: Result<Vec<FilterClause>> =
                        items.iter().map(parse_node).collect();
                    let mut nodes = nodes?;
                    if nodes.len() > 1 {
                        nodes = vec![FilterClause::Connective(Connective::And, nodes)];
                    }
                    nodes
                }
            }
            Value::Object(_) => vec![parse_node(&value)?],
            other => {
                return Err(Error::MalformedFilter(format!(
                    "expected an object or array, got: {other}"
                )));
            }
        };

        Ok(Filter { clauses })
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    /// Combines two filters with the given connective, flattening into an
    /// existing top-level wrapper of the same kind when one is present.
    fn combine(&self, other: &Filter, conn: Connective) -> Filter {
        if self.clauses.is_empty() {
            return other.clone();
        }
        if other.clauses.is_empty() {
            return self.clone();
        }

        if let Some(FilterClause::Connective(c, _)) = self.clauses.first() {
            if *c == conn {
                let mut merged = self.clone();
                if let Some(FilterClause::Connective(_, children)) = merged.clauses.first_mut() {
                    children.extend(other.clauses.iter().cloned());
                }
                return merged;
            }
        }

        if let Some(FilterClause::Connective(c, _)) = other.clauses.first() {
            if *c == conn {
                let mut merged = other.clone();
                if let Some(FilterClause::Connective(_, children)) = merged.clauses.first_mut() {
                    children.extend(self.clauses.iter().cloned());
                }
                return merged;
            }
        }

        let mut children = self.clauses.clone();
        children.extend(other.clauses.iter().cloned());
        Filter {
            clauses: vec![FilterClause::Connective(conn, children)],
        }
    }

    pub fn and(&self, other: &Filter) -> Filter {
        self.combine(other, Connective::And)
    }

    pub fn or(&self, other: &Filter) -> Filter {
        self.combine(other, Connective::Or)
    }

    /// Negates the filter.
    ///
    /// Negating an already-negated filter wraps again rather than
    /// unwrapping, so the expression round-trips to the wire exactly as
    /// written. Use [`Filter::simplify`] to collapse double negations.
    pub fn negate(&self) -> Filter {
        let clause = match self.clauses.len() {
            0 => return Filter::new(),
            1 => self.clauses[0].clone(),
            _ => FilterClause::Connective(Connective::And, self.clauses.clone()),
        };
        Filter {
            clauses: vec![FilterClause::Not(Box::new(clause))],
        }
    }

    /// Collapses directly nested `not` pairs throughout the tree.
    pub fn simplify(self) -> Filter {
        Filter {
            clauses: self
                .clauses
                .into_iter()
                .map(FilterClause::simplified)
                .collect(),
        }
    }

    /// Lowers the tree into the JSON filter grammar consumed by the query
    /// endpoint: term leaves as `[field, value]`, connectives as single-key
    /// objects.
    pub fn to_wire(&self) -> Vec<Value> {
        self.clauses.iter().map(FilterClause::to_wire).collect()
    }
}

impl std::ops::BitAnd for Filter {
    type Output = Filter;

    fn bitand(self, rhs: Filter) -> Filter {
        self.and(&rhs)
    }
}

impl std::ops::BitOr for Filter {
    type Output = Filter;

    fn bitor(self, rhs: Filter) -> Filter {
        self.or(&rhs)
    }
}

impl std::ops::Not for Filter {
    type Output = Filter;

    fn not(self) -> Filter {
        self.negate()
    }
}

/// Keyword-style filter construction.
///
/// ```
/// use genobase::filter;
///
/// let f = filter!(gene_symbol__in = ["BRCA1", "BRCA2"], variant_class = "SNV");
/// ```
///
/// Multiple terms are ANDed together, matching [`Filter::from_terms`].
#[macro_export]
macro_rules! filter {
    () => {
        $crate::filter::Filter::new()
    };
    ($($field:ident = $value:expr),+ $(,)?) => {
        $crate::filter::Filter::from_terms([
            $((stringify!($field), ::serde_json::json!($value))),+
        ])
    };
}

// A 2-element array whose first element is a string is always a term: list
// nodes start with an array or object, never a bare string.
fn parse_bare_term(value: &Value) -> Option<FilterClause> {
    let items = value.as_array()?;
    if items.len() != 2 {
        return None;
    }
    let field = items[0].as_str()?;
    Some(FilterClause::Term(field.to_string(), items[1].clone()))
}

fn parse_node(value: &Value) -> Result<FilterClause> {
    match value {
        Value::Array(_) => parse_bare_term(value)
            .ok_or_else(|| Error::MalformedFilter(format!("not a [field, value] pair: {value}"))),
        Value::Object(map) => {
            if map.len() != 1 {
                return Err(Error::MalformedFilter(format!(
                    "filter node must have exactly one key: {value}"
                )));
            }
            let (key, inner) = map
                .iter()
                .next()
                .map(|(k, v)| (k.as_str(), v))
                .ok_or_else(|| Error::MalformedFilter("empty filter node".to_string()))?;
            match key {
                "and" | "or" => {
                    let conn = if key == "and" {
                        Connective::And
                    } else {
                        Connective::Or
                    };
                    let children = inner.as_array().ok_or_else(|| {
                        Error::MalformedFilter(format!("'{key}' expects a list of nodes: {inner}"))
                    })?;
                    let parsed: Result<Vec<FilterClause>> =
                        children.iter().map(parse_node).collect();
                    Ok(FilterClause::Connective(conn, parsed?))
                }
                "not" => Ok(FilterClause::Not(Box::new(parse_node(inner)?))),
                other => Err(Error::MalformedFilter(format!(
                    "unknown filter connective '{other}'"
                ))),
            }
        }
        other => Err(Error::MalformedFilter(format!(
            "expected an object or array node, got: {other}"
        ))),
    }
}
