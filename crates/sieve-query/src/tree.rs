use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::predicate::Predicate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOp {
    And,
    Or,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::And => f.write_str("AND"),
            LogicalOp::Or => f.write_str("OR"),
        }
    }
}

/// Boolean composition of predicates.
///
/// Built through [`PredicateTree::and`] / [`PredicateTree::or`], which keep
/// combinators at two or more children and merge a combinator nested
/// directly inside the same combinator.
///
/// The `And` and `Or` variants are public for matching; building them
/// directly is unchecked. [`PredicateTree::validate`] rejects such a tree
/// when a combinator has fewer than two children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "UncheckedTree")]
pub enum PredicateTree {
    Leaf(Predicate),
    And(Vec<PredicateTree>),
    Or(Vec<PredicateTree>),
}

impl PredicateTree {
    pub fn leaf(predicate: Predicate) -> Self {
        PredicateTree::Leaf(predicate)
    }

    /// `and(x)` returns `x`; `and(and(a, b), c)` is `And[a, b, c]`.
    pub fn and(children: impl IntoIterator<Item = PredicateTree>) -> Result<Self, QueryError> {
        Self::combine(LogicalOp::And, children.into_iter().map(Some))
    }

    pub fn or(children: impl IntoIterator<Item = PredicateTree>) -> Result<Self, QueryError> {
        Self::combine(LogicalOp::Or, children.into_iter().map(Some))
    }

    /// Combine possibly-absent children. An absent child is an error, never
    /// silently dropped.
    pub fn combine(
        logical: LogicalOp,
        children: impl IntoIterator<Item = Option<PredicateTree>>,
    ) -> Result<Self, QueryError> {
        let mut flat = Vec::new();
        for (i, child) in children.into_iter().enumerate() {
            let Some(child) = child else {
                return Err(QueryError::InvalidTree(format!(
                    "{logical} child {i} is absent"
                )));
            };
            match (logical, child) {
                (LogicalOp::And, PredicateTree::And(nested))
                | (LogicalOp::Or, PredicateTree::Or(nested)) => flat.extend(nested),
                (_, child) => flat.push(child),
            }
        }

        match flat.len() {
            0 => Err(QueryError::InvalidTree(format!(
                "{logical} needs at least one child"
            ))),
            1 => Ok(flat.swap_remove(0)),
            _ => Ok(match logical {
                LogicalOp::And => PredicateTree::And(flat),
                LogicalOp::Or => PredicateTree::Or(flat),
            }),
        }
    }

    pub const fn as_leaf(&self) -> Option<&Predicate> {
        match self {
            PredicateTree::Leaf(p) => Some(p),
            _ => None,
        }
    }

    pub const fn logical(&self) -> Option<LogicalOp> {
        match self {
            PredicateTree::Leaf(_) => None,
            PredicateTree::And(_) => Some(LogicalOp::And),
            PredicateTree::Or(_) => Some(LogicalOp::Or),
        }
    }

    pub fn children(&self) -> &[PredicateTree] {
        match self {
            PredicateTree::Leaf(_) => &[],
            PredicateTree::And(children) | PredicateTree::Or(children) => children,
        }
    }

    /// Check that every combinator in the tree has at least two children.
    pub fn validate(&self) -> Result<(), QueryError> {
        let Some(logical) = self.logical() else {
            return Ok(());
        };
        let children = self.children();
        if children.len() < 2 {
            return Err(QueryError::InvalidTree(format!(
                "{logical} needs at least two children, got {}",
                children.len()
            )));
        }
        children.iter().try_for_each(PredicateTree::validate)
    }

    /// Every leaf predicate, depth first in declaration order.
    pub fn leaves(&self) -> Vec<&Predicate> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }
}

fn collect_leaves<'a>(tree: &'a PredicateTree, out: &mut Vec<&'a Predicate>) {
    match tree {
        PredicateTree::Leaf(p) => out.push(p),
        PredicateTree::And(children) | PredicateTree::Or(children) => {
            for child in children {
                collect_leaves(child, out);
            }
        }
    }
}

impl From<Predicate> for PredicateTree {
    fn from(p: Predicate) -> Self {
        PredicateTree::Leaf(p)
    }
}

impl fmt::Display for PredicateTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (logical, children) = match self {
            PredicateTree::Leaf(p) => return write!(f, "{p}"),
            PredicateTree::And(children) => (LogicalOp::And, children),
            PredicateTree::Or(children) => (LogicalOp::Or, children),
        };
        f.write_str("(")?;
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                write!(f, " {logical} ")?;
            }
            write!(f, "{child}")?;
        }
        f.write_str(")")
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum UncheckedTree {
    Leaf(Predicate),
    And(Vec<PredicateTree>),
    Or(Vec<PredicateTree>),
}

impl TryFrom<UncheckedTree> for PredicateTree {
    type Error = QueryError;

    fn try_from(tree: UncheckedTree) -> Result<Self, Self::Error> {
        match tree {
            UncheckedTree::Leaf(p) => Ok(PredicateTree::Leaf(p)),
            UncheckedTree::And(children) => PredicateTree::and(children),
            UncheckedTree::Or(children) => PredicateTree::or(children),
        }
    }
}
