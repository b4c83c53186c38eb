use sieve_query::{Operator, Predicate, PredicateTree, Value};
use sieve_store::{IndexCatalog, IndexQuery, IndexType};

use crate::config::EngineConfig;
use crate::error::DbError;

use super::plan::Plan;

/// Chooses at most one index-answerable condition per scan and enforces the
/// scans-enabled policy.
pub struct FilterPlanner<'a> {
    catalog: &'a dyn IndexCatalog,
    config: &'a EngineConfig,
}

impl<'a> FilterPlanner<'a> {
    pub fn new(catalog: &'a dyn IndexCatalog, config: &'a EngineConfig) -> Self {
        Self { catalog, config }
    }

    /// Plan a scan of `collection`.
    ///
    /// An explicit `hint` is pushed as given and the whole predicate becomes
    /// the residual. Fails with [`DbError::ScansDisabled`] when nothing could
    /// be pushed and full scans are disabled, and with [`DbError::Query`] when
    /// a hand-built combinator has fewer than two children.
    pub fn plan(
        &self,
        collection: &str,
        predicate: Option<&PredicateTree>,
        hint: Option<&IndexQuery>,
    ) -> Result<Plan, DbError> {
        if let Some(tree) = predicate {
            tree.validate()?;
        }

        let plan = match (hint, predicate) {
            (Some(hint), predicate) => Plan {
                pushed: Some(hint.clone()),
                residual: predicate.cloned(),
            },
            (None, Some(tree)) => plan(collection, tree, self.catalog),
            (None, None) => Plan::full_scan(),
        };

        if plan.is_full_scan() && !self.config.scans_enabled {
            tracing::warn!(collection, "full scan required but scans are disabled");
            return Err(DbError::ScansDisabled {
                collection: collection.to_string(),
            });
        }

        match &plan.pushed {
            Some(query) => tracing::debug!(
                collection,
                field = %query.field,
                operator = %query.operator,
                hinted = hint.is_some(),
                residual = plan.residual.is_some(),
                "pushing index filter"
            ),
            None => tracing::debug!(
                collection,
                residual = plan.residual.is_some(),
                "planning full scan"
            ),
        }
        Ok(plan)
    }
}

/// Split `tree` into an index-pushed condition and the residual to evaluate.
///
/// Only a lone leaf or a direct child of a top-level `And` can be pushed; the
/// first pushable leaf in declaration order wins. An `Or` at the root is never
/// pushed. A pushed leaf that storage can only over-approximate stays in the
/// residual.
pub fn plan(collection: &str, tree: &PredicateTree, catalog: &dyn IndexCatalog) -> Plan {
    match tree {
        PredicateTree::Leaf(predicate) => match index_query(collection, predicate, catalog) {
            Some(pushdown) => Plan {
                residual: (!pushdown.exact).then(|| tree.clone()),
                pushed: Some(pushdown.query),
            },
            None => residual_only(tree),
        },
        PredicateTree::And(children) => plan_and(collection, tree, children, catalog)
            .unwrap_or_else(|| residual_only(tree)),
        PredicateTree::Or(_) => residual_only(tree),
    }
}

fn plan_and(
    collection: &str,
    tree: &PredicateTree,
    children: &[PredicateTree],
    catalog: &dyn IndexCatalog,
) -> Option<Plan> {
    children.iter().enumerate().find_map(|(i, child)| {
        let pushdown = index_query(collection, child.as_leaf()?, catalog)?;
        let residual = if pushdown.exact {
            residual_from_and(children, i)
        } else {
            Some(tree.clone())
        };
        Some(Plan {
            pushed: Some(pushdown.query),
            residual,
        })
    })
}

fn residual_only(tree: &PredicateTree) -> Plan {
    Plan {
        pushed: None,
        residual: Some(tree.clone()),
    }
}

/// Given AND children and the consumed index, build the residual predicate.
fn residual_from_and(children: &[PredicateTree], consumed: usize) -> Option<PredicateTree> {
    let mut remaining: Vec<PredicateTree> = children
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != consumed)
        .map(|(_, c)| c.clone())
        .collect();

    match remaining.len() {
        0 => None,
        1 => remaining.pop(),
        _ => Some(PredicateTree::And(remaining)),
    }
}

/// A storage query for one leaf. `exact` is false when storage may return
/// records the leaf rejects.
struct Pushdown {
    query: IndexQuery,
    exact: bool,
}

/// The storage query for `predicate` if an index on its field can answer it.
///
/// Storage answers BETWEEN as `[bound1, bound2)` while the leaf is inclusive,
/// so the upper bound is pushed as `hi + 1`. Floats indexed between `hi` and
/// `hi + 1` then come back too, and the leaf is kept for evaluation.
fn index_query(
    collection: &str,
    predicate: &Predicate,
    catalog: &dyn IndexCatalog,
) -> Option<Pushdown> {
    let operator = predicate.operator();
    if !operator.is_index_pushable()
        || predicate.ignore_case()
        || predicate.is_metadata()
        || predicate.selector().is_some()
    {
        return None;
    }
    let descriptor = catalog.lookup_index(collection, predicate.field())?;

    let is_int = |v: Option<&Value>| matches!(v, Some(Value::Int(_)));
    let fits = match (descriptor.index_type, operator) {
        (IndexType::Numeric, Operator::Between) => {
            is_int(Some(predicate.value1())) && is_int(predicate.value2())
        }
        (IndexType::Numeric, Operator::Eq | Operator::Lt | Operator::LtEq)
        | (IndexType::Numeric, Operator::Gt | Operator::GtEq) => {
            is_int(Some(predicate.value1()))
        }
        (IndexType::String, Operator::Eq) => matches!(predicate.value1(), Value::String(_)),
        (IndexType::Geo2dSphere, Operator::GeoWithin) => true,
        _ => false,
    };

    if !fits {
        return None;
    }

    let query = IndexQuery {
        field: predicate.field().to_string(),
        operator,
        bound1: predicate.value1().clone(),
        bound2: predicate.value2().cloned(),
    };
    match (descriptor.index_type, operator, predicate.value2()) {
        (IndexType::Numeric, Operator::Between, Some(Value::Int(hi))) => {
            // i64::MAX has no exclusive successor; evaluate in-process instead
            let upper = hi.checked_add(1)?;
            Some(Pushdown {
                query: IndexQuery {
                    bound2: Some(Value::Int(upper)),
                    ..query
                },
                exact: false,
            })
        }
        _ => Some(Pushdown { query, exact: true }),
    }
}
