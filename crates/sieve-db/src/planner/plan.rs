use std::fmt;

use sieve_query::PredicateTree;
use sieve_store::IndexQuery;

/// Outcome of planning one scan.
///
/// `pushed` is answered by storage through a secondary index; `residual` is
/// evaluated in-process against every record storage returns. The full
/// predicate is `pushed AND residual`, with `None` standing for "accept".
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub pushed: Option<IndexQuery>,
    pub residual: Option<PredicateTree>,
}

impl Plan {
    /// A plan that reads every record and accepts all of them.
    pub const fn full_scan() -> Self {
        Self {
            pushed: None,
            residual: None,
        }
    }

    pub const fn is_full_scan(&self) -> bool {
        self.pushed.is_none()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pushed {
            Some(query) => write!(f, "IndexScan({query})")?,
            None => write!(f, "Scan")?,
        }
        if let Some(residual) = &self.residual {
            write!(f, " -> Filter({residual})")?;
        }
        Ok(())
    }
}
