use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

/// Engine-wide scan policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Whether a scan may fall back to reading every record of a collection.
    pub scans_enabled: bool,
    /// Upper bound on matching records yielded by one scan.
    pub max_records: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scans_enabled: true,
            max_records: 10_000,
        }
    }
}

/// Process-wide, concurrently mutable [`EngineConfig`].
///
/// Scans call [`snapshot`](SharedConfig::snapshot) once when they start and
/// never observe later updates.
#[derive(Debug)]
pub struct SharedConfig {
    inner: ArcSwap<EngineConfig>,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl SharedConfig {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            inner: ArcSwap::from_pointee(config),
        }
    }

    pub fn snapshot(&self) -> Arc<EngineConfig> {
        self.inner.load_full()
    }

    pub fn store(&self, config: EngineConfig) {
        self.inner.store(Arc::new(config));
    }

    pub fn set_scans_enabled(&self, scans_enabled: bool) {
        self.inner.rcu(|current| EngineConfig {
            scans_enabled,
            ..EngineConfig::clone(current)
        });
    }

    pub fn set_max_records(&self, max_records: usize) {
        self.inner.rcu(|current| EngineConfig {
            max_records,
            ..EngineConfig::clone(current)
        });
    }
}
