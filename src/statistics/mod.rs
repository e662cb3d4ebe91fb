use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::RwLock;
use serde::{Serialize, Deserialize};
use tracing::{info, warn};
use crate::error::Error;
use crate::storage::{Catalog, RowSource};

pub mod histogram;
pub mod string_histogram;
pub mod table;

pub use histogram::{BucketPosition, Domain, IntHistogram, MAX_HISTOGRAM_BUCKETS};
pub use string_histogram::StringHistogram;
pub use table::TableStatistics;

/// Downstream cost estimates assume at least this many buckets
pub const DEFAULT_HISTOGRAM_BUCKETS: usize = 100;
pub const DEFAULT_IO_COST_PER_PAGE: f64 = 1000.0;

/// Settings used when building table statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub histogram_buckets: usize,
    /// Cost of reading one page; seeks and sequential reads cost the same
    pub io_cost_per_page: f64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            histogram_buckets: DEFAULT_HISTOGRAM_BUCKETS,
            io_cost_per_page: DEFAULT_IO_COST_PER_PAGE,
        }
    }
}

impl StatsConfig {
    pub fn with_histogram_buckets(mut self, buckets: usize) -> Self {
        self.histogram_buckets = buckets;
        self
    }

    pub fn with_io_cost_per_page(mut self, cost: f64) -> Self {
        self.io_cost_per_page = cost;
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.histogram_buckets == 0 || self.histogram_buckets > MAX_HISTOGRAM_BUCKETS {
            return Err(Error::Configuration(format!(
                "histogram_buckets must be between 1 and {}, got {}",
                MAX_HISTOGRAM_BUCKETS, self.histogram_buckets
            )));
        }
        if !self.io_cost_per_page.is_finite() || self.io_cost_per_page < 0.0 {
            return Err(Error::Configuration(format!(
                "Invalid io_cost_per_page: {}",
                self.io_cost_per_page
            )));
        }
        Ok(())
    }
}

/// Process-wide mapping from table name to its statistics.
///
/// Entries are only inserted once fully computed, so readers see either
/// the previous statistics for a table or the new ones.
pub struct StatisticsRegistry {
    table_stats: RwLock<HashMap<String, Arc<TableStatistics>>>,
}

impl StatisticsRegistry {
    pub fn new() -> Self {
        Self {
            table_stats: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, table_name: &str) -> Option<Arc<TableStatistics>> {
        self.table_stats.read().get(table_name).cloned()
    }

    /// Publish statistics for a table, replacing any previous entry
    pub fn set(&self, table_name: impl Into<String>, stats: impl Into<Arc<TableStatistics>>) {
        self.table_stats.write().insert(table_name.into(), stats.into());
    }

    pub fn remove(&self, table_name: &str) -> Option<Arc<TableStatistics>> {
        self.table_stats.write().remove(table_name)
    }

    /// Copy of the current mapping
    pub fn snapshot(&self) -> HashMap<String, Arc<TableStatistics>> {
        self.table_stats.read().clone()
    }

    /// Swap in a whole new mapping
    pub fn replace_all(&self, table_stats: HashMap<String, Arc<TableStatistics>>) {
        *self.table_stats.write() = table_stats;
    }

    pub fn len(&self) -> usize {
        self.table_stats.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table_stats.read().is_empty()
    }

    /// Recompute statistics for every table in the catalog.
    ///
    /// Tables are processed one at a time and each is published as soon as
    /// it is built. The first failure stops the run; tables not yet reached
    /// keep their previous entries.
    pub async fn recompute_all(
        &self,
        catalog: &dyn Catalog,
        source: &dyn RowSource,
        config: &StatsConfig,
    ) -> Result<usize, Error> {
        let table_ids = catalog.table_ids();
        info!(tables = table_ids.len(), "computing table statistics");

        for &table_id in &table_ids {
            let stats = TableStatistics::compute(catalog, source, table_id, config)
                .await
                .map_err(|e| {
                    warn!(table_id, error = %e, "failed to compute table statistics");
                    e
                })?;
            self.set(stats.table_name().to_string(), stats);
        }

        info!(tables = table_ids.len(), "table statistics done");
        Ok(table_ids.len())
    }
}

impl Default for StatisticsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
