mod histogram;
mod hll;

pub use histogram::{Histogram, HistogramBucket};
pub use hll::HyperLogLog;

use crate::tuple::Value;
use std::collections::BTreeMap;

///
/// TableStats
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TableStats {
    pub row_count: u64,
    pub avg_row_size: u64,
    /// Fraction of rows sampled when the statistics were collected.
    pub sample_rate: f64,
    pub collected_at_unix_ms: u64,
}

///
/// IndexStats
///

#[derive(Clone, Debug)]
pub struct IndexStats {
    /// Distinct indexed values, typically HyperLogLog-derived.
    pub distinct_values: u64,
    pub null_count: u64,
    pub min_value: Option<Value>,
    pub max_value: Option<Value>,
    pub histogram: Option<Histogram>,
}

///
/// StatsProvider
///
/// Read-mostly statistics surface consulted by the planner. Absence of
/// statistics is normal; estimation falls back to fixed defaults.
///

pub trait StatsProvider: Send + Sync {
    fn table_stats(&self, record_type: &str) -> Option<TableStats>;
    fn index_stats(&self, index_name: &str) -> Option<IndexStats>;
}

///
/// NoStats
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NoStats;

impl StatsProvider for NoStats {
    fn table_stats(&self, _record_type: &str) -> Option<TableStats> {
        None
    }

    fn index_stats(&self, _index_name: &str) -> Option<IndexStats> {
        None
    }
}

///
/// MemoryStats
///
/// Statistics registry populated out of band (an analyze pass, a test).
///

#[derive(Clone, Debug, Default)]
pub struct MemoryStats {
    tables: BTreeMap<String, TableStats>,
    indexes: BTreeMap<String, IndexStats>,
}

impl MemoryStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_table(&mut self, record_type: impl Into<String>, stats: TableStats) {
        self.tables.insert(record_type.into(), stats);
    }

    pub fn set_index(&mut self, index_name: impl Into<String>, stats: IndexStats) {
        self.indexes.insert(index_name.into(), stats);
    }
}

impl StatsProvider for MemoryStats {
    fn table_stats(&self, record_type: &str) -> Option<TableStats> {
        self.tables.get(record_type).copied()
    }

    fn index_stats(&self, index_name: &str) -> Option<IndexStats> {
        self.indexes.get(index_name).cloned()
    }
}

///
/// TESTS
///
