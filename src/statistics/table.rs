//! Per-table statistics built from two full scans.
//!
//! The first pass counts rows and finds the `[min, max]` of every integer
//! column. Those ranges size the histograms filled by the second pass.

use std::collections::HashMap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};
use crate::error::Error;
use crate::storage::{Catalog, Row, RowSource};
use crate::types::{ColumnType, Op, TableId, Value};
use super::histogram::{Domain, IntHistogram};
use super::string_histogram::StringHistogram;
use super::StatsConfig;

#[derive(Debug, Clone, Serialize)]
pub struct TableStatistics {
    table_id: TableId,
    table_name: String,
    io_cost_per_page: f64,
    row_count: u64,
    page_count: u64,
    column_types: Vec<ColumnType>,
    /// Observed range per integer column; absent when the table has no rows
    column_ranges: HashMap<usize, Domain>,
    int_histograms: HashMap<usize, IntHistogram>,
    string_histograms: HashMap<usize, StringHistogram>,
    computed_at: DateTime<Utc>,
}

impl TableStatistics {
    /// Scan `table_id` twice and build a histogram for every column
    pub async fn compute(
        catalog: &dyn Catalog,
        source: &dyn RowSource,
        table_id: TableId,
        config: &StatsConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        if !catalog.table_exists(table_id) {
            return Err(Error::Catalog(format!("Unknown table id: {}", table_id)));
        }

        let table_name = catalog.table_name(table_id)?;
        let page_count = catalog.page_count(table_id)?;
        let column_types = (0..catalog.column_count(table_id)?)
            .map(|index| catalog.column_type(table_id, index))
            .collect::<Result<Vec<_>, Error>>()?;

        let (row_count, column_ranges) =
            Self::scan_ranges(source, table_id, &column_types).await?;

        let mut int_histograms = HashMap::new();
        let mut string_histograms = HashMap::new();
        for (index, column_type) in column_types.iter().enumerate() {
            match column_type {
                ColumnType::Int => {
                    let histogram = match column_ranges.get(&index) {
                        Some(range) => {
                            IntHistogram::new(config.histogram_buckets, range.min, range.max)?
                        }
                        None => IntHistogram::empty(config.histogram_buckets)?,
                    };
                    int_histograms.insert(index, histogram);
                }
                ColumnType::String => {
                    string_histograms
                        .insert(index, StringHistogram::new(config.histogram_buckets)?);
                }
            }
        }

        let mut scanner = source.scan(table_id).await?;
        while let Some(row) = scanner.next_row().await? {
            for (index, column_type) in column_types.iter().enumerate() {
                match Self::field(&row, index, *column_type)? {
                    Value::Int(v) => {
                        if let Some(histogram) = int_histograms.get_mut(&index) {
                            histogram.add_value(*v)?;
                        }
                    }
                    Value::String(s) => {
                        if let Some(histogram) = string_histograms.get_mut(&index) {
                            histogram.add_value(s)?;
                        }
                    }
                }
            }
        }

        debug!(
            table = %table_name,
            rows = row_count,
            pages = page_count,
            columns = column_types.len(),
            "computed table statistics"
        );

        Ok(Self {
            table_id,
            table_name,
            io_cost_per_page: config.io_cost_per_page,
            row_count,
            page_count,
            column_types,
            column_ranges,
            int_histograms,
            string_histograms,
            computed_at: Utc::now(),
        })
    }

    /// First pass: row count and per-column integer ranges
    async fn scan_ranges(
        source: &dyn RowSource,
        table_id: TableId,
        column_types: &[ColumnType],
    ) -> Result<(u64, HashMap<usize, Domain>), Error> {
        let mut row_count = 0;
        let mut ranges: HashMap<usize, Domain> = HashMap::new();

        let mut scanner = source.scan(table_id).await?;
        while let Some(row) = scanner.next_row().await? {
            row_count += 1;
            for (index, column_type) in column_types.iter().enumerate() {
                if let Value::Int(v) = Self::field(&row, index, *column_type)? {
                    ranges
                        .entry(index)
                        .and_modify(|range| {
                            range.min = range.min.min(*v);
                            range.max = range.max.max(*v);
                        })
                        .or_insert(Domain { min: *v, max: *v });
                }
            }
        }

        Ok((row_count, ranges))
    }

    fn field(row: &Row, index: usize, expected: ColumnType) -> Result<&Value, Error> {
        let value = row.field(index).ok_or_else(|| {
            Error::Scan(format!(
                "Row has {} fields, column {} is missing",
                row.field_count(),
                index
            ))
        })?;
        if value.column_type() != expected {
            return Err(Error::Type(format!(
                "Column {} expects {}, scan produced {}",
                index, expected, value
            )));
        }
        Ok(value)
    }

    /// Estimated cost of a full sequential scan, every page read from storage
    pub fn estimate_scan_cost(&self) -> f64 {
        self.page_count as f64 * self.io_cost_per_page
    }

    /// Number of rows left after applying a predicate of the given selectivity
    pub fn estimate_table_cardinality(&self, selectivity_factor: f64) -> u64 {
        (selectivity_factor * self.row_count as f64).floor() as u64
    }

    /// Estimate the selectivity of `column op constant`
    pub fn estimate_selectivity(&self, column: usize, op: Op, constant: &Value) -> f64 {
        match (self.column_types.get(column), constant) {
            (Some(ColumnType::Int), Value::Int(v)) => self
                .int_histograms
                .get(&column)
                .map_or(0.0, |h| h.estimate_selectivity(op, *v)),
            (Some(ColumnType::String), Value::String(s)) => self
                .string_histograms
                .get(&column)
                .map_or(0.0, |h| h.estimate_selectivity(op, s)),
            (column_type, _) => {
                warn!(
                    table = %self.table_name,
                    column,
                    ?column_type,
                    constant = %constant,
                    "no histogram matches predicate constant"
                );
                0.0
            }
        }
    }

    /// Expected selectivity of `column op ?` for an unknown constant
    pub fn avg_selectivity(&self, column: usize, op: Op) -> f64 {
        match self.column_types.get(column) {
            Some(ColumnType::Int) => self
                .int_histograms
                .get(&column)
                .map_or(0.0, |h| h.avg_selectivity(op)),
            Some(ColumnType::String) => self
                .string_histograms
                .get(&column)
                .map_or(0.0, |h| h.avg_selectivity(op)),
            None => 0.0,
        }
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn total_rows(&self) -> u64 {
        self.row_count
    }

    pub fn page_count(&self) -> u64 {
        self.page_count
    }

    pub fn column_types(&self) -> &[ColumnType] {
        &self.column_types
    }

    /// Observed `(min, max)` of an integer column
    pub fn column_range(&self, column: usize) -> Option<(i64, i64)> {
        self.column_ranges.get(&column).map(|range| (range.min, range.max))
    }

    pub fn int_histogram(&self, column: usize) -> Option<&IntHistogram> {
        self.int_histograms.get(&column)
    }

    pub fn string_histogram(&self, column: usize) -> Option<&StringHistogram> {
        self.string_histograms.get(&column)
    }

    pub fn computed_at(&self) -> DateTime<Utc> {
        self.computed_at
    }
}
