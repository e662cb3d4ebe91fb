//! Collaborator seams the statistics layer reads tables through.
//!
//! A [`Catalog`] answers schema questions about a table, a [`RowSource`]
//! opens sequential passes over its rows. Every call to
//! [`RowSource::scan`] starts a fresh pass from the first row.

use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use crate::error::Error;
use crate::types::{ColumnType, TableId, Value};

pub mod memory;
#[cfg(test)]
pub(crate) mod scripted;

pub use memory::MemoryStorage;

/// A single row produced by a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn field_count(&self) -> usize {
        self.values.len()
    }

    pub fn field(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

/// Schema and size metadata for tables
pub trait Catalog: Send + Sync {
    fn table_exists(&self, table_id: TableId) -> bool;

    fn column_count(&self, table_id: TableId) -> Result<usize, Error>;

    fn column_type(&self, table_id: TableId, index: usize) -> Result<ColumnType, Error>;

    fn table_name(&self, table_id: TableId) -> Result<String, Error>;

    /// Number of pages the table occupies on storage
    fn page_count(&self, table_id: TableId) -> Result<u64, Error>;

    fn table_ids(&self) -> Vec<TableId>;
}

/// Opens sequential passes over a table's rows
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn scan(&self, table_id: TableId) -> Result<Box<dyn RowScanner>, Error>;
}

/// One sequential pass over a table
#[async_trait]
pub trait RowScanner: Send {
    /// Get the next row, `None` at the end of the table
    async fn next_row(&mut self) -> Result<Option<Row>, Error>;
}
