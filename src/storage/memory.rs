use std::collections::BTreeMap;
use std::sync::Arc;
use async_trait::async_trait;
use parking_lot::RwLock;
use crate::error::Error;
use crate::types::{ColumnType, TableId, Value};
use super::{Catalog, Row, RowScanner, RowSource};

pub const PAGE_SIZE: usize = 4096;
const PAGE_HEADER_SIZE: usize = 64;
const SLOT_SIZE: usize = 8;

/// In-memory heap tables laid out as slotted pages.
///
/// Rows are kept as values; only their encoded size is used, to track how
/// many pages the table would occupy on disk.
pub struct MemoryStorage {
    tables: RwLock<BTreeMap<TableId, MemoryTable>>,
}

struct MemoryTable {
    name: String,
    columns: Vec<ColumnType>,
    rows: Arc<Vec<Row>>,
    page_count: u64,
    /// Free bytes left in the last page
    free_space: usize,
}

impl MemoryTable {
    fn place_record(&mut self, len: usize) -> Result<(), Error> {
        let required_space = len + SLOT_SIZE;
        if required_space > PAGE_SIZE - PAGE_HEADER_SIZE {
            return Err(Error::Storage(format!(
                "Row of {} bytes does not fit in a page",
                len
            )));
        }

        if self.page_count == 0 || required_space > self.free_space {
            self.page_count += 1;
            self.free_space = PAGE_SIZE - PAGE_HEADER_SIZE;
        }
        self.free_space -= required_space;
        Ok(())
    }
}

/// Encoded size of a row: 8 bytes per integer, length-prefixed strings
fn encoded_len(row: &Row) -> usize {
    row.values()
        .iter()
        .map(|value| match value {
            Value::Int(_) => 8,
            Value::String(s) => 4 + s.len(),
        })
        .sum()
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a table and return its id
    pub fn create_table(&self, name: &str, columns: Vec<ColumnType>) -> Result<TableId, Error> {
        let mut tables = self.tables.write();
        if tables.values().any(|t| t.name == name) {
            return Err(Error::Catalog(format!("Table already exists: {}", name)));
        }

        let table_id = tables.keys().next_back().map_or(1, |id| id + 1);
        tables.insert(
            table_id,
            MemoryTable {
                name: name.to_string(),
                columns,
                rows: Arc::new(Vec::new()),
                page_count: 0,
                free_space: 0,
            },
        );
        Ok(table_id)
    }

    /// Append a row after checking it against the table's column types
    pub fn insert(&self, table_id: TableId, row: impl Into<Row>) -> Result<(), Error> {
        let row = row.into();
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(&table_id)
            .ok_or_else(|| Self::unknown_table(table_id))?;

        if row.field_count() != table.columns.len() {
            return Err(Error::Type(format!(
                "Row has {} fields, table {} has {} columns",
                row.field_count(),
                table.name,
                table.columns.len()
            )));
        }
        for (index, (value, column_type)) in row.values().iter().zip(&table.columns).enumerate() {
            if value.column_type() != *column_type {
                return Err(Error::Type(format!(
                    "Column {} of {} expects {}, got {}",
                    index, table.name, column_type, value
                )));
            }
        }

        table.place_record(encoded_len(&row))?;
        Arc::make_mut(&mut table.rows).push(row);
        Ok(())
    }

    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.tables
            .read()
            .iter()
            .find(|(_, t)| t.name == name)
            .map(|(id, _)| *id)
    }

    pub fn drop_table(&self, table_id: TableId) -> Result<(), Error> {
        self.tables
            .write()
            .remove(&table_id)
            .map(|_| ())
            .ok_or_else(|| Self::unknown_table(table_id))
    }

    fn unknown_table(table_id: TableId) -> Error {
        Error::Catalog(format!("Unknown table id: {}", table_id))
    }

    fn with_table<T>(
        &self,
        table_id: TableId,
        f: impl FnOnce(&MemoryTable) -> T,
    ) -> Result<T, Error> {
        self.tables
            .read()
            .get(&table_id)
            .map(f)
            .ok_or_else(|| Self::unknown_table(table_id))
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog for MemoryStorage {
    fn table_exists(&self, table_id: TableId) -> bool {
        self.tables.read().contains_key(&table_id)
    }

    fn column_count(&self, table_id: TableId) -> Result<usize, Error> {
        self.with_table(table_id, |t| t.columns.len())
    }

    fn column_type(&self, table_id: TableId, index: usize) -> Result<ColumnType, Error> {
        self.with_table(table_id, |t| t.columns.get(index).copied())?
            .ok_or_else(|| Error::Catalog(format!(
                "Column {} out of range for table {}",
                index, table_id
            )))
    }

    fn table_name(&self, table_id: TableId) -> Result<String, Error> {
        self.with_table(table_id, |t| t.name.clone())
    }

    fn page_count(&self, table_id: TableId) -> Result<u64, Error> {
        self.with_table(table_id, |t| t.page_count)
    }

    fn table_ids(&self) -> Vec<TableId> {
        self.tables.read().keys().copied().collect()
    }
}

/// Sequential pass over a snapshot of a memory table
pub struct MemoryScanner {
    rows: Arc<Vec<Row>>,
    position: usize,
}

#[async_trait]
impl RowScanner for MemoryScanner {
    async fn next_row(&mut self) -> Result<Option<Row>, Error> {
        let row = self.rows.get(self.position).cloned();
        if row.is_some() {
            self.position += 1;
        }
        Ok(row)
    }
}

#[async_trait]
impl RowSource for MemoryStorage {
    async fn scan(&self, table_id: TableId) -> Result<Box<dyn RowScanner>, Error> {
        let rows = self.with_table(table_id, |t| Arc::clone(&t.rows))?;
        Ok(Box::new(MemoryScanner { rows, position: 0 }))
    }
}
