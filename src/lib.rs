// src/lib.rs
pub mod error;
pub mod statistics;
pub mod storage;
pub mod types;

pub use error::Error;
pub use statistics::{StatisticsRegistry, StatsConfig, TableStatistics};
pub use storage::{Catalog, Row, RowScanner, RowSource};
pub use types::{ColumnType, Op, TableId, Value};
