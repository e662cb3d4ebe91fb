//! Row source that replays a fixed script per pass, for failure tests.

use std::collections::VecDeque;
use async_trait::async_trait;
use parking_lot::Mutex;
use crate::error::Error;
use crate::types::{TableId, Value};
use super::{Row, RowScanner, RowSource};

pub(crate) enum Step {
    Row(Vec<Value>),
    Fail,
}

/// One script per call to `scan`, consumed in order
pub(crate) struct ScriptedSource {
    passes: Mutex<VecDeque<Vec<Step>>>,
}

impl ScriptedSource {
    pub(crate) fn new(passes: Vec<Vec<Step>>) -> Self {
        Self {
            passes: Mutex::new(passes.into()),
        }
    }
}

/// Single-column integer rows
pub(crate) fn int_rows(values: &[i64]) -> Vec<Step> {
    values.iter().map(|&v| Step::Row(vec![Value::Int(v)])).collect()
}

struct ScriptedScanner {
    steps: std::vec::IntoIter<Step>,
}

#[async_trait]
impl RowScanner for ScriptedScanner {
    async fn next_row(&mut self) -> Result<Option<Row>, Error> {
        match self.steps.next() {
            Some(Step::Row(values)) => Ok(Some(Row::new(values))),
            Some(Step::Fail) => Err(Error::Scan("disk read failed".to_string())),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl RowSource for ScriptedSource {
    async fn scan(&self, table_id: TableId) -> Result<Box<dyn RowScanner>, Error> {
        let steps = self.passes.lock().pop_front().ok_or_else(|| {
            Error::Scan(format!("no scan scripted for table {}", table_id))
        })?;
        Ok(Box::new(ScriptedScanner {
            steps: steps.into_iter(),
        }))
    }
}
