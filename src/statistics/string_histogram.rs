//! Histogram over string values.
//!
//! Strings are mapped onto integers by their first four bytes read as a
//! base-256 number, so ordering of keys follows byte-wise ordering of the
//! prefixes. The keys are bucketed by an [`IntHistogram`].

use serde::Serialize;
use crate::error::Error;
use crate::types::Op;
use super::histogram::IntHistogram;

const PREFIX_LEN: usize = 4;
const MAX_PREFIX: &str = "zzzz";

#[derive(Debug, Clone, Serialize)]
pub struct StringHistogram {
    inner: IntHistogram,
}

impl StringHistogram {
    pub fn new(buckets: usize) -> Result<Self, Error> {
        Ok(Self {
            inner: IntHistogram::new(buckets, Self::min_key(), Self::max_key())?,
        })
    }

    /// Integer key of a string, clamped to the histogram's key range
    pub fn key(s: &str) -> i64 {
        Self::raw_key(s).clamp(Self::min_key(), Self::max_key())
    }

    fn raw_key(s: &str) -> i64 {
        let bytes = s.as_bytes();
        (0..PREFIX_LEN).fold(0i64, |key, i| {
            (key << 8) | bytes.get(i).copied().unwrap_or(0) as i64
        })
    }

    fn min_key() -> i64 {
        Self::raw_key("")
    }

    fn max_key() -> i64 {
        Self::raw_key(MAX_PREFIX)
    }

    pub fn add_value(&mut self, s: &str) -> Result<(), Error> {
        self.inner.add_value(Self::key(s))
    }

    pub fn estimate_selectivity(&self, op: Op, s: &str) -> f64 {
        self.inner.estimate_selectivity(op, Self::key(s))
    }

    pub fn avg_selectivity(&self, op: Op) -> f64 {
        self.inner.avg_selectivity(op)
    }

    pub fn total_count(&self) -> u64 {
        self.inner.total_count()
    }

    pub fn histogram(&self) -> &IntHistogram {
        &self.inner
    }
}
