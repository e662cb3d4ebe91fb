//! Equal-width frequency histogram over a bounded integer domain.
//!
//! The histogram keeps one counter per bucket and never stores the values
//! it has seen, so ingestion is O(1) in time and space. Selectivity is
//! estimated by assuming values are spread uniformly inside each bucket.
//!
//! `<=` and `>=` are estimated exactly like `<` and `>`: the partial bucket
//! contribution counts only the values strictly below (or above) the
//! constant, and the constant itself is never added back.

use std::fmt;
use serde::{Serialize, Deserialize};
use crate::error::Error;
use crate::types::Op;

/// Where a value falls relative to the histogram's buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketPosition {
    BelowDomain,
    InBucket(usize),
    AboveDomain,
}

/// Inclusive value domain of a histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub min: i64,
    pub max: i64,
}

impl Domain {
    fn span(&self) -> i128 {
        self.max as i128 - self.min as i128 + 1
    }

    /// Integer bucket width, `ceil(span / buckets)`
    fn width(&self, buckets: usize) -> i128 {
        let buckets = buckets as i128;
        (self.span() + buckets - 1) / buckets
    }
}

/// Largest bucket count a histogram accepts
pub const MAX_HISTOGRAM_BUCKETS: usize = 1 << 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "HistogramParts")]
pub struct IntHistogram {
    bucket_count: usize,
    /// `None` when no domain could be determined (e.g. the column had no rows).
    domain: Option<Domain>,
    counts: Vec<u64>,
    total: u64,
}

/// Unchecked serialized form of [`IntHistogram`]
#[derive(Deserialize)]
struct HistogramParts {
    bucket_count: usize,
    domain: Option<Domain>,
    counts: Vec<u64>,
    total: u64,
}

impl TryFrom<HistogramParts> for IntHistogram {
    type Error = Error;

    fn try_from(parts: HistogramParts) -> Result<Self, Self::Error> {
        let mut histogram = match parts.domain {
            Some(domain) => Self::new(parts.bucket_count, domain.min, domain.max)?,
            None => Self::empty(parts.bucket_count)?,
        };
        if parts.counts.len() != parts.bucket_count {
            return Err(Error::Configuration(format!(
                "Histogram has {} buckets but {} counts",
                parts.bucket_count,
                parts.counts.len()
            )));
        }
        if parts.counts.iter().sum::<u64>() != parts.total {
            return Err(Error::Configuration(format!(
                "Histogram total {} does not match its bucket counts",
                parts.total
            )));
        }
        if histogram.domain.is_none() && parts.total > 0 {
            return Err(Error::EmptyDomain);
        }

        histogram.counts = parts.counts;
        histogram.total = parts.total;
        Ok(histogram)
    }
}

impl IntHistogram {
    /// Create a histogram with `buckets` buckets over `[min, max]`
    pub fn new(buckets: usize, min: i64, max: i64) -> Result<Self, Error> {
        Self::check_bucket_count(buckets)?;
        if min > max {
            return Err(Error::Configuration(format!(
                "Inverted histogram domain [{}, {}]",
                min, max
            )));
        }

        Ok(Self {
            bucket_count: buckets,
            domain: Some(Domain { min, max }),
            counts: vec![0; buckets],
            total: 0,
        })
    }

    /// Create a histogram with no domain. It rejects every value and
    /// estimates a selectivity of 0 for every predicate.
    pub fn empty(buckets: usize) -> Result<Self, Error> {
        Self::check_bucket_count(buckets)?;
        Ok(Self {
            bucket_count: buckets,
            domain: None,
            counts: vec![0; buckets],
            total: 0,
        })
    }

    fn check_bucket_count(buckets: usize) -> Result<(), Error> {
        if buckets == 0 || buckets > MAX_HISTOGRAM_BUCKETS {
            return Err(Error::Configuration(format!(
                "Histogram bucket count must be between 1 and {}, got {}",
                MAX_HISTOGRAM_BUCKETS, buckets
            )));
        }
        Ok(())
    }

    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    pub fn domain(&self) -> Option<Domain> {
        self.domain
    }

    pub fn is_empty_domain(&self) -> bool {
        self.domain.is_none()
    }

    /// Number of domain values mapped to each bucket
    pub fn bucket_width(&self) -> Option<u128> {
        self.domain.map(|d| d.width(self.bucket_count) as u128)
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn total_count(&self) -> u64 {
        self.total
    }

    /// Locate `v` among the buckets; `None` for an empty-domain histogram
    pub fn bucket_position(&self, v: i64) -> Option<BucketPosition> {
        self.domain.map(|domain| self.position_in(domain, v))
    }

    fn position_in(&self, domain: Domain, v: i64) -> BucketPosition {
        if v < domain.min {
            BucketPosition::BelowDomain
        } else if v > domain.max {
            BucketPosition::AboveDomain
        } else {
            let offset = v as i128 - domain.min as i128;
            BucketPosition::InBucket((offset / domain.width(self.bucket_count)) as usize)
        }
    }

    /// Add a single value. The value must lie inside the domain.
    pub fn add_value(&mut self, v: i64) -> Result<(), Error> {
        let domain = self.domain.ok_or(Error::EmptyDomain)?;
        match self.position_in(domain, v) {
            BucketPosition::InBucket(b) => {
                self.counts[b] += 1;
                self.total += 1;
                Ok(())
            }
            _ => Err(Error::DomainViolation {
                value: v,
                min: domain.min,
                max: domain.max,
            }),
        }
    }

    /// Estimate the fraction of ingested values satisfying `value op v`
    pub fn estimate_selectivity(&self, op: Op, v: i64) -> f64 {
        let domain = match self.domain {
            Some(domain) if self.total > 0 => domain,
            _ => return 0.0,
        };
        let position = self.position_in(domain, v);

        let selectivity = match op {
            Op::Equals | Op::Like => self.equality(position),
            Op::NotEquals => 1.0 - self.equality(position),
            Op::LessThan | Op::LessThanOrEq => match position {
                BucketPosition::BelowDomain => 0.0,
                BucketPosition::AboveDomain => 1.0,
                BucketPosition::InBucket(b) => {
                    let (left, right) = self.bucket_bounds(domain, b);
                    let partial = self.fraction(b) * (v as i128 - left) as f64
                        / (right - left) as f64;
                    self.fraction_of(&self.counts[..b])
                        + partial.clamp(0.0, self.fraction(b))
                }
            },
            Op::GreaterThan | Op::GreaterThanOrEq => match position {
                BucketPosition::BelowDomain => 1.0,
                BucketPosition::AboveDomain => 0.0,
                BucketPosition::InBucket(b) => {
                    let (left, right) = self.bucket_bounds(domain, b);
                    let partial = self.fraction(b) * (right - v as i128 - 1) as f64
                        / (right - left) as f64;
                    self.fraction_of(&self.counts[b + 1..])
                        + partial.clamp(0.0, self.fraction(b))
                }
            },
        };

        selectivity.clamp(0.0, 1.0)
    }

    /// Expected selectivity of `value op ?` when the constant is drawn
    /// from the ingested distribution itself
    pub fn avg_selectivity(&self, op: Op) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let equality: f64 = (0..self.bucket_count)
            .map(|b| self.fraction(b) * self.fraction(b))
            .sum();
        match op {
            Op::Equals | Op::Like => equality,
            Op::NotEquals => 1.0 - equality,
            _ => 0.5,
        }
    }

    fn equality(&self, position: BucketPosition) -> f64 {
        match position {
            BucketPosition::InBucket(b) => self.fraction(b),
            _ => 0.0,
        }
    }

    fn fraction(&self, bucket: usize) -> f64 {
        self.counts[bucket] as f64 / self.total as f64
    }

    fn fraction_of(&self, buckets: &[u64]) -> f64 {
        buckets.iter().sum::<u64>() as f64 / self.total as f64
    }

    /// Half-open `[left, right)` range of domain values in bucket `b`.
    ///
    /// The last occupied bucket is cut off at `max + 1`, so its divisor
    /// `right - left` can be smaller than the nominal bucket width. Partial
    /// contributions are `(v - left) / (right - left)` for `<` and
    /// `(right - v - 1) / (right - left)` for `>`: the number of integers
    /// strictly below or above `v` in the bucket, rather than
    /// `(v - left) / width` and `(left + width - v) / width`. On `[1, 10]`
    /// with 3 buckets this gives `< 10` = 0.9 instead of 0.85 and `> 6` = 0.4
    /// instead of 0.5 for one value per integer, and keeps `> max` at 0.
    fn bucket_bounds(&self, domain: Domain, b: usize) -> (i128, i128) {
        let width = domain.width(self.bucket_count);
        let left = domain.min as i128 + b as i128 * width;
        let right = (left + width).min(domain.max as i128 + 1);
        (left, right)
    }
}

impl fmt::Display for IntHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.domain {
            Some(domain) => write!(
                f,
                "IntHistogram[{}..={}, width={}, total={}]",
                domain.min,
                domain.max,
                domain.width(self.bucket_count),
                self.total
            )?,
            None => write!(f, "IntHistogram[empty, total={}]", self.total)?,
        }
        let counts: Vec<String> = self.counts.iter().map(|c| c.to_string()).collect();
        write!(f, " {}", counts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPSILON,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    fn filled(buckets: usize, min: i64, max: i64, values: &[i64]) -> IntHistogram {
        let mut h = IntHistogram::new(buckets, min, max).unwrap();
        for &v in values {
            h.add_value(v).unwrap();
        }
        h
    }

    #[test]
    fn test_equality_scenario() {
        let mut h = IntHistogram::new(10, 1, 100).unwrap();
        for _ in 0..50 {
            h.add_value(50).unwrap();
        }
        for _ in 0..10 {
            h.add_value(5).unwrap();
        }

        assert_eq!(h.total_count(), 60);
        assert_close(h.estimate_selectivity(Op::Equals, 50), 50.0 / 60.0);
        assert_close(h.estimate_selectivity(Op::Equals, 5), 10.0 / 60.0);
        assert_close(h.estimate_selectivity(Op::Like, 5), 10.0 / 60.0);
        assert_eq!(h.estimate_selectivity(Op::Equals, 200), 0.0);
        assert_eq!(h.estimate_selectivity(Op::Equals, -3), 0.0);
    }

    #[test]
    fn test_equality_matches_repeat_count() {
        let values: Vec<i64> = (0..100)
            .flat_map(|v| std::iter::repeat(v).take((v % 4) as usize))
            .collect();
        let h = filled(100, 0, 99, &values);
        let total = h.total_count() as f64;

        for v in 0..100 {
            assert_close(h.estimate_selectivity(Op::Equals, v), (v % 4) as f64 / total);
        }
    }

    #[test]
    fn test_not_equals_complements_equals() {
        let h = filled(7, -20, 20, &[-20, -3, 0, 0, 4, 19, 20]);
        for v in -25..25 {
            let eq = h.estimate_selectivity(Op::Equals, v);
            assert_close(h.estimate_selectivity(Op::NotEquals, v), 1.0 - eq);
        }
    }

    #[test]
    fn test_domain_boundaries() {
        let values: Vec<i64> = (1..=100).collect();
        let h = filled(10, 1, 100, &values);

        assert_eq!(h.estimate_selectivity(Op::LessThan, 1), 0.0);
        assert_eq!(h.estimate_selectivity(Op::GreaterThan, 100), 0.0);
        assert_eq!(h.estimate_selectivity(Op::LessThan, 101), 1.0);
        assert_eq!(h.estimate_selectivity(Op::GreaterThan, 0), 1.0);
        assert_eq!(h.estimate_selectivity(Op::LessThan, -50), 0.0);
        assert_eq!(h.estimate_selectivity(Op::GreaterThanOrEq, 500), 0.0);
    }

    #[test]
    fn test_less_than_is_monotonic() {
        let h = filled(10, 0, 999, &[3, 3, 3, 120, 450, 451, 452, 800, 999, 640]);
        let mut previous = 0.0;
        for v in -10..1010 {
            let sel = h.estimate_selectivity(Op::LessThan, v);
            assert!(sel >= previous, "selectivity dropped at {}: {} < {}", v, sel, previous);
            assert!((0.0..=1.0).contains(&sel));
            previous = sel;
        }
    }

    #[test]
    fn test_range_within_uneven_last_bucket() {
        // width 4: [1,4] [5,8] [9,10]
        let values: Vec<i64> = (1..=10).collect();
        let h = filled(3, 1, 10, &values);

        assert_eq!(h.bucket_width(), Some(4));
        assert_eq!(h.counts(), &[4, 4, 2]);
        assert_close(h.estimate_selectivity(Op::LessThan, 5), 0.4);
        assert_close(h.estimate_selectivity(Op::LessThan, 10), 0.9);
        assert_close(h.estimate_selectivity(Op::GreaterThan, 9), 0.1);
        assert_close(h.estimate_selectivity(Op::GreaterThan, 4), 0.6);
        assert_close(h.estimate_selectivity(Op::GreaterThan, 6), 0.4);
        assert_close(h.estimate_selectivity(Op::LessThanOrEq, 10), 0.9);
    }

    #[test]
    fn test_range_complement_is_close_with_fine_buckets() {
        let values: Vec<i64> = (0..1000).map(|i| i % 200).collect();
        let h = filled(100, 0, 199, &values);

        for v in 0..200 {
            let sum = h.estimate_selectivity(Op::LessThan, v)
                + h.estimate_selectivity(Op::GreaterThanOrEq, v);
            assert!((sum - 1.0).abs() <= 0.01, "sum {} at {}", sum, v);
        }
    }

    #[test]
    fn test_zero_buckets_rejected() {
        assert!(matches!(IntHistogram::new(0, 1, 10), Err(Error::Configuration(_))));
        assert!(matches!(IntHistogram::empty(0), Err(Error::Configuration(_))));
        assert!(matches!(IntHistogram::new(10, 5, 1), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_out_of_domain_value_leaves_state_untouched() {
        let mut h = filled(4, 0, 7, &[1, 6]);
        let err = h.add_value(8).unwrap_err();
        assert!(matches!(err, Error::DomainViolation { value: 8, min: 0, max: 7 }));
        assert!(h.add_value(-1).is_err());

        assert_eq!(h.total_count(), 2);
        assert_eq!(h.counts(), &[1, 0, 0, 1]);
    }

    #[test]
    fn test_empty_domain() {
        let mut h = IntHistogram::empty(100).unwrap();
        assert!(h.is_empty_domain());
        assert!(matches!(h.add_value(0), Err(Error::EmptyDomain)));
        assert_eq!(h.bucket_position(0), None);

        for op in [Op::Equals, Op::NotEquals, Op::LessThan, Op::GreaterThan, Op::Like] {
            assert_eq!(h.estimate_selectivity(op, 0), 0.0);
            assert_eq!(h.avg_selectivity(op), 0.0);
        }
    }

    #[test]
    fn test_no_values_yields_zero() {
        let h = IntHistogram::new(10, 0, 100).unwrap();
        for op in [Op::Equals, Op::NotEquals, Op::LessThan, Op::GreaterThanOrEq] {
            assert_eq!(h.estimate_selectivity(op, 50), 0.0);
            assert_eq!(h.estimate_selectivity(op, 500), 0.0);
        }
    }

    #[test]
    fn test_bucket_positions() {
        let h = IntHistogram::new(10, 1, 100).unwrap();
        assert_eq!(h.bucket_position(0), Some(BucketPosition::BelowDomain));
        assert_eq!(h.bucket_position(1), Some(BucketPosition::InBucket(0)));
        assert_eq!(h.bucket_position(10), Some(BucketPosition::InBucket(0)));
        assert_eq!(h.bucket_position(11), Some(BucketPosition::InBucket(1)));
        assert_eq!(h.bucket_position(100), Some(BucketPosition::InBucket(9)));
        assert_eq!(h.bucket_position(101), Some(BucketPosition::AboveDomain));
    }

    #[test]
    fn test_more_buckets_than_values() {
        let mut h = IntHistogram::new(100, 5, 5).unwrap();
        h.add_value(5).unwrap();
        h.add_value(5).unwrap();

        assert_eq!(h.bucket_width(), Some(1));
        assert_eq!(h.estimate_selectivity(Op::Equals, 5), 1.0);
        assert_eq!(h.estimate_selectivity(Op::LessThan, 5), 0.0);
        assert_eq!(h.estimate_selectivity(Op::GreaterThan, 5), 0.0);
        assert_eq!(h.estimate_selectivity(Op::LessThan, 6), 1.0);
    }

    #[test]
    fn test_full_i64_domain() {
        let mut h = IntHistogram::new(1, i64::MIN, i64::MAX).unwrap();
        h.add_value(i64::MIN).unwrap();
        h.add_value(i64::MAX).unwrap();

        assert_eq!(h.bucket_width(), Some(1u128 << 64));
        assert_eq!(h.estimate_selectivity(Op::Equals, 0), 1.0);
        assert_eq!(h.estimate_selectivity(Op::LessThan, i64::MIN), 0.0);
        assert_eq!(h.estimate_selectivity(Op::GreaterThan, i64::MAX), 0.0);
    }

    #[test]
    fn test_estimates_are_repeatable() {
        let h = filled(10, 0, 99, &[1, 15, 15, 42, 77, 98]);
        for op in [Op::Equals, Op::LessThan, Op::GreaterThanOrEq] {
            let first = h.estimate_selectivity(op, 40);
            for _ in 0..10 {
                assert_eq!(h.estimate_selectivity(op, 40), first);
            }
        }
    }

    #[test]
    fn test_avg_selectivity() {
        let h = filled(2, 0, 3, &[0, 1, 2, 3]);
        assert_close(h.avg_selectivity(Op::Equals), 0.5);
        assert_close(h.avg_selectivity(Op::NotEquals), 0.5);
        assert_close(h.avg_selectivity(Op::LessThan), 0.5);

        let skewed = filled(4, 0, 3, &[0, 0, 0, 3]);
        assert_close(skewed.avg_selectivity(Op::Equals), 0.75 * 0.75 + 0.25 * 0.25);
    }

    #[test]
    fn test_bucket_count_upper_limit() {
        assert!(IntHistogram::new(MAX_HISTOGRAM_BUCKETS, 0, 10).is_ok());
        assert!(matches!(
            IntHistogram::new(MAX_HISTOGRAM_BUCKETS + 1, 0, 10),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(IntHistogram::empty(usize::MAX), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_deserialize_checks_shape() {
        let zero_buckets = r#"{"bucket_count":0,"domain":{"min":1,"max":100},"counts":[],"total":0}"#;
        assert!(serde_json::from_str::<IntHistogram>(zero_buckets).is_err());

        let short_counts = r#"{"bucket_count":10,"domain":{"min":1,"max":100},"counts":[],"total":1}"#;
        assert!(serde_json::from_str::<IntHistogram>(short_counts).is_err());

        let bad_total = r#"{"bucket_count":2,"domain":{"min":1,"max":100},"counts":[1,1],"total":5}"#;
        assert!(serde_json::from_str::<IntHistogram>(bad_total).is_err());

        let inverted = r#"{"bucket_count":2,"domain":{"min":9,"max":1},"counts":[0,0],"total":0}"#;
        assert!(serde_json::from_str::<IntHistogram>(inverted).is_err());

        let filled_empty = r#"{"bucket_count":2,"domain":null,"counts":[1,0],"total":1}"#;
        assert!(serde_json::from_str::<IntHistogram>(filled_empty).is_err());
    }

    #[test]
    fn test_serialized_histogram_reloads() {
        let h = filled(10, 1, 100, &[5, 50, 50, 99]);
        let json = serde_json::to_string(&h).unwrap();
        let reloaded: IntHistogram = serde_json::from_str(&json).unwrap();

        assert_eq!(reloaded.counts(), h.counts());
        assert_eq!(reloaded.total_count(), 4);
        assert_eq!(
            reloaded.estimate_selectivity(Op::Equals, 50),
            h.estimate_selectivity(Op::Equals, 50)
        );
    }

    #[test]
    fn test_display() {
        let h = filled(3, 1, 10, &[1, 2, 10]);
        assert_eq!(h.to_string(), "IntHistogram[1..=10, width=4, total=3] 2 0 1");
        assert_eq!(
            IntHistogram::empty(2).unwrap().to_string(),
            "IntHistogram[empty, total=0] 0 0"
        );
    }
}
