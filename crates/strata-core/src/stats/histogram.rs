use crate::{error::Error, tuple::Value};
use std::cmp::Ordering;

///
/// Histogram
///
/// Contiguous value buckets used for selectivity estimation. Every bucket
/// is upper-exclusive except the last, which is upper-inclusive so the
/// maximum value stays addressable.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    buckets: Vec<HistogramBucket>,
}

///
/// HistogramBucket
///

#[derive(Clone, Debug, PartialEq)]
pub struct HistogramBucket {
    pub lower: Value,
    pub upper: Value,
    pub count: u64,
    pub distinct_count: u64,
}

impl HistogramBucket {
    #[must_use]
    pub const fn new(lower: Value, upper: Value, count: u64, distinct_count: u64) -> Self {
        Self {
            lower,
            upper,
            count,
            distinct_count,
        }
    }
}

impl Histogram {
    /// Buckets must be non-empty, well-formed (`lower <= upper`), and
    /// contiguous (`bucket[i].upper == bucket[i+1].lower`).
    pub fn new(buckets: Vec<HistogramBucket>) -> Result<Self, Error> {
        if buckets.is_empty() {
            return Err(Error::invalid_argument("histogram requires at least one bucket"));
        }
        for bucket in &buckets {
            if bucket.lower.canonical_cmp(&bucket.upper) == Ordering::Greater {
                return Err(Error::invalid_argument(
                    "histogram bucket bounds are inverted",
                ));
            }
        }
        for pair in buckets.windows(2) {
            if pair[0].upper != pair[1].lower {
                return Err(Error::invalid_argument("histogram buckets are not contiguous"));
            }
        }
        Ok(Self { buckets })
    }

    #[must_use]
    pub fn buckets(&self) -> &[HistogramBucket] {
        &self.buckets
    }

    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.buckets.iter().map(|bucket| bucket.count).sum()
    }

    /// Selectivity of `field == value`: the matching bucket's count spread
    /// uniformly over its distinct values; zero when the value lies outside
    /// every bucket.
    #[must_use]
    pub fn selectivity_eq(&self, value: &Value) -> f64 {
        let total = self.total_count();
        if total == 0 {
            return 0.0;
        }

        match self.bucket_for(value) {
            Some(bucket) if bucket.distinct_count > 0 => {
                bucket.count as f64 / (bucket.distinct_count as f64 * total as f64)
            }
            _ => 0.0,
        }
    }

    #[must_use]
    pub fn selectivity_ne(&self, value: &Value) -> f64 {
        1.0 - self.selectivity_eq(value)
    }

    /// Selectivity of a (possibly one-sided) inclusive range. Numeric
    /// buckets interpolate linearly; zero-width buckets contribute all or
    /// nothing by point containment; partially overlapped non-numeric
    /// buckets contribute half their rows.
    #[must_use]
    pub fn selectivity_range(&self, lower: Option<&Value>, upper: Option<&Value>) -> f64 {
        let total = self.total_count();
        if total == 0 {
            return 0.0;
        }

        let mut rows = 0.0;
        let last = self.buckets.len() - 1;
        for (position, bucket) in self.buckets.iter().enumerate() {
            rows += bucket.count as f64 * overlap_fraction(bucket, lower, upper, position == last);
        }

        (rows / total as f64).clamp(0.0, 1.0)
    }

    fn bucket_for(&self, value: &Value) -> Option<&HistogramBucket> {
        let last = self.buckets.len() - 1;
        self.buckets.iter().enumerate().find_map(|(position, bucket)| {
            let above_lower = bucket.lower.canonical_cmp(value) != Ordering::Greater;
            let below_upper = match value.canonical_cmp(&bucket.upper) {
                Ordering::Less => true,
                Ordering::Equal => position == last,
                Ordering::Greater => false,
            };
            (above_lower && below_upper).then_some(bucket)
        })
    }
}

/// Fraction of one bucket covered by the query range.
fn overlap_fraction(
    bucket: &HistogramBucket,
    lower: Option<&Value>,
    upper: Option<&Value>,
    upper_inclusive: bool,
) -> f64 {
    // Disjoint: the range ends before the bucket or starts after it.
    if let Some(upper) = upper {
        let before = match upper.canonical_cmp(&bucket.lower) {
            Ordering::Less => true,
            Ordering::Equal => false,
            Ordering::Greater => false,
        };
        if before {
            return 0.0;
        }
    }
    if let Some(lower) = lower {
        let after = match lower.canonical_cmp(&bucket.upper) {
            Ordering::Greater => true,
            Ordering::Equal => !upper_inclusive && !is_zero_width(bucket),
            Ordering::Less => false,
        };
        if after {
            return 0.0;
        }
    }

    let lower_inside = lower
        .is_some_and(|lower| lower.canonical_cmp(&bucket.lower) == Ordering::Greater);
    let upper_inside = upper
        .is_some_and(|upper| upper.canonical_cmp(&bucket.upper) == Ordering::Less);

    // Fully covered bucket.
    if !lower_inside && !upper_inside {
        return 1.0;
    }

    // Point bucket: containment was already established above.
    if is_zero_width(bucket) {
        return 1.0;
    }

    let (Some(bucket_lower), Some(bucket_upper)) =
        (bucket.lower.as_f64(), bucket.upper.as_f64())
    else {
        // Non-numeric bucket partially overlapped.
        return 0.5;
    };

    let width = bucket_upper - bucket_lower;
    if width <= 0.0 {
        return 1.0;
    }

    let from = lower
        .and_then(Value::as_f64)
        .map_or(bucket_lower, |v| v.max(bucket_lower));
    let to = upper
        .and_then(Value::as_f64)
        .map_or(bucket_upper, |v| v.min(bucket_upper));
    ((to - from) / width).clamp(0.0, 1.0)
}

fn is_zero_width(bucket: &HistogramBucket) -> bool {
    bucket.lower == bucket.upper
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn ages() -> Histogram {
        Histogram::new(vec![
            HistogramBucket::new(Value::Int(0), Value::Int(20), 100, 20),
            HistogramBucket::new(Value::Int(20), Value::Int(40), 200, 20),
            HistogramBucket::new(Value::Int(40), Value::Int(60), 100, 10),
        ])
        .expect("histogram")
    }

    #[test]
    fn eq_spreads_bucket_count_over_distinct_values() {
        let h = ages();
        // Bucket [20, 40): 200 rows over 20 distinct values of 400 total.
        let expected = 200.0 / (20.0 * 400.0);
        assert!((h.selectivity_eq(&Value::Int(25)) - expected).abs() < 1e-12);
    }

    #[test]
    fn eq_outside_all_buckets_is_zero() {
        let h = ages();
        assert_eq!(h.selectivity_eq(&Value::Int(99)), 0.0);
        assert_eq!(h.selectivity_eq(&Value::Int(-1)), 0.0);
    }

    #[test]
    fn last_bucket_upper_bound_is_inclusive() {
        let h = ages();
        assert!(h.selectivity_eq(&Value::Int(60)) > 0.0);
        // Interior bucket boundaries belong to the following bucket.
        let boundary = h.selectivity_eq(&Value::Int(40));
        let expected = 100.0 / (10.0 * 400.0);
        assert!((boundary - expected).abs() < 1e-12);
    }

    #[test]
    fn range_interpolates_numeric_buckets() {
        let h = ages();
        // [30, +inf): half of bucket two, all of bucket three.
        let s = h.selectivity_range(Some(&Value::Int(30)), None);
        let expected = (0.5 * 200.0 + 100.0) / 400.0;
        assert!((s - expected).abs() < 1e-12);
    }

    #[test]
    fn full_range_covers_everything() {
        let h = ages();
        assert!((h.selectivity_range(None, None) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ne_is_complement_of_eq() {
        let h = ages();
        let eq = h.selectivity_eq(&Value::Int(25));
        assert!((h.selectivity_ne(&Value::Int(25)) - (1.0 - eq)).abs() < 1e-12);
    }

    #[test]
    fn non_numeric_partial_overlap_is_half() {
        let h = Histogram::new(vec![HistogramBucket::new(
            Value::Text("a".into()),
            Value::Text("m".into()),
            100,
            10,
        )])
        .expect("histogram");
        let s = h.selectivity_range(Some(&Value::Text("c".into())), None);
        assert!((s - 0.5).abs() < 1e-12);
    }

    #[test]
    fn non_contiguous_buckets_are_rejected() {
        let err = Histogram::new(vec![
            HistogramBucket::new(Value::Int(0), Value::Int(10), 1, 1),
            HistogramBucket::new(Value::Int(11), Value::Int(20), 1, 1),
        ])
        .expect_err("must fail");
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }
}
