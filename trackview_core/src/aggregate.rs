//! Bucketed Aggregator
//! ===================
//!
//! Groups records into fixed-width time buckets and reduces each bucket to a
//! scalar metric for the time-series chart.
//!
//! ```text
//! key(r) = floor(r.timestamp / width) * width
//! ```
//!
//! Only buckets that contain at least one record are emitted. Gaps in the
//! data produce no entry at all, not a zero-filled one.

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;
use tracing::debug;

use crate::error::TrackViewError;
use crate::record::Record;

// =============================================================================
// SELECTIONS
// =============================================================================

/// Scalar reduction applied to each bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Number of records in the bucket
    #[default]
    Count,
    /// Mean `pos_x` over the bucket
    XPos,
}

impl MetricKind {
    /// Returns all metric kinds in selector order.
    pub fn all() -> [MetricKind; 2] {
        [MetricKind::Count, MetricKind::XPos]
    }

    /// Returns the wire name of the metric.
    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::Count => "count",
            MetricKind::XPos => "x_pos",
        }
    }

    /// Human-readable series title.
    pub fn title(&self) -> &'static str {
        match self {
            MetricKind::Count => "Number of Humans",
            MetricKind::XPos => "Average X Position",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for MetricKind {
    type Err = TrackViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "count" => Ok(MetricKind::Count),
            "x_pos" | "xpos" => Ok(MetricKind::XPos),
            _ => Err(TrackViewError::UnknownMetric(s.to_string())),
        }
    }
}

/// Width of an aggregation bucket in milliseconds. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u64", from = "u64")]
pub struct BucketWidth(NonZeroU64);

impl BucketWidth {
    pub const ONE_SECOND: BucketWidth = BucketWidth(match NonZeroU64::new(1_000) {
        Some(w) => w,
        None => unreachable!(),
    });
    pub const FIVE_SECONDS: BucketWidth = BucketWidth(match NonZeroU64::new(5_000) {
        Some(w) => w,
        None => unreachable!(),
    });
    pub const TEN_SECONDS: BucketWidth = BucketWidth(match NonZeroU64::new(10_000) {
        Some(w) => w,
        None => unreachable!(),
    });

    /// The selector presets, shortest first.
    pub const PRESETS: [BucketWidth; 3] = [
        BucketWidth::ONE_SECOND,
        BucketWidth::FIVE_SECONDS,
        BucketWidth::TEN_SECONDS,
    ];

    /// Creates a width from milliseconds. Zero falls back to the default (5 s).
    pub fn from_millis(ms: u64) -> Self {
        NonZeroU64::new(ms).map(Self).unwrap_or_default()
    }

    /// Returns the width in milliseconds.
    pub fn as_millis(&self) -> u64 {
        self.0.get()
    }

    /// True for one of the selector presets (1 s, 5 s, 10 s).
    pub fn is_preset(&self) -> bool {
        Self::PRESETS.contains(self)
    }

    /// Start of the bucket containing `timestamp`.
    pub fn bucket_key(&self, timestamp: u64) -> u64 {
        let w = self.as_millis();
        (timestamp / w) * w
    }
}

impl Default for BucketWidth {
    fn default() -> Self {
        BucketWidth::FIVE_SECONDS
    }
}

impl From<u64> for BucketWidth {
    fn from(ms: u64) -> Self {
        Self::from_millis(ms)
    }
}

impl From<BucketWidth> for u64 {
    fn from(width: BucketWidth) -> Self {
        width.as_millis()
    }
}

impl fmt::Display for BucketWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.as_millis();
        if ms % 1000 == 0 {
            write!(f, "{}s", ms / 1000)
        } else {
            write!(f, "{}ms", ms)
        }
    }
}

impl FromStr for BucketWidth {
    type Err = TrackViewError;

    /// Accepts `"1s"`, `"5s"`, `"10s"`, `"<n>ms"` or a bare millisecond count.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim().to_lowercase();
        let invalid = || TrackViewError::InvalidBucketWidth(s.to_string());
        let ms = if let Some(ms) = t.strip_suffix("ms") {
            ms.trim().parse::<u64>().map_err(|_| invalid())?
        } else if let Some(secs) = t.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map_err(|_| invalid())?
                .checked_mul(1000)
                .ok_or_else(invalid)?
        } else {
            t.parse::<u64>().map_err(|_| invalid())?
        };
        Ok(Self::from_millis(ms))
    }
}

// =============================================================================
// AGGREGATION
// =============================================================================

/// Output of the aggregator: parallel label/value series ordered by bucket.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Aggregation {
    /// Time-of-day label per bucket (`HH:MM:SS`)
    pub labels: Vec<String>,
    /// Metric value per bucket
    pub values: Vec<f64>,
    /// Bucket start times (ms since epoch), strictly increasing
    pub keys: Vec<u64>,
    /// Records left out because their timestamp was invalid
    pub skipped: usize,
}

impl Aggregation {
    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no bucket was produced.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Aggregates records with labels rendered in the local time zone.
pub fn aggregate(records: &[Record], metric: MetricKind, width: BucketWidth) -> Aggregation {
    aggregate_in(records, metric, width, &Local)
}

/// Aggregates records with labels rendered in `tz`.
///
/// Records whose timestamp is invalid are not assigned to any bucket; they
/// are counted in [`Aggregation::skipped`].
pub fn aggregate_in<Tz>(
    records: &[Record],
    metric: MetricKind,
    width: BucketWidth,
    tz: &Tz,
) -> Aggregation
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut grouped: BTreeMap<u64, Vec<&Record>> = BTreeMap::new();
    let mut skipped = 0;

    for record in records {
        match record.timestamp {
            Some(ts) => grouped.entry(width.bucket_key(ts)).or_default().push(record),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(skipped, "records without a valid timestamp left out of aggregation");
    }

    let mut out = Aggregation {
        skipped,
        ..Default::default()
    };

    // BTreeMap iteration is already in ascending key order
    for (key, bucket) in &grouped {
        out.keys.push(*key);
        out.labels.push(bucket_label(*key, tz));
        out.values.push(reduce(bucket, metric));
    }

    out
}

/// Reduces one bucket to its metric value.
fn reduce(bucket: &[&Record], metric: MetricKind) -> f64 {
    match metric {
        MetricKind::Count => bucket.len() as f64,
        MetricKind::XPos => {
            if bucket.is_empty() {
                return 0.0;
            }
            let total: f64 = bucket.iter().map(|r| r.x()).sum();
            total / bucket.len() as f64
        }
    }
}

/// Formats a bucket start as a time of day. No date component.
pub fn bucket_label<Tz>(key: u64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    i64::try_from(key)
        .ok()
        .and_then(|ms| tz.timestamp_millis_opt(ms).earliest())
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

// =============================================================================
// TESTS
// =============================================================================
