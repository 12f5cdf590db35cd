//! Line-chart view of the aggregated series.
//!
//! The chart library is an external collaborator. This module only shapes
//! the aggregator output into the dataset a line chart expects, and makes the
//! "no data" case explicit so the caller has to handle it.

use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate, Aggregation, BucketWidth, MetricKind};
use crate::record::Record;

/// A single line-chart dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub metric: MetricKind,
    pub bucket_width_ms: u64,
    pub labels: Vec<String>,
    pub data: Vec<f64>,
    pub dataset_label: String,
    pub border_color: String,
    pub fill: bool,
}

impl ChartSeries {
    /// Builds the dataset from an existing aggregation.
    pub fn from_aggregation(agg: Aggregation, metric: MetricKind, width: BucketWidth) -> Self {
        let border_color = match metric {
            MetricKind::Count => "blue",
            MetricKind::XPos => "green",
        };
        Self {
            metric,
            bucket_width_ms: width.as_millis(),
            labels: agg.labels,
            data: agg.values,
            dataset_label: metric.title().to_string(),
            border_color: border_color.to_string(),
            fill: false,
        }
    }
}

/// What the chart area should show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartView {
    /// No records in range
    NoData,
    Series(ChartSeries),
}

impl ChartView {
    /// Aggregates `records` and wraps the result.
    pub fn from_records(records: &[Record], metric: MetricKind, width: BucketWidth) -> Self {
        if records.is_empty() {
            return ChartView::NoData;
        }
        let agg = aggregate(records, metric, width);
        ChartView::Series(ChartSeries::from_aggregation(agg, metric, width))
    }

    /// Returns the series, if any.
    pub fn series(&self) -> Option<&ChartSeries> {
        match self {
            ChartView::NoData => None,
            ChartView::Series(s) => Some(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_records_is_no_data() {
        let view = ChartView::from_records(&[], MetricKind::Count, BucketWidth::default());
        assert_eq!(view, ChartView::NoData);
        assert!(view.series().is_none());
    }

    #[test]
    fn test_series_styling() {
        let records = vec![Record::new(1000, 1.0, 1.0), Record::new(6000, 3.0, 0.0)];

        let count = ChartView::from_records(&records, MetricKind::Count, BucketWidth::FIVE_SECONDS);
        let s = count.series().unwrap();
        assert_eq!(s.dataset_label, "Number of Humans");
        assert_eq!(s.border_color, "blue");
        assert_eq!(s.data, vec![1.0, 1.0]);
        assert_eq!(s.labels.len(), 2);
        assert!(!s.fill);

        let xpos = ChartView::from_records(&records, MetricKind::XPos, BucketWidth::FIVE_SECONDS);
        let s = xpos.series().unwrap();
        assert_eq!(s.dataset_label, "Average X Position");
        assert_eq!(s.border_color, "green");
        assert_eq!(s.data, vec![1.0, 3.0]);
    }

    #[test]
    fn test_view_serializes_tagged() {
        let json = serde_json::to_value(ChartView::NoData).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "no_data" }));
    }
}
