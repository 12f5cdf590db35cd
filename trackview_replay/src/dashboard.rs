//! Dashboard pipeline: replay, query, aggregate, render.
//!
//! Mirrors one dashboard refresh end to end. A dataset is replayed into a
//! fresh store, the selected time range is read back, and the two views are
//! built from the same record list.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use trackview_core::{
    aggregate, heatmap, BucketWidth, ChartSeries, ChartView, DrawingSurface, HeatmapLayout,
    MetricKind, Raster, Record,
};
use trackview_env::TrackingContext;

use crate::dataset::Dataset;
use crate::error::ReplayError;
use crate::feed::{ReplayConfig, ReplayFeed, ReplayStats};
use crate::store::RecordStore;

/// Selections of one dashboard refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Range start (ms since epoch, inclusive)
    pub from: u64,
    /// Range end (ms since epoch, inclusive)
    pub to: u64,
    pub metric: MetricKind,
    pub width: BucketWidth,
    pub replay: ReplayConfig,
    pub layout: HeatmapLayout,
}

impl Default for DashboardConfig {
    /// The reference recording window, 2022-09-11 11:40:00 to 11:43:20 UTC.
    fn default() -> Self {
        Self {
            from: 1_662_896_400_000,
            to: 1_662_896_600_000,
            metric: MetricKind::Count,
            width: BucketWidth::default(),
            replay: ReplayConfig::default(),
            layout: HeatmapLayout::default(),
        }
    }
}

/// Everything one refresh produced.
#[derive(Debug, Clone)]
pub struct DashboardReport {
    pub stats: ReplayStats,
    /// Records in range, ordered by timestamp
    pub records: Vec<Record>,
    /// Records in range that the aggregator skipped
    pub skipped: usize,
    pub chart: ChartView,
    pub heatmap: Raster,
    /// Store the dataset was replayed into
    pub store: Arc<RecordStore>,
}

/// Replays `dataset` and builds both views for the configured range.
pub async fn run_dashboard<Ctx: TrackingContext>(
    context: Arc<Ctx>,
    dataset: Arc<Dataset>,
    config: &DashboardConfig,
) -> Result<DashboardReport, ReplayError> {
    let store = RecordStore::shared();
    let stats = ReplayFeed::new(context, dataset, Arc::clone(&store), config.replay.clone())
        .spawn()
        .join()
        .await?;

    let records = store.records_in_range(config.from, config.to).await;
    let (chart, skipped) = build_chart(&records, config.metric, config.width);

    let mut raster = Raster::new(config.layout.width, config.layout.height);
    render_heatmap(&mut raster, &records, config);

    info!(
        records = records.len(),
        skipped,
        metric = %config.metric,
        width = %config.width,
        "dashboard refreshed"
    );

    Ok(DashboardReport {
        stats,
        records,
        skipped,
        chart,
        heatmap: raster,
        store,
    })
}

/// Chart view plus the number of records the aggregator skipped, from a
/// single aggregation pass.
pub fn build_chart(records: &[Record], metric: MetricKind, width: BucketWidth) -> (ChartView, usize) {
    if records.is_empty() {
        return (ChartView::NoData, 0);
    }
    let agg = aggregate(records, metric, width);
    let skipped = agg.skipped;
    let series = ChartSeries::from_aggregation(agg, metric, width);
    (ChartView::Series(series), skipped)
}

/// Draws the heatmap for `records` on any surface.
pub fn render_heatmap<S: DrawingSurface>(surface: &mut S, records: &[Record], config: &DashboardConfig) {
    heatmap::render_with(surface, &config.layout, records, config.metric);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SimContext;
    use crate::synth::{synthesize, SynthConfig};
    use trackview_core::DrawLog;

    fn dataset() -> Arc<Dataset> {
        Arc::new(synthesize(&SynthConfig {
            humans: 2,
            frames: 100,
            frame_interval_ms: 100,
            ..Default::default()
        }))
    }

    #[tokio::test]
    async fn test_full_refresh() {
        let config = DashboardConfig::default();
        let report = run_dashboard(SimContext::shared(), dataset(), &config)
            .await
            .unwrap();

        assert_eq!(report.stats.frames_replayed, 100);
        assert_eq!(report.records.len(), 200);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.store.len().await, 200);

        // 100 frames at 100 ms span 9.9 s: two 5 s buckets of 50 frames
        let series = report.chart.series().unwrap();
        assert_eq!(series.data, vec![100.0, 100.0]);
        assert_eq!(report.heatmap.size(), (600, 250));
    }

    #[test]
    fn test_build_chart_reports_skipped_records() {
        let undated = Record {
            timestamp: None,
            ..Record::new(0, 2.0, 1.0)
        };
        let records = vec![Record::new(1000, 1.0, 1.0), undated, Record::new(1200, 3.0, 0.0)];

        let (chart, skipped) = build_chart(&records, MetricKind::XPos, BucketWidth::ONE_SECOND);
        assert_eq!(skipped, 1);
        let series = chart.series().unwrap();
        assert_eq!(series.data, vec![2.0]);
        assert_eq!(
            chart,
            ChartView::from_records(&records, MetricKind::XPos, BucketWidth::ONE_SECOND)
        );

        assert_eq!(build_chart(&[], MetricKind::Count, BucketWidth::default()), (ChartView::NoData, 0));
    }

    #[tokio::test]
    async fn test_empty_range_has_no_chart_but_draws_axes() {
        let config = DashboardConfig {
            from: 0,
            to: 1000,
            ..Default::default()
        };
        let report = run_dashboard(SimContext::shared(), dataset(), &config)
            .await
            .unwrap();

        assert!(report.records.is_empty());
        assert_eq!(report.chart, ChartView::NoData);

        let mut log = DrawLog::new(600, 250);
        render_heatmap(&mut log, &report.records, &config);
        assert_eq!(log.disk_count(), 0);
        assert!(log.line_count() > 0);
    }

    #[tokio::test]
    async fn test_xpos_metric_over_narrow_range() {
        let data = dataset();
        let start = data.frames()[0].timestamp.unwrap();
        let config = DashboardConfig {
            from: start,
            to: start + 900,
            metric: MetricKind::XPos,
            width: BucketWidth::ONE_SECOND,
            ..Default::default()
        };
        let report = run_dashboard(SimContext::shared(), data, &config).await.unwrap();

        assert_eq!(report.records.len(), 20);
        let series = report.chart.series().unwrap();
        assert_eq!(series.data.len(), 1);
        let mean = report.records.iter().map(|r| r.x()).sum::<f64>() / 20.0;
        assert!((series.data[0] - mean).abs() < 1e-9);
    }
}
