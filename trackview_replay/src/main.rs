//! TrackView CLI
//!
//! Convert tracker exports, generate synthetic recordings, and run a
//! dashboard refresh against a recorded dataset.

use anyhow::{Context, Result};
use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use trackview_core::{BucketWidth, DrawLog, DrawOp, MetricKind};
use trackview_env::TokioContext;
use trackview_replay::dashboard::render_heatmap;
use trackview_replay::{
    convert_export, run_dashboard, synthesize, write_chart, write_png, DashboardConfig, Dataset,
    ReplayConfig, SynthConfig,
};

#[derive(Parser, Debug)]
#[command(name = "trackview")]
#[command(about = "Replay and visualise multi-object tracking recordings", long_about = None)]
struct Args {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a raw tracker export into a cleaned dataset
    Convert {
        /// Raw export (JSON array of frames)
        input: PathBuf,
        /// Cleaned dataset to write
        output: PathBuf,
    },

    /// Generate a synthetic dataset
    Synth {
        /// Dataset to write
        output: PathBuf,

        /// RNG seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Number of tracked humans
        #[arg(long, default_value = "5")]
        humans: usize,

        /// Number of frames
        #[arg(long, default_value = "600")]
        frames: usize,

        /// Timestamp of the first frame (ms since epoch)
        #[arg(long, default_value = "1662896400000")]
        start_ms: u64,

        /// Spacing between frames (ms)
        #[arg(long, default_value = "100")]
        frame_interval_ms: u64,

        /// Position noise standard deviation (metres)
        #[arg(long, default_value = "0.05")]
        noise_std: f64,
    },

    /// Replay a dataset and build the chart and heatmap for a time range
    Dashboard {
        /// Cleaned dataset to replay
        #[arg(short, long)]
        dataset: PathBuf,

        /// Range start (ms since epoch, inclusive)
        #[arg(long, default_value = "1662896400000")]
        from: u64,

        /// Range end (ms since epoch, inclusive)
        #[arg(long, default_value = "1662896600000")]
        to: u64,

        /// Metric shown in both views
        #[arg(short, long, default_value = "count", value_parser = metric_parser())]
        metric: MetricKind,

        /// Bucket width: 1s, 5s, 10s, <n>ms or a bare millisecond count
        #[arg(short, long, default_value = "5s")]
        bucket: BucketWidth,

        /// Delay between replayed frames (ms)
        #[arg(long, default_value = "10")]
        interval_ms: u64,

        /// Stop the replay after this many frames
        #[arg(long)]
        max_frames: Option<usize>,

        /// Write the chart dataset as JSON
        #[arg(long)]
        chart_out: Option<PathBuf>,

        /// Write the heatmap as PNG
        #[arg(long)]
        heatmap_out: Option<PathBuf>,

        /// Write every replayed store row as JSON
        #[arg(long)]
        rows_out: Option<PathBuf>,

        /// Log every heatmap draw call
        #[arg(long)]
        trace_draw: bool,

        /// Output summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn metric_parser() -> impl TypedValueParser<Value = MetricKind> {
    PossibleValuesParser::new(MetricKind::all().map(|m| m.name()))
        .try_map(|name| name.parse::<MetricKind>())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    match args.command {
        Command::Convert { input, output } => {
            let reader = BufReader::new(
                File::open(&input).with_context(|| format!("opening {}", input.display()))?,
            );
            let dataset = convert_export(reader)
                .with_context(|| format!("converting {}", input.display()))?;
            dataset
                .write_pretty(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            info!(
                frames = dataset.len(),
                instances = dataset.instance_count(),
                output = %output.display(),
                "export converted"
            );
        }

        Command::Synth {
            output,
            seed,
            humans,
            frames,
            start_ms,
            frame_interval_ms,
            noise_std,
        } => {
            let config = SynthConfig {
                seed,
                humans,
                frames,
                start_ms,
                frame_interval_ms,
                noise_std,
            };
            let dataset = synthesize(&config);
            dataset
                .write_pretty(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            info!(frames = dataset.len(), seed, output = %output.display(), "synthetic dataset written");
        }

        Command::Dashboard {
            dataset,
            from,
            to,
            metric,
            bucket,
            interval_ms,
            max_frames,
            chart_out,
            heatmap_out,
            rows_out,
            trace_draw,
            json,
        } => {
            if !bucket.is_preset() {
                warn!(width = %bucket, "bucket width is not one of the 1s/5s/10s presets");
            }
            let data = Dataset::load(&dataset)
                .with_context(|| format!("loading {}", dataset.display()))?;
            let config = DashboardConfig {
                from,
                to,
                metric,
                width: bucket,
                replay: ReplayConfig {
                    interval: Duration::from_millis(interval_ms),
                    max_frames,
                },
                ..Default::default()
            };

            if !json {
                info!("TrackView dashboard v{}", env!("CARGO_PKG_VERSION"));
                info!(frames = data.len(), "replaying {}", dataset.display());
            }

            let report = run_dashboard(TokioContext::shared(), Arc::new(data), &config).await?;

            if trace_draw {
                let mut log = DrawLog::new(config.layout.width, config.layout.height);
                render_heatmap(&mut log, &report.records, &config);
                for op in log.ops() {
                    match op {
                        DrawOp::RadialDisk { .. } => {}
                        other => debug!(?other, "draw"),
                    }
                }
                info!(
                    disks = log.disk_count(),
                    lines = log.line_count(),
                    labels = log.texts().len(),
                    "heatmap draw calls"
                );
            }

            if let Some(path) = &chart_out {
                write_chart(&report.chart, path)
                    .with_context(|| format!("writing {}", path.display()))?;
            }
            if let Some(path) = &rows_out {
                let rows = report.store.dump_json().await?;
                std::fs::write(path, rows).with_context(|| format!("writing {}", path.display()))?;
            }
            if let Some(path) = &heatmap_out {
                write_png(&report.heatmap, path)
                    .with_context(|| format!("writing {}", path.display()))?;
            }

            if json {
                let summary = serde_json::json!({
                    "from": config.from,
                    "to": config.to,
                    "metric": config.metric,
                    "bucket_ms": config.width,
                    "replay": report.stats,
                    "records": report.records.len(),
                    "skipped": report.skipped,
                    "chart": report.chart,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                info!(
                    frames = report.stats.frames_replayed,
                    rows = report.stats.rows_inserted,
                    "replay complete"
                );
                match report.chart.series() {
                    Some(series) => {
                        info!("{} per {}:", series.dataset_label, config.width);
                        for (label, value) in series.labels.iter().zip(&series.data) {
                            info!("  {label}  {value:.2}");
                        }
                    }
                    None => info!("No data available for the selected time range"),
                }
            }
        }
    }

    Ok(())
}
