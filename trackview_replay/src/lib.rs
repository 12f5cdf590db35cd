//! TrackView Replay - Datasets, Record Store and Replay Feed
//!
//! Everything around the core views that deals with data over time:
//!
//! - **Datasets**: raw tracker exports are converted to a cleaned frame list
//!   (`dataset`), or generated from a seeded random walk (`synth`)
//! - **Store**: an in-memory table answering inclusive time-range queries
//!   (`store`)
//! - **Feed**: a cancellable task that replays a dataset into the store at a
//!   fixed rate, driven by a [`trackview_env::TrackingContext`] (`feed`)
//! - **Dashboard**: one refresh end to end, replay then query then
//!   aggregate and render (`dashboard`, `export`)
//!
//! # Determinism
//!
//! With [`SimContext`] the feed's sleeps only advance a virtual clock, so a
//! replay finishes instantly and always inserts frames in the same order.

pub mod context;
pub mod dashboard;
pub mod dataset;
pub mod error;
pub mod export;
pub mod feed;
pub mod store;
pub mod synth;

pub use context::SimContext;
pub use dashboard::{run_dashboard, DashboardConfig, DashboardReport};
pub use dataset::{convert_export, Dataset, Frame, Instance, InstanceFields};
pub use error::ReplayError;
pub use export::{encode_png, write_chart, write_png};
pub use feed::{ReplayConfig, ReplayFeed, ReplayHandle, ReplayStats};
pub use store::RecordStore;
pub use synth::{synthesize, SynthConfig};
