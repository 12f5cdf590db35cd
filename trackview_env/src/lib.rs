//! TrackView Environment Abstraction Layer
//!
//! The replay feed never touches `tokio::time` directly. It goes through a
//! [`TrackingContext`], which provides:
//! - Time (`now()`, `system_time()`)
//! - Suspension (`sleep()`)
//! - Task spawning (`spawn()`)
//!
//! Production code uses [`TokioContext`]. Tests plug in a virtual clock so a
//! replay of thousands of frames runs instantly and deterministically.
//!
//! # Example
//!
//! ```ignore
//! use trackview_env::{TrackingContext, TokioContext};
//!
//! async fn tick_loop<Ctx: TrackingContext>(ctx: &Ctx) {
//!     loop {
//!         ctx.sleep(Duration::from_millis(10)).await;
//!         step();
//!     }
//! }
//! ```

mod context;
mod error;
mod tokio_impl;

pub use context::TrackingContext;
pub use error::EnvError;
pub use tokio_impl::TokioContext;
