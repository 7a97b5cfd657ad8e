//! # streamviz-core
//!
//! **Live time-series at interactive frame rates, in bounded memory.**
//!
//! `streamviz-core` is the streaming pipeline behind the `streamviz` dashboard
//! and HTTP server. It produces random-walk samples, keeps the most recent
//! ones in a fixed-capacity sliding window, reduces that window into
//! chart-ready series, works out which rows of a long table are visible, and
//! paces drawing on a refresh cadence that is independent of data arrival.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use streamviz_core::{StreamConfig, StreamService, downsample};
//!
//! let service = Arc::new(StreamService::new(StreamConfig::default()).unwrap());
//! service.start();
//!
//! // Immutable point-in-time view of the window.
//! let snapshot = service.snapshot();
//! let series = downsample(&snapshot, 800);
//! assert!(series.len() <= 800);
//!
//! service.stop();
//! ```
//!
//! ## Architecture
//!
//! Generator → Window (append / evict) → Filter → {Aggregation, Downsampling →
//! charts, raw rows → Virtualization → tables}
//!
//! Three independently paced activities share the window:
//! - the producer timer owned by [`StreamService`] (default 100 ms),
//! - the [`RenderLoop`], paced by a [`RefreshSignal`] (nominal 60 Hz),
//! - the memory sampler owned by [`PerformanceMonitor`] (1 s).
//!
//! Only the producer mutates the window. Everything else reads immutable
//! `Arc<[Sample]>` snapshots.

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod generator;
pub mod monitor;
pub mod render;
pub mod sample;
pub mod scale;
pub mod scheduler;
pub mod stream;
pub mod surface;
pub mod virtualize;
pub mod window;

pub use aggregate::{AggregatedSample, AggregationPeriod, Reducer, aggregate, downsample};
pub use config::{GeneratorConfig, StreamConfig};
pub use dataset::{
    DEFAULT_EXTEND_COUNT, DEFAULT_FETCH_COUNT, Dataset, ExtendRequest, FetchRequest,
    MAX_DATASET_COUNT, extend_dataset, fetch_dataset,
};
pub use error::{ConfigError, GenerationError};
pub use filter::{FilterConfig, TimeRange, filter, filter_snapshot};
pub use generator::{SAMPLE_SPACING_MS, StreamGenerator};
pub use monitor::{
    FPS_WINDOW, MEMORY_SAMPLE_INTERVAL, PerformanceMonitor, PerformanceSample, process_memory_mb,
};
pub use render::{
    CancelToken, FixedRateSignal, FrameObserver, FrameOutcome, RefreshSignal, RenderHandle,
    RenderLoop,
};
pub use sample::{Category, Metadata, Sample, Signal};
pub use scale::{ChartArea, Margin, cull_points, project_series, scale_value};
pub use scheduler::PeriodicTimer;
pub use stream::{StreamService, StreamStatus};
pub use surface::{Color, DisplayList, DrawOp, Point, Surface, draw_axes, draw_grid};
pub use virtualize::{VirtualRange, VirtualRow, Virtualizer, visible_range};
pub use window::SlidingWindow;

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Milliseconds since the Unix epoch, saturating to zero before it.
pub fn unix_ms_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Lock a mutex, recovering the guard if a previous holder panicked.
///
/// The streaming loops must keep running after a panicking callback, so
/// poisoning is treated as recoverable everywhere in this crate.
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
