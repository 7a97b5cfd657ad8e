//! Live stream service: sliding window plus its producer timer.
//!
//! [`StreamService`] is the single writer of the window. Every mutation
//! publishes an immutable [`Arc<[Sample]>`](Sample) snapshot and a
//! [`StreamStatus`] through `tokio::sync::watch` channels, so readers never
//! contend with the producer for the window lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::watch;

use crate::config::StreamConfig;
use crate::dataset::MAX_DATASET_COUNT;
use crate::error::ConfigError;
use crate::generator::{SAMPLE_SPACING_MS, StreamGenerator};
use crate::lock;
use crate::sample::Sample;
use crate::scheduler::PeriodicTimer;
use crate::window::SlidingWindow;

/// Point-in-time summary of the stream, published on every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatus {
    pub is_streaming: bool,
    pub length: usize,
    pub capacity: usize,
    pub last_value: Option<f64>,
    /// Incremented on every window mutation.
    pub version: u64,
}

struct Core {
    window: SlidingWindow,
    generator: StreamGenerator,
    version: u64,
}

impl Core {
    /// Timestamp for the next appended sample: now, but never before one
    /// spacing after the newest sample.
    fn next_timestamp(&self) -> i64 {
        let now = crate::unix_ms_now();
        match self.window.last() {
            Some(last) => now.max(last.timestamp.saturating_add(SAMPLE_SPACING_MS)),
            None => now,
        }
    }

    fn status(&self, is_streaming: bool) -> StreamStatus {
        StreamStatus {
            is_streaming,
            length: self.window.len(),
            capacity: self.window.capacity(),
            last_value: self.window.last().map(|s| s.value),
            version: self.version,
        }
    }

    fn snapshot(&self) -> Arc<[Sample]> {
        self.window.iter().copied().collect()
    }
}

struct Shared {
    core: Mutex<Core>,
    streaming: AtomicBool,
    status_tx: watch::Sender<StreamStatus>,
    snapshot_tx: watch::Sender<Arc<[Sample]>>,
}

impl Shared {
    fn tick(&self) {
        let mut core = lock(&self.core);
        let timestamp = core.next_timestamp();
        let previous = core.window.last().map(|s| s.value);
        let sample = core.generator.generate_one(previous, Some(timestamp));
        core.window.push(sample);
        core.version += 1;
        self.publish_window(&core);
    }

    /// Publish a fresh snapshot and status. Runs with `core` held so that
    /// concurrent writers publish in mutation order.
    fn publish_window(&self, core: &Core) {
        self.snapshot_tx.send_replace(core.snapshot());
        self.status_tx
            .send_replace(core.status(self.streaming.load(Ordering::Acquire)));
    }

    /// Republish the status after a streaming-state change.
    fn publish_status(&self) {
        let core = lock(&self.core);
        self.status_tx
            .send_replace(core.status(self.streaming.load(Ordering::Acquire)));
    }
}

/// Cap a reset or bulk request at [`MAX_DATASET_COUNT`] walk steps.
fn bounded_count(requested: usize, operation: &str) -> usize {
    if requested > MAX_DATASET_COUNT {
        log::warn!("{operation} of {requested} samples capped at {MAX_DATASET_COUNT}");
        MAX_DATASET_COUNT
    } else {
        requested
    }
}

/// Bounded live stream of samples.
///
/// Construct once and share through an `Arc`. Dropping the service cancels
/// its producer timer.
pub struct StreamService {
    config: StreamConfig,
    shared: Arc<Shared>,
    timer: PeriodicTimer,
}

impl StreamService {
    /// Build a service with an OS-seeded generator and an initial window of
    /// `config.initial_count` samples.
    pub fn new(config: StreamConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let generator = StreamGenerator::new(&config.generator)?;
        Self::with_generator(config, generator)
    }

    /// Build a service around an existing generator (e.g. a seeded one).
    pub fn with_generator(
        config: StreamConfig,
        mut generator: StreamGenerator,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut window = SlidingWindow::new(config.max_data_points);
        window.replace(generator.generate_initial_tail(
            config.initial_count,
            config.max_data_points,
            None,
        ));

        let core = Core {
            window,
            generator,
            version: 0,
        };
        let (status_tx, _) = watch::channel(core.status(false));
        let (snapshot_tx, _) = watch::channel(core.snapshot());
        let shared = Arc::new(Shared {
            core: Mutex::new(core),
            streaming: AtomicBool::new(false),
            status_tx,
            snapshot_tx,
        });

        let service = Self {
            timer: PeriodicTimer::new("streamviz-producer", config.update_interval()),
            config,
            shared,
        };
        if service.config.auto_start {
            service.start();
        }
        Ok(service)
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Begin appending one sample per update interval. Returns `false` when
    /// already streaming.
    pub fn start(&self) -> bool {
        if self.timer.is_running() {
            return false;
        }
        self.shared.streaming.store(true, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        if !self.timer.start(move || shared.tick()) {
            self.shared
                .streaming
                .store(self.timer.is_running(), Ordering::Release);
            return false;
        }

        self.shared.publish_status();
        log::info!(
            "streaming started ({} ms interval)",
            self.config.update_interval_ms
        );
        true
    }

    /// Stop the producer. After this returns no further tick runs.
    pub fn stop(&self) {
        if !self.timer.is_running() {
            return;
        }
        self.timer.stop();
        self.shared.streaming.store(false, Ordering::Release);
        self.shared.publish_status();
        log::info!("streaming stopped");
    }

    /// Flip between streaming and stopped; returns the new state.
    pub fn toggle(&self) -> bool {
        if self.is_streaming() {
            self.stop();
        } else {
            self.start();
        }
        self.is_streaming()
    }

    pub fn is_streaming(&self) -> bool {
        self.timer.is_running()
    }

    /// Stop streaming and replace the window with a fresh initial dataset of
    /// `count` samples (default: `initial_count`).
    ///
    /// At most [`MAX_DATASET_COUNT`] steps are walked and only the newest
    /// `capacity` samples are kept.
    pub fn reset(&self, count: Option<usize>) {
        self.stop();
        let count = bounded_count(count.unwrap_or(self.config.initial_count), "reset");
        {
            let mut core = lock(&self.shared.core);
            let capacity = core.window.capacity();
            let data = core.generator.generate_initial_tail(count, capacity, None);
            core.window.replace(data);
            core.version += 1;
            self.shared.publish_window(&core);
        }
        log::info!("stream reset with {count} samples");
    }

    /// Append `count` chained samples continuing from the newest value, then
    /// evict down to capacity.
    ///
    /// At most [`MAX_DATASET_COUNT`] steps are walked; samples that would be
    /// evicted immediately are never stored.
    pub fn add_bulk(&self, count: usize) {
        let count = bounded_count(count, "bulk add");
        let evicted = {
            let mut core = lock(&self.shared.core);
            let start = core.next_timestamp();
            let previous = core.window.last().map(|s| s.value);
            let capacity = core.window.capacity();
            let batch = core
                .generator
                .generate_batch_tail(count, capacity, previous, start);
            let dropped = count - batch.len();
            let evicted = core.window.extend(batch) + dropped;
            core.version += 1;
            self.shared.publish_window(&core);
            evicted
        };
        log::info!("added {count} samples ({evicted} evicted)");
    }

    /// Immutable view of the current window, oldest first.
    ///
    /// Reads the last published snapshot without touching the window lock.
    /// Repeated calls without an intervening mutation return the same
    /// allocation.
    pub fn snapshot(&self) -> Arc<[Sample]> {
        Arc::clone(&*self.shared.snapshot_tx.borrow())
    }

    pub fn len(&self) -> usize {
        self.shared.snapshot_tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<Sample> {
        self.shared.snapshot_tx.borrow().last().copied()
    }

    pub fn status(&self) -> StreamStatus {
        let mut status = *self.shared.status_tx.borrow();
        status.is_streaming = self.is_streaming();
        status
    }

    /// Receiver that observes every published [`StreamStatus`].
    pub fn subscribe(&self) -> watch::Receiver<StreamStatus> {
        self.shared.status_tx.subscribe()
    }
}

impl Drop for StreamService {
    fn drop(&mut self) {
        self.timer.stop();
    }
}

impl std::fmt::Debug for StreamService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamService")
            .field("status", &self.status())
            .finish()
    }
}
