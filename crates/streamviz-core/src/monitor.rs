//! Frame-rate and resource monitor.
//!
//! [`PerformanceMonitor`] observes render-loop ticks only. It never reads the
//! stream. FPS is the rounded mean of the last [`FPS_WINDOW`] instantaneous
//! readings; memory is sampled on its own one-second timer.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::watch;

use crate::lock;
use crate::render::FrameObserver;
use crate::scheduler::PeriodicTimer;

/// Number of instantaneous FPS readings averaged.
pub const FPS_WINDOW: usize = 60;

/// Memory sampling period.
pub const MEMORY_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Latest performance readings. Every field is latest-value-wins.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSample {
    pub fps: u32,
    #[serde(rename = "memoryUsageMB")]
    pub memory_usage_mb: u64,
    pub render_time_ms: f64,
    pub data_processing_time_ms: f64,
    /// Epoch milliseconds of the last change.
    pub last_update: i64,
}

#[derive(Default)]
struct State {
    readings: VecDeque<f64>,
    last_tick: Option<Instant>,
    sample: PerformanceSample,
    marks: HashMap<String, Instant>,
}

pub struct PerformanceMonitor {
    state: Mutex<State>,
    tx: watch::Sender<PerformanceSample>,
    memory_timer: PeriodicTimer,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(PerformanceSample::default());
        Self {
            state: Mutex::new(State::default()),
            tx,
            memory_timer: PeriodicTimer::new("streamviz-memory", MEMORY_SAMPLE_INTERVAL),
        }
    }

    /// Start the background memory sampler. Returns `false` if it is already
    /// running. The sampler holds only a weak reference to the monitor.
    pub fn start_memory_sampling(self: &Arc<Self>) -> bool {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.sample_memory();
        self.memory_timer.start(move || {
            if let Some(monitor) = weak.upgrade() {
                monitor.sample_memory();
            }
        })
    }

    pub fn stop_memory_sampling(&self) {
        self.memory_timer.stop();
    }

    /// Record a refresh tick at `now`; the delta to the previous tick feeds
    /// the FPS average.
    pub fn on_tick(&self, now: Instant) {
        let delta = {
            let mut state = lock(&self.state);
            let previous = state.last_tick.replace(now);
            previous.map(|p| now.saturating_duration_since(p))
        };
        if let Some(delta) = delta {
            self.record_tick_delta(delta.as_secs_f64() * 1000.0);
        }
    }

    /// Feed one inter-frame delta in milliseconds. Non-positive deltas are
    /// ignored.
    pub fn record_tick_delta(&self, delta_ms: f64) {
        if !delta_ms.is_finite() || delta_ms <= 0.0 {
            return;
        }
        self.update(|state| {
            state.readings.push_back(1000.0 / delta_ms);
            while state.readings.len() > FPS_WINDOW {
                state.readings.pop_front();
            }
            let mean = state.readings.iter().sum::<f64>() / state.readings.len() as f64;
            state.sample.fps = mean.round() as u32;
        });
    }

    pub fn sample_memory(&self) {
        let mb = process_memory_mb();
        self.update(|state| state.sample.memory_usage_mb = mb);
    }

    pub fn record_render_time(&self, elapsed: Duration) {
        self.update(|state| state.sample.render_time_ms = elapsed.as_secs_f64() * 1000.0);
    }

    pub fn record_data_processing_time(&self, elapsed: Duration) {
        self.update(|state| {
            state.sample.data_processing_time_ms = elapsed.as_secs_f64() * 1000.0;
        });
    }

    /// Record a named timestamp for [`measure`](Self::measure).
    pub fn mark(&self, name: &str) {
        lock(&self.state).marks.insert(name.to_owned(), Instant::now());
    }

    /// Milliseconds from mark `start` to mark `end` (or now). Unknown marks
    /// measure as zero.
    pub fn measure(&self, start: &str, end: Option<&str>) -> f64 {
        let state = lock(&self.state);
        let Some(&from) = state.marks.get(start) else {
            return 0.0;
        };
        let to = match end {
            Some(name) => match state.marks.get(name) {
                Some(&t) => t,
                None => return 0.0,
            },
            None => Instant::now(),
        };
        to.saturating_duration_since(from).as_secs_f64() * 1000.0
    }

    pub fn clear_marks(&self) {
        lock(&self.state).marks.clear();
    }

    /// Forget FPS history and zero every reading.
    pub fn reset(&self) {
        self.update(|state| {
            state.readings.clear();
            state.last_tick = None;
            state.sample = PerformanceSample::default();
        });
    }

    pub fn sample(&self) -> PerformanceSample {
        lock(&self.state).sample
    }

    pub fn subscribe(&self) -> watch::Receiver<PerformanceSample> {
        self.tx.subscribe()
    }

    fn update(&self, f: impl FnOnce(&mut State)) {
        let sample = {
            let mut state = lock(&self.state);
            f(&mut state);
            state.sample.last_update = crate::unix_ms_now();
            state.sample
        };
        self.tx.send_replace(sample);
    }
}

impl FrameObserver for PerformanceMonitor {
    fn on_tick(&self, now: Instant) {
        PerformanceMonitor::on_tick(self, now);
    }

    fn on_frame_rendered(&self, elapsed: Duration) {
        self.record_render_time(elapsed);
    }
}

impl std::fmt::Debug for PerformanceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceMonitor")
            .field("sample", &self.sample())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Process memory
// ---------------------------------------------------------------------------

/// Resident set size of this process in MB, or 0 when unavailable.
#[cfg(target_os = "linux")]
pub fn process_memory_mb() -> u64 {
    let status = match std::fs::read_to_string("/proc/self/status") {
        Ok(s) => s,
        Err(e) => {
            log::debug!("memory sample unavailable: {e}");
            return 0;
        }
    };
    parse_vm_rss_kb(&status).map_or(0, |kb| (kb + 512) / 1024)
}

/// Peak resident set size of this process in MB, or 0 when unavailable.
#[cfg(all(unix, not(target_os = "linux")))]
pub fn process_memory_mb() -> u64 {
    // SAFETY: getrusage only writes into the zeroed struct we own.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    let ret = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    if ret != 0 {
        log::debug!("getrusage failed: {}", std::io::Error::last_os_error());
        return 0;
    }
    let maxrss = usage.ru_maxrss.max(0) as u64;
    // ru_maxrss is bytes on macOS, kilobytes elsewhere.
    let bytes = if cfg!(target_os = "macos") {
        maxrss
    } else {
        maxrss * 1024
    };
    (bytes + 524_288) / 1_048_576
}

#[cfg(not(unix))]
pub fn process_memory_mb() -> u64 {
    0
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_vm_rss_kb(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    line.split_whitespace().nth(1)?.parse().ok()
}
