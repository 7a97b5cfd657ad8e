//! Frame-paced render loop.
//!
//! A [`RenderLoop`] owns a [`Surface`], a snapshot provider and a draw
//! callback. Each tick it notifies [`FrameObserver`]s, takes a snapshot and
//! draws it. Pacing comes from outside: a host can call [`RenderLoop::tick`]
//! from its own event loop, or [`RenderLoop::spawn`] the loop on a thread
//! driven by a [`RefreshSignal`].
//!
//! Data arrival never triggers a draw. The loop just draws whatever the
//! snapshot provider returns at the time of the tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::lock;
use crate::surface::Surface;

// ---------------------------------------------------------------------------
// Refresh signal
// ---------------------------------------------------------------------------

/// Source of frame ticks.
pub trait RefreshSignal: Send {
    /// Block until the next frame is due and return its timestamp.
    fn wait_next(&mut self) -> Instant;
}

/// Fixed-rate signal that sleeps to each deadline.
///
/// After a missed frame it re-anchors on the current time instead of firing
/// catch-up frames back to back.
#[derive(Debug, Clone)]
pub struct FixedRateSignal {
    interval: Duration,
    next: Option<Instant>,
}

impl FixedRateSignal {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
        }
    }

    /// Nominal display refresh rate.
    pub fn sixty_hz() -> Self {
        Self::from_hz(60.0)
    }

    pub fn from_hz(hz: f64) -> Self {
        let hz = if hz.is_finite() && hz > 0.0 { hz } else { 60.0 };
        Self::new(Duration::from_secs_f64(1.0 / hz))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl RefreshSignal for FixedRateSignal {
    fn wait_next(&mut self) -> Instant {
        let deadline = self.next.unwrap_or_else(Instant::now);
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }
        let fired = Instant::now();
        let mut next = deadline + self.interval;
        if next <= fired {
            next = fired + self.interval;
        }
        self.next = Some(next);
        fired
    }
}

// ---------------------------------------------------------------------------
// Observers and cancellation
// ---------------------------------------------------------------------------

/// Receives frame timing from a render loop.
pub trait FrameObserver: Send + Sync {
    /// Called at the start of every tick, drawn or not.
    fn on_tick(&self, now: Instant);

    /// Called after a frame was drawn, with the time spent in the draw
    /// callback.
    fn on_frame_rendered(&self, _elapsed: Duration) {}
}

/// Shared cancellation flag. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Result of one [`RenderLoop::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Drawn,
    /// No surface, or the surface is unavailable. The next tick retries.
    Skipped,
    Cancelled,
}

type PendingResize = Arc<Mutex<Option<(u32, u32, f64)>>>;
type SnapshotFn<D> = Box<dyn FnMut() -> D + Send>;
type DrawFn<S, D> = Box<dyn FnMut(&mut S, u32, u32, &D) + Send>;

// ---------------------------------------------------------------------------
// Render loop
// ---------------------------------------------------------------------------

/// Cooperative render loop over surface `S` drawing snapshots of type `D`.
pub struct RenderLoop<S, D> {
    surface: Option<S>,
    snapshot: SnapshotFn<D>,
    draw: DrawFn<S, D>,
    observers: Vec<Arc<dyn FrameObserver>>,
    cancel: CancelToken,
    pending_resize: PendingResize,
    frames_drawn: u64,
    frames_skipped: u64,
}

impl<S: Surface, D> RenderLoop<S, D> {
    pub fn new<P, F>(surface: Option<S>, snapshot: P, draw: F) -> Self
    where
        P: FnMut() -> D + Send + 'static,
        F: FnMut(&mut S, u32, u32, &D) + Send + 'static,
    {
        Self {
            surface,
            snapshot: Box::new(snapshot),
            draw: Box::new(draw),
            observers: Vec::new(),
            cancel: CancelToken::new(),
            pending_resize: Arc::new(Mutex::new(None)),
            frames_drawn: 0,
            frames_skipped: 0,
        }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn FrameObserver>) {
        self.observers.push(observer);
    }

    /// Attach or detach the drawing target.
    pub fn set_surface(&mut self, surface: Option<S>) {
        self.surface = surface;
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Stop the loop. No draw happens after this returns.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Request a new surface size, applied before the next draw.
    pub fn resize(&self, width: u32, height: u32, scale: f64) {
        *lock(&self.pending_resize) = Some((width, height, scale));
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    /// Run one frame at `now`.
    pub fn tick(&mut self, now: Instant) -> FrameOutcome {
        if self.cancel.is_cancelled() {
            return FrameOutcome::Cancelled;
        }

        for observer in &self.observers {
            observer.on_tick(now);
        }

        let surface = match self.surface.as_mut() {
            Some(s) if s.is_available() => s,
            _ => {
                self.frames_skipped += 1;
                log::debug!("render: surface unavailable, skipping frame");
                return FrameOutcome::Skipped;
            }
        };

        if let Some((width, height, scale)) = lock(&self.pending_resize).take() {
            surface.resize(width, height, scale);
        }

        let data = (self.snapshot)();
        let (width, height) = surface.size();
        let started = Instant::now();
        (self.draw)(surface, width, height, &data);
        let elapsed = started.elapsed();

        for observer in &self.observers {
            observer.on_frame_rendered(elapsed);
        }
        self.frames_drawn += 1;
        FrameOutcome::Drawn
    }

    /// Tick on every signal until cancelled.
    pub fn run<R: RefreshSignal + ?Sized>(&mut self, signal: &mut R) {
        loop {
            let now = signal.wait_next();
            if self.tick(now) == FrameOutcome::Cancelled {
                break;
            }
        }
        log::debug!(
            "render loop finished: {} drawn, {} skipped",
            self.frames_drawn,
            self.frames_skipped
        );
    }
}

impl<S, D> RenderLoop<S, D>
where
    S: Surface + Send + 'static,
    D: 'static,
{
    /// Move the loop onto its own thread, paced by `signal`.
    pub fn spawn<R>(mut self, mut signal: R) -> std::io::Result<RenderHandle<S, D>>
    where
        R: RefreshSignal + 'static,
    {
        let cancel = self.cancel.clone();
        let pending_resize = Arc::clone(&self.pending_resize);
        let handle = thread::Builder::new()
            .name("streamviz-render".into())
            .spawn(move || {
                self.run(&mut signal);
                self
            })?;

        Ok(RenderHandle {
            cancel,
            pending_resize,
            thread: Mutex::new(Some(handle)),
        })
    }
}

/// Control handle for a spawned [`RenderLoop`].
pub struct RenderHandle<S, D> {
    cancel: CancelToken,
    pending_resize: PendingResize,
    thread: Mutex<Option<JoinHandle<RenderLoop<S, D>>>>,
}

impl<S, D> RenderHandle<S, D> {
    /// Stop the loop and wait for it to exit.
    ///
    /// Returns the loop the first time it is called from outside the render
    /// thread; later calls are no-ops returning `None`.
    pub fn cancel(&self) -> Option<RenderLoop<S, D>> {
        self.cancel.cancel();
        let handle = lock(&self.thread).take()?;
        if handle.thread().id() == thread::current().id() {
            return None;
        }
        match handle.join() {
            Ok(render_loop) => Some(render_loop),
            Err(_) => {
                log::warn!("render thread panicked");
                None
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Rescale the surface before the next frame without restarting.
    pub fn resize(&self, width: u32, height: u32, scale: f64) {
        *lock(&self.pending_resize) = Some((width, height, scale));
    }
}

impl<S, D> Drop for RenderHandle<S, D> {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = lock(&self.thread).take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}
