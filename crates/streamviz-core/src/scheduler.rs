//! Periodic background timer.
//!
//! A [`PeriodicTimer`] runs a task on a dedicated thread every `period`.
//! Ticks are deadline-based: a slow task delays the next tick, and a tick
//! that overruns by more than a full period re-anchors instead of firing a
//! burst of catch-up ticks.

use std::sync::Mutex;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::lock;

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Cancellable fixed-period task runner.
///
/// `stop()` is idempotent. Once it returns no further tick starts; a tick
/// already in progress on another thread is waited for. Calling `stop()`
/// from inside the task itself is allowed and ends the timer after the
/// current tick.
pub struct PeriodicTimer {
    name: String,
    period: Duration,
    worker: Mutex<Option<Worker>>,
}

impl PeriodicTimer {
    pub fn new(name: impl Into<String>, period: Duration) -> Self {
        Self {
            name: name.into(),
            period,
            worker: Mutex::new(None),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        lock(&self.worker).is_some()
    }

    /// Start ticking. Returns `false` if the timer is already running or the
    /// worker thread could not be spawned.
    pub fn start<F>(&self, mut task: F) -> bool
    where
        F: FnMut() + Send + 'static,
    {
        let mut slot = lock(&self.worker);
        if slot.is_some() {
            return false;
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let period = self.period;
        let name = self.name.clone();

        let spawned = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                let mut next = Instant::now() + period;
                loop {
                    let wait = next.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {}
                        // Stop requested or timer dropped.
                        _ => break,
                    }

                    let result =
                        std::panic::catch_unwind(std::panic::AssertUnwindSafe(&mut task));
                    if result.is_err() {
                        log::warn!("{name}: task panicked, timer keeps running");
                    }

                    next += period;
                    let now = Instant::now();
                    if next < now {
                        log::debug!("{name}: tick overran, re-anchoring");
                        next = now + period;
                    }
                }
            });

        match spawned {
            Ok(handle) => {
                *slot = Some(Worker { stop_tx, handle });
                log::debug!("{}: started ({:?} period)", self.name, self.period);
                true
            }
            Err(e) => {
                log::error!("{}: failed to spawn timer thread: {e}", self.name);
                false
            }
        }
    }

    /// Cancel the timer. No-op when stopped.
    pub fn stop(&self) {
        let worker = lock(&self.worker).take();
        let Some(worker) = worker else {
            return;
        };
        drop(worker.stop_tx);

        if worker.handle.thread().id() == thread::current().id() {
            // Called from the task: the loop exits once this tick returns.
            return;
        }
        if worker.handle.join().is_err() {
            log::warn!("{}: timer thread panicked", self.name);
        }
        log::debug!("{}: stopped", self.name);
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for PeriodicTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicTimer")
            .field("name", &self.name)
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn ticks_while_running() {
        let timer = PeriodicTimer::new("test-ticks", Duration::from_millis(5));
        let (count, task) = counter();
        assert!(timer.start(task));
        assert!(timer.is_running());
        thread::sleep(Duration::from_millis(80));
        timer.stop();
        assert!(count.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn second_start_is_rejected() {
        let timer = PeriodicTimer::new("test-double", Duration::from_millis(50));
        let (_, a) = counter();
        let (_, b) = counter();
        assert!(timer.start(a));
        assert!(!timer.start(b));
        timer.stop();
    }

    #[test]
    fn no_tick_after_stop_returns() {
        let timer = PeriodicTimer::new("test-stop", Duration::from_millis(2));
        let (count, task) = counter();
        timer.start(task);
        thread::sleep(Duration::from_millis(20));
        timer.stop();
        let after_stop = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
        assert!(!timer.is_running());
    }

    #[test]
    fn stop_is_idempotent_and_restartable() {
        let timer = PeriodicTimer::new("test-restart", Duration::from_millis(5));
        timer.stop();
        let (count, task) = counter();
        assert!(timer.start(task));
        timer.stop();
        timer.stop();
        let (_, again) = counter();
        assert!(timer.start(again));
        timer.stop();
        let _ = count;
    }

    #[test]
    fn stop_from_inside_task() {
        let timer = Arc::new(PeriodicTimer::new("test-self-stop", Duration::from_millis(2)));
        let count = Arc::new(AtomicUsize::new(0));
        let t = Arc::clone(&timer);
        let c = Arc::clone(&count);
        timer.start(move || {
            c.fetch_add(1, Ordering::SeqCst);
            t.stop();
        });
        thread::sleep(Duration::from_millis(40));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!timer.is_running());
    }

    #[test]
    fn panicking_task_keeps_timer_alive() {
        let timer = PeriodicTimer::new("test-panic", Duration::from_millis(2));
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        timer.start(move || {
            if c.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first tick fails");
            }
        });
        thread::sleep(Duration::from_millis(40));
        timer.stop();
        assert!(count.load(Ordering::SeqCst) >= 2);
    }
}
