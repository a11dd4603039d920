//! Periodic tasks driven by the host refresh cadence
//!
//! [`PeriodicTask`] runs a closure on its own thread at a fixed interval
//! until cancelled. [`FrameScheduler`] uses one to request a frame of work
//! from the engine once per display refresh while the host is foregrounded.

use crate::engine::Engine;
use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Cancels a [`PeriodicTask`] and wakes it immediately
#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    wake: Sender<()>,
}

impl CancellationToken {
    fn new() -> (Self, Receiver<()>) {
        let (wake, rx) = channel::bounded(1);
        let token = Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            wake,
        };
        (token, rx)
    }

    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            // A full slot already holds a wakeup
            let _ = self.wake.try_send(());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// A closure run on a dedicated thread every `interval`.
///
/// Dropping the task cancels it and joins the thread.
pub struct PeriodicTask {
    name: String,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    pub fn spawn<F>(name: impl Into<String>, interval: Duration, mut tick: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let name = name.into();
        let (token, cancel_rx) = CancellationToken::new();
        let cancelled = token.clone();
        let ticker = channel::tick(interval);

        let handle = thread::Builder::new().name(name.clone()).spawn(move || loop {
            select! {
                recv(ticker) -> _ => {
                    if cancelled.is_cancelled() {
                        break;
                    }
                    tick();
                }
                recv(cancel_rx) -> _ => break,
            }
        })?;

        tracing::trace!("Periodic task {} started ({:?})", name, interval);
        Ok(Self {
            name,
            token,
            handle: Some(handle),
        })
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel and wait for the thread to finish its current tick
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                // Cancelled from inside its own tick; the loop exits on return
                return;
            }
            if handle.join().is_err() {
                tracing::error!("Periodic task {} panicked", self.name);
            }
        }
        tracing::trace!("Periodic task {} stopped", self.name);
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Requests one frame of engine work per display refresh.
///
/// Attached while the host is in the foreground. Pumps are forwarded
/// regardless of session state; the engine ignores them when it has no
/// render target.
pub struct FrameScheduler {
    engine: Arc<dyn Engine>,
    interval: Duration,
    task: Mutex<Option<PeriodicTask>>,
    frames: Arc<AtomicU64>,
}

impl FrameScheduler {
    pub fn new(engine: Arc<dyn Engine>, interval: Duration) -> Self {
        Self {
            engine,
            interval,
            task: Mutex::new(None),
            frames: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start pumping frames. Returns `false` if already attached.
    pub fn attach(&self) -> bool {
        let mut task = self.task.lock();
        if task.is_some() {
            return false;
        }

        let engine = Arc::clone(&self.engine);
        let frames = Arc::clone(&self.frames);
        match PeriodicTask::spawn("frame-scheduler", self.interval, move || {
            engine.pump_frame();
            frames.fetch_add(1, Ordering::Relaxed);
        }) {
            Ok(spawned) => {
                tracing::debug!("Frame scheduler attached ({:?})", self.interval);
                *task = Some(spawned);
                true
            }
            Err(e) => {
                tracing::error!("Could not start frame scheduler: {}", e);
                false
            }
        }
    }

    /// Stop pumping frames. Returns `false` if not attached.
    pub fn detach(&self) -> bool {
        let task = self.task.lock().take();
        match task {
            Some(task) => {
                task.cancel();
                tracing::debug!("Frame scheduler detached");
                true
            }
            None => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Forward one refresh callback from the host's display
    pub fn on_refresh(&self) {
        self.engine.pump_frame();
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Total frame requests forwarded to the engine
    pub fn frames_pumped(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.detach();
    }
}
