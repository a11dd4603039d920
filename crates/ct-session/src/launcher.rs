//! Engine worker thread launcher
//!
//! Owns the single background thread that runs the engine's blocking
//! execution loop. The controller thread never blocks on engine execution:
//! a worker retired by `stop()` is joined by a short-lived reaper thread, and
//! that reaper is joined before the next worker is launched.
//!
//! A worker never takes the session lock on its way out. It posts a
//! [`WorkerExit`] and then calls the exit notifier, which may only try the
//! lock while its [`WorkerTicket`] is still live. Joining a retired worker
//! while holding the session lock therefore cannot deadlock. Workers that
//! returned on their own may still be running lifecycle hooks, so they are
//! only joined once finished or at teardown, outside the session lock.

use crate::engine::Engine;
use crossbeam::channel::{self, Receiver, Sender};
use ct_core::{EngineError, SessionError};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Generation value meaning "no live worker"
const NO_WORKER: u64 = 0;

/// Upper bound on waiting for a fresh worker to enter the execution loop
const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);
const SETTLE_POLL: Duration = Duration::from_micros(200);

/// Posted by a worker once the engine's execution loop has returned
#[derive(Debug)]
pub struct WorkerExit {
    pub generation: u64,
    pub result: Result<(), EngineError>,
}

/// Identifies a worker to the exit notifier
#[derive(Debug, Clone)]
pub struct WorkerTicket {
    generation: u64,
    live: Arc<AtomicU64>,
}

impl WorkerTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether this worker is still the session's live worker
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire) == self.generation
    }
}

/// Called on the worker thread after its exit has been posted
pub type ExitNotifier = Arc<dyn Fn(&WorkerTicket) + Send + Sync>;

struct Worker {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Launches and retires the engine worker thread
pub struct EngineThreadLauncher {
    thread_name: String,
    stack_size: Option<usize>,
    next_generation: u64,
    /// Live worker
    worker: Option<Worker>,
    /// Reaper of a stopped worker, joined before the next launch
    draining: Option<JoinHandle<()>>,
    /// Workers whose execution loop returned on its own
    exited: Vec<JoinHandle<()>>,
    live_generation: Arc<AtomicU64>,
    exit_tx: Sender<WorkerExit>,
    exit_rx: Receiver<WorkerExit>,
}

impl EngineThreadLauncher {
    pub fn new(thread_name: impl Into<String>, stack_size: Option<usize>) -> Self {
        let (exit_tx, exit_rx) = channel::unbounded();
        Self {
            thread_name: thread_name.into(),
            stack_size,
            next_generation: NO_WORKER,
            worker: None,
            draining: None,
            exited: Vec::new(),
            live_generation: Arc::new(AtomicU64::new(NO_WORKER)),
            exit_tx,
            exit_rx,
        }
    }

    /// Whether a worker is alive (or about to be)
    pub fn is_alive(&self) -> bool {
        self.worker.is_some()
    }

    /// Whether a retired thread has not been joined yet
    pub fn has_retired(&self) -> bool {
        self.draining.is_some() || !self.exited.is_empty()
    }

    /// Generation of the live worker
    pub fn live_generation(&self) -> Option<u64> {
        self.worker.as_ref().map(|w| w.generation)
    }

    /// Spawn a worker running `engine.start(content)`.
    ///
    /// Must only be called with no live worker. A stopped worker is joined
    /// first so two execution loops never overlap.
    pub fn launch(
        &mut self,
        engine: Arc<dyn Engine>,
        content: &Path,
        notifier: ExitNotifier,
    ) -> Result<u64, SessionError> {
        if let Some(worker) = &self.worker {
            tracing::error!(
                "Bug, launch requested while worker {} is alive",
                worker.generation
            );
            return Err(SessionError::WorkerAlive);
        }

        if let Some(handle) = self.draining.take() {
            tracing::debug!("Joining stopped emulation thread");
            join_thread(handle);
        }
        self.reap_exited();
        // Every retired worker has posted by now; none of it concerns the new one
        for stale in self.exit_rx.try_iter() {
            tracing::trace!("Dropping exit of retired worker {}", stale.generation);
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        self.live_generation.store(generation, Ordering::Release);

        let ticket = WorkerTicket {
            generation,
            live: Arc::clone(&self.live_generation),
        };
        let exit_tx = self.exit_tx.clone();
        let content = content.to_path_buf();

        let mut builder = thread::Builder::new().name(self.thread_name.clone());
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }

        let spawned = builder.spawn(move || {
            tracing::debug!("Starting emulation thread ({})", content.display());
            let result = panic::catch_unwind(AssertUnwindSafe(|| engine.start(&content)))
                .unwrap_or_else(|_| Err(EngineError::Aborted("engine panicked".to_string())));

            // Receiver lives as long as the launcher
            let _ = exit_tx.send(WorkerExit { generation, result });
            if ticket.is_live() {
                notifier(&ticket);
            }
        });

        match spawned {
            Ok(handle) => {
                tracing::debug!("Emulation worker {} launched", generation);
                self.worker = Some(Worker { generation, handle });
                Ok(generation)
            }
            Err(e) => {
                self.live_generation.store(NO_WORKER, Ordering::Release);
                Err(SessionError::ThreadSpawn(e.to_string()))
            }
        }
    }

    /// Exits posted by the live worker. Exits of retired workers are dropped.
    pub fn drain_exits(&mut self) -> Vec<WorkerExit> {
        let live = self.live_generation();
        self.exit_rx
            .try_iter()
            .filter(|exit| Some(exit.generation) == live)
            .collect()
    }

    /// Wait until the live worker is inside the engine's execution loop or has
    /// posted its exit.
    ///
    /// A stop request sent before the worker reached [`Engine::start`] would
    /// otherwise find an idle engine and be lost.
    pub fn await_settled(&self, engine: &dyn Engine) {
        let Some(worker) = &self.worker else {
            return;
        };
        let deadline = Instant::now() + SETTLE_TIMEOUT;
        while !engine.is_running() && self.exit_rx.is_empty() && !worker.handle.is_finished() {
            if Instant::now() >= deadline {
                tracing::warn!(
                    "Emulation thread {} has not entered the engine yet",
                    worker.generation
                );
                return;
            }
            thread::sleep(SETTLE_POLL);
        }
    }

    /// Join the reaper of a stopped worker, if any.
    ///
    /// Returns `true` when one was outstanding. Safe under the session lock:
    /// a retired worker never takes it.
    pub fn join_draining(&mut self) -> bool {
        match self.draining.take() {
            Some(handle) => {
                join_thread(handle);
                true
            }
            None => false,
        }
    }

    /// Bookkeeping after the live worker exited on its own.
    ///
    /// May run on the worker thread itself, so the handle is kept rather
    /// than joined.
    pub fn finish(&mut self, generation: u64) {
        match self.worker.take() {
            Some(worker) if worker.generation == generation => {
                self.live_generation.store(NO_WORKER, Ordering::Release);
                self.reap_exited();
                self.exited.push(worker.handle);
            }
            other => self.worker = other,
        }
    }

    /// Detach the live worker after the engine was told to stop and join it
    /// on a reaper thread.
    pub fn retire(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.live_generation.store(NO_WORKER, Ordering::Release);

        if worker.handle.is_finished() {
            join_thread(worker.handle);
            return;
        }
        if worker.handle.thread().id() == thread::current().id() {
            // Retired from its own exit path; the thread ends on return
            return;
        }

        if let Some(previous) = self.draining.take() {
            join_thread(previous);
        }

        let (handle_tx, handle_rx) = channel::bounded::<JoinHandle<()>>(1);
        let reaper = thread::Builder::new()
            .name(format!("{}-reaper", self.thread_name))
            .spawn(move || {
                if let Ok(handle) = handle_rx.recv() {
                    join_thread(handle);
                }
            });

        match reaper {
            Ok(reaper) => {
                // The reaper is parked on recv, the bounded slot is free
                let _ = handle_tx.send(worker.handle);
                self.draining = Some(reaper);
            }
            Err(e) => {
                tracing::warn!("Could not spawn reaper thread: {}", e);
                self.draining = Some(worker.handle);
            }
        }
    }

    /// Retire any live worker and hand over every outstanding thread.
    ///
    /// Callers join the handles with [`join_threads`] once they no longer
    /// hold the session lock.
    pub fn take_threads(&mut self) -> Vec<JoinHandle<()>> {
        self.retire();
        let mut threads: Vec<_> = self.draining.take().into_iter().collect();
        threads.append(&mut self.exited);
        threads
    }

    /// Retire any live worker and wait for every worker thread to end
    pub fn shutdown(&mut self) {
        join_threads(self.take_threads());
    }

    fn reap_exited(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) = self
            .exited
            .drain(..)
            .partition(|handle| handle.is_finished());
        self.exited = running;
        join_threads(finished);
    }
}

/// Join worker threads, skipping the calling thread itself
pub fn join_threads(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        join_thread(handle);
    }
}

fn join_thread(handle: JoinHandle<()>) {
    if handle.thread().id() == thread::current().id() {
        // Torn down from one of its own hooks; the thread ends on return
        return;
    }
    if handle.join().is_err() {
        tracing::error!("Emulation thread panicked while being joined");
    }
}

impl Drop for EngineThreadLauncher {
    fn drop(&mut self) {
        if self.worker.is_some() || self.has_retired() {
            tracing::warn!("Launcher dropped with emulation threads outstanding");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::null::NullEngine;
    use std::time::Duration;

    fn noop_notifier() -> ExitNotifier {
        Arc::new(|_| {})
    }

    #[test]
    fn test_launch_and_retire() {
        let engine = Arc::new(NullEngine::new());
        let mut launcher = EngineThreadLauncher::new("test-emulation", None);

        let generation = launcher
            .launch(engine.clone(), Path::new("game.3ds"), noop_notifier())
            .unwrap();
        assert_eq!(generation, 1);
        assert!(launcher.is_alive());
        assert!(engine.wait_until_running(Duration::from_secs(5)));

        engine.stop();
        launcher.retire();
        assert!(!launcher.is_alive());

        launcher.shutdown();
        assert!(!launcher.has_retired());
        assert!(!engine.is_running());
    }

    #[test]
    fn test_second_launch_rejected_while_alive() {
        let engine = Arc::new(NullEngine::new());
        let mut launcher = EngineThreadLauncher::new("test-emulation", None);

        launcher
            .launch(engine.clone(), Path::new("game.3ds"), noop_notifier())
            .unwrap();
        let err = launcher
            .launch(engine.clone(), Path::new("game.3ds"), noop_notifier())
            .unwrap_err();
        assert!(matches!(err, SessionError::WorkerAlive));

        engine.stop();
        launcher.shutdown();
    }

    #[test]
    fn test_natural_exit_is_reported() {
        let engine = Arc::new(NullEngine::new());
        let mut launcher = EngineThreadLauncher::new("test-emulation", None);
        let (seen_tx, seen_rx) = channel::unbounded();
        let notifier: ExitNotifier = Arc::new(move |ticket: &WorkerTicket| {
            let _ = seen_tx.send(ticket.generation());
        });

        let generation = launcher
            .launch(engine.clone(), Path::new("game.3ds"), notifier)
            .unwrap();
        assert!(engine.wait_until_running(Duration::from_secs(5)));
        engine.finish();

        assert_eq!(seen_rx.recv_timeout(Duration::from_secs(5)), Ok(generation));
        let exits = launcher.drain_exits();
        assert_eq!(exits.len(), 1);
        assert!(exits[0].result.is_ok());

        launcher.finish(generation);
        assert!(!launcher.is_alive());
        assert!(launcher.has_retired());
        launcher.shutdown();
        assert!(!launcher.has_retired());
    }

    #[test]
    fn test_retired_worker_does_not_notify() {
        let engine = Arc::new(NullEngine::new());
        let mut launcher = EngineThreadLauncher::new("test-emulation", None);
        let (seen_tx, seen_rx) = channel::unbounded::<u64>();
        let notifier: ExitNotifier = Arc::new(move |ticket: &WorkerTicket| {
            let _ = seen_tx.send(ticket.generation());
        });

        launcher
            .launch(engine.clone(), Path::new("game.3ds"), notifier)
            .unwrap();
        assert!(engine.wait_until_running(Duration::from_secs(5)));
        launcher.retire();
        engine.stop();
        launcher.shutdown();

        assert!(seen_rx.try_recv().is_err());
        assert!(launcher.drain_exits().is_empty());
    }

    #[test]
    fn test_relaunch_after_retire() {
        let engine = Arc::new(NullEngine::new());
        let mut launcher = EngineThreadLauncher::new("test-emulation", None);

        launcher
            .launch(engine.clone(), Path::new("game.3ds"), noop_notifier())
            .unwrap();
        assert!(engine.wait_until_running(Duration::from_secs(5)));
        engine.stop();
        launcher.retire();

        let generation = launcher
            .launch(engine.clone(), Path::new("game.3ds"), noop_notifier())
            .unwrap();
        assert_eq!(generation, 2);
        assert!(!launcher.has_retired());
        assert!(engine.wait_until_running(Duration::from_secs(5)));

        engine.stop();
        launcher.shutdown();
    }

    #[test]
    fn test_stop_right_after_launch_is_not_lost() {
        let engine = Arc::new(NullEngine::new());
        let mut launcher = EngineThreadLauncher::new("test-emulation", None);

        for _ in 0..20 {
            launcher
                .launch(engine.clone(), Path::new("game.3ds"), noop_notifier())
                .unwrap();
            launcher.await_settled(engine.as_ref());
            engine.stop();
            launcher.retire();
            launcher.join_draining();
            assert!(!engine.is_running());
        }
        launcher.shutdown();
    }

    #[test]
    fn test_join_draining() {
        let engine = Arc::new(NullEngine::new());
        let mut launcher = EngineThreadLauncher::new("test-emulation", None);
        assert!(!launcher.join_draining());

        launcher
            .launch(engine.clone(), Path::new("game.3ds"), noop_notifier())
            .unwrap();
        assert!(engine.wait_until_running(Duration::from_secs(5)));
        engine.stop();
        launcher.retire();
        launcher.join_draining();

        assert!(!launcher.has_retired());
        assert!(!engine.is_running());
    }

    #[test]
    fn test_start_failure_is_posted() {
        let engine = Arc::new(NullEngine::new());
        engine.fail_next_start("bad header");
        let mut launcher = EngineThreadLauncher::new("test-emulation", None);
        let (seen_tx, seen_rx) = channel::unbounded();
        let notifier: ExitNotifier = Arc::new(move |ticket: &WorkerTicket| {
            let _ = seen_tx.send(ticket.generation());
        });

        let generation = launcher
            .launch(engine.clone(), Path::new("game.3ds"), notifier)
            .unwrap();
        assert_eq!(seen_rx.recv_timeout(Duration::from_secs(5)), Ok(generation));

        let exits = launcher.drain_exits();
        assert!(matches!(exits[0].result, Err(EngineError::StartFailed { .. })));
        launcher.finish(generation);
        launcher.shutdown();
    }
}
