//! Session state machine
//!
//! The authoritative Stopped/Running/Paused state and the only place that
//! drives engine transitions. Every method runs under the session lock, so
//! no two transitions interleave. Transitions never fail: re-entrant calls
//! (double stop, pause while stopped, ...) are logged and ignored, because
//! host lifecycle callbacks legitimately fire more than once.

use crate::engine::{Engine, RenderTarget, TargetHandle};
use crate::hooks::LifecycleEvent;
use crate::launcher::{EngineThreadLauncher, ExitNotifier};
use crate::render_target::RenderTargetRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, warn};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No execution loop; initial and terminal state
    Stopped,
    /// Engine running with a render target attached
    Running,
    /// Engine suspended, no render target attached
    Paused,
}

/// State machine for one emulation session
pub struct SessionStateMachine {
    engine: Arc<dyn Engine>,
    content_path: PathBuf,
    state: SessionState,
    /// Host asked to run; a valid render target completes the transition
    run_requested: bool,
    /// Paused for a close-game confirmation
    close_pending: bool,
    /// Pause right after the worker launches
    start_paused: bool,
    disposed: bool,
    registry: RenderTargetRegistry,
    launcher: EngineThreadLauncher,
    exit_notifier: ExitNotifier,
}

impl SessionStateMachine {
    pub fn new(
        engine: Arc<dyn Engine>,
        content_path: PathBuf,
        launcher: EngineThreadLauncher,
        exit_notifier: ExitNotifier,
    ) -> Self {
        Self {
            engine,
            content_path,
            state: SessionState::Stopped,
            run_requested: false,
            close_pending: false,
            start_paused: false,
            disposed: false,
            registry: RenderTargetRegistry::new(),
            launcher,
            exit_notifier,
        }
    }

    pub fn set_start_paused(&mut self, start_paused: bool) {
        self.start_paused = start_paused;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn content_path(&self) -> &Path {
        &self.content_path
    }

    pub fn run_requested(&self) -> bool {
        self.run_requested
    }

    pub fn close_pending(&self) -> bool {
        self.close_pending
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn is_worker_alive(&self) -> bool {
        self.launcher.is_alive()
    }

    pub fn current_target(&self) -> Option<RenderTarget> {
        self.registry.current()
    }

    pub fn attached_target(&self) -> Option<RenderTarget> {
        self.registry.attached()
    }

    /// Apply exits posted by the live worker.
    ///
    /// The engine returning on its own counts as the session stopping.
    pub fn absorb_worker_exits(&mut self, events: &mut Vec<LifecycleEvent>) {
        for exit in self.launcher.drain_exits() {
            self.launcher.finish(exit.generation);
            match exit.result {
                Ok(()) => debug!("Emulation thread {} returned", exit.generation),
                Err(e) => warn!("Emulation thread {} ended with error: {}", exit.generation, e),
            }

            if self.state != SessionState::Stopped {
                self.registry.detach(self.engine.as_ref());
                self.state = SessionState::Stopped;
                self.run_requested = false;
                self.close_pending = false;
                events.push(LifecycleEvent::Stopped);
            }
        }
    }

    /// Any -> Stopped
    pub fn stop(&mut self, events: &mut Vec<LifecycleEvent>) {
        if self.state == SessionState::Stopped {
            warn!("Stop called while already stopped");
            return;
        }

        debug!("Stopping emulation");
        self.state = SessionState::Stopped;
        self.run_requested = false;
        self.close_pending = false;
        self.registry.detach(self.engine.as_ref());
        self.launcher.await_settled(self.engine.as_ref());
        self.engine.stop();
        self.launcher.retire();
        events.push(LifecycleEvent::Stopped);
    }

    /// Running -> Paused
    pub fn pause(&mut self, events: &mut Vec<LifecycleEvent>) {
        match self.state {
            SessionState::Running => {
                debug!("Pausing emulation");
                self.state = SessionState::Paused;
                self.run_requested = false;
                // Pausing requires the engine to have released rendering resources
                self.registry.detach(self.engine.as_ref());
                self.engine.pause();
                events.push(LifecycleEvent::Paused);
            }
            SessionState::Paused => warn!("Pause called while already paused"),
            SessionState::Stopped => warn!("Pause called while stopped"),
        }
    }

    /// Paused -> Running.
    ///
    /// The registered render target is handed back to the engine before it
    /// resumes. Without one the resume is deferred until a target arrives.
    pub fn resume(&mut self, events: &mut Vec<LifecycleEvent>) {
        match self.state {
            SessionState::Paused => {
                self.run_requested = true;
                self.close_pending = false;
                if self.registry.is_valid() {
                    self.become_running(events);
                } else {
                    debug!("Resume deferred until a render target is available");
                }
            }
            SessionState::Running => warn!("Unpause called while already running"),
            SessionState::Stopped => warn!("Unpause called while stopped"),
        }
    }

    /// Entry point on view (re)attachment
    pub fn run(&mut self, host_recreated: bool, events: &mut Vec<LifecycleEvent>) {
        if self.disposed {
            warn!("Run called on a torn down session");
            return;
        }

        if host_recreated {
            // A worker this session stopped may still be winding down; its
            // loop is not one to resume
            if self.launcher.join_draining() {
                debug!("Joined stopped emulation thread before run");
            }

            // The worker survived the recreation; only the bookkeeping changes
            if self.engine.is_running() && self.state != SessionState::Paused {
                debug!("Host recreated with engine running, treating session as paused");
                // Paused while the engine still holds the old target; the next
                // hand-off clears that attachment before setting the new one
                if self.state == SessionState::Running {
                    events.push(LifecycleEvent::Paused);
                }
                self.state = SessionState::Paused;
                self.run_requested = true;
                return;
            }
        } else {
            debug!("Host resumed or fresh start");
        }

        self.run_requested = true;
        if self.registry.is_valid() {
            self.become_running(events);
        } else {
            debug!("Waiting for a render target before running");
        }
    }

    /// A render target was created
    pub fn target_created(&mut self, handle: TargetHandle, events: &mut Vec<LifecycleEvent>) {
        if self.disposed {
            return;
        }
        if self.registry.record(handle) {
            debug!("Render target {} created", handle);
        }
        self.on_target_valid(events);
    }

    /// The render target changed size (or was replaced)
    pub fn target_changed(
        &mut self,
        handle: TargetHandle,
        width: u32,
        height: u32,
        events: &mut Vec<LifecycleEvent>,
    ) {
        if self.disposed {
            return;
        }
        debug!("Render target {} changed: {}x{}", handle, width, height);
        self.registry.update(handle, width, height);
        self.on_target_valid(events);
    }

    fn on_target_valid(&mut self, events: &mut Vec<LifecycleEvent>) {
        match self.state {
            SessionState::Running => {
                self.registry.attach(self.engine.as_ref());
            }
            _ if self.run_requested => self.become_running(events),
            state => debug!("Render target held until run ({:?})", state),
        }
    }

    /// The render target was destroyed
    pub fn target_destroyed(&mut self, events: &mut Vec<LifecycleEvent>) {
        if self.registry.take().is_none() {
            warn!("Render target destroyed, but none was registered");
            return;
        }
        debug!("Render target destroyed");

        // The engine must never touch a destroyed target
        self.registry.detach(self.engine.as_ref());

        match self.state {
            SessionState::Running => {
                self.state = SessionState::Paused;
                events.push(LifecycleEvent::Paused);
            }
            SessionState::Paused => debug!("Render target destroyed while paused"),
            SessionState::Stopped => debug!("Render target destroyed while stopped"),
        }
    }

    /// Pause and wait for the host to confirm closing the game
    pub fn request_close(&mut self, events: &mut Vec<LifecycleEvent>) {
        if self.state == SessionState::Stopped {
            warn!("Close requested while stopped");
            return;
        }
        self.pause(events);
        self.close_pending = true;
    }

    /// Close confirmed: stop the session
    pub fn confirm_close(&mut self, events: &mut Vec<LifecycleEvent>) {
        if !self.close_pending {
            debug!("Closing game without a pending confirmation");
        }
        self.stop(events);
    }

    /// Close cancelled: resume where the request paused
    pub fn cancel_close(&mut self, events: &mut Vec<LifecycleEvent>) {
        if !self.close_pending {
            warn!("Close cancelled, but no close was pending");
            return;
        }
        self.close_pending = false;
        self.resume(events);
    }

    /// Stop and refuse further runs.
    ///
    /// Returns the worker threads still to be joined; the caller joins them
    /// after releasing the session lock.
    pub fn teardown(&mut self, events: &mut Vec<LifecycleEvent>) -> Vec<JoinHandle<()>> {
        if self.disposed {
            return Vec::new();
        }
        if self.state != SessionState::Stopped {
            self.stop(events);
        }
        self.registry.take();
        self.disposed = true;
        debug!("Session torn down");
        self.launcher.take_threads()
    }

    fn become_running(&mut self, events: &mut Vec<LifecycleEvent>) {
        match self.state {
            SessionState::Running => {
                error!("Bug, run called while already running");
            }
            SessionState::Stopped => {
                if !self.registry.attach(self.engine.as_ref()) {
                    return;
                }
                let launched = self.launcher.launch(
                    Arc::clone(&self.engine),
                    &self.content_path,
                    Arc::clone(&self.exit_notifier),
                );
                match launched {
                    Ok(generation) => {
                        debug!("Emulation started (worker {})", generation);
                        self.state = SessionState::Running;
                        events.push(LifecycleEvent::Started);
                        if self.start_paused {
                            self.pause(events);
                        }
                    }
                    Err(e) => {
                        error!("Could not start emulation: {}", e);
                        self.registry.detach(self.engine.as_ref());
                        self.run_requested = false;
                    }
                }
            }
            SessionState::Paused => {
                if !self.registry.attach(self.engine.as_ref()) {
                    return;
                }
                debug!("Resuming emulation");
                self.engine.resume();
                self.state = SessionState::Running;
                events.push(LifecycleEvent::Resumed);
            }
        }
    }
}
