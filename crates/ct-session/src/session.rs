//! Emulation session
//!
//! [`Session`] is the handle the host keeps for one emulation run. It is
//! cheap to clone and outlives host view re-creation. Every transition runs
//! under one lock guarding the state machine, the render target registry and
//! the worker launcher; lifecycle hooks fire after that lock is released.

use crate::content::ContentResolver;
use crate::engine::{Engine, RenderTarget, TargetHandle};
use crate::events::HostEvent;
use crate::hooks::{LifecycleEvent, LifecycleHooks};
use crate::launcher::{join_threads, EngineThreadLauncher, ExitNotifier, WorkerTicket};
use crate::scheduler::FrameScheduler;
use crate::state::{SessionState, SessionStateMachine};
use ct_core::{Config, SessionError};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// How long an exiting worker waits for the session lock per attempt
const EXIT_LOCK_RETRY: Duration = Duration::from_millis(10);

struct Shared {
    engine: Arc<dyn Engine>,
    content_path: PathBuf,
    confirm_exit: bool,
    machine: Mutex<SessionStateMachine>,
    hooks: LifecycleHooks,
    scheduler: FrameScheduler,
}

impl Shared {
    /// Runs on the worker thread after its execution loop returned
    fn on_worker_exit(&self, ticket: &WorkerTicket) {
        while ticket.is_live() {
            if let Some(mut machine) = self.machine.try_lock_for(EXIT_LOCK_RETRY) {
                let mut events = Vec::new();
                machine.absorb_worker_exits(&mut events);
                drop(machine);
                self.hooks.notify_all(&events);
                return;
            }
        }
        tracing::trace!("Worker {} exit absorbed elsewhere", ticket.generation());
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.scheduler.detach();
        let mut events = Vec::new();
        let threads = self.machine.get_mut().teardown(&mut events);
        if !events.is_empty() {
            tracing::debug!("Session dropped without teardown");
        }
        self.hooks.notify_all(&events);
        join_threads(threads);
    }
}

/// Handle to one emulation session
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl Session {
    /// Create a session for `content_path`, initially Stopped
    pub fn new(config: &Config, engine: Arc<dyn Engine>, content_path: PathBuf) -> Self {
        let shared = Arc::new_cyclic(|weak: &Weak<Shared>| {
            let weak = weak.clone();
            let notifier: ExitNotifier = Arc::new(move |ticket: &WorkerTicket| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_worker_exit(ticket);
                }
            });

            let launcher = EngineThreadLauncher::new(
                config.session.worker_thread_name.clone(),
                config.session.worker_stack_size,
            );
            let mut machine = SessionStateMachine::new(
                Arc::clone(&engine),
                content_path.clone(),
                launcher,
                notifier,
            );
            machine.set_start_paused(config.general.start_paused);

            Shared {
                scheduler: FrameScheduler::new(
                    Arc::clone(&engine),
                    config.session.refresh_interval(),
                ),
                engine,
                content_path,
                confirm_exit: config.general.confirm_exit,
                machine: Mutex::new(machine),
                hooks: LifecycleHooks::new(),
            }
        });

        tracing::info!("Session created for {}", shared.content_path.display());
        Self { shared }
    }

    /// Resolve the content to run and create a session for it.
    ///
    /// Fails when no usable content was given; the error's `Display` is the
    /// message to show before closing the emulation view.
    pub fn open(
        config: &Config,
        engine: Arc<dyn Engine>,
        selected: Option<&Path>,
        launch_path: Option<&Path>,
    ) -> Result<Self, SessionError> {
        let resolver = ContentResolver::new(config.content.clone());
        let content_path = resolver.resolve(selected, launch_path)?;
        Ok(Self::new(config, engine, content_path))
    }

    /// Run `f` under the session lock, then notify hooks of the transitions
    fn transition<R>(
        &self,
        f: impl FnOnce(&mut SessionStateMachine, &mut Vec<LifecycleEvent>) -> R,
    ) -> R {
        let mut events = Vec::new();
        let result = {
            let mut machine = self.shared.machine.lock();
            machine.absorb_worker_exits(&mut events);
            f(&mut machine, &mut events)
        };
        self.shared.hooks.notify_all(&events);
        result
    }

    pub fn state(&self) -> SessionState {
        self.transition(|machine, _| machine.state())
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state() == SessionState::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == SessionState::Stopped
    }

    pub fn content_path(&self) -> &Path {
        &self.shared.content_path
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.shared.engine
    }

    /// Whether the engine worker thread is alive
    pub fn worker_alive(&self) -> bool {
        self.transition(|machine, _| machine.is_worker_alive())
    }

    /// Render target currently lent to the engine
    pub fn attached_target(&self) -> Option<RenderTarget> {
        self.transition(|machine, _| machine.attached_target())
    }

    pub fn close_pending(&self) -> bool {
        self.transition(|machine, _| machine.close_pending())
    }

    pub fn is_disposed(&self) -> bool {
        self.transition(|machine, _| machine.is_disposed())
    }

    /// Enter Running once a render target is available
    pub fn run(&self, host_recreated: bool) {
        self.transition(|machine, events| machine.run(host_recreated, events));
    }

    pub fn pause(&self) {
        self.transition(|machine, events| machine.pause(events));
    }

    pub fn resume(&self) {
        self.transition(|machine, events| machine.resume(events));
    }

    pub fn unpause(&self) {
        self.resume();
    }

    /// Resume when paused, pause otherwise
    pub fn toggle_pause(&self) {
        self.transition(|machine, events| {
            if machine.state() == SessionState::Paused {
                machine.resume(events);
            } else {
                machine.pause(events);
            }
        });
    }

    pub fn stop(&self) {
        self.transition(|machine, events| machine.stop(events));
    }

    pub fn target_created(&self, handle: TargetHandle) {
        self.transition(|machine, events| machine.target_created(handle, events));
    }

    pub fn target_changed(&self, handle: TargetHandle, width: u32, height: u32) {
        self.transition(|machine, events| machine.target_changed(handle, width, height, events));
    }

    pub fn target_destroyed(&self) {
        self.transition(|machine, events| machine.target_destroyed(events));
    }

    /// Single ingress for host lifecycle and render target events
    pub fn dispatch(&self, event: HostEvent) {
        tracing::trace!("Host event {}", event.name());
        match event {
            HostEvent::TargetAvailable(handle) => self.target_created(handle),
            HostEvent::TargetResized {
                handle,
                width,
                height,
            } => self.target_changed(handle, width, height),
            HostEvent::TargetLost => self.target_destroyed(),
            HostEvent::HostPause => {
                self.transition(|machine, events| {
                    if machine.state() == SessionState::Running {
                        machine.pause(events);
                    }
                });
                self.shared.scheduler.detach();
            }
            HostEvent::HostResume { recreated } => {
                if self.is_disposed() {
                    tracing::warn!("Host resumed a torn down session");
                    return;
                }
                self.shared.scheduler.attach();
                self.run(recreated);
            }
            HostEvent::HostDestroy => self.teardown(),
        }
    }

    /// Pause for a close-game confirmation.
    ///
    /// Returns `true` when the host should ask the user. With exit
    /// confirmation disabled the session is stopped immediately.
    pub fn request_close(&self) -> bool {
        if !self.shared.confirm_exit {
            self.stop();
            return false;
        }
        self.transition(|machine, events| {
            machine.request_close(events);
            machine.close_pending()
        })
    }

    pub fn confirm_close(&self) {
        self.transition(|machine, events| machine.confirm_close(events));
    }

    pub fn cancel_close(&self) {
        self.transition(|machine, events| machine.cancel_close(events));
    }

    pub fn hooks(&self) -> &LifecycleHooks {
        &self.shared.hooks
    }

    pub fn frame_scheduler(&self) -> &FrameScheduler {
        &self.shared.scheduler
    }

    /// Stop the session and join every worker thread. Further runs are refused.
    pub fn teardown(&self) {
        self.shared.scheduler.detach();
        let threads = self.transition(|machine, events| machine.teardown(events));
        join_threads(threads);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("content_path", &self.shared.content_path)
            .finish_non_exhaustive()
    }
}
