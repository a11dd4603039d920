//! Null engine for headless hosts and testing

use super::{Engine, PerfStats, RenderTarget};
use ct_core::EngineError;
use parking_lot::{Condvar, Mutex};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Nominal guest frame rate used to derive emulation speed
const NOMINAL_FPS: f64 = 60.0;

/// A lifecycle call received by the [`NullEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Start(PathBuf),
    Stop,
    Pause,
    Resume,
    SetRenderTarget(RenderTarget),
    ClearRenderTarget,
}

#[derive(Debug, Default)]
struct NullState {
    running: bool,
    paused: bool,
    stop_requested: bool,
    finish_requested: bool,
    fail_next_start: Option<String>,
    target: Option<RenderTarget>,
    started_at: Option<Instant>,
    frames: u64,
}

/// Engine that executes nothing.
///
/// `start` parks the calling thread until `stop` (or [`NullEngine::finish`])
/// is called, frame pumps are only counted while a render target is attached
/// and the engine is not paused, and every lifecycle call is appended to an
/// ordered call log so hosts and tests can inspect what the controller did.
pub struct NullEngine {
    state: Mutex<NullState>,
    changed: Condvar,
    calls: Mutex<Vec<EngineCall>>,
    ignored_pumps: AtomicU64,
}

impl NullEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(NullState::default()),
            changed: Condvar::new(),
            calls: Mutex::new(Vec::new()),
            ignored_pumps: AtomicU64::new(0),
        }
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().push(call);
    }

    /// Snapshot of every lifecycle call received so far
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    /// Number of recorded calls matching `pred`
    pub fn count(&self, pred: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| pred(call)).count()
    }

    /// Forget the recorded call log
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Frames pumped with an attached target while unpaused
    pub fn frames(&self) -> u64 {
        self.state.lock().frames
    }

    /// Pump requests that were ignored
    pub fn ignored_pumps(&self) -> u64 {
        self.ignored_pumps.load(Ordering::Relaxed)
    }

    /// Render target the engine currently holds
    pub fn target(&self) -> Option<RenderTarget> {
        self.state.lock().target
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// End the execution loop as if the content exited on its own
    pub fn finish(&self) {
        let mut state = self.state.lock();
        state.finish_requested = true;
        self.changed.notify_all();
    }

    /// Make the next `start` fail immediately with `reason`
    pub fn fail_next_start(&self, reason: impl Into<String>) {
        self.state.lock().fail_next_start = Some(reason.into());
    }

    /// Block until an execution loop is alive, up to `timeout`
    pub fn wait_until_running(&self, timeout: Duration) -> bool {
        self.wait_for(timeout, |state| state.running)
    }

    /// Block until no execution loop is alive, up to `timeout`
    pub fn wait_until_idle(&self, timeout: Duration) -> bool {
        self.wait_for(timeout, |state| !state.running)
    }

    fn wait_for(&self, timeout: Duration, done: impl Fn(&NullState) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !done(&state) {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                return done(&state);
            }
        }
        true
    }
}

impl Default for NullEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for NullEngine {
    fn start(&self, content: &Path) -> Result<(), EngineError> {
        self.record(EngineCall::Start(content.to_path_buf()));

        let mut state = self.state.lock();
        if let Some(reason) = state.fail_next_start.take() {
            return Err(EngineError::StartFailed {
                path: content.to_path_buf(),
                reason,
            });
        }
        if state.running {
            return Err(EngineError::StartFailed {
                path: content.to_path_buf(),
                reason: "execution loop already running".to_string(),
            });
        }

        tracing::debug!("NullEngine: running {}", content.display());
        state.running = true;
        state.frames = 0;
        state.started_at = Some(Instant::now());
        self.changed.notify_all();

        while !state.stop_requested && !state.finish_requested {
            self.changed.wait(&mut state);
        }

        state.stop_requested = false;
        state.finish_requested = false;
        state.running = false;
        state.paused = false;
        self.changed.notify_all();
        tracing::debug!("NullEngine: execution loop exited");
        Ok(())
    }

    fn stop(&self) {
        self.record(EngineCall::Stop);
        let mut state = self.state.lock();
        state.target = None;
        // Only a live loop can be stopped; a later start is unaffected
        if state.running {
            state.stop_requested = true;
            self.changed.notify_all();
        }
    }

    fn pause(&self) {
        self.record(EngineCall::Pause);
        self.state.lock().paused = true;
    }

    fn resume(&self) {
        self.record(EngineCall::Resume);
        self.state.lock().paused = false;
    }

    fn set_render_target(&self, target: RenderTarget) {
        self.record(EngineCall::SetRenderTarget(target));
        self.state.lock().target = Some(target);
    }

    fn clear_render_target(&self) {
        self.record(EngineCall::ClearRenderTarget);
        self.state.lock().target = None;
    }

    fn is_running(&self) -> bool {
        self.state.lock().running
    }

    fn pump_frame(&self) {
        let mut state = self.state.lock();
        if state.running && !state.paused && state.target.is_some() {
            state.frames += 1;
        } else {
            self.ignored_pumps.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn perf_stats(&self) -> PerfStats {
        let state = self.state.lock();
        let elapsed = state
            .started_at
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        if !state.running || elapsed <= 0.0 || state.frames == 0 {
            return PerfStats::default();
        }

        let fps = state.frames as f64 / elapsed;
        PerfStats {
            system_fps: fps,
            game_fps: fps,
            emulation_speed: fps / NOMINAL_FPS,
            frame_time: 1.0 / fps,
            time_gpu: 0.0,
            time_swap: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TargetHandle;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_start_blocks_until_stop() {
        let engine = Arc::new(NullEngine::new());
        let worker = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.start(Path::new("game.3ds")))
        };

        assert!(engine.wait_until_running(Duration::from_secs(5)));
        engine.stop();
        assert!(worker.join().unwrap().is_ok());
        assert!(!engine.is_running());
        assert_eq!(
            engine.calls(),
            vec![EngineCall::Start(PathBuf::from("game.3ds")), EngineCall::Stop]
        );
    }

    #[test]
    fn test_stop_while_idle_does_not_end_next_run() {
        let engine = Arc::new(NullEngine::new());
        engine.stop();

        let worker = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.start(Path::new("game.3ds")))
        };
        assert!(engine.wait_until_running(Duration::from_secs(5)));
        thread::sleep(Duration::from_millis(20));
        assert!(engine.is_running());

        engine.stop();
        assert!(worker.join().unwrap().is_ok());
        assert!(!engine.is_running());
    }

    #[test]
    fn test_failed_start() {
        let engine = NullEngine::new();
        engine.fail_next_start("corrupt image");
        let err = engine.start(Path::new("game.3ds")).unwrap_err();
        assert!(matches!(err, EngineError::StartFailed { .. }));
    }

    #[test]
    fn test_pump_requires_target() {
        let engine = Arc::new(NullEngine::new());
        let worker = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.start(Path::new("game.3ds")))
        };
        assert!(engine.wait_until_running(Duration::from_secs(5)));

        engine.pump_frame();
        assert_eq!(engine.frames(), 0);
        assert_eq!(engine.ignored_pumps(), 1);

        engine.set_render_target(RenderTarget::new(TargetHandle::new(1), 400, 480));
        engine.pump_frame();
        engine.pump_frame();
        assert_eq!(engine.frames(), 2);

        engine.pause();
        engine.pump_frame();
        assert_eq!(engine.frames(), 2);

        engine.finish();
        assert!(worker.join().unwrap().is_ok());
    }
}
