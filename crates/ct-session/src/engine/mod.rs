//! Emulation engine capability
//!
//! The engine is reached through a foreign-function boundary in production
//! builds; the controller only ever sees it through the [`Engine`] trait.

pub mod null;

use ct_core::EngineError;
use std::fmt;
use std::path::Path;

/// Opaque reference to a hardware-backed surface the engine draws into.
///
/// Only valid between its creation and destruction events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetHandle(u64);

impl TargetHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TargetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{:x}", self.0)
    }
}

/// A render target together with its engine-facing dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    pub handle: TargetHandle,
    pub width: u32,
    pub height: u32,
}

impl RenderTarget {
    pub fn new(handle: TargetHandle, width: u32, height: u32) -> Self {
        Self {
            handle,
            width,
            height,
        }
    }
}

/// Performance counters reported by the engine
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerfStats {
    /// Host presentation rate
    pub system_fps: f64,
    /// Guest frame rate
    pub game_fps: f64,
    /// Emulation speed, 1.0 = full speed
    pub emulation_speed: f64,
    /// Average frame time in seconds
    pub frame_time: f64,
    /// Time spent in the GPU per frame, seconds
    pub time_gpu: f64,
    /// Time spent presenting per frame, seconds
    pub time_swap: f64,
}

/// Operations the controller needs from the emulation engine.
///
/// Every method except [`Engine::start`] must return promptly; `start` runs
/// the execution loop and only returns once the engine has stopped.
pub trait Engine: Send + Sync + 'static {
    /// Run `content` until stopped. Blocks the calling thread.
    fn start(&self, content: &Path) -> Result<(), EngineError>;

    /// Ask a running engine to halt; `start` returns shortly after.
    /// Ignored while no execution loop is alive.
    fn stop(&self);

    /// Suspend emulation. The render target has already been released.
    fn pause(&self);

    /// Resume emulation after [`Engine::pause`].
    fn resume(&self);

    /// Hand the engine a borrowed render target.
    fn set_render_target(&self, target: RenderTarget);

    /// Release the render target. The engine must not touch it afterwards.
    fn clear_render_target(&self);

    /// Whether an execution loop is currently alive. Set once `start` has
    /// entered its loop and cleared just before it returns.
    fn is_running(&self) -> bool;

    /// Do one frame of work. Ignored without an active render target.
    fn pump_frame(&self);

    /// Current performance counters.
    fn perf_stats(&self) -> PerfStats {
        PerfStats::default()
    }
}
