//! Emulation session lifecycle controller for the citrine front-end
//!
//! Decides, from racing host signals, when the engine's worker thread is
//! started, resumed, paused or torn down, and whether the engine may use
//! the host's render target.

pub mod content;
pub mod engine;
pub mod events;
pub mod hooks;
pub mod launcher;
pub mod menu;
pub mod perf;
pub mod playtime;
pub mod render_target;
pub mod scheduler;
pub mod session;
pub mod state;

pub use content::ContentResolver;
pub use engine::null::NullEngine;
pub use engine::{Engine, PerfStats, RenderTarget, TargetHandle};
pub use events::HostEvent;
pub use hooks::{HookId, LifecycleEvent, LifecycleHooks};
pub use menu::{EmulationMenu, MenuAction, MenuOutcome};
pub use perf::PerfOverlay;
pub use playtime::PlayTimeTracker;
pub use scheduler::{CancellationToken, FrameScheduler, PeriodicTask};
pub use session::Session;
pub use state::SessionState;
