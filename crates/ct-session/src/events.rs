//! Host events
//!
//! Everything the host's windowing layer can tell a session, delivered
//! through [`crate::Session::dispatch`].

use crate::engine::TargetHandle;

/// A lifecycle or render-target event raised by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// A render target was created
    TargetAvailable(TargetHandle),
    /// A render target changed size, or replaced the previous one
    TargetResized {
        handle: TargetHandle,
        width: u32,
        height: u32,
    },
    /// The render target was destroyed
    TargetLost,
    /// Host went to the background
    HostPause,
    /// Host came to the foreground; `recreated` when the host view was
    /// rebuilt (configuration change) while the session survived
    HostResume { recreated: bool },
    /// Hosting view permanently dismissed
    HostDestroy,
}

impl HostEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::TargetAvailable(_) => "TargetAvailable",
            HostEvent::TargetResized { .. } => "TargetResized",
            HostEvent::TargetLost => "TargetLost",
            HostEvent::HostPause => "HostPause",
            HostEvent::HostResume { .. } => "HostResume",
            HostEvent::HostDestroy => "HostDestroy",
        }
    }
}
