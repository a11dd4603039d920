//! Render target registry
//!
//! Holds the most recently reported render target and tracks whether the
//! engine currently borrows it. Every attachment handed to the engine is
//! closed by exactly one `clear_render_target` before the handle goes away.

use crate::engine::{Engine, RenderTarget, TargetHandle};

/// Current render target and the engine's view of it
#[derive(Debug, Default)]
pub struct RenderTargetRegistry {
    /// Most recently reported valid target
    current: Option<RenderTarget>,
    /// Target the engine was last handed, if not yet cleared
    attached: Option<RenderTarget>,
}

impl RenderTargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly created target. Dimensions are kept when the handle is
    /// unchanged and reset otherwise. Returns `true` when the handle is new.
    pub fn record(&mut self, handle: TargetHandle) -> bool {
        match self.current {
            Some(target) if target.handle == handle => false,
            _ => {
                self.current = Some(RenderTarget::new(handle, 0, 0));
                true
            }
        }
    }

    /// Record new dimensions (or a new handle) for the current target
    pub fn update(&mut self, handle: TargetHandle, width: u32, height: u32) {
        self.current = Some(RenderTarget::new(handle, width, height));
    }

    /// Forget the current target. The engine attachment, if any, is kept so
    /// the caller can still detach it.
    pub fn take(&mut self) -> Option<RenderTarget> {
        self.current.take()
    }

    pub fn current(&self) -> Option<RenderTarget> {
        self.current
    }

    pub fn is_valid(&self) -> bool {
        self.current.is_some()
    }

    pub fn attached(&self) -> Option<RenderTarget> {
        self.attached
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    /// Hand the current target to the engine.
    ///
    /// A different previously attached handle is cleared first. Re-sending
    /// the attached handle only forwards new dimensions and is skipped when
    /// nothing changed. Returns `false` without a valid target.
    pub fn attach(&mut self, engine: &dyn Engine) -> bool {
        let Some(target) = self.current else {
            return false;
        };

        match self.attached {
            Some(attached) if attached == target => return true,
            Some(attached) if attached.handle != target.handle => {
                tracing::debug!("Replacing {} with {}", attached.handle, target.handle);
                engine.clear_render_target();
            }
            _ => {}
        }

        tracing::debug!(
            "Render target {} attached ({}x{})",
            target.handle,
            target.width,
            target.height
        );
        engine.set_render_target(target);
        self.attached = Some(target);
        true
    }

    /// Release the engine's attachment. Returns `false` when nothing was attached.
    pub fn detach(&mut self, engine: &dyn Engine) -> bool {
        match self.attached.take() {
            Some(target) => {
                tracing::debug!("Render target {} detached", target.handle);
                engine.clear_render_target();
                true
            }
            None => false,
        }
    }
}
