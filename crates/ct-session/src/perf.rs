//! Performance overlay text
//!
//! Polls the engine's performance counters on a [`PeriodicTask`] and keeps
//! the formatted overlay line for the host to draw.

use crate::engine::{Engine, PerfStats};
use crate::scheduler::PeriodicTask;
use ct_core::config::PerfOverlayConfig;
use parking_lot::Mutex;
use std::fmt::Write;
use std::sync::Arc;

/// Separator between overlay sections
pub const DIVIDER: &str = "\u{00A0}\u{2502} ";

/// Format one overlay line.
///
/// Returns `None` until the engine reports frames, or when every section is
/// switched off.
pub fn format_stats(config: &PerfOverlayConfig, stats: &PerfStats) -> Option<String> {
    if stats.game_fps <= 0.0 {
        return None;
    }

    let mut line = String::new();
    if config.show_fps {
        let _ = write!(line, "FPS: {}", (stats.game_fps + 0.5) as u32);
    }
    if config.show_frame_time {
        if !line.is_empty() {
            line.push_str(DIVIDER);
        }
        let _ = write!(
            line,
            "Frame: {:.1} ms (GPU: {:.1} ms, Swap: {:.1} ms)",
            stats.frame_time * 1000.0,
            stats.time_gpu * 1000.0,
            stats.time_swap * 1000.0
        );
    }
    if config.show_speed {
        if !line.is_empty() {
            line.push_str(DIVIDER);
        }
        let _ = write!(line, "Speed: {}%", (stats.emulation_speed * 100.0 + 0.5) as u32);
    }

    (!line.is_empty()).then_some(line)
}

/// Periodically refreshed performance overlay
pub struct PerfOverlay {
    config: PerfOverlayConfig,
    engine: Arc<dyn Engine>,
    text: Arc<Mutex<Option<String>>>,
    task: Mutex<Option<PeriodicTask>>,
}

impl PerfOverlay {
    pub fn new(config: PerfOverlayConfig, engine: Arc<dyn Engine>) -> Self {
        Self {
            config,
            engine,
            text: Arc::new(Mutex::new(None)),
            task: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enable
    }

    /// Start refreshing. Returns `false` when the overlay is disabled or
    /// already running.
    pub fn start(&self) -> bool {
        if !self.config.enable {
            *self.text.lock() = None;
            return false;
        }

        let mut task = self.task.lock();
        if task.is_some() {
            return false;
        }

        self.refresh();

        let config = self.config.clone();
        let engine = Arc::clone(&self.engine);
        let text = Arc::clone(&self.text);
        let spawned = PeriodicTask::spawn("perf-overlay", self.config.interval(), move || {
            update(&config, engine.as_ref(), &text);
        });

        match spawned {
            Ok(spawned) => {
                *task = Some(spawned);
                true
            }
            Err(e) => {
                tracing::warn!("Could not start performance overlay: {}", e);
                false
            }
        }
    }

    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Poll the engine once
    pub fn refresh(&self) {
        update(&self.config, self.engine.as_ref(), &self.text);
    }

    /// Latest overlay line
    pub fn text(&self) -> Option<String> {
        self.text.lock().clone()
    }
}

impl Drop for PerfOverlay {
    fn drop(&mut self) {
        self.stop();
    }
}

fn update(config: &PerfOverlayConfig, engine: &dyn Engine, text: &Mutex<Option<String>>) {
    // Without frames the previous line stays up
    if let Some(line) = format_stats(config, &engine.perf_stats()) {
        tracing::trace!("Perf overlay: {}", line);
        *text.lock() = Some(line);
    }
}
