//! Lifecycle hook registry
//!
//! External components observe session transitions by registering hooks.
//! The session invokes them after its lock is released, so a hook may call
//! back into the session.

use parking_lot::Mutex;
use std::sync::Arc;

/// Transition reported to hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Worker launched, Stopped -> Running
    Started,
    /// Running -> Paused
    Paused,
    /// Paused -> Running
    Resumed,
    /// Any -> Stopped
    Stopped,
}

/// Which transitions a hook is interested in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    /// `Paused` and `Resumed`
    PauseResume,
    /// `Stopped`
    Shutdown,
    /// Every event
    All,
}

impl HookKind {
    fn wants(&self, event: LifecycleEvent) -> bool {
        match self {
            HookKind::PauseResume => {
                matches!(event, LifecycleEvent::Paused | LifecycleEvent::Resumed)
            }
            HookKind::Shutdown => event == LifecycleEvent::Stopped,
            HookKind::All => true,
        }
    }
}

/// Identifier returned on registration, used to remove the hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

type Hook = Arc<dyn Fn(LifecycleEvent) + Send + Sync>;

struct Registered {
    id: HookId,
    kind: HookKind,
    hook: Hook,
}

#[derive(Default)]
struct HookTable {
    next_id: u64,
    hooks: Vec<Registered>,
}

/// Observer registry for session transitions
#[derive(Default)]
pub struct LifecycleHooks {
    table: Mutex<HookTable>,
}

impl LifecycleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook for pause and resume transitions
    pub fn add_pause_resume_hook<F>(&self, hook: F) -> HookId
    where
        F: Fn(LifecycleEvent) + Send + Sync + 'static,
    {
        self.add(HookKind::PauseResume, Arc::new(hook))
    }

    /// Register a hook for the session stopping
    pub fn add_shutdown_hook<F>(&self, hook: F) -> HookId
    where
        F: Fn(LifecycleEvent) + Send + Sync + 'static,
    {
        self.add(HookKind::Shutdown, Arc::new(hook))
    }

    /// Register a hook for every transition
    pub fn add_observer<F>(&self, hook: F) -> HookId
    where
        F: Fn(LifecycleEvent) + Send + Sync + 'static,
    {
        self.add(HookKind::All, Arc::new(hook))
    }

    fn add(&self, kind: HookKind, hook: Hook) -> HookId {
        let mut table = self.table.lock();
        table.next_id += 1;
        let id = HookId(table.next_id);
        table.hooks.push(Registered { id, kind, hook });
        tracing::trace!("Registered {:?} hook {:?}", kind, id);
        id
    }

    /// Remove a hook. Returns `false` if it was not registered.
    pub fn remove_hook(&self, id: HookId) -> bool {
        let mut table = self.table.lock();
        let before = table.hooks.len();
        table.hooks.retain(|registered| registered.id != id);
        table.hooks.len() != before
    }

    pub fn len(&self) -> usize {
        self.table.lock().hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke the interested hooks for each event, in registration order
    pub fn notify_all(&self, events: &[LifecycleEvent]) {
        for &event in events {
            self.notify(event);
        }
    }

    pub fn notify(&self, event: LifecycleEvent) {
        // Snapshot so hooks can register or remove hooks re-entrantly
        let hooks: Vec<Hook> = self
            .table
            .lock()
            .hooks
            .iter()
            .filter(|registered| registered.kind.wants(event))
            .map(|registered| Arc::clone(&registered.hook))
            .collect();

        tracing::trace!("Notifying {} hooks of {:?}", hooks.len(), event);
        for hook in hooks {
            hook(event);
        }
    }
}
