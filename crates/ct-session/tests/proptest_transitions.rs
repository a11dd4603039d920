//! Property-based tests for session transitions.
//!
//! For any sequence of pause / resume / stop requests applied to a running
//! session:
//!
//! 1. The state after every prefix matches the last transition that was not
//!    a no-op.
//! 2. The engine sees exactly one `stop` per entry into Stopped.
//! 3. Every render target attachment is cleared exactly once.

use ct_core::Config;
use ct_session::engine::null::EngineCall;
use ct_session::{Engine, NullEngine, Session, SessionState, TargetHandle};
use proptest::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
enum Request {
    Pause,
    Resume,
    Toggle,
    Stop,
}

fn request() -> impl Strategy<Value = Request> {
    prop_oneof![
        3 => Just(Request::Pause),
        3 => Just(Request::Resume),
        2 => Just(Request::Toggle),
        1 => Just(Request::Stop),
    ]
}

/// Expected state after `request`, and whether it left a non-Stopped state
/// for Stopped
fn model(state: SessionState, request: Request) -> (SessionState, bool) {
    match (request, state) {
        (Request::Pause, SessionState::Running) => (SessionState::Paused, false),
        (Request::Resume, SessionState::Paused) => (SessionState::Running, false),
        (Request::Toggle, SessionState::Running) => (SessionState::Paused, false),
        (Request::Toggle, SessionState::Paused) => (SessionState::Running, false),
        (Request::Stop, SessionState::Running | SessionState::Paused) => {
            (SessionState::Stopped, true)
        }
        (_, state) => (state, false),
    }
}

fn apply(session: &Session, request: Request) {
    match request {
        Request::Pause => session.pause(),
        Request::Resume => session.resume(),
        Request::Toggle => session.toggle_pause(),
        Request::Stop => session.stop(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn state_follows_last_effective_transition(requests in prop::collection::vec(request(), 1..40)) {
        let engine = Arc::new(NullEngine::new());
        let session = Session::new(
            &Config::default(),
            engine.clone(),
            PathBuf::from("/games/prop.3ds"),
        );
        session.target_created(TargetHandle::new(1));
        session.run(false);
        prop_assert!(engine.wait_until_running(Duration::from_secs(5)));

        let mut expected = SessionState::Running;
        let mut stops = 0;
        for request in requests {
            apply(&session, request);
            let (next, stopped) = model(expected, request);
            expected = next;
            stops += usize::from(stopped);
            prop_assert_eq!(session.state(), expected);
        }

        prop_assert_eq!(engine.count(|c| *c == EngineCall::Stop), stops);

        let sets = engine.count(|c| matches!(c, EngineCall::SetRenderTarget(_)));
        let clears = engine.count(|c| *c == EngineCall::ClearRenderTarget);
        let attached = usize::from(session.attached_target().is_some());
        prop_assert_eq!(sets, clears + attached);

        session.teardown();
        prop_assert!(!engine.is_running());
    }
}
