//! Benchmarks for session transitions and hook dispatch

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ct_core::Config;
use ct_session::engine::Engine;
use ct_session::render_target::RenderTargetRegistry;
use ct_session::{LifecycleEvent, LifecycleHooks, NullEngine, Session, TargetHandle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn bench_pause_resume(c: &mut Criterion) {
    let engine = Arc::new(NullEngine::new());
    let session = Session::new(&Config::default(), engine.clone(), PathBuf::from("bench.3ds"));
    session.target_changed(TargetHandle::new(1), 400, 480);
    session.run(false);
    engine.wait_until_running(Duration::from_secs(5));

    c.bench_function("pause_resume", |b| {
        b.iter(|| {
            session.pause();
            session.resume();
            // Keep the call log from growing without bound
            engine.clear_calls();
        });
    });

    c.bench_function("state_query", |b| b.iter(|| black_box(session.state())));

    session.teardown();
}

fn bench_target_churn(c: &mut Criterion) {
    let engine = NullEngine::new();
    let mut registry = RenderTargetRegistry::new();
    let mut raw = 0u64;

    c.bench_function("target_attach_detach", |b| {
        b.iter(|| {
            raw += 1;
            registry.update(TargetHandle::new(raw), 400, 480);
            registry.attach(&engine as &dyn Engine);
            registry.detach(&engine as &dyn Engine);
            engine.clear_calls();
        });
    });
}

fn bench_hook_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("hook_dispatch");

    for count in [1usize, 8, 64].iter() {
        let hooks = LifecycleHooks::new();
        for _ in 0..*count {
            hooks.add_observer(|event| {
                black_box(event);
            });
        }

        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| hooks.notify(black_box(LifecycleEvent::Paused)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pause_resume, bench_target_churn, bench_hook_dispatch);
criterion_main!(benches);
