//! Benchmarks for registering and draining exit callbacks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use loop_atexit::{Callback, EventLoop, LoopRegistry};
use std::sync::Arc;

fn registration_benchmark(c: &mut Criterion) {
    c.bench_function("register_and_close_100", |b| {
        b.iter(|| {
            let registry = Arc::new(LoopRegistry::new());
            let mut event_loop = EventLoop::new().expect("event loop");
            let handle = event_loop.handle();
            for i in 0..100_u32 {
                registry
                    .register_on(&handle, Callback::sync(move || {
                        black_box(i);
                    }))
                    .expect("register");
            }
            black_box(event_loop.close())
        });
    });

    c.bench_function("register_async_and_close_100", |b| {
        b.iter(|| {
            let registry = Arc::new(LoopRegistry::new());
            let mut event_loop = EventLoop::new().expect("event loop");
            let handle = event_loop.handle();
            for i in 0..100_u32 {
                registry
                    .register_on(&handle, Callback::future(move || async move {
                        black_box(i);
                    }))
                    .expect("register");
            }
            black_box(event_loop.close())
        });
    });
}

criterion_group!(benches, registration_benchmark);
criterion_main!(benches);
