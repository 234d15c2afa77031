//! End-to-end tests of registration and loop close through the public API.

use crate::prelude::*;
use crate::testing::CallRecorder;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("loop_atexit=debug")
        .with_test_writer()
        .try_init();
}

#[test]
fn test_sync_and_async_scenario() {
    init_tracing();
    let counter = Arc::new(AtomicUsize::new(0));
    let markers = CallRecorder::new();
    let mut event_loop = EventLoop::new().unwrap();

    event_loop
        .run_until_complete({
            let counter = Arc::clone(&counter);
            let markers = markers.clone();
            async move {
                register(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
                register_async(markers.async_marker("g")).unwrap();
            }
        })
        .unwrap();

    event_loop.close();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(markers.calls(), vec!["g"]);

    event_loop.close();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(markers.calls(), vec!["g"]);
}

#[test]
fn test_registration_order_is_preserved() {
    init_tracing();
    let recorder = CallRecorder::new();
    let mut event_loop = EventLoop::new().unwrap();

    event_loop
        .run_until_complete({
            let recorder = recorder.clone();
            async move {
                for i in 0..10 {
                    if i % 2 == 0 {
                        register(recorder.sync_marker(i.to_string())).unwrap();
                    } else {
                        register_async(recorder.async_marker(i.to_string())).unwrap();
                    }
                }
            }
        })
        .unwrap();

    let report = event_loop.close();
    let expected: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    assert_eq!(recorder.calls(), expected);
    assert_eq!(report.completed, 10);
}

#[test]
fn test_duplicate_registration_runs_twice() {
    let counter = Arc::new(AtomicUsize::new(0));
    let bump = {
        let counter = Arc::clone(&counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    };

    crate::run(async move {
        register(bump.clone()).unwrap();
        register(bump).unwrap();
    })
    .unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_register_without_loop_creates_nothing() {
    let result = register(|| ());
    assert!(matches!(result, Err(AtExitError::NoRunningLoop)));
    assert!(matches!(
        register_async(|| async {}),
        Err(AtExitError::NoRunningLoop)
    ));

    let local = Arc::new(LoopRegistry::new());
    assert!(local.register(Callback::sync(|| ())).is_err());
    assert!(local.is_empty());
}

#[test]
fn test_failing_sync_callback_does_not_block_async() {
    init_tracing();
    let recorder = CallRecorder::new();
    let mut event_loop = EventLoop::new().unwrap();

    event_loop
        .run_until_complete({
            let recorder = recorder.clone();
            async move {
                register(|| -> anyhow::Result<()> {
                    anyhow::bail!("Failure shouldn't prevent other callbacks")
                })
                .unwrap();
                register::<_, ()>(|| panic!("panicking cleanup")).unwrap();
                register_async(recorder.async_marker("async ran")).unwrap();
            }
        })
        .unwrap();

    let report = event_loop.close();
    assert_eq!(recorder.calls(), vec!["async ran"]);
    assert_eq!(report.completed, 1);
    assert_eq!(report.failures.len(), 2);
    assert!(event_loop.is_closed());
}

#[test]
fn test_independent_loops_drain_independently() {
    let recorder_a = CallRecorder::new();
    let recorder_b = CallRecorder::new();
    let mut loop_a = EventLoop::new().unwrap();
    let mut loop_b = EventLoop::new().unwrap();

    loop_a
        .run_until_complete({
            let recorder = recorder_a.clone();
            async move { register(recorder.sync_marker("a")).unwrap() }
        })
        .unwrap();
    loop_b
        .run_until_complete({
            let recorder = recorder_b.clone();
            async move { register(recorder.sync_marker("b")).unwrap() }
        })
        .unwrap();

    loop_a.close();
    assert_eq!(recorder_a.calls(), vec!["a"]);
    assert!(recorder_b.is_empty());
    assert_eq!(LoopRegistry::global().pending_count(loop_b.id()), 1);

    loop_b.close();
    assert_eq!(recorder_b.calls(), vec!["b"]);
    assert_eq!(recorder_a.calls(), vec!["a"]);
}

#[test]
fn test_loops_on_separate_threads() {
    let threads: Vec<_> = (0..4)
        .map(|n| {
            std::thread::spawn(move || {
                let recorder = CallRecorder::new();
                let mut event_loop =
                    EventLoop::with_config(LoopConfig::new().with_name(format!("worker-{n}")))
                        .unwrap();
                event_loop
                    .run_until_complete({
                        let recorder = recorder.clone();
                        async move {
                            for i in 0..25 {
                                register_async(recorder.async_marker(format!("{n}:{i}"))).unwrap();
                            }
                        }
                    })
                    .unwrap();
                let report = event_loop.close();
                (n, report.completed, recorder.calls())
            })
        })
        .collect();

    for thread in threads {
        let (n, completed, calls) = thread.join().unwrap();
        assert_eq!(completed, 25);
        let expected: Vec<String> = (0..25).map(|i| format!("{n}:{i}")).collect();
        assert_eq!(calls, expected);
    }
}

#[test]
fn test_unregister_on_current_loop() {
    let recorder = CallRecorder::new();

    crate::run({
        let recorder = recorder.clone();
        async move {
            let first = register(recorder.sync_marker("first")).unwrap();
            register(recorder.sync_marker("second")).unwrap();
            assert!(unregister(first).unwrap());
            assert!(!unregister(first).unwrap());
        }
    })
    .unwrap();

    assert_eq!(recorder.calls(), vec!["second"]);
}

#[test]
fn test_unregister_everything_leaves_no_entry() {
    let recorder = CallRecorder::new();
    let mut event_loop = EventLoop::new().unwrap();

    event_loop
        .run_until_complete({
            let recorder = recorder.clone();
            async move {
                let id = register(recorder.sync_marker("never")).unwrap();
                unregister(id).unwrap();
            }
        })
        .unwrap();

    assert!(!LoopRegistry::global().contains(event_loop.id()));
    let report = event_loop.close();
    assert_eq!(report.invoked(), 0);
    assert!(recorder.is_empty());
}

#[test]
fn test_registration_from_spawned_task() {
    let recorder = CallRecorder::new();

    crate::run({
        let recorder = recorder.clone();
        async move {
            tokio::spawn(async move {
                register(recorder.sync_marker("from task")).unwrap();
            })
            .await
            .unwrap();
        }
    })
    .unwrap();

    assert_eq!(recorder.calls(), vec!["from task"]);
}

#[test]
fn test_injected_registry_and_global_both_drain() {
    let local = Arc::new(LoopRegistry::new());
    let recorder = CallRecorder::new();
    let mut event_loop = EventLoop::new().unwrap();

    event_loop
        .run_until_complete({
            let local = Arc::clone(&local);
            let recorder = recorder.clone();
            async move {
                local
                    .register(Callback::sync(recorder.sync_marker("1-local")))
                    .unwrap();
                register_async(recorder.async_marker("2-global")).unwrap();
                local
                    .register(Callback::sync(recorder.sync_marker("3-local")))
                    .unwrap();
            }
        })
        .unwrap();

    let report = event_loop.close();
    assert_eq!(report.completed, 3);
    assert_eq!(recorder.calls(), vec!["1-local", "2-global", "3-local"]);
    assert!(local.is_empty());
    assert!(!LoopRegistry::global().contains(event_loop.id()));
}
