use super::*;
use crate::dispatch::pump::MainPump;
use crate::dispatch::queue::inline_trampoline;
use std::sync::Mutex;
use std::time::Duration;

#[test]
fn zero_background_threads_is_rejected() {
    let err = DispatchContext::builder(inline_trampoline())
        .opts(DispatchOpts {
            background_threads: Some(0),
            ..DispatchOpts::default()
        })
        .build()
        .unwrap_err();
    assert!(matches!(err, DispatchError::InvalidOption(_)));
}

#[test]
fn background_work_runs_off_the_main_thread() {
    let ctx = DispatchContext::builder(inline_trampoline())
        .opts(DispatchOpts {
            background_threads: Some(2),
            ..DispatchOpts::default()
        })
        .build()
        .unwrap();
    let main = thread::current().id();
    let (worker, on_pool) = ctx
        .background_queue()
        .submit_sync(|| {
            (
                thread::current().id(),
                rayon::current_thread_index().is_some(),
            )
        })
        .unwrap();
    assert_ne!(worker, main);
    assert!(on_pool);
    assert_eq!(ctx.background_queue().label(), "background");
}

#[test]
fn serial_queues_get_numbered_names() {
    let ctx = DispatchContext::builder(inline_trampoline())
        .opts(DispatchOpts {
            serial_thread_name: "video".to_string(),
            background_threads: Some(1),
        })
        .build()
        .unwrap();
    let a = ctx.create_serial_queue().unwrap();
    let b = ctx.create_serial_queue().unwrap();
    assert_eq!(a.name(), "video-0");
    assert_eq!(b.name(), "video-1");
}

#[test]
fn main_sync_from_the_main_thread_runs_inline() {
    let pump = MainPump::new();
    let ctx = DispatchContext::new(pump.trampoline()).unwrap();
    assert!(ctx.main_queue().is_current());
    assert_eq!(ctx.main_queue().submit_sync(|| 5).unwrap(), 5);
    assert_eq!(pump.pending(), 0);
}

#[test]
fn background_failures_surface_on_the_main_thread() {
    let pump = MainPump::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let ctx = DispatchContext::builder(pump.trampoline())
        .on_failure(move |f| {
            sink.lock()
                .unwrap()
                .push((thread::current().id(), f.to_string()))
        })
        .build()
        .unwrap();

    ctx.background_queue().submit_async(|| panic!("background boom"));
    assert!(pump.run_until(Duration::from_secs(5), || !seen.lock().unwrap().is_empty()));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, thread::current().id());
    assert!(seen[0].1.contains("background boom"));
}
