use super::*;
use std::sync::Mutex;

struct RunInline;

impl Executor for RunInline {
    fn invoke(&self, thunk: Thunk) {
        thunk();
    }

    fn is_current(&self) -> bool {
        false
    }

    fn label(&self) -> &'static str {
        "inline"
    }
}

struct DropEverything;

impl Executor for DropEverything {
    fn invoke(&self, _thunk: Thunk) {}

    fn is_current(&self) -> bool {
        false
    }

    fn label(&self) -> &'static str {
        "closed"
    }
}

fn recording_queue(exec: Arc<dyn Executor>) -> (Queue, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&seen);
    let route = FailureRoute {
        main: inline_trampoline(),
        handler: Arc::new(move |f: WorkFailure| sink.lock().unwrap().push(f.to_string())),
    };
    (Queue::new(exec, route), seen)
}

#[test]
fn submit_sync_returns_the_value() {
    let (q, seen) = recording_queue(Arc::new(RunInline));
    assert_eq!(q.submit_sync(|| 6 * 7).unwrap(), 42);
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn async_panic_is_routed_to_the_failure_handler_once() {
    let (q, seen) = recording_queue(Arc::new(RunInline));
    q.submit_async(|| panic!("decode exploded"));
    q.submit_async(|| {});
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].contains("decode exploded"));
}

#[test]
fn async_error_takes_the_same_path_as_a_panic() {
    let (q, seen) = recording_queue(Arc::new(RunInline));
    q.try_submit_async(|| anyhow::bail!("bad stream"));
    q.try_submit_async(|| Ok(()));
    let seen = seen.lock().unwrap();
    assert_eq!(seen.as_slice(), ["work failed: bad stream"]);
}

#[test]
fn sync_panic_goes_to_the_caller_not_main() {
    let (q, seen) = recording_queue(Arc::new(RunInline));
    let res: Result<(), WorkFailure> = q.submit_sync(|| panic!("nope"));
    assert!(res.unwrap_err().is_panic());
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn sync_on_a_closed_executor_reports_abandoned() {
    let (q, _) = recording_queue(Arc::new(DropEverything));
    let err = q.submit_sync(|| 1).unwrap_err();
    assert!(matches!(err, WorkFailure::Abandoned { queue: "closed" }));
}
