mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use common::{record, tracer, MockHost};
use jnativetracer::gate::GateState;
use jnativetracer::host::{FieldKind, Host};

const CURRENT_TIME: u32 = 1;
const TO_STRING: u32 = 2;
const READ0: u32 = 3;

fn jdk_host() -> MockHost {
    MockHost::new()
        .with_field("com/example/Flags", "traceEnabled", FieldKind::Static)
        .with_method(CURRENT_TIME, "currentTimeMillis", "()J", true)
        .with_method(TO_STRING, "toString", "()Ljava/lang/String;", false)
        .with_method(READ0, "read0", "()I", true)
}

#[test]
fn always_on_traces_native_methods() {
    let (tracer, out) = tracer("");
    let host = jdk_host();
    tracer.on_init(&host);

    host.enter(&tracer, CURRENT_TIME);
    host.enter(&tracer, READ0);

    assert_eq!(out.contents(), record("currentTimeMillis", "()J") + &record("read0", "()I"));
    assert_eq!(tracer.gate_state(), GateState::Armed);
}

#[test]
fn non_native_methods_are_ignored() {
    let (tracer, out) = tracer("");
    let host = jdk_host();
    tracer.on_init(&host);

    host.enter(&tracer, TO_STRING);

    assert_eq!(out.contents(), "");
    assert_eq!(host.names_allocated.load(Ordering::SeqCst), 0);
}

#[test]
fn field_writes_arm_and_disarm() {
    let (tracer, out) = tracer("trigger=com/example/Flags::traceEnabled");
    let host = jdk_host();
    tracer.on_init(&host);
    assert_eq!(tracer.gate_state(), GateState::Disarmed);

    host.enter(&tracer, CURRENT_TIME);
    assert_eq!(out.contents(), "");

    tracer.on_field_write(&host, true);
    assert_eq!(tracer.gate_state(), GateState::Armed);
    host.enter(&tracer, CURRENT_TIME);
    assert_eq!(out.contents(), record("currentTimeMillis", "()J"));

    tracer.on_field_write(&host, false);
    assert_eq!(tracer.gate_state(), GateState::Disarmed);
    host.enter(&tracer, READ0);
    assert_eq!(out.contents(), record("currentTimeMillis", "()J"));

    assert_eq!(*host.entry_calls.lock(), vec![false, true, false]);
}

#[test]
fn repeated_writes_are_idempotent() {
    let (tracer, out) = tracer("trigger=com/example/Flags::traceEnabled");
    let host = jdk_host();
    tracer.on_init(&host);

    tracer.on_field_write(&host, true);
    tracer.on_field_write(&host, true);
    host.enter(&tracer, CURRENT_TIME);

    assert_eq!(tracer.gate_state(), GateState::Armed);
    assert_eq!(out.contents(), record("currentTimeMillis", "()J"));
    // The subscription call is repeated rather than deduplicated.
    assert_eq!(*host.entry_calls.lock(), vec![false, true, true]);
}

#[test]
fn refused_subscription_leaves_gate_unchanged() {
    let (tracer, out) = tracer("trigger=com/example/Flags::traceEnabled");
    let host = jdk_host();
    tracer.on_init(&host);

    host.fail_entry_events(true);
    tracer.on_field_write(&host, true);
    assert_eq!(tracer.gate_state(), GateState::Disarmed);
    assert!(!host.entry_enabled());

    host.fail_entry_events(false);
    tracer.on_field_write(&host, true);
    assert_eq!(tracer.gate_state(), GateState::Armed);

    host.fail_entry_events(true);
    tracer.on_field_write(&host, false);
    assert_eq!(tracer.gate_state(), GateState::Armed);
    assert!(host.entry_enabled());

    host.enter(&tracer, CURRENT_TIME);
    assert_eq!(out.contents(), record("currentTimeMillis", "()J"));
    assert_eq!(*host.entry_calls.lock(), vec![false, true]);
}

#[test]
fn armed_gate_traces_other_threads() {
    let (tracer, out) = tracer("trigger=com/example/Flags::traceEnabled");
    let host = jdk_host();
    tracer.on_init(&host);
    tracer.on_field_write(&host, true);

    let worker = {
        let tracer = Arc::clone(&tracer);
        thread::spawn(move || {
            // Subscriptions are VM-wide; this thread's host sees them too.
            let host = jdk_host();
            host.set_method_entry_events(true).unwrap();
            host.enter(&tracer, READ0);
        })
    };
    worker.join().unwrap();

    assert_eq!(out.contents(), record("read0", "()I"));
}

#[test]
fn dumps_stack_between_record_and_separator() {
    let (tracer, out) = tracer("dumpstack=true");
    let host = jdk_host();
    tracer.on_init(&host);

    let seen = Arc::new(Mutex::new(String::new()));
    {
        let seen = Arc::clone(&seen);
        let out = out.clone();
        host.on_dump(move |_| *seen.lock() = out.contents());
    }
    host.enter(&tracer, CURRENT_TIME);

    assert_eq!(host.dumps.load(Ordering::SeqCst), 1);
    assert_eq!(*seen.lock(), "jnativetracer: native method called: currentTimeMillis()J\n");
    assert_eq!(out.contents(), record("currentTimeMillis", "()J"));
}

#[test]
fn no_stack_dump_unless_requested() {
    let (tracer, _out) = tracer("dumpstack=false");
    let host = jdk_host();
    tracer.on_init(&host);

    host.enter(&tracer, CURRENT_TIME);

    assert_eq!(host.dumps.load(Ordering::SeqCst), 0);
}

#[test]
fn native_call_inside_stack_dump_is_suppressed() {
    let (tracer, out) = tracer("dumpstack=true");
    let host = jdk_host();
    tracer.on_init(&host);

    {
        let tracer = Arc::clone(&tracer);
        host.on_dump(move |host| host.enter(&tracer, READ0));
    }
    host.enter(&tracer, CURRENT_TIME);

    assert_eq!(out.contents(), record("currentTimeMillis", "()J"));
    assert_eq!(host.dumps.load(Ordering::SeqCst), 1);

    // The flag is cleared once the record is done.
    host.enter(&tracer, READ0);
    assert_eq!(
        out.contents(),
        record("currentTimeMillis", "()J") + &record("read0", "()I")
    );
}

#[test]
fn concurrent_record_waits_and_is_emitted_in_full() {
    let (tracer, out) = tracer("dumpstack=true");
    let host = jdk_host();
    tracer.on_init(&host);

    let worker = Arc::new(Mutex::new(None));
    {
        let tracer = Arc::clone(&tracer);
        let worker = Arc::clone(&worker);
        host.on_dump(move |_| {
            let handle = thread::spawn(move || {
                let host = jdk_host();
                tracer.on_method_entry(&host, READ0);
            });
            // Give the worker time to block on the record lock.
            thread::sleep(Duration::from_millis(50));
            *worker.lock() = Some(handle);
        });
    }
    host.enter(&tracer, CURRENT_TIME);

    let handle = worker.lock().take().expect("worker spawned");
    handle.join().unwrap();

    assert_eq!(
        out.contents(),
        record("currentTimeMillis", "()J") + &record("read0", "()I")
    );
}

#[test]
fn name_buffers_are_released() {
    let (tracer, _out) = tracer("dumpstack=true");
    let host = jdk_host();
    tracer.on_init(&host);
    {
        let tracer = Arc::clone(&tracer);
        host.on_dump(move |host| host.enter(&tracer, READ0));
    }

    for _ in 0..3 {
        host.enter(&tracer, CURRENT_TIME);
    }

    let allocated = host.names_allocated.load(Ordering::SeqCst);
    assert_eq!(allocated, 3);
    assert_eq!(host.names_released.load(Ordering::SeqCst), allocated);
}

#[test]
fn introspection_failures_skip_the_record() {
    let (tracer, out) = tracer("");
    let host = jdk_host().with_unnamed_native(9);
    tracer.on_init(&host);

    // Unknown to the host altogether.
    host.enter(&tracer, 42);
    // Native, but the name lookup fails.
    host.enter(&tracer, 9);

    assert_eq!(out.contents(), "");

    // The failure left the thread free to trace.
    host.enter(&tracer, CURRENT_TIME);
    assert_eq!(out.contents(), record("currentTimeMillis", "()J"));
}
