//! The event gate: turns watched-field writes into method-entry
//! subscriptions, and method entries into trace records.
//!
//! Records are serialized by one process-wide reentrant lock. A thread that
//! is already emitting a record (for instance because the stack dump it
//! requested ran another native method) is suppressed by a thread-local flag
//! instead of deadlocking on its own lock.

use std::cell::{Cell, RefCell};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, warn};

use crate::host::{Host, MethodDescriptor};

/// Prefix of every trace record.
pub const RECORD_PREFIX: &str = "jnativetracer: native method called: ";

thread_local! {
    static ALREADY_OWNED: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as emitting a record until dropped.
struct EmitGuard {
    _private: (),
}

impl EmitGuard {
    fn try_acquire() -> Option<Self> {
        ALREADY_OWNED.with(|owned| {
            if owned.get() {
                None
            } else {
                owned.set(true);
                Some(Self { _private: () })
            }
        })
    }
}

impl Drop for EmitGuard {
    fn drop(&mut self) {
        ALREADY_OWNED.with(|owned| owned.set(false));
    }
}

/// Whether method-entry events are currently subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Disarmed,
    Armed,
}

pub type Sink = Box<dyn Write + Send>;

pub struct EventGate {
    armed: AtomicBool,
    // Keeps the subscription call and `armed` in step across threads.
    toggle: Mutex<()>,
    dump_stack: bool,
    output: ReentrantMutex<RefCell<Sink>>,
}

impl EventGate {
    pub fn new(armed: bool, dump_stack: bool, output: Sink) -> Self {
        Self {
            armed: AtomicBool::new(armed),
            toggle: Mutex::new(()),
            dump_stack,
            output: ReentrantMutex::new(RefCell::new(output)),
        }
    }

    pub fn state(&self) -> GateState {
        if self.armed.load(Ordering::Acquire) {
            GateState::Armed
        } else {
            GateState::Disarmed
        }
    }

    /// Forces the gate open and subscribes to method entries.
    pub(crate) fn arm<H: Host>(&self, host: &H) {
        self.on_field_write(host, true);
    }

    /// Applies a write of `value` to the watched field.
    ///
    /// The subscription call is made on every write, even if the value did
    /// not change. The recorded state only follows once the host has accepted
    /// the new subscription.
    pub fn on_field_write<H: Host>(&self, host: &H, value: bool) {
        let _toggle = self.toggle.lock();
        match host.set_method_entry_events(value) {
            Ok(()) => self.armed.store(value, Ordering::Release),
            Err(err) => warn!(state = ?self.state(), "{err}; gate left unchanged"),
        }
    }

    /// Emits a record for `method` if it is native and this thread is not
    /// already emitting one.
    pub fn on_method_entry<H: Host>(&self, host: &H, method: H::Method) {
        match host.is_native(method) {
            Ok(true) => {}
            Ok(false) => return,
            Err(err) => {
                debug!("skipping method entry: {err}");
                return;
            }
        }

        let output = self.output.lock();
        let Some(_owned) = EmitGuard::try_acquire() else {
            return;
        };

        let names = match host.method_name(method) {
            Ok(names) => names,
            Err(err) => {
                debug!("skipping method entry: {err}");
                return;
            }
        };

        self.write(&output, format_args!("{RECORD_PREFIX}{}{}\n", names.name(), names.signature()));
        if self.dump_stack {
            // No RefCell borrow may be live here: the dump can re-enter.
            host.dump_stack();
        }
        self.write(&output, format_args!("\n"));
    }

    fn write(&self, output: &RefCell<Sink>, args: std::fmt::Arguments<'_>) {
        let mut out = output.borrow_mut();
        let written = out.write_fmt(args);
        if let Err(err) = written.and_then(|()| out.flush()) {
            debug!("could not write trace record: {err}");
        }
    }
}

impl std::fmt::Debug for EventGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventGate")
            .field("state", &self.state())
            .field("dump_stack", &self.dump_stack)
            .finish_non_exhaustive()
    }
}
