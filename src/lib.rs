//! # jnativetracer
//!
//! A JVMTI agent that prints every native method the JVM enters, optionally
//! followed by the Java stack of the calling thread. Tracing can be gated on a
//! boolean field of the application, so only the interesting window of a run
//! is recorded.
//!
//! ## Usage
//!
//! ```bash
//! cargo build --release
//! java -agentpath:./target/release/libjnativetracer.so=dumpstack=true MyApp
//! java -agentpath:./target/release/libjnativetracer.so=trigger=com/example/Flags::traceEnabled MyApp
//! ```
//!
//! Each traced call produces a record on stdout:
//!
//! ```text
//! jnativetracer: native method called: currentTimeMillis()J
//!
//! ```
//!
//! Diagnostics go to stderr; set `JNATIVETRACER_LOG=debug` for more of them.
//!
//! ## Options
//!
//! | Option | Effect |
//! |--------|--------|
//! | `dumpstack=true\|false` | dump the calling thread's stack after each record |
//! | `trigger=<class>::<field>` | trace only while the boolean field is `true` |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │         Agent_OnLoad / Agent_OnUnload / trampolines      │
//! │                 Agent, export_agent!                     │
//! ├─────────────────────────────────────────────────────────┤
//! │       agent::NativeTracer  +  agent::JvmHost (Host)      │
//! ├─────────────────────────────────────────────────────────┤
//! │   tracer::Tracer  ─  trigger::install  ─  gate::EventGate│
//! │              (generic over host::Host)                   │
//! ├─────────────────────────────────────────────────────────┤
//! │       env::Jvmti / env::JniEnv  over  sys::{jni,jvmti}   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | option string parsing |
//! | [`tracer`] | the context object and mode selection at init |
//! | [`trigger`] | resolving and watching the trigger field |
//! | [`gate`] | arming, disarming and record emission |
//! | [`host`] | what the tracer needs from the VM |
//! | [`agent`] | the JVMTI binding of all of the above |
//! | [`env`] | JVMTI and JNI wrappers |
//! | [`sys`] | raw function tables |

pub mod sys;
pub mod env;

// Implementation modules (use `env` module for the public API)
#[doc(hidden)]
pub mod jvmti_wrapper;
#[doc(hidden)]
pub mod jni_wrapper;

pub mod agent;
pub mod config;
pub mod error;
pub mod gate;
pub mod host;
pub mod logging;
pub mod prelude;
pub mod tracer;
pub mod trigger;

use std::os::raw::c_char;
use std::sync::OnceLock;

use crate::env::{JniEnv, Jvmti};
pub use crate::sys::jni;
use crate::sys::jvmti;

/// A JVMTI agent driven by the three events the tracer listens to.
///
/// Implement this trait and use [`export_agent!`] to create a loadable agent
/// library. Event methods default to no-ops.
///
/// # Thread Safety
///
/// JVMTI events fire on application threads, concurrently. The wrappers
/// handed to each event are only valid for the duration of that call.
pub trait Agent: Sync + Send {
    /// Called when the agent is loaded into the JVM.
    ///
    /// Return `JNI_OK` (0) on success, or `JNI_ERR` (-1) to abort the JVM.
    fn on_load(&self, vm: *mut jni::JavaVM, options: &str) -> jni::jint;

    /// Called when the agent is unloaded (JVM shutdown).
    fn on_unload(&self) {}

    /// Called once VM initialization is complete and JNI is fully usable.
    fn vm_init(&self, _jvmti: &Jvmti, _jni: &JniEnv, _thread: jni::jthread) {}

    /// Called when a watched field is about to be written.
    ///
    /// `signature_type` is the JNI type character of the field, which selects
    /// the active member of `new_value`.
    /// Requires `can_generate_field_modification_events`.
    #[allow(clippy::too_many_arguments)]
    fn field_modification(
        &self,
        _jvmti: &Jvmti,
        _jni: &JniEnv,
        _thread: jni::jthread,
        _field_klass: jni::jclass,
        _object: jni::jobject,
        _field: jni::jfieldID,
        _signature_type: c_char,
        _new_value: jni::jvalue,
    ) {
    }

    /// Called when a method is entered.
    ///
    /// **Warning**: This fires for EVERY method call while enabled.
    /// Requires `can_generate_method_entry_events`.
    fn method_entry(&self, _jvmti: &Jvmti, _jni: &JniEnv, _thread: jni::jthread, _method: jni::jmethodID) {}
}

// This holds the agent instance so the C entry points can find it.
pub static GLOBAL_AGENT: OnceLock<Box<dyn Agent>> = OnceLock::new();

/// Helper to initialize the global agent (called by the macro)
pub fn set_global_agent(agent: Box<dyn Agent>) -> Result<(), ()> {
    GLOBAL_AGENT.set(agent).map_err(|_| ())
}

unsafe extern "system" fn trampoline_vm_init(env: *mut jvmti::jvmtiEnv, jni: *mut jni::JNIEnv, thread: jni::jthread) {
    if let Some(agent) = GLOBAL_AGENT.get() {
        agent.vm_init(&Jvmti::from_raw(env), &JniEnv::from_raw(jni), thread);
    }
}

unsafe extern "system" fn trampoline_field_modification(
    env: *mut jvmti::jvmtiEnv,
    jni: *mut jni::JNIEnv,
    thread: jni::jthread,
    _method: jni::jmethodID,
    _location: jvmti::jlocation,
    field_klass: jni::jclass,
    object: jni::jobject,
    field: jni::jfieldID,
    signature_type: c_char,
    new_value: jni::jvalue,
) {
    if let Some(agent) = GLOBAL_AGENT.get() {
        agent.field_modification(
            &Jvmti::from_raw(env),
            &JniEnv::from_raw(jni),
            thread,
            field_klass,
            object,
            field,
            signature_type,
            new_value,
        );
    }
}

unsafe extern "system" fn trampoline_method_entry(
    env: *mut jvmti::jvmtiEnv,
    jni: *mut jni::JNIEnv,
    thread: jni::jthread,
    method: jni::jmethodID,
) {
    if let Some(agent) = GLOBAL_AGENT.get() {
        agent.method_entry(&Jvmti::from_raw(env), &JniEnv::from_raw(jni), thread, method);
    }
}

/// Returns a callback table routing `VMInit`, `FieldModification` and
/// `MethodEntry` to the global [`Agent`]. Every other slot is empty.
///
/// Registering the table does not enable anything; each event still has to
/// be switched on with `set_event_notification_mode`.
pub fn event_callbacks() -> jvmti::jvmtiEventCallbacks {
    let mut callbacks = jvmti::jvmtiEventCallbacks::default();

    callbacks.VMInit = Some(trampoline_vm_init);
    callbacks.FieldModification = Some(trampoline_field_modification);
    callbacks.MethodEntry = Some(trampoline_method_entry);

    callbacks
}

/// Exports an agent type as a loadable JVMTI agent library.
///
/// Generates the `Agent_OnLoad` and `Agent_OnUnload` entry points the JVM
/// looks up when loading a library through `-agentpath` or `-agentlib`. The
/// agent type must implement [`Agent`] and [`Default`].
///
/// - **`Agent_OnLoad`** creates the agent, registers it globally and calls
///   [`Agent::on_load`] with the option string (everything after `=`).
/// - **`Agent_OnUnload`** calls [`Agent::on_unload`].
///
/// ```rust,ignore
/// use jnativetracer::{export_agent, Agent, sys::jni};
///
/// #[derive(Default)]
/// struct MyAgent;
///
/// impl Agent for MyAgent {
///     fn on_load(&self, _vm: *mut jni::JavaVM, _options: &str) -> jni::jint {
///         jni::JNI_OK
///     }
/// }
///
/// export_agent!(MyAgent);
/// ```
#[macro_export]
macro_rules! export_agent {
    ($agent_type:ty) => {
        #[no_mangle]
        pub unsafe extern "system" fn Agent_OnLoad(
            vm: *mut $crate::sys::jni::JavaVM,
            options: *mut std::ffi::c_char,
            _reserved: *mut std::ffi::c_void,
        ) -> $crate::sys::jni::jint {
            // 1. Create and register the agent
            let agent = Box::new(<$agent_type>::default());
            if $crate::set_global_agent(agent).is_err() {
                return $crate::sys::jni::JNI_ERR;
            }

            // 2. Decode options
            let options_str = if options.is_null() {
                std::borrow::Cow::Borrowed("")
            } else {
                std::ffi::CStr::from_ptr(options).to_string_lossy()
            };

            // 3. Hand over to the agent
            match $crate::GLOBAL_AGENT.get() {
                Some(global_agent) => global_agent.on_load(vm, &options_str),
                None => $crate::sys::jni::JNI_ERR,
            }
        }

        #[no_mangle]
        pub unsafe extern "system" fn Agent_OnUnload(_vm: *mut $crate::sys::jni::JavaVM) {
            if let Some(agent) = $crate::GLOBAL_AGENT.get() {
                agent.on_unload();
            }
        }
    };
}

export_agent!(agent::NativeTracer);
