//! The JVMTI binding: [`NativeTracer`] is the agent exported from the
//! library, and [`JvmHost`] adapts one callback's JVMTI and JNI environments
//! to the [`Host`] the tracer is written against.

use std::borrow::Cow;
use std::os::raw::c_char;
use std::ptr;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::{debug, error};

use crate::config::TracerConfig;
use crate::env::{JniEnv, Jvmti, MethodName};
use crate::error::{HostError, LoadError};
use crate::host::{FieldKind, Host, MethodDescriptor};
use crate::sys::{jni, jvmti};
use crate::tracer::Tracer;
use crate::Agent;

const THREAD_CLASS: &str = "java/lang/Thread";
const DUMP_STACK: &str = "dumpStack";
const DUMP_STACK_SIG: &str = "()V";
const BOOLEAN_SIG: &str = "Z";

/// `Thread.dumpStack()`, resolved once at init.
struct StackDumper {
    thread_class: jni::jclass,
    dump_stack: jni::jmethodID,
}

// SAFETY: `thread_class` is a global reference and `dump_stack` a method ID;
// both are valid on every thread until the VM dies.
unsafe impl Send for StackDumper {}
unsafe impl Sync for StackDumper {}

/// The native method tracer agent.
#[derive(Default)]
pub struct NativeTracer {
    tracer: RwLock<Option<Arc<Tracer>>>,
    // Never released: the global reference is needed until the VM is gone.
    stack: OnceLock<StackDumper>,
}

impl NativeTracer {
    fn load(&self, vm: *mut jni::JavaVM, options: &str) -> Result<(), LoadError> {
        let config = TracerConfig::parse(options)?;
        debug!(?config, "parsed options");

        let jvmti = Jvmti::new(vm).map_err(LoadError::Environment)?;

        jvmti
            .add_capabilities_with(|caps| {
                caps.set_can_generate_field_modification_events(true);
                caps.set_can_generate_method_entry_events(true);
            })
            .map_err(|err| host_error(&jvmti, "AddCapabilities", err))?;

        jvmti
            .set_event_callbacks(crate::event_callbacks())
            .map_err(|err| host_error(&jvmti, "SetEventCallbacks", err))?;

        *self.tracer.write() = Some(Arc::new(Tracer::stdout(config)));

        jvmti
            .set_event_notification_mode(true, jvmti::JVMTI_EVENT_VM_INIT, ptr::null_mut())
            .map_err(|err| host_error(&jvmti, "SetEventNotificationMode(VMInit)", err))?;

        Ok(())
    }

    /// The live tracer. The lock is not held while the tracer runs, so an
    /// event nested inside another never waits on it.
    fn tracer(&self) -> Option<Arc<Tracer>> {
        self.tracer.read().clone()
    }

    fn host<'a>(&'a self, jvmti: &Jvmti, jni: &'a JniEnv) -> JvmHost<'a> {
        JvmHost {
            jvmti: *jvmti,
            jni,
            stack: &self.stack,
        }
    }
}

impl Agent for NativeTracer {
    fn on_load(&self, vm: *mut jni::JavaVM, options: &str) -> jni::jint {
        crate::logging::init();

        match self.load(vm, options) {
            Ok(()) => jni::JNI_OK,
            Err(err) => {
                error!("{err}");
                *self.tracer.write() = None;
                jni::JNI_ERR
            }
        }
    }

    fn on_unload(&self) {
        if self.tracer.write().take().is_some() {
            debug!("tracer released");
        }
    }

    fn vm_init(&self, jvmti: &Jvmti, jni: &JniEnv, _thread: jni::jthread) {
        if let Some(tracer) = self.tracer() {
            tracer.on_init(&self.host(jvmti, jni));
        }
    }

    fn field_modification(
        &self,
        jvmti: &Jvmti,
        jni: &JniEnv,
        _thread: jni::jthread,
        _field_klass: jni::jclass,
        _object: jni::jobject,
        _field: jni::jfieldID,
        signature_type: c_char,
        new_value: jni::jvalue,
    ) {
        if signature_type as u8 != b'Z' {
            return;
        }
        let Some(tracer) = self.tracer() else {
            return;
        };
        // SAFETY: the signature type says the boolean member is the live one.
        let value = unsafe { new_value.z } != jni::JNI_FALSE;
        tracer.on_field_write(&self.host(jvmti, jni), value);
    }

    fn method_entry(&self, jvmti: &Jvmti, jni: &JniEnv, _thread: jni::jthread, method: jni::jmethodID) {
        if let Some(tracer) = self.tracer() {
            tracer.on_method_entry(&self.host(jvmti, jni), method);
        }
    }
}

fn host_error(jvmti: &Jvmti, operation: &'static str, err: jvmti::jvmtiError) -> HostError {
    HostError::new(operation, jvmti.describe_error(err))
}

/// The VM as seen from a single JVMTI callback.
pub struct JvmHost<'a> {
    jvmti: Jvmti,
    jni: &'a JniEnv,
    stack: &'a OnceLock<StackDumper>,
}

impl JvmHost<'_> {
    fn error(&self, operation: &'static str, err: jvmti::jvmtiError) -> HostError {
        host_error(&self.jvmti, operation, err)
    }

    fn set_event(&self, enabled: bool, event: u32, operation: &'static str) -> Result<(), HostError> {
        self.jvmti
            .set_event_notification_mode(enabled, event, ptr::null_mut())
            .map_err(|err| self.error(operation, err))
    }

    fn resolve_stack_dumper(&self) -> Result<StackDumper, HostError> {
        let local = self.jni.find_class(THREAD_CLASS).ok_or_else(|| {
            self.clear_pending_error();
            HostError::new("FindClass", format!("{THREAD_CLASS} not found"))
        })?;

        let resolved = self
            .jni
            .get_static_method_id(local, DUMP_STACK, DUMP_STACK_SIG)
            .ok_or_else(|| {
                self.clear_pending_error();
                HostError::new("GetStaticMethodID", format!("{THREAD_CLASS}.{DUMP_STACK}{DUMP_STACK_SIG} not found"))
            })
            .and_then(|dump_stack| {
                let thread_class = self
                    .jni
                    .new_global_ref(local)
                    .ok_or_else(|| HostError::new("NewGlobalRef", THREAD_CLASS))?;
                Ok(StackDumper {
                    thread_class,
                    dump_stack,
                })
            });

        self.jni.delete_local_ref(local);
        resolved
    }
}

impl Host for JvmHost<'_> {
    type Method = jni::jmethodID;
    type Class = jni::jclass;
    type Field = jni::jfieldID;
    type Name<'n>
        = MethodName
    where
        Self: 'n;

    fn find_class(&self, name: &str) -> Option<jni::jclass> {
        // FindClass wants internal names; accept the dotted form too.
        let internal = name.replace('.', "/");
        self.jni.find_class(&internal)
    }

    fn find_boolean_field(&self, class: &jni::jclass, name: &str, kind: FieldKind) -> Option<jni::jfieldID> {
        match kind {
            FieldKind::Instance => self.jni.get_field_id(*class, name, BOOLEAN_SIG),
            FieldKind::Static => self.jni.get_static_field_id(*class, name, BOOLEAN_SIG),
        }
    }

    fn describe_pending_error(&self) -> bool {
        if self.jni.exception_check() {
            self.jni.exception_describe();
            true
        } else {
            false
        }
    }

    fn clear_pending_error(&self) {
        if self.jni.exception_check() {
            self.jni.exception_clear();
        }
    }

    fn watch_field_writes(&self, class: &jni::jclass, field: jni::jfieldID) -> Result<(), HostError> {
        self.jvmti
            .set_field_modification_watch(*class, field)
            .map_err(|err| self.error("SetFieldModificationWatch", err))?;
        self.set_event(
            true,
            jvmti::JVMTI_EVENT_FIELD_MODIFICATION,
            "SetEventNotificationMode(FieldModification)",
        )
    }

    fn set_method_entry_events(&self, enabled: bool) -> Result<(), HostError> {
        self.set_event(enabled, jvmti::JVMTI_EVENT_METHOD_ENTRY, "SetEventNotificationMode(MethodEntry)")
    }

    fn is_native(&self, method: jni::jmethodID) -> Result<bool, HostError> {
        self.jvmti
            .is_method_native(method)
            .map_err(|err| self.error("IsMethodNative", err))
    }

    fn method_name(&self, method: jni::jmethodID) -> Result<MethodName, HostError> {
        self.jvmti
            .get_method_name(method)
            .map_err(|err| self.error("GetMethodName", err))
    }

    fn prepare_stack_dump(&self) -> Result<(), HostError> {
        if self.stack.get().is_some() {
            return Ok(());
        }
        let dumper = self.resolve_stack_dumper()?;
        if let Err(duplicate) = self.stack.set(dumper) {
            // Lost a race with another init; drop our reference.
            self.jni.delete_global_ref(duplicate.thread_class);
        }
        Ok(())
    }

    fn dump_stack(&self) {
        let Some(dumper) = self.stack.get() else {
            return;
        };
        self.jni
            .call_static_void_method(dumper.thread_class, dumper.dump_stack, &[]);
        if self.jni.exception_check() {
            self.jni.exception_describe();
        }
    }
}

impl MethodDescriptor for MethodName {
    fn name(&self) -> Cow<'_, str> {
        MethodName::name(self)
    }

    fn signature(&self) -> Cow<'_, str> {
        MethodName::signature(self)
    }
}
