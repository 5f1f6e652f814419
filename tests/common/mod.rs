//! A scripted host for driving the tracer without a JVM.
//!
//! Like the VM, the mock only delivers method entries (through
//! [`MockHost::enter`]) while the method-entry subscription is enabled, and
//! leaves a pending error behind after every failed lookup.

#![allow(dead_code)]

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use jnativetracer::config::TracerConfig;
use jnativetracer::error::HostError;
use jnativetracer::host::{FieldKind, Host, MethodDescriptor};
use jnativetracer::tracer::Tracer;

pub type MethodId = u32;

type Hook = Box<dyn FnOnce(&MockHost) + Send>;

/// A clonable in-memory sink.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Builds a tracer over `options` writing into a fresh buffer.
pub fn tracer(options: &str) -> (Arc<Tracer>, SharedBuf) {
    let config = TracerConfig::parse(options).expect("valid options");
    let buf = SharedBuf::default();
    (Arc::new(Tracer::new(config, Box::new(buf.clone()))), buf)
}

/// The record `tracer` prints for a method, stack dump excluded.
pub fn record(name: &str, signature: &str) -> String {
    format!("jnativetracer: native method called: {name}{signature}\n\n")
}

pub struct MockName<'a> {
    host: &'a MockHost,
    name: String,
    signature: String,
}

impl MethodDescriptor for MockName<'_> {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn signature(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.signature)
    }
}

impl Drop for MockName<'_> {
    fn drop(&mut self) {
        self.host.names_released.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct MockHost {
    classes: HashSet<String>,
    fields: Vec<(String, String, FieldKind)>,
    methods: HashMap<MethodId, (String, String, bool)>,
    unnamed: HashSet<MethodId>,
    fail_watch: bool,
    missing_dumper: bool,

    pending: Mutex<Option<String>>,
    dump_hook: Mutex<Option<Hook>>,
    watch_hook: Mutex<Option<Hook>>,
    entry_enabled: AtomicBool,
    entry_events_failing: AtomicBool,

    pub described: Mutex<Vec<String>>,
    pub watches: Mutex<Vec<(String, String)>>,
    pub entry_calls: Mutex<Vec<bool>>,
    pub names_allocated: AtomicUsize,
    pub names_released: AtomicUsize,
    pub dumps: AtomicUsize,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.insert(class.to_string());
        self
    }

    pub fn with_field(mut self, class: &str, field: &str, kind: FieldKind) -> Self {
        self.classes.insert(class.to_string());
        self.fields.push((class.to_string(), field.to_string(), kind));
        self
    }

    pub fn with_method(mut self, id: MethodId, name: &str, signature: &str, native: bool) -> Self {
        self.methods.insert(id, (name.to_string(), signature.to_string(), native));
        self
    }

    /// A native method whose name lookup fails.
    pub fn with_unnamed_native(mut self, id: MethodId) -> Self {
        self.methods.insert(id, (String::new(), String::new(), true));
        self.unnamed.insert(id);
        self
    }

    pub fn failing_watch(mut self) -> Self {
        self.fail_watch = true;
        self
    }

    pub fn without_stack_dumper(mut self) -> Self {
        self.missing_dumper = true;
        self
    }

    /// Runs `hook` inside the next stack dump.
    pub fn on_dump(&self, hook: impl FnOnce(&MockHost) + Send + 'static) {
        *self.dump_hook.lock() = Some(Box::new(hook));
    }

    /// Runs `hook` right after the next write-watch is installed.
    pub fn on_watch(&self, hook: impl FnOnce(&MockHost) + Send + 'static) {
        *self.watch_hook.lock() = Some(Box::new(hook));
    }

    /// Makes method-entry subscription changes fail until called again with
    /// `false`. Refused calls are not recorded in `entry_calls`.
    pub fn fail_entry_events(&self, failing: bool) {
        self.entry_events_failing.store(failing, Ordering::SeqCst);
    }

    /// Delivers a method entry the way the VM would: only while subscribed.
    pub fn enter(&self, tracer: &Tracer, method: MethodId) {
        if self.entry_enabled() {
            tracer.on_method_entry(self, method);
        }
    }

    pub fn entry_enabled(&self) -> bool {
        self.entry_enabled.load(Ordering::SeqCst)
    }

    fn set_pending(&self, error: String) {
        *self.pending.lock() = Some(error);
    }
}

impl Host for MockHost {
    type Method = MethodId;
    type Class = String;
    type Field = usize;
    type Name<'a>
        = MockName<'a>
    where
        Self: 'a;

    fn find_class(&self, name: &str) -> Option<String> {
        if self.classes.contains(name) {
            Some(name.to_string())
        } else {
            self.set_pending(format!("java.lang.NoClassDefFoundError: {name}"));
            None
        }
    }

    fn find_boolean_field(&self, class: &String, name: &str, kind: FieldKind) -> Option<usize> {
        let found = self
            .fields
            .iter()
            .position(|(c, f, k)| c == class && f == name && *k == kind);
        if found.is_none() {
            self.set_pending(format!("java.lang.NoSuchFieldError: {name} ({kind:?})"));
        }
        found
    }

    fn describe_pending_error(&self) -> bool {
        match self.pending.lock().take() {
            Some(error) => {
                self.described.lock().push(error);
                true
            }
            None => false,
        }
    }

    fn clear_pending_error(&self) {
        self.pending.lock().take();
    }

    fn watch_field_writes(&self, class: &String, field: usize) -> Result<(), HostError> {
        if self.fail_watch {
            return Err(HostError::new("SetFieldModificationWatch", "JVMTI_ERROR_DUPLICATE"));
        }
        let (_, name, _) = &self.fields[field];
        self.watches.lock().push((class.clone(), name.clone()));
        let hook = self.watch_hook.lock().take();
        if let Some(hook) = hook {
            hook(self);
        }
        Ok(())
    }

    fn set_method_entry_events(&self, enabled: bool) -> Result<(), HostError> {
        if self.entry_events_failing.load(Ordering::SeqCst) {
            return Err(HostError::new("SetEventNotificationMode(MethodEntry)", "JVMTI_ERROR_WRONG_PHASE"));
        }
        self.entry_calls.lock().push(enabled);
        self.entry_enabled.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn is_native(&self, method: MethodId) -> Result<bool, HostError> {
        self.methods
            .get(&method)
            .map(|(_, _, native)| *native)
            .ok_or_else(|| HostError::new("IsMethodNative", "JVMTI_ERROR_INVALID_METHODID"))
    }

    fn method_name(&self, method: MethodId) -> Result<MockName<'_>, HostError> {
        if self.unnamed.contains(&method) {
            return Err(HostError::new("GetMethodName", "JVMTI_ERROR_INVALID_METHODID"));
        }
        let (name, signature, _) = self
            .methods
            .get(&method)
            .ok_or_else(|| HostError::new("GetMethodName", "JVMTI_ERROR_INVALID_METHODID"))?;
        self.names_allocated.fetch_add(1, Ordering::SeqCst);
        Ok(MockName {
            host: self,
            name: name.clone(),
            signature: signature.clone(),
        })
    }

    fn prepare_stack_dump(&self) -> Result<(), HostError> {
        if self.missing_dumper {
            Err(HostError::new("GetStaticMethodID", "java/lang/Thread.dumpStack()V not found"))
        } else {
            Ok(())
        }
    }

    fn dump_stack(&self) {
        self.dumps.fetch_add(1, Ordering::SeqCst);
        let hook = self.dump_hook.lock().take();
        if let Some(hook) = hook {
            hook(self);
        }
    }
}
