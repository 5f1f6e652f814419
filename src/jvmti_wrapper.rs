// jnativetracer/src/jvmti_wrapper.rs
use crate::sys::jni;
use crate::sys::jvmti;
use std::borrow::Cow;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;

/// A safe wrapper around the raw JVMTI Environment pointer.
///
/// Every call goes through the environment's function table. A slot the VM
/// left empty is reported as [`jvmti::jvmtiError::NOT_AVAILABLE`] instead of
/// panicking, since these calls run on application threads.
#[derive(Debug, Clone, Copy)]
pub struct Jvmti {
    env: *mut jvmti::jvmtiEnv,
}

impl Jvmti {
    /// Connects to the JVM and retrieves the JVMTI environment.
    pub fn new(vm: *mut jni::JavaVM) -> Result<Self, jni::jint> {
        if vm.is_null() {
            return Err(jni::JNI_ERR);
        }
        let mut env_ptr: *mut std::ffi::c_void = ptr::null_mut();

        unsafe {
            // vm: *mut JavaVM = *mut *const JNIInvokeInterface_
            let get_env_fn = (**vm).GetEnv;
            let res = get_env_fn(vm, &mut env_ptr, jvmti::JVMTI_VERSION_1_2);
            if res != jni::JNI_OK {
                return Err(res);
            }
        }

        if env_ptr.is_null() {
            return Err(jni::JNI_ERR);
        }
        Ok(Jvmti {
            env: env_ptr as *mut jvmti::jvmtiEnv,
        })
    }

    /// Create a Jvmti wrapper from a raw jvmtiEnv pointer
    ///
    /// # Safety
    /// The caller must ensure the pointer is valid for the duration of use.
    pub unsafe fn from_raw(env: *mut jvmti::jvmtiEnv) -> Self {
        Jvmti { env }
    }

    fn function<F>(
        &self,
        select: impl FnOnce(&jvmti::jvmtiInterface_1_) -> Option<F>,
    ) -> Result<F, jvmti::jvmtiError> {
        unsafe {
            let table = (*self.env).functions;
            if table.is_null() {
                return Err(jvmti::jvmtiError::INVALID_ENVIRONMENT);
            }
            select(&*table).ok_or(jvmti::jvmtiError::NOT_AVAILABLE)
        }
    }

    fn check(err: jvmti::jvmtiError) -> Result<(), jvmti::jvmtiError> {
        if err.is_ok() { Ok(()) } else { Err(err) }
    }

    pub fn add_capabilities(&self, new_caps: &jvmti::jvmtiCapabilities) -> Result<(), jvmti::jvmtiError> {
        let add_caps_fn = self.function(|f| f.AddCapabilities)?;
        Self::check(unsafe { add_caps_fn(self.env, new_caps) })
    }

    /// Builds a capability set with `configure` and requests it.
    pub fn add_capabilities_with(
        &self,
        configure: impl FnOnce(&mut jvmti::jvmtiCapabilities),
    ) -> Result<(), jvmti::jvmtiError> {
        let mut caps = jvmti::jvmtiCapabilities::default();
        configure(&mut caps);
        self.add_capabilities(&caps)
    }

    pub fn set_event_callbacks(&self, callbacks: jvmti::jvmtiEventCallbacks) -> Result<(), jvmti::jvmtiError> {
        let set_callbacks_fn = self.function(|f| f.SetEventCallbacks)?;
        let size = std::mem::size_of::<jvmti::jvmtiEventCallbacks>() as jni::jint;
        Self::check(unsafe { set_callbacks_fn(self.env, &callbacks, size) })
    }

    /// Enables or disables delivery of `event_type`. A null `thread` means all threads.
    pub fn set_event_notification_mode(
        &self,
        enable: bool,
        event_type: u32,
        thread: jni::jthread,
    ) -> Result<(), jvmti::jvmtiError> {
        let set_mode_fn = self.function(|f| f.SetEventNotificationMode)?;
        let mode = if enable { jvmti::JVMTI_ENABLE } else { jvmti::JVMTI_DISABLE };
        Self::check(unsafe { set_mode_fn(self.env, mode, event_type, thread) })
    }

    pub fn set_field_modification_watch(&self, klass: jni::jclass, field: jni::jfieldID) -> Result<(), jvmti::jvmtiError> {
        let set_fn = self.function(|f| f.SetFieldModificationWatch)?;
        Self::check(unsafe { set_fn(self.env, klass, field) })
    }

    pub fn deallocate(&self, mem: *mut u8) -> Result<(), jvmti::jvmtiError> {
        if mem.is_null() {
            return Ok(());
        }
        let deallocate_fn = self.function(|f| f.Deallocate)?;
        Self::check(unsafe { deallocate_fn(self.env, mem) })
    }

    pub fn is_method_native(&self, method: jni::jmethodID) -> Result<bool, jvmti::jvmtiError> {
        let is_native_fn = self.function(|f| f.IsMethodNative)?;
        let mut res: jni::jboolean = jni::JNI_FALSE;
        Self::check(unsafe { is_native_fn(self.env, method, &mut res) })?;
        Ok(res != jni::JNI_FALSE)
    }

    /// Looks up a method's name and signature.
    ///
    /// The strings stay in JVMTI-allocated memory owned by the returned
    /// [`MethodName`], which hands them back to the VM when dropped.
    pub fn get_method_name(&self, method: jni::jmethodID) -> Result<MethodName, jvmti::jvmtiError> {
        let get_method_name_fn = self.function(|f| f.GetMethodName)?;
        let mut names = MethodName {
            jvmti: *self,
            name: ptr::null_mut(),
            signature: ptr::null_mut(),
        };
        // The guard exists before the call so partial results are released too.
        let err = unsafe {
            get_method_name_fn(self.env, method, &mut names.name, &mut names.signature, ptr::null_mut())
        };
        Self::check(err)?;
        Ok(names)
    }

    pub fn get_error_name(&self, error: jvmti::jvmtiError) -> Result<String, jvmti::jvmtiError> {
        let get_fn = self.function(|f| f.GetErrorName)?;
        let mut name_ptr: *mut c_char = ptr::null_mut();
        Self::check(unsafe { get_fn(self.env, error, &mut name_ptr) })?;
        let name = unsafe { lossy(name_ptr) }.into_owned();
        self.deallocate(name_ptr as *mut u8)?;
        Ok(name)
    }

    /// Human-readable form of `error`, falling back to the numeric code.
    pub fn describe_error(&self, error: jvmti::jvmtiError) -> String {
        self.get_error_name(error)
            .unwrap_or_else(|_| format!("JVMTI error {}", error.0))
    }
}

/// Name and signature of a method, held in JVMTI-allocated buffers.
pub struct MethodName {
    jvmti: Jvmti,
    name: *mut c_char,
    signature: *mut c_char,
}

impl MethodName {
    /// Method name, e.g. `currentTimeMillis`.
    pub fn name(&self) -> Cow<'_, str> {
        unsafe { lossy(self.name) }
    }

    /// JNI signature, e.g. `()J`.
    pub fn signature(&self) -> Cow<'_, str> {
        unsafe { lossy(self.signature) }
    }
}

impl Drop for MethodName {
    fn drop(&mut self) {
        // Nothing useful can be done if the VM refuses the buffer back.
        let _ = self.jvmti.deallocate(self.name as *mut u8);
        let _ = self.jvmti.deallocate(self.signature as *mut u8);
    }
}

/// Reads a VM-provided C string, tolerating null and modified UTF-8.
unsafe fn lossy<'a>(ptr: *const c_char) -> Cow<'a, str> {
    if ptr.is_null() {
        Cow::Borrowed("")
    } else {
        CStr::from_ptr(ptr).to_string_lossy()
    }
}
