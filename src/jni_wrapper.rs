//! Safe wrapper around the JNI environment.
//!
//! Only the operations the tracer needs are wrapped: class and member lookup,
//! pending-exception handling, global references and static void calls.
//!
//! # Example
//!
//! ```rust,ignore
//! use jnativetracer::env::JniEnv;
//!
//! fn vm_init(jni: *mut jni::JNIEnv) {
//!     let env = unsafe { JniEnv::from_raw(jni) };
//!
//!     match env.find_class("java/lang/Thread") {
//!         Some(thread) => { /* ... */ }
//!         None if env.exception_check() => env.exception_describe(),
//!         None => {}
//!     }
//! }
//! ```

use crate::sys::jni;
use std::ffi::CString;

/// Safe wrapper around a JNI environment pointer.
///
/// # Thread Safety
///
/// A `JniEnv` is tied to a specific thread and cannot be sent across threads.
/// Each JVM thread has its own JNI environment.
pub struct JniEnv {
    env: *mut jni::JNIEnv,
}

impl JniEnv {
    /// Creates a JniEnv wrapper from a raw pointer.
    ///
    /// # Safety
    ///
    /// The caller must ensure the pointer is valid and comes from the current thread.
    pub unsafe fn from_raw(env: *mut jni::JNIEnv) -> Self {
        JniEnv { env }
    }

    // =========================================================================
    // Class Operations
    // =========================================================================

    /// Finds a class by its fully qualified name.
    ///
    /// The name should use '/' as package separator (e.g., "java/lang/String").
    /// On failure the VM leaves a `NoClassDefFoundError` pending.
    pub fn find_class(&self, name: &str) -> Option<jni::jclass> {
        let c_name = CString::new(name).ok()?;
        unsafe {
            let vtable = *self.env;
            let cls = ((*vtable).FindClass)(self.env, c_name.as_ptr());
            if cls.is_null() { None } else { Some(cls) }
        }
    }

    // =========================================================================
    // Exception Handling
    // =========================================================================

    /// Checks if an exception is pending.
    pub fn exception_check(&self) -> bool {
        unsafe {
            let vtable = *self.env;
            ((*vtable).ExceptionCheck)(self.env) != jni::JNI_FALSE
        }
    }

    /// Clears any pending exception.
    pub fn exception_clear(&self) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).ExceptionClear)(self.env);
        }
    }

    /// Prints the pending exception and stack trace to stderr, then clears it.
    pub fn exception_describe(&self) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).ExceptionDescribe)(self.env);
        }
    }

    // =========================================================================
    // Member IDs
    // =========================================================================

    /// Gets the method ID for a static method.
    pub fn get_static_method_id(&self, cls: jni::jclass, name: &str, sig: &str) -> Option<jni::jmethodID> {
        let c_name = CString::new(name).ok()?;
        let c_sig = CString::new(sig).ok()?;
        unsafe {
            let vtable = *self.env;
            let mid = ((*vtable).GetStaticMethodID)(self.env, cls, c_name.as_ptr(), c_sig.as_ptr());
            if mid.is_null() { None } else { Some(mid) }
        }
    }

    /// Gets the field ID for an instance field.
    pub fn get_field_id(&self, cls: jni::jclass, name: &str, sig: &str) -> Option<jni::jfieldID> {
        let c_name = CString::new(name).ok()?;
        let c_sig = CString::new(sig).ok()?;
        unsafe {
            let vtable = *self.env;
            let fid = ((*vtable).GetFieldID)(self.env, cls, c_name.as_ptr(), c_sig.as_ptr());
            if fid.is_null() { None } else { Some(fid) }
        }
    }

    /// Gets the field ID for a static field.
    pub fn get_static_field_id(&self, cls: jni::jclass, name: &str, sig: &str) -> Option<jni::jfieldID> {
        let c_name = CString::new(name).ok()?;
        let c_sig = CString::new(sig).ok()?;
        unsafe {
            let vtable = *self.env;
            let fid = ((*vtable).GetStaticFieldID)(self.env, cls, c_name.as_ptr(), c_sig.as_ptr());
            if fid.is_null() { None } else { Some(fid) }
        }
    }

    // =========================================================================
    // References
    // =========================================================================

    /// Creates a global reference that outlives the current native frame.
    pub fn new_global_ref(&self, obj: jni::jobject) -> Option<jni::jobject> {
        unsafe {
            let vtable = *self.env;
            let global = ((*vtable).NewGlobalRef)(self.env, obj);
            if global.is_null() { None } else { Some(global) }
        }
    }

    /// Deletes a global reference.
    pub fn delete_global_ref(&self, obj: jni::jobject) {
        if obj.is_null() {
            return;
        }
        unsafe {
            let vtable = *self.env;
            ((*vtable).DeleteGlobalRef)(self.env, obj);
        }
    }

    /// Deletes a local reference.
    pub fn delete_local_ref(&self, obj: jni::jobject) {
        if obj.is_null() {
            return;
        }
        unsafe {
            let vtable = *self.env;
            ((*vtable).DeleteLocalRef)(self.env, obj);
        }
    }

    // =========================================================================
    // Method Calls
    // =========================================================================

    /// Calls a void static method.
    pub fn call_static_void_method(&self, cls: jni::jclass, method_id: jni::jmethodID, args: &[jni::jvalue]) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).CallStaticVoidMethodA)(self.env, cls, method_id, args.as_ptr());
        }
    }
}
