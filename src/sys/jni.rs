// jnativetracer/src/sys/jni.rs
//
// JNI (Java Native Interface) types and function tables.
//
// Only the slots the agent calls are typed. Every other slot is kept as an
// opaque pointer so the struct layout still matches jni.h exactly; the
// indices below are the 0-based positions from the JDK header and have been
// stable since JDK 1.6.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::ffi::c_void;
use std::os::raw::c_char;

// =============================================================================
// Primitive Types
// =============================================================================

pub type jint = i32;
pub type jlong = i64;
pub type jbyte = i8;
pub type jboolean = u8;
pub type jchar = u16;
pub type jshort = i16;
pub type jfloat = f32;
pub type jdouble = f64;
pub type jsize = jint;

// =============================================================================
// Reference Types (opaque pointers)
// =============================================================================

pub type jobject = *mut c_void;
pub type jclass = jobject;
pub type jthread = jobject;

pub type jmethodID = *mut c_void;
pub type jfieldID = *mut c_void;

#[repr(C)]
#[derive(Copy, Clone)]
pub union jvalue {
    pub z: jboolean,
    pub b: jbyte,
    pub c: jchar,
    pub s: jshort,
    pub i: jint,
    pub j: jlong,
    pub f: jfloat,
    pub d: jdouble,
    pub l: jobject,
}

// =============================================================================
// Constants
// =============================================================================

pub const JNI_OK: jint = 0;
pub const JNI_ERR: jint = -1;

pub const JNI_FALSE: jboolean = 0;

/// An untyped vtable slot.
pub type Slot = *const c_void;

// =============================================================================
// JNINativeInterface_ - The JNI function table
// =============================================================================

#[repr(C)]
pub struct JNINativeInterface_ {
    // 0-3
    pub reserved: [Slot; 4],

    // 4-5: GetVersion, DefineClass
    pub _slots_4_5: [Slot; 2],
    // 6
    pub FindClass: unsafe extern "system" fn(env: *mut JNIEnv, name: *const c_char) -> jclass,
    // 7-14: reflection, class hierarchy, Throw, ThrowNew
    pub _slots_7_14: [Slot; 8],

    // 15: ExceptionOccurred
    pub _slots_15: [Slot; 1],
    // 16-17
    pub ExceptionDescribe: unsafe extern "system" fn(env: *mut JNIEnv),
    pub ExceptionClear: unsafe extern "system" fn(env: *mut JNIEnv),
    // 18-20: FatalError, PushLocalFrame, PopLocalFrame
    pub _slots_18_20: [Slot; 3],

    // 21-23
    pub NewGlobalRef: unsafe extern "system" fn(env: *mut JNIEnv, lobj: jobject) -> jobject,
    pub DeleteGlobalRef: unsafe extern "system" fn(env: *mut JNIEnv, gref: jobject),
    pub DeleteLocalRef: unsafe extern "system" fn(env: *mut JNIEnv, obj: jobject),
    // 24-93: object creation, instance method calls
    pub _slots_24_93: [Slot; 70],

    // 94
    pub GetFieldID: unsafe extern "system" fn(
        env: *mut JNIEnv,
        clazz: jclass,
        name: *const c_char,
        sig: *const c_char,
    ) -> jfieldID,
    // 95-112: instance field accessors
    pub _slots_95_112: [Slot; 18],

    // 113
    pub GetStaticMethodID: unsafe extern "system" fn(
        env: *mut JNIEnv,
        clazz: jclass,
        name: *const c_char,
        sig: *const c_char,
    ) -> jmethodID,
    // 114-142: static method calls up to CallStaticVoidMethodV
    pub _slots_114_142: [Slot; 29],

    // 143-144
    pub CallStaticVoidMethodA:
        unsafe extern "system" fn(env: *mut JNIEnv, cls: jclass, methodID: jmethodID, args: *const jvalue),
    pub GetStaticFieldID: unsafe extern "system" fn(
        env: *mut JNIEnv,
        clazz: jclass,
        name: *const c_char,
        sig: *const c_char,
    ) -> jfieldID,
    // 145-227: static field accessors, strings, arrays, monitors, NIO
    pub _slots_145_227: [Slot; 83],

    // 228
    pub ExceptionCheck: unsafe extern "system" fn(env: *mut JNIEnv) -> jboolean,
}

/// JNIEnv is directly the vtable pointer (C ABI definition)
pub type JNIEnv = *const JNINativeInterface_;

// =============================================================================
// JNIInvokeInterface_ - The JavaVM function table
// =============================================================================

#[repr(C)]
pub struct JNIInvokeInterface_ {
    pub reserved: [Slot; 3],

    pub DestroyJavaVM: unsafe extern "system" fn(vm: *mut JavaVM) -> jint,
    pub AttachCurrentThread:
        unsafe extern "system" fn(vm: *mut JavaVM, penv: *mut *mut c_void, args: *mut c_void) -> jint,
    pub DetachCurrentThread: unsafe extern "system" fn(vm: *mut JavaVM) -> jint,
    pub GetEnv:
        unsafe extern "system" fn(vm: *mut JavaVM, penv: *mut *mut c_void, version: jint) -> jint,
}

/// JavaVM is directly the vtable pointer (C ABI definition)
pub type JavaVM = *const JNIInvokeInterface_;

