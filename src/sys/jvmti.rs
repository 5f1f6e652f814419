// jnativetracer/src/sys/jvmti.rs
//
// JVMTI (JVM Tool Interface) types and function table.
//
// As with the JNI table, only the functions the tracer calls are typed and the
// rest of each region is padding of the right width. Slot numbers in the
// comments are the 1-based positions used by jvmti.h.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use crate::sys::jni::{jboolean, jclass, jfieldID, jint, jlong, jmethodID, jobject, jthread, jvalue, JNIEnv, Slot};
use std::os::raw::{c_char, c_uchar};

// --- Constants ---
pub const JVMTI_VERSION_1_2: jint = 0x30010200;

pub const JVMTI_EVENT_VM_INIT: u32 = 50;
pub const JVMTI_EVENT_FIELD_MODIFICATION: u32 = 64;
pub const JVMTI_EVENT_METHOD_ENTRY: u32 = 65;
/// Highest event number known to the callback table (JDK 21 VirtualThreadEnd).
pub const JVMTI_MAX_EVENT_TYPE_VAL: u32 = 88;

pub const JVMTI_ENABLE: jint = 1;
pub const JVMTI_DISABLE: jint = 0;

pub type jlocation = jlong;

// --- Error Codes ---

/// A raw `jvmtiError`.
///
/// Kept as a transparent integer rather than an enum: the VM may return codes
/// this crate does not name.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct jvmtiError(pub u32);

impl jvmtiError {
    pub const NONE: Self = Self(0);
    pub const NOT_AVAILABLE: Self = Self(98);
    pub const INVALID_ENVIRONMENT: Self = Self(116);

    pub fn is_ok(self) -> bool {
        self == Self::NONE
    }
}

// --- Capabilities ---
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct jvmtiCapabilities {
    bits: [u32; 4],
}

impl jvmtiCapabilities {
    fn set_bit(&mut self, bit_offset: usize, value: bool) {
        let word_index = bit_offset / 32;
        let bit_index = bit_offset % 32;
        if value {
            self.bits[word_index] |= 1 << bit_index;
        } else {
            self.bits[word_index] &= !(1 << bit_index);
        }
    }

    fn get_bit(&self, bit_offset: usize) -> bool {
        let word_index = bit_offset / 32;
        let bit_index = bit_offset % 32;
        (self.bits[word_index] & (1 << bit_index)) != 0
    }

    // [1]
    pub fn set_can_generate_field_modification_events(&mut self, v: bool) { self.set_bit(1, v); }
    pub fn can_generate_field_modification_events(&self) -> bool { self.get_bit(1) }

    // [24]
    pub fn set_can_generate_method_entry_events(&mut self, v: bool) { self.set_bit(24, v); }
    pub fn can_generate_method_entry_events(&self) -> bool { self.get_bit(24) }
}

// --- Function types ---
pub type JvmtiSetEventNotificationModeFn =
    unsafe extern "system" fn(env: *mut jvmtiEnv, mode: jint, event_type: u32, event_thread: jthread) -> jvmtiError;
pub type JvmtiSetFieldModificationWatchFn =
    unsafe extern "system" fn(env: *mut jvmtiEnv, klass: jclass, field: jfieldID) -> jvmtiError;
pub type JvmtiDeallocateFn = unsafe extern "system" fn(env: *mut jvmtiEnv, mem: *mut c_uchar) -> jvmtiError;
pub type JvmtiGetMethodNameFn = unsafe extern "system" fn(
    env: *mut jvmtiEnv,
    method: jmethodID,
    name_ptr: *mut *mut c_char,
    signature_ptr: *mut *mut c_char,
    generic_ptr: *mut *mut c_char,
) -> jvmtiError;
pub type JvmtiIsMethodNativeFn =
    unsafe extern "system" fn(env: *mut jvmtiEnv, method: jmethodID, is_native_ptr: *mut jboolean) -> jvmtiError;
pub type JvmtiSetEventCallbacksFn = unsafe extern "system" fn(
    env: *mut jvmtiEnv,
    callbacks: *const jvmtiEventCallbacks,
    size_of_callbacks: jint,
) -> jvmtiError;
pub type JvmtiGetErrorNameFn =
    unsafe extern "system" fn(env: *mut jvmtiEnv, error: jvmtiError, name_ptr: *mut *mut c_char) -> jvmtiError;
pub type JvmtiAddCapabilitiesFn =
    unsafe extern "system" fn(env: *mut jvmtiEnv, capabilities_ptr: *const jvmtiCapabilities) -> jvmtiError;

// --- Event callback types ---
pub type JvmtiVMInitFn = unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv, jni_env: *mut JNIEnv, thread: jthread);

pub type JvmtiFieldModificationFn = unsafe extern "system" fn(
    jvmti_env: *mut jvmtiEnv,
    jni_env: *mut JNIEnv,
    thread: jthread,
    method: jmethodID,
    location: jlocation,
    field_klass: jclass,
    object: jobject,
    field: jfieldID,
    signature_type: c_char,
    new_value: jvalue,
);

pub type JvmtiMethodEntryFn =
    unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv, jni_env: *mut JNIEnv, thread: jthread, method: jmethodID);

#[repr(C)]
pub struct jvmtiInterface_1_ {
    /*   1:  RESERVED */
    pub reserved1: Slot,
    /*   2: Set Event Notification Mode */
    pub SetEventNotificationMode: Option<JvmtiSetEventNotificationModeFn>,
    /*   3-42: modules, threads, frames, locals, raw monitors, breakpoints, access watches */
    pub _slots_3_42: [Slot; 40],
    /*   43: Set Field Modification Watch */
    pub SetFieldModificationWatch: Option<JvmtiSetFieldModificationWatchFn>,
    /*   44-46: Clear Field Modification Watch, Is Modifiable Class, Allocate */
    pub _slots_44_46: [Slot; 3],
    /*   47: Deallocate */
    pub Deallocate: Option<JvmtiDeallocateFn>,
    /*   48-63: class and field information */
    pub _slots_48_63: [Slot; 16],
    /*   64: Get Method Name (and Signature) */
    pub GetMethodName: Option<JvmtiGetMethodNameFn>,
    /*   65-75: method information */
    pub _slots_65_75: [Slot; 11],
    /*   76: Is Method Native */
    pub IsMethodNative: Option<JvmtiIsMethodNativeFn>,
    /*   77-121: class loading, heap, stack traces, JNI table */
    pub _slots_77_121: [Slot; 45],
    /*   122: Set Event Callbacks */
    pub SetEventCallbacks: Option<JvmtiSetEventCallbacksFn>,
    /*   123-127: Generate Events, extensions, Dispose Environment */
    pub _slots_123_127: [Slot; 5],
    /*   128: Get Error Name */
    pub GetErrorName: Option<JvmtiGetErrorNameFn>,
    /*   129-141: properties, phase, timers, potential capabilities */
    pub _slots_129_141: [Slot; 13],
    /*   142: Add Capabilities */
    pub AddCapabilities: Option<JvmtiAddCapabilitiesFn>,
}

#[repr(C)]
pub struct jvmtiEnv {
    pub functions: *const jvmtiInterface_1_,
}

/// Event callback table, indexed by `event - JVMTI_EVENT_VM_INIT`.
///
/// The VM copies at most its own `sizeof(jvmtiEventCallbacks)`, so the table
/// can be handed to older VMs that know fewer events.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct jvmtiEventCallbacks {
    /* 50 */
    pub VMInit: Option<JvmtiVMInitFn>,
    /* 51-63: VMDeath .. FieldAccess */
    pub _events_51_63: [Slot; 13],
    /* 64 */
    pub FieldModification: Option<JvmtiFieldModificationFn>,
    /* 65 */
    pub MethodEntry: Option<JvmtiMethodEntryFn>,
    /* 66-88: MethodExit .. VirtualThreadEnd */
    pub _events_66_88: [Slot; 23],
}

impl Default for jvmtiEventCallbacks {
    fn default() -> Self {
        Self {
            VMInit: None,
            _events_51_63: [std::ptr::null(); 13],
            FieldModification: None,
            MethodEntry: None,
            _events_66_88: [std::ptr::null(); 23],
        }
    }
}
