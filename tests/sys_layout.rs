use std::mem::{offset_of, size_of};

use jnativetracer::sys::jni::{self, Slot};
use jnativetracer::sys::jvmti;

// Positions past the last typed slot would silently call the wrong function,
// so the padded tables must match the C headers slot for slot.

#[test]
fn jni_function_table_ends_at_exception_check() {
    // ExceptionCheck is slot 228 (0-based).
    assert_eq!(size_of::<jni::JNINativeInterface_>(), 229 * size_of::<Slot>());
}

#[test]
fn typed_jni_slots_sit_at_their_indices() {
    let slot = size_of::<Slot>();
    assert_eq!(offset_of!(jni::JNINativeInterface_, FindClass), 6 * slot);
    assert_eq!(offset_of!(jni::JNINativeInterface_, ExceptionDescribe), 16 * slot);
    assert_eq!(offset_of!(jni::JNINativeInterface_, ExceptionClear), 17 * slot);
    assert_eq!(offset_of!(jni::JNINativeInterface_, NewGlobalRef), 21 * slot);
}

#[test]
fn named_error_codes_match_jvmti_h() {
    assert!(jvmti::jvmtiError::NONE.is_ok());
    assert_eq!(jvmti::jvmtiError::NOT_AVAILABLE, jvmti::jvmtiError(98));
    assert_eq!(jvmti::jvmtiError::INVALID_ENVIRONMENT, jvmti::jvmtiError(116));
}

#[test]
fn invoke_interface_ends_at_get_env() {
    assert_eq!(size_of::<jni::JNIInvokeInterface_>(), 7 * size_of::<Slot>());
}

#[test]
fn jvmti_function_table_ends_at_add_capabilities() {
    // AddCapabilities is function 142 (1-based).
    assert_eq!(size_of::<jvmti::jvmtiInterface_1_>(), 142 * size_of::<Slot>());
}

#[test]
fn callback_table_covers_every_event() {
    let events = (jvmti::JVMTI_MAX_EVENT_TYPE_VAL - jvmti::JVMTI_EVENT_VM_INIT + 1) as usize;
    assert_eq!(events, 39);
    assert_eq!(size_of::<jvmti::jvmtiEventCallbacks>(), events * size_of::<Slot>());
}

#[test]
fn event_numbers_match_jvmti_h() {
    assert_eq!(jvmti::JVMTI_EVENT_VM_INIT, 50);
    assert_eq!(jvmti::JVMTI_EVENT_FIELD_MODIFICATION, 64);
    assert_eq!(jvmti::JVMTI_EVENT_METHOD_ENTRY, 65);
}

#[test]
fn capabilities_are_sixteen_bytes() {
    assert_eq!(size_of::<jvmti::jvmtiCapabilities>(), 16);

    let mut caps = jvmti::jvmtiCapabilities::default();
    caps.set_can_generate_field_modification_events(true);
    caps.set_can_generate_method_entry_events(true);
    assert!(caps.can_generate_field_modification_events());
    assert!(caps.can_generate_method_entry_events());

    caps.set_can_generate_method_entry_events(false);
    assert!(!caps.can_generate_method_entry_events());
    assert!(caps.can_generate_field_modification_events());
}

#[test]
fn default_callbacks_are_empty() {
    let callbacks = jvmti::jvmtiEventCallbacks::default();
    assert!(callbacks.VMInit.is_none());
    assert!(callbacks.FieldModification.is_none());
    assert!(callbacks.MethodEntry.is_none());

    let wired = jnativetracer::event_callbacks();
    assert!(wired.VMInit.is_some());
    assert!(wired.FieldModification.is_some());
    assert!(wired.MethodEntry.is_some());
}
