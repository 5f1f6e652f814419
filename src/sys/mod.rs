//! Raw FFI layouts for the parts of JNI and JVMTI the tracer uses.

pub mod jni;
pub mod jvmti;
