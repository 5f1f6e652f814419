//! High-level environment wrappers for JVMTI and JNI.
//!
//! [`Jvmti`] wraps the tool interface: capabilities, event callbacks and
//! notification modes, field watches, method introspection and memory hand-back.
//! [`JniEnv`] wraps the per-thread JNI environment: class and member lookup,
//! pending exceptions, global references and static calls.
//!
//! Both wrap raw pointers and are only valid for as long as the VM says they
//! are; the agent builds them fresh inside every callback.
//!
//! ```rust,ignore
//! use jnativetracer::prelude::*;
//!
//! fn native_name(jvmti: &Jvmti, method: jni::jmethodID) -> Option<String> {
//!     let names = jvmti.get_method_name(method).ok()?;
//!     Some(format!("{}{}", names.name(), names.signature()))
//!     // `names` is dropped here and its buffers are deallocated
//! }
//! ```

mod jvmti_impl {
    pub use crate::jvmti_wrapper::{Jvmti, MethodName};
}

mod jni_impl {
    pub use crate::jni_wrapper::JniEnv;
}

pub use jvmti_impl::{Jvmti, MethodName};
pub use jni_impl::JniEnv;
