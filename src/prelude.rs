//! Common imports for working with the tracer.
//!
//! This prelude is intentionally small: the context object, the host seam and
//! the wrappers the JVM binding is written against.

pub use crate::config::{TracerConfig, TriggerSpec};
pub use crate::env::{JniEnv, Jvmti, MethodName};
pub use crate::error::{ConfigError, HostError, TriggerError};
pub use crate::export_agent;
pub use crate::host::{FieldKind, Host, MethodDescriptor};
pub use crate::sys::{jni, jvmti};
pub use crate::tracer::{ModeTransition, Tracer, TracingMode};
pub use crate::Agent;
