//! Error types.
//!
//! Configuration errors abort the load. Trigger errors degrade the tracer to
//! always-on mode. Host errors raised while tracing are logged and dropped;
//! nothing here is ever allowed to take the instrumented application down.

use thiserror::Error;

use crate::sys::jni;

/// A rejected agent option string. The whole string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid configuration `{token}`: expected key=value")]
    MalformedOption { token: String },

    #[error("unknown {key} value: {value}")]
    InvalidValue { key: String, value: String },

    #[error("invalid trigger configuration `{value}`: expected <className>::<fieldName>")]
    InvalidTrigger { value: String },

    #[error("unknown configuration: {token}")]
    UnknownOption { key: String, token: String },
}

/// The watched field could not be resolved or watched.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("could not find {class}")]
    ClassNotFound { class: String },

    #[error("could not find {field} from {class}")]
    FieldNotFound { class: String, field: String },

    #[error("could not watch {class}::{field}: {source}")]
    Watch {
        class: String,
        field: String,
        #[source]
        source: HostError,
    },
}

/// A failure reported by the instrumentation host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {reason}")]
pub struct HostError {
    pub operation: &'static str,
    pub reason: String,
}

impl HostError {
    pub fn new(operation: &'static str, reason: impl Into<String>) -> Self {
        Self {
            operation,
            reason: reason.into(),
        }
    }
}

/// Why `Agent_OnLoad` refused to attach.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not obtain a JVMTI environment (JNI status {0})")]
    Environment(jni::jint),

    #[error(transparent)]
    Host(#[from] HostError),
}
