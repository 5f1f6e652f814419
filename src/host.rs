//! The instrumentation host as seen by the tracer.
//!
//! [`Tracer`](crate::tracer::Tracer) never talks to JVMTI directly. Each event
//! entry point receives a `Host` built for the thread the event arrived on,
//! which keeps the gating logic testable without a VM. The production
//! implementation lives in [`crate::agent`].

use std::borrow::Cow;

use crate::error::HostError;

/// Where a field lookup should look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Instance,
    Static,
}

/// Name and signature of a method, typically borrowed from host memory that
/// is handed back when the value is dropped.
pub trait MethodDescriptor {
    fn name(&self) -> Cow<'_, str>;
    fn signature(&self) -> Cow<'_, str>;
}

pub trait Host {
    /// Opaque method identity delivered with method-entry events.
    type Method: Copy;
    /// A resolved class.
    type Class;
    /// A resolved field.
    type Field: Copy;
    /// Name and signature returned by [`Host::method_name`]. Dropping it must
    /// release whatever the host allocated for the lookup.
    type Name<'a>: MethodDescriptor
    where
        Self: 'a;

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Finds a loaded or loadable class by name.
    fn find_class(&self, name: &str) -> Option<Self::Class>;

    /// Finds a boolean field of the given kind on `class`.
    fn find_boolean_field(&self, class: &Self::Class, name: &str, kind: FieldKind) -> Option<Self::Field>;

    /// Reports and clears a lookup error the host has pending.
    ///
    /// Returns `false` when nothing was pending, in which case the caller
    /// prints its own message.
    fn describe_pending_error(&self) -> bool;

    /// Discards a pending lookup error without reporting it.
    fn clear_pending_error(&self);

    // =========================================================================
    // Events
    // =========================================================================

    /// Installs a write-watch on `field` and subscribes to its write events.
    fn watch_field_writes(&self, class: &Self::Class, field: Self::Field) -> Result<(), HostError>;

    /// Subscribes to or unsubscribes from method-entry events for all threads.
    fn set_method_entry_events(&self, enabled: bool) -> Result<(), HostError>;

    // =========================================================================
    // Introspection
    // =========================================================================

    fn is_native(&self, method: Self::Method) -> Result<bool, HostError>;

    fn method_name(&self, method: Self::Method) -> Result<Self::Name<'_>, HostError>;

    // =========================================================================
    // Stack dumps
    // =========================================================================

    /// Resolves whatever [`Host::dump_stack`] needs. Called once, at init.
    fn prepare_stack_dump(&self) -> Result<(), HostError>;

    /// Dumps the current thread's stack. May run managed code, including
    /// further native methods on this same thread.
    fn dump_stack(&self);
}
