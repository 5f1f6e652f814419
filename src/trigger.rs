//! Trigger resolution: finding the watched boolean field and arming a
//! write-watch on it.

use tracing::{debug, warn};

use crate::config::TriggerSpec;
use crate::error::TriggerError;
use crate::host::{FieldKind, Host};

/// The class and field a write-watch was installed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTrigger<C, F> {
    pub class: C,
    pub field: F,
    pub kind: FieldKind,
}

/// Resolves `spec` and installs a write-watch on it.
///
/// The field is looked up as an instance field first and as a static field
/// second. Every failure is reported on stderr before returning, preferring
/// the host's own description of a pending error over a generic message.
///
/// Method-entry events are switched off before the watch goes in: a gated
/// tracer starts disarmed, and a write racing with installation must not be
/// undone afterwards.
pub fn install<H: Host>(host: &H, spec: &TriggerSpec) -> Result<ResolvedTrigger<H::Class, H::Field>, TriggerError> {
    let resolved = resolve(host, spec)?;

    if let Err(err) = host.set_method_entry_events(false) {
        warn!("{err}; tracing may start armed");
    }

    host.watch_field_writes(&resolved.class, resolved.field).map_err(|source| {
        let err = TriggerError::Watch {
            class: spec.class_name.clone(),
            field: spec.field_name.clone(),
            source,
        };
        warn!("{err}");
        err
    })?;

    debug!(trigger = %spec, kind = ?resolved.kind, "watching trigger field");
    Ok(resolved)
}

fn resolve<H: Host>(host: &H, spec: &TriggerSpec) -> Result<ResolvedTrigger<H::Class, H::Field>, TriggerError> {
    let Some(class) = host.find_class(&spec.class_name) else {
        return Err(report(
            host,
            TriggerError::ClassNotFound {
                class: spec.class_name.clone(),
            },
        ));
    };

    let instance = host.find_boolean_field(&class, &spec.field_name, FieldKind::Instance);
    let (field, kind) = match instance {
        Some(field) => (field, FieldKind::Instance),
        None => {
            // NoSuchFieldError from the instance lookup; the static lookup
            // decides what gets reported.
            host.clear_pending_error();
            match host.find_boolean_field(&class, &spec.field_name, FieldKind::Static) {
                Some(field) => (field, FieldKind::Static),
                None => {
                    return Err(report(
                        host,
                        TriggerError::FieldNotFound {
                            class: spec.class_name.clone(),
                            field: spec.field_name.clone(),
                        },
                    ));
                }
            }
        }
    };

    Ok(ResolvedTrigger { class, field, kind })
}

fn report<H: Host>(host: &H, err: TriggerError) -> TriggerError {
    if !host.describe_pending_error() {
        warn!("{err}");
    }
    err
}
