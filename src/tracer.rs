//! The tracer context: configuration, mode and gate, shared by every event
//! entry point from load until unload.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use tracing::{debug, info, warn};

use crate::config::{TracerConfig, TriggerSpec};
use crate::error::TriggerError;
use crate::gate::{EventGate, GateState, Sink};
use crate::host::{FieldKind, Host};
use crate::trigger;

/// How method-entry events are gated. Decided once, at init.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingMode {
    /// Every native method entry is traced.
    AlwaysOn,
    /// Tracing follows the watched boolean field.
    Gated,
}

/// The mode the tracer entered at init, and why.
#[derive(Debug)]
pub enum ModeTransition {
    /// The trigger field is being watched. Tracing starts disarmed.
    Gated { trigger: TriggerSpec, kind: FieldKind },
    /// No trigger was configured.
    AlwaysOn,
    /// A trigger was configured but could not be installed.
    FallbackToAlwaysOn { error: TriggerError },
}

impl ModeTransition {
    pub fn mode(&self) -> TracingMode {
        match self {
            ModeTransition::Gated { .. } => TracingMode::Gated,
            ModeTransition::AlwaysOn | ModeTransition::FallbackToAlwaysOn { .. } => TracingMode::AlwaysOn,
        }
    }
}

impl fmt::Display for ModeTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeTransition::Gated { trigger, kind } => {
                let kind = match kind {
                    FieldKind::Instance => "instance",
                    FieldKind::Static => "static",
                };
                write!(f, "tracing gated on {kind} field {trigger}")
            }
            ModeTransition::AlwaysOn => f.write_str("tracing all native methods"),
            ModeTransition::FallbackToAlwaysOn { .. } => {
                f.write_str("could not set method trigger, falling back to always-on mode")
            }
        }
    }
}

#[derive(Debug)]
pub struct Tracer {
    config: TracerConfig,
    gate: EventGate,
    started: AtomicBool,
    mode: OnceLock<TracingMode>,
}

impl Tracer {
    /// Builds a tracer writing its records to `output`.
    ///
    /// Nothing is traced until [`Tracer::on_init`] has picked a mode.
    pub fn new(config: TracerConfig, output: Sink) -> Self {
        let gate = EventGate::new(false, config.dump_stack_on_entry, output);
        Self {
            config,
            gate,
            started: AtomicBool::new(false),
            mode: OnceLock::new(),
        }
    }

    /// Builds a tracer writing its records to stdout.
    pub fn stdout(config: TracerConfig) -> Self {
        Self::new(config, Box::new(io::stdout()))
    }

    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    /// The mode picked at init, or `None` before init.
    pub fn mode(&self) -> Option<TracingMode> {
        self.mode.get().copied()
    }

    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    /// Prepares stack dumps and picks the tracing mode.
    ///
    /// Only the first call has any effect; later calls return `None`.
    pub fn on_init<H: Host>(&self, host: &H) -> Option<ModeTransition> {
        if self.started.swap(true, Ordering::AcqRel) {
            debug!("ignoring repeated init event");
            return None;
        }

        if let Err(err) = host.prepare_stack_dump() {
            warn!("{err}; stack dumps are disabled");
        }

        let transition = match &self.config.trigger {
            None => ModeTransition::AlwaysOn,
            Some(spec) => match trigger::install(host, spec) {
                Ok(resolved) => ModeTransition::Gated {
                    trigger: spec.clone(),
                    kind: resolved.kind,
                },
                Err(error) => ModeTransition::FallbackToAlwaysOn { error },
            },
        };

        match transition.mode() {
            TracingMode::AlwaysOn => self.gate.arm(host),
            TracingMode::Gated => {}
        }

        match &transition {
            ModeTransition::FallbackToAlwaysOn { .. } => warn!("{transition}"),
            _ => info!("{transition}"),
        }

        // `started` guards this; a racing second init has already returned.
        let _ = self.mode.set(transition.mode());
        Some(transition)
    }

    /// Handles a write of `value` to the watched field.
    ///
    /// Writes arriving while init is still running are applied: the watch is
    /// live before the mode is recorded.
    pub fn on_field_write<H: Host>(&self, host: &H, value: bool) {
        if self.mode() == Some(TracingMode::AlwaysOn) {
            debug!("ignoring field write in always-on mode");
            return;
        }
        self.gate.on_field_write(host, value);
    }

    /// Handles entry into `method` on the calling thread.
    pub fn on_method_entry<H: Host>(&self, host: &H, method: H::Method) {
        self.gate.on_method_entry(host, method);
    }
}
