//! Agent option parsing.
//!
//! The option string is everything after `=` in
//! `-agentpath:libjnativetracer.so=<options>`: comma-separated `key=value`
//! tokens.
//!
//! | key | value | effect |
//! |-----|-------|--------|
//! | `dumpstack` | `true` \| `false` | dump the calling thread's stack after each record |
//! | `trigger` | `<className>::<fieldName>` | trace only while the named boolean field is `true` |
//!
//! ```
//! use jnativetracer::config::TracerConfig;
//!
//! let config: TracerConfig = "dumpstack=true,trigger=com/example/Flags::traceEnabled"
//!     .parse()
//!     .unwrap();
//! assert!(config.dump_stack_on_entry);
//! assert_eq!(config.trigger.unwrap().field_name, "traceEnabled");
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

const DUMPSTACK: &str = "dumpstack";
const TRIGGER: &str = "trigger";

/// Class and field whose writes arm and disarm tracing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSpec {
    pub class_name: String,
    pub field_name: String,
}

impl fmt::Display for TriggerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class_name, self.field_name)
    }
}

/// Parsed agent options. Immutable once built.
///
/// Without a trigger every native call is traced; with one, tracing follows
/// the watched field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TracerConfig {
    pub dump_stack_on_entry: bool,
    pub trigger: Option<TriggerSpec>,
}

impl TracerConfig {
    /// Parses an option string. An absent or empty string yields the defaults.
    ///
    /// Parsing stops at the first bad token and nothing from earlier tokens is
    /// kept. Empty tokens are skipped, and a repeated key overrides earlier
    /// occurrences.
    pub fn parse(options: &str) -> Result<Self, ConfigError> {
        let mut config = TracerConfig::default();

        for token in options.split(',').filter(|token| !token.is_empty()) {
            let (key, value) = token
                .split_once('=')
                .ok_or_else(|| ConfigError::MalformedOption { token: token.to_string() })?;

            match key {
                DUMPSTACK => config.dump_stack_on_entry = parse_bool(key, value)?,
                TRIGGER => config.trigger = Some(parse_trigger(value)?),
                _ => {
                    return Err(ConfigError::UnknownOption {
                        key: key.to_string(),
                        token: token.to_string(),
                    })
                }
            }
        }

        Ok(config)
    }
}

impl FromStr for TracerConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_trigger(value: &str) -> Result<TriggerSpec, ConfigError> {
    match value.split_once("::") {
        Some((class_name, field_name)) if !class_name.is_empty() && !field_name.is_empty() => Ok(TriggerSpec {
            class_name: class_name.to_string(),
            field_name: field_name.to_string(),
        }),
        _ => Err(ConfigError::InvalidTrigger { value: value.to_string() }),
    }
}
