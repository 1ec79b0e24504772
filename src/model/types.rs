//! Core configuration types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifies one configuration entry: (service, config_name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key {
    pub service: String,
    pub config_name: String,
}

impl Key {
    pub fn new(service: impl Into<String>, config_name: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            config_name: config_name.into(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service, self.config_name)
    }
}

/// What kind of entry a config is.
///
/// Derived from which kill-switch id set (if any) the name appeared in at
/// write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    DynamicConfig,
    KillSwitchEnabled,
    KillSwitchDisabled,
}

impl Mode {
    /// Wire and database name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::DynamicConfig => "dynamic_config",
            Mode::KillSwitchEnabled => "kill_switch_enabled",
            Mode::KillSwitchDisabled => "kill_switch_disabled",
        }
    }

    pub fn is_kill_switch(&self) -> bool {
        match self {
            Mode::DynamicConfig => false,
            Mode::KillSwitchEnabled | Mode::KillSwitchDisabled => true,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the known mode names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown config mode '{0}'")]
pub struct ParseModeError(pub String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dynamic_config" => Ok(Mode::DynamicConfig),
            "kill_switch_enabled" => Ok(Mode::KillSwitchEnabled),
            "kill_switch_disabled" => Ok(Mode::KillSwitchDisabled),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

/// A single stored configuration row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: Key,
    pub value: serde_json::Value,
    pub mode: Mode,
    /// Store write time. Sole ordering and staleness signal.
    pub updated_at: DateTime<Utc>,
}

/// Rejections raised before any store call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is absent or empty.
    #[error("{}", missing_fields_message(.fields))]
    MissingRequiredField { fields: &'static [&'static str] },

    /// A kill-switch id does not name a submitted config.
    #[error(
        "Fields 'kill_switches_enabled' and 'kill_switches_disabled' must consist of ids from 'configs' field"
    )]
    UnknownKillSwitchId { ids: Vec<String> },

    /// The enabled and disabled kill-switch sets intersect.
    #[error("Ids in 'kill_switches_enabled' and 'kill_switches_disabled' must not overlap")]
    KillSwitchSetOverlap { ids: Vec<String> },
}

impl ValidationError {
    /// Error code reported to callers.
    pub fn code(&self) -> &'static str {
        "400"
    }
}

fn missing_fields_message(fields: &[&str]) -> String {
    let quoted: Vec<String> = fields.iter().map(|f| format!("'{}'", f)).collect();
    match quoted.as_slice() {
        [single] => format!("Field {} is required", single),
        [init @ .., last] => format!("Fields {} and {} are required", init.join(", "), last),
        [] => "Required field is missing".to_string(),
    }
}
