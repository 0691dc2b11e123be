//! Desired-versus-observed decision table shared by power and mode control.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TvError;

/// Requested transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    On,
    Off,
    Toggle,
}

impl Action {
    /// Whether a command must be sent to reach this action from `observed`.
    ///
    /// | action | observed | send |
    /// |--------|----------|------|
    /// | on     | true     | no   |
    /// | on     | false    | yes  |
    /// | off    | true     | yes  |
    /// | off    | false    | no   |
    /// | toggle | any      | yes  |
    pub const fn should_issue(self, observed: bool) -> bool {
        match self {
            Self::On => !observed,
            Self::Off => observed,
            Self::Toggle => true,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Toggle => "toggle",
        })
    }
}

impl FromStr for Action {
    type Err = TvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            "toggle" => Ok(Self::Toggle),
            other => Err(TvError::InvalidArgument(format!(
                "invalid action '{other}': use on, off or toggle"
            ))),
        }
    }
}
