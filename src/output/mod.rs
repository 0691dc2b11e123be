//! Output mode abstraction for robot and human output.

use serde::Serialize;

use crate::cli::Cli;
use crate::config::{DeviceEntry, Settings};
use crate::controller::{Connection, Deleted, KeySent, ModeReport, OpFailure, PowerReport, Selected, StatusReport};
use crate::device::{AutoRotation, DeviceAddress, ImageAsset};
use crate::probe::ConnectivityResult;
use crate::slideshow::SlideshowState;

pub mod human;
pub mod robot;

pub use human::HumanOutput;
pub use robot::RobotOutput;

/// Build metadata shown by `tvctl version`.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub version: &'static str,
    pub git_sha: &'static str,
    pub git_dirty: bool,
    pub build_timestamp: &'static str,
    pub rustc_version: &'static str,
    pub target: &'static str,
}

/// Result of `tvctl probe`.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub address: String,
    #[serde(flatten)]
    pub result: ConnectivityResult,
}

impl ProbeReport {
    pub fn new(address: &DeviceAddress, result: ConnectivityResult) -> Self {
        Self {
            address: address.to_string(),
            result,
        }
    }
}

/// Effective configuration for `tvctl config`.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigReport<'a> {
    pub path: String,
    pub exists: bool,
    pub settings: &'a Settings,
}

/// JSON formatting options for robot mode.
#[derive(Debug, Clone, Copy)]
pub enum RobotFormat {
    /// Pretty-printed JSON (default for --robot).
    Json,
    /// Single-line JSON (--format=json-compact).
    JsonCompact,
}

/// Determines how command output is rendered.
#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    /// JSON output for agents and scripting.
    Robot(RobotFormat),
    /// Styled terminal output for human users.
    Human,
}

impl OutputMode {
    /// Create OutputMode from CLI arguments.
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.use_json() {
            let format = if cli.use_compact_json() {
                RobotFormat::JsonCompact
            } else {
                RobotFormat::Json
            };
            Self::Robot(format)
        } else {
            if cli.no_color {
                console::set_colors_enabled(false);
                console::set_colors_enabled_stderr(false);
            }
            Self::Human
        }
    }

    /// Returns true if output should be JSON.
    pub const fn is_robot(&self) -> bool {
        matches!(self, Self::Robot(_))
    }

    /// Convert into the appropriate Output implementation.
    pub fn into_output(self) -> Box<dyn Output> {
        match self {
            Self::Robot(format) => Box::new(RobotOutput::new(format)),
            Self::Human => Box::new(HumanOutput::new()),
        }
    }
}

/// Trait for all output operations.
///
/// Commands call these methods without knowing the output mode.
pub trait Output {
    // Basic messages
    fn success(&self, message: &str);
    fn failure(&self, failure: &OpFailure);
    fn info(&self, message: &str);

    // Connectivity
    fn probe(&self, report: &ProbeReport);
    fn connection(&self, connection: &Connection);
    fn status(&self, report: &StatusReport);

    // Power & mode
    fn power(&self, report: &PowerReport);
    fn art_mode(&self, report: &ModeReport);
    fn key_sent(&self, sent: &KeySent);

    // Images
    fn images(&self, images: &[ImageAsset]);
    fn uploaded(&self, asset: &ImageAsset);
    fn deleted(&self, deleted: &Deleted);
    fn selected(&self, selected: &Selected);
    fn auto_rotation(&self, rotation: &AutoRotation);
    fn slideshow(&self, state: &SlideshowState);

    // Configuration
    fn devices(&self, devices: &[DeviceEntry], default_port: u16);
    fn config(&self, report: &ConfigReport<'_>);

    // Metadata
    fn version_info(&self, info: &VersionInfo);
}
