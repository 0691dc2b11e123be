//! Robot mode JSON output implementation.
//!
//! Successful results are printed to stdout in the same
//! `{success, data}` envelope the controller returns; failures go to stderr.

use serde::Serialize;
use tracing::{debug, instrument, trace};

use crate::config::DeviceEntry;
use crate::controller::{Connection, Deleted, KeySent, ModeReport, OpFailure, OpResult, PowerReport, Selected, StatusReport};
use crate::device::{AutoRotation, ImageAsset};
use crate::slideshow::SlideshowState;

use super::{ConfigReport, Output, ProbeReport, RobotFormat, VersionInfo};

/// JSON output implementation for agents and scripting.
pub struct RobotOutput {
    format: RobotFormat,
}

impl RobotOutput {
    #[instrument]
    pub fn new(format: RobotFormat) -> Self {
        debug!(?format, "Creating RobotOutput");
        Self { format }
    }

    fn render<T: Serialize + ?Sized>(&self, data: &T) -> String {
        let rendered = match self.format {
            RobotFormat::Json => serde_json::to_string_pretty(data),
            RobotFormat::JsonCompact => serde_json::to_string(data),
        };
        rendered.unwrap_or_else(|e| {
            format!(r#"{{"success":false,"error":"serialization failed: {e}"}}"#)
        })
    }

    /// Print any serializable data as JSON to stdout.
    fn output_json<T: Serialize + ?Sized>(&self, data: &T) {
        let json = self.render(data);
        trace!(json_len = json.len(), "JSON serialized");
        println!("{json}");
    }

    /// Print `data` wrapped in a success envelope.
    fn output_data<T: Serialize>(&self, data: T) {
        self.output_json(&OpResult::ok(data));
    }
}

impl Output for RobotOutput {
    fn success(&self, message: &str) {
        self.output_json(&serde_json::json!({
            "success": true,
            "message": message
        }));
    }

    #[instrument(skip(self))]
    fn failure(&self, failure: &OpFailure) {
        debug!(error = %failure, "Robot: failure");
        let json = self.render(&serde_json::json!({
            "success": false,
            "error": failure.message,
            "errorType": failure.kind,
            "suggestion": failure.suggestion,
            "recoverable": failure.recoverable,
        }));
        eprintln!("{json}");
    }

    fn info(&self, message: &str) {
        self.output_json(&serde_json::json!({
            "info": true,
            "message": message
        }));
    }

    fn probe(&self, report: &ProbeReport) {
        self.output_json(&serde_json::json!({
            "success": report.result.ok,
            "data": report
        }));
    }

    fn connection(&self, connection: &Connection) {
        self.output_data(connection);
    }

    fn status(&self, report: &StatusReport) {
        self.output_data(report);
    }

    fn power(&self, report: &PowerReport) {
        self.output_data(report);
    }

    fn art_mode(&self, report: &ModeReport) {
        self.output_data(report);
    }

    fn key_sent(&self, sent: &KeySent) {
        self.output_data(sent);
    }

    #[instrument(skip(self, images), fields(count = images.len()))]
    fn images(&self, images: &[ImageAsset]) {
        self.output_data(images);
    }

    fn uploaded(&self, asset: &ImageAsset) {
        self.output_data(asset);
    }

    fn deleted(&self, deleted: &Deleted) {
        self.output_data(deleted);
    }

    fn selected(&self, selected: &Selected) {
        self.output_data(selected);
    }

    fn auto_rotation(&self, rotation: &AutoRotation) {
        self.output_data(rotation);
    }

    fn slideshow(&self, state: &SlideshowState) {
        self.output_data(state);
    }

    fn devices(&self, devices: &[DeviceEntry], _default_port: u16) {
        self.output_data(devices);
    }

    fn config(&self, report: &ConfigReport<'_>) {
        self.output_data(report);
    }

    fn version_info(&self, info: &VersionInfo) {
        self.output_json(info);
    }
}
