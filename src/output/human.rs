//! Human-friendly output implementation using `console` styling.

use console::style;
use tracing::{debug, instrument};

use crate::config::DeviceEntry;
use crate::controller::{Connection, Deleted, KeySent, ModeReport, OpFailure, PowerReport, Selected, StatusReport};
use crate::device::{AutoRotation, ImageAsset};
use crate::slideshow::SlideshowState;

use super::{ConfigReport, Output, ProbeReport, VersionInfo};

/// Styled terminal output implementation for human users.
#[derive(Debug, Default)]
pub struct HumanOutput;

impl HumanOutput {
    pub fn new() -> Self {
        debug!("Creating HumanOutput");
        Self
    }

    fn on_off(on: bool) -> String {
        if on {
            style("on").green().bold().to_string()
        } else {
            style("off").dim().to_string()
        }
    }

    fn label(text: &str) -> String {
        style(format!("{text:>12}")).cyan().to_string()
    }

    fn slideshow_line(state: &SlideshowState) -> String {
        if state.running {
            format!(
                "running, every {}s{}, {}",
                state.interval.as_secs_f64(),
                if state.shuffle { ", shuffled" } else { "" },
                state.category.id()
            )
        } else {
            style("stopped").dim().to_string()
        }
    }
}

impl Output for HumanOutput {
    fn success(&self, message: &str) {
        println!("{} {message}", style("[OK]").green().bold());
    }

    #[instrument(skip(self))]
    fn failure(&self, failure: &OpFailure) {
        debug!(
            kind = %failure.kind,
            recoverable = failure.recoverable,
            "Human: failure"
        );
        eprintln!(
            "{} {}",
            style("Error:").red().bold(),
            style(&failure.message).bold()
        );
        eprintln!("{} {}", style("  Kind:").dim(), failure.kind);
        if let Some(suggestion) = failure.suggestion {
            eprintln!("{} {suggestion}", style("  Hint:").yellow());
        }
    }

    fn info(&self, message: &str) {
        println!("{} {message}", style("[i]").blue());
    }

    fn probe(&self, report: &ProbeReport) {
        if report.result.ok {
            self.success(&report.result.message);
        } else {
            let class = report
                .result
                .classification
                .map_or_else(|| "failed".to_string(), |c| format!("{c:?}").to_lowercase());
            println!(
                "{} {} ({class})",
                style("[FAIL]").red().bold(),
                report.result.message
            );
        }
    }

    fn connection(&self, connection: &Connection) {
        let state = if connection.connected {
            "connected"
        } else {
            "disconnected"
        };
        self.success(&format!("{} {state}", connection.address));
    }

    fn status(&self, report: &StatusReport) {
        let raw = &report.status.raw;
        if let Some(name) = raw.name() {
            println!("{} {}", Self::label("Name"), style(name).bold());
        }
        if let Some(model) = raw.model_name() {
            println!("{} {model}", Self::label("Model"));
        }
        println!("{} {}", Self::label("Power"), Self::on_off(report.status.powered_on));
        println!("{} {}", Self::label("Art mode"), Self::on_off(report.status.mode_on));
        println!(
            "{} {}",
            Self::label("Slideshow"),
            Self::slideshow_line(&report.slideshow)
        );
    }

    fn power(&self, report: &PowerReport) {
        let verb = if report.command_sent {
            "Power is now"
        } else {
            "Power already"
        };
        self.success(&format!("{verb} {}", Self::on_off(report.powered_on)));
    }

    fn art_mode(&self, report: &ModeReport) {
        let verb = if report.command_sent {
            "Art mode is now"
        } else {
            "Art mode already"
        };
        self.success(&format!("{verb} {}", Self::on_off(report.mode_on)));
    }

    fn key_sent(&self, sent: &KeySent) {
        self.success(&format!("Sent {}", sent.key));
    }

    fn images(&self, images: &[ImageAsset]) {
        if images.is_empty() {
            self.info("No images");
            return;
        }
        for asset in images {
            println!(
                "  {}  {}",
                style(&asset.content_id).bold(),
                style(asset.created_at.format("%Y-%m-%d %H:%M:%S")).dim()
            );
        }
        println!("{}", style(format!("{} image(s)", images.len())).dim());
    }

    fn uploaded(&self, asset: &ImageAsset) {
        self.success(&format!("Uploaded as {}", style(&asset.content_id).bold()));
    }

    fn deleted(&self, deleted: &Deleted) {
        if deleted.content_ids.is_empty() {
            self.info("Nothing to delete");
        } else {
            self.success(&format!("Deleted {} image(s)", deleted.content_ids.len()));
        }
    }

    fn selected(&self, selected: &Selected) {
        self.success(&format!("Showing {}", selected.content_id));
    }

    fn auto_rotation(&self, rotation: &AutoRotation) {
        if rotation.interval_minutes == 0 {
            println!("{} {}", Self::label("Rotation"), style("off").dim());
        } else {
            println!(
                "{} every {} min{}, {}",
                Self::label("Rotation"),
                rotation.interval_minutes,
                if rotation.shuffle { ", shuffled" } else { "" },
                rotation.category.id()
            );
        }
    }

    fn slideshow(&self, state: &SlideshowState) {
        println!("{} {}", Self::label("Slideshow"), Self::slideshow_line(state));
        if let Some(exit) = &state.last_exit {
            println!("{} {exit:?}", Self::label("Ended"));
        }
    }

    fn devices(&self, devices: &[DeviceEntry], default_port: u16) {
        if devices.is_empty() {
            self.info("No devices configured");
            return;
        }
        for device in devices {
            println!(
                "  {}  {}:{}  {}",
                style(&device.name).bold(),
                device.host,
                device.port.unwrap_or(default_port),
                style(device.model.as_deref().unwrap_or("")).dim()
            );
        }
    }

    fn config(&self, report: &ConfigReport<'_>) {
        let suffix = if report.exists { "" } else { " (not found, using defaults)" };
        println!("{} {}{suffix}", Self::label("Config"), report.path);
        let s = report.settings;
        println!("{} {}", Self::label("Port"), s.command_port);
        println!("{} {}ms", Self::label("Probe"), s.probe_timeout_ms);
        println!("{} {}ms", Self::label("Device calls"), s.device_timeout_ms);
        println!("{} {}", Self::label("Matte"), s.default_matte);
        println!(
            "{} {} x {}ms",
            Self::label("Upload polls"),
            s.upload_attempts,
            s.upload_poll_delay_ms
        );
        println!(
            "{} {}s{}",
            Self::label("Slideshow"),
            s.slideshow_interval_secs,
            if s.slideshow_shuffle { ", shuffled" } else { "" }
        );
        println!("{} {}", Self::label("Devices"), s.devices.len());
    }

    fn version_info(&self, info: &VersionInfo) {
        println!("tvctl {}", info.version);
        println!(
            "git: {}{}",
            info.git_sha,
            if info.git_dirty { " (dirty)" } else { "" }
        );
        println!("built: {}", info.build_timestamp);
        println!("rustc: {}", info.rustc_version);
        println!("target: {}", info.target);
    }
}
