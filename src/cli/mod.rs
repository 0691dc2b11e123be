//! CLI argument definitions.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::reconcile::Action;

/// tvctl - Control network TVs with a gallery (art) mode.
///
/// Robot Mode: Use --robot or --format=json for machine-parseable output.
#[derive(Parser, Debug)]
#[command(name = "tvctl", version, about, long_about = None)]
#[command(propagate_version = true)]
#[allow(clippy::struct_excessive_bools)] // CLI flags naturally use multiple bools
pub struct Cli {
    /// Output format (text for humans, json for agents/scripts)
    #[arg(
        long,
        short = 'f',
        default_value = "text",
        global = true,
        env = "TVCTL_FORMAT"
    )]
    pub format: OutputFormat,

    /// Robot mode: equivalent to --format=json
    #[arg(long, global = true)]
    pub robot: bool,

    /// Verbose output (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only errors are logged)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Config file (default: <config dir>/tvctl/config.toml)
    #[arg(long, global = true, env = "TVCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Drive an in-process simulated TV instead of the network
    #[arg(long, global = true, env = "TVCTL_SIMULATE")]
    pub simulate: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with optional color
    #[default]
    Text,
    /// JSON output for scripts and agents
    Json,
    /// Compact JSON (single line)
    JsonCompact,
}

impl Cli {
    /// Returns true if output should be JSON (robot mode or explicit --format=json).
    pub const fn use_json(&self) -> bool {
        self.robot || matches!(self.format, OutputFormat::Json | OutputFormat::JsonCompact)
    }

    /// Returns true if output should be compact JSON.
    pub const fn use_compact_json(&self) -> bool {
        matches!(self.format, OutputFormat::JsonCompact)
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // === Connectivity ===
    /// Check that a TV's control port is reachable
    Probe(ProbeArgs),

    /// Show power, art mode and slideshow state
    Status(TargetArgs),

    // === Power & Mode ===
    /// Turn the TV on or off
    Power(PowerArgs),

    /// Turn art mode on or off
    ArtMode(PowerArgs),

    /// Press a remote key
    Key(KeyArgs),

    // === Images ===
    /// Upload an image to My Photos
    Upload(UploadArgs),

    /// List stored images
    Images(ImagesArgs),

    /// Delete images (all of My Photos when no id is given)
    Delete(DeleteArgs),

    /// Show a stored image
    Select(SelectArgs),

    /// Show or change the TV's own rotation schedule
    AutoRotation(AutoRotationArgs),

    /// Cycle through stored images from this process
    Slideshow(SlideshowArgs),

    // === Configuration ===
    /// List devices from the config file
    Devices,

    /// Show effective configuration
    Config(ConfigArgs),

    // === Utilities ===
    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// === Argument Structs ===

/// Device selection shared by all device commands.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// TV address or configured device name
    #[arg(long, short = 'H', env = "TVCTL_HOST")]
    pub host: String,

    /// Control port (default from config, 8002)
    #[arg(long, short = 'p')]
    pub port: Option<u16>,
}

#[derive(Parser, Debug)]
pub struct ProbeArgs {
    /// TV address, optionally with port
    pub host: String,

    /// Control port
    #[arg(long, short = 'p')]
    pub port: Option<u16>,
}

#[derive(Parser, Debug)]
pub struct PowerArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Desired state
    #[arg(value_parser = parse_action)]
    pub action: Action,
}

#[derive(Parser, Debug)]
pub struct KeyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Key name, e.g. KEY_HOME
    pub key: String,
}

#[derive(Parser, Debug)]
pub struct UploadArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Image file (JPEG or PNG)
    pub file: PathBuf,

    /// Landscape matte (default from config)
    #[arg(long, default_value = "")]
    pub matte: String,

    /// Portrait matte (default from config)
    #[arg(long, default_value = "")]
    pub portrait_matte: String,
}

#[derive(Parser, Debug)]
pub struct ImagesArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Category: 2 = My Photos, 4 = Favorites, 8 = Store
    #[arg(long, short = 'c', default_value = "2")]
    pub category: u8,
}

#[derive(Parser, Debug)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Content ids to delete
    pub ids: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct SelectArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Content id to show
    pub id: String,
}

#[derive(Parser, Debug)]
pub struct AutoRotationArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Minutes between images (0 disables); omit to show current settings
    #[arg(long, short = 'i')]
    pub interval: Option<u32>,

    /// Shuffle order
    #[arg(long)]
    pub shuffle: bool,

    /// Category: 2 = My Photos, 4 = Favorites, 8 = Store
    #[arg(long, short = 'c', default_value = "2")]
    pub category: u8,
}

#[derive(Parser, Debug)]
pub struct SlideshowArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Seconds per image (default from config)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Shuffle order (default from config)
    #[arg(long)]
    pub shuffle: Option<bool>,

    /// Category: 2 = My Photos, 4 = Favorites, 8 = Store
    #[arg(long, short = 'c', default_value = "2")]
    pub category: u8,

    /// Stop after this many seconds (default: run until Ctrl-C)
    #[arg(long, short = 'd')]
    pub duration: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Only print the config file path
    #[arg(long)]
    pub path: bool,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

fn parse_action(s: &str) -> Result<Action, String> {
    s.parse::<Action>().map_err(|e| e.to_string())
}
