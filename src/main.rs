//! tvctl - control network TVs with a gallery (art) mode.
//!
//! Provides both human-friendly and agent-friendly (robot mode) interfaces.
#![forbid(unsafe_code)]

use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use console::style;
use tracing::{debug, info};

use tvctl::cli::{self, Cli, Commands, TargetArgs};
use tvctl::config::{self, Settings};
use tvctl::controller::{Controller, OpFailure, OpResult};
use tvctl::device::mock::{MockConfig, MockFactory};
use tvctl::device::{DeviceAddress, NoTransport};
use tvctl::error::{ErrorKind, TvError};
use tvctl::logging;
use tvctl::output::{ConfigReport, Output, OutputMode, ProbeReport};
use tvctl::probe::{ConnectivityCheck, StaticProbe, TcpProbe};

/// Build information embedded at compile time.
mod build_info {
    use tvctl::output::VersionInfo;

    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn version_info() -> VersionInfo {
        VersionInfo {
            version: VERSION,
            git_sha: option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
            git_dirty: option_env!("VERGEN_GIT_DIRTY").unwrap_or("false") == "true",
            build_timestamp: option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown"),
            rustc_version: option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown"),
            target: option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown"),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.use_json(), cli.verbose, cli.quiet);

    let output = OutputMode::from_cli(&cli).into_output();
    match run(&cli, output.as_ref()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            output_error(output.as_ref(), &e);
            ExitCode::FAILURE
        }
    }
}

/// Runs the selected command. `Ok(false)` means the command ran and reported a failure.
async fn run(cli: &Cli, output: &dyn Output) -> anyhow::Result<bool> {
    let Some(command) = &cli.command else {
        print_quick_start(cli);
        return Ok(true);
    };

    match command {
        Commands::Version => {
            output.version_info(&build_info::version_info());
            return Ok(true);
        }
        Commands::Completions(args) => {
            cmd_completions(args);
            return Ok(true);
        }
        _ => {}
    }

    let config_path = config::resolve_config_path(cli.config.as_deref())?;
    let settings = Settings::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    debug!(path = %config_path.display(), devices = settings.devices.len(), "Settings loaded");

    match command {
        Commands::Devices => {
            output.devices(&settings.devices, settings.command_port);
            Ok(true)
        }
        Commands::Config(args) => {
            cmd_config(output, &config_path, &settings, args.path);
            Ok(true)
        }
        Commands::Probe(args) => cmd_probe(output, &settings, args).await,
        _ => {
            let controller = build_controller(cli.simulate, settings);
            let result = dispatch(&controller, command, output).await;
            let closed = controller.shutdown().await;
            debug!(closed, "Sessions closed");
            result
        }
    }
}

fn build_controller(simulate: bool, settings: Settings) -> Controller {
    if simulate {
        info!("Using simulated TV");
        Controller::new(
            Arc::new(MockFactory::new(MockConfig::demo())),
            Arc::new(StaticProbe::reachable()),
            settings,
        )
    } else {
        let probe = TcpProbe::new(settings.probe_timeout());
        Controller::new(Arc::new(NoTransport), Arc::new(probe), settings)
    }
}

async fn dispatch(
    controller: &Controller,
    command: &Commands,
    output: &dyn Output,
) -> anyhow::Result<bool> {
    let target = |t: &TargetArgs| -> Result<DeviceAddress, TvError> {
        controller.settings().resolve_target(&t.host, t.port)
    };

    let ok = match command {
        Commands::Status(args) => {
            let address = target(args)?;
            emit(output, controller.get_status(&address).await, |o, d| {
                o.status(d);
            })
        }
        Commands::Power(args) => {
            let address = target(&args.target)?;
            emit(output, controller.power_control(&address, args.action).await, |o, d| {
                o.power(d);
            })
        }
        Commands::ArtMode(args) => {
            let address = target(&args.target)?;
            emit(output, controller.mode_control(&address, args.action).await, |o, d| {
                o.art_mode(d);
            })
        }
        Commands::Key(args) => {
            let address = target(&args.target)?;
            emit(output, controller.send_key(&address, &args.key).await, |o, d| {
                o.key_sent(d);
            })
        }
        Commands::Upload(args) => {
            let address = target(&args.target)?;
            let bytes = tokio::fs::read(&args.file)
                .await
                .with_context(|| format!("reading {}", args.file.display()))?;
            let file_type = file_type_of(&args.file);
            let result = controller
                .upload_photo(&address, bytes, &file_type, &args.matte, &args.portrait_matte)
                .await;
            emit(output, result, |o, d| o.uploaded(d))
        }
        Commands::Images(args) => {
            let address = target(&args.target)?;
            emit(output, controller.list_images(&address, args.category).await, |o, d| {
                o.images(d);
            })
        }
        Commands::Delete(args) => {
            let address = target(&args.target)?;
            emit(output, controller.delete_images(&address, args.ids.clone()).await, |o, d| {
                o.deleted(d);
            })
        }
        Commands::Select(args) => {
            let address = target(&args.target)?;
            emit(output, controller.select_image(&address, &args.id).await, |o, d| {
                o.selected(d);
            })
        }
        Commands::AutoRotation(args) => {
            let address = target(&args.target)?;
            let result = match args.interval {
                Some(minutes) => {
                    controller
                        .set_auto_rotation(&address, minutes, args.shuffle, args.category)
                        .await
                }
                None => controller.get_auto_rotation(&address).await,
            };
            emit(output, result, |o, d| o.auto_rotation(d))
        }
        Commands::Slideshow(args) => cmd_slideshow(controller, output, args, target(&args.target)?).await,
        Commands::Probe(_)
        | Commands::Devices
        | Commands::Config(_)
        | Commands::Version
        | Commands::Completions(_) => true,
    };
    Ok(ok)
}

/// Render a successful result, or report its failure.
fn emit<T>(output: &dyn Output, result: OpResult<T>, render: impl FnOnce(&dyn Output, &T)) -> bool {
    match result.into_result() {
        Ok(data) => {
            render(output, &data);
            true
        }
        Err(failure) => {
            output.failure(&failure);
            false
        }
    }
}

async fn cmd_probe(output: &dyn Output, settings: &Settings, args: &cli::ProbeArgs) -> anyhow::Result<bool> {
    let address = settings.resolve_target(&args.host, args.port)?;
    let result = TcpProbe::new(settings.probe_timeout()).check(&address).await;
    let ok = result.ok;
    output.probe(&ProbeReport::new(&address, result));
    Ok(ok)
}

/// Run a slideshow until the duration elapses, Ctrl-C, or the TV leaves art mode.
async fn cmd_slideshow(
    controller: &Controller,
    output: &dyn Output,
    args: &cli::SlideshowArgs,
    address: DeviceAddress,
) -> bool {
    let settings = controller.settings();
    let interval = args
        .interval
        .map_or_else(|| settings.slideshow_interval(), Duration::from_secs);
    let shuffle = args.shuffle.unwrap_or(settings.slideshow_shuffle);

    let started = controller
        .start_slideshow(&address, interval, shuffle, args.category)
        .await;
    if !emit(output, started, |o, d| o.slideshow(d)) {
        return false;
    }

    let finished = async {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            ticker.tick().await;
            let state = controller.slideshow_status(&address).await;
            if state.data.is_some_and(|s| !s.running) {
                break;
            }
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        () = run_for(args.duration.map(Duration::from_secs)) => info!("Slideshow duration elapsed"),
        () = finished => info!("Slideshow ended on its own"),
    }

    emit(output, controller.stop_slideshow(&address).await, |o, d| {
        o.slideshow(d);
    })
}

async fn run_for(duration: Option<Duration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

fn cmd_config(output: &dyn Output, path: &Path, settings: &Settings, path_only: bool) {
    if path_only {
        println!("{}", path.display());
        return;
    }
    output.config(&ConfigReport {
        path: path.display().to_string(),
        exists: path.exists(),
        settings,
    });
}

fn cmd_completions(args: &cli::CompletionsArgs) {
    use clap::CommandFactory;
    clap_complete::generate(args.shell, &mut Cli::command(), "tvctl", &mut io::stdout());
}

/// File type from the extension, `jpeg` normalised to `jpg`.
fn file_type_of(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if ext == "jpeg" { "jpg".to_string() } else { ext }
}

fn output_error(output: &dyn Output, error: &anyhow::Error) {
    let failure = match error.downcast_ref::<TvError>() {
        Some(e) => {
            let mut failure = OpFailure::from(e);
            failure.message = format!("{error:#}");
            failure
        }
        None => OpFailure {
            message: format!("{error:#}"),
            kind: ErrorKind::OperationFailed,
            suggestion: None,
            recoverable: false,
        },
    };
    output.failure(&failure);
}

// === Quick Start (Robot Mode Optimized) ===

fn print_quick_start(cli: &Cli) {
    if cli.use_json() {
        let help = serde_json::json!({
            "tool": "tvctl",
            "version": build_info::VERSION,
            "description": "Control network TVs with a gallery (art) mode",
            "connectivity": {
                "probe": "tvctl probe <HOST>",
                "status": "tvctl status -H <HOST> --robot",
            },
            "control": {
                "power": "tvctl power -H <HOST> <on|off|toggle>",
                "art_mode": "tvctl art-mode -H <HOST> <on|off|toggle>",
                "key": "tvctl key -H <HOST> <KEY>",
            },
            "images": {
                "upload": "tvctl upload -H <HOST> <FILE>",
                "list": "tvctl images -H <HOST> [--category 2|4|8]",
                "delete": "tvctl delete -H <HOST> [IDS...]",
                "select": "tvctl select -H <HOST> <ID>",
                "slideshow": "tvctl slideshow -H <HOST> --interval <SECS> [--duration <SECS>]",
            },
            "output_modes": {
                "human": "--format=text (default)",
                "robot": "--robot or --format=json",
                "compact": "--format=json-compact",
            },
            "simulation": "Add --simulate to drive an in-process TV",
        });
        match serde_json::to_string_pretty(&help) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("{e}"),
        }
    } else {
        println!(
            "{} {} - TV control CLI\n",
            style("tvctl").bold().cyan(),
            build_info::VERSION
        );
        println!("{}", style("QUICK START").bold().underlined());
        println!();
        println!("  {}  Check reachability", style("tvctl probe 10.0.0.5").green());
        println!("  {}  Show state", style("tvctl status -H 10.0.0.5").green());
        println!("  {}  Wake the TV", style("tvctl power -H 10.0.0.5 on").green());
        println!("  {}  Gallery mode", style("tvctl art-mode -H 10.0.0.5 on").green());
        println!("  {}  Upload a photo", style("tvctl upload -H 10.0.0.5 cat.jpg").green());
        println!("  {}  Cycle photos", style("tvctl slideshow -H 10.0.0.5 -i 30").green());
        println!();
        println!(
            "{} Add {} for JSON output, {} to try without a TV",
            style("Tip:").yellow(),
            style("--robot").bold(),
            style("--simulate").bold()
        );
    }
}
