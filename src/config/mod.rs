//! Configuration for tvctl.
//!
//! Settings are read from a TOML file; nothing in this crate writes
//! configuration back.

mod path;
mod settings;

pub use path::{default_config_path, expand_home, home_dir, resolve_config_path};
pub use settings::{DeviceEntry, Settings};
