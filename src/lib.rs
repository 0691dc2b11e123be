//! tvctl library - per-device control sessions for network TVs with an art mode.
//!
//! This library exposes the core functionality of the `tvctl` CLI for use in tests
//! and other front ends.
//!
//! # Modules
//!
//! - `device`: Channel traits, device data types and the simulated TV
//! - `probe`: TCP connectivity check with failure classification
//! - `session`: One device's connection lifecycle and operations
//! - `reconcile`: Desired-vs-observed power and mode transitions
//! - `slideshow`: Cancellable background image rotation
//! - `upload`: Upload with bounded confirmation polling
//! - `registry`: Per-address session map
//! - `controller`: Operations for front ends, returning uniform results
//! - `error`: Error types with user-recoverable hints
//! - `output`: Output mode abstraction (robot/human)
//! - `config`: Configuration file handling
#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod logging;
pub mod output;
pub mod probe;
pub mod reconcile;
pub mod registry;
pub mod retry;
pub mod session;
pub mod slideshow;
pub mod upload;
