//! cli
//!
//! Command-line layer: the application and command builders, and their
//! translation to `clap`.
//!
//! # Responsibilities
//!
//! - Build the command tree and its flags (built-in `global` group first)
//! - Parse arguments and select the command to run
//! - Handle `--help` and `--version` before any configuration is read
//! - Hand the selected command to the [`crate::engine`] executor
//!
//! # Architecture
//!
//! The CLI layer is thin. Everything after argument parsing (configuration
//! discovery, resolution, the option hooks and the callback) happens in the
//! engine.

pub mod app;
pub mod args;
pub mod build;
pub mod command;
pub mod version;

pub use app::App;
pub use args::ArgsPolicy;
pub use command::Command;
