//! cliwork - typed command-line applications configured from flags, a
//! configuration file and the environment.
//!
//! An application declares an options struct, the flags that bind to its
//! fields, and a run callback. For every invocation the framework parses the
//! arguments, discovers the configuration file, merges all sources into the
//! options with a fixed precedence, runs the option hooks and finally calls
//! the callback.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Application and command builders, argument parsing
//! - [`engine`] - Resolution, option lifecycle and the executor state machine
//! - [`core`] - Flags, configuration discovery, formats and the key store
//! - [`ui`] - Diagnostic output and logging setup
//!
//! # Precedence
//!
//! Highest first: command-line flag, configuration file, environment
//! variable (`<PREFIX>_<KEY>`), flag default, compiled-in default.
//!
//! # Correctness Invariants
//!
//! 1. Validation reports every failure, never a subset
//! 2. A completion failure stops the run before validation
//! 3. No state survives an invocation; two apps in one process never share
//!    configuration

pub mod cli;
pub mod core;
pub mod engine;
pub mod ui;

pub use cli::{App, ArgsPolicy, Command};
pub use engine::{CliOptions, CompletableOptions, ExecContext, Invocation, PrintableOptions};
