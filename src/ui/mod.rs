//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Diagnostic printer and the configuration table
//! - [`logging`] - `tracing` subscriber setup
//!
//! # Design
//!
//! Diagnostics and logs are separate channels. Diagnostics go to the
//! invocation's writer and obey silent mode; logs go to standard error and
//! obey `RUST_LOG`.

pub mod logging;
pub mod output;
