//! engine
//!
//! Resolves configuration into options and runs the option lifecycle.
//!
//! # Architecture
//!
//! The engine sits between the argument parser ([`crate::cli`]) and the
//! user's callback. For one invocation it:
//!
//! 1. **Resolves**: merges flags, the configuration file and the
//!    environment into the options object ([`resolve`])
//! 2. **Applies rules**: complete, validate, describe ([`lifecycle`])
//! 3. **Invokes**: hands the populated options to the callback ([`runner`])
//!
//! # Invariants
//!
//! - Precedence is flag > file > environment > flag default > struct default
//! - Validation failures are reported in full, never truncated
//! - A completion failure stops the run before validation
//! - Nothing persists between invocations; all state lives in an
//!   [`ExecContext`] and the executor created for the run
//!
//! # Example
//!
//! ```
//! use cliwork::engine::ExecContext;
//!
//! let ctx = ExecContext::default();
//! assert!(ctx.cwd.is_none());
//! assert!(!ctx.cancel.is_cancelled());
//! ```

pub mod cancel;
pub mod capabilities;
pub mod lifecycle;
pub mod options;
pub mod resolve;
pub mod runner;

use std::path::PathBuf;

use crate::core::config::env::Environment;
use crate::core::config::DEFAULT_SYSTEM_ROOT;

pub use cancel::CancelToken;
pub use capabilities::{Capability, CapabilitySet};
pub use lifecycle::{apply_option_rules, LifecycleError};
pub use options::{AggregateError, CliOptions, CompletableOptions, NoOptions, PrintableOptions};
pub use resolve::{resolve, ExplicitFlag, ResolutionResult, ResolveError};
pub use runner::{Action, Executor, Invocation, OptionsAction, Outcome, Phase, Request, RunError};

/// Inputs of one invocation that do not come from the command line.
#[derive(Debug, Clone)]
pub struct ExecContext {
    /// Working directory for discovery and diagnostics (None = process cwd).
    pub cwd: Option<PathBuf>,

    /// Environment used for `<PREFIX>_<KEY>` lookups.
    pub env: Environment,

    /// Root of the system configuration directories.
    pub system_root: PathBuf,

    pub cancel: CancelToken,
}

impl Default for ExecContext {
    fn default() -> Self {
        Self {
            cwd: None,
            env: Environment::process(),
            system_root: PathBuf::from(DEFAULT_SYSTEM_ROOT),
            cancel: CancelToken::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod context {
        use super::*;

        #[test]
        fn default_values() {
            let ctx = ExecContext::default();
            assert!(ctx.cwd.is_none());
            assert_eq!(ctx.env, Environment::Process);
            assert_eq!(ctx.system_root, PathBuf::from("/etc"));
        }

        #[test]
        fn clones_share_cancellation() {
            let ctx = ExecContext::default();
            let copy = ctx.clone();
            ctx.cancel.cancel();
            assert!(copy.cancel.is_cancelled());
        }
    }

    mod run_error {
        use super::*;

        #[test]
        fn display_formatting() {
            let err = RunError::Cancelled(Phase::Invoking);
            assert_eq!(err.to_string(), "cancelled while running command");

            let err = RunError::ArgumentParse("unexpected argument 'x'".into());
            assert_eq!(err.to_string(), "unexpected argument 'x'");
            assert_eq!(err.exit_code(), 1);
        }
    }
}
