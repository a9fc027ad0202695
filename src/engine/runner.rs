//! engine::runner
//!
//! The command executor: the single path from parsed arguments to the
//! user's callback.
//!
//! # Architecture
//!
//! Every invocation walks one state machine:
//!
//! ```text
//! ParsingArgs -> ResolvingConfig -> RunningLifecycle -> Invoking -> Done
//!      \               \                  \                 \
//!       +---------------+------------------+-----------------+--> Failed
//! ```
//!
//! The argument parser lives in [`crate::cli`]; it reports into the same
//! [`Executor`] so the trace covers the whole run. The cancel token is
//! checked before every transition.
//!
//! # Invariants
//!
//! - `Done` is reached only when the callback returned `Ok` (or there was no
//!   callback to run)
//! - Every failure ends in `Failed` and yields exactly one [`RunError`]
//! - Options are populated before any hook runs, and hooks run before the
//!   callback

use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use super::cancel::CancelToken;
use super::capabilities::{Capability, CapabilitySet};
use super::lifecycle::{apply_option_rules, LifecycleError};
use super::options::{AggregateError, CliOptions};
use super::resolve::{resolve, ResolutionResult, ResolveError};
use super::ExecContext;
use crate::core::config::{ConfigError, ConfigSource, Discovery};
use crate::core::flags::{FlagError, MergedFlagSet, NamedFlagSets};
use crate::ui::output::Printer;

/// States of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    ParsingArgs,
    ResolvingConfig,
    RunningLifecycle,
    Invoking,
    Done,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }

    fn label(&self) -> &'static str {
        match self {
            Phase::ParsingArgs => "parsing arguments",
            Phase::ResolvingConfig => "resolving configuration",
            Phase::RunningLifecycle => "running option hooks",
            Phase::Invoking => "running command",
            Phase::Done => "done",
            Phase::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors that end an invocation in `Failed`.
#[derive(Debug, Error)]
pub enum RunError {
    /// Malformed command line, including positional-argument policy failures.
    #[error("{0}")]
    ArgumentParse(String),

    /// Configuration file missing, unreadable or malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Two flags share a name or shorthand.
    #[error(transparent)]
    DuplicateFlag(FlagError),

    /// Merged values do not fit the options type.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Completion(anyhow::Error),

    #[error(transparent)]
    Validation(AggregateError),

    /// The user's callback failed; its error is carried unchanged.
    #[error(transparent)]
    Callback(anyhow::Error),

    #[error("cancelled while {0}")]
    Cancelled(Phase),

    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl RunError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

impl From<LifecycleError> for RunError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Completion(e) => RunError::Completion(e),
            LifecycleError::Validation(e) => RunError::Validation(e),
        }
    }
}

/// What a run callback sees besides its options.
#[derive(Debug, Clone)]
pub struct Invocation {
    basename: String,
    command_path: Vec<String>,
    args: Vec<String>,
    cancel: CancelToken,
}

impl Invocation {
    pub fn new(basename: &str, command_path: Vec<String>, args: Vec<String>) -> Self {
        Self {
            basename: basename.to_string(),
            command_path,
            args,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Space-separated path from the root command, e.g. `demo server start`.
    pub fn command_path(&self) -> String {
        self.command_path.join(" ")
    }

    /// Positional arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A run callback over populated options.
pub type RunFn<O> = Box<dyn FnOnce(&O, &Invocation) -> anyhow::Result<()>>;

/// One command's options and callback with the options type erased.
pub trait Action {
    /// Flag groups to register, empty when the options declare none.
    fn flag_sets(&self) -> NamedFlagSets;

    fn capabilities(&self) -> &CapabilitySet;

    fn resolve(
        &mut self,
        flags: &MergedFlagSet,
        source: &ConfigSource,
    ) -> Result<ResolutionResult, ResolveError>;

    fn apply_rules(&mut self, silent: bool) -> Result<Option<String>, LifecycleError>;

    /// `false` if there is no callback, in which case [`Action::invoke`]
    /// does nothing.
    fn has_callback(&self) -> bool;

    fn invoke(self: Box<Self>, invocation: &Invocation) -> anyhow::Result<()>;
}

/// [`Action`] over a concrete options type.
pub struct OptionsAction<O> {
    options: O,
    caps: CapabilitySet,
    run: Option<RunFn<O>>,
}

impl<O: CliOptions> OptionsAction<O> {
    /// Probe `options` once and keep the result for every later call.
    pub fn new(mut options: O, run: Option<RunFn<O>>) -> Self {
        let caps = CapabilitySet::probe(&mut options);
        trace!(capabilities = caps.len(), "probed options");
        Self { options, caps, run }
    }

    pub fn options(&self) -> &O {
        &self.options
    }
}

impl<O: CliOptions> Action for OptionsAction<O> {
    fn flag_sets(&self) -> NamedFlagSets {
        if self.caps.has(Capability::Flags) {
            self.options.flags()
        } else {
            NamedFlagSets::new()
        }
    }

    fn capabilities(&self) -> &CapabilitySet {
        &self.caps
    }

    fn resolve(
        &mut self,
        flags: &MergedFlagSet,
        source: &ConfigSource,
    ) -> Result<ResolutionResult, ResolveError> {
        resolve(&mut self.options, flags, source)
    }

    fn apply_rules(&mut self, silent: bool) -> Result<Option<String>, LifecycleError> {
        apply_option_rules(&mut self.options, &self.caps, silent)
    }

    fn has_callback(&self) -> bool {
        self.run.is_some()
    }

    fn invoke(self: Box<Self>, invocation: &Invocation) -> anyhow::Result<()> {
        let Self { options, run, .. } = *self;
        match run {
            Some(run) => run(&options, invocation),
            None => Ok(()),
        }
    }
}

/// Everything the executor needs once arguments are parsed.
pub struct Request {
    /// Flags with their parsed values and changed bits.
    pub flags: MergedFlagSet,

    /// `None` when the configuration file is disabled.
    pub discovery: Option<Discovery>,

    pub invocation: Invocation,

    pub silent: bool,

    /// Application name for the `Starting` line.
    pub name: String,

    /// Rendered version for diagnostics; `None` when versioning is disabled.
    pub version: Option<String>,
}

/// Result of a finished invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Every phase entered, in order, ending with `Done`.
    pub trace: Vec<Phase>,

    /// `None` when the run stopped before resolution (help, version).
    pub resolution: Option<ResolutionResult>,
}

impl Outcome {
    pub fn visited(&self, phase: Phase) -> bool {
        self.trace.contains(&phase)
    }

    pub fn final_phase(&self) -> Phase {
        self.trace.last().copied().unwrap_or(Phase::ParsingArgs)
    }
}

/// Drives one invocation through its phases.
#[derive(Debug)]
pub struct Executor {
    phase: Phase,
    trace: Vec<Phase>,
    cancel: CancelToken,
    resolution: Option<ResolutionResult>,
}

impl Executor {
    /// Start in `ParsingArgs`.
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            phase: Phase::ParsingArgs,
            trace: vec![Phase::ParsingArgs],
            cancel,
            resolution: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn trace(&self) -> &[Phase] {
        &self.trace
    }

    /// Move to `next`, unless cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns `RunError::Cancelled` naming the phase being left.
    pub fn advance(&mut self, next: Phase) -> Result<(), RunError> {
        if self.cancel.is_cancelled() {
            debug!(phase = %self.phase, "cancellation requested");
            return Err(RunError::Cancelled(self.phase));
        }
        debug!(from = %self.phase, to = %next, "transition");
        self.phase = next;
        self.trace.push(next);
        Ok(())
    }

    /// Enter `Failed` and hand back `err`.
    pub fn fail(&mut self, err: RunError) -> RunError {
        debug!(phase = %self.phase, error = %err, "invocation failed");
        self.phase = Phase::Failed;
        self.trace.push(Phase::Failed);
        err
    }

    /// Run from `ResolvingConfig` to `Done`.
    ///
    /// Diagnostics go to `out` in a fixed order: working directory,
    /// configuration file and table, explicit flags, name and version,
    /// options summary.
    pub fn execute(
        &mut self,
        action: Box<dyn Action>,
        request: Request,
        ctx: &ExecContext,
        out: &mut dyn Write,
    ) -> Result<(), RunError> {
        self.run_phases(action, request, ctx, out)
            .map_err(|err| self.fail(err))
    }

    fn run_phases(
        &mut self,
        mut action: Box<dyn Action>,
        request: Request,
        ctx: &ExecContext,
        out: &mut dyn Write,
    ) -> Result<(), RunError> {
        let Request {
            flags,
            discovery,
            invocation,
            silent,
            name,
            version,
        } = request;
        let mut printer = Printer::new(out, silent);

        self.advance(Phase::ResolvingConfig)?;
        let source = match &discovery {
            Some(discovery) => ConfigSource::load(discovery, ctx.env.clone())?,
            None => ConfigSource::without_file(invocation.basename(), ctx.env.clone()),
        };
        let resolution = action.resolve(&flags, &source)?;

        if !printer.is_silent() {
            printer.working_dir(&working_dir(ctx)?)?;
            printer.config_file(source.file_used(), &config_rows(&source))?;
            printer.flags(
                resolution
                    .explicit
                    .iter()
                    .map(|f| (f.name.as_str(), f.value.as_str())),
            )?;
            printer.starting(&name, version.as_deref())?;
        }
        self.resolution = Some(resolution);

        self.advance(Phase::RunningLifecycle)?;
        if let Some(summary) = action.apply_rules(silent)? {
            printer.summary(&summary)?;
        }

        self.advance(Phase::Invoking)?;
        if action.has_callback() {
            trace!(command = %invocation.command_path(), "invoking callback");
            action.invoke(&invocation).map_err(RunError::Callback)?;
        }

        self.advance(Phase::Done)
    }

    /// End without resolving, for help and version output.
    pub fn finish_early(mut self) -> Outcome {
        self.phase = Phase::Done;
        self.trace.push(Phase::Done);
        self.finish()
    }

    pub fn finish(self) -> Outcome {
        Outcome {
            trace: self.trace,
            resolution: self.resolution,
        }
    }
}

fn working_dir(ctx: &ExecContext) -> io::Result<PathBuf> {
    match &ctx.cwd {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir(),
    }
}

fn config_rows(source: &ConfigSource) -> Vec<(String, String)> {
    source
        .file_values()
        .iter()
        .map(|(key, value)| {
            let shown = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), shown)
        })
        .collect()
}
