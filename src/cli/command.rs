//! cli::command
//!
//! Sub-command builder.
//!
//! A [`Command`] is one node of the command tree. It carries its own
//! options, run callback, argument policy and children. Each node resolves
//! its own options when it is the one selected on the command line.
//!
//! # Example
//!
//! ```
//! use cliwork::cli::args::ArgsPolicy;
//! use cliwork::cli::command::Command;
//! use cliwork::engine::NoOptions;
//!
//! let cmd = Command::new("greet NAME", "Print a greeting")
//!     .args(ArgsPolicy::Exact(1))
//!     .run(NoOptions::default(), |_, inv| {
//!         println!("hello {}", inv.args()[0]);
//!         Ok(())
//!     });
//!
//! assert_eq!(cmd.name(), "greet");
//! assert!(cmd.is_runnable());
//! ```

use std::fmt;

use super::args::ArgsPolicy;
use crate::engine::runner::{Action, Invocation, OptionsAction, RunFn};
use crate::engine::{CliOptions, NoOptions};

/// One node of the command tree.
pub struct Command {
    pub(crate) usage: String,
    pub(crate) short: String,
    pub(crate) long: Option<String>,
    pub(crate) args: ArgsPolicy,
    pub(crate) action: Option<Box<dyn Action>>,
    pub(crate) subcommands: Vec<Command>,
}

impl Command {
    /// `usage` is the one-line usage; its first word is the command name.
    pub fn new(usage: &str, short: &str) -> Self {
        Self {
            usage: usage.to_string(),
            short: short.to_string(),
            long: None,
            args: ArgsPolicy::default(),
            action: None,
            subcommands: Vec::new(),
        }
    }

    pub fn long(mut self, description: &str) -> Self {
        self.long = Some(description.to_string());
        self
    }

    pub fn args(mut self, policy: ArgsPolicy) -> Self {
        self.args = policy;
        self
    }

    /// Resolve `options` when selected, without a callback.
    pub fn options<O: CliOptions + 'static>(mut self, options: O) -> Self {
        self.action = Some(Box::new(OptionsAction::new(options, None)));
        self
    }

    /// Resolve `options` and pass them to `run`.
    pub fn run<O, F>(mut self, options: O, run: F) -> Self
    where
        O: CliOptions + 'static,
        F: FnOnce(&O, &Invocation) -> anyhow::Result<()> + 'static,
    {
        let run: RunFn<O> = Box::new(run);
        self.action = Some(Box::new(OptionsAction::new(options, Some(run))));
        self
    }

    /// Run a callback that takes no options.
    pub fn run_fn<F>(self, run: F) -> Self
    where
        F: FnOnce(&Invocation) -> anyhow::Result<()> + 'static,
    {
        self.run(NoOptions::default(), move |_: &NoOptions, inv: &Invocation| run(inv))
    }

    pub fn subcommand(mut self, cmd: Command) -> Self {
        self.subcommands.push(cmd);
        self
    }

    pub fn name(&self) -> &str {
        self.usage.split_whitespace().next().unwrap_or_default()
    }

    pub fn usage(&self) -> &str {
        &self.usage
    }

    /// False for grouping nodes that only print their help.
    pub fn is_runnable(&self) -> bool {
        self.action.is_some()
    }

    pub fn subcommands(&self) -> &[Command] {
        &self.subcommands
    }

    /// Detach the child called `name`.
    pub(crate) fn take_subcommand(&mut self, name: &str) -> Option<Command> {
        let index = self.subcommands.iter().position(|c| c.name() == name)?;
        Some(self.subcommands.remove(index))
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("usage", &self.usage)
            .field("short", &self.short)
            .field("args", &self.args)
            .field("runnable", &self.is_runnable())
            .field("subcommands", &self.subcommands)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_first_usage_word() {
        assert_eq!(Command::new("serve [flags]", "").name(), "serve");
        assert_eq!(Command::new("", "").name(), "");
    }

    #[test]
    fn grouping_node_is_not_runnable() {
        let cmd = Command::new("db", "Database commands")
            .subcommand(Command::new("migrate", "").run_fn(|_| Ok(())));
        assert!(!cmd.is_runnable());
        assert!(cmd.subcommands()[0].is_runnable());
    }

    #[test]
    fn take_subcommand_detaches_by_name() {
        let mut cmd = Command::new("db", "")
            .subcommand(Command::new("migrate", ""))
            .subcommand(Command::new("seed", ""));
        let seed = cmd.take_subcommand("seed").unwrap();
        assert_eq!(seed.name(), "seed");
        assert_eq!(cmd.subcommands().len(), 1);
        assert!(cmd.take_subcommand("seed").is_none());
    }
}
