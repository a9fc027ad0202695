//! cli::app
//!
//! The application builder and process entry point.
//!
//! # Example
//!
//! ```
//! use cliwork::cli::App;
//! use cliwork::core::config::env::Environment;
//! use cliwork::core::flags::NamedFlagSets;
//! use cliwork::engine::{CliOptions, ExecContext};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! #[serde(default)]
//! struct Options { name: String }
//!
//! impl CliOptions for Options {
//!     fn flags(&self) -> NamedFlagSets {
//!         let mut fss = NamedFlagSets::new();
//!         fss.flag_set("generic").string("name", "world", "Who to greet.");
//!         fss
//!     }
//!     fn validate(&self) -> Vec<anyhow::Error> { Vec::new() }
//! }
//!
//! let app = App::new("Greeter", "greeter")
//!     .silence()
//!     .no_config()
//!     .run(Options::default(), |opts, _| {
//!         assert_eq!(opts.name, "rust");
//!         Ok(())
//!     });
//!
//! let ctx = ExecContext {
//!     env: Environment::fixed([("GREETER_NAME", "rust")]),
//!     ..ExecContext::default()
//! };
//! let outcome = app.try_run_with_output(["greeter"], ctx, &mut std::io::sink()).unwrap();
//! assert!(outcome.resolution.is_some());
//! ```

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::error::ErrorKind;
use tracing::debug;

use super::args::{format_basename, ArgsPolicy};
use super::build::{self, NodeSpec, CONFIG_FLAG};
use super::command::Command;
use super::version::{self, VersionInfo, VersionMode};
use crate::core::config::Discovery;
use crate::core::flags::{FlagError, NamedFlagSets};
use crate::engine::runner::{Action, Executor, Invocation, OptionsAction, Outcome, Request};
use crate::engine::{CliOptions, ExecContext, NoOptions, RunError};

/// A command-line application: a root command plus framework settings.
#[derive(Debug)]
pub struct App {
    name: String,
    basename: String,
    version: String,
    silence: bool,
    no_version: bool,
    no_config: bool,
    root: Command,
}

enum Parsed {
    /// Help or version was printed.
    Finished,
    Run(Box<dyn Action>, Request),
}

impl App {
    /// `name` is the human name shown in diagnostics; `basename` is the
    /// binary name used for the config file and the environment prefix.
    pub fn new(name: &str, basename: &str) -> Self {
        let basename = format_basename(basename);
        Self {
            name: name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            silence: false,
            no_version: false,
            no_config: false,
            root: Command::new(&basename, name),
            basename,
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.root = self.root.long(description);
        self
    }

    /// Version reported by `--version` and the startup diagnostics.
    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Resolve `options` on every run, without a callback.
    pub fn options<O: CliOptions + 'static>(mut self, options: O) -> Self {
        self.root = self.root.options(options);
        self
    }

    pub fn run<O, F>(mut self, options: O, run: F) -> Self
    where
        O: CliOptions + 'static,
        F: FnOnce(&O, &Invocation) -> anyhow::Result<()> + 'static,
    {
        self.root = self.root.run(options, run);
        self
    }

    pub fn run_fn<F>(mut self, run: F) -> Self
    where
        F: FnOnce(&Invocation) -> anyhow::Result<()> + 'static,
    {
        self.root = self.root.run_fn(run);
        self
    }

    pub fn args(mut self, policy: ArgsPolicy) -> Self {
        self.root = self.root.args(policy);
        self
    }

    pub fn command(mut self, cmd: Command) -> Self {
        self.root = self.root.subcommand(cmd);
        self
    }

    /// Suppress startup diagnostics and the options summary.
    pub fn silence(mut self) -> Self {
        self.silence = true;
        self
    }

    /// Do not register `--version`.
    pub fn no_version(mut self) -> Self {
        self.no_version = true;
        self
    }

    /// Do not register `--config` and skip file discovery.
    ///
    /// Without this a run fails when no configuration file is found.
    pub fn no_config(mut self) -> Self {
        self.no_config = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Run with the process arguments and environment, exiting the process
    /// with status 1 on failure.
    pub fn run_process(self) {
        crate::ui::logging::init(None);
        if let Err(err) = self.try_run_from(std::env::args_os(), ExecContext::default()) {
            eprintln!("Error: {}", err);
            std::process::exit(err.exit_code());
        }
    }

    /// Run with `args` (including the binary name), writing diagnostics
    /// and help to standard output.
    ///
    /// # Errors
    ///
    /// Returns the [`RunError`] that ended the invocation.
    pub fn try_run_from<I, T>(self, args: I, ctx: ExecContext) -> Result<Outcome, RunError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        self.try_run_with_output(args, ctx, &mut io::stdout())
    }

    /// Like [`App::try_run_from`], writing to `out`.
    ///
    /// # Errors
    ///
    /// Returns the [`RunError`] that ended the invocation.
    pub fn try_run_with_output<I, T>(
        self,
        args: I,
        ctx: ExecContext,
        out: &mut dyn Write,
    ) -> Result<Outcome, RunError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut exec = Executor::new(ctx.cancel.clone());
        match self.parse(args, &ctx, out) {
            Ok(Parsed::Finished) => Ok(exec.finish_early()),
            Ok(Parsed::Run(action, request)) => {
                exec.execute(action, request, &ctx, out)?;
                Ok(exec.finish())
            }
            Err(err) => Err(exec.fail(err)),
        }
    }

    fn parse<I, T>(self, args: I, ctx: &ExecContext, out: &mut dyn Write) -> Result<Parsed, RunError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let App {
            name,
            basename,
            version,
            silence,
            no_version,
            no_config,
            mut root,
        } = self;
        if root.action.is_none() && root.subcommands.is_empty() {
            root.action = Some(Box::new(OptionsAction::new(NoOptions::default(), None)));
        }

        let global = build::global_flags(&basename, !no_config, !no_version);
        let mut clap_root = clap_tree(&root, &global, true).map_err(RunError::DuplicateFlag)?;

        let matches = match clap_root.try_get_matches_from_mut(args) {
            Ok(matches) => matches,
            Err(err) if is_help(err.kind()) => {
                write!(out, "{}", err.render())?;
                return Ok(Parsed::Finished);
            }
            Err(err) => return Err(RunError::ArgumentParse(first_line(&err))),
        };

        let mut path = vec![root.name().to_string()];
        let mut node = root;
        let mut clap_node = &mut clap_root;
        let mut leaf_matches = &matches;
        while let Some((sub, sub_matches)) = leaf_matches.subcommand() {
            let unknown = || RunError::ArgumentParse(format!("unknown command {:?}", sub));
            node = node.take_subcommand(sub).ok_or_else(unknown)?;
            clap_node = clap_node.find_subcommand_mut(sub).ok_or_else(unknown)?;
            path.push(sub.to_string());
            leaf_matches = sub_matches;
        }
        let command_path = path.join(" ");
        debug!(command = %command_path, "selected command");

        let mut flags = build::node_flags(&global, node.action.as_deref())
            .map_err(RunError::DuplicateFlag)?;
        build::extract(leaf_matches, &mut flags)
            .map_err(|e: FlagError| RunError::ArgumentParse(e.to_string()))?;

        let info = VersionInfo::new(&name, &version);
        if !no_version {
            if let Some(flag) = flags.lookup(version::FLAG_NAME).filter(|f| f.is_changed()) {
                let raw = flag.value().to_string();
                let mode = VersionMode::parse(&raw).ok_or_else(|| {
                    RunError::ArgumentParse(format!(
                        "invalid argument {:?} for \"--{}\" flag",
                        raw,
                        version::FLAG_NAME
                    ))
                })?;
                if let Some(text) = info.render(mode) {
                    writeln!(out, "{}", text)?;
                    return Ok(Parsed::Finished);
                }
            }
        }

        let Some(action) = node.action.take() else {
            write!(out, "{}", clap_node.render_help())?;
            return Ok(Parsed::Finished);
        };

        let positional = build::positional(leaf_matches);
        node.args
            .check(&command_path, &positional)
            .map_err(RunError::ArgumentParse)?;

        let discovery = if no_config {
            None
        } else {
            let explicit = flags
                .lookup(CONFIG_FLAG)
                .filter(|f| f.is_changed())
                .map(|f| PathBuf::from(f.value().to_string()));
            let mut discovery = Discovery::new(basename.clone())
                .explicit(explicit)
                .system_root(ctx.system_root.clone())
                .required(true);
            if let Some(cwd) = &ctx.cwd {
                discovery = discovery.cwd(cwd.clone());
            }
            Some(discovery)
        };

        let invocation =
            Invocation::new(&basename, path, positional).with_cancel(ctx.cancel.clone());
        Ok(Parsed::Run(
            action,
            Request {
                flags,
                discovery,
                invocation,
                silent: silence,
                name,
                version: (!no_version).then(|| info.to_json()),
            },
        ))
    }
}

fn clap_tree(
    node: &Command,
    global: &NamedFlagSets,
    root: bool,
) -> Result<clap::Command, FlagError> {
    let flags = build::node_flags(global, node.action.as_deref())?;
    let leaf = node.subcommands.is_empty();
    let mut cmd = build::clap_command(NodeSpec {
        name: node.name(),
        about: &node.short,
        long_about: node.long.as_deref(),
        flags: &flags,
        root,
        positional: leaf,
        show_positional: node.args.accepts_any(),
    });
    for sub in &node.subcommands {
        cmd = cmd.subcommand(clap_tree(sub, global, false)?);
    }
    Ok(cmd)
}

fn is_help(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
    )
}

/// The error line of a clap error, without usage or the `error:` prefix.
fn first_line(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    let line = rendered.lines().next().unwrap_or_default();
    line.strip_prefix("error: ").unwrap_or(line).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::env::Environment;
    use crate::core::config::ConfigError;
    use crate::engine::Phase;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ctx() -> ExecContext {
        ExecContext {
            cwd: Some(std::env::temp_dir()),
            env: Environment::fixed(Vec::<(String, String)>::new()),
            system_root: PathBuf::from("/nonexistent"),
            ..ExecContext::default()
        }
    }

    fn run(app: App, args: &[&str]) -> (Result<Outcome, RunError>, String) {
        let mut out = Vec::new();
        let result = app.try_run_with_output(args.iter().copied(), ctx(), &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn bare_app_resolves_and_finishes() {
        let (result, _) = run(App::new("Demo", "demo").silence().no_config(), &["demo"]);
        let outcome = result.unwrap();
        assert_eq!(outcome.final_phase(), Phase::Done);
        assert!(outcome.visited(Phase::RunningLifecycle));
    }

    #[test]
    fn missing_discovered_config_is_fatal() {
        let cwd = tempfile::TempDir::new().unwrap();
        let ctx = ExecContext {
            cwd: Some(cwd.path().to_path_buf()),
            ..ctx()
        };
        let err = App::new("Demo", "demo")
            .silence()
            .try_run_with_output(["demo"], ctx, &mut io::sink())
            .unwrap_err();
        match err {
            RunError::Config(ConfigError::NoFileFound { name, searched }) => {
                assert_eq!(name, "demo");
                assert_eq!(searched, [cwd.path().to_path_buf()]);
            }
            other => panic!("expected NoFileFound, got {:?}", other),
        }
    }

    #[test]
    fn default_policy_rejects_arguments() {
        let (result, _) = run(App::new("Demo", "demo").silence(), &["demo", "extra"]);
        let err = result.unwrap_err();
        assert!(matches!(err, RunError::ArgumentParse(_)));
        assert_eq!(
            err.to_string(),
            r#""demo" does not take any arguments, got ["extra"]"#
        );
    }

    #[test]
    fn unknown_flag_is_an_argument_error() {
        let (result, _) = run(App::new("Demo", "demo"), &["demo", "--nope"]);
        let err = result.unwrap_err();
        assert!(matches!(err, RunError::ArgumentParse(_)));
        assert!(err.to_string().contains("--nope"));
        assert!(!err.to_string().contains("Usage"));
    }

    #[test]
    fn version_flag_prints_json_and_stops() {
        let app = App::new("Demo", "demo").version("1.0.0");
        let (result, out) = run(app, &["demo", "--version"]);
        let outcome = result.unwrap();
        assert_eq!(outcome.trace, [Phase::ParsingArgs, Phase::Done]);
        assert!(out.starts_with(r#"{"name":"Demo","version":"1.0.0""#));
    }

    #[test]
    fn version_raw_prints_listing() {
        let app = App::new("Demo", "demo").version("1.0.0");
        let (result, out) = run(app, &["demo", "--version=raw"]);
        result.unwrap();
        assert!(out.starts_with("name: Demo\nversion: 1.0.0\n"));
    }

    #[test]
    fn no_version_removes_the_flag() {
        let (result, _) = run(App::new("Demo", "demo").no_version(), &["demo", "--version"]);
        assert!(matches!(result.unwrap_err(), RunError::ArgumentParse(_)));
    }

    #[test]
    fn help_is_printed_with_global_heading() {
        let (result, out) = run(App::new("Demo", "demo"), &["demo", "--help"]);
        result.unwrap();
        assert!(out.contains("Global flags"));
        assert!(out.contains("--config"));
    }

    #[test]
    fn subcommand_receives_its_path_and_args() {
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        let app = App::new("Demo", "demo").silence().no_config().command(
            Command::new("greet", "Say hello")
                .args(ArgsPolicy::Exact(1))
                .run_fn(move |inv| {
                    *sink.borrow_mut() = Some((inv.command_path(), inv.args().to_vec()));
                    Ok(())
                }),
        );

        let (result, _) = run(app, &["demo", "greet", "bob"]);
        result.unwrap();
        assert_eq!(
            seen.borrow().clone(),
            Some(("demo greet".to_string(), vec!["bob".to_string()]))
        );
    }

    #[test]
    fn grouping_node_prints_help() {
        let app = App::new("Demo", "demo").command(
            Command::new("db", "Database commands")
                .subcommand(Command::new("migrate", "Run migrations").run_fn(|_| Ok(()))),
        );
        let (result, out) = run(app, &["demo", "db"]);
        let outcome = result.unwrap();
        assert!(out.contains("migrate"));
        assert!(outcome.resolution.is_none());
    }

    #[test]
    fn missing_explicit_config_fails() {
        let app = App::new("Demo", "demo").silence();
        let (result, _) = run(app, &["demo", "--config", "/nonexistent/demo.yaml"]);
        assert!(matches!(result.unwrap_err(), RunError::Config(_)));
    }

    #[test]
    fn cancelled_context_fails_before_resolution() {
        let ctx = ctx();
        ctx.cancel.cancel();
        let err = App::new("Demo", "demo")
            .silence()
            .try_run_with_output(["demo"], ctx, &mut io::sink())
            .unwrap_err();
        assert!(matches!(err, RunError::Cancelled(Phase::ParsingArgs)));
    }
}
