//! Tests against the real process environment and working directory.
//!
//! These mutate process-wide state, so every test is serialized.

use std::cell::Cell;
use std::env;
use std::fs;
use std::io;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serial_test::serial;
use tempfile::TempDir;

use cliwork::core::config::ConfigError;
use cliwork::core::flags::NamedFlagSets;
use cliwork::engine::{CliOptions, ExecContext, RunError};
use cliwork::App;

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct Options {
    port: i64,
}

impl Default for Options {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl CliOptions for Options {
    fn flags(&self) -> NamedFlagSets {
        let mut fss = NamedFlagSets::new();
        fss.flag_set("generic").int("port", self.port, "Listen port.");
        fss
    }

    fn validate(&self) -> Vec<anyhow::Error> {
        Vec::new()
    }
}

fn try_resolved_port(app: App) -> Result<i64, RunError> {
    let seen = Rc::new(Cell::new(0));
    let sink = Rc::clone(&seen);
    app.silence()
        .run(Options::default(), move |o: &Options, _| {
            sink.set(o.port);
            Ok(())
        })
        .try_run_with_output(["cliwork-proc-test"], ExecContext::default(), &mut io::sink())?;
    Ok(seen.get())
}

fn resolved_port() -> i64 {
    try_resolved_port(App::new("proc", "cliwork-proc-test")).expect("run failed")
}

/// Restores the working directory on drop.
struct CwdGuard(std::path::PathBuf);

impl CwdGuard {
    fn enter(dir: &TempDir) -> Self {
        let previous = env::current_dir().expect("cwd is readable");
        env::set_current_dir(dir.path()).expect("failed to enter temp dir");
        Self(previous)
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.0);
    }
}

#[test]
#[serial]
fn process_environment_is_read() {
    let dir = TempDir::new().expect("failed to create temp dir");
    fs::write(dir.path().join("cliwork-proc-test.json"), "{}").expect("failed to write config");
    let _guard = CwdGuard::enter(&dir);

    env::set_var("CLIWORK_PROC_TEST_PORT", "9090");
    let port = resolved_port();
    env::remove_var("CLIWORK_PROC_TEST_PORT");

    assert_eq!(port, 9090);
}

#[test]
#[serial]
fn process_working_directory_is_searched() {
    let dir = TempDir::new().expect("failed to create temp dir");
    fs::write(dir.path().join("cliwork-proc-test.toml"), "port = 7070\n")
        .expect("failed to write config");

    let _guard = CwdGuard::enter(&dir);
    assert_eq!(resolved_port(), 7070);
}

#[test]
#[serial]
fn empty_directory_has_no_config_file() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let _guard = CwdGuard::enter(&dir);

    let err = try_resolved_port(App::new("proc", "cliwork-proc-test")).unwrap_err();
    assert!(matches!(err, RunError::Config(ConfigError::NoFileFound { .. })));
}

#[test]
#[serial]
fn defaults_apply_without_config_support() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let _guard = CwdGuard::enter(&dir);

    let port = try_resolved_port(App::new("proc", "cliwork-proc-test").no_config())
        .expect("run failed");
    assert_eq!(port, 8080);
}
