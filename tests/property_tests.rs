//! Property-based tests for precedence and error aggregation.
//!
//! Uses proptest to check that resolution honours the source order for any
//! combination of supplied values.

use std::fs;

use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use cliwork::core::config::env::{env_prefix, var_name, Environment};
use cliwork::core::config::{ConfigSource, Discovery};
use cliwork::core::flags::NamedFlagSets;
use cliwork::engine::{resolve, AggregateError, CliOptions};

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct Options {
    host: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            host: "default".into(),
        }
    }
}

impl CliOptions for Options {
    fn flags(&self) -> NamedFlagSets {
        let mut fss = NamedFlagSets::new();
        fss.flag_set("generic").string("host", &self.host, "Host.");
        fss
    }

    fn validate(&self) -> Vec<anyhow::Error> {
        Vec::new()
    }
}

/// Resolve `host` from whichever sources are given.
fn resolve_host(flag: Option<&str>, file: Option<&str>, env: Option<&str>) -> String {
    let dir = TempDir::new().expect("failed to create temp dir");
    if let Some(value) = file {
        let body = serde_json::json!({ "host": value }).to_string();
        fs::write(dir.path().join("test.json"), body).expect("failed to write config");
    }
    let env = Environment::fixed(env.map(|v| ("TEST_HOST", v)));
    let discovery = Discovery::new("test")
        .cwd(dir.path())
        .system_root(dir.path());
    let source = ConfigSource::load(&discovery, env).expect("failed to load config");

    let mut opts = Options::default();
    let mut flags = opts.flags().merged().expect("no duplicate flags");
    if let Some(value) = flag {
        flags.set_raw("host", value).expect("flag accepts any string");
    }
    resolve(&mut opts, &flags, &source).expect("resolution failed");
    opts.host
}

fn value() -> impl Strategy<Value = String> {
    "[a-z0-9][a-z0-9.]{0,15}"
}

proptest! {
    /// The highest-ranked supplied source always wins.
    #[test]
    fn highest_source_wins(
        flag in proptest::option::of(value()),
        file in proptest::option::of(value()),
        env in proptest::option::of(value()),
    ) {
        let expected = flag
            .clone()
            .or_else(|| file.clone())
            .or_else(|| env.clone())
            .unwrap_or_else(|| "default".to_string());
        let got = resolve_host(flag.as_deref(), file.as_deref(), env.as_deref());
        prop_assert_eq!(got, expected);
    }

    /// Aggregation keeps every error and names each one.
    #[test]
    fn aggregate_keeps_every_error(messages in proptest::collection::vec("[a-z]{1,10}", 1..20)) {
        let errors = messages.iter().map(|m| anyhow::anyhow!("{}", m)).collect();
        let agg = AggregateError::from_errors(errors).expect("non-empty");
        prop_assert_eq!(agg.len(), messages.len());

        let rendered = agg.to_string();
        for message in &messages {
            prop_assert!(rendered.contains(message.as_str()));
        }
    }

    /// Variable names never contain separators the shell cannot export.
    #[test]
    fn env_names_are_shell_safe(
        basename in "[a-z]{1,8}(-[a-z]{1,8})?",
        key in "[a-z]{1,8}([._-][a-z]{1,8}){0,3}",
    ) {
        let name = var_name(&env_prefix(&basename), &key);
        prop_assert!(name.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        prop_assert!(name.starts_with(&env_prefix(&basename)));
    }

    /// Asking for the same group twice yields one group with flags in order.
    #[test]
    fn flag_set_registry_is_idempotent(count in 1usize..12) {
        let mut fss = NamedFlagSets::new();
        for i in 0..count {
            fss.flag_set("group").string(&format!("flag{}", i), "", "");
        }
        prop_assert_eq!(fss.all().len(), 1);

        let names: Vec<String> = fss.all()[0]
            .flags()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        let expected: Vec<String> = (0..count).map(|i| format!("flag{}", i)).collect();
        prop_assert_eq!(names, expected);
    }
}
