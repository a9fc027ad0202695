//! Two option groups on one command, with a completion hook that fails.
//!
//! ```text
//! cargo run --example option_group -- --mysql.host=db.local
//! ```
//!
//! The run callback is never reached: completion fails first, and
//! validation is skipped.

use cliwork::core::flags::NamedFlagSets;
use cliwork::{App, CliOptions, CompletableOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct Endpoint {
    host: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Options {
    mysql: Endpoint,
    redis: Endpoint,
}

impl CliOptions for Options {
    fn flags(&self) -> NamedFlagSets {
        let mut fss = NamedFlagSets::new();
        fss.flag_set("mysql").string(
            "mysql.host",
            &self.mysql.host,
            "MySQL service host address. If left blank, the following related mysql options will be ignored.",
        );
        fss.flag_set("redis").string(
            "redis.host",
            &self.redis.host,
            "Redis service host address.",
        );
        fss
    }

    fn validate(&self) -> Vec<anyhow::Error> {
        println!("validate called");
        Vec::new()
    }

    fn as_completable(&mut self) -> Option<&mut dyn CompletableOptions> {
        Some(self)
    }
}

impl CompletableOptions for Options {
    fn complete(&mut self) -> anyhow::Result<()> {
        println!("call complete");
        anyhow::bail!("complete error")
    }
}

fn main() {
    App::new("test", "config")
        .no_version()
        .no_config()
        .run(Options::default(), |opts, inv| {
            println!("mysql.host = {}", opts.mysql.host);
            println!("redis.host = {}", opts.redis.host);
            println!("{:?}", inv.args());
            Ok(())
        })
        .run_process();
}
