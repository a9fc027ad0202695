//! A root command with one sub-command that owns its own options.
//!
//! ```text
//! cargo run --example multi_command
//! cargo run --example multi_command -- redis --redis.host=10.0.0.5
//! TEST_REDIS_HOST=10.0.0.9 cargo run --example multi_command -- redis
//! ```

use cliwork::core::flags::NamedFlagSets;
use cliwork::{App, CliOptions, Command};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct RedisOptions {
    host: String,
}

impl Default for RedisOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Options {
    redis: RedisOptions,
}

impl CliOptions for Options {
    fn flags(&self) -> NamedFlagSets {
        let mut fss = NamedFlagSets::new();
        fss.flag_set("redis").string(
            "redis.host",
            &self.redis.host,
            "Redis service host address.",
        );
        fss
    }

    fn validate(&self) -> Vec<anyhow::Error> {
        Vec::new()
    }
}

fn main() {
    let redis = Command::new("redis", "Talk to redis").run(Options::default(), |opts, _| {
        println!("redis sub command: {}", opts.redis.host);
        Ok(())
    });

    App::new("test", "test")
        .no_version()
        .no_config()
        .description("A root command with one sub-command.")
        .command(redis)
        .run_fn(|_| {
            println!("root command");
            Ok(())
        })
        .run_process();
}
