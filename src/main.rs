//! Demo server built on cliwork.
//!
//! Reads `demo-server.{json,toml,yaml,yml,properties,hcl}` from the working
//! directory (or `/etc/demo`), `DEMO_SERVER_*` variables and flags, then
//! prints the resolved endpoints. One of those files must exist; an empty
//! `demo-server.json` holding `{}` is enough.

use anyhow::bail;
use cliwork::core::flags::NamedFlagSets;
use cliwork::{App, CliOptions, Command, CompletableOptions, Invocation, PrintableOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RedisOptions {
    host: String,
    port: u16,
    addr: String,
    database: i64,
}

impl Default for RedisOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 6379,
            addr: String::new(),
            database: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct MySqlOptions {
    host: String,
    port: u16,
    max_idle_connections: i64,
    tags: Vec<String>,
}

impl Default for MySqlOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3306,
            max_idle_connections: 100,
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct ServerOptions {
    redis: RedisOptions,
    mysql: MySqlOptions,
    debug: bool,
}

impl CliOptions for ServerOptions {
    fn flags(&self) -> NamedFlagSets {
        let mut fss = NamedFlagSets::new();
        fss.flag_set("redis")
            .string("redis.host", &self.redis.host, "Redis service host address.")
            .int("redis.port", self.redis.port.into(), "Redis service port.")
            .int("redis.database", self.redis.database, "Redis database index.");
        fss.flag_set("mysql")
            .string("mysql.host", &self.mysql.host, "MySQL service host address.")
            .int("mysql.port", self.mysql.port.into(), "MySQL service port.")
            .int(
                "mysql.max_idle_connections",
                self.mysql.max_idle_connections,
                "Maximum idle connections allowed to MySQL.",
            )
            .string_list("mysql.tags", &[], "Tags attached to the MySQL pool.");
        fss.flag_set("misc")
            .bool_p("debug", 'd', self.debug, "Log every resolved value.");
        fss
    }

    fn validate(&self) -> Vec<anyhow::Error> {
        let mut errs = Vec::new();
        if self.redis.host.is_empty() {
            errs.push(anyhow::anyhow!("--redis.host cannot be empty"));
        }
        if self.redis.port == 0 {
            errs.push(anyhow::anyhow!("--redis.port must be between 1 and 65535"));
        }
        if !(0..=15).contains(&self.redis.database) {
            errs.push(anyhow::anyhow!(
                "--redis.database must be between 0 and 15, got {}",
                self.redis.database
            ));
        }
        if self.mysql.max_idle_connections < 0 {
            errs.push(anyhow::anyhow!("--mysql.max-idle-connections cannot be negative"));
        }
        errs
    }

    fn as_completable(&mut self) -> Option<&mut dyn CompletableOptions> {
        Some(self)
    }

    fn as_printable(&self) -> Option<&dyn PrintableOptions> {
        Some(self)
    }
}

impl CompletableOptions for ServerOptions {
    fn complete(&mut self) -> anyhow::Result<()> {
        if self.redis.addr.is_empty() {
            self.redis.addr = format!("{}:{}", self.redis.host, self.redis.port);
        }
        if !self.redis.addr.contains(':') {
            bail!("redis.addr {:?} is not host:port", self.redis.addr);
        }
        Ok(())
    }
}

impl PrintableOptions for ServerOptions {
    fn describe(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn serve(opts: &ServerOptions, inv: &Invocation) -> anyhow::Result<()> {
    if opts.debug {
        tracing::info!(command = %inv.command_path(), "resolved options: {:?}", opts);
    }
    println!("redis: {} (db {})", opts.redis.addr, opts.redis.database);
    println!(
        "mysql: {}:{} (max idle {})",
        opts.mysql.host, opts.mysql.port, opts.mysql.max_idle_connections
    );
    if !opts.mysql.tags.is_empty() {
        println!("tags: {}", opts.mysql.tags.join(","));
    }
    Ok(())
}

fn main() {
    // `--debug` logs at info; `run_process` keeps this subscriber.
    cliwork::ui::logging::init(Some("info"));

    let ping = Command::new("ping", "Print the resolved Redis address")
        .long("Resolve the Redis options exactly like the server and print the address it would dial.")
        .run(ServerOptions::default(), |opts, _| {
            println!("PONG {}", opts.redis.addr);
            Ok(())
        });

    let serve_cmd = Command::new("serve", "Start the demo server")
        .long("Resolve every option, validate it and print the endpoints the server would use.")
        .run(ServerOptions::default(), serve);

    App::new("Demo Server", "demo-server")
        .version(env!("CARGO_PKG_VERSION"))
        .description("A demo server configured from flags, a config file and DEMO_SERVER_* variables.")
        .command(serve_cmd)
        .command(ping)
        .run_process();
}
