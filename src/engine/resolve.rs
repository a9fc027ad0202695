//! engine::resolve
//!
//! Merges flags, the configuration file and the environment into one
//! options object.
//!
//! # Algorithm
//!
//! 1. Record every flag that was changed or differs from its default
//!    (the "explicitly supplied" set, kept for diagnostics only)
//! 2. Build a [`ConfigStore`] from the options' compiled-in defaults, the
//!    declared flag defaults, the environment, the file and the changed flags
//! 3. Lay the store over the serialized options and deserialize the result
//!    back into the options object
//!
//! Fields with no matching key keep their compiled-in default. Resolution
//! is one-shot: calling it twice on the same object is not supported.
//!
//! # Example
//!
//! ```
//! use cliwork::core::config::ConfigSource;
//! use cliwork::core::config::env::Environment;
//! use cliwork::core::flags::NamedFlagSets;
//! use cliwork::engine::options::CliOptions;
//! use cliwork::engine::resolve::resolve;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! #[serde(default)]
//! struct Redis { host: String }
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! #[serde(default)]
//! struct Options { redis: Redis }
//!
//! impl CliOptions for Options {
//!     fn flags(&self) -> NamedFlagSets {
//!         let mut fss = NamedFlagSets::new();
//!         fss.flag_set("redis").string("redis.host", "127.0.0.1", "Redis host");
//!         fss
//!     }
//!     fn validate(&self) -> Vec<anyhow::Error> { Vec::new() }
//! }
//!
//! let mut options = Options::default();
//! let mut flags = options.flags().merged().unwrap();
//! flags.set_raw("redis.host", "10.0.0.5").unwrap();
//!
//! let env = Environment::fixed([("TEST_REDIS_HOST", "10.0.0.9")]);
//! let source = ConfigSource::without_file("test", env);
//!
//! let result = resolve(&mut options, &flags, &source).unwrap();
//! assert_eq!(options.redis.host, "10.0.0.5");
//! assert_eq!(result.explicit[0].name, "redis.host");
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::options::CliOptions;
use crate::core::config::store::{canonical_key, flatten, ConfigStore, Origin};
use crate::core::config::ConfigSource;
use crate::core::flags::{FlagValue, MergedFlagSet};

/// Errors from populating an options object.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to serialize options: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to populate options: {0}")]
    Populate(#[source] serde_json::Error),
}

/// A flag that counts as explicitly supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitFlag {
    pub name: String,
    pub value: String,
}

/// Record of one resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionResult {
    /// Flags that were changed or differ from their defaults, in
    /// registration order.
    pub explicit: Vec<ExplicitFlag>,

    /// The configuration file actually used.
    pub config_file: Option<PathBuf>,

    /// The merged store the options were populated from.
    pub store: ConfigStore,
}

impl ResolutionResult {
    /// Path of the file used, or an empty string if none.
    pub fn config_file_display(&self) -> String {
        self.config_file
            .as_deref()
            .map(Path::display)
            .map(|p| p.to_string())
            .unwrap_or_default()
    }

    /// Winning origin of every key.
    pub fn origins(&self) -> BTreeMap<String, Origin> {
        self.store.origins()
    }
}

/// Populate `options` from `flags` and `source`.
///
/// `flags` must already carry the parsed command-line values.
///
/// # Errors
///
/// Returns `ResolveError::Serialize` if the options cannot be serialized,
/// and `ResolveError::Populate` if the merged values do not fit the options
/// type (for example a non-numeric string for a numeric field).
pub fn resolve<O: CliOptions>(
    options: &mut O,
    flags: &MergedFlagSet,
    source: &ConfigSource,
) -> Result<ResolutionResult, ResolveError> {
    let explicit = flags
        .explicit()
        .into_iter()
        .map(|flag| ExplicitFlag {
            name: flag.name().to_string(),
            value: flag.value().to_string(),
        })
        .collect();

    let defaults = serde_json::to_value(&*options).map_err(ResolveError::Serialize)?;
    let store = build_store(&defaults, flags, source);
    debug!(
        keys = store.keys().len(),
        file_keys = source.keys().len(),
        changed_flags = store.layer_keys(Origin::Flag).len(),
        "merged configuration layers"
    );

    let populated = store.populate(defaults);
    *options = serde_json::from_value(populated).map_err(ResolveError::Populate)?;

    Ok(ResolutionResult {
        explicit,
        config_file: source.file_used().map(Path::to_path_buf),
        store,
    })
}

fn build_store(defaults: &Value, flags: &MergedFlagSet, source: &ConfigSource) -> ConfigStore {
    let mut store = ConfigStore::new();
    store.extend(Origin::Default, flatten(defaults));

    let bound: Vec<_> = flags.flags().filter(|f| f.is_bound()).collect();
    store.extend(
        Origin::FlagDefault,
        bound
            .iter()
            .map(|f| (f.name().to_string(), f.default_value().to_json())),
    );

    let mut keys = store.keys();
    keys.extend(source.keys().iter().map(|k| canonical_key(k)));
    keys.sort();
    keys.dedup();
    for key in keys {
        if let Some(raw) = source.env_lookup(&key) {
            let value = bound
                .iter()
                .find(|f| canonical_key(f.name()) == key)
                .and_then(|f| FlagValue::parse(f.kind(), &raw))
                .map(|v| v.to_json())
                .unwrap_or(Value::String(raw));
            debug!(key = %key, var = %source.env_var(&key), "environment override");
            store.set(Origin::Env, &key, value);
        }
    }

    store.extend(Origin::File, source.file_values().clone());

    store.extend(
        Origin::Flag,
        bound
            .iter()
            .filter(|f| f.is_changed())
            .map(|f| (f.name().to_string(), f.value().to_json())),
    );
    store
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::env::Environment;
    use crate::core::flags::{FlagDefinition, NamedFlagSets};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(default)]
    struct Redis {
        host: String,
        port: u16,
        addrs: Vec<String>,
    }

    impl Default for Redis {
        fn default() -> Self {
            Self {
                host: "127.0.0.1".into(),
                port: 6379,
                addrs: Vec::new(),
            }
        }
    }

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    #[serde(default)]
    struct Options {
        redis: Redis,
        name: String,
    }

    impl CliOptions for Options {
        fn flags(&self) -> NamedFlagSets {
            let mut fss = NamedFlagSets::new();
            fss.flag_set("redis")
                .string("redis.host", &self.redis.host, "")
                .int("redis.port", self.redis.port.into(), "");
            fss
        }

        fn validate(&self) -> Vec<anyhow::Error> {
            Vec::new()
        }
    }

    fn no_env() -> Environment {
        Environment::fixed(Vec::<(String, String)>::new())
    }

    fn source_with_file(values: Value, env: Environment) -> ConfigSource {
        let temp = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        std::fs::write(temp.path(), values.to_string()).unwrap();
        let discovery =
            crate::core::config::Discovery::new("test").explicit(Some(temp.path().to_path_buf()));
        ConfigSource::load(&discovery, env).unwrap()
    }

    #[test]
    fn untouched_fields_keep_defaults() {
        let mut options = Options::default();
        let flags = options.flags().merged().unwrap();
        let source = ConfigSource::without_file("test", no_env());

        let result = resolve(&mut options, &flags, &source).unwrap();
        assert_eq!(options, Options::default());
        assert!(result.explicit.is_empty());
        assert_eq!(result.config_file_display(), "");
    }

    #[test]
    fn flag_beats_file_and_env() {
        let mut options = Options::default();
        let mut flags = options.flags().merged().unwrap();
        flags.set_raw("redis.host", "flag").unwrap();

        let env = Environment::fixed([("TEST_REDIS_HOST", "env")]);
        let source = source_with_file(serde_json::json!({"redis": {"host": "file"}}), env);

        let result = resolve(&mut options, &flags, &source).unwrap();
        assert_eq!(options.redis.host, "flag");
        assert_eq!(result.origins()["redis.host"], Origin::Flag);
    }

    #[test]
    fn file_beats_env() {
        let mut options = Options::default();
        let flags = options.flags().merged().unwrap();
        let env = Environment::fixed([("TEST_REDIS_HOST", "env")]);
        let source = source_with_file(serde_json::json!({"redis": {"host": "file"}}), env);

        resolve(&mut options, &flags, &source).unwrap();
        assert_eq!(options.redis.host, "file");
    }

    #[test]
    fn env_is_typed_by_flag_kind_and_field_shape() {
        let mut options = Options::default();
        let flags = options.flags().merged().unwrap();
        let env = Environment::fixed([
            ("TEST_REDIS_PORT", "6380"),
            ("TEST_REDIS_ADDRS", "a,b"),
            ("TEST_NAME", "svc"),
        ]);
        let source = ConfigSource::without_file("test", env);

        resolve(&mut options, &flags, &source).unwrap();
        assert_eq!(options.redis.port, 6380);
        assert_eq!(options.redis.addrs, ["a", "b"]);
        assert_eq!(options.name, "svc");
    }

    #[test]
    fn unbound_flags_never_reach_the_store() {
        let mut options = Options::default();
        let mut fss = options.flags();
        fss.flag_set("global").add(
            FlagDefinition::new("name", FlagValue::String(String::new()), "").unbound(),
        );
        let mut flags = fss.merged().unwrap();
        flags.set_raw("name", "from-flag").unwrap();

        let result =
            resolve(&mut options, &flags, &ConfigSource::without_file("test", no_env())).unwrap();
        assert_eq!(options.name, "");
        assert_eq!(result.explicit.len(), 1);
    }

    #[test]
    fn mistyped_value_fails_to_populate() {
        let mut options = Options::default();
        let flags = options.flags().merged().unwrap();
        let env = Environment::fixed([("TEST_REDIS_PORT", "high")]);
        let source = ConfigSource::without_file("test", env);

        let err = resolve(&mut options, &flags, &source).unwrap_err();
        assert!(matches!(err, ResolveError::Populate(_)));
    }
}
