//! core::config::env
//!
//! Environment variable lookup keyed by dotted option names.
//!
//! A key `a.b` maps to `<PREFIX>_A_B`, where the prefix is the upper-cased
//! application base name with `-` replaced by `_`, and every `.` or `-` in
//! the key is replaced by `_`.
//!
//! # Example
//!
//! ```
//! use cliwork::core::config::env::Environment;
//!
//! let env = Environment::fixed([("DB_APISERVER_REDIS_HOST", "10.0.0.9")]);
//! assert_eq!(env.var_name("db-apiserver", "redis.host"), "DB_APISERVER_REDIS_HOST");
//! assert_eq!(env.lookup("db-apiserver", "redis.host").as_deref(), Some("10.0.0.9"));
//! ```

use std::collections::HashMap;

/// Source of environment variables.
///
/// `Process` reads the real process environment on every lookup. `Fixed`
/// holds a snapshot so resolution can run without touching process state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Process,
    Fixed(HashMap<String, String>),
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Process
    }
}

impl Environment {
    /// The live process environment.
    pub fn process() -> Self {
        Environment::Process
    }

    /// A fixed set of variables.
    pub fn fixed<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Environment::Fixed(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Read one variable. Empty values are treated as unset.
    pub fn get(&self, name: &str) -> Option<String> {
        let value = match self {
            Environment::Process => std::env::var(name).ok(),
            Environment::Fixed(vars) => vars.get(name).cloned(),
        };
        value.filter(|v| !v.is_empty())
    }

    /// Variable name for `key` under the prefix derived from `basename`.
    pub fn var_name(&self, basename: &str, key: &str) -> String {
        var_name(&env_prefix(basename), key)
    }

    /// Look up the variable for `key` under the prefix derived from `basename`.
    pub fn lookup(&self, basename: &str, key: &str) -> Option<String> {
        self.get(&self.var_name(basename, key))
    }
}

/// Environment prefix for an application base name.
///
/// ```
/// use cliwork::core::config::env::env_prefix;
///
/// assert_eq!(env_prefix("db-apiserver"), "DB_APISERVER");
/// ```
pub fn env_prefix(basename: &str) -> String {
    basename.to_uppercase().replace('-', "_")
}

/// Full variable name for `key` under `prefix`.
pub fn var_name(prefix: &str, key: &str) -> String {
    let key = key.to_uppercase().replace(['.', '-'], "_");
    if prefix.is_empty() {
        key
    } else {
        format!("{}_{}", prefix, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dots_and_dashes_become_underscores() {
        assert_eq!(var_name("TEST", "redis.max-idle"), "TEST_REDIS_MAX_IDLE");
        assert_eq!(var_name("", "redis.host"), "REDIS_HOST");
    }

    #[test]
    fn prefix_is_upper_snake() {
        assert_eq!(env_prefix("test"), "TEST");
        assert_eq!(env_prefix("iam-api-server"), "IAM_API_SERVER");
    }

    #[test]
    fn empty_values_are_unset() {
        let env = Environment::fixed([("TEST_REDIS_HOST", "")]);
        assert_eq!(env.lookup("test", "redis.host"), None);
    }

    #[test]
    fn fixed_environment_ignores_process_state() {
        let env = Environment::fixed(Vec::<(String, String)>::new());
        assert_eq!(env.get("PATH"), None);
    }
}
