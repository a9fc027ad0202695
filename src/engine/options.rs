//! engine::options
//!
//! The option lifecycle contract.
//!
//! # Overview
//!
//! An options object is a plain struct owned by the application author.
//! The engine fills it from flags, the configuration file and the
//! environment by matching dotted key paths against its serialized form,
//! then drives its lifecycle hooks:
//!
//! ```text
//! populate -> [complete] -> validate -> [describe]
//! ```
//!
//! `validate` is mandatory. `complete` and `describe` are optional and are
//! exposed through [`CliOptions::as_completable`] and
//! [`CliOptions::as_printable`].
//!
//! # Example
//!
//! ```
//! use cliwork::core::flags::NamedFlagSets;
//! use cliwork::engine::options::{CliOptions, PrintableOptions};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! #[serde(default)]
//! struct RedisOptions {
//!     host: String,
//!     port: u16,
//! }
//!
//! impl Default for RedisOptions {
//!     fn default() -> Self {
//!         Self { host: "127.0.0.1".into(), port: 6379 }
//!     }
//! }
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! #[serde(default)]
//! struct Options {
//!     redis: RedisOptions,
//! }
//!
//! impl CliOptions for Options {
//!     fn flags(&self) -> NamedFlagSets {
//!         let mut fss = NamedFlagSets::new();
//!         fss.flag_set("redis")
//!             .string("redis.host", &self.redis.host, "Redis service host address.")
//!             .int("redis.port", self.redis.port.into(), "Redis service port.");
//!         fss
//!     }
//!
//!     fn validate(&self) -> Vec<anyhow::Error> {
//!         let mut errs = Vec::new();
//!         if self.redis.host.is_empty() {
//!             errs.push(anyhow::anyhow!("--redis.host cannot be empty"));
//!         }
//!         errs
//!     }
//!
//!     fn as_printable(&self) -> Option<&dyn PrintableOptions> {
//!         Some(self)
//!     }
//! }
//!
//! impl PrintableOptions for Options {
//!     fn describe(&self) -> String {
//!         format!("redis={}:{}", self.redis.host, self.redis.port)
//!     }
//! }
//! ```

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::flags::NamedFlagSets;

/// Configuration options read from flags, a configuration file and the
/// environment.
///
/// Resolution replaces the object with one deserialized from the merged
/// values, so fields skipped by serde come back as their `Default`.
pub trait CliOptions: Serialize + DeserializeOwned {
    /// Every flag the object understands, grouped for help output.
    ///
    /// A flag binds to the field whose dotted path equals the flag name.
    fn flags(&self) -> NamedFlagSets {
        NamedFlagSets::new()
    }

    /// Check the populated object, returning every independent failure.
    fn validate(&self) -> Vec<anyhow::Error>;

    /// Expose the completion hook, if supported.
    fn as_completable(&mut self) -> Option<&mut dyn CompletableOptions> {
        None
    }

    /// Expose the summary hook, if supported.
    fn as_printable(&self) -> Option<&dyn PrintableOptions> {
        None
    }
}

/// Options that derive fields once all sources are merged.
pub trait CompletableOptions {
    /// Fill in derived fields. A failure aborts before validation.
    fn complete(&mut self) -> anyhow::Result<()>;
}

/// Options that can render a human summary of themselves.
pub trait PrintableOptions {
    fn describe(&self) -> String;
}

/// Options for a command that declares none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct NoOptions {}

impl CliOptions for NoOptions {
    fn validate(&self) -> Vec<anyhow::Error> {
        Vec::new()
    }
}

/// Every validation failure of one options object.
///
/// A single error displays as itself; several display as `[e1, e2, ...]`.
/// Nothing is deduplicated or dropped.
///
/// ```
/// use cliwork::engine::options::AggregateError;
///
/// let err = AggregateError::new(vec![
///     anyhow::anyhow!("port out of range"),
///     anyhow::anyhow!("host is empty"),
/// ]);
/// assert_eq!(err.len(), 2);
/// assert_eq!(err.to_string(), "[port out of range, host is empty]");
/// ```
#[derive(Debug)]
pub struct AggregateError {
    errors: Vec<anyhow::Error>,
}

impl AggregateError {
    pub fn new(errors: Vec<anyhow::Error>) -> Self {
        Self { errors }
    }

    /// `None` if there is nothing to aggregate.
    pub fn from_errors(errors: Vec<anyhow::Error>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self::new(errors))
        }
    }

    pub fn errors(&self) -> &[anyhow::Error] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [] => Ok(()),
            [only] => write!(f, "{}", only),
            many => {
                f.write_str("[")?;
                for (i, err) in many.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl std::error::Error for AggregateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_error_displays_plainly() {
        let err = AggregateError::new(vec![anyhow::anyhow!("only")]);
        assert_eq!(err.to_string(), "only");
    }

    #[test]
    fn duplicates_are_kept() {
        let err = AggregateError::new(vec![anyhow::anyhow!("same"), anyhow::anyhow!("same")]);
        assert_eq!(err.len(), 2);
        assert_eq!(err.to_string(), "[same, same]");
    }

    #[test]
    fn empty_list_aggregates_to_none() {
        assert!(AggregateError::from_errors(Vec::new()).is_none());
    }
}
