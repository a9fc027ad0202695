//! core::config
//!
//! Configuration source layer: file discovery, file loading and
//! environment lookup.
//!
//! # Discovery
//!
//! Executed once, before flags are resolved:
//!
//! 1. An explicit path (from `--config`) is used verbatim. A missing or
//!    unreadable file is fatal.
//! 2. Otherwise `<basename>.<ext>` is searched for in the current working
//!    directory, then in `<system-root>/<group>` when the base name has the
//!    form `<group>-<rest>` (`db-apiserver` searches `/etc/db`). Extensions
//!    are tried in the order of [`format::SUPPORTED_EXTENSIONS`]; the first
//!    directory holding a match wins.
//! 3. If nothing is found, resolution continues with flags and environment
//!    only, unless the discovery was marked as required.
//!
//! # Environment
//!
//! Keys map to `<PREFIX>_<KEY>` variables (see [`env`]). Environment values
//! rank below values from the configuration file.
//!
//! # Example
//!
//! ```no_run
//! use cliwork::core::config::{ConfigSource, Discovery};
//! use cliwork::core::config::env::Environment;
//!
//! let discovery = Discovery::new("db-apiserver");
//! let source = ConfigSource::load(&discovery, Environment::process()).unwrap();
//!
//! if let Some(path) = source.file_used() {
//!     println!("using {}", path.display());
//! }
//! for key in source.keys() {
//!     println!("{} = {:?}", key, source.get(&key));
//! }
//! ```

pub mod env;
pub mod format;
pub mod store;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use self::env::Environment;
use self::format::{ConfigFormat, SUPPORTED_EXTENSIONS};

/// Default root of the system configuration directories.
pub const DEFAULT_SYSTEM_ROOT: &str = "/etc";

/// Errors from configuration discovery and loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file '{path}' not found: {source}")]
    NotFound { path: PathBuf, source: io::Error },

    #[error("config file \"{name}\" not found in {searched:?}")]
    NoFileFound { name: String, searched: Vec<PathBuf> },

    #[error("failed to read config file '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse {format} config file '{path}': {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    #[error("unsupported config type for '{path}', supported extensions: {}", SUPPORTED_EXTENSIONS.join(", "))]
    UnsupportedFormat { path: PathBuf },
}

/// Where to look for a configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    basename: String,
    explicit: Option<PathBuf>,
    cwd: Option<PathBuf>,
    system_root: PathBuf,
    required: bool,
}

impl Discovery {
    /// Discover `<basename>.<ext>` in the default search path.
    pub fn new(basename: impl Into<String>) -> Self {
        Self {
            basename: basename.into(),
            explicit: None,
            cwd: None,
            system_root: PathBuf::from(DEFAULT_SYSTEM_ROOT),
            required: false,
        }
    }

    /// Use this file instead of searching.
    pub fn explicit(mut self, path: Option<PathBuf>) -> Self {
        self.explicit = path;
        self
    }

    /// Search this directory instead of the process working directory.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Root of the system configuration directories (default `/etc`).
    pub fn system_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.system_root = root.into();
        self
    }

    /// Fail with [`ConfigError::NoFileFound`] when the search finds nothing.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Directories searched when no explicit path is given, in order.
    ///
    /// ```
    /// use cliwork::core::config::Discovery;
    /// use std::path::PathBuf;
    ///
    /// let dirs = Discovery::new("db-apiserver").cwd("/work").search_dirs();
    /// assert_eq!(dirs, [PathBuf::from("/work"), PathBuf::from("/etc/db")]);
    ///
    /// let dirs = Discovery::new("apiserver").cwd("/work").search_dirs();
    /// assert_eq!(dirs, [PathBuf::from("/work")]);
    /// ```
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        let cwd = self
            .cwd
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let mut dirs = vec![cwd];

        let mut parts = self.basename.split('-');
        if let (Some(group), Some(_)) = (parts.next(), parts.next()) {
            dirs.push(self.system_root.join(group));
        }
        dirs
    }

    /// Locate the configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the explicit path does not name a
    /// file, or `ConfigError::NoFileFound` if the search is required and
    /// finds nothing.
    pub fn find(&self) -> Result<Option<PathBuf>, ConfigError> {
        if let Some(path) = &self.explicit {
            let meta = fs::metadata(path).map_err(|source| ConfigError::NotFound {
                path: path.clone(),
                source,
            })?;
            if meta.is_dir() {
                return Err(ConfigError::NotFound {
                    path: path.clone(),
                    source: io::Error::new(io::ErrorKind::InvalidInput, "is a directory"),
                });
            }
            return Ok(Some(path.clone()));
        }

        let searched = self.search_dirs();
        for dir in &searched {
            for ext in SUPPORTED_EXTENSIONS {
                let candidate = dir.join(format!("{}.{}", self.basename, ext));
                trace!(path = %candidate.display(), "probing config candidate");
                if candidate.is_file() {
                    debug!(path = %candidate.display(), "discovered config file");
                    return Ok(Some(candidate));
                }
            }
        }

        if self.required {
            return Err(ConfigError::NoFileFound {
                name: self.basename.clone(),
                searched,
            });
        }
        debug!(basename = %self.basename, "no config file found");
        Ok(None)
    }
}

/// Read and parse one configuration file.
///
/// # Errors
///
/// Returns `ConfigError::UnsupportedFormat` for an unknown extension,
/// `ConfigError::NotFound`/`ConfigError::Read` if the file cannot be read,
/// and `ConfigError::Parse` if it is malformed.
pub fn read_file(path: &Path) -> Result<Value, ConfigError> {
    let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;

    let contents = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
                source,
            }
        } else {
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    format.parse(&contents).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        format: format.name(),
        message,
    })
}

/// File values plus environment lookup for one application.
///
/// Created at command invocation and dropped when the invocation ends;
/// nothing here is process-global.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSource {
    basename: String,
    file: Option<PathBuf>,
    values: BTreeMap<String, Value>,
    env: Environment,
}

impl ConfigSource {
    /// Discover and load the configuration file.
    ///
    /// # Errors
    ///
    /// Propagates discovery and file errors; see [`Discovery::find`] and
    /// [`read_file`].
    pub fn load(discovery: &Discovery, env: Environment) -> Result<Self, ConfigError> {
        let mut source = Self::without_file(discovery.basename(), env);
        if let Some(path) = discovery.find()? {
            let tree = read_file(&path)?;
            source.values = store::flatten(&tree)
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect();
            debug!(path = %path.display(), keys = source.values.len(), "loaded config file");
            source.file = Some(path);
        }
        Ok(source)
    }

    /// A source with environment lookup only.
    pub fn without_file(basename: &str, env: Environment) -> Self {
        Self {
            basename: basename.to_string(),
            file: None,
            values: BTreeMap::new(),
            env,
        }
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Path of the file actually used.
    pub fn file_used(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Every key defined by the file, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    /// Flattened file values.
    pub fn file_values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Value for `key`: the file's value, else the environment's.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values
            .get(&key.to_lowercase())
            .cloned()
            .or_else(|| self.env_lookup(key).map(Value::String))
    }

    /// Environment variable name for `key`.
    pub fn env_var(&self, key: &str) -> String {
        self.env.var_name(&self.basename, key)
    }

    /// Raw environment value for `key`.
    pub fn env_lookup(&self, key: &str) -> Option<String> {
        self.env.lookup(&self.basename, key)
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }
}
