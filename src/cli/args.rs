//! cli::args
//!
//! Positional-argument policies and base-name formatting.
//!
//! # Policies
//!
//! Every command checks its positional arguments after flags are parsed
//! and before configuration is resolved. The default policy accepts none:
//!
//! ```
//! use cliwork::cli::args::ArgsPolicy;
//!
//! let none = ArgsPolicy::default();
//! assert!(none.check("demo", &[]).is_ok());
//! assert_eq!(
//!     none.check("demo", &["x".to_string()]).unwrap_err(),
//!     r#""demo" does not take any arguments, got ["x"]"#,
//! );
//!
//! assert!(ArgsPolicy::Range(1, 2).check("demo", &["a".to_string()]).is_ok());
//! ```

use std::fmt;
use std::sync::Arc;

/// Custom positional-argument check.
pub type ArgsCheck = Arc<dyn Fn(&[String]) -> anyhow::Result<()> + Send + Sync>;

/// Which positional arguments a command accepts.
#[derive(Clone, Default)]
pub enum ArgsPolicy {
    /// Any number.
    Any,
    /// None at all.
    #[default]
    None,
    /// At least n.
    Min(usize),
    /// At most n.
    Max(usize),
    /// Exactly n.
    Exact(usize),
    /// Between min and max, inclusive.
    Range(usize, usize),
    Custom(ArgsCheck),
}

impl ArgsPolicy {
    /// Wrap a custom check.
    pub fn custom<F>(check: F) -> Self
    where
        F: Fn(&[String]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        ArgsPolicy::Custom(Arc::new(check))
    }

    /// True if the policy can accept at least one argument.
    pub fn accepts_any(&self) -> bool {
        !matches!(
            self,
            ArgsPolicy::None | ArgsPolicy::Max(0) | ArgsPolicy::Exact(0) | ArgsPolicy::Range(_, 0)
        )
    }

    /// Check `args` for the command at `command_path`.
    ///
    /// # Errors
    ///
    /// Returns the message to report as an argument error.
    pub fn check(&self, command_path: &str, args: &[String]) -> Result<(), String> {
        let n = args.len();
        match self {
            ArgsPolicy::Any => Ok(()),
            ArgsPolicy::None => {
                if args.iter().any(|a| !a.is_empty()) {
                    Err(format!(
                        "{:?} does not take any arguments, got {:?}",
                        command_path, args
                    ))
                } else {
                    Ok(())
                }
            }
            ArgsPolicy::Min(min) if n < *min => Err(format!(
                "requires at least {} arg(s), only received {}",
                min, n
            )),
            ArgsPolicy::Max(max) if n > *max => {
                Err(format!("accepts at most {} arg(s), received {}", max, n))
            }
            ArgsPolicy::Exact(exact) if n != *exact => {
                Err(format!("accepts {} arg(s), received {}", exact, n))
            }
            ArgsPolicy::Range(min, max) if n < *min || n > *max => Err(format!(
                "accepts between {} and {} arg(s), received {}",
                min, max, n
            )),
            ArgsPolicy::Custom(check) => check(args).map_err(|e| e.to_string()),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for ArgsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsPolicy::Any => f.write_str("Any"),
            ArgsPolicy::None => f.write_str("None"),
            ArgsPolicy::Min(n) => f.debug_tuple("Min").field(n).finish(),
            ArgsPolicy::Max(n) => f.debug_tuple("Max").field(n).finish(),
            ArgsPolicy::Exact(n) => f.debug_tuple("Exact").field(n).finish(),
            ArgsPolicy::Range(a, b) => f.debug_tuple("Range").field(a).field(b).finish(),
            ArgsPolicy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Normalise a base name for the current platform.
pub fn format_basename(basename: &str) -> String {
    format_basename_for(std::env::consts::OS, basename)
}

/// Normalise a base name as it would be on `os`.
///
/// On Windows the name is lower-cased and a trailing `.exe` is removed.
///
/// ```
/// use cliwork::cli::args::format_basename_for;
///
/// assert_eq!(format_basename_for("windows", "Demo-Server.EXE"), "demo-server");
/// assert_eq!(format_basename_for("linux", "Demo-Server"), "Demo-Server");
/// ```
pub fn format_basename_for(os: &str, basename: &str) -> String {
    if os == "windows" {
        let lower = basename.to_lowercase();
        lower.strip_suffix(".exe").unwrap_or(&lower).to_string()
    } else {
        basename.to_string()
    }
}
