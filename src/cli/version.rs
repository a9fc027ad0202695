//! cli::version
//!
//! Version information and the reserved `--version` flag.
//!
//! `--version` prints the information as JSON and exits successfully;
//! `--version=raw` prints one `key: value` line per field.

use std::fmt;

use serde::Serialize;

/// Name of the reserved flag.
pub const FLAG_NAME: &str = "version";

/// What the version flag asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionMode {
    Off,
    Json,
    Raw,
}

impl VersionMode {
    /// Parse the flag value. `None` for anything unrecognised.
    ///
    /// ```
    /// use cliwork::cli::version::VersionMode;
    ///
    /// assert_eq!(VersionMode::parse("true"), Some(VersionMode::Json));
    /// assert_eq!(VersionMode::parse("raw"), Some(VersionMode::Raw));
    /// assert_eq!(VersionMode::parse("maybe"), None);
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "raw" => Some(VersionMode::Raw),
            "" => Some(VersionMode::Off),
            other => crate::core::flags::parse_bool(other).map(|on| {
                if on {
                    VersionMode::Json
                } else {
                    VersionMode::Off
                }
            }),
        }
    }
}

/// Build information shown by `--version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub name: String,
    pub version: String,
    pub os: String,
    pub arch: String,
}

impl VersionInfo {
    /// Information for `name` at `version` on the current platform.
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Human listing, one field per line.
    pub fn to_raw(&self) -> String {
        self.to_string()
    }

    pub fn render(&self, mode: VersionMode) -> Option<String> {
        match mode {
            VersionMode::Off => None,
            VersionMode::Json => Some(self.to_json()),
            VersionMode::Raw => Some(self.to_raw()),
        }
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "name: {}", self.name)?;
        writeln!(f, "version: {}", self.version)?;
        writeln!(f, "os: {}", self.os)?;
        write!(f, "arch: {}", self.arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> VersionInfo {
        VersionInfo {
            name: "demo".into(),
            version: "1.2.3".into(),
            os: "linux".into(),
            arch: "x86_64".into(),
        }
    }

    #[test]
    fn json_has_every_field() {
        assert_eq!(
            info().to_json(),
            r#"{"name":"demo","version":"1.2.3","os":"linux","arch":"x86_64"}"#
        );
    }

    #[test]
    fn raw_lists_fields() {
        assert_eq!(
            info().to_raw(),
            "name: demo\nversion: 1.2.3\nos: linux\narch: x86_64"
        );
    }

    #[test]
    fn off_renders_nothing() {
        assert_eq!(info().render(VersionMode::Off), None);
        assert_eq!(VersionMode::parse("false"), Some(VersionMode::Off));
    }
}
