//! ui::output
//!
//! Diagnostic printing.
//!
//! # Design
//!
//! Every diagnostic line starts with the progress marker `==>` and goes to
//! the invocation's writer. A silent printer writes nothing. Errors are
//! not printed here; the entry point writes them to standard error.

use std::fmt::Display;
use std::io::{self, Write};
use std::path::Path;

/// Prefix of every diagnostic line.
pub const PROGRESS: &str = "==>";

/// Values in the configuration table are cut at this many columns.
pub const MAX_VALUE_WIDTH: usize = 80;

/// Writes diagnostics unless silenced.
pub struct Printer<'a> {
    out: &'a mut dyn Write,
    silent: bool,
}

impl<'a> Printer<'a> {
    pub fn new(out: &'a mut dyn Write, silent: bool) -> Self {
        Self { out, silent }
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    /// Print one progress line.
    pub fn progress(&mut self, message: impl Display) -> io::Result<()> {
        if self.silent {
            return Ok(());
        }
        writeln!(self.out, "{} {}", PROGRESS, message)
    }

    pub fn working_dir(&mut self, dir: &Path) -> io::Result<()> {
        self.progress(format_args!("WorkingDir: {}", dir.display()))
    }

    /// Print the file used and its key table. Nothing is printed when no
    /// file was used.
    pub fn config_file(&mut self, path: Option<&Path>, rows: &[(String, String)]) -> io::Result<()> {
        let Some(path) = path else {
            return Ok(());
        };
        self.progress(format_args!("Config file used: `{}`", path.display()))?;
        self.progress("Configuration items:")?;
        if self.silent {
            return Ok(());
        }
        for line in format_table(rows) {
            writeln!(self.out, "{}", line)?;
        }
        Ok(())
    }

    /// Print the explicitly supplied flags as `FLAG: --name="value"`.
    pub fn flags<'f, I>(&mut self, flags: I) -> io::Result<()>
    where
        I: IntoIterator<Item = (&'f str, &'f str)>,
    {
        self.progress("Flags items:")?;
        if self.silent {
            return Ok(());
        }
        for (name, value) in flags {
            writeln!(self.out, "FLAG: --{}={:?}", name, value)?;
        }
        Ok(())
    }

    pub fn starting(&mut self, name: &str, version: Option<&str>) -> io::Result<()> {
        self.progress(format_args!("Starting {} ...", name))?;
        if let Some(version) = version {
            self.progress(format_args!("Version: `{}`", version))?;
        }
        Ok(())
    }

    pub fn summary(&mut self, summary: &str) -> io::Result<()> {
        self.progress(format_args!("Config: `{}`", summary))
    }
}

/// Render `key: value` rows with keys right-aligned on the colon.
pub fn format_table(rows: &[(String, String)]) -> Vec<String> {
    let width = rows.iter().map(|(k, _)| k.chars().count() + 1).max().unwrap_or(0);
    rows.iter()
        .map(|(key, value)| {
            format!(
                "{:>width$} {}",
                format!("{}:", key),
                truncate(value, MAX_VALUE_WIDTH),
                width = width
            )
        })
        .collect()
}

/// Cut `value` to at most `max` characters.
pub fn truncate(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
