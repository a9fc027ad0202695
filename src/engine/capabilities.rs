//! engine::capabilities
//!
//! Optional lifecycle capabilities of an options object.
//!
//! # Architecture
//!
//! Validation is mandatory for every options object. Everything else is
//! optional and detected by probing the object once, when its command is
//! registered. The resulting [`CapabilitySet`] is stored with the command and
//! consulted by the lifecycle; the object is not re-probed per call.
//!
//! # Example
//!
//! ```
//! use cliwork::engine::capabilities::{Capability, CapabilitySet};
//!
//! let caps = CapabilitySet::with([Capability::Flags, Capability::Completable]);
//!
//! assert!(caps.has(Capability::Completable));
//! assert!(!caps.has(Capability::Printable));
//! ```

use std::collections::BTreeSet;
use std::fmt;

use super::options::CliOptions;

/// An optional hook an options object supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    /// Declares at least one flag.
    Flags,

    /// Derives fields after sources are merged and before validation.
    Completable,

    /// Renders a human summary after validation.
    Printable,
}

impl Capability {
    /// Human-readable description.
    ///
    /// ```
    /// use cliwork::engine::capabilities::Capability;
    ///
    /// assert_eq!(Capability::Printable.description(), "renders a summary");
    /// ```
    pub fn description(&self) -> &'static str {
        match self {
            Capability::Flags => "declares flags",
            Capability::Completable => "completes derived fields",
            Capability::Printable => "renders a summary",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// The capabilities found on one options object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    capabilities: BTreeSet<Capability>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().collect()
    }

    /// Probe `options` for every optional capability.
    pub fn probe<O: CliOptions>(options: &mut O) -> Self {
        let mut caps = Self::new();
        if !options.flags().is_empty() {
            caps.insert(Capability::Flags);
        }
        if options.as_completable().is_some() {
            caps.insert(Capability::Completable);
        }
        if options.as_printable().is_some() {
            caps.insert(Capability::Printable);
        }
        caps
    }

    pub fn insert(&mut self, cap: Capability) {
        self.capabilities.insert(cap);
    }

    pub fn has(&self, cap: Capability) -> bool {
        self.capabilities.contains(&cap)
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Capabilities in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.capabilities.iter().copied()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        Self {
            capabilities: iter.into_iter().collect(),
        }
    }
}
