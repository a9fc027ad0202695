//! engine::lifecycle
//!
//! Applies the option rules to a populated options object.
//!
//! # Order
//!
//! ```text
//! complete (if Completable) -> validate -> describe (if Printable, not silent)
//! ```
//!
//! A completion failure stops here: validation never runs on a
//! half-completed object. Validation failures are collected in full and
//! reported as one [`AggregateError`].

use thiserror::Error;
use tracing::{debug, trace};

use super::capabilities::{Capability, CapabilitySet};
use super::options::{AggregateError, CliOptions};

/// Errors from the option rules.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// `complete` failed. The message is the hook's own.
    #[error(transparent)]
    Completion(anyhow::Error),

    /// `validate` returned one or more errors.
    #[error(transparent)]
    Validation(#[from] AggregateError),
}

/// Run the rules on `options`.
///
/// Returns the rendered summary when the object is printable and output is
/// not silenced. The caller decides where the summary goes.
pub fn apply_option_rules<O: CliOptions>(
    options: &mut O,
    caps: &CapabilitySet,
    silent: bool,
) -> Result<Option<String>, LifecycleError> {
    if caps.has(Capability::Completable) {
        if let Some(completable) = options.as_completable() {
            trace!("completing options");
            completable.complete().map_err(LifecycleError::Completion)?;
        }
    }

    let errors = options.validate();
    if let Some(err) = AggregateError::from_errors(errors) {
        debug!(count = err.len(), "options failed validation");
        return Err(err.into());
    }

    if silent || !caps.has(Capability::Printable) {
        return Ok(None);
    }
    Ok(options.as_printable().map(|p| p.describe()))
}
