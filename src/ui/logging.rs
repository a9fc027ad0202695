//! ui::logging
//!
//! Installs the `tracing` subscriber used by the library's debug and trace
//! events.
//!
//! Logs go to standard error and are filtered by `RUST_LOG`. Diagnostics
//! printed for the user do not go through here; see [`super::output`].

use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "warn";

/// Install a stderr subscriber.
///
/// `default` replaces [`DEFAULT_FILTER`] when given. Returns `false` if a
/// global subscriber was already installed, in which case nothing changes.
pub fn init(default: Option<&str>) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default.unwrap_or(DEFAULT_FILTER)));

    tracing_subscriber::registry()
        .with(filter)
        .with(layer().compact().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        init(None);
        assert!(!init(Some("debug")));
    }
}
