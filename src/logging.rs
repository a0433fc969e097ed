//! Log output setup

use tracing_subscriber::EnvFilter;

/// Default directive when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "quabo=info";

/// Install a fmt subscriber filtered by `RUST_LOG`, or by `directive` when the
/// variable is unset or invalid.
///
/// Returns false when a global subscriber was already installed; the existing
/// one is kept.
pub fn init(directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        init("quabo=debug");
        assert!(!init("quabo=trace"));
        tracing::debug!("still logging");
    }

    #[test]
    fn bad_directive_falls_back() {
        // Either installs with the default or finds the subscriber from above
        let _ = init("quabo=[[[");
    }
}
